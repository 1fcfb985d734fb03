//! IR Module
//!
//! Top-level container for one compiled class.

use super::function::{Function, Linkage};
use super::types::Type;
use super::value::{FunctionRef, Value};
use rustc_hash::FxHashMap;

/// A named type definition (`%Name = type {...}`); opaque when `body` is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub body: Option<Type>,
}

/// A global variable; an external declaration when `init` is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub linkage: Linkage,
    pub constant: bool,
    pub ty: Type,
    pub init: Option<Value>,
}

impl Global {
    /// A private mutable global with an initializer
    pub fn private(name: impl Into<String>, ty: Type, init: Value) -> Self {
        Self {
            name: name.into(),
            linkage: Linkage::Private,
            constant: false,
            ty,
            init: Some(init),
        }
    }

    /// An external global defined elsewhere
    pub fn external(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            linkage: Linkage::External,
            constant: false,
            ty,
            init: None,
        }
    }

    /// Mark as constant
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// Mark with the given linkage
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Address of this global
    pub fn address(&self) -> Value {
        Value::global(self.name.clone(), self.ty.clone())
    }
}

/// A symbol alias
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub linkage: Linkage,
    pub aliasee: Value,
}

/// An output module
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Module name
    pub name: String,
    /// Named types in insertion order
    pub types: Vec<TypeDef>,
    /// Globals in insertion order
    pub globals: Vec<Global>,
    /// Aliases in insertion order
    pub aliases: Vec<Alias>,
    /// Functions (declarations and definitions) in insertion order
    pub functions: Vec<Function>,
    type_map: FxHashMap<String, usize>,
    global_map: FxHashMap<String, usize>,
    function_map: FxHashMap<String, usize>,
}

impl Module {
    /// Create a new empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Define a named type once; later definitions of the same name are ignored
    pub fn add_type(&mut self, name: &str, body: Option<Type>) -> Type {
        if !self.type_map.contains_key(name) {
            self.type_map.insert(name.to_string(), self.types.len());
            self.types.push(TypeDef {
                name: name.to_string(),
                body,
            });
        }
        Type::named(name)
    }

    /// Get a type definition by name
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.type_map.get(name).map(|&i| &self.types[i])
    }

    /// Add a global unless one with the same name exists; returns its address
    pub fn add_global(&mut self, global: Global) -> Value {
        if let Some(&i) = self.global_map.get(&global.name) {
            return self.globals[i].address();
        }
        let address = global.address();
        self.global_map.insert(global.name.clone(), self.globals.len());
        self.globals.push(global);
        address
    }

    /// Get a global by name
    pub fn get_global(&self, name: &str) -> Option<&Global> {
        self.global_map.get(name).map(|&i| &self.globals[i])
    }

    /// Check if a global exists
    pub fn has_global(&self, name: &str) -> bool {
        self.global_map.contains_key(name)
    }

    /// Add an alias
    pub fn add_alias(&mut self, name: impl Into<String>, linkage: Linkage, aliasee: Value) -> Value {
        let name = name.into();
        let ty = aliasee.ty();
        self.aliases.push(Alias {
            name: name.clone(),
            linkage,
            aliasee,
        });
        Value::Global { name, ty }
    }

    /// Get an alias by name
    pub fn get_alias(&self, name: &str) -> Option<&Alias> {
        self.aliases.iter().find(|a| a.name == name)
    }

    /// Declare an external function unless the module already has it
    pub fn declare(&mut self, fref: &FunctionRef) -> Value {
        if !self.function_map.contains_key(&fref.name) {
            self.function_map
                .insert(fref.name.clone(), self.functions.len());
            self.functions.push(Function::declaration(fref));
        }
        fref.value()
    }

    /// Add a function, replacing any declaration with the same name
    pub fn add_function(&mut self, func: Function) -> FunctionRef {
        let fref = func.fn_ref();
        match self.function_map.get(&func.name) {
            Some(&i) => self.functions[i] = func,
            None => {
                self.function_map.insert(func.name.clone(), self.functions.len());
                self.functions.push(func);
            }
        }
        fref
    }

    /// Get a function by name
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.function_map.get(name).map(|&i| &self.functions[i])
    }

    /// Check if a function (declared or defined) exists
    pub fn has_function(&self, name: &str) -> bool {
        self.function_map.contains_key(name)
    }

    /// Iterate over function definitions
    pub fn definitions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_declaration())
    }

    /// Iterate over function declarations
    pub fn declarations(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.is_declaration())
    }

    /// Names of globals starting with `prefix`
    pub fn globals_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Global> {
        self.globals.iter().filter(move |g| g.name.starts_with(prefix))
    }

    /// Validate the entire module
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for def in &self.types {
            if let Some(body) = &def.body {
                self.check_named(body, &mut errors);
            }
        }
        for global in &self.globals {
            if global.init.is_none() && global.linkage != Linkage::External {
                errors.push(format!("Global @{} has no initializer", global.name));
            }
        }
        for func in &self.functions {
            if let Err(e) = func.validate() {
                errors.push(format!("Function @{}: {}", func.name, e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check_named(&self, ty: &Type, errors: &mut Vec<String>) {
        match ty {
            Type::Named(name) if !self.type_map.contains_key(name) => {
                errors.push(format!("Reference to undefined type %{}", name));
            }
            Type::Ptr(inner) | Type::Array(_, inner) => self.check_named(inner, errors),
            Type::Struct(fields) => {
                for field in fields {
                    self.check_named(field, errors);
                }
            }
            _ => {}
        }
    }
}
