//! Pretty-printing for IR
//!
//! Renders a module in an LLVM-flavoured textual form: type definitions,
//! globals, aliases, declarations and definitions, in that order.

use super::block::BasicBlock;
use super::function::{Function, ParamAttr};
use super::instr::{callee_return_type, Instr, Terminator};
use super::module::{Global, Module};
use super::value::Value;
use std::fmt::{self, Write};

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

fn args_list(args: &[Value]) -> String {
    args.iter().map(Value::typed).collect::<Vec<_>>().join(", ")
}

impl PrettyPrint for Module {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        writeln!(output, "; module {}", self.name).unwrap();

        if !self.types.is_empty() {
            writeln!(output).unwrap();
            for def in &self.types {
                match &def.body {
                    Some(body) => writeln!(output, "%{} = type {}", def.name, body).unwrap(),
                    None => writeln!(output, "%{} = type opaque", def.name).unwrap(),
                }
            }
        }

        if !self.globals.is_empty() {
            writeln!(output).unwrap();
            for global in &self.globals {
                writeln!(output, "{}", global.pretty_print()).unwrap();
            }
        }

        if !self.aliases.is_empty() {
            writeln!(output).unwrap();
            for alias in &self.aliases {
                writeln!(
                    output,
                    "@{} = {}alias {}",
                    alias.name,
                    alias.linkage.keyword(),
                    alias.aliasee.typed()
                )
                .unwrap();
            }
        }

        let mut decls = self.declarations().peekable();
        if decls.peek().is_some() {
            writeln!(output).unwrap();
            for func in decls {
                output.push_str(&func.pretty_print());
            }
        }

        for func in self.definitions() {
            writeln!(output).unwrap();
            output.push_str(&func.pretty_print());
        }

        output
    }
}

impl PrettyPrint for Global {
    fn pretty_print(&self) -> String {
        match &self.init {
            None => format!("@{} = external global {}", self.name, self.ty),
            Some(init) => format!(
                "@{} = {}{} {} {}",
                self.name,
                self.linkage.keyword(),
                if self.constant { "constant" } else { "global" },
                self.ty,
                init
            ),
        }
    }
}

impl PrettyPrint for Function {
    fn pretty_print(&self) -> String {
        let mut output = String::new();

        if self.is_declaration() {
            let params: Vec<String> = self.ty.params.iter().map(|t| t.to_string()).collect();
            writeln!(output, "declare {} @{}({})", self.ty.ret, self.name, params.join(", ")).unwrap();
            return output;
        }

        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let sret = if p.attrs.contains(&ParamAttr::StructRet) {
                    " sret"
                } else {
                    ""
                };
                format!("{}{} %{}", p.ty, sret, p.name)
            })
            .collect();
        write!(
            output,
            "define {}{} @{}({})",
            self.linkage.keyword(),
            self.ty.ret,
            self.name,
            params.join(", ")
        )
        .unwrap();
        if let Some(personality) = &self.personality {
            write!(output, " personality {}", personality.typed()).unwrap();
        }
        writeln!(output, " {{").unwrap();

        for block in &self.blocks {
            output.push_str(&block.pretty_print());
        }

        writeln!(output, "}}").unwrap();
        output
    }
}

impl PrettyPrint for BasicBlock {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        writeln!(output, "{}:", self.label.as_str()).unwrap();
        for instr in &self.instructions {
            writeln!(output, "  {}", instr).unwrap();
        }
        if let Some(term) = &self.terminator {
            writeln!(output, "  {}", term).unwrap();
        }
        output
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dest) = self.dest() {
            write!(f, "%{} = ", dest.name)?;
        }
        match self {
            Instr::Call { callee, args, .. } => write!(
                f,
                "call {} {}({})",
                callee_return_type(callee),
                callee,
                args_list(args)
            ),
            Instr::Load { dest, ptr } => write!(f, "load {}, {}", dest.ty, ptr.typed()),
            Instr::Store { value, ptr } => write!(f, "store {}, {}", value.typed(), ptr.typed()),
            Instr::Alloca { dest } => match dest.ty.pointee() {
                Some(ty) => write!(f, "alloca {}", ty),
                None => write!(f, "alloca i8"),
            },
            Instr::Cast { dest, op, value } => {
                write!(f, "{} {} to {}", op, value.typed(), dest.ty)
            }
            Instr::FieldPtr { base, index, .. } => {
                let base_ty = base.ty();
                let pointee = base_ty.pointee().map(|t| t.to_string()).unwrap_or_default();
                write!(
                    f,
                    "getelementptr {}, {}, i32 0, i32 {}",
                    pointee,
                    base.typed(),
                    index
                )
            }
            Instr::BytePtr { base, offset, .. } => {
                write!(f, "getelementptr i8, {}, {}", base.typed(), offset.typed())
            }
            Instr::ICmp {
                pred, left, right, ..
            } => write!(f, "icmp {} {}, {}", pred, left.typed(), right),
            Instr::Phi { dest, incoming } => {
                let arms: Vec<String> = incoming
                    .iter()
                    .map(|(v, l)| format!("[ {}, {} ]", v, l))
                    .collect();
                write!(f, "phi {} {}", dest.ty, arms.join(", "))
            }
            Instr::LandingPad { dest } => write!(f, "landingpad {} catch i8* null", dest.ty),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Ret(None) => write!(f, "ret void"),
            Terminator::Ret(Some(value)) => write!(f, "ret {}", value.typed()),
            Terminator::Br(target) => write!(f, "br label {}", target),
            Terminator::CondBr {
                cond,
                then_to,
                else_to,
            } => write!(
                f,
                "br {}, label {}, label {}",
                cond.typed(),
                then_to,
                else_to
            ),
            Terminator::Invoke {
                dest,
                callee,
                args,
                normal,
                unwind,
            } => {
                if let Some(dest) = dest {
                    write!(f, "%{} = ", dest.name)?;
                }
                write!(
                    f,
                    "invoke {} {}({}) to label {} unwind label {}",
                    callee_return_type(callee),
                    callee,
                    args_list(args),
                    normal,
                    unwind
                )
            }
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::function::Linkage;
    use crate::ir::types::{FunctionType, Type};
    use crate::ir::value::FunctionRef;

    #[test]
    fn test_module_section_order() {
        let mut module = Module::new("demo");
        module.add_type("Env", None);
        module.add_global(
            Global::private("str.0", Type::Array(2, Box::new(Type::I8)), Value::Bytes(b"a\0".to_vec()))
                .constant(),
        );
        let callee = FunctionRef::new("_bcThrow", FunctionType::new(Type::Void, vec![Type::env_ptr()]));
        module.declare(&callee);

        let mut func = Function::new("f", FunctionType::new(Type::Void, vec![Type::env_ptr()]), &["env"]);
        let env = func.param(0);
        func.call(&callee, vec![env]);
        func.ret(None);
        module.add_function(func);

        let text = module.pretty_print();
        let ty = text.find("%Env = type opaque").unwrap();
        let global = text
            .find("@str.0 = private constant [2 x i8] c\"a\\00\"")
            .unwrap();
        let decl = text.find("declare void @_bcThrow(%Env*)").unwrap();
        let def = text.find("define void @f(%Env* %env) {").unwrap();
        assert!(ty < global && global < decl && decl < def);
        assert!(text.contains("  call void @_bcThrow(%Env* %env)"));
        assert!(text.contains("  ret void"));
    }

    #[test]
    fn test_alias_and_sret_rendering() {
        let mut module = Module::new("demo");
        let ty = FunctionType::new(Type::Void, vec![Type::i8_ptr()]);
        let mut func = Function::new("cb", ty.clone(), &["ret"]);
        func.set_param_attr(0, ParamAttr::StructRet);
        func.linkage = Linkage::Internal;
        func.ret(None);
        let fref = module.add_function(func);
        module.add_alias("cb_i8p", Linkage::Private, fref.as_i8_ptr());

        let text = module.pretty_print();
        assert!(text.contains("define internal void @cb(i8* sret %ret) {"));
        assert!(text.contains("@cb_i8p = private alias i8* bitcast (void (i8*)* @cb to i8*)"));
    }
}
