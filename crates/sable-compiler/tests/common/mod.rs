//! Shared helpers for the integration tests

#![allow(dead_code)]

use rustc_hash::FxHashMap;
use sable_compiler::class::{Constant, Insn};
use sable_compiler::descriptor;
use sable_compiler::ir::{Function, FunctionRef, Instr, IntPredicate, Module, Terminator, Type, Value};
use sable_compiler::runtime::{PrimitiveArray, RuntimeFn};
use sable_compiler::trampoline::{ClassOp, FieldOp, InvokeOp};
use sable_compiler::{
    ClassCompiler, ClassDescriptor, CompileError, CompileResult, CompilerConfig, MethodContext,
    MethodTranslator,
};

/// Lowers a body to one call per referencing instruction, in order, with
/// placeholder operands. Enough to see which call targets a body gets.
pub struct WalkingTranslator;

impl MethodTranslator for WalkingTranslator {
    fn translate(&mut self, cx: &mut MethodContext<'_, '_>) -> CompileResult<Function> {
        let mut func = cx.new_function()?;
        let env = func.param(0);
        let method = cx.method;

        for insn in method.instructions() {
            let target = match insn {
                Insn::New { class } => cx.class_op(ClassOp::New, class)?,
                Insn::Checkcast { class } => cx.class_op(ClassOp::Checkcast, class)?,
                Insn::Instanceof { class } => cx.class_op(ClassOp::Instanceof, class)?,
                Insn::GetStatic(m) => cx.field(FieldOp::GetStatic, &m.owner, &m.name, &m.desc)?,
                Insn::PutStatic(m) => cx.field(FieldOp::PutStatic, &m.owner, &m.name, &m.desc)?,
                Insn::GetField(m) => cx.field(FieldOp::GetField, &m.owner, &m.name, &m.desc)?,
                Insn::PutField(m) => cx.field(FieldOp::PutField, &m.owner, &m.name, &m.desc)?,
                Insn::InvokeStatic(m) => cx.invoke(InvokeOp::Static, &m.owner, &m.name, &m.desc)?,
                Insn::InvokeVirtual(m) => cx.invoke(InvokeOp::Virtual, &m.owner, &m.name, &m.desc)?,
                Insn::InvokeSpecial(m) => cx.invoke(InvokeOp::Special, &m.owner, &m.name, &m.desc)?,
                Insn::InvokeInterface(m) => {
                    cx.invoke(InvokeOp::Interface, &m.owner, &m.name, &m.desc)?
                }
                Insn::Ldc {
                    value: Constant::String(s),
                } => {
                    let s = cx.string(s);
                    let new_string = cx.runtime(RuntimeFn::NewString);
                    func.call(&new_string, vec![env.clone(), s]);
                    continue;
                }
                Insn::Ldc {
                    value: Constant::Class(name),
                } => {
                    cx.ldc_class(&mut func, &env, name, None)?;
                    continue;
                }
                Insn::NewArray { elem } => {
                    let Some(kind) = PrimitiveArray::from_descriptor(*elem) else {
                        return Err(CompileError::Translator {
                            method: method.name.clone(),
                            message: format!("no primitive array of {}", elem),
                        });
                    };
                    let new_array = cx.runtime(RuntimeFn::NewArray(kind));
                    func.call(&new_array, vec![env.clone(), Value::i32(1)]);
                    continue;
                }
                Insn::ANewArray { class } => {
                    let desc = cx.string(&descriptor::array_of(class));
                    let caller = cx.class_cell();
                    let caller = func.load(caller);
                    let new_array = cx.runtime(RuntimeFn::NewObjectArray);
                    func.call(&new_array, vec![env.clone(), Value::i32(1), desc, caller]);
                    continue;
                }
                Insn::MultiANewArray { desc, dims } => {
                    let desc = cx.string(desc);
                    let caller = cx.class_cell();
                    let caller = func.load(caller);
                    let new_array = cx.runtime(RuntimeFn::NewMultiArray);
                    let lengths = Value::null(Type::I32.ptr());
                    func.call(
                        &new_array,
                        vec![env.clone(), Value::i32(i64::from(*dims)), lengths, desc, caller],
                    );
                    continue;
                }
                _ => continue,
            };
            let args = placeholder_args(&env, &target);
            func.call(&target, args);
        }

        let ret = func.ty.ret.clone();
        func.ret(Value::zero_of(&ret));
        Ok(func)
    }
}

fn placeholder_args(env: &Value, target: &FunctionRef) -> Vec<Value> {
    let mut args = vec![env.clone()];
    args.extend(
        target.ty.params[1..]
            .iter()
            .map(|ty| Value::zero_of(ty).unwrap_or_else(|| Value::Zero(ty.clone()))),
    );
    args
}

pub fn class(json: &str) -> ClassDescriptor {
    ClassDescriptor::from_json(json).unwrap()
}

pub fn try_compile_with(config: &CompilerConfig, json: &str) -> CompileResult<Module> {
    let mut compiler = ClassCompiler::new(config).with_translator(WalkingTranslator);
    compiler.compile(&class(json))
}

pub fn compile_with(config: &CompilerConfig, json: &str) -> Module {
    try_compile_with(config, json).unwrap()
}

pub fn compile(json: &str) -> Module {
    compile_with(&CompilerConfig::default(), json)
}

/// Number of (non-declaration) functions whose body calls `callee`
pub fn callers_of(module: &Module, callee: &str) -> usize {
    module
        .definitions()
        .filter(|f| f.call_count(callee) > 0)
        .count()
}

// ============================================================================
// Path walking
// ============================================================================

/// One way through a function body, from `entry` to `ret` or `unreachable`.
/// Invokes count as calls on both their normal and their unwind edge.
#[derive(Debug, Clone, Default)]
pub struct ExecPath {
    pub blocks: Vec<String>,
    pub calls: Vec<String>,
    /// Callees whose invoke took the unwind edge
    pub unwound: Vec<String>,
    pub returns: bool,
}

impl ExecPath {
    pub fn count(&self, callee: &str) -> usize {
        self.calls.iter().filter(|c| *c == callee).count()
    }

    pub fn visits(&self, label: &str) -> bool {
        self.blocks.iter().any(|b| b == label)
    }

    /// Whether an invoke of `callee` took its unwind edge
    pub fn raised_in(&self, callee: &str) -> bool {
        self.unwound.iter().any(|c| c == callee)
    }
}

/// What a path knows about stack slots: whether each holds null
#[derive(Debug, Clone, Default)]
struct Facts {
    slot_is_null: FxHashMap<String, bool>,
    value_is_null: FxHashMap<String, bool>,
    conditions: FxHashMap<String, bool>,
}

impl Facts {
    fn is_null(&self, value: &Value) -> Option<bool> {
        match value {
            Value::Null(_) => Some(true),
            Value::Local(var) => self.value_is_null.get(&var.name).copied(),
            _ => None,
        }
    }

    fn step(&mut self, instr: &Instr) {
        match instr {
            Instr::Store {
                value,
                ptr: Value::Local(slot),
            } => {
                // converted objects are taken to be non-null
                let null = self.is_null(value).unwrap_or(false);
                self.slot_is_null.insert(slot.name.clone(), null);
            }
            Instr::Load {
                dest,
                ptr: Value::Local(slot),
            } => {
                if let Some(&null) = self.slot_is_null.get(&slot.name) {
                    self.value_is_null.insert(dest.name.clone(), null);
                }
            }
            Instr::ICmp {
                dest,
                pred,
                left,
                right,
            } => {
                if let (Some(l), Some(r)) = (self.is_null(left), self.is_null(right)) {
                    if l || r {
                        let equal = l == r;
                        let holds = match pred {
                            IntPredicate::Eq => equal,
                            IntPredicate::Ne => !equal,
                        };
                        self.conditions.insert(dest.name.clone(), holds);
                    }
                }
            }
            _ => {}
        }
    }

    fn condition(&self, cond: &Value) -> Option<bool> {
        match cond {
            Value::Local(var) => self.conditions.get(&var.name).copied(),
            _ => None,
        }
    }
}

/// Every feasible path through `func`. Branches on the null-ness of stack
/// slots follow the stores seen earlier on the same path.
pub fn paths(func: &Function) -> Vec<ExecPath> {
    let mut out = Vec::new();
    walk(func, "entry", ExecPath::default(), Facts::default(), &mut out);
    out
}

fn walk(func: &Function, label: &str, mut path: ExecPath, mut facts: Facts, out: &mut Vec<ExecPath>) {
    assert!(!path.visits(label), "cycle through %{}", label);
    let block = func
        .block(label)
        .unwrap_or_else(|| panic!("no block %{}", label));
    path.blocks.push(label.to_string());
    for instr in &block.instructions {
        if let Some(callee) = instr.callee_name() {
            path.calls.push(callee.to_string());
        }
        facts.step(instr);
    }

    match &block.terminator {
        Some(Terminator::Ret(_)) => {
            path.returns = true;
            out.push(path);
        }
        Some(Terminator::Br(next)) => walk(func, next.as_str(), path, facts, out),
        Some(Terminator::CondBr {
            cond,
            then_to,
            else_to,
        }) => match facts.condition(cond) {
            Some(true) => walk(func, then_to.as_str(), path, facts, out),
            Some(false) => walk(func, else_to.as_str(), path, facts, out),
            None => {
                walk(func, then_to.as_str(), path.clone(), facts.clone(), out);
                walk(func, else_to.as_str(), path, facts, out);
            }
        },
        Some(Terminator::Invoke { normal, unwind, .. }) => {
            let callee = block.terminator.as_ref().and_then(Terminator::callee_name);
            if let Some(callee) = callee {
                path.calls.push(callee.to_string());
            }
            walk(func, normal.as_str(), path.clone(), facts.clone(), out);
            if let Some(callee) = callee {
                path.unwound.push(callee.to_string());
            }
            walk(func, unwind.as_str(), path, facts, out);
        }
        Some(Terminator::Unreachable) | None => out.push(path),
    }
}
