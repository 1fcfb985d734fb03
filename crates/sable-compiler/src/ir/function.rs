//! IR Functions
//!
//! Functions own their basic blocks and carry a cursor so emitters can append
//! instructions to the "current" block the way a builder would.

use super::block::BasicBlock;
use super::instr::{callee_return_type, CastOp, Instr, IntPredicate, Terminator};
use super::types::{FunctionType, Type};
use super::value::{FunctionRef, Label, Value, Var};
use rustc_hash::FxHashSet;

/// Symbol visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Linkage {
    #[default]
    External,
    Internal,
    Private,
}

impl Linkage {
    /// Keyword prefix used by the printer (empty for external)
    pub fn keyword(&self) -> &'static str {
        match self {
            Linkage::External => "",
            Linkage::Internal => "internal ",
            Linkage::Private => "private ",
        }
    }
}

/// Parameter attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamAttr {
    /// Hidden pointer to caller-allocated storage for an aggregate return
    StructRet,
}

/// A function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub attrs: Vec<ParamAttr>,
}

/// An IR function: a definition when it has blocks, a declaration otherwise
#[derive(Debug, Clone)]
pub struct Function {
    /// Symbol name
    pub name: String,
    /// Signature
    pub ty: FunctionType,
    /// Parameters (same length as `ty.params`)
    pub params: Vec<Param>,
    /// Visibility
    pub linkage: Linkage,
    /// Exception personality, required when the function has landing pads
    pub personality: Option<Value>,
    /// Basic blocks in layout order
    pub blocks: Vec<BasicBlock>,
    current: usize,
    next_var: u32,
    labels: FxHashSet<String>,
}

impl Function {
    /// Create a definition with an empty `entry` block.
    ///
    /// Parameters beyond `names` are named `p<N>`.
    pub fn new(name: impl Into<String>, ty: FunctionType, names: &[&str]) -> Self {
        let params = ty
            .params
            .iter()
            .enumerate()
            .map(|(i, t)| Param {
                name: names
                    .get(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("p{}", i)),
                ty: t.clone(),
                attrs: Vec::new(),
            })
            .collect();
        let mut func = Self {
            name: name.into(),
            ty,
            params,
            linkage: Linkage::External,
            personality: None,
            blocks: Vec::new(),
            current: 0,
            next_var: 0,
            labels: FxHashSet::default(),
        };
        func.new_block("entry");
        func
    }

    /// Create a declaration (no body)
    pub fn declaration(fref: &FunctionRef) -> Self {
        let mut func = Self::new(fref.name.clone(), fref.ty.clone(), &[]);
        func.blocks.clear();
        func.labels.clear();
        func
    }

    /// Check if this function has no body
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Reference to this function
    pub fn fn_ref(&self) -> FunctionRef {
        FunctionRef::new(self.name.clone(), self.ty.clone())
    }

    /// Parameter `i` as an operand
    pub fn param(&self, i: usize) -> Value {
        let p = &self.params[i];
        Var::new(p.name.clone(), p.ty.clone()).value()
    }

    /// All parameters as operands
    pub fn param_values(&self) -> Vec<Value> {
        (0..self.params.len()).map(|i| self.param(i)).collect()
    }

    /// Attach an attribute to parameter `i`
    pub fn set_param_attr(&mut self, i: usize, attr: ParamAttr) {
        if !self.params[i].attrs.contains(&attr) {
            self.params[i].attrs.push(attr);
        }
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// Append a new block with a label derived from `hint`
    pub fn new_block(&mut self, hint: &str) -> Label {
        let mut name = hint.to_string();
        let mut n = 1;
        while self.labels.contains(&name) {
            name = format!("{}.{}", hint, n);
            n += 1;
        }
        self.labels.insert(name.clone());
        let label = Label(name);
        self.blocks.push(BasicBlock::new(label.clone()));
        label
    }

    /// Move the cursor to `label`
    pub fn switch_to(&mut self, label: &Label) {
        if let Some(idx) = self.blocks.iter().position(|b| &b.label == label) {
            self.current = idx;
        }
    }

    /// Label of the block under the cursor
    pub fn current_label(&self) -> Label {
        self.blocks[self.current].label.clone()
    }

    /// Get a block by label
    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label.as_str() == label)
    }

    /// Fresh SSA variable
    pub fn new_var(&mut self, ty: Type) -> Var {
        let var = Var::new(format!("t{}", self.next_var), ty);
        self.next_var += 1;
        var
    }

    /// Append an instruction to the current block
    pub fn add(&mut self, instr: Instr) {
        self.blocks[self.current].instructions.push(instr);
    }

    /// Terminate the current block
    pub fn terminate(&mut self, term: Terminator) {
        let block = &mut self.blocks[self.current];
        debug_assert!(block.terminator.is_none(), "block {} terminated twice", block.label);
        block.terminator = Some(term);
    }

    // ------------------------------------------------------------------
    // Instruction helpers
    // ------------------------------------------------------------------

    /// Direct call; returns the result unless the callee returns void
    pub fn call(&mut self, callee: &FunctionRef, args: Vec<Value>) -> Option<Value> {
        self.call_value(callee.value(), args)
    }

    /// Call through a function pointer value
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Option<Value> {
        let ret = callee_return_type(&callee);
        let dest = (ret != Type::Void).then(|| self.new_var(ret));
        let result = dest.as_ref().map(|d| d.value());
        self.add(Instr::Call { dest, callee, args });
        result
    }

    /// Call that unwinds to `unwind`; the cursor moves to the fresh
    /// continuation block.
    pub fn invoke(&mut self, callee: &FunctionRef, args: Vec<Value>, unwind: &Label) -> Option<Value> {
        self.invoke_value(callee.value(), args, unwind)
    }

    /// `invoke` through a function pointer value
    pub fn invoke_value(&mut self, callee: Value, args: Vec<Value>, unwind: &Label) -> Option<Value> {
        let ret = callee_return_type(&callee);
        let dest = (ret != Type::Void).then(|| self.new_var(ret));
        let result = dest.as_ref().map(|d| d.value());
        let normal = self.new_block("ok");
        self.terminate(Terminator::Invoke {
            dest,
            callee,
            args,
            normal: normal.clone(),
            unwind: unwind.clone(),
        });
        self.switch_to(&normal);
        result
    }

    /// `invoke` when an unwind target is given, plain `call` otherwise
    pub fn call_or_invoke(
        &mut self,
        callee: &FunctionRef,
        args: Vec<Value>,
        unwind: Option<&Label>,
    ) -> Option<Value> {
        match unwind {
            Some(unwind) => self.invoke(callee, args, unwind),
            None => self.call(callee, args),
        }
    }

    pub fn load(&mut self, ptr: Value) -> Value {
        let ty = ptr.ty().pointee().cloned().unwrap_or(Type::I8);
        let dest = self.new_var(ty);
        let result = dest.value();
        self.add(Instr::Load { dest, ptr });
        result
    }

    pub fn store(&mut self, value: Value, ptr: Value) {
        self.add(Instr::Store { value, ptr });
    }

    /// Stack slot for a value of type `ty`; returns its address
    pub fn alloca(&mut self, ty: Type) -> Value {
        let dest = self.new_var(ty.ptr());
        let result = dest.value();
        self.add(Instr::Alloca { dest });
        result
    }

    pub fn cast(&mut self, op: CastOp, value: Value, ty: Type) -> Value {
        let dest = self.new_var(ty);
        let result = dest.value();
        self.add(Instr::Cast { dest, op, value });
        result
    }

    pub fn bitcast(&mut self, value: Value, ty: Type) -> Value {
        self.cast(CastOp::Bitcast, value, ty)
    }

    /// Address of field `index` (of type `field_ty`) of the structure at `base`
    pub fn field_ptr(&mut self, base: Value, index: u32, field_ty: Type) -> Value {
        let dest = self.new_var(field_ty.ptr());
        let result = dest.value();
        self.add(Instr::FieldPtr { dest, base, index });
        result
    }

    /// `base + offset` on an `i8*`
    pub fn byte_ptr(&mut self, base: Value, offset: Value) -> Value {
        let dest = self.new_var(Type::i8_ptr());
        let result = dest.value();
        self.add(Instr::BytePtr { dest, base, offset });
        result
    }

    pub fn icmp(&mut self, pred: IntPredicate, left: Value, right: Value) -> Value {
        let dest = self.new_var(Type::I1);
        let result = dest.value();
        self.add(Instr::ICmp {
            dest,
            pred,
            left,
            right,
        });
        result
    }

    pub fn phi(&mut self, ty: Type, incoming: Vec<(Value, Label)>) -> Value {
        let dest = self.new_var(ty);
        let result = dest.value();
        self.add(Instr::Phi { dest, incoming });
        result
    }

    pub fn landing_pad(&mut self) -> Value {
        let dest = self.new_var(Instr::landing_pad_type());
        let result = dest.value();
        self.add(Instr::LandingPad { dest });
        result
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.terminate(Terminator::Ret(value));
    }

    pub fn br(&mut self, target: &Label) {
        self.terminate(Terminator::Br(target.clone()));
    }

    pub fn cond_br(&mut self, cond: Value, then_to: &Label, else_to: &Label) {
        self.terminate(Terminator::CondBr {
            cond,
            then_to: then_to.clone(),
            else_to: else_to.clone(),
        });
    }

    pub fn unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of direct calls and invokes of `callee` anywhere in the body
    pub fn call_count(&self, callee: &str) -> usize {
        self.blocks
            .iter()
            .map(|b| {
                let calls = b
                    .instructions
                    .iter()
                    .filter(|i| i.callee_name() == Some(callee))
                    .count();
                let invokes = b
                    .terminator
                    .as_ref()
                    .filter(|t| t.callee_name() == Some(callee))
                    .is_some() as usize;
                calls + invokes
            })
            .sum()
    }

    /// Total instruction count (terminators excluded)
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }

    /// Validate the function structure
    pub fn validate(&self) -> Result<(), String> {
        if self.is_declaration() {
            return Ok(());
        }

        for block in &self.blocks {
            if !block.is_terminated() {
                return Err(format!("Block {} is not terminated", block.label.as_str()));
            }
            for succ in block.successors() {
                if self.block(succ.as_str()).is_none() {
                    return Err(format!(
                        "Block {} references non-existent successor {}",
                        block.label.as_str(),
                        succ.as_str()
                    ));
                }
            }
            if block.is_landing_pad() && self.personality.is_none() {
                return Err(format!(
                    "Block {} is a landing pad but the function has no personality",
                    block.label.as_str()
                ));
            }
        }

        Ok(())
    }
}
