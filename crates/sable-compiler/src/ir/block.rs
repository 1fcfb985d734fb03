//! Basic Blocks
//!
//! A labelled instruction sequence with a single terminator.

use super::instr::{Instr, Terminator};
use super::value::Label;

/// A basic block
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Block label (unique within its function)
    pub label: Label,
    /// Instructions (excluding the terminator)
    pub instructions: Vec<Instr>,
    /// How this block exits; `None` until the block is finished
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    /// Create a new empty block
    pub fn new(label: Label) -> Self {
        Self {
            label,
            instructions: Vec::new(),
            terminator: None,
        }
    }

    /// Check if this block has a terminator
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    /// Get the number of instructions (excluding terminator)
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if this block has no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Successor labels
    pub fn successors(&self) -> Vec<&Label> {
        self.terminator
            .as_ref()
            .map(|t| t.successors())
            .unwrap_or_default()
    }

    /// Check if the block begins with a landing pad
    pub fn is_landing_pad(&self) -> bool {
        matches!(self.instructions.first(), Some(Instr::LandingPad { .. }))
    }
}
