//! Execution tracing.
//!
//! The machine is generic over a [`Tracer`]; the default [`NoopTracer`]
//! has empty hooks that compile away entirely.

use vireo_bytecode::Opcode;

/// Hooks into machine execution, for debugging and tests.
#[allow(unused_variables)]
pub trait Tracer {
    /// Called before every dispatched instruction.
    fn instruction(&mut self, pc: usize, op: Opcode, cursor: usize) {}

    /// Called when an opcode enters the fail state.
    fn fail(&mut self, cursor: usize) {}

    /// Called after unwinding to a backtrack frame.
    fn backtrack(&mut self, pc: usize, cursor: usize) {}

    /// Called when a capture closes into a tree node.
    fn capture(&mut self, id: u16) {}
}

/// Tracer that does nothing.
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Tracer that collects one line per event, for tests and the
/// occasional debugging session.
#[derive(Debug, Default)]
pub struct CollectingTracer {
    pub lines: Vec<String>,
}

impl CollectingTracer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tracer for CollectingTracer {
    fn instruction(&mut self, pc: usize, op: Opcode, cursor: usize) {
        self.lines
            .push(format!("{pc:04x} {} @{cursor}", op.name()));
    }

    fn fail(&mut self, cursor: usize) {
        self.lines.push(format!("fail @{cursor}"));
    }

    fn backtrack(&mut self, pc: usize, cursor: usize) {
        self.lines.push(format!("backtrack {pc:04x} @{cursor}"));
    }

    fn capture(&mut self, id: u16) {
        self.lines.push(format!("capture S{id}"));
    }
}
