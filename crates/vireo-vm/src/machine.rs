//! The parsing machine.
//!
//! A single unified stack holds backtrack, call and capture frames.
//! Captured tree nodes stream into a values log; every frame records a
//! watermark into that log, so failing back to a frame discards exactly
//! the values produced after it and committing keeps them without any
//! copying.

use std::collections::HashMap;

use vireo_bytecode::{Module, Opcode};
use vireo_core::{Expected, Range};

use crate::error::ParseError;
use crate::input::Input;
use crate::trace::{NoopTracer, Tracer};
use crate::tree::{ParseTree, TreeArena, TreeNode};

/// Expectation entries kept at the furthest failure position.
const MAX_EXPECTED: usize = 20;

/// Runtime knobs.
#[derive(Clone, Debug)]
pub struct MachineConfig {
    /// Collect expected-item hints at the furthest failure position.
    pub show_fails: bool,
    /// Capture string ids whose values are discarded at close
    /// (`Spacing` when space captures are disabled).
    pub suppressed: Vec<u16>,
    /// Per-label messages for throws and recovered error nodes.
    pub messages: HashMap<u16, String>,
}

impl MachineConfig {
    pub fn new() -> Self {
        Self {
            show_fails: true,
            suppressed: Vec::new(),
            messages: HashMap::new(),
        }
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One stack entry.
#[derive(Debug)]
enum Frame {
    /// Pushed by `choice`/`choice_pred`; restored on failure.
    Backtrack {
        pc: usize,
        cursor: usize,
        predicate: bool,
        mark: usize,
    },
    /// Pushed by `call` and by `throw` dispatching to a recovery rule.
    Call { ret: usize },
    /// Pushed by `cap_begin`; closed into a tree node by `cap_end` or
    /// `cap_return`.
    Capture { id: u16, start: usize, mark: usize },
}

/// A successful match: the borrowed tree and the bytes consumed.
#[derive(Debug)]
pub struct Match<'a> {
    pub tree: ParseTree<'a>,
    pub consumed: usize,
}

/// A reusable machine. The arena and stacks are recycled between
/// matches; the previous match's tree is invalidated by the next call.
#[derive(Debug)]
pub struct Machine {
    config: MachineConfig,
    arena: TreeArena,
    stack: Vec<Frame>,
    values: Vec<usize>,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            arena: TreeArena::new(),
            stack: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Match `input` against the module, producing a borrowed tree.
    pub fn exec<'a>(
        &'a mut self,
        module: &'a Module,
        input: &'a [u8],
    ) -> Result<Match<'a>, ParseError> {
        self.exec_with(module, input, &mut NoopTracer)
    }

    /// Match with a tracer. [`NoopTracer`] hooks compile away.
    pub fn exec_with<'a, T: Tracer>(
        &'a mut self,
        module: &'a Module,
        input: &'a [u8],
        tracer: &mut T,
    ) -> Result<Match<'a>, ParseError> {
        self.arena.clear();
        self.stack.clear();
        self.values.clear();

        let consumed = {
            let mut exec = Exec {
                module,
                config: &self.config,
                arena: &mut self.arena,
                stack: &mut self.stack,
                values: &mut self.values,
                input: Input::new(input),
                pc: 0,
                ffp: 0,
                predicate: false,
                expected: Vec::new(),
            };
            exec.run(tracer)?
        };

        let root = self.values.last().copied();
        Ok(Match {
            tree: ParseTree::new(&self.arena, &module.strs, input, root),
            consumed,
        })
    }
}

/// Per-match execution state.
struct Exec<'m, 's> {
    module: &'m Module,
    config: &'s MachineConfig,
    arena: &'s mut TreeArena,
    stack: &'s mut Vec<Frame>,
    values: &'s mut Vec<usize>,
    input: Input<'m>,
    pc: usize,
    /// Furthest failure position; non-decreasing within one match.
    ffp: usize,
    /// True while the innermost active backtrack frame came from
    /// `choice_pred`.
    predicate: bool,
    expected: Vec<Expected>,
}

impl<'m, 's> Exec<'m, 's> {
    fn run<T: Tracer>(&mut self, tracer: &mut T) -> Result<usize, ParseError> {
        if self.module.code.is_empty() {
            return Ok(0);
        }
        loop {
            let op = Opcode::from_u8(self.module.code[self.pc]);
            tracer.instruction(self.pc, op, self.input.pos());
            match op {
                Opcode::Halt => return Ok(self.input.pos()),

                Opcode::Any => match self.input.peek_rune() {
                    Some((_, width)) => {
                        self.input.seek(self.input.pos() + width);
                        self.pc += 1;
                    }
                    None => {
                        self.note_failure(&[Expected::Any]);
                        self.fail(tracer)?;
                    }
                },

                Opcode::Char | Opcode::Char32 => {
                    let (want, size) = if op == Opcode::Char {
                        (self.module.read_u16(self.pc + 1) as u32, 3)
                    } else {
                        (self.module.read_u32(self.pc + 1), 5)
                    };
                    let want =
                        char::from_u32(want).expect("invalid codepoint in bytecode");
                    match self.input.peek_rune() {
                        Some((r, width)) if r == want => {
                            self.input.seek(self.input.pos() + width);
                            self.pc += size;
                        }
                        _ => {
                            self.note_failure(&[Expected::Char(want)]);
                            self.fail(tracer)?;
                        }
                    }
                }

                Opcode::Range | Opcode::Range32 => {
                    let (lo, hi, size) = if op == Opcode::Range {
                        (
                            self.module.read_u16(self.pc + 1) as u32,
                            self.module.read_u16(self.pc + 3) as u32,
                            5,
                        )
                    } else {
                        (
                            self.module.read_u32(self.pc + 1),
                            self.module.read_u32(self.pc + 5),
                            9,
                        )
                    };
                    let lo = char::from_u32(lo).expect("invalid codepoint in bytecode");
                    let hi = char::from_u32(hi).expect("invalid codepoint in bytecode");
                    match self.input.peek_rune() {
                        Some((r, width)) if lo <= r && r <= hi => {
                            self.input.seek(self.input.pos() + width);
                            self.pc += size;
                        }
                        _ => {
                            self.note_failure(&[Expected::Range(lo, hi)]);
                            self.fail(tracer)?;
                        }
                    }
                }

                Opcode::Set => {
                    let id = self.module.read_u16(self.pc + 1) as usize;
                    match self.input.peek_byte() {
                        Some(b) if self.module.sets[id].has_byte(b) => {
                            self.input.seek(self.input.pos() + 1);
                            self.pc += 3;
                        }
                        _ => {
                            let items = self.module.sexp[id].clone();
                            self.note_failure(&items);
                            self.fail(tracer)?;
                        }
                    }
                }

                Opcode::Span => {
                    let id = self.module.read_u16(self.pc + 1) as usize;
                    let set = &self.module.sets[id];
                    while let Some(b) = self.input.peek_byte() {
                        if !set.has_byte(b) {
                            break;
                        }
                        self.input.seek(self.input.pos() + 1);
                    }
                    // A span never fails, but the equivalent set loop
                    // would have failed here; record the expectation so
                    // fusing the loop does not change error messages.
                    let items = self.module.sexp[id].clone();
                    self.note_failure(&items);
                    self.pc += 3;
                }

                Opcode::Fail => self.fail(tracer)?,

                Opcode::FailTwice => {
                    match self.stack.pop() {
                        Some(Frame::Backtrack { predicate, .. }) => {
                            self.predicate = predicate;
                        }
                        _ => panic!("fail_twice without a choice frame"),
                    }
                    self.fail(tracer)?;
                }

                Opcode::Choice | Opcode::ChoicePred => {
                    let target = self.module.read_u16(self.pc + 1) as usize;
                    self.stack.push(Frame::Backtrack {
                        pc: target,
                        cursor: self.input.pos(),
                        predicate: self.predicate,
                        mark: self.values.len(),
                    });
                    if op == Opcode::ChoicePred {
                        self.predicate = true;
                    }
                    self.pc += 3;
                }

                Opcode::Commit => {
                    match self.stack.pop() {
                        Some(Frame::Backtrack { predicate, .. }) => {
                            self.predicate = predicate;
                        }
                        _ => panic!("commit without a choice frame"),
                    }
                    self.pc = self.module.read_u16(self.pc + 1) as usize;
                }

                Opcode::PartialCommit => {
                    let pos = self.input.pos();
                    let len = self.values.len();
                    match self.stack.last_mut() {
                        Some(Frame::Backtrack { cursor, mark, .. }) => {
                            *cursor = pos;
                            *mark = len;
                        }
                        _ => panic!("partial_commit without a choice frame"),
                    }
                    self.pc = self.module.read_u16(self.pc + 1) as usize;
                }

                Opcode::BackCommit => {
                    match self.stack.pop() {
                        Some(Frame::Backtrack {
                            cursor, predicate, ..
                        }) => {
                            self.input.seek(cursor);
                            self.predicate = predicate;
                        }
                        _ => panic!("back_commit without a choice frame"),
                    }
                    self.pc = self.module.read_u16(self.pc + 1) as usize;
                }

                Opcode::Call => {
                    let target = self.module.read_u16(self.pc + 1) as usize;
                    self.stack.push(Frame::Call { ret: self.pc + 3 });
                    self.pc = target;
                }

                Opcode::Return => match self.stack.pop() {
                    Some(Frame::Call { ret }) => self.pc = ret,
                    _ => panic!("return without a call frame"),
                },

                Opcode::CapReturn => {
                    if !self.predicate {
                        self.close_capture(tracer);
                    }
                    match self.stack.pop() {
                        Some(Frame::Call { ret }) => self.pc = ret,
                        _ => panic!("cap_return without a call frame"),
                    }
                }

                Opcode::Jump => {
                    self.pc = self.module.read_u16(self.pc + 1) as usize;
                }

                Opcode::Throw => {
                    let label = self.module.read_u16(self.pc + 1);
                    if self.predicate {
                        self.fail(tracer)?;
                    } else if let Some(&addr) = self.module.rxps.get(&label) {
                        self.stack.push(Frame::Call { ret: self.pc + 3 });
                        self.pc = addr as usize;
                    } else {
                        return Err(self.throw_error(label));
                    }
                }

                Opcode::CapBegin => {
                    if !self.predicate {
                        let id = self.module.read_u16(self.pc + 1);
                        self.stack.push(Frame::Capture {
                            id,
                            start: self.input.pos(),
                            mark: self.values.len(),
                        });
                    }
                    self.pc += 3;
                }

                Opcode::CapEnd => {
                    if !self.predicate {
                        self.close_capture(tracer);
                    }
                    self.pc += 1;
                }

                Opcode::CapTerm => {
                    if !self.predicate {
                        let offset = self.module.read_u16(self.pc + 1) as usize;
                        let end = self.input.pos();
                        let id = self.arena.push(TreeNode::Str {
                            range: Range::new(end - offset, end),
                        });
                        self.values.push(id);
                    }
                    self.pc += 3;
                }

                Opcode::CapNonTerm => {
                    if !self.predicate {
                        let name = self.module.read_u16(self.pc + 1);
                        if !self.config.suppressed.contains(&name) {
                            let offset = self.module.read_u16(self.pc + 3) as usize;
                            let end = self.input.pos();
                            let range = Range::new(end - offset, end);
                            let leaf = self.arena.push(TreeNode::Str { range });
                            // Same rule as cap_end: a registered error
                            // label closes as an Error node.
                            let node = if self.module.is_error_label(name) {
                                self.arena.push(TreeNode::Error {
                                    label: name,
                                    message: self.config.messages.get(&name).cloned(),
                                    child: Some(leaf),
                                    range,
                                })
                            } else {
                                self.arena.push(TreeNode::Node {
                                    name,
                                    child: leaf,
                                    range,
                                })
                            };
                            self.values.push(node);
                            tracer.capture(name);
                        }
                    }
                    self.pc += 5;
                }
            }
        }
    }

    /// Unwind to the nearest backtrack frame, restoring its cursor,
    /// predicate flag and values watermark. Terminal error if the stack
    /// runs dry.
    fn fail<T: Tracer>(&mut self, tracer: &mut T) -> Result<(), ParseError> {
        tracer.fail(self.input.pos());
        loop {
            match self.stack.pop() {
                None => return Err(self.exhaustion_error()),
                Some(Frame::Backtrack {
                    pc,
                    cursor,
                    predicate,
                    mark,
                }) => {
                    self.values.truncate(mark);
                    self.input.seek(cursor);
                    self.predicate = predicate;
                    self.pc = pc;
                    tracer.backtrack(pc, cursor);
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    /// Record a single-character failure for FFP error reporting.
    ///
    /// Failures under a predicate are absorbed: neither the FFP nor the
    /// expected set moves. Whitespace expectations are dropped to keep
    /// messages readable.
    fn note_failure(&mut self, items: &[Expected]) {
        if self.predicate {
            return;
        }
        let at = self.input.pos();
        if at > self.ffp {
            self.ffp = at;
            self.expected.clear();
        } else if at < self.ffp {
            return;
        }
        if !self.config.show_fails {
            return;
        }
        for &item in items {
            if item.is_whitespace() || self.expected.contains(&item) {
                continue;
            }
            if self.expected.len() >= MAX_EXPECTED {
                break;
            }
            self.expected.push(item);
        }
    }

    /// Close the topmost capture frame into a tree node and append it
    /// to the values log.
    fn close_capture<T: Tracer>(&mut self, tracer: &mut T) {
        let Some(Frame::Capture { id, start, mark }) = self.stack.pop() else {
            panic!("capture stack corrupted");
        };
        let end = self.input.pos();
        let children = self.values.split_off(mark);

        if self.config.suppressed.contains(&id) {
            return;
        }

        let range = Range::new(start, end);
        let node = match children.len() {
            0 if end > start => Some(self.arena.push(TreeNode::Str { range })),
            0 => None,
            1 => Some(children[0]),
            _ => Some(self.arena.push(TreeNode::Seq { children, range })),
        };

        if self.module.is_error_label(id) {
            let message = self.config.messages.get(&id).cloned();
            let err = self.arena.push(TreeNode::Error {
                label: id,
                message,
                child: node,
                range,
            });
            self.values.push(err);
            tracer.capture(id);
        } else if id == 0 {
            if let Some(n) = node {
                self.values.push(n);
            }
        } else if let Some(n) = node {
            let wrapped = self.arena.push(TreeNode::Node {
                name: id,
                child: n,
                range,
            });
            self.values.push(wrapped);
            tracer.capture(id);
        }
    }

    /// Terminal error after the backtrack stack ran dry.
    fn exhaustion_error(&self) -> ParseError {
        ParseError {
            label: None,
            message: None,
            range: Range::new(self.ffp, self.ffp),
            expected: self.expected.clone(),
            found: self.input.rune_at(self.ffp),
            consumed: self.input.pos(),
        }
    }

    /// Terminal error for a throw with no registered recovery.
    fn throw_error(&self, label: u16) -> ParseError {
        let at = self.ffp.max(self.input.pos());
        ParseError {
            label: Some(self.module.str(label).to_string()),
            message: self.config.messages.get(&label).cloned(),
            range: Range::new(at, at),
            expected: self.expected.clone(),
            found: self.input.rune_at(at),
            consumed: self.input.pos(),
        }
    }
}
