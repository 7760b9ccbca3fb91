//! The encoder: abstract program to bytecode module.
//!
//! Two passes over the program. Pass one resolves every label to its
//! byte offset (labels emit nothing); pass two emits opcodes with
//! little-endian operands. Charsets deduplicate through their
//! canonical encoding, and each distinct set gets a precomputed
//! expected-item list for diagnostics. The encoder is deterministic:
//! identical programs produce byte-identical modules.

#[cfg(test)]
mod emit_tests;

use std::collections::HashMap;

use indexmap::IndexMap;

use vireo_bytecode::{Module, Opcode};
use vireo_core::Charset;

use crate::compile::{Inst, LabelId, Program};

/// Expected items precomputed per charset for error messages.
const EXPECTED_PER_SET: usize = 8;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EmitError {
    #[error("program exceeds the 16-bit address space ({0} bytes)")]
    ProgramTooLarge(usize),

    #[error("set/span charset contains non-ASCII codepoints")]
    NonAsciiSet,

    #[error("too many distinct charsets ({0})")]
    TooManySets(usize),
}

/// Encode a program into an executable module.
pub fn encode(program: &Program) -> Result<Module, EmitError> {
    let total = program.encoded_size();
    if total > u16::MAX as usize {
        return Err(EmitError::ProgramTooLarge(total));
    }

    // Pass 1: label offsets and instruction-index offsets.
    let mut labels: HashMap<LabelId, u16> = HashMap::new();
    let mut inst_offsets: Vec<u16> = Vec::with_capacity(program.code.len());
    let mut offset = 0usize;
    for inst in &program.code {
        inst_offsets.push(offset as u16);
        if let Inst::Label(label) = inst {
            labels.insert(*label, offset as u16);
        }
        offset += inst.size();
    }

    let mut module = Module {
        strs: program.strings.clone(),
        smap: program
            .strings_map
            .iter()
            .map(|(s, id)| (s.clone(), id.0))
            .collect(),
        ..Default::default()
    };

    // Pass 2: emit bytes.
    let mut sets: IndexMap<Vec<u8>, u16> = IndexMap::new();
    let mut emitter = Emitter {
        code: Vec::with_capacity(total),
        labels: &labels,
    };
    for inst in &program.code {
        emitter.emit(inst, &mut sets, &mut module)?;
    }
    module.code = emitter.code;

    for (id, entry) in &program.recovery {
        module.rxps.insert(id.0, labels[&entry.target]);
    }
    for (&index, &name) in &program.identifiers {
        module.labels.insert(inst_offsets[index], name.0);
    }

    debug_assert_eq!(module.code.len(), total);
    Ok(module)
}

struct Emitter<'a> {
    code: Vec<u8>,
    labels: &'a HashMap<LabelId, u16>,
}

impl Emitter<'_> {
    fn emit(
        &mut self,
        inst: &Inst,
        sets: &mut IndexMap<Vec<u8>, u16>,
        module: &mut Module,
    ) -> Result<(), EmitError> {
        match inst {
            Inst::Label(_) => {}
            Inst::Halt => self.op(Opcode::Halt),
            Inst::Any => self.op(Opcode::Any),
            Inst::Fail => self.op(Opcode::Fail),
            Inst::FailTwice => self.op(Opcode::FailTwice),
            Inst::Return => self.op(Opcode::Return),
            Inst::CapReturn => self.op(Opcode::CapReturn),
            Inst::CapEnd => self.op(Opcode::CapEnd),
            Inst::Char(c) => {
                let cp = *c as u32;
                if cp <= u16::MAX as u32 {
                    self.op(Opcode::Char);
                    self.u16(cp as u16);
                } else {
                    self.op(Opcode::Char32);
                    self.u32(cp);
                }
            }
            Inst::Range(lo, hi) => {
                let (lo, hi) = (*lo as u32, *hi as u32);
                if hi <= u16::MAX as u32 {
                    self.op(Opcode::Range);
                    self.u16(lo as u16);
                    self.u16(hi as u16);
                } else {
                    self.op(Opcode::Range32);
                    self.u32(lo);
                    self.u32(hi);
                }
            }
            Inst::Set(set) => {
                let id = self.set_id(set, sets, module)?;
                self.op(Opcode::Set);
                self.u16(id);
            }
            Inst::Span(set) => {
                let id = self.set_id(set, sets, module)?;
                self.op(Opcode::Span);
                self.u16(id);
            }
            Inst::Choice(l) => self.addr(Opcode::Choice, *l),
            Inst::ChoicePred(l) => self.addr(Opcode::ChoicePred, *l),
            Inst::Commit(l) => self.addr(Opcode::Commit, *l),
            Inst::PartialCommit(l) => self.addr(Opcode::PartialCommit, *l),
            Inst::BackCommit(l) => self.addr(Opcode::BackCommit, *l),
            Inst::Call(l) => self.addr(Opcode::Call, *l),
            Inst::Jump(l) => self.addr(Opcode::Jump, *l),
            Inst::Throw(s) => {
                self.op(Opcode::Throw);
                self.u16(s.0);
            }
            Inst::CapBegin(s) => {
                self.op(Opcode::CapBegin);
                self.u16(s.0);
            }
            Inst::CapTerm(offset) => {
                self.op(Opcode::CapTerm);
                self.u16(*offset);
            }
            Inst::CapNonTerm(s, offset) => {
                self.op(Opcode::CapNonTerm);
                self.u16(s.0);
                self.u16(*offset);
            }
        }
        Ok(())
    }

    fn op(&mut self, op: Opcode) {
        self.code.push(op as u8);
    }

    fn u16(&mut self, v: u16) {
        self.code.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.code.extend_from_slice(&v.to_le_bytes());
    }

    fn addr(&mut self, op: Opcode, label: LabelId) {
        let target = self.labels[&label];
        self.op(op);
        self.u16(target);
    }

    /// Deduplicate a charset through its canonical encoding.
    fn set_id(
        &mut self,
        set: &Charset,
        sets: &mut IndexMap<Vec<u8>, u16>,
        module: &mut Module,
    ) -> Result<u16, EmitError> {
        if !set.is_ascii() {
            return Err(EmitError::NonAsciiSet);
        }
        let key = set.encoded();
        if let Some(&id) = sets.get(&key) {
            return Ok(id);
        }
        if sets.len() >= u16::MAX as usize {
            return Err(EmitError::TooManySets(sets.len() + 1));
        }
        let id = sets.len() as u16;
        sets.insert(key, id);
        module.sets.push(set.clone());
        module.sexp.push(set.expected(EXPECTED_PER_SET));
        Ok(id)
    }
}
