//! Structural verification of encoded modules.
//!
//! Walks the code once to establish instruction boundaries, then checks
//! that every operand stays inside its table and every jump lands on a
//! boundary. The machine itself trusts the encoder; this pass exists so
//! encoder tests and debug builds can catch ABI drift early.

use std::collections::HashSet;

use super::module::Module;
use super::opcode::Opcode;

#[derive(Clone, Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("unassigned opcode {byte:#04x} at {at:#06x}")]
    InvalidOpcode { at: usize, byte: u8 },

    #[error("instruction at {at:#06x} runs past the end of code")]
    Truncated { at: usize },

    #[error("jump at {at:#06x} targets {target:#06x}, not an instruction boundary")]
    BadJumpTarget { at: usize, target: usize },

    #[error("set id {id} at {at:#06x} exceeds the charset table")]
    BadSetId { at: usize, id: u16 },

    #[error("string id {id} at {at:#06x} exceeds the string table")]
    BadStringId { at: usize, id: u16 },

    #[error("recovery for label {label} targets {addr:#06x}, not an instruction boundary")]
    BadRecoveryAddress { label: u16, addr: u16 },
}

/// Check structural well-formedness of a module.
pub fn verify(module: &Module) -> Result<(), VerifyError> {
    let code = &module.code;
    let mut boundaries = HashSet::new();
    let mut pc = 0;
    while pc < code.len() {
        boundaries.insert(pc);
        let op = Opcode::try_from_u8(code[pc])
            .ok_or(VerifyError::InvalidOpcode { at: pc, byte: code[pc] })?;
        if pc + op.size() > code.len() {
            return Err(VerifyError::Truncated { at: pc });
        }
        pc += op.size();
    }
    // One-past-the-end is a legal jump target (a trailing commit label).
    boundaries.insert(code.len());

    let mut pc = 0;
    while pc < code.len() {
        let op = Opcode::from_u8(code[pc]);
        if op.has_address() {
            let target = module.read_u16(pc + 1) as usize;
            if !boundaries.contains(&target) {
                return Err(VerifyError::BadJumpTarget { at: pc, target });
            }
        }
        match op {
            Opcode::Set | Opcode::Span => {
                let id = module.read_u16(pc + 1);
                if id as usize >= module.sets.len() {
                    return Err(VerifyError::BadSetId { at: pc, id });
                }
            }
            Opcode::Throw | Opcode::CapBegin => {
                let id = module.read_u16(pc + 1);
                if id as usize >= module.strs.len() {
                    return Err(VerifyError::BadStringId { at: pc, id });
                }
            }
            Opcode::CapNonTerm => {
                let id = module.read_u16(pc + 1);
                if id as usize >= module.strs.len() {
                    return Err(VerifyError::BadStringId { at: pc, id });
                }
            }
            _ => {}
        }
        pc += op.size();
    }

    for (&label, &addr) in &module.rxps {
        if !boundaries.contains(&(addr as usize)) {
            return Err(VerifyError::BadRecoveryAddress { label, addr });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_trivial_module() {
        let m = Module {
            // call 0x0004; halt; any; return
            code: vec![0x0f, 0x04, 0x00, 0x00, 0x01, 0x10],
            strs: vec![String::new()],
            ..Default::default()
        };
        verify(&m).unwrap();
    }

    #[test]
    fn rejects_misaligned_jump() {
        let m = Module {
            // jump into the middle of its own operand
            code: vec![0x12, 0x01, 0x00],
            ..Default::default()
        };
        assert!(matches!(
            verify(&m),
            Err(VerifyError::BadJumpTarget { .. })
        ));
    }

    #[test]
    fn rejects_out_of_table_set() {
        let m = Module {
            // set 3 with an empty charset table
            code: vec![0x06, 0x03, 0x00],
            ..Default::default()
        };
        assert!(matches!(verify(&m), Err(VerifyError::BadSetId { .. })));
    }

    #[test]
    fn rejects_truncated_instruction() {
        let m = Module {
            code: vec![0x02, 0x61], // char missing an operand byte
            ..Default::default()
        };
        assert!(matches!(verify(&m), Err(VerifyError::Truncated { .. })));
    }
}
