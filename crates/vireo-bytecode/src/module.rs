//! The encoded bytecode module.

use indexmap::IndexMap;

use vireo_core::{Charset, Expected};

/// Output of the encoder: linear code plus the tables the machine and
/// the disassembler consult.
///
/// Immutable after construction; one module may back any number of
/// concurrently running machines.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Linear bytecode: single-byte opcodes, little-endian operands.
    pub code: Vec<u8>,
    /// String table. Entry 0 is the empty-string sentinel used by
    /// anonymous captures.
    pub strs: Vec<String>,
    /// Name to string-table index.
    pub smap: IndexMap<String, u16>,
    /// Distinct charsets referenced by `set`/`span`, in first-use order.
    pub sets: Vec<Charset>,
    /// Per-set precomputed expected items for diagnostics.
    pub sexp: Vec<Vec<Expected>>,
    /// Recovery table: label string id to bytecode address.
    pub rxps: IndexMap<u16, u16>,
    /// Definition entry addresses to their name ids (disassembly only).
    pub labels: IndexMap<u16, u16>,
}

impl Module {
    /// Read a little-endian u16 operand.
    ///
    /// # Panics
    /// Panics if `at + 2` exceeds the code; the encoder never emits a
    /// truncated operand.
    #[inline]
    pub fn read_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.code[at], self.code[at + 1]])
    }

    /// Read a little-endian u32 operand.
    #[inline]
    pub fn read_u32(&self, at: usize) -> u32 {
        u32::from_le_bytes([
            self.code[at],
            self.code[at + 1],
            self.code[at + 2],
            self.code[at + 3],
        ])
    }

    /// Resolve a string id.
    #[inline]
    pub fn str(&self, id: u16) -> &str {
        &self.strs[id as usize]
    }

    /// Look up the id of an interned string.
    pub fn str_id(&self, name: &str) -> Option<u16> {
        self.smap.get(name).copied()
    }

    /// Whether a string id names a registered recovery label.
    #[inline]
    pub fn is_error_label(&self, id: u16) -> bool {
        self.rxps.contains_key(&id)
    }

    /// Identity of the module contents. Identical compilations of the
    /// same grammar produce identical checksums.
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.code);
        for s in &self.strs {
            hasher.update(s.as_bytes());
            hasher.update(&[0]);
        }
        for set in &self.sets {
            hasher.update(&set.encoded());
            hasher.update(&[0xff]);
        }
        for (&label, &addr) in &self.rxps {
            hasher.update(&label.to_le_bytes());
            hasher.update(&addr.to_le_bytes());
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_tracks_content() {
        let mut m = Module::default();
        m.code = vec![0x00];
        let a = m.checksum();
        assert_eq!(a, m.checksum());
        m.code.push(0x01);
        assert_ne!(a, m.checksum());
    }

    #[test]
    fn operand_reads() {
        let m = Module {
            code: vec![0x0f, 0x34, 0x12, 0x78, 0x56, 0x00, 0x00],
            ..Default::default()
        };
        assert_eq!(m.read_u16(1), 0x1234);
        assert_eq!(m.read_u32(3), 0x5678);
    }
}
