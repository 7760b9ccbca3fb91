//! The abstract program: compiler output, encoder input.

use indexmap::IndexMap;

use vireo_core::Charset;

/// A compiler-scoped jump label. Labels are allocated per compiler
/// instance so concurrent compilations stay isolated and reproducible.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LabelId(pub u32);

/// Index into the program string table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StrId(pub u16);

impl StrId {
    /// The empty-string sentinel used by anonymous captures.
    pub const EMPTY: StrId = StrId(0);
}

/// Abstract instructions. Addresses are labels; the encoder resolves
/// them to byte offsets. Charsets are carried by value and deduplicated
/// during encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    /// Emits no bytes; marks a jump target.
    Label(LabelId),
    Halt,
    Any,
    Char(char),
    Range(char, char),
    Set(Charset),
    Span(Charset),
    Fail,
    FailTwice,
    Choice(LabelId),
    ChoicePred(LabelId),
    Commit(LabelId),
    PartialCommit(LabelId),
    BackCommit(LabelId),
    Call(LabelId),
    Return,
    CapReturn,
    Jump(LabelId),
    Throw(StrId),
    CapBegin(StrId),
    CapEnd,
    CapTerm(u16),
    CapNonTerm(StrId, u16),
}

impl Inst {
    /// Encoded size in bytes. Codepoints above `u16` widen to the `*32`
    /// opcode forms.
    pub fn size(&self) -> usize {
        match self {
            Inst::Label(_) => 0,
            Inst::Halt
            | Inst::Any
            | Inst::Fail
            | Inst::FailTwice
            | Inst::Return
            | Inst::CapReturn
            | Inst::CapEnd => 1,
            Inst::Char(c) => {
                if (*c as u32) <= u16::MAX as u32 {
                    3
                } else {
                    5
                }
            }
            Inst::Range(_, hi) => {
                if (*hi as u32) <= u16::MAX as u32 {
                    5
                } else {
                    9
                }
            }
            Inst::Set(_)
            | Inst::Span(_)
            | Inst::Choice(_)
            | Inst::ChoicePred(_)
            | Inst::Commit(_)
            | Inst::PartialCommit(_)
            | Inst::BackCommit(_)
            | Inst::Call(_)
            | Inst::Jump(_)
            | Inst::Throw(_)
            | Inst::CapBegin(_)
            | Inst::CapTerm(_) => 3,
            Inst::CapNonTerm(..) => 5,
        }
    }
}

/// Recovery registration for one error label.
///
/// `precedence` is recorded for forward compatibility; the machine
/// does not consult it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoveryEntry {
    pub target: LabelId,
    pub precedence: u16,
}

/// Compiler output: abstract code plus the tables the encoder folds
/// into the bytecode module.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub code: Vec<Inst>,
    /// Entry 0 is the empty-string sentinel.
    pub strings: Vec<String>,
    pub strings_map: IndexMap<String, StrId>,
    /// Instruction index of each definition's first instruction, to its
    /// name. Feeds the disassembler.
    pub identifiers: IndexMap<usize, StrId>,
    /// Error label to recovery rule.
    pub recovery: IndexMap<StrId, RecoveryEntry>,
    /// Registered source file paths, by file id.
    pub source_files: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        let mut program = Self::default();
        program.strings.push(String::new());
        program.strings_map.insert(String::new(), StrId::EMPTY);
        program
    }

    /// Intern a string, returning its stable id.
    pub fn intern(&mut self, s: &str) -> StrId {
        if let Some(&id) = self.strings_map.get(s) {
            return id;
        }
        let id = StrId(self.strings.len() as u16);
        self.strings.push(s.to_string());
        self.strings_map.insert(s.to_string(), id);
        id
    }

    pub fn str(&self, id: StrId) -> &str {
        &self.strings[id.0 as usize]
    }

    /// Total encoded size in bytes.
    pub fn encoded_size(&self) -> usize {
        self.code.iter().map(Inst::size).sum()
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, inst) in self.code.iter().enumerate() {
            if let Some(&name) = self.identifiers.get(&index) {
                writeln!(f, "{}:", self.str(name))?;
            }
            match inst {
                Inst::Label(l) => writeln!(f, "L{}:", l.0)?,
                Inst::Halt => writeln!(f, "  halt")?,
                Inst::Any => writeln!(f, "  any")?,
                Inst::Char(c) => writeln!(f, "  char {c:?}")?,
                Inst::Range(lo, hi) => writeln!(f, "  range {lo:?}-{hi:?}")?,
                Inst::Set(set) => writeln!(f, "  set {set}")?,
                Inst::Span(set) => writeln!(f, "  span {set}")?,
                Inst::Fail => writeln!(f, "  fail")?,
                Inst::FailTwice => writeln!(f, "  fail_twice")?,
                Inst::Choice(l) => writeln!(f, "  choice L{}", l.0)?,
                Inst::ChoicePred(l) => writeln!(f, "  choice_pred L{}", l.0)?,
                Inst::Commit(l) => writeln!(f, "  commit L{}", l.0)?,
                Inst::PartialCommit(l) => writeln!(f, "  partial_commit L{}", l.0)?,
                Inst::BackCommit(l) => writeln!(f, "  back_commit L{}", l.0)?,
                Inst::Call(l) => writeln!(f, "  call L{}", l.0)?,
                Inst::Return => writeln!(f, "  return")?,
                Inst::CapReturn => writeln!(f, "  cap_return")?,
                Inst::Jump(l) => writeln!(f, "  jump L{}", l.0)?,
                Inst::Throw(s) => writeln!(f, "  throw {:?}", self.str(*s))?,
                Inst::CapBegin(s) => writeln!(f, "  cap_begin {:?}", self.str(*s))?,
                Inst::CapEnd => writeln!(f, "  cap_end")?,
                Inst::CapTerm(off) => writeln!(f, "  cap_term {off}")?,
                Inst::CapNonTerm(s, off) => {
                    writeln!(f, "  cap_non_term {:?} {off}", self.str(*s))?
                }
            }
        }
        Ok(())
    }
}
