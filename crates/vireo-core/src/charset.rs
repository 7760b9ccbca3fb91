//! Codepoint sets as tiered bitmaps.
//!
//! A [`Charset`] is sized to the largest codepoint added to it: ASCII
//! (128 bits), Latin-1 (256), the BMP (64 Ki) or the full Unicode range.
//! Membership is a single bit test; the canonical [`Charset::encoded`]
//! form doubles as a deduplication key during bytecode emission.

use serde::{Deserialize, Serialize};

/// Capacity tiers, in bits.
const TIERS: [u32; 4] = [0x80, 0x100, 0x1_0000, 0x11_0000];

/// A set of Unicode codepoints backed by a bitmap.
#[derive(Clone, Debug, Default)]
pub struct Charset {
    words: Vec<u64>,
}

impl Charset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from individual characters.
    pub fn of(chars: impl IntoIterator<Item = char>) -> Self {
        let mut set = Self::new();
        for r in chars {
            set.add(r);
        }
        set
    }

    /// Number of bits the bitmap currently covers.
    fn capacity(&self) -> u32 {
        (self.words.len() * 64) as u32
    }

    /// Grow to the smallest tier that covers `cp`.
    fn grow_for(&mut self, cp: u32) {
        if cp < self.capacity() {
            return;
        }
        let tier = TIERS
            .iter()
            .copied()
            .find(|&t| cp < t)
            .expect("codepoint beyond Unicode range");
        self.words.resize((tier as usize).div_ceil(64), 0);
    }

    /// Add a single codepoint.
    pub fn add(&mut self, r: char) {
        let cp = r as u32;
        self.grow_for(cp);
        self.words[(cp / 64) as usize] |= 1 << (cp % 64);
    }

    /// Add every codepoint in `[lo, hi]`, inclusive.
    ///
    /// # Panics
    /// Panics on an inverted range (`lo > hi`).
    pub fn add_range(&mut self, lo: char, hi: char) {
        assert!(lo <= hi, "inverted character range: {lo:?} > {hi:?}");
        self.grow_for(hi as u32);
        for cp in lo as u32..=hi as u32 {
            // The surrogate gap is not representable as `char`; skip it.
            if (0xD800..0xE000).contains(&cp) {
                continue;
            }
            self.words[(cp / 64) as usize] |= 1 << (cp % 64);
        }
    }

    /// Merge another set into this one.
    pub fn union(&mut self, other: &Charset) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (dst, src) in self.words.iter_mut().zip(&other.words) {
            *dst |= src;
        }
    }

    /// O(1) membership test.
    #[inline]
    pub fn has(&self, r: char) -> bool {
        let cp = r as u32;
        if cp >= self.capacity() {
            return false;
        }
        self.words[(cp / 64) as usize] & (1 << (cp % 64)) != 0
    }

    /// Membership test for a raw byte (used by the `set`/`span` opcodes,
    /// which are restricted to ASCII sets).
    #[inline]
    pub fn has_byte(&self, b: u8) -> bool {
        (b as usize) < self.words.len() * 64
            && self.words[(b / 64) as usize] & (1 << (b % 64)) != 0
    }

    /// Whether the set contains no codepoints.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Whether every member is below 128.
    pub fn is_ascii(&self) -> bool {
        self.words
            .iter()
            .enumerate()
            .all(|(i, &w)| i < 2 || w == 0)
    }

    /// Canonical byte encoding: little-endian words with trailing zero
    /// bytes trimmed. Equal sets encode identically regardless of the
    /// tier they grew through, so this doubles as a map key.
    pub fn encoded(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self
            .words
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        bytes
    }

    /// Iterate over maximal runs of consecutive members.
    fn runs(&self) -> Vec<(u32, u32)> {
        let mut runs = Vec::new();
        let mut current: Option<(u32, u32)> = None;
        for (i, &word) in self.words.iter().enumerate() {
            if word == 0 {
                continue;
            }
            for bit in 0..64 {
                if word & (1 << bit) == 0 {
                    continue;
                }
                let cp = (i * 64) as u32 + bit;
                match current {
                    Some((lo, hi)) if hi + 1 == cp => current = Some((lo, cp)),
                    Some(run) => {
                        runs.push(run);
                        current = Some((cp, cp));
                    }
                    None => current = Some((cp, cp)),
                }
            }
        }
        if let Some(run) = current {
            runs.push(run);
        }
        runs
    }

    /// Precompute at most `max` [`Expected`] items for diagnostics, so
    /// error messages never have to walk the bitmap at match time.
    pub fn expected(&self, max: usize) -> Vec<Expected> {
        self.runs()
            .into_iter()
            .take(max)
            .filter_map(|(lo, hi)| {
                let lo = char::from_u32(lo)?;
                let hi = char::from_u32(hi)?;
                Some(if lo == hi {
                    Expected::Char(lo)
                } else {
                    Expected::Range(lo, hi)
                })
            })
            .collect()
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.encoded() == other.encoded()
    }
}

impl Eq for Charset {}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (lo, hi) in self.runs() {
            let (lo, hi) = match (char::from_u32(lo), char::from_u32(hi)) {
                (Some(lo), Some(hi)) => (lo, hi),
                _ => continue,
            };
            if lo == hi {
                write!(f, "{}", EscapedChar(lo))?;
            } else {
                write!(f, "{}-{}", EscapedChar(lo), EscapedChar(hi))?;
            }
        }
        write!(f, "]")
    }
}

/// One item a failed match was prepared to accept; collected at the
/// furthest failure position to seed error messages.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Expected {
    Char(char),
    Range(char, char),
    /// Any codepoint (the `.` expression failed at end of input).
    Any,
}

impl Expected {
    /// Whitespace expectations are noise in error messages.
    pub fn is_whitespace(&self) -> bool {
        match self {
            Expected::Char(c) => matches!(c, ' ' | '\t' | '\r' | '\n'),
            _ => false,
        }
    }
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Char(c) => write!(f, "'{}'", EscapedChar(*c)),
            Expected::Range(lo, hi) => {
                write!(f, "'{}'-'{}'", EscapedChar(*lo), EscapedChar(*hi))
            }
            Expected::Any => write!(f, "any character"),
        }
    }
}

/// Prints a character with control characters escaped.
struct EscapedChar(char);

impl std::fmt::Display for EscapedChar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            '\n' => write!(f, "\\n"),
            '\t' => write!(f, "\\t"),
            '\r' => write!(f, "\\r"),
            '\\' => write!(f, "\\\\"),
            c if c.is_control() => write!(f, "\\u{{{:04x}}}", c as u32),
            c => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_and_ranges() {
        let mut set = Charset::new();
        set.add_range('0', '9');
        set.add('_');
        assert!(set.has('0'));
        assert!(set.has('5'));
        assert!(set.has('_'));
        assert!(!set.has('a'));
        assert!(set.has_byte(b'7'));
        assert!(!set.has_byte(b'x'));
    }

    #[test]
    #[should_panic(expected = "inverted character range")]
    fn inverted_range_panics() {
        let mut set = Charset::new();
        set.add_range('z', 'a');
    }

    #[test]
    fn tier_growth() {
        let mut set = Charset::new();
        set.add('a');
        assert_eq!(set.words.len(), 2); // ASCII tier
        set.add('é');
        assert_eq!(set.words.len(), 4); // Latin-1 tier
        set.add('λ');
        assert_eq!(set.words.len(), 1024); // BMP tier
        set.add('𐍈');
        assert_eq!(set.words.len(), 0x11_0000 / 64); // full range
        assert!(set.has('a'));
        assert!(set.has('𐍈'));
    }

    #[test]
    fn encoding_is_tier_independent() {
        let mut small = Charset::new();
        small.add('a');
        let mut big = Charset::new();
        big.add('𐍈');
        big.add('a');
        // Force `big` to have grown, then compare only the 'a' content.
        let mut shrunk = Charset::new();
        shrunk.add('a');
        assert_eq!(small.encoded(), shrunk.encoded());
        assert_ne!(small.encoded(), big.encoded());
        assert_eq!(small, shrunk);
    }

    #[test]
    fn union_merges() {
        let mut a = Charset::of(['a', 'b']);
        let b = Charset::of(['y', 'z']);
        a.union(&b);
        assert!(a.has('a') && a.has('z'));
    }

    #[test]
    fn ascii_detection() {
        assert!(Charset::of(['a', '~']).is_ascii());
        assert!(!Charset::of(['é']).is_ascii());
    }

    #[test]
    fn expected_collapses_runs() {
        let mut set = Charset::new();
        set.add_range('0', '9');
        set.add('x');
        assert_eq!(
            set.expected(8),
            vec![Expected::Range('0', '9'), Expected::Char('x')]
        );
        assert_eq!(set.expected(1), vec![Expected::Range('0', '9')]);
    }

    #[test]
    fn display_form() {
        let mut set = Charset::new();
        set.add_range('a', 'z');
        set.add('_');
        assert_eq!(set.to_string(), "[_a-z]");
    }
}
