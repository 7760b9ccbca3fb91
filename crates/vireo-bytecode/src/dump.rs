//! Human-readable module dump for debugging and tests.

use std::fmt::Write as _;

use super::module::Module;
use super::opcode::Opcode;

/// Render a disassembly of the module: string and charset tables,
/// recovery entries, then the code listing with definition labels.
pub fn dump(module: &Module) -> String {
    let mut out = String::new();

    if !module.strs.is_empty() {
        out.push_str("strings:\n");
        for (i, s) in module.strs.iter().enumerate() {
            let _ = writeln!(out, "  S{i} {s:?}");
        }
    }

    if !module.sets.is_empty() {
        out.push_str("sets:\n");
        for (i, set) in module.sets.iter().enumerate() {
            let _ = writeln!(out, "  X{i} {set}");
        }
    }

    if !module.rxps.is_empty() {
        out.push_str("recovery:\n");
        for (&label, &addr) in &module.rxps {
            let _ = writeln!(out, "  {} -> {addr:04x}", module.str(label));
        }
    }

    out.push_str("code:\n");
    let mut pc = 0;
    while pc < module.code.len() {
        if let Some(&name) = module.labels.get(&(pc as u16)) {
            let _ = writeln!(out, "{}:", module.str(name));
        }
        let op = Opcode::from_u8(module.code[pc]);
        let _ = write!(out, "  {pc:04x}  {}", op.name());
        match op {
            Opcode::Char => {
                let cp = module.read_u16(pc + 1) as u32;
                let _ = write!(out, " {}", quoted(cp));
            }
            Opcode::Char32 => {
                let cp = module.read_u32(pc + 1);
                let _ = write!(out, " {}", quoted(cp));
            }
            Opcode::Range => {
                let lo = module.read_u16(pc + 1) as u32;
                let hi = module.read_u16(pc + 3) as u32;
                let _ = write!(out, " {}-{}", quoted(lo), quoted(hi));
            }
            Opcode::Range32 => {
                let lo = module.read_u32(pc + 1);
                let hi = module.read_u32(pc + 5);
                let _ = write!(out, " {}-{}", quoted(lo), quoted(hi));
            }
            Opcode::Set | Opcode::Span => {
                let _ = write!(out, " X{}", module.read_u16(pc + 1));
            }
            Opcode::Throw | Opcode::CapBegin => {
                let id = module.read_u16(pc + 1);
                let _ = write!(out, " {:?}", module.str(id));
            }
            Opcode::CapTerm => {
                let _ = write!(out, " {}", module.read_u16(pc + 1));
            }
            Opcode::CapNonTerm => {
                let id = module.read_u16(pc + 1);
                let off = module.read_u16(pc + 3);
                let _ = write!(out, " {:?} {off}", module.str(id));
            }
            op if op.has_address() => {
                let _ = write!(out, " {:04x}", module.read_u16(pc + 1));
            }
            _ => {}
        }
        out.push('\n');
        pc += op.size();
    }

    out
}

/// Quote a codepoint the way the grammar surface would write it.
fn quoted(cp: u32) -> String {
    match char::from_u32(cp) {
        Some('\n') => "'\\n'".to_string(),
        Some('\t') => "'\\t'".to_string(),
        Some('\r') => "'\\r'".to_string(),
        Some('\'') => "'\\''".to_string(),
        Some('\\') => "'\\\\'".to_string(),
        Some(c) if !c.is_control() => format!("'{c}'"),
        _ => format!("'\\u{{{cp:04x}}}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn dumps_a_minimal_program() {
        let mut labels = IndexMap::new();
        labels.insert(4u16, 1u16);
        let module = Module {
            // call 0x0004; halt; G: char 'a'; return
            code: vec![0x0f, 0x04, 0x00, 0x00, 0x02, 0x61, 0x00, 0x10],
            strs: vec![String::new(), "G".to_string()],
            labels,
            ..Default::default()
        };
        let text = dump(&module);
        assert_eq!(
            text,
            "strings:\n  S0 \"\"\n  S1 \"G\"\ncode:\n  0000  call 0004\n  0003  halt\nG:\n  0004  char 'a'\n  0007  return\n"
        );
    }
}
