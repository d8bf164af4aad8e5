//! Boundary to whatever turns source text into a program image, plus a
//! small hex listing assembler so the studio can edit and reload images.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// What came out of an assembler run. Only an assembly with no diagnostics
/// is fit to be loaded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub program: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Assembly {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub trait Assembler {
    fn assemble(&mut self, name: &str, source: &[u8]) -> Assembly;
}

/// Assembles listings of hex bytes: `0x` prefix optional, whitespace or
/// commas between bytes, `;` and `#` comment to end of line.
///
/// ```text
/// ; top row of the test card
/// ff ff ff ff, 0xff 0xff 0xff 0xff
/// ```
#[derive(Debug, Default)]
pub struct HexAssembler;

impl HexAssembler {
    pub fn new() -> Self {
        HexAssembler
    }
}

impl Assembler for HexAssembler {
    fn assemble(&mut self, name: &str, source: &[u8]) -> Assembly {
        let mut out = Assembly::default();
        let text = String::from_utf8_lossy(source);

        for (n, line) in text.lines().enumerate() {
            let code = line.split([';', '#']).next().unwrap_or_default();
            for token in code
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
            {
                let digits = token
                    .strip_prefix("0x")
                    .or_else(|| token.strip_prefix("0X"))
                    .unwrap_or(token);
                match u8::from_str_radix(digits, 16) {
                    Ok(byte) if !digits.is_empty() && digits.len() <= 2 => out.program.push(byte),
                    _ => out.diagnostics.push(Diagnostic {
                        line: n + 1,
                        message: format!("'{}' is not a hex byte", token),
                    }),
                }
            }
        }

        if out.is_clean() {
            log::info!(target: "asm", "{}: {} bytes", name, out.program.len());
        } else {
            for d in &out.diagnostics {
                log::warn!(target: "asm", "{}: {}", name, d);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asm(source: &str) -> Assembly {
        HexAssembler::new().assemble("TEST", source.as_bytes())
    }

    #[test]
    fn test_plain_listing() {
        let a = asm("00 e0\n12 00\n");
        assert!(a.is_clean());
        assert_eq!(a.program, vec![0x00, 0xe0, 0x12, 0x00]);
    }

    #[test]
    fn test_prefixes_commas_and_comments() {
        let a = asm("; header\n0xFF,0x80 # tail\n\n  01,02;03");
        assert!(a.is_clean());
        assert_eq!(a.program, vec![0xff, 0x80, 0x01, 0x02]);
    }

    #[test]
    fn test_bad_tokens_are_reported_per_line() {
        let a = asm("ff\nzz 100\n0x\n");
        assert_eq!(a.program, vec![0xff]);
        let lines = a.diagnostics.iter().map(|d| d.line).collect::<Vec<_>>();
        assert_eq!(lines, vec![2, 2, 3]);
        assert_eq!(a.diagnostics[0].to_string(), "line 2: 'zz' is not a hex byte");
    }

    #[test]
    fn test_empty_source_is_clean_but_empty() {
        let a = asm("; nothing here\n");
        assert!(a.is_clean());
        assert!(a.program.is_empty());
    }
}
