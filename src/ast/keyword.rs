//! Instruction and directive keywords.
//!
//! Keywords are matched case-insensitively. `BR` is special:
//! any word made of `BR` followed by some arrangement of the flag letters `n`, `z`, `p`
//! is a branch instruction (see [`lookup_instruction`]).

use super::format::Format;
use super::BranchFlags;

macro_rules! instructions {
    ($($Variant:ident = $name:literal, $word:literal, [$($fmt:ident),*]);* $(;)?) => {
        /// An instruction mnemonic.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum Instruction {
            $(
                #[doc = concat!("`", $name, "`")]
                $Variant
            ),*
        }

        impl Instruction {
            /// Every instruction mnemonic.
            pub const ALL: &'static [Instruction] = &[$(Instruction::$Variant),*];

            /// The canonical (upper-case) name of the mnemonic.
            pub fn name(self) -> &'static str {
                match self {
                    $(Instruction::$Variant => $name),*
                }
            }

            /// The fixed bits of the instruction word, before any operands are packed in.
            pub fn opcode_word(self) -> u16 {
                match self {
                    $(Instruction::$Variant => $word),*
                }
            }

            /// The argument shapes this instruction accepts.
            pub fn formats(self) -> &'static [Format] {
                match self {
                    $(Instruction::$Variant => &[$(Format::$fmt),*]),*
                }
            }
        }
    }
}

instructions! {
    Add   = "ADD",   0x1000, [RegRegReg, RegRegNum];
    And   = "AND",   0x5000, [RegRegReg, RegRegNum];
    Br    = "BR",    0x0000, [Branch];
    Jmp   = "JMP",   0xC000, [Reg, Addr];
    Jsr   = "JSR",   0x4800, [Addr];
    Jsrr  = "JSRR",  0x4000, [Reg];
    Ld    = "LD",    0x2000, [RegAddr];
    Ldi   = "LDI",   0xA000, [RegAddr];
    Ldr   = "LDR",   0x6000, [RegRegNum];
    Lea   = "LEA",   0xE000, [RegAddr];
    Not   = "NOT",   0x903F, [RegReg];
    Ret   = "RET",   0xC1C0, [Empty];
    Rti   = "RTI",   0x8000, [Empty];
    St    = "ST",    0x3000, [RegAddr];
    Sti   = "STI",   0xB000, [RegAddr];
    Str   = "STR",   0x7000, [RegRegNum];
    Trap  = "TRAP",  0xF000, [Vec];
    Getc  = "GETC",  0xF020, [Empty];
    Out   = "OUT",   0xF021, [Empty];
    Puts  = "PUTS",  0xF022, [Empty];
    In    = "IN",    0xF023, [Empty];
    Putsp = "PUTSP", 0xF024, [Empty];
    Halt  = "HALT",  0xF025, [Empty];
}

impl Instruction {
    /// Looks up a mnemonic by name (case-insensitive).
    ///
    /// This only matches the bare `BR`; use [`lookup_instruction`] to match flagged branches.
    pub fn from_name(word: &str) -> Option<Self> {
        Self::ALL.iter()
            .copied()
            .find(|i| i.name().eq_ignore_ascii_case(word))
    }
}
impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An assembler directive (written after a `.`).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Directive {
    /// `.ORIG`: starts an addressed region at the given address.
    Orig,
    /// `.FILL`: one word holding a value.
    Fill,
    /// `.BLKW`: a block of words, optionally filled with a value.
    Blkw,
    /// `.STRINGZ`: a null-terminated string, one character per word.
    Stringz,
    /// `.END`: closes the addressed region.
    End,
}
impl Directive {
    /// Every directive.
    pub const ALL: &'static [Directive] = &[
        Directive::Orig, Directive::Fill, Directive::Blkw, Directive::Stringz, Directive::End,
    ];

    /// The canonical (upper-case) name of the directive, without its period.
    pub fn name(self) -> &'static str {
        match self {
            Directive::Orig    => "ORIG",
            Directive::Fill    => "FILL",
            Directive::Blkw    => "BLKW",
            Directive::Stringz => "STRINGZ",
            Directive::End     => "END",
        }
    }

    /// Looks up a directive by name (case-insensitive, without its period).
    pub fn from_name(word: &str) -> Option<Self> {
        Self::ALL.iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(word))
    }

    /// The argument shapes this directive accepts.
    pub fn formats(self) -> &'static [Format] {
        match self {
            Directive::Orig    => &[Format::Num],
            Directive::Fill    => &[Format::Addr],
            Directive::Blkw    => &[Format::Num, Format::NumAddr],
            Directive::Stringz => &[Format::Str],
            Directive::End     => &[Format::Empty],
        }
    }

    /// Whether this directive occupies memory.
    pub fn is_memory(self) -> bool {
        matches!(self, Directive::Fill | Directive::Blkw | Directive::Stringz)
    }
}
impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".{}", self.name())
    }
}

/// Looks up an instruction mnemonic, including flagged branches.
///
/// Returns:
/// - `Ok(Some((instr, flags)))` if the word is an instruction. `flags` is only set for branches.
/// - `Ok(None)` if the word is not an instruction.
/// - `Err(c)` if the word is a branch whose flag letter `c` is repeated.
///
/// # Example
/// ```
/// use lc3_asm::ast::BranchFlags;
/// use lc3_asm::ast::keyword::{lookup_instruction, Instruction};
///
/// assert_eq!(lookup_instruction("add"), Ok(Some((Instruction::Add, None))));
/// assert_eq!(lookup_instruction("BRzp"), Ok(Some((Instruction::Br, Some(BranchFlags { n: false, z: true, p: true })))));
/// assert_eq!(lookup_instruction("BRANCH"), Ok(None));
/// assert_eq!(lookup_instruction("BRzz"), Err('z'));
/// ```
pub fn lookup_instruction(word: &str) -> Result<Option<(Instruction, Option<BranchFlags>)>, char> {
    if let Some(("BR" | "Br" | "bR" | "br", suffix)) = word.get(..2).map(|prefix| (prefix, &word[2..])) {
        if let Some(flags) = BranchFlags::parse_suffix(suffix)? {
            return Ok(Some((Instruction::Br, Some(flags))));
        }
    }

    Ok(Instruction::from_name(word).map(|i| (i, None)))
}

/// Whether a word is a keyword, and therefore can't be a label unless followed by a colon.
pub fn is_reserved(word: &str) -> bool {
    !matches!(lookup_instruction(word), Ok(None)) || Directive::from_name(word).is_some()
}

#[cfg(test)]
mod tests {
    use super::{is_reserved, lookup_instruction, Directive, Instruction};
    use crate::ast::format::Format;

    #[test]
    fn test_lookup_case_insensitive() {
        for &i in Instruction::ALL {
            assert_eq!(Instruction::from_name(i.name()), Some(i));
            assert_eq!(Instruction::from_name(&i.name().to_ascii_lowercase()), Some(i));
        }
        for &d in Directive::ALL {
            assert_eq!(Directive::from_name(&d.name().to_ascii_lowercase()), Some(d));
        }
        assert_eq!(Instruction::from_name("HALTS"), None);
        assert_eq!(Directive::from_name("ORIGIN"), None);
    }

    #[test]
    fn test_plain_br_is_nzp() {
        let (i, flags) = lookup_instruction("br").unwrap().unwrap();
        assert_eq!(i, Instruction::Br);
        assert_eq!(flags.map(|f| f.bits()), Some(0b111));
    }

    #[test]
    fn test_reserved() {
        assert!(is_reserved("add"));
        assert!(is_reserved("BRnp"));
        assert!(is_reserved("BRnn"));
        assert!(is_reserved("orig"));
        assert!(is_reserved("Stringz"));
        assert!(!is_reserved("LOOP"));
        assert!(!is_reserved("BRANCH"));
        assert!(!is_reserved("R0"));
        assert!(!is_reserved("B"));
    }

    #[test]
    fn test_opcode_words() {
        assert_eq!(Instruction::And.opcode_word(), 0x5000);
        assert_eq!(Instruction::Halt.opcode_word(), 0xF025);
        assert_eq!(Instruction::Not.opcode_word(), 0x903F);
        assert_eq!(Instruction::Ret.opcode_word(), 0xC1C0);
        assert_eq!(Instruction::Add.formats(), [Format::RegRegReg, Format::RegRegNum]);
        assert_eq!(Directive::Blkw.formats(), [Format::Num, Format::NumAddr]);
    }
}
