//! Operand shapes of instructions and directives.
//!
//! Each instruction or directive accepts a fixed set of [`Format`]s.
//! A format is a list of [`Operand`] classes that the statement's arguments must match exactly.

use super::node::{NodeKind, SyntaxTreeNode};

/// The class of one operand.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Operand {
    /// A register.
    Reg,
    /// A numeric literal.
    Num,
    /// A string literal.
    Str,
    /// An address, given either as a numeric literal or as a label.
    Addr,
    /// The condition flags of a `BR` instruction.
    Flags,
}
impl Operand {
    /// Whether a node is a valid argument for this operand class.
    pub fn accepts(self, kind: &NodeKind) -> bool {
        matches!(
            (self, kind),
            (Operand::Reg, NodeKind::Register(_))
            | (Operand::Num, NodeKind::Number(_))
            | (Operand::Str, NodeKind::String(_))
            | (Operand::Addr, NodeKind::Number(_) | NodeKind::LabelRef)
            | (Operand::Flags, NodeKind::BranchFlags(_))
        )
    }
}
impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Reg   => f.write_str("REG"),
            Operand::Num   => f.write_str("NUM"),
            Operand::Str   => f.write_str("STRING"),
            Operand::Addr  => f.write_str("LABEL"),
            Operand::Flags => f.write_str("FLAGS"),
        }
    }
}

/// An argument shape.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Format {
    /// No arguments (`HALT`, `.END`).
    Empty,
    /// `JMP R2`
    Reg,
    /// `.ORIG x3000`
    Num,
    /// `.STRINGZ "hi"`
    Str,
    /// `JSR SUB`
    Addr,
    /// `BRnz LOOP` (flags come from the mnemonic)
    Branch,
    /// `TRAP x25`
    Vec,
    /// `.BLKW 2, #5`
    NumAddr,
    /// `NOT R0, R1`
    RegReg,
    /// `LD R0, VALUE`
    RegAddr,
    /// `ADD R0, R1, R2`
    RegRegReg,
    /// `ADD R0, R1, #-1`
    RegRegNum,
}
impl Format {
    /// The operand classes of this format, in argument order.
    pub fn operands(self) -> &'static [Operand] {
        use Operand::*;

        match self {
            Format::Empty     => &[],
            Format::Reg       => &[Reg],
            Format::Num       => &[Num],
            Format::Str       => &[Str],
            Format::Addr      => &[Addr],
            Format::Branch    => &[Flags, Addr],
            Format::Vec       => &[Num],
            Format::NumAddr   => &[Num, Addr],
            Format::RegReg    => &[Reg, Reg],
            Format::RegAddr   => &[Reg, Addr],
            Format::RegRegReg => &[Reg, Reg, Reg],
            Format::RegRegNum => &[Reg, Reg, Num],
        }
    }

    /// Whether the argument list matches this format exactly.
    pub fn matches(self, args: &[SyntaxTreeNode<'_>]) -> bool {
        let ops = self.operands();
        ops.len() == args.len()
            && ops.iter().zip(args).all(|(op, arg)| op.accepts(&arg.kind))
    }

    /// Writes this format as it would appear after the given mnemonic (e.g. `ADD REG, REG, NUM`).
    pub fn display_with<'a>(self, mnemonic: &'a str) -> impl std::fmt::Display + 'a {
        FormatDisplay { mnemonic, format: self }
    }
}

struct FormatDisplay<'a> {
    mnemonic: &'a str,
    format: Format,
}
impl std::fmt::Display for FormatDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic)?;

        // flags are part of the mnemonic, not an argument
        let mut args = self.format.operands().iter().filter(|&&op| op != Operand::Flags);
        if let Some(first) = args.next() {
            write!(f, " {first}")?;
            for op in args {
                write!(f, ", {op}")?;
            }
        }
        Ok(())
    }
}
