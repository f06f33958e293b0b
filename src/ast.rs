//! Components relating to the abstract syntax trees (ASTs)
//! used in representing assembly source.
//!
//! The tree itself is made of [`node::SyntaxTreeNode`]s. This module holds the
//! values that appear in the tree's payloads:
//! - [`Reg`]: a register operand,
//! - [`BranchFlags`]: the condition flags of a `BR` instruction,
//! - [`Offset`]: an operand checked against the bit width of the field it is encoded into.
//!
//! The keyword tables ([`keyword`]) and operand shapes ([`format`]) live in submodules.

pub mod node;
pub mod keyword;
pub mod format;

use std::fmt::Write as _;
use offset_base::OffsetBacking;

/// A register. Must be between 0 and 7.
///
/// ## Examples
///
/// ```text
/// AND R0, R0, #0
///     ~~  ~~
/// LDR R2, R6, #1
///     ~~  ~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(u8);

impl Reg {
    /// Creates a register from its number, if it is between 0 and 7.
    pub fn new(n: u8) -> Option<Self> {
        (n < 8).then_some(Reg(n))
    }

    /// Parses a register name (`R0`-`R7`, case-insensitive).
    ///
    /// ```
    /// use lc3_asm::ast::Reg;
    ///
    /// assert_eq!(Reg::parse("r5").map(Reg::reg_no), Some(5));
    /// assert_eq!(Reg::parse("R8"), None);
    /// assert_eq!(Reg::parse("R01"), None);
    /// ```
    pub fn parse(word: &str) -> Option<Self> {
        match word.as_bytes() {
            &[b'R' | b'r', n @ b'0'..=b'7'] => Some(Reg(n - b'0')),
            _ => None,
        }
    }

    /// Gets the register number of this [`Reg`]. This is always between 0 and 7.
    pub fn reg_no(self) -> u8 {
        self.0
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}
impl From<Reg> for u16 {
    fn from(value: Reg) -> Self {
        u16::from(value.0)
    }
}

/// The condition flags of a `BR` instruction.
///
/// The flags are written as a suffix to `BR` (e.g., `BRnz`).
/// Letters may appear in any order and case, but at most once each.
/// A bare `BR` is the same as `BRnzp`.
///
/// | instruction   | code (bin) |
/// |---------------|------------|
/// | `BRn`         | `100`      |
/// | `BRz`         | `010`      |
/// | `BRnz`        | `110`      |
/// | `BRp`         | `001`      |
/// | `BRnp`        | `101`      |
/// | `BRzp`        | `011`      |
/// | `BR`, `BRnzp` | `111`      |
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct BranchFlags {
    /// Branch if negative.
    pub n: bool,
    /// Branch if zero.
    pub z: bool,
    /// Branch if positive.
    pub p: bool,
}
impl BranchFlags {
    /// Every flag set (`BRnzp`).
    pub const ALL: BranchFlags = BranchFlags { n: true, z: true, p: true };

    /// Parses the suffix after `BR`.
    ///
    /// This returns `Ok(None)` if the suffix contains a character that isn't a flag letter
    /// (meaning the word is not a branch at all),
    /// and `Err` with the offending letter if a flag letter is repeated.
    ///
    /// ```
    /// use lc3_asm::ast::BranchFlags;
    ///
    /// assert_eq!(BranchFlags::parse_suffix(""), Ok(Some(BranchFlags::ALL)));
    /// assert_eq!(BranchFlags::parse_suffix("PZ"), Ok(Some(BranchFlags { n: false, z: true, p: true })));
    /// assert_eq!(BranchFlags::parse_suffix("nn"), Err('n'));
    /// assert_eq!(BranchFlags::parse_suffix("ANCH"), Ok(None));
    /// ```
    pub fn parse_suffix(suffix: &str) -> Result<Option<Self>, char> {
        if suffix.is_empty() {
            return Ok(Some(Self::ALL));
        }
        if !suffix.chars().all(|c| matches!(c, 'n' | 'z' | 'p' | 'N' | 'Z' | 'P')) {
            return Ok(None);
        }

        let mut flags = BranchFlags::default();
        for c in suffix.chars() {
            let flag = match c.to_ascii_lowercase() {
                'n' => &mut flags.n,
                'z' => &mut flags.z,
                _   => &mut flags.p,
            };
            if std::mem::replace(flag, true) {
                return Err(c);
            }
        }

        Ok(Some(flags))
    }

    /// The 3-bit condition code (`nzp`).
    pub fn bits(self) -> u16 {
        (u16::from(self.n) << 2) | (u16::from(self.z) << 1) | u16::from(self.p)
    }
}
impl std::fmt::Display for BranchFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.n { f.write_char('n')?; }
        if self.z { f.write_char('z')?; }
        if self.p { f.write_char('p')?; }
        Ok(())
    }
}

/// A value representing a signed offset or a signed immediate value.
///
/// `N` indicates the maximum bit size of this offset/immediate value.
///
/// ## Examples
///
/// `IOffset<5>` is used to represent `ADD`/`AND`'s imm5 operand:
///
/// ```text
/// AND R0, R0, #0
///             ~~
/// ```
///
/// `IOffset<9>` and `IOffset<11>` hold PC-relative offsets
/// once a target address has been resolved:
/// ```text
/// LD R0, VALUE
///        ~~~~~
/// JSR SUBROUTINE
///     ~~~~~~~~~~
/// ```
pub type IOffset<const N: u32> = Offset<i16, N>;
/// An unsigned 8-bit trap vector (used for `TRAP`).
///
/// ## Examples
///
/// ```text
/// TRAP x25
///      ~~~
/// ```
pub type TrapVect8 = Offset<u16, 8>;

/// A value which is known to fit in an `N`-bit field.
///
/// The `OFF` type represents the backing type of this offset.
/// The signedness of this offset type is dependent on the signedness of the `OFF` type:
/// - `Offset<i16, _>`: signed offset (also aliased as [`IOffset`])
/// - `Offset<u16, _>`: unsigned offset
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Offset<OFF, const N: u32>(OFF);

impl<OFF: std::fmt::Display, const N: u32> std::fmt::Display for Offset<OFF, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char('#')?;
        self.0.fmt(f)
    }
}

/// The errors that can result from calling [`Offset::new`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OffsetNewErr {
    /// The provided offset cannot fit an unsigned integer of the given bitsize.
    CannotFitUnsigned(u32),
    /// The provided offset cannot fit a signed integer of the given bitsize.
    CannotFitSigned(u32)
}
impl std::fmt::Display for OffsetNewErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetNewErr::CannotFitUnsigned(n) => write!(f, "value is too big for unsigned {n}-bit integer"),
            OffsetNewErr::CannotFitSigned(n) => write!(f, "value is too big for signed {n}-bit integer"),
        }
    }
}
impl std::error::Error for OffsetNewErr {}
impl crate::err::Error for OffsetNewErr {
    fn help(&self) -> Option<std::borrow::Cow<'_, str>> {
        let range = match *self {
            OffsetNewErr::CannotFitUnsigned(n) => format!("the range for an unsigned {n}-bit integer is [0, {}]", (1u32 << n) - 1),
            OffsetNewErr::CannotFitSigned(n) => format!("the range for a signed {n}-bit integer is [{}, {}]", -(1i32 << (n - 1)), (1i32 << (n - 1)) - 1),
        };

        Some(range.into())
    }
}

mod offset_base {
    use super::OffsetNewErr;

    /// Any type that could store a value for [`Offset`].
    ///
    /// [`Offset`]: super::Offset
    pub trait OffsetBacking: Copy + Eq {
        /// How many bits are contained within this backing.
        const BITS: u32;

        /// Sign- or zero-extends the low `bit_size` bits of this value.
        ///
        /// This bit size is always known to be at most BITS.
        fn truncate(self, bit_size: u32) -> Self;

        /// Reinterprets the value as a raw word.
        fn to_word(self) -> u16;

        /// The error to raise if a value does not survive truncation to `bit_size`.
        fn does_not_fit_error(bit_size: u32) -> OffsetNewErr;
    }

    macro_rules! impl_offset_backing_for_ints {
        ($($Int:ty: $Err:ident),*) => {
            $(
                impl OffsetBacking for $Int {
                    const BITS: u32 = Self::BITS;

                    fn truncate(self, bit_size: u32) -> Self {
                        let shift = Self::BITS - bit_size;
                        self.checked_shl(shift).map_or(0, |v| v >> shift)
                    }

                    fn to_word(self) -> u16 {
                        self as u16
                    }

                    fn does_not_fit_error(bit_size: u32) -> OffsetNewErr {
                        OffsetNewErr::$Err(bit_size)
                    }
                }
            )*
        }
    }
    impl_offset_backing_for_ints! {
        u16: CannotFitUnsigned,
        i16: CannotFitSigned
    }
}

impl<OFF: OffsetBacking, const N: u32> Offset<OFF, N> {
    /// Creates a new offset value.
    /// This must fit within `N` bits of the representation, otherwise an error is raised.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lc3_asm::ast::Offset;
    /// #
    /// // Signed:
    /// assert!(Offset::<i16, 5>::new(-16).is_ok());
    /// assert!(Offset::<i16, 5>::new(15).is_ok());
    /// assert!(Offset::<i16, 5>::new(16).is_err());
    ///
    /// // Unsigned:
    /// assert!(Offset::<u16, 8>::new(0x25).is_ok());
    /// assert!(Offset::<u16, 8>::new(0x100).is_err());
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is zero or larger than the offset backing (e.g., for backing `u16`, larger than 16).
    ///
    /// ```should_panic
    /// # use lc3_asm::ast::Offset;
    /// #
    /// let oh_no = Offset::<i16, 17>::new(18);
    /// ```
    pub fn new(n: OFF) -> Result<Self, OffsetNewErr> {
        assert!(0 < N && N <= OFF::BITS, "bit size {N} must be in 1..={}", OFF::BITS);
        match n == n.truncate(N) {
            true  => Ok(Offset(n)),
            false => Err(OFF::does_not_fit_error(N)),
        }
    }

    /// Gets the value of the offset.
    pub fn get(&self) -> OFF {
        self.0
    }

    /// The low `N` bits of the value, ready to be packed into an instruction word.
    ///
    /// ```
    /// # use lc3_asm::ast::IOffset;
    /// #
    /// let off = IOffset::<9>::new(-1).unwrap();
    /// assert_eq!(off.field_bits(), 0x1FF);
    /// ```
    pub fn field_bits(&self) -> u16 {
        let mask = u16::MAX >> (16 - N);
        self.0.to_word() & mask
    }
}
