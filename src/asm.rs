//! Assembling LC-3 source code into object images.
//!
//! Assembly runs as a sequence of stages over the syntax tree:
//! 1. [`parse`](crate::parse::parse_ast): source text into a syntax tree,
//! 2. [`analyze`]: checks operand shapes and addressed regions,
//! 3. [`symbol`]: assigns addresses to labels,
//! 4. [`encode`]: packs each statement into machine words.
//!
//! Each stage reports every problem it finds into a [`Diagnostics`] collector.
//! If a stage finds errors, the remaining stages are skipped.
//!
//! The assembler module notably consists of:
//! - [`assemble`] and [`assemble_with_logger`]: the main functions, which run every stage,
//! - [`ObjectImage`]: the assembled words,
//! - [`encoding`]: formats to read and write object images.

pub mod analyze;
pub mod pc;
pub mod symbol;
pub mod encode;
pub mod encoding;

use std::borrow::Cow;

use slog::{info, o, Discard, Logger};

use crate::ast::keyword::Directive;
use crate::ast::OffsetNewErr;
use crate::err::{Diagnostics, StageFailed};
use crate::parse::lex::SourceLocation;
use crate::parse::parse_ast;

/// Assembles source code into an object image.
///
/// Errors and warnings are recorded in `diag`.
///
/// # Example
/// ```
/// use lc3_asm::asm::assemble;
/// use lc3_asm::err::Diagnostics;
///
/// let src = "
///     .orig x3000
///     AND R0, R0, #0
///     .end
/// ";
/// let mut diag = Diagnostics::new();
/// let image = assemble(src, &mut diag).unwrap();
/// assert_eq!(image.words(), [0x3000, 0x5020]);
/// ```
pub fn assemble(src: &str, diag: &mut Diagnostics) -> Result<ObjectImage, AssembleErr> {
    assemble_with_logger(src, diag, None)
}

/// Assembles source code into an object image, logging each stage's progress to `logger`.
pub fn assemble_with_logger<L>(src: &str, diag: &mut Diagnostics, logger: L) -> Result<ObjectImage, AssembleErr>
    where L: Into<Option<Logger>>
{
    let logger = logger
        .into()
        .unwrap_or(Logger::root(Discard, o!()));

    let mut root = parse_ast(src, diag, logger.clone())
        .map_err(|e| AssembleErr::new(Stage::Parse, e))?;
    analyze::analyze(&mut root, diag, logger.clone())
        .map_err(|e| AssembleErr::new(Stage::Analyze, e))?;
    let symbols = symbol::SymbolTable::build(&root, diag, logger.clone())
        .map_err(|e| AssembleErr::new(Stage::ResolveSymbols, e))?;
    let image = encode::encode(&root, &symbols, diag, logger.clone())
        .map_err(|e| AssembleErr::new(Stage::Encode, e))?;

    info!(logger, "assembled";
        "words" => image.len(),
        "labels" => symbols.len(),
        "warnings" => diag.warning_count()
    );
    Ok(image)
}

/// The stages of assembly.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Stage {
    /// Converting source into a syntax tree.
    Parse,
    /// Checking operand shapes and addressed regions.
    Analyze,
    /// Assigning addresses to labels.
    ResolveSymbols,
    /// Packing statements into words.
    Encode,
}
impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Parse          => f.write_str("parsing"),
            Stage::Analyze        => f.write_str("analysis"),
            Stage::ResolveSymbols => f.write_str("symbol resolution"),
            Stage::Encode         => f.write_str("encoding"),
        }
    }
}

/// Error from assembling, naming the stage that failed.
///
/// The individual errors are recorded in the [`Diagnostics`] passed to [`assemble`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct AssembleErr {
    /// The stage which failed.
    pub stage: Stage,
    /// How many errors the stage found.
    pub errors: usize,
}
impl AssembleErr {
    fn new(stage: Stage, failed: StageFailed) -> Self {
        AssembleErr { stage, errors: failed.errors }
    }
}
impl std::fmt::Display for AssembleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors {
            1 => write!(f, "{} failed with 1 error", self.stage),
            n => write!(f, "{} failed with {n} errors", self.stage),
        }
    }
}
impl std::error::Error for AssembleErr {}

/// Kinds of errors that can occur from assembling a syntax tree.
///
/// See [`AsmErr`] for this error type with location information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// An instruction appears outside of an `.orig`/`.end` block (analysis).
    InstrOutsideRegion,
    /// A directive which occupies memory appears outside of an `.orig`/`.end` block (analysis).
    MemoryOutsideRegion(Directive),
    /// There was an `.orig` opened inside another `.orig` (analysis).
    NestedOrig,
    /// There was an `.end` but no corresponding `.orig` (analysis).
    UnopenedEnd,
    /// There was an `.orig` but no corresponding `.end` (analysis, warning).
    UnclosedOrig,
    /// The arguments of a statement match none of its formats (analysis).
    NoMatchingFormat {
        /// The mnemonic or directive, as written.
        name: String,
        /// The valid formats, written out.
        candidates: Vec<String>,
    },
    /// A label was defined more than once (symbol resolution).
    DuplicateLabel {
        /// The label.
        name: String,
        /// The line of the first definition.
        first_line: usize,
    },
    /// A label was referenced but never defined (symbol resolution).
    UndefinedLabel(String),
    /// A label is not followed by anything occupying memory (symbol resolution).
    UnaddressedLabel(String),
    /// A PC-relative offset does not fit its field (encoding).
    OffsetOutOfRange(i32, OffsetNewErr),
    /// A literal operand does not fit its field (encoding).
    ImmOutOfRange(i32, OffsetNewErr),
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InstrOutsideRegion     => f.write_str("instruction is not inside an .orig/.end block"),
            Self::MemoryOutsideRegion(d) => write!(f, "{d} is not inside an .orig/.end block"),
            Self::NestedOrig             => f.write_str("cannot have an .orig inside another region"),
            Self::UnopenedEnd            => f.write_str(".end does not have associated .orig"),
            Self::UnclosedOrig           => f.write_str(".orig directive was never closed"),
            Self::NoMatchingFormat { name, .. } => write!(f, "invalid operands for {name}"),
            Self::DuplicateLabel { name, .. }   => write!(f, "label `{name}` was defined multiple times"),
            Self::UndefinedLabel(name)   => write!(f, "label `{name}` is not defined"),
            Self::UnaddressedLabel(name) => write!(f, "label `{name}` does not point to any memory"),
            Self::OffsetOutOfRange(off, e) => write!(f, "offset {off} does not fit in {} field", field_desc(*e)),
            Self::ImmOutOfRange(val, e)    => write!(f, "value {val} does not fit in {} field", field_desc(*e)),
        }
    }
}
fn field_desc(e: OffsetNewErr) -> String {
    match e {
        OffsetNewErr::CannotFitSigned(n)   => format!("a signed {n}-bit"),
        OffsetNewErr::CannotFitUnsigned(n) => format!("an unsigned {n}-bit"),
    }
}

/// Error from assembling a syntax tree.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr<'s> {
    /// The kind of error.
    pub kind: AsmErrKind,
    /// Where in source the error occurred.
    pub location: Option<SourceLocation<'s>>,
}
impl<'s> AsmErr<'s> {
    /// Creates a new [`AsmErr`].
    pub fn new(kind: AsmErrKind, location: Option<SourceLocation<'s>>) -> Self {
        AsmErr { kind, location }
    }
}
impl std::fmt::Display for AsmErr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for AsmErr<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AsmErrKind::OffsetOutOfRange(_, e) | AsmErrKind::ImmOutOfRange(_, e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for AsmErr<'_> {
    fn location(&self) -> Option<SourceLocation<'_>> {
        self.location
    }

    fn help(&self) -> Option<Cow<'_, str>> {
        match &self.kind {
            AsmErrKind::InstrOutsideRegion     => Some("try moving this statement inside of an .orig/.end block".into()),
            AsmErrKind::MemoryOutsideRegion(_) => Some("try moving this statement inside of an .orig/.end block".into()),
            AsmErrKind::NestedOrig             => Some("try adding an .end directive at the end of the outer .orig block".into()),
            AsmErrKind::UnopenedEnd            => Some("try adding an .orig directive at the beginning of this block".into()),
            AsmErrKind::UnclosedOrig           => Some("try adding an .end directive at the end of this block".into()),
            AsmErrKind::NoMatchingFormat { candidates, .. } => {
                let list: Vec<_> = candidates.iter().map(|c| format!("`{c}`")).collect();
                Some(format!("valid formats are: {}", list.join(", ")).into())
            },
            AsmErrKind::DuplicateLabel { first_line, .. } => Some(format!("first defined on line {first_line}; labels must be unique within a file").into()),
            AsmErrKind::UndefinedLabel(_)      => Some("try defining this label before an instruction or directive".into()),
            AsmErrKind::UnaddressedLabel(_)    => Some("try moving this label before an instruction or memory directive".into()),
            AsmErrKind::OffsetOutOfRange(_, e) => {
                let range = crate::err::Error::help(e).unwrap_or_default();
                Some(format!("the target is too far from this instruction; {range}").into())
            },
            AsmErrKind::ImmOutOfRange(_, e)    => crate::err::Error::help(e),
        }
    }
}

/// An assembled program: a flat stream of 16-bit words.
///
/// Each `.ORIG` block contributes its load address, followed by its contents.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct ObjectImage {
    words: Vec<u16>,
}
impl ObjectImage {
    /// Creates an image from its words.
    pub fn new(words: Vec<u16>) -> Self {
        ObjectImage { words }
    }

    /// The words of the image.
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Takes the words of the image.
    pub fn into_words(self) -> Vec<u16> {
        self.words
    }

    /// The number of words in the image.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the image has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
