//! Parsing assembly source code into an AST.
//!
//! This module is used to convert strings (which represent assembly source code)
//! into a syntax tree ([`SyntaxTreeNode`]).
//!
//! The parser notably consists of:
//! - [`lex`]: the tokenizer, which classifies source text into tokens,
//! - [`combinator`]: a small engine of composable grammar rules,
//! - [`grammar`]: the grammar of LC-3 assembly, built from those rules,
//! - [`parse_ast`]: the entry point, which runs the grammar over a source file.
//!
//! # Example
//! ```
//! use lc3_asm::err::Diagnostics;
//! use lc3_asm::parse::parse_ast;
//!
//! let src = "
//!     .orig x3000
//!     LOOP: BR LOOP
//!     .end
//! ";
//! let mut diag = Diagnostics::new();
//! let root = parse_ast(src, &mut diag, None).unwrap();
//!
//! // .orig, LOOP, BR, .end
//! assert_eq!(root.children.len(), 4);
//! ```

pub mod lex;
pub mod combinator;
pub mod grammar;

use std::borrow::Cow;

use slog::{debug, o, Discard, Logger};

use crate::ast::keyword::Directive;
use crate::ast::node::SyntaxTreeNode;
use crate::err::{Diagnostics, StageFailed};

use self::combinator::{ParseContext, ParseState};
use self::lex::{SourceLocation, TokenKind};

/// Kinds of errors that can occur from parsing assembly code.
///
/// See [`ParseErr`] for this error type with location information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ParseErrKind {
    /// A required grammar element was not found.
    UnexpectedToken {
        /// A description of what could have been here.
        expected: String,
        /// What was actually here.
        found: TokenKind,
    },
    /// A word in instruction position is not an instruction.
    UnknownInstruction(String),
    /// A word after a period is not a directive.
    UnknownDirective(String),
    /// A `BR` flag letter appears more than once.
    RepeatedBranchFlag(char),
    /// A decimal literal has characters other than digits.
    InvalidNumber,
    /// A numeric literal does not fit in 16 bits.
    NumberTooLarge,
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::UnknownInstruction(word) => write!(f, "unknown instruction `{word}`"),
            Self::UnknownDirective(word)   => write!(f, "unknown directive `.{word}`"),
            Self::RepeatedBranchFlag(c)    => write!(f, "branch flag `{c}` appears more than once"),
            Self::InvalidNumber            => f.write_str("invalid decimal literal"),
            Self::NumberTooLarge           => f.write_str("numeric literal does not fit in 16 bits"),
        }
    }
}

/// Error from parsing assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseErr<'s> {
    /// The kind of error.
    pub kind: ParseErrKind,
    /// Where the error occurred.
    pub location: SourceLocation<'s>,
}
impl<'s> ParseErr<'s> {
    /// Creates a new [`ParseErr`].
    pub fn new(kind: ParseErrKind, location: SourceLocation<'s>) -> Self {
        ParseErr { kind, location }
    }
}
impl std::fmt::Display for ParseErr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for ParseErr<'_> {}
impl crate::err::Error for ParseErr<'_> {
    fn location(&self) -> Option<SourceLocation<'_>> {
        Some(self.location)
    }

    fn help(&self) -> Option<Cow<'_, str>> {
        match &self.kind {
            ParseErrKind::UnexpectedToken { found: TokenKind::Unknown, .. } => Some("this character does not occur in any token in LC-3 assembly".into()),
            ParseErrKind::UnexpectedToken { expected, .. } if expected == "end of line" => Some("a line holds at most one statement, and operands are separated by commas".into()),
            ParseErrKind::UnexpectedToken { .. } => None,
            ParseErrKind::UnknownInstruction(_) => Some("a line can only start with one label".into()),
            ParseErrKind::UnknownDirective(_) => {
                let names: Vec<_> = Directive::ALL.iter().map(|d| d.to_string()).collect();
                Some(format!("valid directives are {}", names.join(", ")).into())
            },
            ParseErrKind::RepeatedBranchFlag(_) => Some("each of n, z, and p can appear at most once after BR".into()),
            ParseErrKind::InvalidNumber  => Some("a decimal literal only consists of digits 0-9".into()),
            ParseErrKind::NumberTooLarge => Some(format!("a literal's magnitude can be at most {} (x{:X})", u16::MAX, u16::MAX).into()),
        }
    }
}

/// Parses a source file into a syntax tree.
///
/// Every syntax error in the file is reported into `diag`.
/// The tree is only produced if there were none.
pub fn parse_ast<'s>(
    src: &'s str,
    diag: &mut Diagnostics,
    logger: impl Into<Option<Logger>>
) -> Result<SyntaxTreeNode<'s>, StageFailed> {
    let logger = logger
        .into()
        .unwrap_or(Logger::root(Discard, o!()))
        .new(o!("stage" => "parse"));

    let mut ctx = ParseContext::new(src);
    let state = grammar::document().parse(&mut ctx);
    if state != ParseState::Success && ctx.errors().is_empty() {
        let found = ctx.peek();
        let kind = ParseErrKind::UnexpectedToken { expected: TokenKind::End.to_string(), found: found.kind };
        ctx.fail(kind, found);
    }

    let (nodes, errors) = ctx.finish();
    for e in &errors {
        diag.error(e);
    }

    let root = SyntaxTreeNode::root(nodes);
    debug!(logger, "parsed source";
        "statements" => root.children.len(),
        "nodes" => root.size(),
        "errors" => errors.len()
    );

    match errors.len() {
        0 => Ok(root),
        n => Err(StageFailed { errors: n }),
    }
}
