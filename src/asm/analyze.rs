//! Validating a parsed syntax tree.
//!
//! This pass checks two things about each statement:
//! - that it is legal where it is (instructions and memory directives must be inside an `.orig`/`.end` block),
//! - that its arguments match one of its [`Format`]s.
//!
//! The matched format of each instruction is recorded in the tree for the encoder.

use slog::{debug, o, trace, Discard, Logger};

use crate::ast::format::Format;
use crate::ast::keyword::Directive;
use crate::ast::node::{NodeKind, SyntaxTreeNode};
use crate::err::{Diagnostics, StageFailed};

use super::{AsmErr, AsmErrKind};

/// Analyzes the statements of a syntax tree.
///
/// Every problem is reported into `diag`. An `.orig` which is never closed is only a warning.
pub fn analyze(
    root: &mut SyntaxTreeNode<'_>,
    diag: &mut Diagnostics,
    logger: impl Into<Option<Logger>>
) -> Result<(), StageFailed> {
    let logger = logger
        .into()
        .unwrap_or(Logger::root(Discard, o!()))
        .new(o!("stage" => "analyze"));

    let errors_before = diag.error_count();
    // index of the .orig of the current block
    let mut open_orig: Option<usize> = None;

    for (i, node) in root.children.iter_mut().enumerate() {
        let location = node.location();
        let SyntaxTreeNode { kind, children, token } = node;
        let children: &[SyntaxTreeNode<'_>] = children;

        match kind {
            NodeKind::Directive(d) => {
                let d = *d;
                match d {
                    Directive::Orig if open_orig.is_some() => diag.error(&AsmErr::new(AsmErrKind::NestedOrig, location)),
                    Directive::Orig => open_orig = Some(i),
                    Directive::End if open_orig.is_none() => diag.error(&AsmErr::new(AsmErrKind::UnopenedEnd, location)),
                    Directive::End => open_orig = None,
                    _ if open_orig.is_none() => diag.error(&AsmErr::new(AsmErrKind::MemoryOutsideRegion(d), location)),
                    _ => {}
                }

                if !d.formats().iter().any(|f| f.matches(children)) {
                    diag.error(&AsmErr::new(no_matching_format(&d.to_string(), d.formats()), location));
                }
            },
            NodeKind::Instruction(data) => {
                if open_orig.is_none() {
                    diag.error(&AsmErr::new(AsmErrKind::InstrOutsideRegion, location));
                }

                let formats = data.opcode.formats();
                match formats.iter().copied().find(|f| f.matches(children)) {
                    Some(format) => {
                        trace!(logger, "matched format";
                            "line" => location.map_or(0, |l| l.line),
                            "opcode" => %data.opcode,
                            "format" => ?format
                        );
                        data.format = Some(format);
                    },
                    None => {
                        let name = token.map_or(data.opcode.name(), |t| t.text);
                        diag.error(&AsmErr::new(no_matching_format(name, formats), location));
                    }
                }
            },
            _ => {}
        }
    }

    if let Some(i) = open_orig {
        diag.warning(&AsmErr::new(AsmErrKind::UnclosedOrig, root.children[i].location()));
    }

    debug!(logger, "analyzed statements";
        "statements" => root.children.len(),
        "errors" => diag.error_count() - errors_before
    );
    StageFailed::check(diag, errors_before)
}

pub(super) fn no_matching_format(name: &str, formats: &[Format]) -> AsmErrKind {
    AsmErrKind::NoMatchingFormat {
        name: name.to_string(),
        candidates: formats.iter().map(|f| f.display_with(name).to_string()).collect(),
    }
}
