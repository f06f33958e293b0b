//! Assigning addresses to labels.
//!
//! The symbol table is built in two passes over an analyzed syntax tree:
//! 1. Every label definition and reference is collected. A label defined twice
//!    or a reference to a label that's never defined is an error.
//! 2. The statements are walked in order with a [`ProgramCounter`].
//!    A label binds to the address of the next statement that occupies memory
//!    (or to the origin of the next `.orig`), so a run of consecutive labels all share one address.
//!
//! If the first pass fails, the second is not run.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use slog::{debug, o, trace, Discard, Logger};

use crate::ast::keyword::Directive;
use crate::ast::node::{NodeKind, SyntaxTreeNode};
use crate::err::{Diagnostics, StageFailed};

use super::pc::ProgramCounter;
use super::{AsmErr, AsmErrKind};

/// A mapping from label names to addresses.
///
/// Names are case-sensitive.
///
/// # Example
/// ```
/// use lc3_asm::asm::symbol::SymbolTable;
/// use lc3_asm::err::Diagnostics;
/// use lc3_asm::parse::parse_ast;
///
/// let src = "
///     .orig x3000
///     START AND R0, R0, #0
///     LOOP
///     AGAIN BR LOOP
///     .end
/// ";
/// let mut diag = Diagnostics::new();
/// let root = parse_ast(src, &mut diag, None).unwrap();
/// let symbols = SymbolTable::build(&root, &mut diag, None).unwrap();
///
/// assert_eq!(symbols.lookup("START"), Some(0x3000));
/// assert_eq!(symbols.lookup("LOOP"), Some(0x3001));
/// assert_eq!(symbols.lookup("AGAIN"), Some(0x3001));
/// assert_eq!(symbols.lookup("loop"), None);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SymbolTable {
    addresses: HashMap<String, u16>,
}

impl SymbolTable {
    /// Builds the symbol table of a syntax tree.
    ///
    /// Every problem is reported into `diag`, and no table is produced if there were any.
    pub fn build(
        root: &SyntaxTreeNode<'_>,
        diag: &mut Diagnostics,
        logger: impl Into<Option<Logger>>
    ) -> Result<Self, StageFailed> {
        let logger = logger
            .into()
            .unwrap_or(Logger::root(Discard, o!()))
            .new(o!("stage" => "symbols"));

        let errors_before = diag.error_count();
        check_names(root, diag);
        StageFailed::check(diag, errors_before)?;

        let table = assign_addresses(root, diag, &logger);
        StageFailed::check(diag, errors_before)?;

        debug!(logger, "built symbol table"; "labels" => table.len());
        Ok(table)
    }

    /// Gets the address of a label.
    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.addresses.get(name).copied()
    }

    /// The number of labels in the table.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the table has no labels.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Iterates over the labels and their addresses, in order of address (then name).
    pub fn iter(&self) -> impl Iterator<Item=(&str, u16)> + '_ {
        let mut entries: Vec<_> = self.addresses.iter()
            .map(|(name, &addr)| (&**name, addr))
            .collect();
        entries.sort_by_key(|&(name, addr)| (addr, name));
        entries.into_iter()
    }
}

/// Pass 1: every label must be defined exactly once.
fn check_names(root: &SyntaxTreeNode<'_>, diag: &mut Diagnostics) {
    let mut defined = HashMap::new();
    let mut refs = vec![];

    root.walk(&mut |node| match node.kind {
        NodeKind::LabelDefn => match defined.entry(node.text()) {
            Entry::Occupied(e) => {
                let kind = AsmErrKind::DuplicateLabel {
                    name: node.text().to_string(),
                    first_line: *e.get(),
                };
                diag.error(&AsmErr::new(kind, node.location()));
            },
            Entry::Vacant(e) => {
                e.insert(node.location().map_or(0, |l| l.line));
            },
        },
        NodeKind::LabelRef => refs.push(node),
        _ => {}
    });

    for node in refs {
        if !defined.contains_key(node.text()) {
            let kind = AsmErrKind::UndefinedLabel(node.text().to_string());
            diag.error(&AsmErr::new(kind, node.location()));
        }
    }
}

/// Pass 2: bind each label to the address of the next statement occupying memory.
fn assign_addresses(root: &SyntaxTreeNode<'_>, diag: &mut Diagnostics, logger: &Logger) -> SymbolTable {
    let mut table = SymbolTable::default();
    let mut pc = ProgramCounter::new();
    let mut pending = vec![];

    let unaddressed = |diag: &mut Diagnostics, label: &SyntaxTreeNode<'_>| {
        let kind = AsmErrKind::UnaddressedLabel(label.text().to_string());
        diag.error(&AsmErr::new(kind, label.location()));
    };

    for node in &root.children {
        pc.update(node);

        let addressable = match &node.kind {
            NodeKind::LabelDefn => {
                pending.push(node);
                false
            },
            // labels before a region name its origin
            NodeKind::Directive(Directive::Orig) => true,
            NodeKind::Directive(Directive::End) => {
                for label in pending.drain(..) {
                    unaddressed(diag, label);
                }
                false
            },
            NodeKind::Directive(d) => d.is_memory(),
            NodeKind::Instruction(_) => true,
            _ => false,
        };

        if addressable {
            for label in pending.drain(..) {
                trace!(logger, "bound label"; "label" => label.text(), "address" => format_args!("x{:04X}", pc.address));
                table.addresses.insert(label.text().to_string(), pc.address);
            }
        }
    }

    for label in pending {
        unaddressed(diag, label);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::SymbolTable;
    use crate::asm::analyze::analyze;
    use crate::err::{Diagnostics, StageFailed};
    use crate::parse::parse_ast;

    fn build(src: &str) -> (Result<SymbolTable, StageFailed>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let mut root = parse_ast(src, &mut diag, None).unwrap();
        analyze(&mut root, &mut diag, None).unwrap();
        (SymbolTable::build(&root, &mut diag, None), diag)
    }

    #[test]
    fn test_binding() {
        let (table, _) = build("
            BEFORE
            .orig x3000
            A
            B AND R0, R0, #0
            C .fill 4
            D .blkw 3
            E .stringz \"hi\"
            F: HALT
            .end
        ");
        let table = table.unwrap();
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, [
            ("A", 0x3000),
            ("B", 0x3000),
            ("BEFORE", 0x3000),
            ("C", 0x3001),
            ("D", 0x3002),
            ("E", 0x3005),
            ("F", 0x3008),
        ]);
    }

    #[test]
    fn test_labels_before_orig() {
        let (table, diag) = build("START\n.orig x3000\n.end\nNEXT\n.orig x4000\nHALT\n.end");
        assert!(diag.is_empty());
        let table = table.unwrap();
        assert_eq!(table.lookup("START"), Some(0x3000));
        assert_eq!(table.lookup("NEXT"), Some(0x4000));
    }

    #[test]
    fn test_duplicate_and_undefined() {
        let (table, diag) = build(".orig x3000\nX HALT\nY HALT\nX HALT\nBR Z\nLD R0, Z\n.end");
        assert_eq!(table, Err(StageFailed { errors: 3 }));

        let entries: Vec<_> = diag.iter()
            .map(|d| (d.message.as_str(), d.location.as_ref().map(|l| l.line)))
            .collect();
        assert_eq!(entries, [
            ("label `X` was defined multiple times", Some(4)),
            ("label `Z` is not defined", Some(5)),
            ("label `Z` is not defined", Some(6)),
        ]);
        let help = diag.iter().next().and_then(|d| d.help.as_deref());
        assert_eq!(help, Some("first defined on line 2; labels must be unique within a file"));
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let (table, _) = build(".orig x3000\nloop HALT\nLOOP HALT\n.end");
        let table = table.unwrap();
        assert_eq!(table.lookup("loop"), Some(0x3000));
        assert_eq!(table.lookup("LOOP"), Some(0x3001));
    }

    #[test]
    fn test_unaddressed_labels() {
        let (table, diag) = build(".orig x3000\nHALT\nDANGLING\n.end\n.orig x4000\nHALT\n.end\nTRAILING");
        assert!(table.is_err());
        let messages: Vec<_> = diag.error_messages().collect();
        assert_eq!(messages, [
            "label `DANGLING` does not point to any memory",
            "label `TRAILING` does not point to any memory",
        ]);
    }

    #[test]
    fn test_second_pass_skipped_on_name_errors() {
        // the dangling label would be a second-pass error
        let (table, diag) = build(".orig x3000\nA HALT\nA\n.end");
        assert!(table.is_err());
        assert_eq!(diag.error_count(), 1);
    }
}
