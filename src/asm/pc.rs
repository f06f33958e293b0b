//! Tracking addresses while walking the syntax tree.

use crate::ast::keyword::Directive;
use crate::ast::node::{NodeKind, SyntaxTreeNode};

/// The address of the statement just visited, and the address of the one after it.
///
/// Both the symbol table and the encoder walk the root's children with a fresh counter,
/// calling [`ProgramCounter::update`] on each one, so they agree on every address.
///
/// # Example
/// ```
/// use lc3_asm::asm::pc::ProgramCounter;
/// use lc3_asm::err::Diagnostics;
/// use lc3_asm::parse::parse_ast;
///
/// let src = ".orig x3000\nHALT\n.stringz \"ab\"\nHALT\n.end";
/// let root = parse_ast(src, &mut Diagnostics::new(), None).unwrap();
///
/// let mut pc = ProgramCounter::new();
/// let addrs: Vec<_> = root.children.iter()
///     .map(|node| { pc.update(node); pc.address })
///     .collect();
/// assert_eq!(addrs, [0x3000, 0x3000, 0x3001, 0x3004, 0x3005]);
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct ProgramCounter {
    /// The address of the statement just visited.
    pub address: u16,
    /// Where the next statement will be placed.
    pub next_address: u16,
}
impl ProgramCounter {
    /// Creates a counter at address 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the counter past a statement.
    ///
    /// `.ORIG` resets the counter to its operand. Nodes other than
    /// instructions and directives leave the counter unchanged.
    pub fn update(&mut self, node: &SyntaxTreeNode<'_>) {
        match &node.kind {
            NodeKind::Directive(Directive::Orig) => {
                if let Some(&NodeKind::Number(origin)) = node.children.first().map(|c| &c.kind) {
                    self.address = origin;
                    self.next_address = origin;
                }
            },
            NodeKind::Instruction(_) | NodeKind::Directive(_) => {
                self.address = self.next_address;
                self.next_address = self.next_address.wrapping_add(size_of(node));
            },
            _ => {}
        }
    }
}

/// The number of words a statement occupies.
pub fn size_of(node: &SyntaxTreeNode<'_>) -> u16 {
    let arg = |i: usize| node.children.get(i).map(|c| &c.kind);

    match &node.kind {
        NodeKind::Instruction(_) => 1,
        NodeKind::Directive(Directive::Fill) => 1,
        NodeKind::Directive(Directive::Blkw) => match arg(0) {
            Some(&NodeKind::Number(n)) => n,
            _ => 0,
        },
        // truncation is fine, a string this long wraps memory anyway
        NodeKind::Directive(Directive::Stringz) => match arg(0) {
            Some(NodeKind::String(s)) => (s.chars().count() as u16).wrapping_add(1),
            _ => 0,
        },
        _ => 0,
    }
}
