//! The syntax tree produced by the parser.
//!
//! Every node is tagged with a [`NodeKind`], which carries the node's payload.
//! A node's children are its arguments, in source order.
//!
//! ```text
//! .orig x3000          Root
//! LOOP: ADD R0, R0, #1  ├── Directive(ORIG)
//! BRp LOOP              │   └── Number(0x3000)
//! .end                  ├── LabelDefn "LOOP"
//!                       ├── Instruction(ADD)
//!                       │   ├── Register(R0)
//!                       │   ├── Register(R0)
//!                       │   └── Number(1)
//!                       ├── Instruction(BR)
//!                       │   ├── BranchFlags(p)
//!                       │   └── LabelRef "LOOP"
//!                       └── Directive(END)
//! ```

use crate::parse::lex::{SourceLocation, Token};

use super::format::Format;
use super::keyword::{Directive, Instruction};
use super::{BranchFlags, Reg};

/// The payload of an instruction node.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InstructionData {
    /// Which instruction this is.
    pub opcode: Instruction,
    /// The argument shape this instruction matched.
    ///
    /// This is `None` until the tree has been analyzed.
    pub format: Option<Format>,
    /// The condition flags, for branches.
    pub flags: Option<BranchFlags>,
}

/// The syntactic category of a node, along with its payload.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub enum NodeKind {
    /// The top of the tree. Its children are the program's statements and labels.
    Root,
    /// An instruction; its children are its arguments.
    Instruction(InstructionData),
    /// A directive; its children are its arguments.
    Directive(Directive),
    /// A label definition. The name is the node's token text.
    LabelDefn,
    /// A reference to a label. The name is the node's token text.
    LabelRef,
    /// A register operand.
    Register(Reg),
    /// A numeric literal, as a 16-bit word.
    Number(u16),
    /// A string literal, with its escapes resolved.
    String(String),
    /// The condition flags of a branch.
    BranchFlags(BranchFlags),
    /// A node with no meaning. Used as a placeholder.
    #[default]
    Blank,
}

/// A node of the syntax tree.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SyntaxTreeNode<'s> {
    /// The category and payload of this node.
    pub kind: NodeKind,
    /// The token that produced this node (absent for the root).
    pub token: Option<Token<'s>>,
    /// The node's children, in source order.
    pub children: Vec<SyntaxTreeNode<'s>>,
}
impl<'s> SyntaxTreeNode<'s> {
    /// Creates a node without children.
    pub fn new(kind: NodeKind, token: Option<Token<'s>>) -> Self {
        Self { kind, token, children: vec![] }
    }

    /// Creates a root node over the given statements.
    pub fn root(children: Vec<SyntaxTreeNode<'s>>) -> Self {
        Self { kind: NodeKind::Root, token: None, children }
    }

    /// The source text of the node's token (empty for the root).
    ///
    /// For labels, this is the label's name.
    pub fn text(&self) -> &'s str {
        self.token.map_or("", |t| t.text)
    }

    /// Where the node starts in source.
    pub fn location(&self) -> Option<SourceLocation<'s>> {
        self.token.map(|t| t.location)
    }

    /// The instruction payload, if this is an instruction.
    pub fn instruction(&self) -> Option<&InstructionData> {
        match &self.kind {
            NodeKind::Instruction(data) => Some(data),
            _ => None,
        }
    }

    /// The directive, if this is a directive.
    pub fn directive(&self) -> Option<Directive> {
        match self.kind {
            NodeKind::Directive(d) => Some(d),
            _ => None,
        }
    }

    /// Visits this node and all of its descendants, in source order (parents before children).
    pub fn walk<'n>(&'n self, f: &mut impl FnMut(&'n SyntaxTreeNode<'s>)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Counts this node and all of its descendants.
    pub fn size(&self) -> usize {
        let mut n = 0;
        self.walk(&mut |_| n += 1);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeKind, SyntaxTreeNode};
    use crate::parse::lex::Lexer;

    #[test]
    fn test_walk_order() {
        let mut lexer = Lexer::new("A B C");
        let (a, b, c) = (lexer.next_token(), lexer.next_token(), lexer.next_token());

        let mut inner = SyntaxTreeNode::new(NodeKind::LabelDefn, Some(a));
        inner.children.push(SyntaxTreeNode::new(NodeKind::LabelRef, Some(b)));
        let root = SyntaxTreeNode::root(vec![
            inner,
            SyntaxTreeNode::new(NodeKind::LabelRef, Some(c)),
        ]);

        let mut seen = vec![];
        root.walk(&mut |n| seen.push(n.text()));
        assert_eq!(seen, ["", "A", "B", "C"]);
        assert_eq!(root.size(), 4);
        assert_eq!(root.children[0].location().map(|l| l.column), Some(0));
        assert_eq!(SyntaxTreeNode::default().kind, NodeKind::Blank);
    }
}
