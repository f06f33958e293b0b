//! A small parser-combinator engine over LC-3 tokens.
//!
//! A [`Rule`] is a function from a [`ParseContext`] to a [`ParseState`].
//! Rules are built out of primitives ([`atom`], or hand-written rules made with [`Rule::new`])
//! and combined with [`all`], [`any`], and the repetition family ([`multiple`], [`many`], [`maybe`], etc.).
//!
//! A rule can fail in two ways:
//! - [`ParseState::NonFatalFail`]: the input didn't match, so another alternative may be tried.
//!     A rule which fails this way leaves the cursor where it started.
//! - [`ParseState::FatalFail`]: the input started matching but is malformed.
//!     An error has been recorded and nothing backtracks past this point.
//!
//! [`commit`] turns a non-fatal failure into a fatal one. It marks the point
//! after which the parse cannot be anything else (e.g., after an instruction's comma).
//!
//! Nodes that rules produce are pushed onto the context's node list.
//! [`tree_child`] collects the nodes of a sub-parse into one subtree,
//! which is attached only if the sub-parse succeeds.

use std::rc::Rc;

use crate::ast::node::SyntaxTreeNode;

use super::lex::{Lexer, Token, TokenKind};
use super::{ParseErr, ParseErrKind};

/// The result of applying a [`Rule`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ParseState {
    /// The rule matched.
    Success,
    /// The rule did not match. Another alternative can be tried.
    NonFatalFail,
    /// The rule partially matched malformed input. Parsing should not backtrack.
    FatalFail,
}

/// A point that a [`ParseContext`] can be rewound to.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pos: usize,
    nodes: usize,
}

/// The state of a parse: a cursor into the token stream,
/// the nodes built so far, and the errors found so far.
pub struct ParseContext<'s> {
    lexer: Lexer<'s>,
    tokens: Vec<Token<'s>>,
    pos: usize,
    nodes: Vec<SyntaxTreeNode<'s>>,
    errors: Vec<ParseErr<'s>>,
}
impl<'s> ParseContext<'s> {
    /// Creates a context at the start of the given source.
    pub fn new(src: &'s str) -> Self {
        Self {
            lexer: Lexer::new(src),
            tokens: vec![],
            pos: 0,
            nodes: vec![],
            errors: vec![],
        }
    }

    /// Gets the token `n` tokens after the cursor, without consuming anything.
    pub fn peek_nth(&mut self, n: usize) -> Token<'s> {
        while self.tokens.len() <= self.pos + n {
            self.tokens.push(self.lexer.next_token());
        }
        self.tokens[self.pos + n]
    }

    /// Gets the token at the cursor, without consuming it.
    pub fn peek(&mut self) -> Token<'s> {
        self.peek_nth(0)
    }

    /// Consumes the token at the cursor.
    pub fn advance(&mut self) -> Token<'s> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// How many tokens have been consumed.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Saves the current position of the cursor and the node list.
    pub fn save(&self) -> Checkpoint {
        Checkpoint { pos: self.pos, nodes: self.nodes.len() }
    }

    /// Rewinds to a checkpoint, discarding tokens consumed and nodes pushed since.
    pub fn restore(&mut self, cp: Checkpoint) {
        self.pos = cp.pos;
        self.nodes.truncate(cp.nodes);
    }

    /// Adds a node to the current node list.
    pub fn push(&mut self, node: SyntaxTreeNode<'s>) {
        self.nodes.push(node);
    }

    /// Records an error and produces [`ParseState::FatalFail`].
    pub fn fail(&mut self, kind: ParseErrKind, token: Token<'s>) -> ParseState {
        self.errors.push(ParseErr::new(kind, token.location));
        ParseState::FatalFail
    }

    /// The errors recorded so far.
    pub fn errors(&self) -> &[ParseErr<'s>] {
        &self.errors
    }

    /// Consumes the context, returning the top-level nodes and all recorded errors.
    pub fn finish(self) -> (Vec<SyntaxTreeNode<'s>>, Vec<ParseErr<'s>>) {
        (self.nodes, self.errors)
    }
}

type ParseFn<'s> = dyn Fn(&mut ParseContext<'s>) -> ParseState + 's;

/// A grammar element.
///
/// Each rule carries a short description of what it expects,
/// which is used in the error message when a [`commit`]ted rule does not match.
#[derive(Clone)]
pub struct Rule<'s> {
    parse: Rc<ParseFn<'s>>,
    expects: Rc<str>,
}
impl<'s> Rule<'s> {
    /// Creates a rule from a parsing function.
    ///
    /// If the function returns [`ParseState::NonFatalFail`], it must leave the context as it found it.
    pub fn new(expects: &str, f: impl Fn(&mut ParseContext<'s>) -> ParseState + 's) -> Self {
        Self { parse: Rc::new(f), expects: expects.into() }
    }

    /// Applies the rule at the context's cursor.
    pub fn parse(&self, ctx: &mut ParseContext<'s>) -> ParseState {
        (self.parse)(ctx)
    }

    /// A description of what this rule expects (e.g. `"register or number"`).
    pub fn expects(&self) -> &str {
        &self.expects
    }

    /// Replaces the description of what this rule expects.
    pub fn expecting(self, expects: &str) -> Self {
        Self { expects: expects.into(), ..self }
    }
}
impl std::fmt::Debug for Rule<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Rule").field(&self.expects).finish()
    }
}

/// Matches one token of the given kind.
pub fn atom<'s>(kind: TokenKind) -> Rule<'s> {
    Rule::new(&kind.to_string(), move |ctx| {
        match ctx.peek().kind == kind {
            true => {
                ctx.advance();
                ParseState::Success
            },
            false => ParseState::NonFatalFail,
        }
    })
}

/// Matches each rule in sequence.
///
/// If any rule fails, the context is rewound to before the sequence and the failure is passed along.
pub fn all<'s>(rules: impl IntoIterator<Item=Rule<'s>>) -> Rule<'s> {
    let rules: Vec<_> = rules.into_iter().collect();
    let expects = rules.first().map_or("", Rule::expects).to_string();

    Rule::new(&expects, move |ctx| {
        let cp = ctx.save();
        for rule in &rules {
            match rule.parse(ctx) {
                ParseState::Success => {},
                fail => {
                    ctx.restore(cp);
                    return fail;
                }
            }
        }
        ParseState::Success
    })
}

/// Tries each rule in order, producing the first result which is not a [`ParseState::NonFatalFail`].
pub fn any<'s>(rules: impl IntoIterator<Item=Rule<'s>>) -> Rule<'s> {
    let rules: Vec<_> = rules.into_iter().collect();
    let expects = match &*rules {
        [] => String::new(),
        [one] => one.expects().to_string(),
        [init @ .., last] => {
            let init: Vec<_> = init.iter().map(Rule::expects).collect();
            format!("{} or {}", init.join(", "), last.expects())
        }
    };

    Rule::new(&expects, move |ctx| {
        for rule in &rules {
            let cp = ctx.save();
            match rule.parse(ctx) {
                ParseState::NonFatalFail => ctx.restore(cp),
                done => return done,
            }
        }
        ParseState::NonFatalFail
    })
}

/// Matches a rule repeatedly, succeeding if it matched between `lo` and `hi` times (inclusive).
///
/// Repetition stops early if the rule succeeds without consuming any tokens.
/// A [`ParseState::FatalFail`] from the rule is passed along immediately.
pub fn multiple<'s>(rule: Rule<'s>, lo: usize, hi: Option<usize>) -> Rule<'s> {
    let expects = rule.expects().to_string();

    Rule::new(&expects, move |ctx| {
        let start = ctx.save();
        let mut count = 0;

        while hi.map_or(true, |hi| count < hi) {
            let cp = ctx.save();
            match rule.parse(ctx) {
                ParseState::Success => {
                    count += 1;
                    if ctx.position() == cp.pos { break; }
                },
                ParseState::NonFatalFail => {
                    ctx.restore(cp);
                    break;
                },
                ParseState::FatalFail => return ParseState::FatalFail,
            }
        }

        match count >= lo {
            true  => ParseState::Success,
            false => {
                ctx.restore(start);
                ParseState::NonFatalFail
            }
        }
    })
}

/// Matches a rule any number of times.
pub fn many<'s>(rule: Rule<'s>) -> Rule<'s> {
    multiple(rule, 0, None)
}

/// Matches a rule zero or one times.
pub fn maybe<'s>(rule: Rule<'s>) -> Rule<'s> {
    multiple(rule, 0, Some(1))
}

/// Matches a rule at least `n` times.
pub fn at_least<'s>(rule: Rule<'s>, n: usize) -> Rule<'s> {
    multiple(rule, n, None)
}

/// Matches a rule at most `n` times.
pub fn at_most<'s>(rule: Rule<'s>, n: usize) -> Rule<'s> {
    multiple(rule, 0, Some(n))
}

/// Matches a rule exactly `n` times.
pub fn exactly<'s>(rule: Rule<'s>, n: usize) -> Rule<'s> {
    multiple(rule, n, Some(n))
}

/// Requires a rule to match.
///
/// If the rule fails non-fatally, an error is recorded at the current token
/// and the failure becomes fatal.
pub fn commit<'s>(rule: Rule<'s>) -> Rule<'s> {
    let expects = rule.expects().to_string();

    Rule::new(&expects, move |ctx| {
        match rule.parse(ctx) {
            ParseState::NonFatalFail => {
                let found = ctx.peek();
                let kind = ParseErrKind::UnexpectedToken {
                    expected: rule.expects().to_string(),
                    found: found.kind,
                };
                ctx.fail(kind, found)
            },
            st => st,
        }
    })
}

/// Collects the nodes produced by a rule into a subtree.
///
/// The first node produced becomes the root of the subtree and the rest become its children.
/// The subtree is attached to the current node list if the rule succeeds, and discarded otherwise.
pub fn tree_child<'s>(rule: Rule<'s>) -> Rule<'s> {
    let expects = rule.expects().to_string();

    Rule::new(&expects, move |ctx| {
        let outer = std::mem::take(&mut ctx.nodes);
        let state = rule.parse(ctx);
        let inner = std::mem::replace(&mut ctx.nodes, outer);

        if state == ParseState::Success {
            let mut inner = inner.into_iter();
            if let Some(mut root) = inner.next() {
                root.children.extend(inner);
                ctx.push(root);
            }
        }
        state
    })
}

/// Recovers from fatal failures of a rule.
///
/// When the rule fails fatally, its error stays recorded, and then
/// tokens are skipped up to and including the next `sync` token (or up to the end of input)
/// so that parsing can resume from there.
pub fn recover<'s>(rule: Rule<'s>, sync: TokenKind) -> Rule<'s> {
    let expects = rule.expects().to_string();

    Rule::new(&expects, move |ctx| {
        let cp = ctx.save();
        match rule.parse(ctx) {
            ParseState::FatalFail => {
                ctx.restore(cp);
                loop {
                    match ctx.peek().kind {
                        TokenKind::End => break,
                        k => {
                            ctx.advance();
                            if k == sync { break; }
                        }
                    }
                }
                ParseState::Success
            },
            st => st,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::NodeKind;

    /// Matches a word, and pushes a label reference node for it.
    fn word<'s>() -> Rule<'s> {
        Rule::new("word", |ctx| {
            let tok = ctx.peek();
            match tok.kind {
                TokenKind::Word => {
                    ctx.advance();
                    ctx.push(SyntaxTreeNode::new(NodeKind::LabelRef, Some(tok)));
                    ParseState::Success
                },
                _ => ParseState::NonFatalFail
            }
        })
    }

    fn run<'s>(rule: &Rule<'s>, src: &'s str) -> (ParseState, ParseContext<'s>) {
        let mut ctx = ParseContext::new(src);
        let st = rule.parse(&mut ctx);
        (st, ctx)
    }

    #[test]
    fn test_all_restores() {
        let rule = all([word(), atom(TokenKind::Comma), word()]);

        let (st, ctx) = run(&rule, "A, B");
        assert_eq!(st, ParseState::Success);
        assert_eq!(ctx.position(), 3);
        assert_eq!(ctx.nodes.len(), 2);

        let (st, ctx) = run(&rule, "A, #");
        assert_eq!(st, ParseState::NonFatalFail);
        assert_eq!(ctx.position(), 0);
        assert!(ctx.nodes.is_empty());
    }

    #[test]
    fn test_any_order() {
        let rule = any([atom(TokenKind::Comma), word(), atom(TokenKind::Word)]);
        assert_eq!(rule.expects(), "comma, word or word");

        let (st, ctx) = run(&rule, "A");
        assert_eq!(st, ParseState::Success);
        // first matching alternative wins, so a node was pushed
        assert_eq!(ctx.nodes.len(), 1);

        let (st, _) = run(&rule, "#");
        assert_eq!(st, ParseState::NonFatalFail);
    }

    #[test]
    fn test_repetition_bounds() {
        let src = "A B C";
        assert_eq!(run(&many(word()), src).1.position(), 3);
        assert_eq!(run(&maybe(word()), src).1.position(), 1);
        assert_eq!(run(&at_most(word(), 2), src).1.position(), 2);
        assert_eq!(run(&exactly(word(), 3), src).0, ParseState::Success);

        let (st, ctx) = run(&at_least(word(), 4), src);
        assert_eq!(st, ParseState::NonFatalFail);
        assert_eq!(ctx.position(), 0);
        assert!(ctx.nodes.is_empty());

        // zero matches is fine for `many`
        assert_eq!(run(&many(word()), "#").0, ParseState::Success);
    }

    #[test]
    fn test_repetition_without_progress_stops() {
        let nothing = Rule::new("nothing", |_| ParseState::Success);
        let (st, ctx) = run(&many(nothing), "A");
        assert_eq!(st, ParseState::Success);
        assert_eq!(ctx.position(), 0);
    }

    #[test]
    fn test_commit_escalates() {
        let rule = all([word(), commit(atom(TokenKind::Comma))]);
        let (st, ctx) = run(&rule, "A B");
        assert_eq!(st, ParseState::FatalFail);
        assert_eq!(ctx.position(), 0);

        let (_, errors) = ctx.finish();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "expected comma, found word");
        assert_eq!(errors[0].location.column, 2);
    }

    #[test]
    fn test_fatal_stops_backtracking() {
        let failing = all([word(), commit(atom(TokenKind::Comma))]);
        let rule = any([failing, word()]);
        assert_eq!(run(&rule, "A B").0, ParseState::FatalFail);

        let rule = many(all([word(), commit(atom(TokenKind::Comma))]));
        let (st, ctx) = run(&rule, "A, B, C D");
        assert_eq!(st, ParseState::FatalFail);
        assert_eq!(ctx.errors().len(), 1);
    }

    #[test]
    fn test_tree_child() {
        let rule = tree_child(all([word(), word(), word()]));
        let (st, ctx) = run(&rule, "A B C");
        assert_eq!(st, ParseState::Success);

        let (nodes, _) = ctx.finish();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text(), "A");
        let children: Vec<_> = nodes[0].children.iter().map(|n| n.text()).collect();
        assert_eq!(children, ["B", "C"]);

        // partial subtrees are discarded
        let rule = all([word(), tree_child(all([word(), atom(TokenKind::Comma)]))]);
        let (st, ctx) = run(&rule, "A B C");
        assert_eq!(st, ParseState::NonFatalFail);
        assert!(ctx.nodes.is_empty());
    }

    #[test]
    fn test_recover_skips_line() {
        let line = all([word(), commit(atom(TokenKind::Linebreak))]);
        let rule = many(recover(line, TokenKind::Linebreak));
        let (st, mut ctx) = run(&rule, "A\nB C\nD\n");
        assert_eq!(st, ParseState::Success);
        assert_eq!(ctx.peek().kind, TokenKind::End);

        let (nodes, errors) = ctx.finish();
        let texts: Vec<_> = nodes.iter().map(|n| n.text()).collect();
        assert_eq!(texts, ["A", "D"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location.line, 2);
    }
}
