//! The grammar of LC-3 assembly, written with the rules of [`super::combinator`].
//!
//! ```text
//! document    = many(line), END
//! line        = [label_defn], [directive | instruction], end_of_line
//! directive   = "." directive_name [dir_arg {[","] dir_arg}]
//! instruction = instr_name [instr_arg {"," instr_arg}]
//! dir_arg     = number | label_ref | string
//! instr_arg   = register | number | label_ref
//! number      = hex | "#" decimal | decimal
//! decimal     = ["-"] NUMBER
//! ```
//!
//! A label definition is a word followed by a colon,
//! or a word which isn't a keyword (see [`is_reserved`]).

use std::num::IntErrorKind;

use crate::ast::keyword::{is_reserved, lookup_instruction, Directive};
use crate::ast::node::{InstructionData, NodeKind, SyntaxTreeNode};
use crate::ast::Reg;

use super::combinator::{all, any, atom, commit, many, maybe, recover, tree_child, ParseContext, ParseState, Rule};
use super::lex::{Token, TokenKind};
use super::ParseErrKind;

/// A whole source file.
///
/// Each line that fails to parse is skipped after its error has been recorded,
/// so one pass finds the syntax errors of every line.
pub fn document<'s>() -> Rule<'s> {
    all([
        many(recover(line(), TokenKind::Linebreak)),
        atom(TokenKind::End),
    ])
}

/// One line: an optional label, an optional statement, then the end of the line.
pub fn line<'s>() -> Rule<'s> {
    all([
        maybe(label_defn()),
        maybe(any([directive(), instruction()])),
        commit(end_of_line()),
    ])
}

/// A directive statement (e.g. `.FILL x25`).
pub fn directive<'s>() -> Rule<'s> {
    let arg = || any([number(), label_ref(), string()]);
    let args = maybe(all([
        arg(),
        many(all([maybe(atom(TokenKind::Comma)), arg()])),
    ]));

    tree_child(all([atom(TokenKind::Period), directive_name(), args]))
        .expecting("directive")
}

/// An instruction statement (e.g. `ADD R0, R0, #1`).
pub fn instruction<'s>() -> Rule<'s> {
    let arg = || any([register(), number(), label_ref()]);
    let args = maybe(all([
        arg(),
        many(all([atom(TokenKind::Comma), commit(arg())])),
    ]));

    tree_child(all([instr_name(), args]))
        .expecting("instruction")
}

/// Accepts a node-producing token if `f` returns its payload.
fn token_rule<'s>(expects: &str, kind: TokenKind, f: impl Fn(&Token<'s>) -> Option<NodeKind> + 's) -> Rule<'s> {
    Rule::new(expects, move |ctx| {
        let tok = ctx.peek();
        match (tok.kind == kind).then(|| f(&tok)).flatten() {
            Some(node) => {
                ctx.advance();
                ctx.push(SyntaxTreeNode::new(node, Some(tok)));
                ParseState::Success
            },
            None => ParseState::NonFatalFail,
        }
    })
}

/// A label definition. The colon is consumed but not kept.
fn label_defn<'s>() -> Rule<'s> {
    Rule::new("label", |ctx| {
        let tok = ctx.peek();
        if tok.kind != TokenKind::Word {
            return ParseState::NonFatalFail;
        }

        let colon = ctx.peek_nth(1).kind == TokenKind::Colon;
        if !colon && is_reserved(tok.text) {
            return ParseState::NonFatalFail;
        }

        ctx.advance();
        if colon { ctx.advance(); }
        ctx.push(SyntaxTreeNode::new(NodeKind::LabelDefn, Some(tok)));
        ParseState::Success
    })
}

/// An instruction mnemonic. A `BR` mnemonic also produces a node for its flags.
fn instr_name<'s>() -> Rule<'s> {
    Rule::new("instruction", |ctx| {
        let tok = ctx.peek();
        if tok.kind != TokenKind::Word {
            return ParseState::NonFatalFail;
        }

        match lookup_instruction(tok.text) {
            Ok(Some((opcode, flags))) => {
                ctx.advance();
                let data = InstructionData { opcode, format: None, flags };
                ctx.push(SyntaxTreeNode::new(NodeKind::Instruction(data), Some(tok)));

                if let Some(flags) = flags {
                    let suffix = Token {
                        text: &tok.text[2..],
                        location: tok.location.shifted(2),
                        ..tok
                    };
                    ctx.push(SyntaxTreeNode::new(NodeKind::BranchFlags(flags), Some(suffix)));
                }
                ParseState::Success
            },
            Ok(None) => ctx.fail(ParseErrKind::UnknownInstruction(tok.text.to_string()), tok),
            Err(c) => ctx.fail(ParseErrKind::RepeatedBranchFlag(c), tok),
        }
    })
}

/// A directive name (after the period).
fn directive_name<'s>() -> Rule<'s> {
    Rule::new("directive name", |ctx| {
        let tok = ctx.peek();
        if tok.kind != TokenKind::Word {
            let kind = ParseErrKind::UnexpectedToken { expected: "directive name".to_string(), found: tok.kind };
            return ctx.fail(kind, tok);
        }

        match Directive::from_name(tok.text) {
            Some(d) => {
                ctx.advance();
                ctx.push(SyntaxTreeNode::new(NodeKind::Directive(d), Some(tok)));
                ParseState::Success
            },
            None => ctx.fail(ParseErrKind::UnknownDirective(tok.text.to_string()), tok),
        }
    })
}

fn register<'s>() -> Rule<'s> {
    token_rule("register", TokenKind::Word, |tok| Reg::parse(tok.text).map(NodeKind::Register))
}

fn label_ref<'s>() -> Rule<'s> {
    token_rule("label", TokenKind::Word, |_| Some(NodeKind::LabelRef))
}

fn string<'s>() -> Rule<'s> {
    token_rule("string", TokenKind::String, |tok| Some(NodeKind::String(unescape(tok.text))))
}

/// A hex or decimal literal.
fn number<'s>() -> Rule<'s> {
    let decimal = || Rule::new("decimal number", parse_decimal);

    any([
        Rule::new("hex number", parse_hex),
        all([atom(TokenKind::Pound), commit(decimal())]),
        decimal(),
    ]).expecting("number")
}

/// A word of the form `xNNNN`. Words which aren't entirely hex digits after the `x`
/// don't match (so they can be labels instead).
fn parse_hex(ctx: &mut ParseContext<'_>) -> ParseState {
    let tok = ctx.peek();
    let digits = match tok.text.strip_prefix(['x', 'X']) {
        Some(d) if tok.kind == TokenKind::Word && !d.is_empty() && d.bytes().all(|b| b.is_ascii_hexdigit()) => d,
        _ => return ParseState::NonFatalFail,
    };

    match u16::from_str_radix(digits, 16) {
        Ok(n) => {
            ctx.advance();
            ctx.push(SyntaxTreeNode::new(NodeKind::Number(n), Some(tok)));
            ParseState::Success
        },
        Err(_) => ctx.fail(ParseErrKind::NumberTooLarge, tok),
    }
}

/// A decimal literal with an optional minus sign. Negative values wrap around to 16 bits.
fn parse_decimal(ctx: &mut ParseContext<'_>) -> ParseState {
    let cp = ctx.save();
    let negative = ctx.peek().kind == TokenKind::Minus;
    if negative { ctx.advance(); }

    let tok = ctx.peek();
    if tok.kind != TokenKind::Number {
        ctx.restore(cp);
        return ParseState::NonFatalFail;
    }

    let magnitude = match tok.text.parse::<u16>() {
        Ok(n) => n,
        Err(e) => {
            let kind = match e.kind() {
                IntErrorKind::PosOverflow => ParseErrKind::NumberTooLarge,
                _ => ParseErrKind::InvalidNumber,
            };
            return ctx.fail(kind, tok);
        }
    };

    ctx.advance();
    let value = match negative {
        true  => magnitude.wrapping_neg(),
        false => magnitude,
    };
    ctx.push(SyntaxTreeNode::new(NodeKind::Number(value), Some(tok)));
    ParseState::Success
}

/// A line break, or the end of input (which is not consumed).
fn end_of_line<'s>() -> Rule<'s> {
    Rule::new("end of line", |ctx| {
        match ctx.peek().kind {
            TokenKind::Linebreak => {
                ctx.advance();
                ParseState::Success
            },
            TokenKind::End => ParseState::Success,
            _ => ParseState::NonFatalFail,
        }
    })
}

/// Resolves the escapes of a string literal's text.
///
/// `\n` is a newline. A backslash followed by any other character is that character.
///
/// ```
/// use lc3_asm::parse::grammar::unescape;
///
/// assert_eq!(unescape(r"a\nb"), "a\nb");
/// assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
/// assert_eq!(unescape(r"\\ \t"), "\\ t");
/// ```
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some(c)   => out.push(c),
                None      => out.push('\\'),
            },
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::keyword::Instruction;
    use crate::ast::BranchFlags;

    fn parse_line(src: &str) -> (ParseState, Vec<SyntaxTreeNode<'_>>, Vec<String>) {
        let mut ctx = ParseContext::new(src);
        let st = line().parse(&mut ctx);
        let (nodes, errors) = ctx.finish();
        (st, nodes, errors.iter().map(|e| e.to_string()).collect())
    }

    fn kinds(nodes: &[SyntaxTreeNode<'_>]) -> Vec<NodeKind> {
        nodes.iter().map(|n| n.kind.clone()).collect()
    }

    #[test]
    fn test_instruction_shape() {
        let (st, nodes, errors) = parse_line("LOOP: add R0, r1, #-1\n");
        assert_eq!(st, ParseState::Success);
        assert!(errors.is_empty());
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind, NodeKind::LabelDefn);
        assert_eq!(nodes[0].text(), "LOOP");

        let instr = &nodes[1];
        assert_eq!(instr.instruction().map(|d| d.opcode), Some(Instruction::Add));
        assert_eq!(kinds(&instr.children), [
            NodeKind::Register(Reg::new(0).unwrap()),
            NodeKind::Register(Reg::new(1).unwrap()),
            NodeKind::Number(0xFFFF),
        ]);
    }

    #[test]
    fn test_label_without_colon() {
        let (_, nodes, _) = parse_line("DONE HALT");
        assert_eq!(nodes[0].kind, NodeKind::LabelDefn);
        assert_eq!(nodes[1].instruction().map(|d| d.opcode), Some(Instruction::Halt));

        // keywords are only labels when followed by a colon
        let (_, nodes, _) = parse_line("HALT");
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].instruction().is_some());
        let (_, nodes, _) = parse_line("halt: HALT");
        assert_eq!(kinds(&nodes)[0], NodeKind::LabelDefn);
        assert_eq!(nodes[0].text(), "halt");
    }

    #[test]
    fn test_branch_flags_child() {
        let (st, nodes, _) = parse_line("BRzn LOOP");
        assert_eq!(st, ParseState::Success);
        let flags = BranchFlags { n: true, z: true, p: false };
        let data = nodes[0].instruction().unwrap();
        assert_eq!((data.opcode, data.flags), (Instruction::Br, Some(flags)));

        let children = &nodes[0].children;
        assert_eq!(children[0].kind, NodeKind::BranchFlags(flags));
        assert_eq!(children[0].text(), "zn");
        assert_eq!(children[0].location().map(|l| l.column), Some(2));
        assert_eq!(children[1].kind, NodeKind::LabelRef);

        let (st, _, errors) = parse_line("BRnzz LOOP");
        assert_eq!(st, ParseState::FatalFail);
        assert_eq!(errors, ["branch flag `z` appears more than once"]);
    }

    #[test]
    fn test_numbers() {
        let (_, nodes, _) = parse_line(".FILL x7fFF");
        assert_eq!(kinds(&nodes[0].children), [NodeKind::Number(0x7FFF)]);
        let (_, nodes, _) = parse_line(".FILL #65535");
        assert_eq!(kinds(&nodes[0].children), [NodeKind::Number(0xFFFF)]);
        let (_, nodes, _) = parse_line(".FILL -2");
        assert_eq!(kinds(&nodes[0].children), [NodeKind::Number(0xFFFE)]);

        // not entirely hex, so a label
        let (_, nodes, _) = parse_line(".FILL xGG");
        assert_eq!(kinds(&nodes[0].children), [NodeKind::LabelRef]);

        let (_, _, errors) = parse_line(".FILL 12ab");
        assert_eq!(errors, ["invalid decimal literal"]);
        let (_, _, errors) = parse_line(".FILL #65536");
        assert_eq!(errors, ["numeric literal does not fit in 16 bits"]);
        let (_, _, errors) = parse_line(".FILL x10000");
        assert_eq!(errors, ["numeric literal does not fit in 16 bits"]);
        let (_, _, errors) = parse_line(".FILL #R0");
        assert_eq!(errors, ["expected decimal number, found word"]);
    }

    #[test]
    fn test_directive_args() {
        let (st, nodes, _) = parse_line(".BLKW 2, #5");
        assert_eq!(st, ParseState::Success);
        assert_eq!(nodes[0].directive(), Some(Directive::Blkw));
        assert_eq!(kinds(&nodes[0].children), [NodeKind::Number(2), NodeKind::Number(5)]);

        let (_, nodes, _) = parse_line(r#".stringz "a\"b\n""#);
        assert_eq!(nodes[0].directive(), Some(Directive::Stringz));
        assert_eq!(kinds(&nodes[0].children), [NodeKind::String("a\"b\n".to_string())]);

        let (_, _, errors) = parse_line(".FOO 1");
        assert_eq!(errors, ["unknown directive `.FOO`"]);
        let (_, _, errors) = parse_line(". 1");
        assert_eq!(errors, ["expected directive name, found number"]);
    }

    #[test]
    fn test_syntax_errors() {
        let (_, _, errors) = parse_line("ADD R0 R1");
        assert_eq!(errors, ["expected end of line, found word"]);
        let (_, _, errors) = parse_line("ADD R0, , R1");
        assert_eq!(errors, ["expected register, number or label, found comma"]);
        let (_, _, errors) = parse_line("LOOP FOO R1");
        assert_eq!(errors, ["unknown instruction `FOO`"]);
        let (_, _, errors) = parse_line("ADD R0, R0, @");
        assert_eq!(errors, ["expected register, number or label, found unknown character"]);
    }

    #[test]
    fn test_document_keeps_going() {
        let src = ".orig x3000\nADD R0 R0\nHALT\nBRnn X\n.end";
        let mut ctx = ParseContext::new(src);
        assert_eq!(document().parse(&mut ctx), ParseState::Success);

        let (nodes, errors) = ctx.finish();
        let lines: Vec<_> = errors.iter().map(|e| e.location.line).collect();
        assert_eq!(lines, [2, 4]);
        // the good lines still parse
        let dirs: Vec<_> = nodes.iter().filter_map(|n| n.directive()).collect();
        assert_eq!(dirs, [Directive::Orig, Directive::End]);
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let mut ctx = ParseContext::new("\n\n   ; nothing here\n\t\n");
        assert_eq!(document().parse(&mut ctx), ParseState::Success);
        let (nodes, errors) = ctx.finish();
        assert!(nodes.is_empty());
        assert!(errors.is_empty());
    }
}
