//! Tokenizing LC-3 assembly.
//!
//! This module holds the tokens that characterize LC-3 assembly ([`Token`]).
//! The parser pulls tokens out of the [`Lexer`] one at a time, so source text
//! is only classified as far as parsing has progressed.
//!
//! Tokens are deliberately coarse. For example, `0abc` lexes as a single
//! [`TokenKind::Number`], and `x3000` lexes as a [`TokenKind::Word`].
//! Deciding what those tokens *mean* is the parser's job.

use logos::Logos;

/// The classification of a [`Token`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TokenKind {
    /// A comma, which delineates operands (`,`).
    Comma,
    /// A period, which starts a directive (`.`).
    Period,
    /// A pound sign, which can prefix decimal literals (`#`).
    Pound,
    /// A colon, which can optionally appear after labels (`:`).
    Colon,
    /// A minus sign, which negates decimal literals (`-`).
    Minus,
    /// A run of word characters starting with a letter or `_`
    /// (labels, keywords, registers, hex literals).
    Word,
    /// A run of alphanumeric characters starting with a decimal digit.
    Number,
    /// A quoted string literal. The token's text is the raw interior of the quotes.
    String,
    /// A new line.
    Linebreak,
    /// The end of the source.
    End,
    /// A character that does not start any other token.
    Unknown,
}
impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Comma     => f.write_str("comma"),
            TokenKind::Period    => f.write_str("period"),
            TokenKind::Pound     => f.write_str("pound sign"),
            TokenKind::Colon     => f.write_str("colon"),
            TokenKind::Minus     => f.write_str("minus sign"),
            TokenKind::Word      => f.write_str("word"),
            TokenKind::Number    => f.write_str("number"),
            TokenKind::String    => f.write_str("string"),
            TokenKind::Linebreak => f.write_str("line break"),
            TokenKind::End       => f.write_str("end of file"),
            TokenKind::Unknown   => f.write_str("unknown character"),
        }
    }
}

/// The tokens recognized by the underlying state machine.
///
/// [`TokenKind::End`] and [`TokenKind::Unknown`] are synthesized by [`Lexer`].
#[derive(Debug, Logos, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"([ \t\r\x0B\x0C]|;[^\n]*)+")]
enum RawToken {
    #[token(",")]
    Comma,
    #[token(".")]
    Period,
    #[token("#")]
    Pound,
    #[token(":")]
    Colon,
    #[token("-")]
    Minus,

    // Over-consumes things like `0abc` on purpose,
    // so that later stages see one bad number instead of a number and a word.
    #[regex(r"[0-9][A-Za-z0-9]*")]
    Number,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,

    #[token("\"", |lx| lex_quoted(lx, '"'))]
    #[token("'", |lx| lex_quoted(lx, '\''))]
    String,

    #[token("\n")]
    Linebreak,

    #[token("\0")]
    Nul,
}

/// Consumes a quoted literal up to and including its closing quote.
///
/// A backslash escapes the character after it, so an escaped quote does not close the literal.
/// Literals cannot span lines; an unclosed literal consumes the rest of the line and is rejected.
fn lex_quoted(lx: &mut logos::Lexer<'_, RawToken>, quote: char) -> bool {
    let rem = lx.remainder();
    let mut chars = rem.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\n' => {
                lx.bump(i);
                return false;
            },
            '\\' => match chars.next() {
                Some((j, '\n')) => {
                    lx.bump(j);
                    return false;
                },
                Some(_) => {},
                None => break,
            },
            c if c == quote => {
                lx.bump(i + c.len_utf8());
                return true;
            },
            _ => {}
        }
    }

    lx.bump(rem.len());
    false
}

/// A position in LC-3 source code.
///
/// The location keeps a reference to the source so that the full line
/// can be recovered for diagnostics (see [`SourceLocation::line_text`]).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SourceLocation<'s> {
    src: &'s str,
    /// The line number (starting at 1).
    pub line: usize,
    /// The byte offset from the start of the line.
    pub column: usize,
    /// The byte offset from the start of the source.
    pub offset: usize,
}
impl<'s> SourceLocation<'s> {
    /// Computes the location of a byte offset in the source.
    ///
    /// The lexer tracks lines as it goes, so this is only needed for
    /// locations that do not come from a token.
    pub fn new(src: &'s str, offset: usize) -> Self {
        let offset = offset.min(src.len());
        let before = &src[..offset];
        let line = before.matches('\n').count() + 1;
        let column = offset - before.rfind('\n').map_or(0, |i| i + 1);

        Self { src, line, column, offset }
    }

    /// The location `bytes` further along the same line.
    pub fn shifted(self, bytes: usize) -> Self {
        Self {
            column: self.column + bytes,
            offset: self.offset + bytes,
            ..self
        }
    }

    /// The full source line this location is on (without its line ending).
    ///
    /// # Example
    /// ```
    /// use lc3_asm::parse::lex::SourceLocation;
    ///
    /// let src = ".orig x3000\n    HALT ; stop\n.end\n";
    /// let loc = SourceLocation::new(src, 16);
    /// assert_eq!(loc.line, 2);
    /// assert_eq!(loc.column, 4);
    /// assert_eq!(loc.line_text(), "    HALT ; stop");
    /// ```
    pub fn line_text(&self) -> &'s str {
        let start = self.src[..self.offset].rfind('\n').map_or(0, |i| i + 1);
        let end = self.src[self.offset..].find('\n').map_or(self.src.len(), |i| self.offset + i);

        self.src[start..end].trim_end_matches('\r')
    }
}
impl std::fmt::Display for SourceLocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column + 1)
    }
}

/// A unit of information in LC-3 source code.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Token<'s> {
    /// The classification of the token.
    pub kind: TokenKind,
    /// The source text of this token.
    ///
    /// For strings, this is the raw text between the quotes (escapes unresolved).
    pub text: &'s str,
    /// Where the token starts.
    pub location: SourceLocation<'s>,
}

/// Lazily splits LC-3 source into [`Token`]s.
///
/// Once the source is exhausted, [`Lexer::next_token`] keeps producing
/// [`TokenKind::End`] tokens. The [`Iterator`] implementation stops after the first one.
///
/// # Example
/// ```
/// use lc3_asm::parse::lex::{Lexer, TokenKind};
///
/// let kinds: Vec<_> = Lexer::new("LOOP: ADD R0, R0, #-1 ; count down\n")
///     .map(|t| t.kind)
///     .collect();
///
/// assert_eq!(kinds, [
///     TokenKind::Word, TokenKind::Colon,
///     TokenKind::Word, TokenKind::Word, TokenKind::Comma,
///     TokenKind::Word, TokenKind::Comma,
///     TokenKind::Pound, TokenKind::Minus, TokenKind::Number,
///     TokenKind::Linebreak, TokenKind::End
/// ]);
/// ```
#[derive(Clone)]
pub struct Lexer<'s> {
    src: &'s str,
    raw: logos::Lexer<'s, RawToken>,
    line: usize,
    line_start: usize,
    done: bool,
}
impl<'s> Lexer<'s> {
    /// Creates a lexer over the given source.
    pub fn new(src: &'s str) -> Self {
        Self {
            src,
            raw: RawToken::lexer(src),
            line: 1,
            line_start: 0,
            done: false,
        }
    }

    /// Whether the end of the source has been reached.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn location(&self, offset: usize) -> SourceLocation<'s> {
        SourceLocation {
            src: self.src,
            line: self.line,
            column: offset - self.line_start,
            offset,
        }
    }

    fn end_token(&mut self, offset: usize) -> Token<'s> {
        self.done = true;
        Token { kind: TokenKind::End, text: "", location: self.location(offset) }
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Token<'s> {
        if self.done {
            return self.end_token(self.raw.span().end);
        }

        let Some(result) = self.raw.next() else {
            return self.end_token(self.src.len());
        };
        let span = self.raw.span();
        let location = self.location(span.start);

        let kind = match result {
            Ok(RawToken::Comma)     => TokenKind::Comma,
            Ok(RawToken::Period)    => TokenKind::Period,
            Ok(RawToken::Pound)     => TokenKind::Pound,
            Ok(RawToken::Colon)     => TokenKind::Colon,
            Ok(RawToken::Minus)     => TokenKind::Minus,
            Ok(RawToken::Number)    => TokenKind::Number,
            Ok(RawToken::Word)      => TokenKind::Word,
            Ok(RawToken::String)    => TokenKind::String,
            Ok(RawToken::Linebreak) => TokenKind::Linebreak,
            Ok(RawToken::Nul)       => return self.end_token(span.start),
            Err(())                 => TokenKind::Unknown,
        };

        let text = match kind {
            // strip quotes
            TokenKind::String => &self.src[(span.start + 1)..(span.end - 1)],
            _ => &self.src[span.clone()],
        };

        if kind == TokenKind::Linebreak {
            self.line += 1;
            self.line_start = span.end;
        }

        Token { kind, text, location }
    }
}
impl<'s> Iterator for Lexer<'s> {
    type Item = Token<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.done {
            true  => None,
            false => Some(self.next_token()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, TokenKind};

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).map(|t| t.kind).collect()
    }
    fn texts(src: &str) -> Vec<&str> {
        Lexer::new(src).map(|t| t.text).collect()
    }

    #[test]
    fn test_punct() {
        assert_eq!(kinds(". , : # -"), [
            TokenKind::Period,
            TokenKind::Comma,
            TokenKind::Colon,
            TokenKind::Pound,
            TokenKind::Minus,
            TokenKind::End,
        ]);
    }

    #[test]
    fn test_numbers_over_consume() {
        let mut lexer = Lexer::new("0abc 123 9_z");
        let t = lexer.next_token();
        assert_eq!((t.kind, t.text), (TokenKind::Number, "0abc"));
        let t = lexer.next_token();
        assert_eq!((t.kind, t.text), (TokenKind::Number, "123"));
        // underscores are not alphanumeric
        let t = lexer.next_token();
        assert_eq!((t.kind, t.text), (TokenKind::Number, "9"));
        let t = lexer.next_token();
        assert_eq!((t.kind, t.text), (TokenKind::Word, "_z"));
    }

    #[test]
    fn test_words() {
        assert_eq!(texts("ADD x3000 _under R7 BRnzp"), ["ADD", "x3000", "_under", "R7", "BRnzp", ""]);
        assert!(kinds("ADD x3000 _under R7").iter().take(4).all(|&k| k == TokenKind::Word));
    }

    #[test]
    fn test_comments_and_whitespace() {
        assert_eq!(kinds("  \t HALT ; comment, with: punctuation\n; whole line\r\n"), [
            TokenKind::Word,
            TokenKind::Linebreak,
            TokenKind::Linebreak,
            TokenKind::End,
        ]);
    }

    #[test]
    fn test_strings() {
        let mut lexer = Lexer::new(r#""abc" 'def' "a\"b" 'it\'s' "\n""#);
        for expected in ["abc", "def", r#"a\"b"#, r"it\'s", r"\n"] {
            let t = lexer.next_token();
            assert_eq!(t.kind, TokenKind::String);
            assert_eq!(t.text, expected);
        }
        assert_eq!(lexer.next_token().kind, TokenKind::End);

        // mismatched quote characters don't close
        let t = Lexer::new(r#""it's""#).next_token();
        assert_eq!((t.kind, t.text), (TokenKind::String, "it's"));
    }

    #[test]
    fn test_unclosed_string() {
        let mut lexer = Lexer::new("\"abc\nHALT");
        let t = lexer.next_token();
        assert_eq!((t.kind, t.text), (TokenKind::Unknown, "\"abc"));
        assert_eq!(lexer.next_token().kind, TokenKind::Linebreak);
        assert_eq!(lexer.next_token().text, "HALT");
    }

    #[test]
    fn test_unknown() {
        assert_eq!(kinds("@ $ ["), [
            TokenKind::Unknown,
            TokenKind::Unknown,
            TokenKind::Unknown,
            TokenKind::End,
        ]);
    }

    #[test]
    fn test_end_is_sticky() {
        let mut lexer = Lexer::new("HALT");
        assert_eq!(lexer.next_token().kind, TokenKind::Word);
        assert!(!lexer.is_done());
        for _ in 0..3 {
            assert_eq!(lexer.next_token().kind, TokenKind::End);
            assert!(lexer.is_done());
        }

        // NUL ends the source early
        assert_eq!(kinds("HALT\0HALT"), [TokenKind::Word, TokenKind::End]);
    }

    #[test]
    fn test_locations() {
        let src = ".orig x3000\n  AND R0, R0, #0\n.end";
        let tokens: Vec<_> = Lexer::new(src).collect();

        let and = tokens.iter().find(|t| t.text == "AND").unwrap();
        assert_eq!((and.location.line, and.location.column, and.location.offset), (2, 2, 14));
        assert_eq!(and.location.line_text(), "  AND R0, R0, #0");

        let end = tokens.iter().find(|t| t.text == "end").unwrap();
        assert_eq!(end.location.line, 3);
        assert_eq!(end.location.line_text(), ".end");

        // line break belongs to the line it ends
        let lb = tokens.iter().find(|t| t.kind == TokenKind::Linebreak).unwrap();
        assert_eq!(lb.location.line, 1);
        assert_eq!(lb.location.line_text(), ".orig x3000");
    }
}
