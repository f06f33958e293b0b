//! Error interface and diagnostics for the assembler.
//!
//! Every stage of the pipeline reports problems as values implementing [`Error`],
//! which adds a source location and an optional help message on top of [`std::error::Error`].
//!
//! Stages do not stop at the first problem. Instead, each error (or warning) is recorded
//! into a [`Diagnostics`] collector which is passed through the pipeline,
//! and the stage reports overall failure once it's done.

use std::borrow::Cow;

use crate::parse::lex::SourceLocation;

/// Unified error interface for all errors in this crate.
///
/// Note that the [`Display`] implementation is used for a brief message,
/// where as [`Error::help`] is used for any clarifying messages.
///
/// [`Display`]: std::fmt::Display
pub trait Error: std::error::Error {
    /// The location in source that caused this error, if there is one.
    fn location(&self) -> Option<SourceLocation<'_>> {
        None
    }

    /// A clarifying message to help aid someone in how to fix the message.
    fn help(&self) -> Option<Cow<'_, str>> {
        None
    }
}

/// How serious a [`Diagnostic`] is.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Severity {
    /// A problem which stops assembly.
    Error,
    /// A problem which is reported, but which does not stop assembly.
    Warning,
}
impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error   => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Where a [`Diagnostic`] points to in source.
///
/// Unlike [`SourceLocation`], this owns its line of source text,
/// so diagnostics can outlive the source buffer.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DiagLocation {
    /// The line number (starting at 1).
    pub line: usize,
    /// The byte offset from the start of the line.
    pub column: usize,
    /// The full text of the line.
    pub source_line: String,
}
impl From<SourceLocation<'_>> for DiagLocation {
    fn from(value: SourceLocation<'_>) -> Self {
        DiagLocation {
            line: value.line,
            column: value.column,
            source_line: value.line_text().to_string(),
        }
    }
}

/// One reported problem.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Diagnostic {
    /// Whether this is an error or warning.
    pub severity: Severity,
    /// A brief message.
    pub message: String,
    /// An optional hint on how to fix the problem.
    pub help: Option<String>,
    /// Where the problem occurred, if known.
    pub location: Option<DiagLocation>,
}
impl Diagnostic {
    fn new<E: Error + ?Sized>(severity: Severity, e: &E) -> Self {
        Diagnostic {
            severity,
            message: e.to_string(),
            help: e.help().map(Cow::into_owned),
            location: e.location().map(DiagLocation::from),
        }
    }
}
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}: {}", self.severity, self.message)?;

        if let Some(DiagLocation { line, column, source_line }) = &self.location {
            let lno = line.to_string();
            let pad = " ".repeat(lno.len());

            // Keep tabs in the caret line so it lines up with the source line.
            let indent: String = source_line.char_indices()
                .take_while(|&(i, _)| i < *column)
                .map(|(_, c)| if c == '\t' { '\t' } else { ' ' })
                .collect();

            writeln!(f, "{pad}--> {line}:{}", column + 1)?;
            writeln!(f, "{pad} |")?;
            writeln!(f, "{lno} | {source_line}")?;
            writeln!(f, "{pad} | {indent}^")?;
        }
        if let Some(help) = &self.help {
            writeln!(f, "  = help: {help}")?;
        }

        Ok(())
    }
}

/// Collects the errors and warnings raised while assembling a source.
///
/// # Example
/// ```
/// use lc3_asm::asm::assemble;
/// use lc3_asm::err::{Diagnostics, Severity};
///
/// let mut diag = Diagnostics::new();
/// let result = assemble(".orig x3000\nBR NOWHERE\n.end\n", &mut diag);
///
/// assert!(result.is_err());
/// assert_eq!(diag.error_count(), 1);
///
/// let first = diag.iter().next().unwrap();
/// assert_eq!(first.severity, Severity::Error);
/// assert_eq!(first.location.as_ref().map(|l| l.line), Some(2));
/// ```
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}
impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn error<E: Error + ?Sized>(&mut self, e: &E) {
        self.errors += 1;
        self.entries.push(Diagnostic::new(Severity::Error, e));
    }

    /// Records a warning.
    pub fn warning<E: Error + ?Sized>(&mut self, e: &E) {
        self.warnings += 1;
        self.entries.push(Diagnostic::new(Severity::Warning, e));
    }

    /// The number of errors recorded.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// The number of warnings recorded.
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Whether any error has been recorded.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over recorded diagnostics in the order they were reported.
    pub fn iter(&self) -> impl Iterator<Item=&Diagnostic> + '_ {
        self.entries.iter()
    }

    /// Iterates over the messages of recorded errors.
    pub fn error_messages(&self) -> impl Iterator<Item=&str> + '_ {
        self.entries.iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| &*d.message)
    }
}
impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for d in &self.entries {
            writeln!(f, "{d}")?;
        }
        Ok(())
    }
}

/// The result of a pipeline stage which found errors.
///
/// The errors themselves are recorded in the [`Diagnostics`] passed to the stage.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct StageFailed {
    /// How many errors the stage reported.
    pub errors: usize,
}
impl StageFailed {
    /// Fails if the stage reported errors since `errors_before` was taken from [`Diagnostics::error_count`].
    pub(crate) fn check(diag: &Diagnostics, errors_before: usize) -> Result<(), StageFailed> {
        match diag.error_count().saturating_sub(errors_before) {
            0 => Ok(()),
            errors => Err(StageFailed { errors }),
        }
    }
}
impl std::fmt::Display for StageFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors {
            1 => f.write_str("stage failed with 1 error"),
            n => write!(f, "stage failed with {n} errors"),
        }
    }
}
impl std::error::Error for StageFailed {}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::{Diagnostics, Error, Severity};
    use crate::parse::lex::SourceLocation;

    #[derive(Debug)]
    struct TestErr<'s>(SourceLocation<'s>);
    impl std::fmt::Display for TestErr<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("something broke")
        }
    }
    impl std::error::Error for TestErr<'_> {}
    impl Error for TestErr<'_> {
        fn location(&self) -> Option<SourceLocation<'_>> {
            Some(self.0)
        }
        fn help(&self) -> Option<Cow<'_, str>> {
            Some("try fixing it".into())
        }
    }

    #[test]
    fn test_counts() {
        let src = "AND R0, R0, #0\nHALT\n";
        let mut diag = Diagnostics::new();
        assert!(diag.is_empty());

        diag.error(&TestErr(SourceLocation::new(src, 4)));
        diag.warning(&TestErr(SourceLocation::new(src, 15)));
        diag.error(&TestErr(SourceLocation::new(src, 15)));

        assert_eq!(diag.error_count(), 2);
        assert_eq!(diag.warning_count(), 1);
        assert!(diag.has_errors());

        let severities: Vec<_> = diag.iter().map(|d| d.severity).collect();
        assert_eq!(severities, [Severity::Error, Severity::Warning, Severity::Error]);
    }

    #[test]
    fn test_render() {
        let src = "AND R0, R0, #0\n\tHALT\n";
        let mut diag = Diagnostics::new();
        diag.error(&TestErr(SourceLocation::new(src, 4)));
        diag.error(&TestErr(SourceLocation::new(src, 16)));

        let mut entries = diag.iter();
        assert_eq!(entries.next().unwrap().to_string(), "\
error: something broke
 --> 1:5
  |
1 | AND R0, R0, #0
  |     ^
  = help: try fixing it
");
        assert_eq!(entries.next().unwrap().to_string(), "\
error: something broke
 --> 2:2
  |
2 | \tHALT
  | \t^
  = help: try fixing it
");
    }
}
