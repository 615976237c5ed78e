//! Diagnostics for the semantic pipeline.
//!
//! Every failure the pipeline can report is a [`SemanticError`]: one of
//! five fatal kinds, each carrying the source location mandated for it.
//! The `Display` form is the classic compiler line
//! `<file>:<line>:<col>: error: <message>`; the [`miette::Diagnostic`]
//! implementation carries the same information into rich reports for
//! embedders that render with miette.

use crate::ast::SourceLoc;
use miette::{Diagnostic, Report, Severity};
use std::fmt;

/// Categories of fatal semantic errors.
///
/// Every kind aborts the pipeline; the distinction exists so embedders and
/// tests can tell failures apart without parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// A name reference whose lookup found nothing.
    UnresolvedName,
    /// A name reference whose declaration chain has more than one entry.
    AmbiguousName,
    /// A `typedef` chain that loops back on itself.
    TypeAliasCycle,
    /// Type selection found no potential type compatible with the context.
    TypeMismatch,
    /// Type selection could not narrow the potential types to one.
    AmbiguousType,
}

impl SemanticErrorKind {
    /// A stable diagnostic code for this kind.
    pub fn code(self) -> &'static str {
        match self {
            Self::UnresolvedName => "p4::unresolved_name",
            Self::AmbiguousName => "p4::ambiguous_name",
            Self::TypeAliasCycle => "p4::type_alias_cycle",
            Self::TypeMismatch => "p4::type_mismatch",
            Self::AmbiguousType => "p4::ambiguous_type",
        }
    }
}

/// A fatal semantic error with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    /// The error category.
    pub kind: SemanticErrorKind,
    /// The main message, without location prefix.
    pub message: String,
    /// Where the error is reported.
    pub loc: SourceLoc,
    /// The source file name, when the embedder supplied one.
    pub file: Option<String>,
    /// Optional fix-it text.
    pub help: Option<String>,
}

impl SemanticError {
    /// Creates an error of the given kind.
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>, loc: SourceLoc) -> Self {
        Self {
            kind,
            message: message.into(),
            loc,
            file: None,
            help: None,
        }
    }

    /// Attaches the source file name used in the `Display` prefix.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Converts into a miette report for rich rendering.
    pub fn to_report(self) -> Report {
        Report::new(self)
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}: error: {}", file, self.loc, self.message),
            None => write!(f, "{}: error: {}", self.loc, self.message),
        }
    }
}

impl std::error::Error for SemanticError {}

impl Diagnostic for SemanticError {
    fn severity(&self) -> Option<Severity> {
        Some(Severity::Error)
    }

    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }
}

// ----------------------------------------------------------------------
// Constructors for the five kinds
// ----------------------------------------------------------------------

/// An unresolved type reference, reported at the name's location.
pub fn unresolved_type_reference(name: &str, loc: SourceLoc) -> SemanticError {
    SemanticError::new(
        SemanticErrorKind::UnresolvedName,
        format!("unresolved type reference `{}`", name),
        loc,
    )
}

/// An unresolved value name, reported at the name's location.
pub fn unresolved_name(name: &str, loc: SourceLoc) -> SemanticError {
    SemanticError::new(
        SemanticErrorKind::UnresolvedName,
        format!("unresolved name `{}`", name),
        loc,
    )
}

/// An ambiguous type reference, reported at the name's location.
pub fn ambiguous_type_reference(name: &str, loc: SourceLoc) -> SemanticError {
    SemanticError::new(
        SemanticErrorKind::AmbiguousName,
        format!("ambiguous type reference `{}`", name),
        loc,
    )
    .with_help("the name is declared more than once in the same scope")
}

/// A typedef cycle, reported at the typedef's declaration.
pub fn type_aliasing_cycle(name: &str, loc: SourceLoc) -> SemanticError {
    SemanticError::new(
        SemanticErrorKind::TypeAliasCycle,
        format!("type aliasing cycle through `{}`", name),
        loc,
    )
}

/// A failed selection, reported at the expression.
pub fn expression_type_mismatch(expected: Option<&str>, loc: SourceLoc) -> SemanticError {
    let message = match expected {
        Some(expected) => format!("expression type mismatch; expected `{}`", expected),
        None => "expression type mismatch".to_string(),
    };
    SemanticError::new(SemanticErrorKind::TypeMismatch, message, loc)
}

/// A selection that could not be narrowed, reported at the expression.
pub fn ambiguous_type(loc: SourceLoc) -> SemanticError {
    SemanticError::new(
        SemanticErrorKind::AmbiguousType,
        "ambiguous type".to_string(),
        loc,
    )
    .with_help("add a cast or a width suffix to settle the type")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_file_line_and_column() {
        let err = unresolved_type_reference("Ethernet", SourceLoc::new(12, 7)).with_file("l2.p4");
        assert_eq!(
            err.to_string(),
            "l2.p4:12:7: error: unresolved type reference `Ethernet`"
        );
    }

    #[test]
    fn display_without_file_keeps_location() {
        let err = ambiguous_type(SourceLoc::new(3, 4));
        assert_eq!(err.to_string(), "3:4: error: ambiguous type");
    }

    #[test]
    fn kinds_have_distinct_codes() {
        let codes = [
            SemanticErrorKind::UnresolvedName,
            SemanticErrorKind::AmbiguousName,
            SemanticErrorKind::TypeAliasCycle,
            SemanticErrorKind::TypeMismatch,
            SemanticErrorKind::AmbiguousType,
        ]
        .map(SemanticErrorKind::code);
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn report_preserves_the_message() {
        let report = type_aliasing_cycle("A", SourceLoc::new(1, 9)).to_report();
        assert!(report.to_string().contains("type aliasing cycle"));
    }

    #[test]
    fn mismatch_mentions_expectation_when_known() {
        let err = expression_type_mismatch(Some("bit<8>"), SourceLoc::new(2, 20));
        assert!(err.message.contains("bit<8>"));
        assert_eq!(err.kind, SemanticErrorKind::TypeMismatch);
    }
}
