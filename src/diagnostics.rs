//! Reconciliation diagnostics and markdown rendering of errors.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::Error;
use crate::version::Version;

/// ANSI bold, used for markdown headings on stderr.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// A recoverable finding from reconciliation. Never aborts processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Two declarations with the same name and equal versions; the later one was dropped.
    DuplicateIdentical {
        /// Assembly name.
        name: String,
        /// Hint path of the dropped declaration.
        path: Option<String>,
        /// Version of the dropped declaration.
        version: Version,
    },
    /// Two declarations with the same name and different versions; the lower one was dropped.
    DuplicateSuperseded {
        /// Assembly name.
        name: String,
        /// Hint path of the dropped declaration.
        path: Option<String>,
        /// Version of the dropped declaration.
        version: Version,
    },
    /// A package-managed hint path disagrees with the declared version and no
    /// restored package directory contains it.
    SuspiciousHintPath {
        /// Declared hint path.
        hint_path: String,
        /// Assembly name.
        name: String,
        /// Declared assembly version.
        version: Version,
    },
}

/// Receives reconciliation diagnostics as they are found.
pub trait DiagnosticSink {
    /// Accept one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render one diagnostic as a markdown list item.
pub fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    return match diagnostic {
        Diagnostic::DuplicateIdentical { name, path, version } => {
            format!("- duplicate `{name}` {version}{} (identical, dropped)", render_path(path.as_deref()))
        },
        Diagnostic::DuplicateSuperseded { name, path, version } => {
            format!("- duplicate `{name}` {version}{} (superseded, dropped)", render_path(path.as_deref()))
        },
        Diagnostic::SuspiciousHintPath { hint_path, name, version } => {
            format!("- suspicious hint path for `{name}` {version}: `{hint_path}`")
        },
    };
}

/// Render all diagnostics for one project as a markdown section.
pub fn render_report(project: &Path, diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("## {}\n\n", project.display());
    for d in diagnostics {
        let _ = writeln!(out, "{}", render_diagnostic(d));
    }
    return out;
}

/// A hint path as an inline code suffix, or nothing.
fn render_path(path: Option<&str>) -> String {
    return path.map(|p| return format!(" `{p}`")).unwrap_or_default();
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::MalformedDocument { path, reason } => format!("\
# Error: Malformed Project File

Could not parse `{}`: {reason}

The file was left untouched.
", path.display()),

        Error::MissingRootElement { path } => format!("\
# Error: Not A Project File

`{}` has no root `<Project>` element.

## Fix

Exclude it in `.projref.toml`:

    exclude = [\"{}\"]
", path.display(), path.display()),

        Error::MalformedReference { element, path } => render_malformed_reference(element, path),

        Error::MalformedManifest { path, reason } => format!("\
# Error: Malformed Package Manifest

Could not read `{}`: {reason}
", path.display()),

        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check the syntax of `.projref.toml`.
"),
    };
}

fn render_malformed_reference(element: &str, path: &Path) -> String {
    return format!(
        "\
# Error: Reference Without Identity

A `<{element}>` declaration in `{}` has no `Include` attribute.
Reconciling would silently drop a dependency, so the file was left untouched.

## Fix

Add the missing `Include` or delete the declaration by hand.
",
        path.display()
    );
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn superseded_names_dropped_version() {
        let d = Diagnostic::DuplicateSuperseded {
            name: "A".to_string(),
            path: None,
            version: Version::parse("1.0.0.0"),
        };
        assert_eq!(render_diagnostic(&d), "- duplicate `A` 1.0.0.0 (superseded, dropped)");
    }

    #[test]
    fn vec_collects_reports() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.report(Diagnostic::SuspiciousHintPath {
            hint_path: r"..\packages\Foo.1.0.0\lib\Foo.dll".to_string(),
            name: "Foo".to_string(),
            version: Version::parse("2.0.0.0"),
        });
        assert_eq!(sink.len(), 1);
        let report = render_report(Path::new("App/App.csproj"), &sink);
        assert!(report.starts_with("## App/App.csproj\n\n- suspicious hint path for `Foo` 2.0.0.0"));
    }

    #[test]
    fn malformed_reference_names_the_file() {
        let md = render_error(&Error::MalformedReference {
            element: "Reference".to_string(),
            path: std::path::PathBuf::from("Lib.csproj"),
        });
        assert!(md.contains("`Lib.csproj`"));
        assert!(md.starts_with("# Error: Reference Without Identity"));
    }
}
