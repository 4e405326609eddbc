/// Crate-level error types for projref diagnostics.
use std::path::PathBuf;

/// All errors in projref carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, element, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-wide error type re-exported by the library")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// Project file is not well-formed markup.
    #[error("malformed document: {}: {reason}", path.display())]
    MalformedDocument {
        /// File that failed to parse.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// Package manifest exists but cannot be parsed.
    #[error("malformed package manifest: {}: {reason}", path.display())]
    MalformedManifest {
        /// Manifest file that failed to parse.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A reference declaration is missing its `Include` identity.
    #[error("reference without Include in {}: <{element}>", path.display())]
    MalformedReference {
        /// Element name of the offending declaration.
        element: String,
        /// Project file containing the declaration.
        path: PathBuf,
    },

    /// Document parsed but has no root `Project` element.
    #[error("missing root Project element: {}", path.display())]
    MissingRootElement {
        /// File without a project root.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
