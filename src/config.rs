//! Scan configuration from `.projref.toml`.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// Name of the optional config file at the scan root.
pub const CONFIG_FILE_NAME: &str = ".projref.toml";

/// Project file extension scanned when the config names none.
const DEFAULT_EXTENSION: &str = "csproj";

/// Scan configuration loaded from `.projref.toml`.
/// Include/exclude patterns are path prefixes applied to project files,
/// relative to the scan root.
#[derive(Debug)]
pub struct Config {
    /// Prefixes that drop an otherwise included project.
    exclude: Vec<String>,
    /// Project file extensions to scan, without the dot.
    extensions: Vec<String>,
    /// Prefixes a project must start with; empty means everything.
    include: Vec<String>,
    /// Explicit packages directory, already joined to the scan root.
    packages_dir: Option<PathBuf>,
}

/// Raw TOML structure for `.projref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjrefTomlConfig {
    /// See [`Config::exclude`].
    #[serde(default)]
    exclude: Vec<String>,
    /// See [`Config::extensions`].
    #[serde(default)]
    extensions: Vec<String>,
    /// See [`Config::include`].
    #[serde(default)]
    include: Vec<String>,
    /// See [`Config::packages_dir`].
    #[serde(default)]
    packages_dir: Option<PathBuf>,
}

impl Config {
    /// Extensions of project files to scan.
    pub fn extensions(&self) -> &[String] {
        return &self.extensions;
    }

    /// Load config from `.projref.toml` in the given root directory.
    /// Returns a default that scans every `.csproj` if the file doesn't exist.
    /// A file that exists but is malformed is an error, never a silent default.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE_NAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::scan_everything_by_default()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: ProjrefTomlConfig = toml::from_str(&content)?;
        let extensions = if raw.extensions.is_empty() {
            vec![DEFAULT_EXTENSION.to_string()]
        } else {
            raw.extensions.into_iter().map(|e| return e.trim_start_matches('.').to_string()).collect()
        };
        return Ok(Self {
            exclude: raw.exclude,
            extensions,
            include: raw.include,
            packages_dir: raw.packages_dir.map(|dir| return root.join(dir)),
        });
    }

    /// Packages directory to use instead of searching upward from each project.
    pub fn packages_dir(&self) -> Option<&Path> {
        return self.packages_dir.as_deref();
    }

    /// Default config that includes every `.csproj` and excludes nothing.
    fn scan_everything_by_default() -> Self {
        return Self {
            exclude: Vec::new(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            include: Vec::new(),
            packages_dir: None,
        };
    }

    /// Check whether a project file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}
