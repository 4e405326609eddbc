/// Core domain types for projref: reference declarations and their derived facts.
use std::sync::LazyLock;

use regex::Regex;

use crate::version::Version;

/// Hint paths of the form `.../packages/<folder>/.../lib/...`, either separator.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static PACKAGE_HINT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)(?:^|[\\/])packages[\\/](?<folder>[^\\/]+)[\\/](?:.*[\\/])?lib[\\/]")
        .expect("valid hint path regex");
});

/// A package declaration, read inline from an SDK-style project or from a
/// `packages.config` manifest.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PackageReference {
    /// Package identity.
    pub name: String,
    /// Target framework moniker recorded by the manifest, if any.
    pub target_framework: Option<String>,
    /// Declared version; SDK-style projects may omit it.
    pub version: Option<String>,
}

/// A reference to a sibling source project.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProjectReference {
    /// Display name of the referenced project.
    pub name: String,
    /// The `Include` path exactly as declared.
    pub path: String,
}

/// One assembly reference declaration plus the facts derived from it.
/// Derived fields are computed on construction, so a package-managed
/// record always has a hint path.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReferenceRecord {
    /// Raw `Include` identity, possibly carrying version and culture tokens.
    full_name: String,
    /// Declared on-disk location.
    hint_path: Option<String>,
    /// Hint path points into a package folder's `lib` directory.
    is_package_managed: bool,
    /// `Private` metadata was exactly `True`.
    is_private: bool,
    /// Assembly identity before the first comma.
    name: String,
    /// Version implied by the package folder, when package-managed.
    package_version: Option<Version>,
    /// Embedded `Version=` token, or the project's target version.
    version: Version,
}

impl ReferenceRecord {
    /// Build a record from a declaration's `Include` identity and metadata.
    /// `default_version` applies when the identity carries no `Version=` token.
    pub fn from_declaration(
        include: &str,
        hint_path: Option<String>,
        is_private: bool,
        default_version: &str,
    ) -> Self {
        let mut tokens = include.split(',');
        let name = tokens.next().unwrap_or_default().trim().to_string();
        let version_text = tokens
            .find_map(|t| return t.trim().strip_prefix("Version="))
            .unwrap_or(default_version);

        let folder = hint_path.as_deref().and_then(package_folder);
        let package_version = folder.map(|folder| return version_from_package_folder(folder, &name));

        return Self {
            full_name: include.to_string(),
            is_package_managed: package_version.is_some(),
            hint_path,
            is_private,
            name,
            package_version,
            version: Version::parse(version_text),
        };
    }

    /// Raw `Include` identity.
    pub fn full_name(&self) -> &str {
        return &self.full_name;
    }

    /// Declared hint path.
    pub fn hint_path(&self) -> Option<&str> {
        return self.hint_path.as_deref();
    }

    /// Whether the hint path points into a package folder.
    pub const fn is_package_managed(&self) -> bool {
        return self.is_package_managed;
    }

    /// Whether `Private` was `True`.
    pub const fn is_private(&self) -> bool {
        return self.is_private;
    }

    /// Assembly identity.
    pub fn name(&self) -> &str {
        return &self.name;
    }

    /// Version implied by the package folder.
    pub const fn package_version(&self) -> Option<&Version> {
        return self.package_version.as_ref();
    }

    /// Declared (or defaulted) version.
    pub const fn version(&self) -> &Version {
        return &self.version;
    }
}

/// The package folder segment of a package-managed hint path.
pub fn package_folder(hint_path: &str) -> Option<&str> {
    return PACKAGE_HINT_PATH
        .captures(hint_path)
        .and_then(|caps| return caps.name("folder"))
        .map(|m| return m.as_str());
}

/// Parse the version out of a `<name>.<version>` folder name. Falls back to
/// the first version-looking run when the folder is named after another package.
fn version_from_package_folder(folder: &str, name: &str) -> Version {
    let prefix_len = name.len().saturating_add(1);
    let stripped = folder
        .get(..prefix_len)
        .filter(|head| {
            return head.ends_with('.')
                && head.get(..name.len()).is_some_and(|n| return n.eq_ignore_ascii_case(name));
        })
        .and_then(|_| return folder.get(prefix_len..));
    return Version::parse(stripped.unwrap_or(folder));
}
