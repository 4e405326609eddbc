//! Dotted package and assembly versions with optional pre-release tags.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Up to four dot-separated integer groups plus an optional `-tag` suffix.
/// The match may start anywhere in the input, so hint paths and folder names parse too.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r"(?:\.|\b)(?<major>\d+)(?:\.(?<minor>\d+))?(?:\.(?<revision>\d+))?(?:\.(?<build>\d+))?(?:-(?<prerelease>.+))?",
    )
    .expect("valid version regex");
});

/// A parsed version. Immutable once constructed; ordering ignores the raw text.
#[derive(Debug, Clone, Default)]
pub struct Version {
    /// Fourth numeric component.
    build: Option<u64>,
    /// First numeric component, zero when the input did not parse.
    major: u64,
    /// Whether the input matched the version grammar at all.
    matched: bool,
    /// Second numeric component.
    minor: Option<u64>,
    /// Text after the first `-` following the numeric groups.
    prerelease: Option<String>,
    /// The input exactly as given, used for display when nothing matched.
    raw: String,
    /// Third numeric component.
    revision: Option<u64>,
}

impl Version {
    /// Fourth numeric component, if present.
    pub const fn build(&self) -> Option<u64> {
        return self.build;
    }

    /// Compare numeric components only, ignoring any pre-release tag.
    ///
    /// Assembly versions never carry a tag while package folders often do,
    /// so consistency checks between the two use this ordering.
    pub fn cmp_release(&self, other: &Self) -> Ordering {
        return self
            .major
            .cmp(&other.major)
            .then_with(|| return self.minor.unwrap_or(0).cmp(&other.minor.unwrap_or(0)))
            .then_with(|| return self.revision.unwrap_or(0).cmp(&other.revision.unwrap_or(0)))
            .then_with(|| return self.build.unwrap_or(0).cmp(&other.build.unwrap_or(0)));
    }

    /// Whether the input matched the version grammar.
    pub const fn is_parsed(&self) -> bool {
        return self.matched;
    }

    /// First numeric component.
    pub const fn major(&self) -> u64 {
        return self.major;
    }

    /// Second numeric component, if present.
    pub const fn minor(&self) -> Option<u64> {
        return self.minor;
    }

    /// Parse free-form text. Never fails: input without a version yields a
    /// zero-valued instance that still displays the original text.
    pub fn parse(text: &str) -> Self {
        let unparsed = Self {
            raw: text.to_string(),
            ..Self::default()
        };
        let Some(caps) = VERSION_PATTERN.captures(text) else {
            return unparsed;
        };

        let group = |name: &str| return caps.name(name).map(|m| return m.as_str());
        let number = |name: &str| -> Result<Option<u64>, std::num::ParseIntError> {
            return group(name).map(str::parse::<u64>).transpose();
        };

        // Digit runs too long for u64 are treated like any other unparseable input.
        let (Ok(Some(major)), Ok(minor), Ok(revision), Ok(build)) =
            (number("major"), number("minor"), number("revision"), number("build"))
        else {
            return unparsed;
        };

        return Self {
            build,
            major,
            matched: true,
            minor,
            prerelease: group("prerelease").map(str::to_string),
            raw: text.to_string(),
            revision,
        };
    }

    /// Pre-release tag without the leading `-`.
    pub fn prerelease(&self) -> Option<&str> {
        return self.prerelease.as_deref();
    }

    /// The text this version was parsed from.
    pub fn raw(&self) -> &str {
        return &self.raw;
    }

    /// Third numeric component, if present.
    pub const fn revision(&self) -> Option<u64> {
        return self.revision;
    }
}

impl fmt::Display for Version {
    /// Render `major[.minor[.revision[.build]]][-prerelease]`, or the raw text if unparsed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.matched {
            return f.write_str(&self.raw);
        }
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
            if let Some(revision) = self.revision {
                write!(f, ".{revision}")?;
                if let Some(build) = self.build {
                    write!(f, ".{build}")?;
                }
            }
        }
        if let Some(prerelease) = &self.prerelease {
            write!(f, "-{prerelease}")?;
        }
        return Ok(());
    }
}

impl Eq for Version {}

impl Ord for Version {
    /// Major, minor, revision, build (missing parts count as zero), then the
    /// pre-release tag by ordinal comparison with a missing tag treated as empty.
    fn cmp(&self, other: &Self) -> Ordering {
        return self.cmp_release(other).then_with(|| {
            return self
                .prerelease
                .as_deref()
                .unwrap_or("")
                .cmp(other.prerelease.as_deref().unwrap_or(""));
        });
    }
}

impl PartialEq for Version {
    /// Equal when `cmp` says so; `1.0` equals `1.0.0.0`.
    fn eq(&self, other: &Self) -> bool {
        return self.cmp(other) == Ordering::Equal;
    }
}

impl PartialOrd for Version {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl serde::Serialize for Version {
    /// Serialize as the display string.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return serializer.collect_str(self);
    }
}
