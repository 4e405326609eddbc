//! Locating restored package folders on disk.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Name of the folder that holds restored packages, searched upward from a project.
const PACKAGES_DIR_NAME: &str = "packages";

/// Finds candidate package directories for a package name.
pub trait PackageDiscovery {
    /// Directories under `packages_root` that hold some version of `name`.
    fn find_package_directories(&self, packages_root: &Path, name: &str) -> Vec<PathBuf>;
}

/// Lists `<name>.<version>` directories directly under the packages root.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPackageDiscovery;

impl PackageDiscovery for FsPackageDiscovery {
    fn find_package_directories(&self, packages_root: &Path, name: &str) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = WalkDir::new(packages_root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| return e.file_type().is_dir())
            .filter(|e| return is_package_folder_for(&e.file_name().to_string_lossy(), name))
            .map(walkdir::DirEntry::into_path)
            .collect();
        found.sort();
        return found;
    }
}

/// `path` made absolute against the working directory, or unchanged if that fails.
pub fn absolutize(path: &Path) -> PathBuf {
    return std::path::absolute(path).unwrap_or_else(|_| return path.to_path_buf());
}

/// First `packages` directory found beside the project file or in any
/// ancestor. Relative paths are resolved first, so `..` above the working
/// directory is searched too.
pub fn find_packages_root(document_path: &Path) -> Option<PathBuf> {
    return absolutize(document_path)
        .ancestors()
        .skip(1)
        .map(|dir| return dir.join(PACKAGES_DIR_NAME))
        .find(|candidate| return candidate.is_dir());
}

/// Whether `hint_path` lies inside `dir`, where `dir` is relative to the same
/// base. Separators and ASCII case are ignored, and the match must end on a
/// path boundary.
pub fn hint_path_within(hint_path: &str, dir: &Path) -> bool {
    let hint = normalize_separators(hint_path);
    let prefix = normalize_separators(&dir.to_string_lossy());
    if prefix.is_empty() {
        return true;
    }
    let Some(head) = hint.get(..prefix.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(&prefix) {
        return false;
    }
    return hint.get(prefix.len()..).is_some_and(|rest| return rest.is_empty() || rest.starts_with('/'));
}

/// Whether a directory name is `<name>.<version>` for the given package.
fn is_package_folder_for(folder: &str, name: &str) -> bool {
    let Some(head) = folder.get(..name.len()) else {
        return false;
    };
    let mut rest = folder.get(name.len()..).unwrap_or_default().chars();
    return head.eq_ignore_ascii_case(name)
        && rest.next() == Some('.')
        && rest.next().is_some_and(|c| return c.is_ascii_digit());
}

/// Forward slashes only, no `./` segments, no trailing slash.
fn normalize_separators(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let segments: Vec<&str> = unified.split('/').filter(|s| return !s.is_empty() && *s != ".").collect();
    return segments.join("/");
}

/// Lexical path from `from_dir` to `to`. Both must be relative to the same
/// base (or both absolute); the filesystem is not consulted.
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from_dir.components().filter(|c| return *c != Component::CurDir).collect();
    let target: Vec<Component<'_>> = to.components().filter(|c| return *c != Component::CurDir).collect();

    let common = from.iter().zip(target.iter()).take_while(|(a, b)| return a == b).count();

    let mut out = PathBuf::new();
    for _ in from.iter().skip(common) {
        out.push("..");
    }
    for component in target.iter().skip(common) {
        out.push(component.as_os_str());
    }
    return out;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn relative_path_climbs_out_of_project_dir() {
        let rel = relative_path(Path::new("sln/Proj"), Path::new("sln/packages/Foo.1.0.0"));
        assert_eq!(rel, PathBuf::from("../packages/Foo.1.0.0"));

        let rel = relative_path(Path::new("./sln/Proj"), Path::new("sln/Proj/lib"));
        assert_eq!(rel, PathBuf::from("lib"));
    }

    #[test]
    fn hint_path_prefix_ignores_separators_and_case() {
        let dir = Path::new("../packages/Foo.2.3.0");
        assert!(hint_path_within(r"..\packages\foo.2.3.0\lib\net45\Foo.dll", dir));
        assert!(!hint_path_within(r"..\packages\Foo.2.3.0.1\lib\net45\Foo.dll", dir));
        assert!(!hint_path_within(r"..\other\Foo.2.3.0\lib\Foo.dll", dir));
    }

    #[test]
    fn package_folder_requires_dot_and_digit() {
        assert!(is_package_folder_for("Foo.1.0.0", "Foo"));
        assert!(is_package_folder_for("foo.10.0.0-beta", "Foo"));
        assert!(!is_package_folder_for("Foo.Bar.1.0.0", "Foo"));
        assert!(!is_package_folder_for("Foo", "Foo"));
    }

    #[test]
    fn discovers_package_directories_and_root() {
        let dir = tempfile::tempdir().unwrap();
        let packages = dir.path().join("packages");
        std::fs::create_dir_all(packages.join("Foo.1.0.0")).unwrap();
        std::fs::create_dir_all(packages.join("Foo.2.0.0")).unwrap();
        std::fs::create_dir_all(packages.join("Foo.Extensions.1.0.0")).unwrap();
        std::fs::create_dir_all(dir.path().join("src/App")).unwrap();

        let root = find_packages_root(&dir.path().join("src/App/App.csproj")).unwrap();
        assert_eq!(root, packages);

        let found = FsPackageDiscovery.find_package_directories(&root, "Foo");
        assert_eq!(found, vec![packages.join("Foo.1.0.0"), packages.join("Foo.2.0.0")]);
    }
}
