//! Side manifests that declare packages for legacy projects (`packages.config`).

use std::path::Path;

use tracing::debug;

use crate::error::Error;
use crate::types::PackageReference;
use crate::xml::{NodeId, Tree};

/// File name of the legacy package manifest, expected beside the project file.
pub const MANIFEST_FILE_NAME: &str = "packages.config";

/// Reads and edits a package manifest on behalf of a legacy project.
pub trait PackageManifest {
    /// Declare `name` at `version`, updating the version in place when the
    /// package is already listed.
    ///
    /// # Errors
    ///
    /// Returns errors from reading, parsing, or writing the manifest.
    fn add_package(&self, manifest_path: &Path, name: &str, version: &str, target_framework: &str) -> Result<(), Error>;

    /// All packages declared by the manifest, in file order.
    ///
    /// # Errors
    ///
    /// Returns errors from reading or parsing the manifest.
    fn list_packages(&self, manifest_path: &Path) -> Result<Vec<PackageReference>, Error>;

    /// Remove the first declaration of `name`; absent packages are not an error.
    ///
    /// # Errors
    ///
    /// Returns errors from reading, parsing, or writing the manifest.
    fn remove_package(&self, manifest_path: &Path, name: &str) -> Result<(), Error>;
}

/// `packages.config` backed by the on-disk file. Every call re-reads the file
/// and writes it back only when something changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackagesConfig;

impl PackageManifest for PackagesConfig {
    fn add_package(&self, manifest_path: &Path, name: &str, version: &str, target_framework: &str) -> Result<(), Error> {
        let (mut tree, root) = load_manifest(manifest_path)?;
        let entries = package_entries(&tree, root);

        if let Some(existing) = entries
            .iter()
            .copied()
            .find(|id| return tree.attribute(*id, "id").is_some_and(|n| return n.eq_ignore_ascii_case(name)))
        {
            if tree.attribute(existing, "version") == Some(version) {
                return Ok(());
            }
            tree.set_attribute(existing, "version", version);
            debug!(package = name, version, "updated manifest entry");
        } else {
            let entry = tree.create_element(None, "package");
            tree.set_attribute(entry, "id", name);
            tree.set_attribute(entry, "version", version);
            tree.set_attribute(entry, "targetFramework", target_framework);

            // Manifests are kept sorted by id.
            let successor = entries.iter().copied().find(|id| {
                return tree
                    .attribute(*id, "id")
                    .is_some_and(|n| return n.to_ascii_lowercase() > name.to_ascii_lowercase());
            });
            match successor {
                Some(anchor) => tree.insert_before(anchor, entry),
                None => tree.append_child(root, entry),
            }
            debug!(package = name, version, "added manifest entry");
        }

        std::fs::write(manifest_path, tree.serialize(true))?;
        return Ok(());
    }

    fn list_packages(&self, manifest_path: &Path) -> Result<Vec<PackageReference>, Error> {
        let (tree, root) = load_manifest(manifest_path)?;
        let mut packages = Vec::new();
        for entry in package_entries(&tree, root) {
            let Some(name) = tree.attribute(entry, "id") else {
                return Err(Error::MalformedManifest {
                    path: manifest_path.to_path_buf(),
                    reason: "package entry without id".to_string(),
                });
            };
            packages.push(PackageReference {
                name: name.to_string(),
                target_framework: tree.attribute(entry, "targetFramework").map(str::to_string),
                version: tree.attribute(entry, "version").map(str::to_string),
            });
        }
        return Ok(packages);
    }

    fn remove_package(&self, manifest_path: &Path, name: &str) -> Result<(), Error> {
        let (mut tree, root) = load_manifest(manifest_path)?;
        let Some(entry) = package_entries(&tree, root)
            .into_iter()
            .find(|id| return tree.attribute(*id, "id").is_some_and(|n| return n.eq_ignore_ascii_case(name)))
        else {
            return Ok(());
        };

        tree.detach(entry);
        std::fs::write(manifest_path, tree.serialize(true))?;
        debug!(package = name, "removed manifest entry");
        return Ok(());
    }
}

/// Read and parse a manifest, returning the tree and its `packages` root.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if the manifest is missing,
/// `Error::Io` for other read failures,
/// or `Error::MalformedManifest` if it is not a `packages` document.
fn load_manifest(manifest_path: &Path) -> Result<(Tree, NodeId), Error> {
    let content = match std::fs::read_to_string(manifest_path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::FileNotFound { path: manifest_path.to_path_buf() });
        },
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let tree = Tree::parse(&content).map_err(|reason| {
        return Error::MalformedManifest {
            path: manifest_path.to_path_buf(),
            reason,
        };
    })?;
    let Some(root) = tree.root_element().filter(|r| return tree.local_name(*r) == Some("packages")) else {
        return Err(Error::MalformedManifest {
            path: manifest_path.to_path_buf(),
            reason: "missing <packages> root element".to_string(),
        });
    };
    return Ok((tree, root));
}

/// `<package>` elements directly under the root.
fn package_entries(tree: &Tree, root: NodeId) -> Vec<NodeId> {
    return tree
        .children(root)
        .iter()
        .copied()
        .filter(|id| return tree.local_name(*id) == Some("package"))
        .collect();
}
