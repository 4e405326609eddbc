//! Project descriptor files: loading, dialect-aware queries, edits, and persistence.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::manifest::{MANIFEST_FILE_NAME, PackageManifest, PackagesConfig};
use crate::types::{PackageReference, ProjectReference, ReferenceRecord};
use crate::xml::{NodeId, Tree};

/// Namespace of every element in a legacy project file.
pub const MSBUILD_NAMESPACE: &str = "http://schemas.microsoft.com/developer/msbuild/2003";

/// Moniker reported when a project declares no target framework.
const DEFAULT_TARGET_FRAMEWORK: &str = "net45";

/// Assembly version assumed for references without a `Version=` token
/// when the project declares no target framework version.
const DEFAULT_TARGET_VERSION: &str = "4.5.1";

/// `v4.6.1` style framework versions, rewritten to `net461`.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static FRAMEWORK_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"v(\d+)(?:\.(\d+)(?:\.(\d+)(?:\.(\d+))?)?)?").expect("valid framework regex");
});

/// The two project file grammars. Each variant is pure data: the namespace
/// its elements live in and whether a saved file starts with an XML header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Dialect {
    /// Namespaced project files with `packages.config` side manifests.
    Legacy,
    /// Un-namespaced files whose root carries an `Sdk` attribute.
    SdkStyle,
}

impl Dialect {
    /// Whether saved files start with the XML declaration.
    pub const fn emits_declaration(self) -> bool {
        return match self {
            Self::Legacy => true,
            Self::SdkStyle => false,
        };
    }

    /// Namespace that element queries match against.
    pub const fn namespace(self) -> Option<&'static str> {
        return match self {
            Self::Legacy => Some(MSBUILD_NAMESPACE),
            Self::SdkStyle => None,
        };
    }
}

/// A loaded project file. Owns its tree exclusively; edits mark it dirty and
/// only dirty documents are written back.
pub struct ProjectDocument {
    /// Grammar detected from the root element.
    dialect: Dialect,
    /// An edit happened since load or the last save.
    dirty: bool,
    /// Side manifest collaborator for legacy package declarations.
    manifest: Box<dyn PackageManifest>,
    /// File the document was loaded from and is saved to.
    path: PathBuf,
    /// The root `Project` element.
    root: NodeId,
    /// Parsed markup.
    tree: Tree,
}

impl ProjectDocument {
    /// Declare a package. SDK-style projects get an inline `PackageReference`
    /// (version updated in place when already present); legacy projects
    /// delegate to the `packages.config` beside the file, if there is one.
    ///
    /// # Errors
    ///
    /// Returns manifest errors for legacy projects.
    pub fn add_package_reference(&mut self, name: &str, version: &str, target_framework: &str) -> Result<(), Error> {
        if self.dialect == Dialect::Legacy {
            let manifest_path = self.manifest_path();
            if manifest_path.exists() {
                self.manifest.add_package(&manifest_path, name, version, target_framework)?;
            } else {
                warn!(project = %self.path.display(), package = name, "no packages.config, package not added");
            }
            return Ok(());
        }

        let existing = self
            .item_children("PackageReference")
            .into_iter()
            .find(|id| return self.tree.attribute(*id, "Include").is_some_and(|n| return n.eq_ignore_ascii_case(name)));

        if let Some(element) = existing {
            let version_child = self.child_elements(element, "Version").first().copied();
            let current = self.tree.attribute(element, "Version").map(str::to_string).or_else(|| {
                return version_child.map(|child| return self.tree.text(child).trim().to_string());
            });
            if current.as_deref() != Some(version) {
                if let Some(old) = version_child {
                    let fresh = self.create_text_element("Version", version);
                    self.tree.insert_before(old, fresh);
                    self.tree.detach(old);
                }
                if version_child.is_none() || self.tree.attribute(element, "Version").is_some() {
                    self.tree.set_attribute(element, "Version", version);
                }
                self.dirty = true;
                debug!(package = name, version, "updated package reference");
            }
            return Ok(());
        }

        let parent = self.container_for("PackageReference");
        let element = self.create_element("PackageReference");
        self.tree.set_attribute(element, "Include", name);
        self.tree.set_attribute(element, "Version", version);
        self.tree.append_child(parent, element);
        self.dirty = true;
        debug!(package = name, version, "added package reference");
        return Ok(());
    }

    /// Add a reference to a sibling project unless one with the same path exists.
    /// Legacy projects also record the project id and name as metadata.
    pub fn add_project_reference(&mut self, name: &str, path: &str, id: Uuid) {
        let present = self
            .item_children("ProjectReference")
            .into_iter()
            .any(|element| return self.tree.attribute(element, "Include") == Some(path));
        if present {
            return;
        }

        let parent = self.container_for("ProjectReference");
        let element = self.create_element("ProjectReference");
        self.tree.set_attribute(element, "Include", path);
        if self.dialect == Dialect::Legacy {
            let project = self.create_text_element("Project", &format!("{{{id}}}"));
            let label = self.create_text_element("Name", name);
            self.tree.append_child(element, project);
            self.tree.append_child(element, label);
        }
        self.tree.append_child(parent, element);
        self.dirty = true;
        debug!(project = name, path, "added project reference");
        return;
    }

    /// Assembly references in top-level item groups, in document order.
    /// The iterator borrows the document, so it cannot outlive or observe a
    /// later edit.
    pub fn assembly_references(&self) -> impl Iterator<Item = Result<ReferenceRecord, Error>> + '_ {
        let default_version = self.declared_target_version();
        return self
            .declared_items("Reference")
            .into_iter()
            .map(move |element| return self.reference_record(element, &default_version));
    }

    /// Element children of `parent` with the given local name in this dialect.
    pub(crate) fn child_elements(&self, parent: NodeId, local: &str) -> Vec<NodeId> {
        let namespace = self.dialect.namespace();
        return self
            .tree
            .children(parent)
            .iter()
            .copied()
            .filter(|c| return self.tree.is_element(*c, namespace, local))
            .collect();
    }

    /// The item group holding the first `local` item, or a new group appended to the root.
    fn container_for(&mut self, local: &str) -> NodeId {
        if let Some(parent) = self.item_children(local).first().and_then(|e| return self.tree.parent(*e)) {
            return parent;
        }
        let group = self.create_element("ItemGroup");
        self.tree.append_child(self.root, group);
        return group;
    }

    /// Create a detached element in this dialect's namespace.
    pub(crate) fn create_element(&mut self, local: &str) -> NodeId {
        return self.tree.create_element(self.dialect.namespace(), local);
    }

    /// Create a detached text-only element in this dialect's namespace.
    pub(crate) fn create_text_element(&mut self, local: &str, text: &str) -> NodeId {
        return self.tree.create_text_element(self.dialect.namespace(), local, text);
    }

    /// Items named `local` in top-level item groups. Conditional groups
    /// nested under `Choose` or targets are not included.
    fn declared_items(&self, local: &str) -> Vec<NodeId> {
        return self
            .child_elements(self.root, "ItemGroup")
            .into_iter()
            .flat_map(|group| return self.child_elements(group, local))
            .collect();
    }

    /// Declared `TargetFrameworkVersion` without its leading `v`, or `4.5.1`.
    pub fn declared_target_version(&self) -> String {
        return self
            .property("TargetFrameworkVersion")
            .map_or_else(|| return DEFAULT_TARGET_VERSION.to_string(), |v| return v.trim_start_matches('v').to_string());
    }

    /// Grammar of this document.
    pub const fn dialect(&self) -> Dialect {
        return self.dialect;
    }

    /// Directory containing the project file.
    pub fn directory(&self) -> &Path {
        return self.path.parent().unwrap_or_else(|| return Path::new(""));
    }

    /// Whether there are unsaved edits.
    pub const fn is_dirty(&self) -> bool {
        return self.dirty;
    }

    /// Items with the given local name directly inside any `ItemGroup`.
    fn item_children(&self, local: &str) -> Vec<NodeId> {
        return self
            .item_groups()
            .into_iter()
            .flat_map(|group| return self.child_elements(group, local))
            .collect();
    }

    /// All `ItemGroup` elements anywhere below the root.
    fn item_groups(&self) -> Vec<NodeId> {
        let namespace = self.dialect.namespace();
        return self
            .tree
            .descendants(self.root)
            .into_iter()
            .filter(|id| return self.tree.is_element(*id, namespace, "ItemGroup"))
            .collect();
    }

    /// Load a project file, using `packages.config` for legacy package declarations.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound`, `Error::Io`, `Error::MalformedDocument`,
    /// or `Error::MissingRootElement`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        return Self::load_with_manifest(path, Box::new(PackagesConfig));
    }

    /// Load a project file with a specific side-manifest collaborator.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file is missing, `Error::Io` for
    /// other read failures, `Error::MalformedDocument` if it is not well-formed
    /// markup, or `Error::MissingRootElement` if there is no `Project` root.
    pub fn load_with_manifest(path: &Path, manifest: Box<dyn PackageManifest>) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(Error::MalformedDocument {
                    path: path.to_path_buf(),
                    reason: "not valid UTF-8".to_string(),
                });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        let tree = Tree::parse(&content).map_err(|reason| {
            return Error::MalformedDocument {
                path: path.to_path_buf(),
                reason,
            };
        })?;

        let Some(root) = tree.root_element() else {
            return Err(Error::MissingRootElement { path: path.to_path_buf() });
        };
        let dialect = if tree.attribute(root, "Sdk").is_some() {
            Dialect::SdkStyle
        } else {
            Dialect::Legacy
        };
        if !tree.is_element(root, dialect.namespace(), "Project") {
            return Err(Error::MissingRootElement { path: path.to_path_buf() });
        }

        debug!(project = %path.display(), ?dialect, "loaded project");
        return Ok(Self {
            dialect,
            dirty: false,
            manifest,
            path: path.to_path_buf(),
            root,
            tree,
        });
    }

    /// Path of the side manifest for this project.
    fn manifest_path(&self) -> PathBuf {
        return self.directory().join(MANIFEST_FILE_NAME);
    }

    /// Record that the tree changed.
    pub(crate) const fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Package declarations: inline for SDK-style projects, from
    /// `packages.config` for legacy ones (empty when there is no manifest).
    ///
    /// # Errors
    ///
    /// Returns manifest errors for legacy projects.
    pub fn package_references(&self) -> Result<Vec<PackageReference>, Error> {
        if self.dialect == Dialect::Legacy {
            let manifest_path = self.manifest_path();
            if !manifest_path.exists() {
                return Ok(Vec::new());
            }
            return self.manifest.list_packages(&manifest_path);
        }

        return Ok(self
            .item_children("PackageReference")
            .into_iter()
            .filter_map(|element| {
                let name = self.tree.attribute(element, "Include")?;
                let version = self.tree.attribute(element, "Version").map(str::to_string).or_else(|| {
                    return self
                        .child_elements(element, "Version")
                        .first()
                        .map(|v| return self.tree.text(*v).trim().to_string());
                });
                return Some(PackageReference {
                    name: name.to_string(),
                    target_framework: None,
                    version,
                });
            })
            .collect());
    }

    /// File this document was loaded from.
    pub fn path(&self) -> &Path {
        return &self.path;
    }

    /// Project references in document order. Legacy projects name them by
    /// their `Name` metadata, SDK-style projects by the file stem.
    pub fn project_references(&self) -> impl Iterator<Item = ProjectReference> + '_ {
        return self.item_children("ProjectReference").into_iter().filter_map(move |element| {
            let path = self.tree.attribute(element, "Include")?.to_string();
            let stem = || return file_stem(&path);
            let name = match self.dialect {
                Dialect::Legacy => self
                    .child_elements(element, "Name")
                    .first()
                    .map(|n| return self.tree.text(*n).trim().to_string())
                    .unwrap_or_else(stem),
                Dialect::SdkStyle => stem(),
            };
            return Some(ProjectReference { name, path });
        });
    }

    /// First value of a property declared directly in a root `PropertyGroup`.
    fn property(&self, local: &str) -> Option<String> {
        return self
            .child_elements(self.root, "PropertyGroup")
            .into_iter()
            .flat_map(|group| return self.child_elements(group, local))
            .map(|element| return self.tree.text(element).trim().to_string())
            .next();
    }

    /// Build the record for one `Reference` element.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReference` if the element has no `Include`.
    pub(crate) fn reference_record(&self, element: NodeId, default_version: &str) -> Result<ReferenceRecord, Error> {
        let Some(include) = self.tree.attribute(element, "Include") else {
            return Err(Error::MalformedReference {
                element: self.tree.local_name(element).unwrap_or("Reference").to_string(),
                path: self.path.clone(),
            });
        };
        let hint_path = self
            .child_elements(element, "HintPath")
            .first()
            .map(|h| return self.tree.text(*h).trim().to_string());
        let is_private = self
            .child_elements(element, "Private")
            .first()
            .is_some_and(|p| return self.tree.text(*p).trim() == "True");
        return Ok(ReferenceRecord::from_declaration(include, hint_path, is_private, default_version));
    }

    /// Remove the first top-level assembly reference whose identity name is `name`.
    /// Returns whether one was removed.
    pub fn remove_assembly_reference(&mut self, name: &str) -> bool {
        let found = self.declared_items("Reference").into_iter().find(|element| {
            return self
                .tree
                .attribute(*element, "Include")
                .and_then(|include| return include.split(',').next())
                .is_some_and(|n| return n.trim() == name);
        });
        return self.remove_element(found);
    }

    /// Detach an element if present and mark the document dirty.
    fn remove_element(&mut self, element: Option<NodeId>) -> bool {
        let Some(element) = element else {
            return false;
        };
        self.tree.detach(element);
        self.dirty = true;
        return true;
    }

    /// Remove the first package declaration for `name`.
    ///
    /// # Errors
    ///
    /// Returns manifest errors for legacy projects.
    pub fn remove_package_reference(&mut self, name: &str) -> Result<(), Error> {
        if self.dialect == Dialect::Legacy {
            let manifest_path = self.manifest_path();
            if manifest_path.exists() {
                self.manifest.remove_package(&manifest_path, name)?;
            }
            return Ok(());
        }

        let found = self
            .item_children("PackageReference")
            .into_iter()
            .find(|element| {
                return self.tree.attribute(*element, "Include").is_some_and(|n| return n.eq_ignore_ascii_case(name));
            });
        self.remove_element(found);
        return Ok(());
    }

    /// Remove the first project reference whose `Include` is `path`.
    /// Returns whether one was removed.
    pub fn remove_project_reference(&mut self, path: &str) -> bool {
        let found = self
            .item_children("ProjectReference")
            .into_iter()
            .find(|element| return self.tree.attribute(*element, "Include") == Some(path));
        return self.remove_element(found);
    }

    /// Serialized document as it would be saved.
    pub fn render(&self) -> String {
        return self.tree.serialize(self.dialect.emits_declaration());
    }

    /// Target framework moniker, e.g. `net461` for `v4.6.1`, defaulting to `net45`.
    /// SDK-style projects report their `TargetFramework` (or the first of
    /// `TargetFrameworks`) when declared.
    pub fn resolved_target_framework(&self) -> String {
        if self.dialect == Dialect::SdkStyle {
            if let Some(moniker) = self.property("TargetFramework").filter(|m| return !m.is_empty()) {
                return moniker;
            }
            if let Some(first) = self
                .property("TargetFrameworks")
                .and_then(|all| return all.split(';').map(str::trim).find(|m| return !m.is_empty()).map(str::to_string))
            {
                return first;
            }
        }

        let declared = self.property("TargetFrameworkVersion").unwrap_or_else(|| return DEFAULT_TARGET_FRAMEWORK.to_string());
        return FRAMEWORK_VERSION.replace_all(&declared, "net${1}${2}${3}${4}").into_owned();
    }

    /// The root `Project` element.
    pub(crate) const fn root(&self) -> NodeId {
        return self.root;
    }

    /// Write the document back if it has unsaved edits. Returns whether a
    /// write happened; a second call without further edits is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be written.
    pub fn save(&mut self) -> Result<bool, Error> {
        if !self.dirty {
            return Ok(false);
        }
        std::fs::write(&self.path, self.render())?;
        self.dirty = false;
        debug!(project = %self.path.display(), "saved project");
        return Ok(true);
    }

    /// Read access to the tree.
    pub(crate) const fn tree(&self) -> &Tree {
        return &self.tree;
    }

    /// Write access to the tree. Callers mark the document dirty themselves.
    pub(crate) const fn tree_mut(&mut self) -> &mut Tree {
        return &mut self.tree;
    }
}

/// File name without directories or extension, for either separator.
fn file_stem(path: &str) -> String {
    let file = path.rsplit(['\\', '/']).next().unwrap_or(path);
    return file.rsplit_once('.').map_or(file, |(stem, _)| return stem).to_string();
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    const LEGACY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <TargetFrameworkVersion>v4.6.1</TargetFrameworkVersion>
  </PropertyGroup>
  <ItemGroup>
    <Reference Include="System" />
    <Reference Include="Foo, Version=2.3.0.0, Culture=neutral">
      <HintPath>..\packages\Foo.2.3.0\lib\net45\Foo.dll</HintPath>
      <Private>True</Private>
    </Reference>
  </ItemGroup>
  <ItemGroup>
    <ProjectReference Include="..\Lib\Lib.csproj">
      <Project>{6f1c1c7e-0000-0000-0000-000000000001}</Project>
      <Name>Lib</Name>
    </ProjectReference>
  </ItemGroup>
</Project>"#;

    const SDK: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net6.0</TargetFramework>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Newtonsoft.Json" Version="12.0.1" />
  </ItemGroup>
</Project>"#;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        return path;
    }

    #[test]
    fn detects_dialects() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = ProjectDocument::load(&write(&dir, "a.csproj", LEGACY)).unwrap();
        let sdk = ProjectDocument::load(&write(&dir, "b.csproj", SDK)).unwrap();
        assert_eq!(legacy.dialect(), Dialect::Legacy);
        assert_eq!(sdk.dialect(), Dialect::SdkStyle);
        assert!(!legacy.is_dirty());
    }

    #[test]
    fn load_errors_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        let broken = write(&dir, "broken.csproj", "<Project><ItemGroup></Project>");
        assert!(matches!(ProjectDocument::load(&broken), Err(Error::MalformedDocument { .. })));

        let empty = write(&dir, "empty.csproj", "<!-- nothing -->");
        assert!(matches!(ProjectDocument::load(&empty), Err(Error::MissingRootElement { .. })));

        let other = write(&dir, "other.csproj", "<Configuration />");
        assert!(matches!(ProjectDocument::load(&other), Err(Error::MissingRootElement { .. })));

        assert!(matches!(
            ProjectDocument::load(&dir.path().join("missing.csproj")),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn lists_legacy_references() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ProjectDocument::load(&write(&dir, "a.csproj", LEGACY)).unwrap();

        let refs: Vec<ReferenceRecord> = doc.assembly_references().collect::<Result<_, _>>().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name(), "System");
        assert_eq!(refs[0].version().to_string(), "4.6.1");
        assert!(refs[1].is_package_managed());
        assert!(refs[1].is_private());

        let projects: Vec<ProjectReference> = doc.project_references().collect();
        assert_eq!(projects, vec![ProjectReference {
            name: "Lib".to_string(),
            path: r"..\Lib\Lib.csproj".to_string(),
        }]);
    }

    #[test]
    fn target_framework_rewrites_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = ProjectDocument::load(&write(&dir, "a.csproj", LEGACY)).unwrap();
        assert_eq!(legacy.resolved_target_framework(), "net461");

        let bare = write(
            &dir,
            "bare.csproj",
            r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003"><PropertyGroup /></Project>"#,
        );
        let bare = ProjectDocument::load(&bare).unwrap();
        assert_eq!(bare.resolved_target_framework(), "net45");
        assert_eq!(bare.declared_target_version(), "4.5.1");

        let sdk = ProjectDocument::load(&write(&dir, "b.csproj", SDK)).unwrap();
        assert_eq!(sdk.resolved_target_framework(), "net6.0");
    }

    #[test]
    fn save_writes_only_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.csproj", LEGACY);
        let mut doc = ProjectDocument::load(&path).unwrap();

        assert!(!doc.save().unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), LEGACY);

        assert!(!doc.remove_assembly_reference("Missing"));
        assert!(!doc.save().unwrap());

        assert!(doc.remove_assembly_reference("Foo"));
        assert!(doc.is_dirty());
        assert!(doc.save().unwrap());
        assert!(!doc.save().unwrap());

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(!saved.contains("Foo"));
    }

    #[test]
    fn sdk_documents_omit_declaration() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "b.csproj", &format!("<?xml version=\"1.0\"?>\n{SDK}"));
        let mut doc = ProjectDocument::load(&path).unwrap();
        doc.mark_dirty();
        doc.save().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SDK);
    }

    #[test]
    fn adds_project_reference_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = ProjectDocument::load(&write(&dir, "a.csproj", LEGACY)).unwrap();
        let id = Uuid::nil();

        doc.add_project_reference("Lib", r"..\Lib\Lib.csproj", id);
        assert!(!doc.is_dirty());

        doc.add_project_reference("Core", r"..\Core\Core.csproj", id);
        assert!(doc.is_dirty());
        let projects: Vec<ProjectReference> = doc.project_references().collect();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].name, "Core");
        assert!(doc.render().contains("<Project>{00000000-0000-0000-0000-000000000000}</Project>"));
    }

    #[test]
    fn sdk_project_reference_creates_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = ProjectDocument::load(&write(&dir, "b.csproj", SDK)).unwrap();
        doc.add_project_reference("Core", "../Core/Core.csproj", Uuid::nil());
        assert!(doc.render().contains("  <ItemGroup>\n    <ProjectReference Include=\"../Core/Core.csproj\" />\n  </ItemGroup>\n</Project>"));
        assert_eq!(doc.project_references().next().unwrap().name, "Core");

        assert!(doc.remove_project_reference("../Core/Core.csproj"));
        assert_eq!(doc.project_references().count(), 0);
    }

    #[test]
    fn sdk_package_reference_inserts_or_updates() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = ProjectDocument::load(&write(&dir, "b.csproj", SDK)).unwrap();

        doc.add_package_reference("Newtonsoft.Json", "12.0.1", "net6.0").unwrap();
        assert!(!doc.is_dirty());

        doc.add_package_reference("Newtonsoft.Json", "13.0.3", "net6.0").unwrap();
        assert!(doc.is_dirty());
        doc.add_package_reference("Serilog", "3.0.0", "net6.0").unwrap();

        let packages = doc.package_references().unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].version.as_deref(), Some("13.0.3"));
        assert_eq!(packages[1].name, "Serilog");

        doc.remove_package_reference("Serilog").unwrap();
        assert_eq!(doc.package_references().unwrap().len(), 1);
    }

    #[test]
    fn sdk_package_names_match_ignoring_case() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = ProjectDocument::load(&write(&dir, "b.csproj", SDK)).unwrap();

        doc.remove_package_reference("newtonsoft.json").unwrap();
        assert!(doc.package_references().unwrap().is_empty());
        assert!(doc.is_dirty());
    }

    #[test]
    fn version_child_element_is_updated_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "c.csproj",
            "<Project Sdk=\"Microsoft.NET.Sdk\">\n  <ItemGroup>\n    <PackageReference Include=\"Serilog\">\n      <Version>2.10.0</Version>\n    </PackageReference>\n  </ItemGroup>\n</Project>",
        );
        let mut doc = ProjectDocument::load(&path).unwrap();

        doc.add_package_reference("Serilog", "2.10.0", "net6.0").unwrap();
        assert!(!doc.is_dirty());

        doc.add_package_reference("serilog", "3.0.0", "net6.0").unwrap();
        assert!(doc.is_dirty());
        assert_eq!(
            doc.render(),
            "<Project Sdk=\"Microsoft.NET.Sdk\">\n  <ItemGroup>\n    <PackageReference Include=\"Serilog\">\n      <Version>3.0.0</Version>\n    </PackageReference>\n  </ItemGroup>\n</Project>"
        );
    }

    #[test]
    fn legacy_packages_come_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = ProjectDocument::load(&write(&dir, "a.csproj", LEGACY)).unwrap();
        assert!(doc.package_references().unwrap().is_empty());

        write(
            &dir,
            MANIFEST_FILE_NAME,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<packages>\n  <package id=\"Foo\" version=\"2.3.0\" targetFramework=\"net461\" />\n</packages>",
        );
        let packages = doc.package_references().unwrap();
        assert_eq!(packages[0].name, "Foo");

        doc.add_package_reference("Bar", "1.0.0", "net461").unwrap();
        doc.remove_package_reference("Foo").unwrap();
        let names: Vec<String> = doc.package_references().unwrap().into_iter().map(|p| return p.name).collect();
        assert_eq!(names, vec!["Bar".to_string()]);
        assert!(!doc.is_dirty());
    }
}
