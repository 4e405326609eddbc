//! Deduplicate, validate, and canonically reorder a project's declarations.
//!
//! The canonical layout places four item groups after the last top-level
//! property group:
//!
//! 1. assembly references without a hint path,
//! 2. assembly references with a hint path,
//! 3. project references sorted by path,
//! 4. every other item with an `Include`, sorted by that identity.
//!
//! Assembly references are sorted by name, then version. Empty item groups
//! are removed afterwards, so a second pass over the output is byte-identical.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::document::{Dialect, ProjectDocument};
use crate::error::Error;
use crate::packages::{PackageDiscovery, absolutize, find_packages_root, hint_path_within, relative_path};
use crate::types::ReferenceRecord;
use crate::xml::NodeId;

/// A parsed assembly reference and the element it came from.
struct Declaration {
    /// Detached source element; its extra attributes and metadata survive the rebuild.
    element: NodeId,
    /// Facts derived from the element.
    record: ReferenceRecord,
}

/// Rewrites legacy project documents into canonical form.
pub struct Reconciler<'a> {
    /// Lists restored package directories for hint-path checks.
    discovery: &'a dyn PackageDiscovery,
    /// Explicit packages root; otherwise searched upward from each document.
    packages_root: Option<PathBuf>,
}

impl<'a> Reconciler<'a> {
    /// A package-managed reference whose folder version disagrees with its
    /// declared version, and which lies inside none of the restored package
    /// directories for its name. No packages root means no candidates.
    fn is_suspicious(&self, directory: &Path, packages_root: Option<&Path>, record: &ReferenceRecord) -> bool {
        let (Some(hint_path), Some(package_version)) = (record.hint_path(), record.package_version()) else {
            return false;
        };
        if package_version.cmp_release(record.version()) == Ordering::Equal {
            return false;
        }
        let candidates = packages_root
            .map(|root| return self.discovery.find_package_directories(root, record.name()))
            .unwrap_or_default();
        return !candidates
            .iter()
            .any(|candidate| return hint_path_within(hint_path, &relative_path(directory, candidate)));
    }

    /// A reconciler that locates package folders through `discovery`.
    pub const fn new(discovery: &'a dyn PackageDiscovery) -> Self {
        return Self {
            discovery,
            packages_root: None,
        };
    }

    /// Reconcile one document in place and mark it dirty. SDK-style
    /// documents are left alone. Only items in top-level item groups are
    /// considered; groups nested under `Choose` or targets are conditional
    /// and keep their contents. Duplicates and suspicious hint paths go to
    /// `sink`; they never fail the call.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReference` if any assembly reference lacks an
    /// `Include`. Every declaration is read before the tree is touched, so
    /// the document is unchanged on error.
    pub fn reconcile(&self, document: &mut ProjectDocument, sink: &mut dyn DiagnosticSink) -> Result<(), Error> {
        if document.dialect() == Dialect::SdkStyle {
            debug!(project = %document.path().display(), "sdk-style project, nothing to reconcile");
            return Ok(());
        }

        let default_version = document.declared_target_version();
        let groups = document.child_elements(document.root(), "ItemGroup");
        let declarations = groups
            .iter()
            .flat_map(|group| return document.child_elements(*group, "Reference"))
            .map(|element| {
                return document
                    .reference_record(element, &default_version)
                    .map(|record| return Declaration { element, record });
            })
            .collect::<Result<Vec<Declaration>, Error>>()?;

        let document_path = absolutize(document.path());
        let packages_root = self
            .packages_root
            .as_deref()
            .map(absolutize)
            .or_else(|| return find_packages_root(&document_path));
        let directory = document_path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut survivors: Vec<Declaration> = Vec::new();
        for declaration in declarations {
            if self.is_suspicious(&directory, packages_root.as_deref(), &declaration.record) {
                sink.report(Diagnostic::SuspiciousHintPath {
                    hint_path: declaration.record.hint_path().unwrap_or_default().to_string(),
                    name: declaration.record.name().to_string(),
                    version: declaration.record.version().clone(),
                });
            }
            document.tree_mut().detach(declaration.element);
            merge(&mut survivors, declaration, sink);
        }

        survivors.sort_by(|a, b| {
            return a
                .record
                .name()
                .cmp(b.record.name())
                .then_with(|| return a.record.version().cmp(b.record.version()));
        });
        let (unhinted, hinted): (Vec<Declaration>, Vec<Declaration>) =
            survivors.into_iter().partition(|d| return d.record.hint_path().is_none());

        let projects = take_items(document, &groups, |local| return local == "ProjectReference");
        let others = take_items(document, &groups, |local| return local != "Reference" && local != "ProjectReference");

        let root = document.root();
        let unhinted_group = document.create_element("ItemGroup");
        match document.child_elements(root, "PropertyGroup").last() {
            Some(anchor) => document.tree_mut().insert_after(*anchor, unhinted_group),
            None => document.tree_mut().append_child(root, unhinted_group),
        }
        let hinted_group = document.create_element("ItemGroup");
        document.tree_mut().insert_after(unhinted_group, hinted_group);
        let project_group = document.create_element("ItemGroup");
        document.tree_mut().insert_after(hinted_group, project_group);
        let other_group = document.create_element("ItemGroup");
        document.tree_mut().insert_after(project_group, other_group);

        let surviving = unhinted.len().saturating_add(hinted.len());
        for declaration in &unhinted {
            let element = rebuild(document, declaration);
            document.tree_mut().append_child(unhinted_group, element);
        }
        for declaration in &hinted {
            let element = rebuild(document, declaration);
            document.tree_mut().append_child(hinted_group, element);
        }
        for (_, element) in projects {
            document.tree_mut().append_child(project_group, element);
        }
        for (_, element) in others {
            document.tree_mut().append_child(other_group, element);
        }

        remove_empty_item_groups(document);
        document.mark_dirty();
        debug!(project = %document.path().display(), references = surviving, "reconciled project");
        return Ok(());
    }

    /// Use `root` as the packages directory for every document.
    #[must_use]
    pub fn with_packages_root(mut self, root: PathBuf) -> Self {
        self.packages_root = Some(root);
        return self;
    }
}

/// Fold one declaration into the name-keyed survivors, reporting whichever
/// record is discarded.
fn merge(survivors: &mut Vec<Declaration>, incoming: Declaration, sink: &mut dyn DiagnosticSink) {
    let Some(index) = survivors.iter().position(|d| return d.record.name() == incoming.record.name()) else {
        survivors.push(incoming);
        return;
    };
    let Some(existing) = survivors.get_mut(index) else {
        return;
    };

    match incoming.record.version().cmp(existing.record.version()) {
        Ordering::Equal => sink.report(Diagnostic::DuplicateIdentical {
            name: incoming.record.name().to_string(),
            path: incoming.record.hint_path().map(str::to_string),
            version: incoming.record.version().clone(),
        }),
        Ordering::Greater => {
            let dropped = std::mem::replace(existing, incoming);
            sink.report(superseded(&dropped.record));
        },
        Ordering::Less => sink.report(superseded(&incoming.record)),
    }
    return;
}

/// Fresh `Reference` element in canonical shape: `Include`, the source's
/// other attributes, `HintPath`, `Private`, then remaining metadata.
fn rebuild(document: &mut ProjectDocument, declaration: &Declaration) -> NodeId {
    let namespace = document.dialect().namespace();
    let source = declaration.element;
    let record = &declaration.record;

    let attributes: Vec<(String, String)> = document
        .tree()
        .attributes(source)
        .iter()
        .filter(|(key, _)| return key != "Include")
        .cloned()
        .collect();
    let metadata: Vec<NodeId> = document
        .tree()
        .children(source)
        .iter()
        .copied()
        .filter(|c| {
            let tree = document.tree();
            return !tree.is_element(*c, namespace, "HintPath") && !tree.is_element(*c, namespace, "Private");
        })
        .collect();

    let element = document.create_element("Reference");
    document.tree_mut().set_attribute(element, "Include", record.full_name());
    for (key, value) in &attributes {
        document.tree_mut().set_attribute(element, key, value);
    }
    if let Some(hint_path) = record.hint_path() {
        let hint = document.create_text_element("HintPath", hint_path);
        document.tree_mut().append_child(element, hint);
    }
    if record.is_private() {
        let private = document.create_text_element("Private", "True");
        document.tree_mut().append_child(element, private);
    }
    for child in metadata {
        document.tree_mut().append_child(element, child);
    }
    return element;
}

/// Drop every `ItemGroup` anywhere in the project that has no element children.
fn remove_empty_item_groups(document: &mut ProjectDocument) {
    let namespace = document.dialect().namespace();
    let empty: Vec<NodeId> = document
        .tree()
        .descendants(document.root())
        .into_iter()
        .filter(|id| {
            let tree = document.tree();
            return tree.is_element(*id, namespace, "ItemGroup") && !tree.has_element_children(*id);
        })
        .collect();
    for group in empty {
        document.tree_mut().detach(group);
    }
    return;
}

/// Diagnostic for a version-superseded record.
fn superseded(record: &ReferenceRecord) -> Diagnostic {
    return Diagnostic::DuplicateSuperseded {
        name: record.name().to_string(),
        path: record.hint_path().map(str::to_string),
        version: record.version().clone(),
    };
}

/// Detach every item in `groups` whose local name satisfies `wanted` and
/// that has an `Include`, returning them stably sorted by that identity.
fn take_items(document: &mut ProjectDocument, groups: &[NodeId], wanted: impl Fn(&str) -> bool) -> Vec<(String, NodeId)> {
    let mut items: Vec<(String, NodeId)> = Vec::new();
    for group in groups {
        for child in document.tree().children(*group) {
            let tree = document.tree();
            let Some(local) = tree.local_name(*child) else {
                continue;
            };
            if !wanted(local) {
                continue;
            }
            if let Some(include) = tree.attribute(*child, "Include") {
                items.push((include.to_string(), *child));
            }
        }
    }
    for (_, element) in &items {
        document.tree_mut().detach(*element);
    }
    items.sort_by(|a, b| return a.0.cmp(&b.0));
    return items;
}
