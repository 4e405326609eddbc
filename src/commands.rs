//! CLI commands for projref: add-project, check, clean, list.

use std::path::Path;
use std::process::ExitCode;

use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::diagnostics::{self, Diagnostic};
use crate::document::{Dialect, ProjectDocument};
use crate::error::Error;
use crate::packages::{FsPackageDiscovery, relative_path};
use crate::reconciler::Reconciler;
use crate::scanner;
use crate::types::{PackageReference, ProjectReference, ReferenceRecord};

/// Everything `list --json` reports about one project.
#[derive(serde::Serialize)]
struct ProjectListing<'a> {
    /// Assembly references in document order.
    assembly_references: Vec<ReferenceRecord>,
    /// Detected grammar.
    dialect: Dialect,
    /// Package declarations, inline or from `packages.config`.
    package_references: Vec<PackageReference>,
    /// Project file as given on the command line.
    path: &'a Path,
    /// Project references in document order.
    project_references: Vec<ProjectReference>,
    /// Short target framework moniker.
    target_framework: String,
}

/// Reference `reference` from `project` by relative path and save. A new
/// project id is generated; an existing reference with the same path is left alone.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if `reference` does not exist, load errors
/// for `project`, or `Error::Io` if saving fails.
pub fn add_project(project: &Path, reference: &Path) -> Result<(), Error> {
    if !reference.is_file() {
        return Err(Error::FileNotFound { path: reference.to_path_buf() });
    }
    let mut document = ProjectDocument::load(project)?;

    let project_abs = std::path::absolute(project)?;
    let reference_abs = std::path::absolute(reference)?;
    let from = project_abs.parent().unwrap_or_else(|| return Path::new(""));
    let relative = relative_path(from, &reference_abs).to_string_lossy().into_owned();
    let include = match document.dialect() {
        Dialect::Legacy => relative.replace('/', "\\"),
        Dialect::SdkStyle => relative,
    };
    let name = reference.file_stem().map_or_else(String::new, |s| return s.to_string_lossy().into_owned());

    document.add_project_reference(&name, &include, Uuid::new_v4());
    if document.save()? {
        eprintln!("Added `{include}` to {}", project.display());
    } else {
        eprintln!("{} already references `{include}`", project.display());
    }
    return Ok(());
}

/// Reconcile every project under `root` in memory and report the ones whose
/// canonical form differs from the file on disk. Nothing is written.
///
/// # Errors
///
/// Returns errors from config loading.
pub fn check(root: &Path) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let discovery = FsPackageDiscovery;
    let reconciler = reconciler_for(&config, &discovery);
    let projects = scanner::scan(root, &config);

    let mut failed = 0_u32;
    let mut unclean = 0_u32;
    for path in &projects {
        match reconcile_project(path, &reconciler) {
            Err(e) => {
                diagnostics::print_error(&e);
                failed = failed.saturating_add(1);
            },
            Ok((document, _)) => {
                if document.is_dirty() && std::fs::read_to_string(path).ok().as_deref() != Some(document.render().as_str()) {
                    println!("UNCLEAN {}", display_path(root, path).display());
                    unclean = unclean.saturating_add(1);
                }
            },
        }
    }

    // Exit code priority: failed (2) > unclean (1) > clean (0).
    if failed > 0 {
        println!();
        println!("{failed} failed, {unclean} unclean");
        return Ok(ExitCode::from(2));
    } else if unclean > 0 {
        println!();
        println!("{unclean} unclean");
        eprintln!();
        eprintln!("hint: run `projref clean` to rewrite them.");
        return Ok(ExitCode::from(1));
    } else {
        let total = projects.len();
        println!("All {total} projects clean");
        return Ok(ExitCode::SUCCESS);
    }
}

/// Reconcile and save every project under `root`. Projects that fail to
/// load or reconcile are reported and skipped; the rest are still written.
///
/// # Errors
///
/// Returns errors from config loading.
pub fn clean(root: &Path) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let discovery = FsPackageDiscovery;
    let reconciler = reconciler_for(&config, &discovery);
    let projects = scanner::scan(root, &config);

    let mut cleaned = 0_u32;
    let mut failed = 0_u32;
    for path in &projects {
        let outcome = reconcile_project(path, &reconciler).and_then(|(mut document, found)| {
            let written = document.save()?;
            return Ok((written, found));
        });
        match outcome {
            Err(e) => {
                diagnostics::print_error(&e);
                failed = failed.saturating_add(1);
            },
            Ok((written, found)) => {
                if written {
                    cleaned = cleaned.saturating_add(1);
                }
                if !found.is_empty() {
                    eprintln!("{}", diagnostics::render_report(&display_path(root, path), &found));
                }
            },
        }
    }

    eprintln!("Cleaned {cleaned} of {} projects", projects.len());
    if failed > 0 {
        eprintln!("{failed} failed");
        return Ok(ExitCode::from(2));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Path relative to the scan root for display.
fn display_path(root: &Path, path: &Path) -> std::path::PathBuf {
    return path.strip_prefix(root).unwrap_or(path).to_path_buf();
}

/// Print a project's target framework and declarations.
///
/// # Errors
///
/// Returns load errors, `Error::MalformedReference`, or manifest errors.
pub fn list(project: &Path, json: bool) -> Result<(), Error> {
    let document = ProjectDocument::load(project)?;
    let listing = ProjectListing {
        assembly_references: document.assembly_references().collect::<Result<_, _>>()?,
        dialect: document.dialect(),
        package_references: document.package_references()?,
        path: project,
        project_references: document.project_references().collect(),
        target_framework: document.resolved_target_framework(),
    };

    if json {
        // serde_json::to_string_pretty won't fail on this structure.
        let out = serde_json::to_string_pretty(&listing).unwrap_or_default();
        println!("{out}");
        return Ok(());
    }

    println!("# {} ({:?}, {})", project.display(), listing.dialect, listing.target_framework);
    print_section("Assembly references", listing.assembly_references.iter().map(render_record));
    print_section(
        "Project references",
        listing.project_references.iter().map(|p| return format!("{} `{}`", p.name, p.path)),
    );
    print_section(
        "Package references",
        listing.package_references.iter().map(|p| {
            return format!("{} {}", p.name, p.version.as_deref().unwrap_or("(no version)"));
        }),
    );
    return Ok(());
}

/// Print a markdown heading followed by one bullet per line, or `(none)`.
fn print_section(title: &str, lines: impl Iterator<Item = String>) {
    println!();
    println!("## {title}");
    println!();
    let mut any = false;
    for line in lines {
        println!("- {line}");
        any = true;
    }
    if !any {
        println!("(none)");
    }
    return;
}

/// Load and reconcile one project in memory, collecting its diagnostics.
///
/// # Errors
///
/// Returns load errors or `Error::MalformedReference`.
fn reconcile_project(path: &Path, reconciler: &Reconciler<'_>) -> Result<(ProjectDocument, Vec<Diagnostic>), Error> {
    let mut document = ProjectDocument::load(path)?;
    let mut found: Vec<Diagnostic> = Vec::new();
    reconciler.reconcile(&mut document, &mut found)?;
    debug!(project = %path.display(), diagnostics = found.len(), "processed project");
    return Ok((document, found));
}

/// A reconciler honouring the configured packages directory.
fn reconciler_for<'a>(config: &Config, discovery: &'a FsPackageDiscovery) -> Reconciler<'a> {
    let reconciler = Reconciler::new(discovery);
    return match config.packages_dir() {
        Some(dir) => reconciler.with_packages_root(dir.to_path_buf()),
        None => reconciler,
    };
}

/// One assembly reference as a list item body.
fn render_record(record: &ReferenceRecord) -> String {
    let mut line = format!("{} {}", record.name(), record.version());
    if let Some(hint_path) = record.hint_path() {
        line.push_str(&format!(" `{hint_path}`"));
    }
    if let Some(package_version) = record.package_version() {
        line.push_str(&format!(" (package {package_version})"));
    }
    if record.is_private() {
        line.push_str(" private");
    }
    return line;
}
