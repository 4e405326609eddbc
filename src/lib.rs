//! Reconcile assembly, project, and package references in MSBuild project files.
//!
//! A [`document::ProjectDocument`] loads a project in either the legacy
//! namespaced dialect or the SDK-style dialect and exposes dialect-neutral
//! queries and edits. A [`reconciler::Reconciler`] deduplicates its assembly
//! references by version, flags hint paths that point outside the restored
//! packages, and rewrites the item groups into a canonical order. Edits only
//! reach the disk through [`document::ProjectDocument::save`], which writes
//! nothing unless the document changed.

pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod manifest;
pub mod packages;
pub mod reconciler;
pub mod scanner;
pub mod types;
pub mod version;
pub mod xml;
