// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Naming convention for the shared store that hands map outputs to the
//! reduce phase.
//!
//! Page `n` of document `doc` is stored as `<dir>/mr-<n>-<name>` where `<name>` is
//! the file name component of the document identifier. The reduce phase finds a
//! document's pages purely by scanning for that pattern.

use crate::error::CollaboratorError;
use std::path::{Path, PathBuf};
use tracing::debug;

const PAGE_OUTPUT_PREFIX: &str = "mr-";
const ASSEMBLED_OUTPUT_PREFIX: &str = "translated_";

/// One page output found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutput {
    pub page: u32,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name under which a document's outputs are stored
    pub fn output_name(doc_id: &str) -> String {
        Path::new(doc_id)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| doc_id.replace(['/', '\\'], "_"))
    }

    pub fn page_output_path(&self, doc_id: &str, page: u32) -> PathBuf {
        self.dir.join(format!(
            "{}{}-{}",
            PAGE_OUTPUT_PREFIX,
            page,
            Self::output_name(doc_id)
        ))
    }

    pub fn assembled_output_path(&self, doc_id: &str) -> PathBuf {
        self.dir.join(format!(
            "{}{}",
            ASSEMBLED_OUTPUT_PREFIX,
            Self::output_name(doc_id)
        ))
    }

    /// Persist the result of one map task.
    ///
    /// A reassigned task may write the same page twice; the last complete
    /// write wins. A trailing newline is added when missing.
    pub async fn write_page_output(
        &self,
        doc_id: &str,
        page: u32,
        contents: &str,
    ) -> Result<PathBuf, CollaboratorError> {
        let mut body = contents.to_string();
        if !body.ends_with('\n') {
            body.push('\n');
        }

        let path = self.replace_file(self.page_output_path(doc_id, page), body).await?;
        debug!(doc_id, page, path = %path.display(), "page output written");
        Ok(path)
    }

    /// Persist the assembled document
    pub async fn write_assembled_output(
        &self,
        doc_id: &str,
        contents: String,
    ) -> Result<PathBuf, CollaboratorError> {
        let path = self.replace_file(self.assembled_output_path(doc_id), contents).await?;
        debug!(doc_id, path = %path.display(), "assembled output written");
        Ok(path)
    }

    /// Write `contents` to a uniquely named hidden sibling of `path`, then rename
    /// it into place. Readers never see a partial file, and concurrent writers
    /// of the same path never interleave.
    async fn replace_file(
        &self,
        path: PathBuf,
        contents: String,
    ) -> Result<PathBuf, CollaboratorError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CollaboratorError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path = self.dir.join(format!(
            ".{}.{:016x}.tmp",
            file_name,
            rand::random::<u64>()
        ));

        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|source| CollaboratorError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        if let Err(source) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CollaboratorError::Io { path, source });
        }
        Ok(path)
    }

    /// Find every page output of a document, ordered by page number
    pub async fn collect_page_outputs(
        &self,
        doc_id: &str,
    ) -> Result<Vec<PageOutput>, CollaboratorError> {
        let name = Self::output_name(doc_id);
        let io_error = |source| CollaboratorError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_error)?;
        let mut outputs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let file_type = entry.file_type().await.map_err(io_error)?;
            if !file_type.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some((page, output_name)) = parse_page_output_name(file_name) {
                if output_name == name {
                    outputs.push(PageOutput {
                        page,
                        path: entry.path(),
                    });
                }
            }
        }

        if outputs.is_empty() {
            return Err(CollaboratorError::NoPageOutputs {
                dir: self.dir.clone(),
                doc_id: doc_id.to_string(),
            });
        }

        outputs.sort_by_key(|output| output.page);
        Ok(outputs)
    }
}

/// Split `mr-<page>-<name>` into its page number and document name
pub fn parse_page_output_name(file_name: &str) -> Option<(u32, &str)> {
    let rest = file_name.strip_prefix(PAGE_OUTPUT_PREFIX)?;
    let (digits, name) = rest.split_once('-')?;
    if digits.is_empty() || name.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, name))
}
