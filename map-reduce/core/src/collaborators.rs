// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::CollaboratorError;
use async_trait::async_trait;
use std::sync::Arc;

/// Discovers how many pages a document has. Called once per document when the
/// coordinator is built.
#[async_trait]
pub trait PageCounter: Send + Sync {
    async fn page_count(&self, doc_id: &str) -> Result<u32, CollaboratorError>;
}

/// Extracts the content of one page (1-based) of a document
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn page_text(&self, doc_id: &str, page: u32) -> Result<String, CollaboratorError>;
}

/// The per-page transformation (e.g. translation) applied in the map phase
#[async_trait]
pub trait PageTransform: Send + Sync {
    async fn transform(&self, page: u32, content: String) -> Result<String, CollaboratorError>;
}

/// Merges a document's page outputs into one final output.
///
/// Implementations locate the page outputs through the shared naming convention
/// ([`crate::output_layout::OutputLayout`]); they are only invoked after every
/// page of the document has been reported done.
#[async_trait]
pub trait DocumentAssembler: Send + Sync {
    async fn assemble(&self, doc_id: &str) -> Result<(), CollaboratorError>;
}

/// The external functions a worker delegates task execution to
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn PageExtractor>,
    pub transform: Arc<dyn PageTransform>,
    pub assembler: Arc<dyn DocumentAssembler>,
}

impl Collaborators {
    pub fn new(
        extractor: Arc<dyn PageExtractor>,
        transform: Arc<dyn PageTransform>,
        assembler: Arc<dyn DocumentAssembler>,
    ) -> Self {
        Self {
            extractor,
            transform,
            assembler,
        }
    }
}
