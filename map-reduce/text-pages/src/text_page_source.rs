// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use page_map_reduce_core::collaborators::{PageCounter, PageExtractor};
use page_map_reduce_core::error::CollaboratorError;

const PAGE_BREAK: char = '\x0c';

/// Split text into pages at form feeds. A form feed at the very end does not
/// open a new page, and empty text has no pages.
pub fn split_pages(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let text = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
    text.split(PAGE_BREAK).collect()
}

/// Reads documents from the local filesystem; the document id is its path
#[derive(Debug, Clone, Default)]
pub struct TextPageSource;

impl TextPageSource {
    async fn read(&self, doc_id: &str) -> Result<String, CollaboratorError> {
        tokio::fs::read_to_string(doc_id)
            .await
            .map_err(|source| CollaboratorError::Read {
                doc_id: doc_id.to_string(),
                source,
            })
    }
}

#[async_trait]
impl PageCounter for TextPageSource {
    async fn page_count(&self, doc_id: &str) -> Result<u32, CollaboratorError> {
        let text = self.read(doc_id).await?;
        Ok(split_pages(&text).len() as u32)
    }
}

#[async_trait]
impl PageExtractor for TextPageSource {
    async fn page_text(&self, doc_id: &str, page: u32) -> Result<String, CollaboratorError> {
        let text = self.read(doc_id).await?;
        let pages = split_pages(&text);
        if page < 1 || page as usize > pages.len() {
            return Err(CollaboratorError::PageOutOfRange {
                doc_id: doc_id.to_string(),
                page,
                pages: pages.len() as u32,
            });
        }
        Ok(pages[page as usize - 1].to_string())
    }
}
