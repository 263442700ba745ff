// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use page_map_reduce_core::collaborators::DocumentAssembler;
use page_map_reduce_core::error::CollaboratorError;
use page_map_reduce_core::output_layout::OutputLayout;
use tracing::info;

/// Concatenates a document's page outputs, in page order, into
/// `translated_<name>`, each under a `Part <n>: <artifact>` heading
#[derive(Debug, Clone)]
pub struct TextAssembler {
    layout: OutputLayout,
}

impl TextAssembler {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl DocumentAssembler for TextAssembler {
    async fn assemble(&self, doc_id: &str) -> Result<(), CollaboratorError> {
        let outputs = self.layout.collect_page_outputs(doc_id).await?;

        let mut document = String::new();
        for (i, output) in outputs.iter().enumerate() {
            let text = tokio::fs::read_to_string(&output.path)
                .await
                .map_err(|source| CollaboratorError::Io {
                    path: output.path.clone(),
                    source,
                })?;
            if i > 0 {
                document.push('\n');
            }
            let artifact = output
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            document.push_str(&format!("Part {}: {}\n\n", output.page, artifact));
            document.push_str(&text);
        }

        let path = self.layout.write_assembled_output(doc_id, document).await?;
        info!(doc_id, parts = outputs.len(), path = %path.display(), "document assembled");
        Ok(())
    }
}
