//! IngestDocumentHandler - Stores an upload and extracts its text.
//!
//! The returned document is what callers place in
//! `InteractionRequest::documents`.

use std::sync::Arc;

use crate::domain::foundation::SessionId;
use crate::domain::workflow::ExtractedDocument;
use crate::ports::{SessionFileStore, TextExtractor};

use super::HousekeepingError;

/// Command to ingest one uploaded file.
#[derive(Debug, Clone)]
pub struct IngestDocumentCommand {
    pub session_id: SessionId,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Handler for document uploads.
pub struct IngestDocumentHandler {
    store: Arc<dyn SessionFileStore>,
    extractor: Arc<dyn TextExtractor>,
}

impl IngestDocumentHandler {
    pub fn new(store: Arc<dyn SessionFileStore>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { store, extractor }
    }

    pub async fn handle(&self, cmd: IngestDocumentCommand) -> Result<ExtractedDocument, HousekeepingError> {
        // Extract first so unreadable files never take up session storage
        let mut document = self.extractor.extract(&cmd.file_name, &cmd.bytes).await?;
        let stored = self.store.store(cmd.session_id, &cmd.file_name, &cmd.bytes).await?;
        document.id = stored.document_id;

        tracing::info!(
            session_id = %cmd.session_id,
            document_id = %document.id,
            file_name = %stored.file_name,
            size_bytes = stored.size_bytes,
            "Document ingested"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::document::PlainTextExtractor;
    use crate::adapters::storage::LocalSessionFileStore;
    use crate::domain::foundation::DocumentId;
    use crate::ports::ExtractionError;
    use tempfile::TempDir;

    fn create_handler() -> (IngestDocumentHandler, Arc<LocalSessionFileStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalSessionFileStore::new(dir.path()));
        let handler = IngestDocumentHandler::new(store.clone(), Arc::new(PlainTextExtractor::new()));
        (handler, store, dir)
    }

    #[tokio::test]
    async fn stores_and_extracts() {
        let (handler, store, _dir) = create_handler();
        let session_id = SessionId::new();
        let bytes = b"pump_power: 5 kW\nmax_level = 2.5 m\n".to_vec();

        let document = handler
            .handle(IngestDocumentCommand {
                session_id,
                file_name: "pump.txt".into(),
                bytes: bytes.clone(),
            })
            .await
            .unwrap();

        assert_eq!(document.id, DocumentId::from_content(&bytes));
        assert!(document.structured_summary.unwrap().contains("- pump_power: 5 kW"));
        let files = store.list(session_id).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].document_id, document.id);
    }

    #[tokio::test]
    async fn unreadable_file_is_not_stored() {
        let (handler, store, _dir) = create_handler();
        let session_id = SessionId::new();

        let err = handler
            .handle(IngestDocumentCommand {
                session_id,
                file_name: "drawing.dwg".into(),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            HousekeepingError::Extraction(ExtractionError::unsupported("drawing.dwg"))
        );
        assert!(store.list(session_id).await.unwrap().is_empty());
    }
}
