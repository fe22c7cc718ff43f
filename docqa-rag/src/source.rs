//! Loading plain-text documents from disk.

use std::path::Path;

use tracing::{debug, error};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Decode UTF-8 bytes into a [`Document`] identified by `source_id`.
///
/// # Errors
///
/// Returns [`RagError::DocumentSource`] if the bytes are not valid UTF-8.
pub fn document_from_bytes(source_id: impl Into<String>, bytes: Vec<u8>) -> Result<Document> {
    let source_id = source_id.into();
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Document::new(source_id, text)),
        Err(e) => Err(RagError::DocumentSource {
            source_id,
            message: format!("not valid UTF-8: {e}"),
        }),
    }
}

/// Read a UTF-8 text file into a [`Document`].
///
/// The document ID is the file name and `source_uri` holds the full path.
///
/// # Errors
///
/// Returns [`RagError::DocumentSource`] if the file cannot be read or is not
/// valid UTF-8.
pub async fn load_text_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let source_id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to read document");
        RagError::DocumentSource { source_id: source_id.clone(), message: e.to_string() }
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "document read");

    let mut document = document_from_bytes(source_id, bytes)?;
    document.source_uri = Some(path.display().to_string());
    Ok(document)
}

/// Read several UTF-8 text files, in order, stopping at the first failure.
pub async fn load_text_documents<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(load_text_document(path).await?);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8_bytes() {
        let doc = document_from_bytes("a.txt", "naïve café".as_bytes().to_vec()).unwrap();
        assert_eq!(doc.id, "a.txt");
        assert_eq!(doc.text, "naïve café");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = document_from_bytes("bad.txt", vec![0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, RagError::DocumentSource { ref source_id, .. } if source_id == "bad.txt"));
    }

    #[tokio::test]
    async fn loads_files_named_by_file_name() {
        let dir = std::env::temp_dir().join(format!("docqa-source-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let first = dir.join("first.txt");
        let second = dir.join("second.txt");
        tokio::fs::write(&first, "The cat sat.").await.unwrap();
        tokio::fs::write(&second, "The dog ran.").await.unwrap();

        let docs = load_text_documents(&[&first, &second]).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "first.txt");
        assert_eq!(docs[1].text, "The dog ran.");
        assert_eq!(docs[0].source_uri.as_deref(), Some(first.display().to_string().as_str()));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let path = std::env::temp_dir().join("docqa-definitely-missing.txt");
        let err = load_text_document(&path).await.unwrap_err();
        assert!(matches!(err, RagError::DocumentSource { .. }));
    }
}
