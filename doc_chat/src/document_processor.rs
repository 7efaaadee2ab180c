use crate::error::{Error, Result};
use bytes::Bytes;

/// Turns an uploaded PDF into plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the text of every page, in page order.
    ///
    /// Parsing happens on the blocking pool; a parser panic is reported as an
    /// unreadable document like any other parse failure.
    pub async fn extract(&self, document: Bytes) -> Result<String> {
        let size = document.len();

        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&document)
        })
        .await
        .map_err(|e| Error::DocumentUnreadable(format!("PDF parser aborted: {}", e)))?
        .map_err(|e| Error::DocumentUnreadable(e.to_string()))?;

        let page_count = pages.len();
        let text = join_pages(pages);

        log::info!(
            "Processed PDF: {} bytes, {} pages, {} characters of text",
            size,
            page_count,
            text.chars().count()
        );
        Ok(text)
    }
}

/// Concatenates page texts in order with no separator.
fn join_pages(pages: Vec<String>) -> String {
    pages.concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_joined_in_order_without_separator() {
        let pages = vec!["A".to_string(), String::new(), "B".to_string()];
        assert_eq!(join_pages(pages), "AB");
    }

    #[test]
    fn no_pages_is_empty_text() {
        assert_eq!(join_pages(Vec::new()), "");
    }

    #[tokio::test]
    async fn multi_page_pdf_is_read_in_page_order() {
        let pdf = include_bytes!("../tests/fixtures/three_pages.pdf");

        let text = DocumentProcessor::new()
            .extract(Bytes::from_static(pdf))
            .await
            .unwrap();

        let alpha = text.find("Alpha page").unwrap();
        let gamma = text.find("Gamma page").unwrap();
        assert!(alpha < gamma);
        assert_eq!(text.matches("page").count(), 2);
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_unreadable() {
        let processor = DocumentProcessor::new();
        let err = processor
            .extract(Bytes::from_static(b"this is definitely not a pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DocumentUnreadable(_)));
        assert!(err.to_string().starts_with("Error reading PDF: "));
    }

    #[tokio::test]
    async fn empty_upload_is_unreadable() {
        let processor = DocumentProcessor::new();
        let err = processor.extract(Bytes::new()).await.unwrap_err();

        assert!(matches!(err, Error::DocumentUnreadable(_)));
    }
}
