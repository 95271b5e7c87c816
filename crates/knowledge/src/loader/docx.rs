use super::{source_read, DocumentLoader};
use async_trait::async_trait;
use handbook_core::AppResult;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

/// Word documents: text runs of `word/document.xml`, one paragraph per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxLoader;

#[async_trait]
impl DocumentLoader for DocxLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["docx"]
    }

    async fn extract(&self, path: &Path) -> AppResult<String> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_docx(&owned))
            .await
            .map_err(|e| source_read(path, format!("DOCX extraction task failed: {}", e)))?
    }
}

fn read_docx(path: &Path) -> AppResult<String> {
    let file = std::fs::File::open(path).map_err(|e| source_read(path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| source_read(path, format!("not a DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| source_read(path, "missing word/document.xml"))?
        .read_to_string(&mut xml)
        .map_err(|e| source_read(path, e))?;

    paragraphs_from_xml(&xml).map_err(|e| source_read(path, format!("XML parse error: {}", e)))
}

fn paragraphs_from_xml(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" => current.clear(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" => current.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let paragraph = current.trim();
                    if !paragraph.is_empty() {
                        paragraphs.push(paragraph.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Expense reports</w:t></w:r><w:r><w:t xml:space="preserve"> are due monthly.</w:t></w:r></w:p>
    <w:p></w:p>
    <w:p><w:r><w:t>Receipts &amp; invoices are required.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_paragraphs_from_xml() {
        let text = paragraphs_from_xml(BODY).unwrap();
        assert_eq!(
            text,
            "Expense reports are due monthly.\n\nReceipts & invoices are required."
        );
    }

    #[tokio::test]
    async fn test_extracts_docx_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("policy.docx");
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(BODY.as_bytes()).unwrap();
        zip.finish().unwrap();

        let text = DocxLoader.extract(&path).await.unwrap();
        assert!(text.starts_with("Expense reports are due monthly."));
    }

    #[tokio::test]
    async fn test_archive_without_document_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.docx");
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        zip.start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hi").unwrap();
        zip.finish().unwrap();

        assert!(DocxLoader.extract(&path).await.is_err());
    }
}
