//! PDF page-text extraction via lopdf.
//!
//! Retrieval only needs raw page text; layout, fonts, and section structure
//! are not recovered here. A page that fails to decode is skipped rather
//! than failing the whole document.

use lopdf::Document as PdfDoc;
use std::path::Path;
use tracing::{debug, warn};

use paperquill_common::{PaperquillError, Result};

/// Extract text per page, in page order. Page numbers are 1-based.
pub fn extract_page_texts(pdf_path: &Path) -> Result<Vec<(u32, String)>> {
    let pdf = PdfDoc::load(pdf_path).map_err(|e| PaperquillError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    for (&page_num, _) in pdf.get_pages().iter() {
        match pdf.extract_text(&[page_num]) {
            Ok(text) => pages.push((page_num, text)),
            Err(e) => {
                warn!(page = page_num, error = %e, "page text extraction failed, skipping page");
            }
        }
    }

    debug!(path = %pdf_path.display(), n_pages = pages.len(), "PDF text extracted");
    Ok(pages)
}

/// Build a minimal single-font PDF with one text operator per page.
/// Shared by chunker tests, which need a real file on disk to exercise the
/// full-content strategy without any network.
#[cfg(test)]
pub(crate) fn write_test_pdf(path: &Path, page_texts: &[&str]) {
    use lopdf::dictionary;
    use lopdf::{Object, Stream};

    let mut doc = PdfDoc::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = format!("BT /F1 24 Tf 100 600 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let kids_len = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => kids_len,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_page_by_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two-pages.pdf");
        write_test_pdf(&path, &["Hello retrieval", "Second page"]);

        let pages = extract_page_texts(&path).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].0, 1);
        assert!(pages[0].1.contains("Hello retrieval"));
        assert!(pages[1].1.contains("Second page"));
    }

    #[test]
    fn missing_file_is_a_pdf_error() {
        let err = extract_page_texts(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(matches!(err, PaperquillError::Pdf(_)));
    }
}
