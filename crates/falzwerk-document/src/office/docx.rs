// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal WordprocessingML writer. Each PDF page becomes a run of paragraphs
// followed by a page break, so page order carries over into the document.

use falzwerk_core::error::Result;
use tracing::{debug, instrument};

use super::package::{ZipPackage, xml_escape};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#;

/// Write a `.docx` with one section per page. `pages[i]` holds the text lines
/// of page `i`, top to bottom.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn write_docx(pages: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut body = String::new();
    for (index, lines) in pages.iter().enumerate() {
        for line in lines {
            body.push_str("<w:p><w:r><w:t xml:space=\"preserve\">");
            body.push_str(&xml_escape(line));
            body.push_str("</w:t></w:r></w:p>");
        }
        if index + 1 < pages.len() {
            body.push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>");
        }
    }
    if body.is_empty() {
        body.push_str("<w:p/>");
    }

    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}<w:sectPr/></w:body></w:document>"
    );

    let mut package = ZipPackage::new();
    package.add_text("[Content_Types].xml", CONTENT_TYPES)?;
    package.add_text("_rels/.rels", ROOT_RELS)?;
    package.add_text("word/_rels/document.xml.rels", DOCUMENT_RELS)?;
    package.add_text("word/document.xml", &document)?;

    let bytes = package.finish()?;
    debug!(bytes = bytes.len(), "DOCX written");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn document_xml(bytes: Vec<u8>) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn pages_are_separated_by_breaks_in_order() {
        let xml = document_xml(
            write_docx(&[vec!["first".into()], vec!["second".into(), "a & b".into()]]).unwrap(),
        );
        let first = xml.find("first").unwrap();
        let brk = xml.find("w:type=\"page\"").unwrap();
        let second = xml.find("second").unwrap();
        assert!(first < brk && brk < second);
        assert!(xml.contains("a &amp; b"));
        assert_eq!(xml.matches("w:type=\"page\"").count(), 1);
    }

    #[test]
    fn empty_document_is_still_valid() {
        let xml = document_xml(write_docx(&[]).unwrap());
        assert!(xml.contains("<w:p/>"));
    }
}
