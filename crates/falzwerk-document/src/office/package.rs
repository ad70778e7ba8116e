// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory zip archives: Office Open XML packages and multi-file results.

use std::io::{Cursor, Write};

use falzwerk_core::error::{FalzwerkError, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub struct ZipPackage {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl ZipPackage {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: 0,
        }
    }

    /// Add one entry. Names use `/` separators.
    pub fn add(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.writer
            .start_file(name, self.options)
            .map_err(|err| FalzwerkError::Archive(format!("cannot add {name}: {err}")))?;
        self.writer.write_all(data)?;
        self.entries += 1;
        Ok(())
    }

    pub fn add_text(&mut self, name: &str, text: &str) -> Result<()> {
        self.add(name, text.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self
            .writer
            .finish()
            .map_err(|err| FalzwerkError::Archive(format!("cannot finish archive: {err}")))?;
        Ok(cursor.into_inner())
    }
}

impl Default for ZipPackage {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape text for XML element content and attribute values.
pub fn xml_escape(text: &str) -> String {
    // XML 1.0 forbids most C0 control characters even when escaped.
    let cleaned: String = text
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .collect();
    quick_xml::escape::escape(cleaned.as_str()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn entries_can_be_read_back() {
        let mut package = ZipPackage::new();
        package.add_text("a/b.txt", "hello").unwrap();
        package.add("c.bin", &[1, 2, 3]).unwrap();
        assert_eq!(package.len(), 2);
        let bytes = package.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        archive.by_name("a/b.txt").unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn escapes_markup_and_drops_control_characters() {
        assert_eq!(xml_escape("a<b & \"c\"\u{1}"), "a&lt;b &amp; &quot;c&quot;");
    }
}
