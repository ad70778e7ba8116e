// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tabular output: a SpreadsheetML workbook with one sheet per table, or a
// single CSV with every table tagged by page and ordinal.

use falzwerk_core::error::{FalzwerkError, Result};
use tracing::{debug, instrument};

use super::package::{ZipPackage, xml_escape};
use crate::capability::Table;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

/// Tables found on one page. `page` is zero-based.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTables {
    pub page: usize,
    pub tables: Vec<Table>,
}

/// Workbook with one sheet per table, named `p<page>_t<n>` (both 1-based).
/// Without any table the workbook holds a single `summary` sheet.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn write_xlsx(pages: &[PageTables]) -> Result<Vec<u8>> {
    let summary = [vec!["page".to_owned(), "tables".to_owned()]];
    let mut sheets: Vec<(String, &[Vec<String>])> = Vec::new();
    for page in pages {
        for (n, table) in page.tables.iter().enumerate() {
            sheets.push((format!("p{}_t{}", page.page + 1, n + 1), &table.rows));
        }
    }

    if sheets.is_empty() {
        sheets.push(("summary".to_owned(), &summary));
    }

    let mut package = ZipPackage::new();
    package.add_text("[Content_Types].xml", &content_types(sheets.len()))?;
    package.add_text("_rels/.rels", ROOT_RELS)?;
    package.add_text("xl/workbook.xml", &workbook(&sheets))?;
    package.add_text("xl/_rels/workbook.xml.rels", &workbook_rels(sheets.len()))?;
    package.add_text("xl/styles.xml", STYLES)?;
    for (i, (_, rows)) in sheets.iter().enumerate() {
        package.add_text(&format!("xl/worksheets/sheet{}.xml", i + 1), &worksheet(rows))?;
    }

    let bytes = package.finish()?;
    debug!(sheets = sheets.len(), bytes = bytes.len(), "XLSX written");
    Ok(bytes)
}

/// One CSV for all tables. Columns: `page`, `table`, then the cells, padded
/// to the widest row.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn write_csv(pages: &[PageTables]) -> Result<Vec<u8>> {
    let width = pages
        .iter()
        .flat_map(|p| &p.tables)
        .flat_map(|t| &t.rows)
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["page".to_owned(), "table".to_owned()];
    header.extend((1..=width).map(|c| format!("column_{c}")));
    writer.write_record(&header).map_err(std::io::Error::from)?;

    for page in pages {
        for (n, table) in page.tables.iter().enumerate() {
            for row in &table.rows {
                let mut record = vec![(page.page + 1).to_string(), (n + 1).to_string()];
                record.extend(row.iter().cloned());
                record.resize(width + 2, String::new());
                writer.write_record(&record).map_err(std::io::Error::from)?;
            }
        }
    }

    writer
        .into_inner()
        .map_err(|err| FalzwerkError::Io(err.into_error()))
}

fn content_types(sheets: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str("<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">");
    xml.push_str("<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>");
    xml.push_str("<Default Extension=\"xml\" ContentType=\"application/xml\"/>");
    xml.push_str("<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>");
    xml.push_str("<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>");
    for n in 1..=sheets {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook(sheets: &[(String, &[Vec<String>])]) -> String {
    let mut xml = format!("{XML_DECL}<workbook xmlns=\"{MAIN_NS}\" xmlns:r=\"{REL_NS}\"><sheets>");
    for (i, (name, _)) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            xml_escape(name),
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheets: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
    );
    for n in 1..=sheets {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{n}\" Type=\"{REL_NS}/worksheet\" Target=\"worksheets/sheet{n}.xml\"/>"
        ));
    }
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"{REL_NS}/styles\" Target=\"styles.xml\"/>",
        sheets + 1
    ));
    xml.push_str("</Relationships>");
    xml
}

fn worksheet(rows: &[Vec<String>]) -> String {
    let mut xml = format!("{XML_DECL}<worksheet xmlns=\"{MAIN_NS}\"><sheetData>");
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, cell) in row.iter().enumerate() {
            xml.push_str(&format!(
                "<c r=\"{}{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                column_name(c),
                r + 1,
                xml_escape(cell)
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Zero-based column index to its A1-style letters.
fn column_name(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Read};

    fn table(rows: &[&[&str]]) -> Table {
        Table {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn read(bytes: Vec<u8>, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn one_sheet_per_table() {
        let pages = vec![
            PageTables { page: 0, tables: vec![] },
            PageTables {
                page: 1,
                tables: vec![table(&[&["a", "b"]]), table(&[&["x<y"]])],
            },
        ];
        let bytes = write_xlsx(&pages).unwrap();
        let workbook = read(bytes.clone(), "xl/workbook.xml");
        assert!(workbook.contains("name=\"p2_t1\""));
        assert!(workbook.contains("name=\"p2_t2\""));
        assert!(!workbook.contains("summary"));
        assert!(read(bytes, "xl/worksheets/sheet2.xml").contains("x&lt;y"));
    }

    #[test]
    fn no_tables_yields_summary_sheet() {
        let bytes = write_xlsx(&[PageTables { page: 0, tables: vec![] }]).unwrap();
        let workbook = read(bytes, "xl/workbook.xml");
        assert_eq!(workbook.matches("<sheet ").count(), 1);
        assert!(workbook.contains("name=\"summary\""));
    }

    #[test]
    fn csv_tags_rows_with_page_and_table() {
        let pages = vec![PageTables {
            page: 2,
            tables: vec![table(&[&["a", "b", "c"], &["d"]])],
        }];
        let csv = String::from_utf8(write_csv(&pages).unwrap()).unwrap();
        assert_eq!(
            csv,
            "page,table,column_1,column_2,column_3\n3,1,a,b,c\n3,1,d,,\n"
        );
    }
}
