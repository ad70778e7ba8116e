// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal PresentationML writer: one slide per page image, the image
// stretched over the whole slide.

use falzwerk_core::error::Result;
use tracing::{debug, instrument};

use super::package::ZipPackage;

/// 10in x 7.5in in English Metric Units.
pub const SLIDE_WIDTH_EMU: u64 = 9_144_000;
pub const SLIDE_HEIGHT_EMU: u64 = 6_858_000;

const NS: &str = concat!(
    "xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" ",
    "xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\""
);

const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const EMPTY_TREE: &str = "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>";

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Falzwerk"><a:themeElements>
<a:clrScheme name="Falzwerk"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F1F1F"/></a:dk2><a:lt2><a:srgbClr val="EEEEEE"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme>
<a:fontScheme name="Falzwerk"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>
<a:fmtScheme name="Falzwerk"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme>
</a:themeElements></a:theme>"#;

/// Write a `.pptx` with one slide per JPEG, in order.
#[instrument(skip_all, fields(slides = jpegs.len()))]
pub fn write_pptx(jpegs: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut package = ZipPackage::new();
    package.add_text("[Content_Types].xml", &content_types(jpegs.len()))?;
    package.add_text(
        "_rels/.rels",
        &relationships(&[(
            "rId1",
            "officeDocument",
            "ppt/presentation.xml".to_owned(),
        )]),
    )?;

    package.add_text("ppt/presentation.xml", &presentation(jpegs.len()))?;
    let mut presentation_rels = vec![
        ("rId1", "slideMaster", "slideMasters/slideMaster1.xml".to_owned()),
        ("rId2", "theme", "theme/theme1.xml".to_owned()),
    ];
    let slide_ids: Vec<String> = (0..jpegs.len()).map(|i| format!("rId{}", i + 3)).collect();
    for (i, id) in slide_ids.iter().enumerate() {
        presentation_rels.push((id.as_str(), "slide", format!("slides/slide{}.xml", i + 1)));
    }
    package.add_text("ppt/_rels/presentation.xml.rels", &relationships(&presentation_rels))?;

    package.add_text("ppt/theme/theme1.xml", THEME)?;
    package.add_text("ppt/slideMasters/slideMaster1.xml", &slide_master())?;
    package.add_text(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml".to_owned()),
            ("rId2", "theme", "../theme/theme1.xml".to_owned()),
        ]),
    )?;
    package.add_text("ppt/slideLayouts/slideLayout1.xml", &slide_layout())?;
    package.add_text(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml".to_owned())]),
    )?;

    for (i, jpeg) in jpegs.iter().enumerate() {
        let n = i + 1;
        package.add(&format!("ppt/media/image{n}.jpeg"), jpeg)?;
        package.add_text(&format!("ppt/slides/slide{n}.xml"), &slide(n))?;
        package.add_text(
            &format!("ppt/slides/_rels/slide{n}.xml.rels"),
            &relationships(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml".to_owned()),
                ("rId2", "image", format!("../media/image{n}.jpeg")),
            ]),
        )?;
    }

    let bytes = package.finish()?;
    debug!(bytes = bytes.len(), "PPTX written");
    Ok(bytes)
}

fn content_types(slides: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str("<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">");
    xml.push_str("<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>");
    xml.push_str("<Default Extension=\"xml\" ContentType=\"application/xml\"/>");
    xml.push_str("<Default Extension=\"jpeg\" ContentType=\"image/jpeg\"/>");
    let parts = [
        ("/ppt/presentation.xml", "presentationml.presentation.main+xml"),
        ("/ppt/slideMasters/slideMaster1.xml", "presentationml.slideMaster+xml"),
        ("/ppt/slideLayouts/slideLayout1.xml", "presentationml.slideLayout+xml"),
        ("/ppt/theme/theme1.xml", "theme+xml"),
    ];
    for (part, kind) in parts {
        xml.push_str(&format!(
            "<Override PartName=\"{part}\" ContentType=\"application/vnd.openxmlformats-officedocument.{kind}\"/>"
        ));
    }
    for n in 1..=slides {
        xml.push_str(&format!(
            "<Override PartName=\"/ppt/slides/slide{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>"
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn relationships(entries: &[(&str, &str, String)]) -> String {
    let mut xml = format!("{XML_DECL}<Relationships xmlns=\"{REL_NS}\">");
    for (id, kind, target) in entries {
        xml.push_str(&format!(
            "<Relationship Id=\"{id}\" Type=\"{REL_TYPE}/{kind}\" Target=\"{target}\"/>"
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn presentation(slides: usize) -> String {
    let mut ids = String::new();
    if slides > 0 {
        ids.push_str("<p:sldIdLst>");
        for i in 0..slides {
            ids.push_str(&format!("<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 256 + i, i + 3));
        }
        ids.push_str("</p:sldIdLst>");
    }
    format!(
        "{XML_DECL}<p:presentation {NS}>\
         <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
         {ids}<p:sldSz cx=\"{SLIDE_WIDTH_EMU}\" cy=\"{SLIDE_HEIGHT_EMU}\"/>\
         <p:notesSz cx=\"{SLIDE_HEIGHT_EMU}\" cy=\"{SLIDE_WIDTH_EMU}\"/></p:presentation>"
    )
}

fn slide_master() -> String {
    format!(
        "{XML_DECL}<p:sldMaster {NS}><p:cSld><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld>\
         <p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" \
         accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" \
         folHlink=\"folHlink\"/>\
         <p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst></p:sldMaster>"
    )
}

fn slide_layout() -> String {
    format!(
        "{XML_DECL}<p:sldLayout {NS} type=\"blank\" preserve=\"1\"><p:cSld name=\"Blank\">\
         <p:spTree>{EMPTY_TREE}</p:spTree></p:cSld>\
         <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
    )
}

fn slide(n: usize) -> String {
    format!(
        "{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{EMPTY_TREE}\
         <p:pic><p:nvPicPr><p:cNvPr id=\"2\" name=\"Page {n}\"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>\
         <p:blipFill><a:blip r:embed=\"rId2\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
         <p:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{SLIDE_WIDTH_EMU}\" cy=\"{SLIDE_HEIGHT_EMU}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>\
         </p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
    )
}
