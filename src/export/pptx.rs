//! Picture-only PPTX writer
//!
//! Writes the smallest package PowerPoint and LibreOffice accept: one slide
//! master, one blank layout, one theme and one slide per page. Every slide
//! holds a single picture anchored at the top-left corner, as wide as the
//! slide, with the page's aspect ratio.

use std::io::{Cursor, Write};

use chrono::{SecondsFormat, Utc};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use super::ExportError;

/// English Metric Units per inch
const EMU_PER_INCH: f64 = 914_400.0;

/// 13.333 in
pub const SLIDE_WIDTH_EMU: i64 = (13.333 * EMU_PER_INCH) as i64;
/// 7.5 in
pub const SLIDE_HEIGHT_EMU: i64 = (7.5 * EMU_PER_INCH) as i64;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const REL_OFFICE_DOCUMENT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE: &str = "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE_MASTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const CT_PRESENTATION: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_SLIDE_MASTER: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_EXTENDED: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";
const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Master, layout and theme never change between exports
const SLIDE_MASTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#;

const SLIDE_LAYOUT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#;

const THEME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

type XmlWriter = Writer<Cursor<Vec<u8>>>;
type XmlResult = Result<(), quick_xml::Error>;

/// Build a slide deck with one full-width picture per PNG
pub fn images_to_pptx(pages: &[Vec<u8>], title: &str) -> Result<Vec<u8>, ExportError> {
    if pages.is_empty() {
        return Err(ExportError::NoPages);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    // Already-compressed media goes in as-is
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(&xml_part(|w| write_content_types(w, pages.len()))?)?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(&xml_part(|w| {
        write_relationships(
            w,
            &[
                ("rId1", REL_OFFICE_DOCUMENT, "ppt/presentation.xml"),
                ("rId2", REL_CORE, "docProps/core.xml"),
                ("rId3", REL_EXTENDED, "docProps/app.xml"),
            ],
        )
    })?)?;

    zip.start_file("docProps/core.xml", options)?;
    zip.write_all(&xml_part(|w| write_core_properties(w, title))?)?;

    zip.start_file("docProps/app.xml", options)?;
    zip.write_all(&xml_part(|w| write_app_properties(w, pages.len()))?)?;

    zip.start_file("ppt/presentation.xml", options)?;
    zip.write_all(&xml_part(|w| write_presentation(w, pages.len()))?)?;

    let mut presentation_rels: Vec<(String, &str, String)> = vec![
        ("rId1".to_string(), REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml".to_string()),
        ("rId2".to_string(), REL_THEME, "theme/theme1.xml".to_string()),
    ];
    for n in 1..=pages.len() {
        presentation_rels.push((format!("rId{}", n + 2), REL_SLIDE, format!("slides/slide{}.xml", n)));
    }
    zip.start_file("ppt/_rels/presentation.xml.rels", options)?;
    zip.write_all(&xml_part(|w| {
        let rels: Vec<(&str, &str, &str)> = presentation_rels
            .iter()
            .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
            .collect();
        write_relationships(w, &rels)
    })?)?;

    zip.start_file("ppt/slideMasters/slideMaster1.xml", options)?;
    zip.write_all(SLIDE_MASTER_XML.as_bytes())?;
    zip.start_file("ppt/slideMasters/_rels/slideMaster1.xml.rels", options)?;
    zip.write_all(&xml_part(|w| {
        write_relationships(
            w,
            &[
                ("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
                ("rId2", REL_THEME, "../theme/theme1.xml"),
            ],
        )
    })?)?;

    zip.start_file("ppt/slideLayouts/slideLayout1.xml", options)?;
    zip.write_all(SLIDE_LAYOUT_XML.as_bytes())?;
    zip.start_file("ppt/slideLayouts/_rels/slideLayout1.xml.rels", options)?;
    zip.write_all(&xml_part(|w| {
        write_relationships(w, &[("rId1", REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml")])
    })?)?;

    zip.start_file("ppt/theme/theme1.xml", options)?;
    zip.write_all(THEME_XML.as_bytes())?;

    for (i, png) in pages.iter().enumerate() {
        let n = i + 1;
        let (width, height) = image_dimensions(png)?;
        let picture_height = (SLIDE_WIDTH_EMU as f64 * height as f64 / width.max(1) as f64) as i64;

        zip.start_file(format!("ppt/slides/slide{}.xml", n), options)?;
        zip.write_all(&xml_part(|w| write_slide(w, n, SLIDE_WIDTH_EMU, picture_height))?)?;

        let image_target = format!("../media/image{}.png", n);
        zip.start_file(format!("ppt/slides/_rels/slide{}.xml.rels", n), options)?;
        zip.write_all(&xml_part(|w| {
            write_relationships(
                w,
                &[
                    ("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
                    ("rId2", REL_IMAGE, image_target.as_str()),
                ],
            )
        })?)?;

        zip.start_file(format!("ppt/media/image{}.png", n), stored)?;
        zip.write_all(png)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn image_dimensions(png: &[u8]) -> Result<(u32, u32), ExportError> {
    image::ImageReader::new(Cursor::new(png))
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|e| ExportError::Image(e.to_string()))
}

/// Serialize one XML part with its declaration
fn xml_part<F>(body: F) -> Result<Vec<u8>, ExportError>
where
    F: FnOnce(&mut XmlWriter) -> XmlResult,
{
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    body(&mut writer)?;
    Ok(writer.into_inner().into_inner())
}

fn element<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut elem = BytesStart::new(name);
    for attribute in attributes {
        elem.push_attribute(*attribute);
    }
    elem
}

fn start(writer: &mut XmlWriter, name: &str, attributes: &[(&str, &str)]) -> XmlResult {
    writer.write_event(Event::Start(element(name, attributes)))?;
    Ok(())
}

fn end(writer: &mut XmlWriter, name: &str) -> XmlResult {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty(writer: &mut XmlWriter, name: &str, attributes: &[(&str, &str)]) -> XmlResult {
    writer.write_event(Event::Empty(element(name, attributes)))?;
    Ok(())
}

fn text_element(writer: &mut XmlWriter, name: &str, attributes: &[(&str, &str)], value: &str) -> XmlResult {
    start(writer, name, attributes)?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    end(writer, name)
}

fn write_content_types(w: &mut XmlWriter, slides: usize) -> XmlResult {
    start(w, "Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    empty(w, "Default", &[("Extension", "rels"), ("ContentType", CT_RELS)])?;
    empty(w, "Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    empty(w, "Default", &[("Extension", "png"), ("ContentType", "image/png")])?;

    let overrides = [
        ("/ppt/presentation.xml", CT_PRESENTATION),
        ("/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER),
        ("/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT),
        ("/ppt/theme/theme1.xml", CT_THEME),
        ("/docProps/core.xml", CT_CORE),
        ("/docProps/app.xml", CT_EXTENDED),
    ];
    for (part, content_type) in overrides {
        empty(w, "Override", &[("PartName", part), ("ContentType", content_type)])?;
    }
    for n in 1..=slides {
        let part = format!("/ppt/slides/slide{}.xml", n);
        empty(w, "Override", &[("PartName", part.as_str()), ("ContentType", CT_SLIDE)])?;
    }

    end(w, "Types")
}

fn write_relationships(w: &mut XmlWriter, relationships: &[(&str, &str, &str)]) -> XmlResult {
    start(w, "Relationships", &[("xmlns", NS_PKG_RELS)])?;
    for &(id, kind, target) in relationships {
        empty(w, "Relationship", &[("Id", id), ("Type", kind), ("Target", target)])?;
    }
    end(w, "Relationships")
}

fn write_core_properties(w: &mut XmlWriter, title: &str) -> XmlResult {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    start(
        w,
        "cp:coreProperties",
        &[
            ("xmlns:cp", "http://schemas.openxmlformats.org/package/2006/metadata/core-properties"),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    text_element(w, "dc:title", &[], title)?;
    text_element(w, "dcterms:created", &[("xsi:type", "dcterms:W3CDTF")], &now)?;
    text_element(w, "dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")], &now)?;
    end(w, "cp:coreProperties")
}

fn write_app_properties(w: &mut XmlWriter, slides: usize) -> XmlResult {
    start(
        w,
        "Properties",
        &[("xmlns", "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties")],
    )?;
    text_element(w, "Application", &[], env!("CARGO_PKG_NAME"))?;
    text_element(w, "Slides", &[], &slides.to_string())?;
    end(w, "Properties")
}

fn write_presentation(w: &mut XmlWriter, slides: usize) -> XmlResult {
    start(
        w,
        "p:presentation",
        &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P), ("saveSubsetFonts", "1")],
    )?;

    start(w, "p:sldMasterIdLst", &[])?;
    empty(w, "p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
    end(w, "p:sldMasterIdLst")?;

    start(w, "p:sldIdLst", &[])?;
    for n in 1..=slides {
        // Slide ids start at 256
        let id = (255 + n).to_string();
        let rel = format!("rId{}", n + 2);
        empty(w, "p:sldId", &[("id", id.as_str()), ("r:id", rel.as_str())])?;
    }
    end(w, "p:sldIdLst")?;

    let cx = SLIDE_WIDTH_EMU.to_string();
    let cy = SLIDE_HEIGHT_EMU.to_string();
    empty(w, "p:sldSz", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    empty(w, "p:notesSz", &[("cx", "6858000"), ("cy", "9144000")])?;

    end(w, "p:presentation")
}

fn write_group_properties(w: &mut XmlWriter) -> XmlResult {
    start(w, "p:nvGrpSpPr", &[])?;
    empty(w, "p:cNvPr", &[("id", "1"), ("name", "")])?;
    empty(w, "p:cNvGrpSpPr", &[])?;
    empty(w, "p:nvPr", &[])?;
    end(w, "p:nvGrpSpPr")?;

    start(w, "p:grpSpPr", &[])?;
    start(w, "a:xfrm", &[])?;
    empty(w, "a:off", &[("x", "0"), ("y", "0")])?;
    empty(w, "a:ext", &[("cx", "0"), ("cy", "0")])?;
    empty(w, "a:chOff", &[("x", "0"), ("y", "0")])?;
    empty(w, "a:chExt", &[("cx", "0"), ("cy", "0")])?;
    end(w, "a:xfrm")?;
    end(w, "p:grpSpPr")
}

fn write_slide(w: &mut XmlWriter, number: usize, width: i64, height: i64) -> XmlResult {
    start(w, "p:sld", &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)])?;
    start(w, "p:cSld", &[])?;
    start(w, "p:spTree", &[])?;
    write_group_properties(w)?;

    let name = format!("Page {}", number);
    start(w, "p:pic", &[])?;

    start(w, "p:nvPicPr", &[])?;
    empty(w, "p:cNvPr", &[("id", "2"), ("name", name.as_str())])?;
    start(w, "p:cNvPicPr", &[])?;
    empty(w, "a:picLocks", &[("noChangeAspect", "1")])?;
    end(w, "p:cNvPicPr")?;
    empty(w, "p:nvPr", &[])?;
    end(w, "p:nvPicPr")?;

    start(w, "p:blipFill", &[])?;
    empty(w, "a:blip", &[("r:embed", "rId2")])?;
    start(w, "a:stretch", &[])?;
    empty(w, "a:fillRect", &[])?;
    end(w, "a:stretch")?;
    end(w, "p:blipFill")?;

    let cx = width.to_string();
    let cy = height.to_string();
    start(w, "p:spPr", &[])?;
    start(w, "a:xfrm", &[])?;
    empty(w, "a:off", &[("x", "0"), ("y", "0")])?;
    empty(w, "a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    end(w, "a:xfrm")?;
    start(w, "a:prstGeom", &[("prst", "rect")])?;
    empty(w, "a:avLst", &[])?;
    end(w, "a:prstGeom")?;
    end(w, "p:spPr")?;

    end(w, "p:pic")?;
    end(w, "p:spTree")?;
    end(w, "p:cSld")?;

    start(w, "p:clrMapOvr", &[])?;
    empty(w, "a:masterClrMapping", &[])?;
    end(w, "p:clrMapOvr")?;

    end(w, "p:sld")
}
