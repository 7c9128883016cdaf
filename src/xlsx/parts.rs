//! Markup of every written package entry.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::config::APP_NAME;
use crate::error::{DatSheetError, DatSheetResult};
use crate::sheet::{cell_reference, SharedStringPool};
use crate::types::{CellValue, Sheet};
use crate::xlsx::escape::escape_text;

pub const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
pub const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
pub const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";

pub const ENTRY_ROOT_RELS: &str = "_rels/.rels";
pub const ENTRY_CONTENT_TYPES: &str = "[Content_Types].xml";
pub const ENTRY_WORKBOOK: &str = "xl/workbook.xml";
pub const ENTRY_WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
pub const ENTRY_SHARED_STRINGS: &str = "xl/sharedStrings.xml";
pub const ENTRY_APP: &str = "docProps/app.xml";
pub const ENTRY_CORE: &str = "docProps/core.xml";

/// Entry name of the `n`-th (1-based) worksheet.
pub fn worksheet_entry(n: usize) -> String {
    format!("xl/worksheets/sheet{n}.xml")
}

/// Thin event writer over an in-memory buffer.
struct PartWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

type XmlResult = Result<(), quick_xml::Error>;

impl PartWriter {
    fn new() -> Result<Self, quick_xml::Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(elem))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> XmlResult {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> XmlResult {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// `<name attrs>text</name>`
    fn element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> XmlResult {
        self.start(name, attrs)?;
        self.text(text)?;
        self.end(name)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

fn build(entry: &str, f: impl FnOnce(&mut PartWriter) -> XmlResult) -> DatSheetResult<Vec<u8>> {
    let mut w = PartWriter::new().map_err(|e| DatSheetError::xml(entry, e))?;
    f(&mut w).map_err(|e| DatSheetError::xml(entry, e))?;
    Ok(w.into_bytes())
}

/// `xml:space="preserve"` is needed when edge whitespace must survive.
fn needs_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

//==============================================================================
// Worksheet and shared strings
//==============================================================================

/// One worksheet: frozen header row and first column, sparse cells.
pub fn worksheet_xml(sheet: &Sheet, selected: bool) -> DatSheetResult<Vec<u8>> {
    let entry = format!("worksheet '{}'", sheet.name);
    build(&entry, |w| {
        w.start("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_R)])?;

        let last_col = sheet
            .rows
            .iter()
            .filter_map(|r| r.cells.keys().next_back())
            .max()
            .copied()
            .unwrap_or(0);
        let last_row = sheet.rows.last().map_or(1, |r| r.number);
        let dimension = format!("A1:{}", cell_reference(last_col as u32, last_row));
        w.empty("dimension", &[("ref", dimension.as_str())])?;

        w.start("sheetViews", &[])?;
        let mut view = vec![("workbookViewId", "0")];
        if selected {
            view.insert(0, ("tabSelected", "1"));
        }
        w.start("sheetView", &view)?;
        w.empty(
            "pane",
            &[
                ("xSplit", "1"),
                ("ySplit", "1"),
                ("topLeftCell", "B2"),
                ("activePane", "bottomRight"),
                ("state", "frozen"),
            ],
        )?;
        w.end("sheetView")?;
        w.end("sheetViews")?;
        w.empty("sheetFormatPr", &[("defaultRowHeight", "15")])?;

        w.start("sheetData", &[])?;
        for row in &sheet.rows {
            let r = row.number.to_string();
            w.start("row", &[("r", r.as_str())])?;
            for (column, cell) in &row.cells {
                let reference = cell_reference(*column as u32, row.number);
                write_cell(w, &reference, cell)?;
            }
            w.end("row")?;
        }
        w.end("sheetData")?;
        w.end("worksheet")
    })
}

fn write_cell(w: &mut PartWriter, reference: &str, cell: &CellValue) -> XmlResult {
    match cell {
        CellValue::Number(digits) => {
            w.start("c", &[("r", reference), ("t", "n")])?;
            w.element("v", &[], digits)?;
        }
        CellValue::Shared(idx) => {
            w.start("c", &[("r", reference), ("t", "s")])?;
            w.element("v", &[], &idx.to_string())?;
        }
        CellValue::Boolean(b) => {
            w.start("c", &[("r", reference), ("t", "b")])?;
            w.element("v", &[], if *b { "1" } else { "0" })?;
        }
        CellValue::Inline(text) => {
            w.start("c", &[("r", reference), ("t", "inlineStr")])?;
            w.start("is", &[])?;
            write_t(w, text)?;
            w.end("is")?;
        }
    }
    w.end("c")
}

fn write_t(w: &mut PartWriter, text: &str) -> XmlResult {
    let text = escape_text(text);
    if needs_preserve(&text) {
        w.element("t", &[("xml:space", "preserve")], &text)
    } else {
        w.element("t", &[], &text)
    }
}

/// Shared-string table in pool order. `count` is the number of cells that
/// reference the table.
pub fn shared_strings_xml(pool: &SharedStringPool, count: usize) -> DatSheetResult<Vec<u8>> {
    build(ENTRY_SHARED_STRINGS, |w| {
        let count = count.to_string();
        let unique = pool.len().to_string();
        w.start(
            "sst",
            &[
                ("xmlns", NS_MAIN),
                ("count", count.as_str()),
                ("uniqueCount", unique.as_str()),
            ],
        )?;
        for s in pool.iter() {
            w.start("si", &[])?;
            write_t(w, s)?;
            w.end("si")?;
        }
        w.end("sst")
    })
}

//==============================================================================
// Workbook, relationships, content types
//==============================================================================

/// Workbook part listing sheets as `rId1..rIdN`.
pub fn workbook_xml(sheet_names: &[&str]) -> DatSheetResult<Vec<u8>> {
    build(ENTRY_WORKBOOK, |w| {
        w.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_R)])?;
        w.start("bookViews", &[])?;
        w.empty("workbookView", &[("activeTab", "0")])?;
        w.end("bookViews")?;
        w.start("sheets", &[])?;
        for (idx, name) in sheet_names.iter().enumerate() {
            let sheet_id = (idx + 1).to_string();
            let rel_id = format!("rId{sheet_id}");
            w.empty(
                "sheet",
                &[
                    ("name", *name),
                    ("sheetId", sheet_id.as_str()),
                    ("r:id", rel_id.as_str()),
                ],
            )?;
        }
        w.end("sheets")?;
        w.end("workbook")
    })
}

/// Relationship list; `(id, type, target)` in order.
fn relationships_xml(entry: &str, rels: &[(String, &str, String)]) -> DatSheetResult<Vec<u8>> {
    build(entry, |w| {
        w.start("Relationships", &[("xmlns", NS_PACKAGE_RELS)])?;
        for (id, rel_type, target) in rels {
            w.empty(
                "Relationship",
                &[("Id", id.as_str()), ("Type", *rel_type), ("Target", target.as_str())],
            )?;
        }
        w.end("Relationships")
    })
}

/// Package relationships: workbook and document properties.
pub fn root_rels_xml() -> DatSheetResult<Vec<u8>> {
    relationships_xml(
        ENTRY_ROOT_RELS,
        &[
            ("rId1".into(), REL_OFFICE_DOCUMENT, ENTRY_WORKBOOK.into()),
            ("rId2".into(), REL_CORE_PROPERTIES, ENTRY_CORE.into()),
            ("rId3".into(), REL_EXTENDED_PROPERTIES, ENTRY_APP.into()),
        ],
    )
}

/// Workbook relationships: sheets `rId1..rIdN`, then the shared strings.
pub fn workbook_rels_xml(sheet_count: usize) -> DatSheetResult<Vec<u8>> {
    let mut rels: Vec<(String, &str, String)> = (1..=sheet_count)
        .map(|n| {
            (
                format!("rId{n}"),
                REL_WORKSHEET,
                format!("worksheets/sheet{n}.xml"),
            )
        })
        .collect();
    rels.push((
        format!("rId{}", sheet_count + 1),
        REL_SHARED_STRINGS,
        "sharedStrings.xml".to_string(),
    ));
    relationships_xml(ENTRY_WORKBOOK_RELS, &rels)
}

pub fn content_types_xml(sheet_count: usize) -> DatSheetResult<Vec<u8>> {
    build(ENTRY_CONTENT_TYPES, |w| {
        w.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
        w.empty(
            "Default",
            &[
                ("Extension", "rels"),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-package.relationships+xml",
                ),
            ],
        )?;
        w.empty(
            "Default",
            &[("Extension", "xml"), ("ContentType", "application/xml")],
        )?;

        let mut overrides = vec![(
            format!("/{ENTRY_WORKBOOK}"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
        )];
        for n in 1..=sheet_count {
            overrides.push((
                format!("/{}", worksheet_entry(n)),
                "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
            ));
        }
        overrides.push((
            format!("/{ENTRY_SHARED_STRINGS}"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml",
        ));
        overrides.push((
            format!("/{ENTRY_CORE}"),
            "application/vnd.openxmlformats-package.core-properties+xml",
        ));
        overrides.push((
            format!("/{ENTRY_APP}"),
            "application/vnd.openxmlformats-officedocument.extended-properties+xml",
        ));
        for (part, content_type) in &overrides {
            w.empty(
                "Override",
                &[("PartName", part.as_str()), ("ContentType", *content_type)],
            )?;
        }
        w.end("Types")
    })
}

//==============================================================================
// Document properties
//==============================================================================

pub fn app_xml(sheet_names: &[&str]) -> DatSheetResult<Vec<u8>> {
    build(ENTRY_APP, |w| {
        w.start(
            "Properties",
            &[
                (
                    "xmlns",
                    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
                ),
                (
                    "xmlns:vt",
                    "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes",
                ),
            ],
        )?;
        w.element("Application", &[], APP_NAME)?;
        w.element("DocSecurity", &[], "0")?;
        w.element("ScaleCrop", &[], "false")?;

        let count = sheet_names.len().to_string();
        w.start("HeadingPairs", &[])?;
        w.start("vt:vector", &[("size", "2"), ("baseType", "variant")])?;
        w.start("vt:variant", &[])?;
        w.element("vt:lpstr", &[], "Worksheets")?;
        w.end("vt:variant")?;
        w.start("vt:variant", &[])?;
        w.element("vt:i4", &[], &count)?;
        w.end("vt:variant")?;
        w.end("vt:vector")?;
        w.end("HeadingPairs")?;

        w.start("TitlesOfParts", &[])?;
        w.start("vt:vector", &[("size", count.as_str()), ("baseType", "lpstr")])?;
        for name in sheet_names {
            w.element("vt:lpstr", &[], name)?;
        }
        w.end("vt:vector")?;
        w.end("TitlesOfParts")?;

        w.element("LinksUpToDate", &[], "false")?;
        w.element("SharedDoc", &[], "false")?;
        w.element("HyperlinksChanged", &[], "false")?;
        w.element("AppVersion", &[], env!("CARGO_PKG_VERSION"))?;
        w.end("Properties")
    })
}

/// Core properties: title, creator `"<title> team"`, timestamps.
pub fn core_xml(title: &str, created: DateTime<Utc>) -> DatSheetResult<Vec<u8>> {
    build(ENTRY_CORE, |w| {
        w.start(
            "cp:coreProperties",
            &[
                (
                    "xmlns:cp",
                    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
                ),
                ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
                ("xmlns:dcterms", "http://purl.org/dc/terms/"),
                ("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            ],
        )?;
        let creator = format!("{title} team");
        let stamp = created.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        w.element("dc:title", &[], title)?;
        w.element("dc:creator", &[], &creator)?;
        w.element("cp:lastModifiedBy", &[], &creator)?;
        w.element("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")], &stamp)?;
        w.element("dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")], &stamp)?;
        w.end("cp:coreProperties")
    })
}
