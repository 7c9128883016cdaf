//! Package → workbook model, following relationships instead of fixed names.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::N_NCOLS_MAX;
use crate::error::{DatSheetError, DatSheetResult};
use crate::sheet::{split_cell_reference, SharedStringPool};
use crate::types::{CellValue, Row, Sheet, UnsupportedCell, Workbook};
use crate::xlsx::escape::unescape_text;
use crate::xlsx::package::PackageReader;
use crate::xlsx::parts::ENTRY_ROOT_RELS;

//==============================================================================
// Relationships and part names
//==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Type comparison on the last URI segment, so transitional and strict
    /// namespaces both match.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// `xl/workbook.xml` → `xl/_rels/workbook.xml.rels`.
pub fn rels_for_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file_name)) => format!("{dir}/_rels/{file_name}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that declares it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split('#').next().unwrap_or(target);
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    let base_dir = source_part.rsplit_once('/').map_or("", |(dir, _)| dir);
    normalize(&format!("{base_dir}/{target}"))
}

fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

fn attr(e: &BytesStart<'_>, name: &[u8], entry: &str) -> DatSheetResult<Option<String>> {
    for a in e.attributes() {
        let a = a.map_err(|err| DatSheetError::xml(entry, err))?;
        if a.key.local_name().as_ref() == name {
            let value = a
                .unescape_value()
                .map_err(|err| DatSheetError::xml(entry, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

pub fn parse_relationships(xml: &str, entry: &str) -> DatSheetResult<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rels = Vec::new();
    loop {
        match reader.read_event().map_err(|e| DatSheetError::xml(entry, e))? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let Some(id) = attr(&e, b"Id", entry)? else {
                    continue;
                };
                rels.push(Relationship {
                    id,
                    rel_type: attr(&e, b"Type", entry)?.unwrap_or_default(),
                    target: attr(&e, b"Target", entry)?.unwrap_or_default(),
                    external: attr(&e, b"TargetMode", entry)?.as_deref() == Some("External"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// `(name, relationship id)` of every `<sheet>` in workbook order.
pub fn parse_workbook_sheets(xml: &str, entry: &str) -> DatSheetResult<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    loop {
        match reader.read_event().map_err(|e| DatSheetError::xml(entry, e))? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name", entry)?.unwrap_or_default();
                // `r:id`; prefixed so it is not confused with a bare `id`.
                let mut rel_id = None;
                for a in e.attributes() {
                    let a = a.map_err(|err| DatSheetError::xml(entry, err))?;
                    if a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some() {
                        rel_id = Some(
                            a.unescape_value()
                                .map_err(|err| DatSheetError::xml(entry, err))?
                                .into_owned(),
                        );
                    }
                }
                match rel_id {
                    Some(rel_id) => sheets.push((name, rel_id)),
                    None => tracing::debug!(sheet = %name, "sheet without relationship id"),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

//==============================================================================
// Shared strings and worksheets
//==============================================================================

/// Shared-string table. Rich-text items concatenate their runs; phonetic
/// (`rPh`) runs are left out.
pub fn parse_shared_strings(xml: &str, entry: &str) -> DatSheetResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event().map_err(|e| DatSheetError::xml(entry, e))? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if phonetic_depth == 0 => in_t = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    let text = current.take().unwrap_or_default();
                    strings.push(unescape_text(&text).into_owned());
                }
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_t = false,
                _ => {}
            },
            Event::Text(t) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape().map_err(|e| DatSheetError::xml(entry, e))?);
                }
            }
            Event::CData(t) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Cell being read: position, declared type and collected text.
#[derive(Default)]
struct PendingCell {
    column: u32,
    row: u32,
    declared_type: Option<String>,
    value: String,
    inline: String,
    has_content: bool,
}

/// Where text events go.
#[derive(PartialEq, Eq)]
enum TextTarget {
    None,
    Value,
    Inline,
}

/// Parse one worksheet into rows of raw cells. Cells with a type that
/// cannot be decoded are listed in [`Sheet::unsupported`].
pub fn parse_worksheet(xml: &str, entry: &str, name: &str) -> DatSheetResult<Sheet> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut sheet = Sheet::new(name);
    let mut row: Option<Row> = None;
    let mut last_row = 0u32;
    let mut next_column = 0u32;
    let mut cell: Option<PendingCell> = None;
    let mut target = TextTarget::None;
    let mut in_inline = false;
    let mut phonetic_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| DatSheetError::xml(entry, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                let number = attr(e, b"r", entry)?
                    .and_then(|r| r.trim().parse::<u32>().ok())
                    .unwrap_or(last_row + 1);
                last_row = number;
                next_column = 0;
                if matches!(event, Event::Start(_)) {
                    row = Some(Row::new(number));
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"row" => {
                if let Some(done) = row.take() {
                    sheet.rows.push(done);
                }
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                let reference = attr(e, b"r", entry)?;
                let (column, row_number) = match reference.as_deref().and_then(split_cell_reference)
                {
                    Some((column, row_number)) => (column, row_number),
                    None => (next_column, last_row),
                };
                next_column = column + 1;
                if matches!(event, Event::Start(_)) {
                    cell = Some(PendingCell {
                        column,
                        row: row_number,
                        declared_type: attr(e, b"t", entry)?,
                        ..Default::default()
                    });
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"c" => {
                if let Some(done) = cell.take() {
                    finish_cell(done, row.as_mut(), &mut sheet.unsupported);
                }
                target = TextTarget::None;
                in_inline = false;
            }
            Event::Start(ref e) if cell.is_some() => match e.local_name().as_ref() {
                b"v" => target = TextTarget::Value,
                b"is" => in_inline = true,
                b"rPh" => phonetic_depth += 1,
                b"t" if in_inline && phonetic_depth == 0 => target = TextTarget::Inline,
                _ => {}
            },
            Event::End(ref e) if cell.is_some() => match e.local_name().as_ref() {
                b"v" | b"t" => target = TextTarget::None,
                b"is" => in_inline = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {}
            },
            Event::Text(ref t) if target != TextTarget::None => {
                let text = t.unescape().map_err(|e| DatSheetError::xml(entry, e))?;
                if let Some(pending) = cell.as_mut() {
                    pending.has_content = true;
                    match target {
                        TextTarget::Value => pending.value.push_str(&text),
                        TextTarget::Inline => pending.inline.push_str(&text),
                        TextTarget::None => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    sheet.rows.sort_by_key(|r| r.number);
    Ok(sheet)
}

fn finish_cell(cell: PendingCell, row: Option<&mut Row>, unsupported: &mut Vec<UnsupportedCell>) {
    let Some(row) = row else {
        return;
    };
    if !cell.has_content || cell.column as usize >= N_NCOLS_MAX {
        return;
    }
    let column = cell.column as u16;
    let value = cell.value.trim();
    let decoded = match cell.declared_type.as_deref() {
        None | Some("n") => Some(CellValue::Number(value.to_string())),
        Some("s") => value.parse::<u32>().ok().map(CellValue::Shared),
        Some("b") => match value {
            "1" | "true" => Some(CellValue::Boolean(true)),
            "0" | "false" => Some(CellValue::Boolean(false)),
            _ => None,
        },
        Some("inlineStr") => Some(CellValue::Inline(unescape_text(&cell.inline).into_owned())),
        Some(_) => None,
    };
    match decoded {
        Some(value) => {
            row.cells.insert(column, value);
        }
        None => unsupported.push(UnsupportedCell {
            row: cell.row,
            column,
            declared_type: cell.declared_type.unwrap_or_default(),
        }),
    }
}

//==============================================================================
// Whole package
//==============================================================================

/// Read a workbook package into sheets plus the shared-string pool.
///
/// The workbook part is found through `_rels/.rels`, its sheets and shared
/// strings through the workbook's own relationships. A workbook without a
/// shared-strings relationship has an empty pool.
pub fn read_workbook(path: &Path) -> DatSheetResult<Workbook> {
    let mut package = PackageReader::open(path)?;

    let root_rels = parse_relationships(&package.read_text(ENTRY_ROOT_RELS)?, ENTRY_ROOT_RELS)?;
    let workbook_rel = root_rels
        .iter()
        .find(|r| r.is_kind("officeDocument") && !r.external)
        .ok_or_else(|| DatSheetError::MissingRelationship {
            source_part: ENTRY_ROOT_RELS.to_string(),
            kind: "officeDocument".to_string(),
        })?;
    let workbook_part = resolve_target("", &workbook_rel.target);
    tracing::debug!(part = %workbook_part, "workbook");

    let sheet_refs = parse_workbook_sheets(&package.read_text(&workbook_part)?, &workbook_part)?;
    let rels_part = rels_for_part(&workbook_part);
    let workbook_rels = parse_relationships(&package.read_text(&rels_part)?, &rels_part)?;

    let strings = match workbook_rels
        .iter()
        .find(|r| r.is_kind("sharedStrings") && !r.external)
    {
        Some(rel) => {
            let part = resolve_target(&workbook_part, &rel.target);
            parse_shared_strings(&package.read_text(&part)?, &part)?
        }
        None => {
            tracing::debug!("no shared strings part");
            Vec::new()
        }
    };

    let mut workbook = Workbook {
        sheets: Vec::with_capacity(sheet_refs.len()),
        strings: SharedStringPool::from_strings(strings),
    };
    for (name, rel_id) in sheet_refs {
        let rel = workbook_rels
            .iter()
            .find(|r| r.id == rel_id)
            .ok_or_else(|| DatSheetError::MissingRelationship {
                source_part: rels_part.clone(),
                kind: rel_id.clone(),
            })?;
        if !rel.is_kind("worksheet") {
            tracing::debug!(sheet = %name, kind = %rel.rel_type, "not a worksheet, skipped");
            continue;
        }
        let part = resolve_target(&workbook_part, &rel.target);
        let sheet = parse_worksheet(&package.read_text(&part)?, &part, &name)?;
        tracing::debug!(sheet = %name, part = %part, rows = sheet.rows.len(), "read");
        workbook.sheets.push(sheet);
    }
    Ok(workbook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rels_for_part() {
        assert_eq!(rels_for_part("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(rels_for_part("workbook.xml"), "_rels/workbook.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../sharedStrings.xml"),
            "xl/sharedStrings.xml"
        );
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
    }

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://purl.oclc.org/ooxml/officeDocument/relationships/officeDocument" Target="xl/workbook.xml"/>
  <Relationship Id="rId2" Type="http://x/hyperlink" Target="http://example.com" TargetMode="External"/>
</Relationships>"#;
        let rels = parse_relationships(xml, "_rels/.rels").unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels[0].is_kind("officeDocument"));
        assert!(!rels[0].external);
        assert!(rels[1].external);
    }

    #[test]
    fn test_parse_workbook_sheets() {
        let xml = r#"<workbook xmlns="m" xmlns:r="r"><sheets>
<sheet name=";" sheetId="1" r:id="rId1"/>
<sheet name="a;b &amp; c" sheetId="2" r:id="rId7"/>
</sheets></workbook>"#;
        let sheets = parse_workbook_sheets(xml, "xl/workbook.xml").unwrap();
        assert_eq!(
            sheets,
            vec![
                (";".to_string(), "rId1".to_string()),
                ("a;b & c".to_string(), "rId7".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_shared_strings_rich_text_and_phonetic() {
        let xml = r#"<sst xmlns="m" count="3" uniqueCount="3">
<si><t>plain</t></si>
<si><r><rPr><b/></rPr><t>bold </t></r><r><t xml:space="preserve">part</t></r><rPh sb="0" eb="1"><t>ignored</t></rPh></si>
<si/>
<si><t> a &lt; b </t></si>
</sst>"#;
        let strings = parse_shared_strings(xml, "xl/sharedStrings.xml").unwrap();
        assert_eq!(strings, vec!["plain", "bold part", "", " a < b "]);
    }

    #[test]
    fn test_parse_escaped_control_characters() {
        let xml = r#"<sst xmlns="m" count="2" uniqueCount="2">
<si><t>bell_x0007_</t></si>
<si><t>_x005F_x0041_</t></si>
</sst>"#;
        let strings = parse_shared_strings(xml, "xl/sharedStrings.xml").unwrap();
        assert_eq!(strings, vec!["bell\u{7}", "_x0041_"]);

        let xml = r#"<worksheet><sheetData><row r="1">
<c r="A1" t="inlineStr"><is><t>a_x001B_b</t></is></c>
<c r="B1"><v>_x0031_</v></c>
</row></sheetData></worksheet>"#;
        let sheet = parse_worksheet(xml, "sheet1.xml", "s").unwrap();
        let row = &sheet.rows[0];
        assert_eq!(row.cells.get(&0), Some(&CellValue::Inline("a\u{1B}b".into())));
        assert_eq!(row.cells.get(&1), Some(&CellValue::Number("_x0031_".into())));
    }

    #[test]
    fn test_parse_worksheet_cell_types() {
        let xml = r#"<worksheet xmlns="m"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="3">
  <c r="A3" t="inlineStr"><is><t>inline</t></is></c>
  <c r="B3"><v>12</v></c>
  <c r="C3" t="b"><v>1</v></c>
  <c r="D3" t="e"><v>#N/A</v></c>
  <c r="E3" t="n"/>
</row>
</sheetData></worksheet>"#;
        let sheet = parse_worksheet(xml, "sheet1.xml", "s").unwrap();
        assert_eq!(sheet.rows.len(), 2);
        let row = &sheet.rows[1];
        assert_eq!(row.number, 3);
        assert_eq!(row.cells.get(&0), Some(&CellValue::Inline("inline".into())));
        assert_eq!(row.cells.get(&1), Some(&CellValue::Number("12".into())));
        assert_eq!(row.cells.get(&2), Some(&CellValue::Boolean(true)));
        assert_eq!(row.cells.get(&3), None);
        assert_eq!(row.cells.get(&4), None);
        assert_eq!(
            sheet.unsupported,
            vec![UnsupportedCell {
                row: 3,
                column: 3,
                declared_type: "e".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_worksheet_without_references() {
        let xml = r#"<worksheet><sheetData>
<row><c t="s"><v>0</v></c><c t="s"><v>1</v></c></row>
<row><c><v>5</v></c><c r="D2"><v>6</v></c><c><v>7</v></c></row>
</sheetData></worksheet>"#;
        let sheet = parse_worksheet(xml, "sheet1.xml", "s").unwrap();
        assert_eq!(sheet.rows[0].number, 1);
        assert_eq!(sheet.rows[1].number, 2);
        let columns: Vec<_> = sheet.rows[1].cells.keys().copied().collect();
        assert_eq!(columns, vec![0, 3, 4]);
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let result = parse_worksheet("<worksheet><sheetData></row>", "sheet1.xml", "s");
        assert!(matches!(result, Err(DatSheetError::Xml { .. })));
    }
}
