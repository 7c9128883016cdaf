use std::collections::BTreeMap;

use crate::config::COMMENT_MARKER;
use crate::sheet::SharedStringPool;

//==============================================================================
// Object-file model
//==============================================================================

/// How a parameter value is typed when it lands in a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Non-empty run of ASCII digits.
    Number,
    /// Anything else; stored through the shared-string pool.
    String,
    /// `#` line; key is the literal marker.
    Comment,
}

/// One `key=value` (or `# text`) line of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Lowercased key, or `#` for comments.
    pub key: String,
    pub value: String,
    pub kind: ParamKind,
}

impl Parameter {
    /// Build a parameter, typing the value from its content.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        let kind = if key == COMMENT_MARKER {
            ParamKind::Comment
        } else {
            kind_of_value(&value)
        };
        Self { key, value, kind }
    }

    /// Build a comment parameter.
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            key: COMMENT_MARKER.to_string(),
            value: text.into(),
            kind: ParamKind::Comment,
        }
    }

    pub fn is_comment(&self) -> bool {
        self.kind == ParamKind::Comment
    }
}

/// Number when the value is a non-empty run of decimal digits, String otherwise.
pub fn kind_of_value(value: &str) -> ParamKind {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        ParamKind::Number
    } else {
        ParamKind::String
    }
}

/// Ordered parameters of one object. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatObject {
    pub params: Vec<Parameter>,
}

impl DatObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by key. Returns `true` when an existing value was
    /// replaced; the parameter keeps its original position.
    pub fn set(&mut self, param: Parameter) -> bool {
        if let Some(existing) = self.params.iter_mut().find(|p| p.key == param.key) {
            *existing = param;
            true
        } else {
            self.params.push(param);
            false
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

//==============================================================================
// Workbook model
//==============================================================================

/// Payload of one cell as stored in a worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// Literal number text (`t="n"` or no type).
    Number(String),
    /// Index into the shared-string pool (`t="s"`).
    Shared(u32),
    /// `t="b"`.
    Boolean(bool),
    /// `t="inlineStr"`.
    Inline(String),
}

/// One worksheet row; cells are sparse and keyed by zero-based column index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// 1-based row number; row 1 holds the column keys.
    pub number: u32,
    pub cells: BTreeMap<u16, CellValue>,
}

impl Row {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            cells: BTreeMap::new(),
        }
    }
}

/// Cell whose declared type the importer cannot turn into a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedCell {
    pub row: u32,
    pub column: u16,
    pub declared_type: String,
}

/// One directory's worth of objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    /// Column keys by index. Filled on export; on import the header row is
    /// the source of truth.
    pub columns: Vec<String>,
    /// Rows in increasing row-number order, header row first.
    pub rows: Vec<Row>,
    /// Cells skipped while reading because of their declared type.
    pub unsupported: Vec<UnsupportedCell>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn header(&self) -> Option<&Row> {
        self.rows.iter().find(|r| r.number == 1)
    }

    /// Data rows (everything after row 1).
    pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.number > 1)
    }
}

/// Sheets in traversal order plus the strings they reference.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub strings: SharedStringPool,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of_value() {
        assert_eq!(kind_of_value("120"), ParamKind::Number);
        assert_eq!(kind_of_value("007"), ParamKind::Number);
        assert_eq!(kind_of_value("-5"), ParamKind::String);
        assert_eq!(kind_of_value("1.5"), ParamKind::String);
        assert_eq!(kind_of_value("bus"), ParamKind::String);
        assert_eq!(kind_of_value(""), ParamKind::String);
    }

    #[test]
    fn test_parameter_comment_kind() {
        let p = Parameter::new("#", "hello");
        assert!(p.is_comment());
        assert_eq!(Parameter::comment("x").key, "#");
    }

    #[test]
    fn test_object_set_overwrites_in_place() {
        let mut obj = DatObject::new();
        assert!(!obj.set(Parameter::new("a", "1")));
        assert!(!obj.set(Parameter::new("b", "x")));
        assert!(obj.set(Parameter::new("a", "2")));

        assert_eq!(obj.len(), 2);
        assert_eq!(obj.params[0].key, "a");
        assert_eq!(obj.params[0].value, "2");
        assert_eq!(obj.get("b"), Some("x"));
    }

    #[test]
    fn test_sheet_header_and_data_rows() {
        let mut sheet = Sheet::new("vehicles");
        sheet.rows.push(Row::new(1));
        sheet.rows.push(Row::new(2));
        sheet.rows.push(Row::new(3));
        assert_eq!(sheet.header().map(|r| r.number), Some(1));
        assert_eq!(sheet.data_rows().count(), 2);
    }
}
