//! Records produced by the part readers and held by the staging store.

use serde::Serialize;

/// A `sheet` entry of the workbook manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorksheetInfo {
    /// The spreadsheet-assigned `sheetId`.
    pub index: u32,
    /// The unique sheet name.
    pub name: String,
    /// The `r:id` relationship pointing at the worksheet part.
    pub relationship_id: Option<String>,
}

/// A worksheet as listed by the staging store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorksheetRecord {
    pub index: u32,
    pub name: String,
    /// Archive path of the worksheet part, when it was resolved on import.
    pub part: Option<String>,
}

/// One entry of the shared strings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedString {
    /// Zero-based position in the shared strings part.
    pub index: u32,
    /// The concatenated text of the entry, markup removed.
    pub text: String,
}

/// A number format declared in (or built into) the styles part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberFormat {
    pub id: u32,
    pub code: String,
}

/// A cell format (`xf`) from the `cellXfs` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellStyle {
    /// Zero-based position in `cellXfs`, which is what a cell's `s` refers to.
    pub id: u32,
    pub applies_number_format: bool,
    pub number_format_id: u32,
}

/// A record produced by the styles reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleRecord {
    NumberFormat(NumberFormat),
    CellStyle(CellStyle),
}

/// A `c` element of a worksheet, as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellInfo {
    /// Column name, e.g. `"C"`.
    pub column: String,
    /// 1-based row number.
    pub row: u32,
    /// The `t` attribute.
    pub cell_type: Option<String>,
    /// The `s` attribute.
    pub style_id: Option<u32>,
    /// Text of the `v` (or inline `t`) content.
    pub raw_value: Option<String>,
}

/// A cell as stored: exactly one of `value` and `shared` is used,
/// depending on whether the cell refers to a shared string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRecord {
    pub worksheet: u32,
    pub column: u32,
    pub row: u32,
    pub cell_type: Option<String>,
    pub style_id: Option<u32>,
    pub value: Option<String>,
    pub shared: Option<i64>,
}

/// A stored cell joined with its shared string and number format code,
/// ready for decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedCell {
    pub column: u32,
    pub row: u32,
    pub cell_type: Option<String>,
    pub value: Option<String>,
    pub shared: Option<String>,
    pub format: Option<String>,
}

/// The kinds of cell type tag found in the `t` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellType {
    /// `b`
    Boolean,
    /// `d`, an ISO 8601 timestamp.
    Date,
    /// `e`
    Error,
    /// `inlineStr`
    InlineString,
    /// `n`, also used when the tag is absent.
    Number,
    /// `s`
    SharedString,
    /// `str`, the cached result of a string formula.
    FormulaString,
    /// Any tag not listed above.
    Other(String),
}

impl CellType {
    /// Classify a `t` attribute value. An absent tag means a number.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            None | Some("n") => CellType::Number,
            Some("b") => CellType::Boolean,
            Some("d") => CellType::Date,
            Some("e") => CellType::Error,
            Some("inlineStr") => CellType::InlineString,
            Some("s") => CellType::SharedString,
            Some("str") => CellType::FormulaString,
            Some(other) => CellType::Other(other.to_string()),
        }
    }
}

impl CellRecord {
    /// Attach a read cell to a worksheet, splitting shared-string references
    /// from inline values.
    pub fn from_info(worksheet: u32, column: u32, info: CellInfo) -> Self {
        let shared_ref = CellType::from_tag(info.cell_type.as_deref()) == CellType::SharedString;
        let (value, shared) = if shared_ref {
            let shared = info.raw_value.as_deref().and_then(|raw| {
                let parsed = raw.trim().parse::<i64>().ok();
                if parsed.is_none() {
                    log::warn!(
                        "shared string reference {:?} at {}{} is not an integer",
                        raw,
                        info.column,
                        info.row
                    );
                }
                parsed
            });
            (None, shared)
        } else {
            (info.raw_value, None)
        };

        Self {
            worksheet,
            column,
            row: info.row,
            cell_type: info.cell_type,
            style_id: info.style_id,
            value,
            shared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(cell_type: Option<&str>, raw: Option<&str>) -> CellInfo {
        CellInfo {
            column: "B".to_string(),
            row: 4,
            cell_type: cell_type.map(String::from),
            style_id: Some(2),
            raw_value: raw.map(String::from),
        }
    }

    #[test]
    fn test_cell_type_tags() {
        assert_eq!(CellType::from_tag(None), CellType::Number);
        assert_eq!(CellType::from_tag(Some("n")), CellType::Number);
        assert_eq!(CellType::from_tag(Some("s")), CellType::SharedString);
        assert_eq!(CellType::from_tag(Some("str")), CellType::FormulaString);
        assert_eq!(
            CellType::from_tag(Some("x")),
            CellType::Other("x".to_string())
        );
    }

    #[test]
    fn test_shared_reference_split() {
        let record = CellRecord::from_info(1, 2, info(Some("s"), Some("7")));
        assert_eq!(record.shared, Some(7));
        assert_eq!(record.value, None);

        let record = CellRecord::from_info(1, 2, info(None, Some("7")));
        assert_eq!(record.shared, None);
        assert_eq!(record.value.as_deref(), Some("7"));
        assert_eq!(record.style_id, Some(2));
    }

    #[test]
    fn test_bad_shared_reference_is_dropped() {
        let record = CellRecord::from_info(1, 2, info(Some("s"), Some("x")));
        assert_eq!(record.shared, None);
        assert_eq!(record.value, None);
    }
}
