//! Workbook manifest reader (`xl/workbook.xml`).

use super::{impl_record_iterator, latch, parse_attribute, PartReader};
use crate::error::Result;
use crate::model::WorksheetInfo;
use crate::xml::XmlCursor;
use std::io::BufRead;

const SHEET_PATH: &str = "/workbook/sheets/sheet";

/// Yields one [`WorksheetInfo`] per `sheet` declared in the manifest, in
/// declaration order.
pub struct WorkbookReader<R: BufRead> {
    cursor: XmlCursor<R>,
    done: bool,
}

impl<R: BufRead> WorkbookReader<R> {
    /// Create a reader over a manifest stream.
    pub fn new(stream: R) -> Self {
        Self {
            cursor: XmlCursor::new(stream),
            done: false,
        }
    }

    /// Discard the current cursor and start over on a fresh stream.
    pub fn reset(&mut self, stream: R) {
        *self = Self::new(stream);
    }

    fn scan(&mut self) -> Result<Option<WorksheetInfo>> {
        while let Some(sheet) = self
            .cursor
            .advance_to(|e, path| e.local_name() == "sheet" && path == SHEET_PATH)?
        {
            let name = sheet.attribute("name").unwrap_or_default();
            let index = sheet
                .attribute("sheetId")
                .and_then(|raw| parse_attribute::<u32>("sheet", "sheetId", raw));

            let Some(index) = index else {
                log::warn!("skipping sheet {:?} without a usable sheetId", name);
                continue;
            };

            return Ok(Some(WorksheetInfo {
                index,
                name: name.to_string(),
                relationship_id: sheet.attribute_local("id").map(String::from),
            }));
        }

        Ok(None)
    }
}

impl<R: BufRead> PartReader for WorkbookReader<R> {
    type Record = WorksheetInfo;

    fn advance(&mut self) -> Result<Option<WorksheetInfo>> {
        if self.done {
            return Ok(None);
        }
        let result = self.scan();
        latch(&mut self.done, result)
    }
}

impl_record_iterator!(WorkbookReader);

#[cfg(test)]
mod tests {
    use super::*;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <bookViews><workbookView activeTab="0"/></bookViews>
  <sheets>
    <sheet name="First" sheetId="1" r:id="rId1"/>
    <sheet name="Broken" r:id="rId2"/>
    <sheet name="Third" sheetId="7" r:id="rId3"/>
  </sheets>
  <definedNames><definedName name="sheet">First!$A$1</definedName></definedNames>
</workbook>"#;

    #[test]
    fn test_reads_sheets_in_order() {
        let sheets: Vec<_> = WorkbookReader::new(WORKBOOK.as_bytes())
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            sheets,
            vec![
                WorksheetInfo {
                    index: 1,
                    name: "First".to_string(),
                    relationship_id: Some("rId1".to_string()),
                },
                WorksheetInfo {
                    index: 7,
                    name: "Third".to_string(),
                    relationship_id: Some("rId3".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_exhaustion_is_idempotent() {
        let mut reader = WorkbookReader::new(WORKBOOK.as_bytes());
        assert!(reader.advance().unwrap().is_some());
        assert!(reader.advance().unwrap().is_some());
        assert!(reader.advance().unwrap().is_none());
        assert!(reader.advance().unwrap().is_none());

        reader.reset(WORKBOOK.as_bytes());
        assert_eq!(reader.advance().unwrap().unwrap().name, "First");
    }

    #[test]
    fn test_sheet_outside_sheets_is_ignored() {
        let xml = r#"<workbook><sheet name="Stray" sheetId="3"/><sheets/></workbook>"#;
        assert_eq!(WorkbookReader::new(xml.as_bytes()).count(), 0);
    }
}
