//! Workbook handle.

use crate::container::{
    default_worksheet_part, Container, PartSource, Relationships, SHARED_STRINGS_PART,
    STYLES_PART, WORKBOOK_PART,
};
use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::model::{WorksheetInfo, WorksheetRecord};
use crate::options::OpenOptions;
use crate::reader::{SharedStringsReader, StylesReader, WorkbookReader, WorksheetReader};
use crate::store::Store;
use crate::worksheet::Worksheet;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

/// Which parts have been imported into the staging store.
#[derive(Debug, Default)]
struct Materialized {
    styles: bool,
    strings: bool,
    sheets: HashSet<u32>,
}

/// An open xlsx workbook.
///
/// Opening reads only the worksheet listing. Styles, shared strings and a
/// worksheet's cells are imported into the staging store the first time a
/// worksheet is requested, each at most once per handle.
///
/// # Example
///
/// ```no_run
/// use xlstage::Workbook;
///
/// let workbook = Workbook::open("report.xlsx")?;
/// let sheet = workbook.worksheet_by_name("First")?;
/// println!("{}", sheet.cell("C", 2)?);
/// # Ok::<(), xlstage::Error>(())
/// ```
pub struct Workbook {
    store: Store,
    decoder: Decoder,
    source: Box<dyn PartSource>,
    state: RefCell<Materialized>,
}

impl Workbook {
    /// Open a workbook file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, OpenOptions::default())
    }

    /// Open a workbook file.
    pub fn open_with_options(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let container = Container::open(path.as_ref())?;
        Self::from_source(container, options)
    }

    /// Open an in-memory workbook.
    pub fn from_bytes(data: Vec<u8>, options: OpenOptions) -> Result<Self> {
        Self::from_source(Container::from_bytes(data)?, options)
    }

    /// Open a workbook from any part source.
    pub fn from_source(source: impl PartSource + 'static, options: OpenOptions) -> Result<Self> {
        let store = Store::open(&options)?;

        let rels = if options.resolve_relationships {
            Relationships::for_workbook(&source)?
        } else {
            Relationships::new()
        };

        let mut count = 0;
        source.read_part(WORKBOOK_PART, &mut |stream: &mut dyn BufRead| {
            let records = WorkbookReader::new(stream).map(|info| info.map(|i| locate(i, &rels)));
            count = store.import_worksheets(records)?;
            Ok(())
        })?;
        log::debug!("opened workbook with {} worksheets", count);

        Ok(Self {
            store,
            decoder: Decoder::new(),
            source: Box::new(source),
            state: RefCell::new(Materialized::default()),
        })
    }

    /// Number of worksheets.
    pub fn count_worksheets(&self) -> Result<usize> {
        self.store.count_worksheets()
    }

    /// Check if a worksheet with this index exists.
    pub fn has_worksheet_index(&self, index: u32) -> Result<bool> {
        self.store.has_worksheet_index(index)
    }

    /// Check if a worksheet with this name exists.
    pub fn has_worksheet_name(&self, name: &str) -> Result<bool> {
        self.store.has_worksheet_name(name)
    }

    /// All worksheets in declaration order.
    pub fn list_worksheets(&self) -> Result<Vec<WorksheetRecord>> {
        self.store.list_worksheets()
    }

    /// Get a worksheet by index, importing it on first access.
    pub fn worksheet_by_index(&self, index: u32) -> Result<Worksheet<'_>> {
        let record = self
            .store
            .worksheet(index)?
            .ok_or_else(|| Error::NoSuchWorksheet(format!("index {}", index)))?;
        self.materialize(&record)?;
        Ok(Worksheet::new(&self.store, &self.decoder, record.index, record.name))
    }

    /// Get a worksheet by name, importing it on first access.
    pub fn worksheet_by_name(&self, name: &str) -> Result<Worksheet<'_>> {
        let index = self
            .store
            .worksheet_index(name)?
            .ok_or_else(|| Error::NoSuchWorksheet(name.to_string()))?;
        self.worksheet_by_index(index)
    }

    /// Iterate over every worksheet in declaration order, importing each as
    /// it is reached.
    pub fn worksheets(&self) -> Result<Worksheets<'_>> {
        Ok(Worksheets {
            workbook: self,
            records: self.store.list_worksheets()?.into_iter(),
        })
    }

    /// Whether a worksheet's cells have been imported.
    pub fn is_materialized(&self, index: u32) -> bool {
        self.state.borrow().sheets.contains(&index)
    }

    /// Directory holding the staging store, if it is file-backed.
    pub fn staging_path(&self) -> Option<&Path> {
        self.store.path()
    }

    /// Release the staging store and its temporary storage.
    pub fn close(self) -> Result<()> {
        let Workbook { store, .. } = self;
        store.close()
    }

    fn materialize(&self, record: &WorksheetRecord) -> Result<()> {
        if !self.state.borrow().styles {
            self.import_optional(STYLES_PART, |stream| {
                self.store.import_styles(StylesReader::new(stream))?;
                Ok(())
            })?;
            self.state.borrow_mut().styles = true;
        }

        if !self.state.borrow().strings {
            self.import_optional(SHARED_STRINGS_PART, |stream| {
                self.store.import_strings(SharedStringsReader::new(stream))?;
                Ok(())
            })?;
            self.state.borrow_mut().strings = true;
        }

        if self.state.borrow().sheets.contains(&record.index) {
            return Ok(());
        }

        let part = record
            .part
            .clone()
            .unwrap_or_else(|| default_worksheet_part(record.index));
        self.source
            .read_part(&part, &mut |stream: &mut dyn BufRead| {
                self.store
                    .import_cells(record.index, WorksheetReader::new(stream))?;
                Ok(())
            })?;
        self.state.borrow_mut().sheets.insert(record.index);

        Ok(())
    }

    fn import_optional<F>(&self, part: &str, mut import: F) -> Result<()>
    where
        F: FnMut(&mut dyn BufRead) -> Result<()>,
    {
        if !self.source.has_part(part) {
            log::debug!("{} not present, nothing to import", part);
            return Ok(());
        }
        self.source.read_part(part, &mut import)
    }
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("store", &self.store)
            .field("state", &self.state.borrow())
            .finish()
    }
}

/// Attach the archive path of a worksheet part to a manifest entry.
fn locate(info: WorksheetInfo, rels: &Relationships) -> WorksheetRecord {
    let part = info
        .relationship_id
        .as_deref()
        .and_then(|id| rels.resolve_target(WORKBOOK_PART, id))
        .unwrap_or_else(|| default_worksheet_part(info.index));

    WorksheetRecord {
        index: info.index,
        name: info.name,
        part: Some(part),
    }
}

/// Iterator over the worksheets of a workbook.
pub struct Worksheets<'wb> {
    workbook: &'wb Workbook,
    records: std::vec::IntoIter<WorksheetRecord>,
}

impl<'wb> Iterator for Worksheets<'wb> {
    type Item = Result<Worksheet<'wb>>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(self.workbook.worksheet_by_index(record.index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_uses_relationships() {
        let rels = Relationships::parse(
            r#"<Relationships><Relationship Id="rId4" Target="worksheets/data.xml"/></Relationships>"#
                .as_bytes(),
        )
        .unwrap();

        let located = locate(
            WorksheetInfo {
                index: 2,
                name: "Data".into(),
                relationship_id: Some("rId4".into()),
            },
            &rels,
        );
        assert_eq!(located.part.as_deref(), Some("xl/worksheets/data.xml"));

        let fallback = locate(
            WorksheetInfo {
                index: 5,
                name: "Other".into(),
                relationship_id: Some("rId9".into()),
            },
            &rels,
        );
        assert_eq!(fallback.part.as_deref(), Some("xl/worksheets/sheet5.xml"));
    }
}
