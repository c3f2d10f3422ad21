//! # xlstage
//!
//! Read xlsx workbooks through a disposable SQLite staging store.
//!
//! Opening a workbook reads only its worksheet listing. The first time a
//! worksheet is requested, its cells (and, once per workbook, the styles and
//! shared strings) are streamed out of the archive into the staging store.
//! Queries then run against the store and decode raw cell text into typed
//! [`Value`]s, turning date-formatted serial numbers into dates and times.
//!
//! ## Quick Start
//!
//! ```no_run
//! use xlstage::Workbook;
//!
//! let workbook = Workbook::open("report.xlsx")?;
//! for sheet in workbook.list_worksheets()? {
//!     println!("{}: {}", sheet.index, sheet.name);
//! }
//!
//! let sheet = workbook.worksheet_by_name("First")?;
//! let header = sheet.row(1)?;
//! println!("{:?}", header.columns().collect::<Vec<_>>());
//!
//! for row in sheet.rows()? {
//!     let row = row?;
//!     println!("{}: {:?}", row.number, row.get("C"));
//! }
//! # Ok::<(), xlstage::Error>(())
//! ```
//!
//! ## Options
//!
//! ```no_run
//! use xlstage::{OpenOptions, Workbook};
//!
//! let options = OpenOptions::new()
//!     .with_in_memory(true)
//!     .with_batch_size(1024);
//! let workbook = Workbook::open_with_options("report.xlsx", options)?;
//! # Ok::<(), xlstage::Error>(())
//! ```
//!
//! The library logs through the `log` facade and installs no logger.

pub mod column;
pub mod container;
pub mod decoder;
pub mod error;
pub mod model;
pub mod options;
pub mod reader;
pub mod store;
pub mod workbook;
pub mod worksheet;
pub mod xml;

// Re-exports
pub use container::{Container, PartSource};
pub use decoder::{Decoder, Value};
pub use error::{Error, Result};
pub use model::WorksheetRecord;
pub use options::{OpenOptions, StagingMode};
pub use workbook::{Workbook, Worksheets};
pub use worksheet::{ColumnIter, Row, RowIter, Worksheet};

use std::path::Path;

/// Open a workbook and list its worksheets.
///
/// # Example
///
/// ```no_run
/// let sheets = xlstage::list_worksheets("report.xlsx")?;
/// println!("{} worksheets", sheets.len());
/// # Ok::<(), xlstage::Error>(())
/// ```
pub fn list_worksheets(path: impl AsRef<Path>) -> Result<Vec<WorksheetRecord>> {
    let workbook = Workbook::open(path)?;
    let sheets = workbook.list_worksheets()?;
    workbook.close()?;
    Ok(sheets)
}

/// Read every row of a worksheet by name.
///
/// # Example
///
/// ```no_run
/// let rows = xlstage::read_rows("report.xlsx", "First")?;
/// # Ok::<(), xlstage::Error>(())
/// ```
pub fn read_rows(path: impl AsRef<Path>, worksheet: &str) -> Result<Vec<Row>> {
    let workbook = Workbook::open(path)?;
    let rows = workbook
        .worksheet_by_name(worksheet)?
        .rows()?
        .collect::<Result<Vec<_>>>()?;
    workbook.close()?;
    Ok(rows)
}
