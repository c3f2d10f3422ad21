//! Streaming readers for the xlsx parts.
//!
//! Each reader wraps a forward-only [`XmlCursor`](crate::xml::XmlCursor)
//! over one part and yields one record per recognized element. Elements in
//! unexpected places are scanned past. Once a reader reports the end of its
//! stream it keeps doing so; reading the part again takes a fresh stream
//! passed to `reset`.

/// Implement `Iterator` for a reader in terms of [`PartReader::advance`].
macro_rules! impl_record_iterator {
    ($reader:ident) => {
        impl<R: std::io::BufRead> Iterator for $reader<R> {
            type Item = $crate::error::Result<<Self as $crate::reader::PartReader>::Record>;

            fn next(&mut self) -> Option<Self::Item> {
                <Self as $crate::reader::PartReader>::advance(self).transpose()
            }
        }
    };
}

pub(crate) use impl_record_iterator;

mod shared_strings;
mod styles;
mod workbook;
mod worksheet;

pub use shared_strings::SharedStringsReader;
pub use styles::StylesReader;
pub use workbook::WorkbookReader;
pub use worksheet::{parse_cell_reference, WorksheetReader};

use crate::error::Result;

/// A pull-based reader producing one record at a time.
pub trait PartReader {
    /// The record produced for each recognized element.
    type Record;

    /// Produce the next record, or `None` once the part is exhausted.
    fn advance(&mut self) -> Result<Option<Self::Record>>;
}

/// Latch a reader as finished when it hits the end of its stream or fails,
/// so later calls report exhaustion instead of reading a broken cursor.
fn latch<T>(done: &mut bool, result: Result<Option<T>>) -> Result<Option<T>> {
    if !matches!(result, Ok(Some(_))) {
        *done = true;
    }
    result
}

/// Parse an integer attribute, logging and discarding malformed values.
fn parse_attribute<T: std::str::FromStr>(element: &str, name: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse::<T>().ok();
    if parsed.is_none() {
        log::warn!("ignoring malformed {}@{} value {:?}", element, name, raw);
    }
    parsed
}
