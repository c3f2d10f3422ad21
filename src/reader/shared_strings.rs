//! Shared strings reader (`xl/sharedStrings.xml`).

use super::{impl_record_iterator, latch, PartReader};
use crate::error::Result;
use crate::model::SharedString;
use crate::xml::XmlCursor;
use std::io::BufRead;

const ITEM_PATH: &str = "/sst/si";

/// Yields one [`SharedString`] per `si`, with rich-text runs flattened.
pub struct SharedStringsReader<R: BufRead> {
    cursor: XmlCursor<R>,
    next_index: u32,
    done: bool,
}

impl<R: BufRead> SharedStringsReader<R> {
    /// Create a reader over a shared strings stream.
    pub fn new(stream: R) -> Self {
        Self {
            cursor: XmlCursor::new(stream),
            next_index: 0,
            done: false,
        }
    }

    /// Discard the current cursor and start over on a fresh stream.
    pub fn reset(&mut self, stream: R) {
        *self = Self::new(stream);
    }

    fn scan(&mut self) -> Result<Option<SharedString>> {
        let Some(item) = self
            .cursor
            .advance_to(|e, path| e.local_name() == "si" && path == ITEM_PATH)?
        else {
            return Ok(None);
        };

        let text = self.cursor.read_text_content(&item)?.unwrap_or_default();
        let index = self.next_index;
        self.next_index += 1;

        Ok(Some(SharedString { index, text }))
    }
}

impl<R: BufRead> PartReader for SharedStringsReader<R> {
    type Record = SharedString;

    fn advance(&mut self) -> Result<Option<SharedString>> {
        if self.done {
            return Ok(None);
        }
        let result = self.scan();
        latch(&mut self.done, result)
    }
}

impl_record_iterator!(SharedStringsReader);
