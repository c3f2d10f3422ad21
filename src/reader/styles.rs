//! Styles reader (`xl/styles.xml`).
//!
//! Number formats and cell formats come out of a single pass. Cell format
//! ids are positions in `cellXfs`, which is what a cell's `s` attribute
//! refers to, so every `xf` advances the counter even when its attributes
//! are unusable.

use super::{impl_record_iterator, latch, parse_attribute, PartReader};
use crate::error::Result;
use crate::model::{CellStyle, NumberFormat, StyleRecord};
use crate::xml::XmlCursor;
use std::io::BufRead;

const NUM_FMT_PATH: &str = "/styleSheet/numFmts/numFmt";
const XF_PATH: &str = "/styleSheet/cellXfs/xf";

/// Yields [`StyleRecord`]s in document order.
pub struct StylesReader<R: BufRead> {
    cursor: XmlCursor<R>,
    next_xf: u32,
    done: bool,
}

impl<R: BufRead> StylesReader<R> {
    /// Create a reader over a styles stream.
    pub fn new(stream: R) -> Self {
        Self {
            cursor: XmlCursor::new(stream),
            next_xf: 0,
            done: false,
        }
    }

    /// Discard the current cursor and start over on a fresh stream.
    pub fn reset(&mut self, stream: R) {
        *self = Self::new(stream);
    }

    fn scan(&mut self) -> Result<Option<StyleRecord>> {
        while let Some(e) = self.cursor.advance_to(|e, path| {
            (e.local_name() == "numFmt" && path == NUM_FMT_PATH)
                || (e.local_name() == "xf" && path == XF_PATH)
        })? {
            if e.local_name() == "xf" {
                let id = self.next_xf;
                self.next_xf += 1;

                let number_format_id = e
                    .attribute("numFmtId")
                    .and_then(|raw| parse_attribute::<u32>("xf", "numFmtId", raw))
                    .unwrap_or(0);
                let applies_number_format =
                    matches!(e.attribute("applyNumberFormat"), Some("1" | "true"));

                return Ok(Some(StyleRecord::CellStyle(CellStyle {
                    id,
                    applies_number_format,
                    number_format_id,
                })));
            }

            let id = e
                .attribute("numFmtId")
                .and_then(|raw| parse_attribute::<u32>("numFmt", "numFmtId", raw));
            match (id, e.attribute("formatCode")) {
                (Some(id), Some(code)) => {
                    return Ok(Some(StyleRecord::NumberFormat(NumberFormat {
                        id,
                        code: code.to_string(),
                    })));
                }
                _ => log::warn!("skipping numFmt without numFmtId or formatCode"),
            }
        }

        Ok(None)
    }
}

impl<R: BufRead> PartReader for StylesReader<R> {
    type Record = StyleRecord;

    fn advance(&mut self) -> Result<Option<StyleRecord>> {
        if self.done {
            return Ok(None);
        }
        let result = self.scan();
        latch(&mut self.done, result)
    }
}

impl_record_iterator!(StylesReader);
