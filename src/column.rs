//! Conversion between spreadsheet column names and 1-based indices.
//!
//! Column names are bijective base-26 numerals: `A` is 1, `Z` is 26 and
//! `AA` is 27. There is no zero digit.

use crate::error::{Error, Result};

/// Convert a column name such as `"C"` or `"aa"` into its 1-based index.
///
/// Letters are case-insensitive. Anything that is not an ASCII letter, an
/// empty name, or a name too large for `u32` is rejected.
///
/// ```
/// assert_eq!(xlstage::column::to_index("A").unwrap(), 1);
/// assert_eq!(xlstage::column::to_index("AA").unwrap(), 27);
/// ```
pub fn to_index(name: &str) -> Result<u32> {
    if name.is_empty() {
        return Err(Error::InvalidColumn(name.to_string()));
    }

    let mut index: u32 = 0;
    for b in name.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(Error::InvalidColumn(name.to_string()));
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| Error::InvalidColumn(name.to_string()))?;
    }

    Ok(index)
}

/// Convert a 1-based column index into its name. Zero yields an empty string.
///
/// ```
/// assert_eq!(xlstage::column::to_name(28), "AB");
/// ```
pub fn to_name(index: u32) -> String {
    let mut letters = Vec::new();
    let mut index = index;

    while index > 0 {
        let digit = (index - 1) % 26;
        // digit < 26, so the cast cannot truncate
        letters.push(char::from(b'A' + digit as u8));
        index = (index - 1 - digit) / 26;
    }

    letters.iter().rev().collect()
}
