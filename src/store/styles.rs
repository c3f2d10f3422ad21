use super::Store;
use crate::error::Result;
use crate::model::{CellStyle, StyleRecord};

// A declared format replaces a built-in one with the same id.
const UPSERT_FORMAT: &str = "INSERT INTO formats (id, format) VALUES (?1, ?2) \
     ON CONFLICT(id) DO UPDATE SET format = excluded.format";
const INSERT_STYLE: &str =
    "INSERT INTO styles (id, applies_number_format, number_format) VALUES (?1, ?2, ?3)";
const FORMAT_BY_ID: &str = "SELECT format FROM formats WHERE id = ?1";
const STYLE_BY_ID: &str =
    "SELECT id, applies_number_format, number_format FROM styles WHERE id = ?1";
const COUNT_STYLES: &str = "SELECT COUNT(*) FROM styles";

impl Store {
    /// Import number formats and cell styles in one transaction.
    pub fn import_styles<I>(&self, records: I) -> Result<(usize, usize)>
    where
        I: IntoIterator<Item = Result<StyleRecord>>,
    {
        let counts = self.transactional(|store| {
            let mut formats = store.acquire(UPSERT_FORMAT)?;
            let mut styles = store.acquire(INSERT_STYLE)?;
            let (mut format_count, mut style_count) = (0usize, 0usize);

            for record in records {
                match record? {
                    StyleRecord::NumberFormat(format) => {
                        formats.execute(&[&format.id, &format.code])?;
                        format_count += 1;
                    }
                    StyleRecord::CellStyle(style) => {
                        styles.execute(&[
                            &style.id,
                            &style.applies_number_format,
                            &style.number_format_id,
                        ])?;
                        style_count += 1;
                    }
                }
            }
            Ok((format_count, style_count))
        })?;

        log::debug!(
            "imported {} number formats and {} cell styles",
            counts.0,
            counts.1
        );
        Ok(counts)
    }

    /// Get a number format code by id.
    pub fn format(&self, id: u32) -> Result<Option<String>> {
        self.acquire(FORMAT_BY_ID)?
            .query_optional(&[&id], |row| row.get(0))
    }

    /// Get a cell style by id.
    pub fn style(&self, id: u32) -> Result<Option<CellStyle>> {
        self.acquire(STYLE_BY_ID)?.query_optional(&[&id], |row| {
            Ok(CellStyle {
                id: row.get(0)?,
                applies_number_format: row.get(1)?,
                number_format_id: row.get(2)?,
            })
        })
    }

    /// Number of cell styles.
    pub fn count_styles(&self) -> Result<usize> {
        let count: i64 = self.acquire(COUNT_STYLES)?.query_one(&[], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{CellStyle, NumberFormat, StyleRecord};
    use crate::options::OpenOptions;
    use crate::store::Store;

    #[test]
    fn test_import_styles() {
        let store = Store::open(&OpenOptions::new().with_in_memory(true)).unwrap();
        let records = vec![
            Ok(StyleRecord::NumberFormat(NumberFormat {
                id: 164,
                code: "yyyy-mm-dd".into(),
            })),
            Ok(StyleRecord::NumberFormat(NumberFormat {
                id: 14,
                code: "dd/mm/yyyy".into(),
            })),
            Ok(StyleRecord::CellStyle(CellStyle {
                id: 0,
                applies_number_format: false,
                number_format_id: 0,
            })),
            Ok(StyleRecord::CellStyle(CellStyle {
                id: 1,
                applies_number_format: true,
                number_format_id: 164,
            })),
        ];

        assert_eq!(store.import_styles(records).unwrap(), (2, 2));
        assert_eq!(store.format(164).unwrap().as_deref(), Some("yyyy-mm-dd"));
        assert_eq!(store.format(14).unwrap().as_deref(), Some("dd/mm/yyyy"));
        assert_eq!(store.format(22).unwrap().as_deref(), Some("m/d/yy h:mm"));
        assert_eq!(store.count_styles().unwrap(), 2);
        assert_eq!(
            store.style(1).unwrap(),
            Some(CellStyle {
                id: 1,
                applies_number_format: true,
                number_format_id: 164,
            })
        );
        assert_eq!(store.style(2).unwrap(), None);
    }
}
