use super::Store;
use crate::error::Result;

/// Number formats every workbook has without declaring them.
pub const BUILTIN_FORMATS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

const SCHEMA: &str = r#"
    CREATE TABLE worksheets (
      "index" INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE,
      part TEXT,
      position INTEGER NOT NULL
    );

    CREATE TABLE strings (
      "index" INTEGER PRIMARY KEY,
      string TEXT NOT NULL
    );

    CREATE TABLE formats (
      id INTEGER PRIMARY KEY,
      format TEXT NOT NULL
    );

    CREATE TABLE styles (
      id INTEGER PRIMARY KEY,
      applies_number_format INTEGER NOT NULL,
      number_format INTEGER NOT NULL
    );

    CREATE TABLE cells (
      worksheet INTEGER NOT NULL REFERENCES worksheets("index"),
      col INTEGER NOT NULL,
      row INTEGER NOT NULL,
      type TEXT,
      style INTEGER,
      value TEXT,
      shared INTEGER,
      PRIMARY KEY (worksheet, col, row)
    ) WITHOUT ROWID;

    CREATE INDEX cells_by_row ON cells(worksheet, row, col);
"#;

const SEED_FORMAT: &str = "INSERT INTO formats (id, format) VALUES (?1, ?2)";

pub(super) fn create(store: &Store) -> Result<()> {
    store.execute_schema(SCHEMA)?;

    store.transactional(|store| {
        let mut seed = store.acquire(SEED_FORMAT)?;
        for (id, code) in BUILTIN_FORMATS {
            seed.execute(&[id, code])?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use crate::options::OpenOptions;
    use crate::store::Store;

    #[test]
    fn test_builtin_formats_seeded() {
        let store = Store::open(&OpenOptions::new().with_in_memory(true)).unwrap();
        assert_eq!(store.format(14).unwrap().as_deref(), Some("mm-dd-yy"));
        assert_eq!(store.format(49).unwrap().as_deref(), Some("@"));
        assert_eq!(store.format(5).unwrap(), None);
        assert_eq!(store.format(164).unwrap(), None);
    }
}
