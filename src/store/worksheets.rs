use super::Store;
use crate::error::Result;
use crate::model::WorksheetRecord;

const INSERT: &str =
    "INSERT INTO worksheets (\"index\", name, part, position) VALUES (?1, ?2, ?3, ?4)";
const BY_INDEX: &str = "SELECT \"index\", name, part FROM worksheets WHERE \"index\" = ?1";
const INDEX_BY_NAME: &str = "SELECT \"index\" FROM worksheets WHERE name = ?1";
const LIST: &str = "SELECT \"index\", name, part FROM worksheets ORDER BY position";
const COUNT: &str = "SELECT COUNT(*) FROM worksheets";

fn worksheet_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorksheetRecord> {
    Ok(WorksheetRecord {
        index: row.get(0)?,
        name: row.get(1)?,
        part: row.get(2)?,
    })
}

impl Store {
    /// Import the worksheet listing in one transaction, keeping declaration
    /// order. Duplicate indices or names fail the whole import.
    pub fn import_worksheets<I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<WorksheetRecord>>,
    {
        let count = self.transactional(|store| {
            let mut insert = store.acquire(INSERT)?;
            let mut position: i64 = 0;
            for record in records {
                let record = record?;
                insert.execute(&[&record.index, &record.name, &record.part, &position])?;
                position += 1;
            }
            Ok(position)
        })?;

        log::debug!("imported {} worksheets", count);
        Ok(count as usize)
    }

    /// Look a worksheet up by index.
    pub fn worksheet(&self, index: u32) -> Result<Option<WorksheetRecord>> {
        self.acquire(BY_INDEX)?
            .query_optional(&[&index], worksheet_record)
    }

    /// Map a worksheet name to its index.
    pub fn worksheet_index(&self, name: &str) -> Result<Option<u32>> {
        self.acquire(INDEX_BY_NAME)?
            .query_optional(&[&name], |row| row.get(0))
    }

    /// Map a worksheet index to its name.
    pub fn worksheet_name(&self, index: u32) -> Result<Option<String>> {
        Ok(self.worksheet(index)?.map(|record| record.name))
    }

    /// Check if a worksheet with this index exists.
    pub fn has_worksheet_index(&self, index: u32) -> Result<bool> {
        Ok(self.worksheet(index)?.is_some())
    }

    /// Check if a worksheet with this name exists.
    pub fn has_worksheet_name(&self, name: &str) -> Result<bool> {
        Ok(self.worksheet_index(name)?.is_some())
    }

    /// All worksheets in declaration order.
    pub fn list_worksheets(&self) -> Result<Vec<WorksheetRecord>> {
        self.acquire(LIST)?.query_all(&[], worksheet_record)
    }

    /// Number of worksheets.
    pub fn count_worksheets(&self) -> Result<usize> {
        let count: i64 = self.acquire(COUNT)?.query_one(&[], |row| row.get(0))?;
        Ok(count as usize)
    }
}
