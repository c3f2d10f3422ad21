use super::Store;
use crate::error::Result;
use crate::model::SharedString;

const INSERT: &str = "INSERT INTO strings (\"index\", string) VALUES (?1, ?2)";
const BY_INDEX: &str = "SELECT string FROM strings WHERE \"index\" = ?1";
const COUNT: &str = "SELECT COUNT(*) FROM strings";

impl Store {
    /// Import shared strings in one transaction.
    pub fn import_strings<I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<SharedString>>,
    {
        let count = self.transactional(|store| {
            let mut insert = store.acquire(INSERT)?;
            let mut count = 0usize;
            for record in records {
                let record = record?;
                insert.execute(&[&record.index, &record.text])?;
                count += 1;
            }
            Ok(count)
        })?;

        log::debug!("imported {} shared strings", count);
        Ok(count)
    }

    /// Get a shared string by position.
    pub fn shared_string(&self, index: u32) -> Result<Option<String>> {
        self.acquire(BY_INDEX)?
            .query_optional(&[&index], |row| row.get(0))
    }

    /// Number of shared strings.
    pub fn count_strings(&self) -> Result<usize> {
        let count: i64 = self.acquire(COUNT)?.query_one(&[], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::model::SharedString;
    use crate::options::OpenOptions;
    use crate::store::Store;

    fn item(index: u32, text: &str) -> crate::error::Result<SharedString> {
        Ok(SharedString {
            index,
            text: text.to_string(),
        })
    }

    #[test]
    fn test_import_and_lookup() {
        let store = Store::open(&OpenOptions::new().with_in_memory(true)).unwrap();
        store
            .import_strings(vec![item(0, "zero"), item(1, ""), item(2, "two")])
            .unwrap();

        assert_eq!(store.count_strings().unwrap(), 3);
        assert_eq!(store.shared_string(1).unwrap().as_deref(), Some(""));
        assert_eq!(store.shared_string(2).unwrap().as_deref(), Some("two"));
        assert_eq!(store.shared_string(3).unwrap(), None);
    }

    #[test]
    fn test_failed_stream_leaves_table_empty() {
        let store = Store::open(&OpenOptions::new().with_in_memory(true)).unwrap();
        let records = vec![
            item(0, "zero"),
            item(1, "one"),
            Err(Error::XmlParse("unexpected end of stream".to_string())),
        ];

        assert!(matches!(
            store.import_strings(records),
            Err(Error::XmlParse(_))
        ));
        assert_eq!(store.count_strings().unwrap(), 0);
    }
}
