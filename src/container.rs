//! ZIP container abstraction for xlsx packages.

use crate::error::{Error, Result};
use crate::xml::{Node, XmlCursor};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek};
use std::path::Path;

/// Archive path of the workbook manifest.
pub const WORKBOOK_PART: &str = "xl/workbook.xml";
/// Archive path of the styles part.
pub const STYLES_PART: &str = "xl/styles.xml";
/// Archive path of the shared strings part.
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
/// Archive path of the workbook relationships.
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Conventional location of a worksheet part when relationships are
/// unavailable.
pub fn default_worksheet_part(index: u32) -> String {
    format!("xl/worksheets/sheet{}.xml", index)
}

/// Anything that can be opened as a ZIP archive.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// A source of named package parts.
///
/// Parts are handed to a visitor as a buffered stream that lives only for
/// the duration of the call, so an implementation can stream straight out
/// of the archive without buffering whole parts in memory.
pub trait PartSource {
    /// Stream the part at `path` into `visit`.
    ///
    /// Fails with [`Error::MissingComponent`] when the part does not exist.
    fn read_part(&self, path: &str, visit: &mut dyn FnMut(&mut dyn BufRead) -> Result<()>)
        -> Result<()>;

    /// Check if a part exists.
    fn has_part(&self, path: &str) -> bool;
}

/// A relationship entry from a .rels part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path, relative to the source part unless it starts with `/`
    pub target: String,
    /// Whether the target is external
    pub external: bool,
}

/// Collection of relationships parsed from a .rels part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    by_id: HashMap<String, Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a .rels stream.
    pub fn parse<R: BufRead>(stream: R) -> Result<Self> {
        let mut rels = Relationships::new();
        let mut cursor = XmlCursor::new(stream);

        while let Some(node) = cursor.next_node()? {
            let Node::Start(e) = node else { continue };
            if e.local_name() != "Relationship" {
                continue;
            }

            let id = e.attribute("Id").unwrap_or_default();
            if id.is_empty() {
                continue;
            }

            rels.add(Relationship {
                id: id.to_string(),
                rel_type: e.attribute("Type").unwrap_or_default().to_string(),
                target: e.attribute("Target").unwrap_or_default().to_string(),
                external: e
                    .attribute("TargetMode")
                    .is_some_and(|mode| mode.eq_ignore_ascii_case("external")),
            });
        }

        Ok(rels)
    }

    /// Read the relationships of the workbook part. A missing .rels part
    /// yields an empty collection.
    pub fn for_workbook(source: &dyn PartSource) -> Result<Self> {
        if !source.has_part(WORKBOOK_RELS_PART) {
            return Ok(Self::new());
        }

        let mut rels = None;
        source.read_part(WORKBOOK_RELS_PART, &mut |stream: &mut dyn BufRead| {
            rels = Some(Self::parse(stream)?);
            Ok(())
        })?;
        Ok(rels.unwrap_or_default())
    }

    /// Get a relationship by ID.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    /// Add a relationship.
    pub fn add(&mut self, rel: Relationship) {
        self.by_id.insert(rel.id.clone(), rel);
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Archive path of the internal target of `id`, resolved against the
    /// part owning these relationships.
    pub fn resolve_target(&self, base: &str, id: &str) -> Option<String> {
        self.get(id)
            .filter(|rel| !rel.external && !rel.target.is_empty())
            .map(|rel| resolve_path(base, &rel.target))
    }
}

/// Resolve a relative path from a base part path.
pub fn resolve_path(base: &str, relative: &str) -> String {
    if let Some(stripped) = relative.strip_prefix('/') {
        return stripped.to_string();
    }

    let base_dir = Path::new(base).parent().unwrap_or(Path::new(""));

    let mut result = base_dir.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            std::path::Component::ParentDir => {
                result.pop();
            }
            std::path::Component::Normal(c) => {
                result.push(c);
            }
            _ => {}
        }
    }

    result.to_string_lossy().replace('\\', "/")
}

/// An xlsx package backed by a ZIP archive.
///
/// The archive keeps the underlying file open until the container is
/// dropped; parts are decompressed on demand as they are streamed.
pub struct Container {
    archive: RefCell<zip::ZipArchive<Box<dyn ReadSeek>>>,
}

impl Container {
    /// Open a package from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use xlstage::container::Container;
    ///
    /// let container = Container::open("data.xlsx")?;
    /// assert!(container.exists("xl/workbook.xml"));
    /// # Ok::<(), xlstage::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Create a container from an in-memory package.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    /// Create a container from any seekable reader.
    pub fn from_reader<R: Read + Seek + 'static>(reader: R) -> Result<Self> {
        let boxed: Box<dyn ReadSeek> = Box::new(reader);
        let archive = zip::ZipArchive::new(boxed)?;
        Ok(Self {
            archive: RefCell::new(archive),
        })
    }

    /// Check if a file exists in the archive.
    pub fn exists(&self, path: &str) -> bool {
        let archive = self.archive.borrow();
        let found = archive.file_names().any(|n| n == path);
        found
    }

    /// List all files in the archive.
    pub fn list_files(&self) -> Vec<String> {
        let archive = self.archive.borrow();
        archive.file_names().map(String::from).collect()
    }

    /// Read a whole part into memory.
    pub fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.read_part(path, &mut |stream: &mut dyn BufRead| {
            stream.read_to_end(&mut data)?;
            Ok(())
        })?;
        Ok(data)
    }
}

impl PartSource for Container {
    fn read_part(
        &self,
        path: &str,
        visit: &mut dyn FnMut(&mut dyn BufRead) -> Result<()>,
    ) -> Result<()> {
        let mut archive = self.archive.borrow_mut();
        let file = archive.by_name(path).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => Error::MissingComponent(path.to_string()),
            other => Error::from(other),
        })?;

        let mut stream = BufReader::new(file);
        visit(&mut stream)
    }

    fn has_part(&self, path: &str) -> bool {
        self.exists(path)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("files", &self.list_files().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/first.xml"/>
  <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            resolve_path("xl/worksheets/sheet1.xml", "../sharedStrings.xml"),
            "xl/sharedStrings.xml"
        );
        assert_eq!(
            resolve_path("xl/workbook.xml", "worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
        assert_eq!(
            resolve_path("xl/workbook.xml", "/xl/worksheets/sheet3.xml"),
            "xl/worksheets/sheet3.xml"
        );
    }

    #[test]
    fn test_parse_relationships() {
        let rels = Relationships::parse(RELS.as_bytes()).unwrap();
        assert_eq!(rels.len(), 4);
        assert_eq!(
            rels.resolve_target(WORKBOOK_PART, "rId2").as_deref(),
            Some("xl/worksheets/data.xml")
        );
        assert_eq!(
            rels.resolve_target(WORKBOOK_PART, "rId1").as_deref(),
            Some("xl/worksheets/first.xml")
        );
        assert!(rels.get("rId9").unwrap().external);
        assert_eq!(rels.resolve_target(WORKBOOK_PART, "rId9"), None);
        assert_eq!(rels.resolve_target(WORKBOOK_PART, "rId42"), None);
    }

    #[test]
    fn test_container_parts() {
        let data = package(&[(WORKBOOK_PART, "<workbook/>"), (WORKBOOK_RELS_PART, RELS)]);
        let container = Container::from_bytes(data).unwrap();

        assert!(container.exists(WORKBOOK_PART));
        assert!(!container.has_part(SHARED_STRINGS_PART));
        assert_eq!(container.list_files().len(), 2);
        assert_eq!(container.read_bytes(WORKBOOK_PART).unwrap(), b"<workbook/>");

        let rels = Relationships::for_workbook(&container).unwrap();
        assert_eq!(rels.len(), 4);
    }

    #[test]
    fn test_missing_part() {
        let container = Container::from_bytes(package(&[(WORKBOOK_PART, "<workbook/>")])).unwrap();
        let err = container.read_bytes(STYLES_PART).unwrap_err();
        assert!(matches!(err, Error::MissingComponent(ref p) if p == STYLES_PART));

        let rels = Relationships::for_workbook(&container).unwrap();
        assert!(rels.is_empty());
    }

    #[test]
    fn test_not_a_zip() {
        let err = Container::from_bytes(b"definitely not a zip".to_vec()).unwrap_err();
        assert!(matches!(err, Error::ZipArchive(_)));
    }

    #[test]
    fn test_default_worksheet_part() {
        assert_eq!(default_worksheet_part(3), "xl/worksheets/sheet3.xml");
    }
}
