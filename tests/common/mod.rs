//! Synthetic workbook fixtures shared by the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::io::{BufRead, Cursor, Write};
use std::rc::Rc;
use xlstage::{Container, PartSource, Result};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Builds an xlsx archive part by part.
#[derive(Default)]
pub struct XlsxBuilder {
    parts: Vec<(String, String)>,
}

impl XlsxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw part.
    pub fn part(mut self, path: &str, xml: impl Into<String>) -> Self {
        self.parts.push((path.to_string(), xml.into()));
        self
    }

    /// Add `xl/workbook.xml` listing `(sheetId, name, r:id)` entries.
    pub fn workbook(self, sheets: &[(u32, &str, Option<&str>)]) -> Self {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{}" xmlns:r="{}"><sheets>"#,
            MAIN_NS, REL_NS
        );
        for (index, name, id) in sheets {
            match id {
                Some(id) => xml.push_str(&format!(
                    r#"<sheet name="{}" sheetId="{}" r:id="{}"/>"#,
                    name, index, id
                )),
                None => xml.push_str(&format!(r#"<sheet name="{}" sheetId="{}"/>"#, name, index)),
            }
        }
        xml.push_str("</sheets></workbook>");
        self.part("xl/workbook.xml", xml)
    }

    /// Add `xl/_rels/workbook.xml.rels` with `(Id, Target)` entries.
    pub fn relationships(self, rels: &[(&str, &str)]) -> Self {
        let mut xml = String::from(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, target) in rels {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}/worksheet" Target="{}"/>"#,
                id, REL_NS, target
            ));
        }
        xml.push_str("</Relationships>");
        self.part("xl/_rels/workbook.xml.rels", xml)
    }

    /// Add `xl/sharedStrings.xml`.
    pub fn shared_strings(self, strings: &[&str]) -> Self {
        let mut xml = format!(r#"<sst xmlns="{}" count="{}">"#, MAIN_NS, strings.len());
        for s in strings {
            xml.push_str(&format!("<si><t>{}</t></si>", s));
        }
        xml.push_str("</sst>");
        self.part("xl/sharedStrings.xml", xml)
    }

    /// Add `xl/styles.xml` with custom `(id, code)` formats and the
    /// `numFmtId` of each cell format.
    pub fn styles(self, formats: &[(u32, &str)], xfs: &[u32]) -> Self {
        let mut xml = format!(r#"<styleSheet xmlns="{}">"#, MAIN_NS);
        if !formats.is_empty() {
            xml.push_str("<numFmts>");
            for (id, code) in formats {
                xml.push_str(&format!(
                    r#"<numFmt numFmtId="{}" formatCode="{}"/>"#,
                    id, code
                ));
            }
            xml.push_str("</numFmts>");
        }
        xml.push_str("<cellStyleXfs><xf numFmtId=\"0\"/></cellStyleXfs><cellXfs>");
        for id in xfs {
            xml.push_str(&format!(
                r#"<xf numFmtId="{}" applyNumberFormat="1"/>"#,
                id
            ));
        }
        xml.push_str("</cellXfs></styleSheet>");
        self.part("xl/styles.xml", xml)
    }

    /// Add a worksheet part from the markup of its `sheetData` children.
    pub fn worksheet(self, path: &str, rows: &str) -> Self {
        let xml = format!(
            r#"<worksheet xmlns="{}"><sheetData>{}</sheetData></worksheet>"#,
            MAIN_NS, rows
        );
        self.part(path, xml)
    }

    pub fn build(self) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            for (path, xml) in &self.parts {
                zip.start_file(path.as_str(), options).unwrap();
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }
}

/// `<c>` markup for a cell.
pub fn cell(reference: &str, cell_type: Option<&str>, style: Option<u32>, value: &str) -> String {
    let mut attrs = format!(r#"r="{}""#, reference);
    if let Some(t) = cell_type {
        attrs.push_str(&format!(r#" t="{}""#, t));
    }
    if let Some(s) = style {
        attrs.push_str(&format!(r#" s="{}""#, s));
    }
    format!("<c {}><v>{}</v></c>", attrs, value)
}

/// `<row>` markup.
pub fn row(number: u32, cells: &[String]) -> String {
    format!(r#"<row r="{}">{}</row>"#, number, cells.concat())
}

pub const HEADERS: [&str; 9] = [
    "Shared String",
    "Integer",
    "Date Time",
    "Date",
    "Time",
    "Float",
    "Boolean",
    "Inline String",
    "Error",
];

/// A two-sheet workbook.
///
/// Sheet "First" (id 1) has the nine headers in row 1 and one value of
/// each kind in row 2. Sheet "Second" (id 2) is stored under a
/// non-default part name reached through the relationships.
pub fn sample_workbook() -> Vec<u8> {
    let mut strings: Vec<&str> = HEADERS.to_vec();
    strings.push("Hello");

    let header = HEADERS
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let column = xlstage::column::to_name(i as u32 + 1);
            cell(&format!("{}1", column), Some("s"), None, &i.to_string())
        })
        .collect::<Vec<_>>();

    let values = vec![
        cell("A2", Some("s"), None, "9"),
        cell("B2", None, None, "123"),
        cell("C2", None, Some(1), "42732.582638888889"),
        cell("D2", None, Some(2), "42732"),
        cell("E2", None, Some(3), "0.58263888888888882"),
        cell("F2", None, None, "1.5"),
        cell("G2", Some("b"), None, "1"),
        r#"<c r="H2" t="inlineStr"><is><t>inline</t></is></c>"#.to_string(),
        cell("I2", Some("e"), None, "#DIV/0!"),
    ];

    XlsxBuilder::new()
        .workbook(&[(1, "First", Some("rId1")), (2, "Second", Some("rId2"))])
        .relationships(&[
            ("rId1", "worksheets/sheet1.xml"),
            ("rId2", "worksheets/data.xml"),
        ])
        .shared_strings(&strings)
        .styles(&[(164, "[$-409]m/d/yy h:mm AM/PM;@")], &[0, 164, 14, 18])
        .worksheet(
            "xl/worksheets/sheet1.xml",
            &[row(1, &header), row(2, &values)].concat(),
        )
        .worksheet(
            "xl/worksheets/data.xml",
            &[
                row(1, &[cell("A1", None, None, "1"), cell("C1", None, None, "3")]),
                row(3, &[cell("B3", None, None, "6")]),
            ]
            .concat(),
        )
        .build()
}

/// A part source that can be switched off after opening, to prove parts
/// are not read twice.
pub struct SwitchableSource {
    container: Container,
    available: Rc<Cell<bool>>,
    reads: Rc<Cell<usize>>,
}

impl SwitchableSource {
    /// Returns the source, its availability switch and its read counter.
    pub fn new(data: Vec<u8>) -> (Self, Rc<Cell<bool>>, Rc<Cell<usize>>) {
        let available = Rc::new(Cell::new(true));
        let reads = Rc::new(Cell::new(0));
        let source = Self {
            container: Container::from_bytes(data).unwrap(),
            available: Rc::clone(&available),
            reads: Rc::clone(&reads),
        };
        (source, available, reads)
    }
}

impl PartSource for SwitchableSource {
    fn read_part(
        &self,
        path: &str,
        visit: &mut dyn FnMut(&mut dyn BufRead) -> Result<()>,
    ) -> Result<()> {
        if !self.available.get() {
            return Err(xlstage::Error::MissingComponent(format!(
                "{} (source switched off)",
                path
            )));
        }
        self.reads.set(self.reads.get() + 1);
        self.container.read_part(path, visit)
    }

    fn has_part(&self, path: &str) -> bool {
        self.available.get() && self.container.has_part(path)
    }
}
