//! Utility to explore xlsx structure for development
use xlstage::container::{
    Container, Relationships, SHARED_STRINGS_PART, STYLES_PART, WORKBOOK_PART,
};
use xlstage::reader::{PartReader, WorkbookReader};
use xlstage::PartSource;

fn head(container: &Container, part: &str, limit: usize) {
    println!("\n=== {} (first {} chars) ===", part, limit);
    match container.read_bytes(part) {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            let end = content
                .char_indices()
                .nth(limit)
                .map(|(i, _)| i)
                .unwrap_or(content.len());
            println!("{}", &content[..end]);
        }
        Err(e) => println!("  ({})", e),
    }
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or("test-files/sample.xlsx".to_string());
    let container = Container::open(&path).expect("Failed to open file");

    println!("=== Files in archive ===");
    for file in container.list_files() {
        println!("  {}", file);
    }

    let rels = Relationships::for_workbook(&container).unwrap_or_default();

    println!("\n=== Worksheets ===");
    let mut sheets = Vec::new();
    container
        .read_part(WORKBOOK_PART, &mut |stream: &mut dyn std::io::BufRead| {
            let mut reader = WorkbookReader::new(stream);
            while let Some(sheet) = reader.advance()? {
                sheets.push(sheet);
            }
            Ok(())
        })
        .expect("Failed to read workbook");

    let mut parts = Vec::new();
    for sheet in &sheets {
        let part = sheet
            .relationship_id
            .as_deref()
            .and_then(|id| rels.resolve_target(WORKBOOK_PART, id))
            .unwrap_or_else(|| xlstage::container::default_worksheet_part(sheet.index));
        println!("  [{}] {} -> {}", sheet.index, sheet.name, part);
        parts.push(part);
    }

    head(&container, WORKBOOK_PART, 2000);
    head(&container, SHARED_STRINGS_PART, 2000);
    head(&container, STYLES_PART, 2000);
    if let Some(part) = parts.first() {
        head(&container, part, 3000);
    }
}
