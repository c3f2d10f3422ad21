//! xlstage CLI - Excel workbook inspection tool
//!
//! A command-line tool for listing worksheets and reading cells, rows and
//! columns out of XLSX files.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use xlstage::{OpenOptions, Value, Workbook, Worksheet};

/// Random-access reads of Excel workbooks
#[derive(Parser)]
#[command(
    name = "xlstage",
    author = "iyulab",
    version,
    about = "Read cells, rows and columns from Excel workbooks",
    long_about = "xlstage - Excel workbook reader backed by a disposable SQLite staging store.\n\n\
                  Worksheets are imported on first access, then queried by cell, row or column."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Workbook and staging options shared by every reading command.
#[derive(Args)]
struct Source {
    /// Input file path
    input: PathBuf,

    /// Stage into an in-memory database instead of a temporary file
    #[arg(long)]
    in_memory: bool,

    /// Rows fetched per page while streaming
    #[arg(long, default_value = "256")]
    batch_size: usize,

    /// Ignore workbook relationships and assume sheetN.xml part names
    #[arg(long)]
    no_relationships: bool,
}

/// Worksheet selection, by name or by index. Defaults to the first worksheet.
#[derive(Args)]
struct SheetSelector {
    /// Worksheet name
    #[arg(short, long)]
    sheet: Option<String>,

    /// Worksheet index (sheetId)
    #[arg(short = 'n', long, conflicts_with = "sheet")]
    index: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the worksheets of a workbook
    #[command(visible_alias = "ls")]
    Sheets {
        #[command(flatten)]
        source: Source,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the value of one cell
    Cell {
        #[command(flatten)]
        source: Source,

        #[command(flatten)]
        selector: SheetSelector,

        /// Cell reference, e.g. C2
        reference: String,
    },

    /// Print every cell of a row
    Row {
        #[command(flatten)]
        source: Source,

        #[command(flatten)]
        selector: SheetSelector,

        /// 1-based row number
        row: u32,
    },

    /// Print every cell of a column
    Column {
        #[command(flatten)]
        source: Source,

        #[command(flatten)]
        selector: SheetSelector,

        /// Column name, e.g. C
        column: String,
    },

    /// Dump a worksheet row by row
    Dump {
        #[command(flatten)]
        source: Source,

        #[command(flatten)]
        selector: SheetSelector,

        /// Output format
        #[arg(short, long, default_value = "tsv")]
        format: DumpFormat,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpFormat {
    /// Tab-separated values, one line per row
    Tsv,
    /// One JSON object per row
    Json,
}

impl Source {
    fn open(&self) -> Result<Workbook, Box<dyn std::error::Error>> {
        let options = OpenOptions::new()
            .with_in_memory(self.in_memory)
            .with_batch_size(self.batch_size)
            .with_relationships(!self.no_relationships);
        Ok(Workbook::open_with_options(&self.input, options)?)
    }
}

impl SheetSelector {
    fn select<'wb>(
        &self,
        workbook: &'wb Workbook,
    ) -> Result<Worksheet<'wb>, Box<dyn std::error::Error>> {
        let pb = create_spinner("Importing worksheet...");
        let sheet = match (&self.sheet, self.index) {
            (Some(name), _) => workbook.worksheet_by_name(name),
            (None, Some(index)) => workbook.worksheet_by_index(index),
            (None, None) => match workbook.worksheets()?.next() {
                Some(sheet) => sheet,
                None => {
                    pb.finish_and_clear();
                    return Err("workbook has no worksheets".into());
                }
            },
        };
        pb.finish_and_clear();
        Ok(sheet?)
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Sheets { source, json } => {
            let workbook = source.open()?;
            let sheets = workbook.list_worksheets()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&sheets)?);
            } else {
                println!("{}", "Worksheets".cyan().bold());
                println!("{}", "─".repeat(40));
                for sheet in &sheets {
                    println!(
                        "{:>4}  {}  {}",
                        sheet.index.to_string().bold(),
                        sheet.name,
                        sheet.part.as_deref().unwrap_or("").dimmed()
                    );
                }
            }
            workbook.close()?;
        }

        Commands::Cell {
            source,
            selector,
            reference,
        } => {
            let (column, row) = xlstage::reader::parse_cell_reference(
                &reference.to_ascii_uppercase(),
            )
            .ok_or_else(|| format!("invalid cell reference: {}", reference))?;

            let workbook = source.open()?;
            {
                let sheet = selector.select(&workbook)?;
                println!("{}", sheet.cell(&column, row)?);
            }
            workbook.close()?;
        }

        Commands::Row {
            source,
            selector,
            row,
        } => {
            let workbook = source.open()?;
            {
                let sheet = selector.select(&workbook)?;
                let row = sheet.row(row)?;
                for (column, value) in &row.values {
                    println!("{}{}\t{}", column.bold(), row.number, value);
                }
            }
            workbook.close()?;
        }

        Commands::Column {
            source,
            selector,
            column,
        } => {
            let workbook = source.open()?;
            {
                let sheet = selector.select(&workbook)?;
                let name = column.to_ascii_uppercase();
                for (row, value) in sheet.column(&column)? {
                    println!("{}{}\t{}", name.bold(), row, value);
                }
            }
            workbook.close()?;
        }

        Commands::Dump {
            source,
            selector,
            format,
            output,
        } => {
            let workbook = source.open()?;
            let count = {
                let sheet = selector.select(&workbook)?;
                let mut out: Box<dyn Write> = match &output {
                    Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                    None => Box::new(BufWriter::new(io::stdout().lock())),
                };
                let count = dump(&sheet, format, &mut out, output.is_some())?;
                out.flush()?;
                count
            };
            workbook.close()?;

            if let Some(path) = output {
                println!(
                    "{} Dumped {} rows to {}",
                    "✓".green().bold(),
                    count,
                    path.display()
                );
            }
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

/// Write every row of a worksheet. Returns the number of rows written.
fn dump(
    sheet: &Worksheet<'_>,
    format: DumpFormat,
    out: &mut dyn Write,
    show_progress: bool,
) -> Result<u64, Box<dyn std::error::Error>> {
    let width = sheet.count_columns()?;
    let pb = if show_progress {
        create_bar(u64::from(sheet.count_rows()?))
    } else {
        ProgressBar::hidden()
    };

    let mut count = 0;
    for row in sheet.rows()? {
        let row = row?;
        match format {
            DumpFormat::Tsv => {
                let mut fields = vec![String::new(); width as usize];
                for (column, value) in &row.values {
                    let index = xlstage::column::to_index(column)? as usize;
                    if let Some(field) = fields.get_mut(index - 1) {
                        *field = tsv_field(value);
                    }
                }
                writeln!(out, "{}\t{}", row.number, fields.join("\t"))?;
            }
            DumpFormat::Json => {
                let mut cells = serde_json::Map::new();
                for (column, value) in &row.values {
                    cells.insert(column.clone(), serde_json::to_value(value)?);
                }
                let line = serde_json::json!({ "row": row.number, "cells": cells });
                writeln!(out, "{}", line)?;
            }
        }
        count += 1;
        pb.set_position(u64::from(row.number));
    }

    pb.finish_and_clear();
    Ok(count)
}

/// Render a value on one line with tabs and newlines escaped.
fn tsv_field(value: &Value) -> String {
    value
        .to_string()
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn print_version() {
    println!("{} {}", "xlstage".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Random-access Excel workbook reading through a SQLite staging store");
    println!();
    println!("Supported formats: XLSX");
    println!("Repository: https://github.com/iyulab/xlstage");
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn create_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} rows")
            .unwrap(),
    );
    pb
}
