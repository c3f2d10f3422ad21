//! Error types for the xlstage library.

use std::io;
use thiserror::Error;

/// Result type alias for xlstage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading a workbook.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading ZIP archive.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// Error parsing XML content.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// A required workbook part is missing from the archive.
    #[error("Missing component: {0}")]
    MissingComponent(String),

    /// Invalid or malformed data in the workbook.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A cell of type `d` did not hold an ISO 8601 timestamp.
    #[error("Malformed date: {0:?}")]
    MalformedDate(String),

    /// A numeric cell did not hold a number.
    #[error("Malformed number: {0:?}")]
    MalformedNumber(String),

    /// A column name contained something other than ASCII letters.
    #[error("Invalid column name: {0:?}")]
    InvalidColumn(String),

    /// The worksheet does not exist in the workbook.
    #[error("No such worksheet: {0}")]
    NoSuchWorksheet(String),

    /// The cell does not exist in the worksheet.
    #[error("The cell for column \"{column}\" row \"{row}\" in the worksheet \"{worksheet}\" (index: {index}) does not exist")]
    NoSuchCell {
        worksheet: String,
        index: u32,
        column: String,
        row: u32,
    },

    /// The row has no cells in the worksheet.
    #[error("The row \"{row}\" does not exist in the worksheet \"{worksheet}\" (index: {index})")]
    NoSuchRow {
        worksheet: String,
        index: u32,
        row: u32,
    },

    /// The column has no cells in the worksheet.
    #[error("The column \"{column}\" does not exist in the worksheet \"{worksheet}\" (index: {index})")]
    NoSuchColumn {
        worksheet: String,
        index: u32,
        column: String,
    },

    /// A prepared statement was requested while still checked out.
    #[error("The prepared SQL statement is already in use: {0}")]
    StatementInUse(String),

    /// A statement could not be compiled.
    #[error("The SQL statement could not be prepared: {sql}")]
    Prepare {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A prepared statement failed during execution.
    #[error("The SQL statement could not be executed with {params}: {sql}")]
    Execute {
        sql: String,
        params: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A schema statement failed.
    #[error("The schema could not be created: {sql}")]
    Schema {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A transaction was started while another one is open.
    #[error("A transaction is already open on the staging store")]
    NestedTransaction,

    /// The transaction could not begin.
    #[error("The transaction could not begin")]
    BeginTransaction(#[source] rusqlite::Error),

    /// The transaction could not be committed.
    #[error("The transaction could not be committed")]
    CommitTransaction(#[source] rusqlite::Error),

    /// Rolling back after a failed unit of work failed too.
    #[error("The transaction could not be rolled back after: {cause}")]
    RollbackTransaction {
        cause: Box<Error>,
        #[source]
        source: rusqlite::Error,
    },

    /// Any other staging store failure.
    #[error("Staging store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl Error {
    /// Returns `true` for the recoverable "does not exist" conditions.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NoSuchWorksheet(_)
                | Error::NoSuchCell { .. }
                | Error::NoSuchRow { .. }
                | Error::NoSuchColumn { .. }
        )
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}
