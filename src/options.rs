//! Workbook opening options.

use std::path::PathBuf;

/// Where the staging store keeps its data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StagingMode {
    /// A database file inside a temporary directory, removed on close
    #[default]
    TempFile,
    /// An in-memory database
    InMemory,
}

/// Options for opening a workbook.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Parent directory for the temporary staging directory
    /// (None = the system temp dir)
    pub staging_dir: Option<PathBuf>,

    /// Where staged records are kept
    pub staging_mode: StagingMode,

    /// Number of compiled statements kept by the staging store
    pub statement_cache_capacity: usize,

    /// Rows fetched per refill by column and row iterators
    pub batch_size: usize,

    /// Locate worksheet parts through the workbook relationships
    pub resolve_relationships: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            staging_dir: None,
            staging_mode: StagingMode::TempFile,
            statement_cache_capacity: 32,
            batch_size: 256,
            resolve_relationships: true,
        }
    }
}

impl OpenOptions {
    /// Create new open options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the staging directory under `dir`.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Keep the staging store in memory.
    pub fn with_in_memory(mut self, in_memory: bool) -> Self {
        self.staging_mode = if in_memory {
            StagingMode::InMemory
        } else {
            StagingMode::TempFile
        };
        self
    }

    /// Set the statement cache capacity.
    pub fn with_statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    /// Set the iterator batch size (at least 1).
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Toggle relationship-based worksheet location.
    pub fn with_relationships(mut self, resolve: bool) -> Self {
        self.resolve_relationships = resolve;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = OpenOptions::default();
        assert!(opts.staging_dir.is_none());
        assert_eq!(opts.staging_mode, StagingMode::TempFile);
        assert_eq!(opts.batch_size, 256);
        assert!(opts.resolve_relationships);
    }

    #[test]
    fn test_builder_pattern() {
        let opts = OpenOptions::new()
            .with_staging_dir("scratch")
            .with_in_memory(true)
            .with_batch_size(0)
            .with_relationships(false);

        assert_eq!(opts.staging_dir, Some(PathBuf::from("scratch")));
        assert_eq!(opts.staging_mode, StagingMode::InMemory);
        assert_eq!(opts.batch_size, 1);
        assert!(!opts.resolve_relationships);
    }
}
