//! Bulk spreadsheet ingestion: rosters, arrears, attendance/fees and the subject catalog.

pub mod normalizer;
pub mod parser;
pub mod records;
pub mod router;
pub mod service;
pub mod upsert;

pub use normalizer::{normalize_row, CellValue, NormalizedRow, RawRow};
pub use parser::{read_csv, read_table, SourceFormat, TableError};
pub use records::{
    parse_arrear_codes, ArrearRow, AttendanceRow, StudentRow, SubjectRow, UploadBatch, UploadKind,
};
pub use router::ingestion_router;
pub use service::IngestionService;
pub use upsert::{apply_batch, UploadSummary};

use crate::workflows::registry::RepositoryError;

/// Error raised while accepting or applying an upload.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("invalid upload type '{0}'")]
    UnknownUploadKind(String),
    #[error("unsupported file type for '{0}' (expected .xlsx, .xls or .csv)")]
    UnsupportedExtension(String),
    #[error("missing upload file")]
    MissingFile,
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("upload staging failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("upload worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl IngestionError {
    /// Request problems rejected before any persistent effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownUploadKind(_) | Self::UnsupportedExtension(_) | Self::MissingFile
        )
    }
}
