use crate::data_type::DataType;

/// All the ways an engine operation can fail.
///
/// Every failure is local and synchronous: an operation either returns a
/// complete result or fails before materializing one. Nothing is retried
/// internally.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("column {0:?} not found")]
    ColumnNotFound(String),

    #[error("column {0:?} already exists")]
    DuplicateColumn(String),

    #[error("row count mismatch: expected {expected}, found {found}")]
    RowCountMismatch { expected: usize, found: usize },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("unsupported key columns: {0}")]
    UnsupportedKeyColumns(String),

    #[error("join key mismatch: {0}")]
    JoinKeyMismatch(String),

    #[error("pivot collision: {0}")]
    PivotCollision(String),

    #[error("pipeline order violation: {0}")]
    PipelineOrder(&'static str),

    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        expected: DataType,
        found: Option<DataType>,
    },

    #[error("numeric overflow: {0}")]
    NumericOverflow(String),

    #[error("row index {row} out of bounds for {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt data: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, TableError>;
