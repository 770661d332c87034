use crate::api::ApiError;
use sheetframe_frame::{FrameError, Region};
use thiserror::Error;

/// Errors surfaced by sessions and catalogs.
///
/// Mapping-layer problems come through as [`ClientError::Frame`] and are
/// always detected before any remote call is issued. `Remote` carries the
/// last underlying cause once retries are exhausted.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),

    #[error("no open worksheet")]
    NoWorksheetOpen,

    #[error("column not found: {name}")]
    ColumnNotFound { name: String },

    #[error("requested merge {requested:?} overlaps existing merge {existing:?}")]
    MergeConflict { requested: Region, existing: Region },

    #[error("range {range} is outside the worksheet ({rows} rows, {cols} cols)")]
    RangeOutOfBounds {
        range: String,
        rows: usize,
        cols: usize,
    },

    #[error("number of values ({actual}) needs to match the number of cells ({expected})")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("couldn't create spreadsheet '{title}': {source}")]
    CreateFailed { title: String, source: ApiError },

    #[error("invalid permission string: {0}")]
    InvalidPermission(String),

    #[error("remote operation '{operation}' failed ({context}): {source}")]
    Remote {
        operation: &'static str,
        context: String,
        source: ApiError,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
