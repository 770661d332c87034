//! Remote layer for sheetframe: a blocking client binding the spreadsheet
//! service to the labeled-table model in `sheetframe-frame`.
//!
//! The [`Session`] holds one open spreadsheet and at most one open
//! worksheet, reading ranges into [`Frame`]s and writing them back while
//! handling worksheet lifecycle, merged cells, frozen panes, and the
//! service's per-request cell budget. The [`Catalog`] enumerates
//! spreadsheets and folders independently of any session.
//!
//! Every operation blocks until the service answers or retries run out;
//! transient quota pushback is absorbed by [`retry::with_retry`] and never
//! reaches the caller unless the attempt budget is exhausted.
//!
//! # Examples
//!
//! ```no_run
//! use sheetframe_client::{HttpApi, ReadOptions, Session, StaticToken};
//! use std::sync::Arc;
//!
//! let api = HttpApi::new(Arc::new(StaticToken("ya29.token".into()))).unwrap();
//! let mut session = Session::open(api, "Quarterly Numbers", false).unwrap();
//! session.open_worksheet(0, false).unwrap();
//!
//! let frame = session.read_frame(&ReadOptions::default()).unwrap();
//! println!("{} rows", frame.nrows());
//! ```

pub mod api;
pub mod catalog;
pub mod error;
pub mod http;
pub mod permissions;
pub mod retry;
pub mod session;

/// Re-export the service boundary types.
pub use api::{
    ApiError, ApiResult, DriveApi, DriveFile, GridRange, MajorDimension, MergeType, Request,
    SheetsApi, SpreadsheetMeta, ValueInputOption, ValueRenderOption, WorksheetMeta,
};
/// Re-export the catalog.
pub use catalog::Catalog;
/// Re-export error types.
pub use error::{ClientError, Result};
/// Re-export the HTTP implementation.
pub use http::{HttpApi, StaticToken, TokenProvider};
/// Re-export permissions.
pub use permissions::{Permission, PermissionInfo, PermissionTarget, Role};
/// Re-export the retry wrapper.
pub use retry::{with_retry, RetryPolicy};
/// Re-export the session.
pub use session::{
    ColumnSel, ReadOptions, Session, SessionConfig, WorksheetRef, WriteOptions,
};

/// Re-export the mapping-layer core alongside the client.
pub use sheetframe_frame::{
    CellRef, CellValue, Coord, DecodeOptions, EncodeOptions, Frame, FrameError, Header, Index,
    Region,
};
