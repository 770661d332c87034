//! Labeled-table core for sheetframe.
//!
//! Everything in this crate is pure: converting between a worksheet's raw
//! grid of strings and an in-memory [`Frame`] with a (possibly multi-level)
//! column header and row index. Talking to the remote service lives in
//! `sheetframe-client`; this crate never does I/O.
//!
//! # Examples
//!
//! ## Decoding a grid
//!
//! ```
//! use sheetframe_frame::{decode, DecodeOptions};
//!
//! let grid: Vec<Vec<String>> = vec![
//!     vec!["".into(), "Q1".into(), "Q1".into()],
//!     vec!["".into(), "Jan".into(), "Feb".into()],
//!     vec!["r1".into(), "10".into(), "20".into()],
//! ];
//!
//! let frame = decode(&grid, &DecodeOptions { header_rows: 2, index_cols: 1 }).unwrap();
//! assert_eq!(frame.header().labels()[0], vec!["Q1", "Jan"]);
//! assert_eq!(frame.nrows(), 1);
//! ```
//!
//! ## Encoding a frame
//!
//! ```
//! use sheetframe_frame::{encode, EncodeOptions, Frame};
//!
//! let frame = Frame::from_rows(vec!["a", "b"], vec![vec![1, 2]]).unwrap();
//! let encoded = encode(
//!     &frame,
//!     &EncodeOptions { index_cols: Some(0), ..EncodeOptions::default() },
//! )
//! .unwrap();
//! assert_eq!(encoded.rows[0], vec!["a", "b"]);
//! assert_eq!(encoded.rows[1], vec!["1", "2"]);
//! ```
//!
//! ## Addresses
//!
//! ```
//! use sheetframe_frame::{parse_a1, range_string, Coord};
//!
//! let start = Coord::new(1, 1).unwrap();
//! let end = Coord::new(2, 2).unwrap();
//! assert_eq!(range_string(start, end), "A1:B2");
//! assert_eq!(parse_a1("b2").unwrap(), end);
//! ```

mod a1;
mod codec;
mod error;
mod frame;
mod region;
mod value;

/// Re-export address translation.
pub use a1::{col_to_letters, letters_to_col, open_col_range, parse_a1, range_string, CellRef, Coord};
/// Re-export the grid codec.
pub use codec::{decode, encode, DecodeOptions, EncodeOptions, Encoded};
/// Re-export error types.
pub use error::{FrameError, Result};
/// Re-export the labeled table.
pub use frame::{Frame, Header, Index};
/// Re-export merge regions and fill.
pub use region::{fill_merged, Region};
/// Re-export the cell value type.
pub use value::CellValue;
