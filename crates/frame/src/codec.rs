//! Conversion between a raw worksheet grid and a [`Frame`].
//!
//! Decoding reconstructs a (possibly multi-level) column header and row
//! index from the leading rows/columns of a grid of strings; encoding is
//! the inverse, flattening a frame back into upload-ready rows plus the
//! header merge regions implied by repeated labels.

use crate::error::{FrameError, Result};
use crate::frame::{Frame, Header, Index};
use crate::region::Region;
use crate::value::CellValue;

/// How many leading rows and columns of the grid carry labels.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub header_rows: usize,
    pub index_cols: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            header_rows: 1,
            index_cols: 1,
        }
    }
}

/// Controls for [`encode`].
///
/// `header_rows`/`index_cols` of `None` emit the frame's natural depth;
/// `Some(0)` omits that part entirely; any other value must match the
/// natural depth or encoding fails.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub header_rows: Option<usize>,
    pub index_cols: Option<usize>,
    /// Join multi-level labels into a single header row with this separator.
    pub flatten_sep: Option<String>,
    /// Emit merge regions for horizontal runs of identical header labels.
    pub merge_headers: bool,
    /// Replacement for null body values.
    pub fill_value: String,
}

/// Result of [`encode`]: upload-ready rows plus the header merge regions
/// (0-based, relative to `rows`) requested via `merge_headers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub rows: Vec<Vec<String>>,
    pub header_merges: Vec<Region>,
}

/// Parse a grid of strings into a labeled table.
///
/// The first `header_rows` rows become the column header and the first
/// `index_cols` columns of the remaining rows become the row index. Cells in
/// the top-left intersection block belong to neither: the bottom-most
/// non-empty one in each index column names that index level. Rows whose
/// cells are all blank are dropped from the body.
pub fn decode(grid: &[Vec<String>], opts: &DecodeOptions) -> Result<Frame> {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);

    if opts.header_rows > grid.len() {
        return Err(FrameError::decode(format!(
            "{} header rows requested but the grid has {} rows",
            opts.header_rows,
            grid.len()
        )));
    }
    if opts.index_cols > width {
        return Err(FrameError::decode(format!(
            "{} index columns requested but the grid has {} columns",
            opts.index_cols, width
        )));
    }

    let levels = header_levels(grid, width, opts);
    let header = build_header(&levels, width, opts)?;
    let index_names: Vec<Option<String>> = (0..opts.index_cols)
        .map(|col| {
            levels
                .iter()
                .rev()
                .map(|level| &level[col])
                .find(|cell| !cell.is_empty())
                .cloned()
        })
        .collect();

    let mut entries = Vec::new();
    let mut rows = Vec::new();
    for raw in &grid[opts.header_rows..] {
        let padded = pad_row(raw, width);
        if padded.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        entries.push(
            padded[..opts.index_cols]
                .iter()
                .map(|s| CellValue::parse(s))
                .collect::<Vec<_>>(),
        );
        rows.push(
            padded[opts.index_cols..]
                .iter()
                .map(|s| CellValue::parse(s))
                .collect::<Vec<_>>(),
        );
    }

    let index = if opts.index_cols == 0 {
        Index::ordinal(rows.len())
    } else {
        Index::multi(index_names, entries)?
    };

    Frame::new(header, index, rows)
}

/// Header rows padded to the grid width, whitespace-only labels collapsed
/// to the empty placeholder, and blank cells on every level below the top
/// forward-filled from the nearest label to their left. The top level is
/// exempt from filling, and so are blanks before the first populated cell
/// of a level.
fn header_levels(grid: &[Vec<String>], width: usize, opts: &DecodeOptions) -> Vec<Vec<String>> {
    let mut levels: Vec<Vec<String>> = grid[..opts.header_rows]
        .iter()
        .map(|row| {
            pad_row(row, width)
                .into_iter()
                .map(|cell| {
                    if cell.trim().is_empty() {
                        String::new()
                    } else {
                        cell
                    }
                })
                .collect()
        })
        .collect();

    for level in levels.iter_mut().skip(1) {
        let mut last: Option<String> = None;
        for cell in level.iter_mut().skip(opts.index_cols) {
            if cell.is_empty() {
                if let Some(fill) = &last {
                    cell.clone_from(fill);
                }
            } else {
                last = Some(cell.clone());
            }
        }
    }

    levels
}

fn build_header(levels: &[Vec<String>], width: usize, opts: &DecodeOptions) -> Result<Header> {
    let data_cols = width - opts.index_cols;
    if opts.header_rows == 0 {
        // No header rows: columns are positionally named.
        return Ok(Header::single((0..data_cols).map(|i| i.to_string()).collect()));
    }

    let labels: Vec<Vec<String>> = (opts.index_cols..width)
        .map(|col| levels.iter().map(|level| level[col].clone()).collect())
        .collect();
    Header::multi(labels)
}

fn pad_row(row: &[String], width: usize) -> Vec<String> {
    let mut padded = row.to_vec();
    padded.resize(width, String::new());
    padded
}

/// Flatten a frame into upload-ready rows of strings.
///
/// Index names are written on the bottom header level (that reads most
/// natural in the sheet); the intersection cells above them stay blank.
/// With `flatten_sep` set, the whole header collapses into one row of
/// separator-joined labels and no merge regions are produced.
pub fn encode(frame: &Frame, opts: &EncodeOptions) -> Result<Encoded> {
    let depth = frame.header().levels();
    let natural_header_rows = if opts.flatten_sep.is_some() { 1 } else { depth };

    let header_rows = match opts.header_rows {
        None => natural_header_rows,
        Some(0) => 0,
        Some(h) if h == natural_header_rows => h,
        Some(h) => {
            return Err(FrameError::encode(format!(
                "{h} header rows requested but the table produces {natural_header_rows}"
            )))
        }
    };
    let index_cols = match opts.index_cols {
        None => frame.index().levels(),
        Some(0) => 0,
        Some(k) if k == frame.index().levels() => k,
        Some(k) => {
            return Err(FrameError::encode(format!(
                "{k} index columns requested but the index has {} levels",
                frame.index().levels()
            )))
        }
    };

    let mut rows = Vec::with_capacity(header_rows + frame.nrows());

    if header_rows > 0 {
        if let Some(sep) = &opts.flatten_sep {
            let mut row = Vec::with_capacity(index_cols + frame.ncols());
            for name in &frame.index().names()[..index_cols] {
                row.push(name.clone().unwrap_or_default());
            }
            row.extend(frame.header().flat_labels(sep));
            rows.push(row);
        } else {
            for level in 0..depth {
                let mut row = Vec::with_capacity(index_cols + frame.ncols());
                for name in &frame.index().names()[..index_cols] {
                    row.push(if level == depth - 1 {
                        name.clone().unwrap_or_default()
                    } else {
                        String::new()
                    });
                }
                for label in frame.header().labels() {
                    row.push(label[level].clone());
                }
                rows.push(row);
            }
        }
    }

    for (entry, body) in frame.index().entries().iter().zip(frame.rows()) {
        let mut row = Vec::with_capacity(index_cols + frame.ncols());
        for value in &entry[..index_cols] {
            row.push(value.render(&opts.fill_value));
        }
        for value in body {
            row.push(value.render(&opts.fill_value));
        }
        rows.push(row);
    }

    let header_merges = if opts.merge_headers && header_rows > 0 && opts.flatten_sep.is_none() {
        header_merge_regions(frame.header(), index_cols)
    } else {
        Vec::new()
    };

    Ok(Encoded {
        rows,
        header_merges,
    })
}

/// Merge regions for horizontal runs of identical labels, one pass per
/// level. A run on a lower level may not cross a run boundary of the level
/// above it, so children never merge across two differently-labeled
/// parents. Single-cell runs are not emitted.
fn header_merge_regions(header: &Header, col_offset: usize) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut bounds: Vec<(usize, usize)> = vec![(0, header.len())];

    for level in 0..header.levels() {
        let mut runs = Vec::new();
        for &(start, end) in &bounds {
            let mut col = start;
            while col < end {
                let mut next = col + 1;
                while next < end
                    && header.labels()[next][level] == header.labels()[col][level]
                {
                    next += 1;
                }
                if next - col >= 2 {
                    runs.push((col, next));
                }
                col = next;
            }
        }

        for &(start, end) in &runs {
            regions.push(Region::new(
                level,
                level + 1,
                col_offset + start,
                col_offset + end,
            ));
        }

        if runs.is_empty() {
            break;
        }
        bounds = runs;
    }

    regions
}
