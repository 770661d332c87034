//! The worksheet session: one open spreadsheet, at most one open worksheet,
//! and a metadata cache that is invalidated by every mutation and refreshed
//! lazily on the next read.

use crate::api::{
    ApiError, DriveApi, GridRange, MergeType, Request, SheetsApi, ValueInputOption,
    ValueRenderOption, WorksheetMeta, SPREADSHEET_MIME,
};
use crate::api::MajorDimension;
use crate::error::{ClientError, Result};
use crate::permissions::{Permission, PermissionInfo};
use crate::retry::{with_retry, RetryPolicy};
use regex::Regex;
use sheetframe_frame::{
    decode, encode, fill_merged, open_col_range, range_string, CellRef, Coord, DecodeOptions,
    EncodeOptions, Frame, FrameError, Region,
};
use std::sync::LazyLock;

static SPREADSHEET_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{44}$").expect("static pattern"));
static URL_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("static pattern"));

const SPREADSHEET_URL_MARKER: &str = "docs.google.com/spreadsheets";

/// Session knobs. The chunk ceiling mirrors the service's per-request cell
/// budget; tests shrink it to force splitting.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub retry: RetryPolicy,
    /// Requests covering more cells than this are split into row bands.
    pub max_cells_per_request: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            retry: RetryPolicy::default(),
            max_cells_per_request: 1_000_000,
        }
    }
}

/// Which worksheet to open: by position, by (case-insensitive) title, or by
/// the service's opaque sheet id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorksheetRef {
    Index(usize),
    Title(String),
    Id(i64),
}

impl From<usize> for WorksheetRef {
    fn from(ix: usize) -> Self {
        WorksheetRef::Index(ix)
    }
}

impl From<&str> for WorksheetRef {
    fn from(title: &str) -> Self {
        WorksheetRef::Title(title.to_string())
    }
}

impl From<String> for WorksheetRef {
    fn from(title: String) -> Self {
        WorksheetRef::Title(title)
    }
}

/// A column picked either by 1-based sheet position or by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSel {
    Position(usize),
    Name(String),
}

impl From<usize> for ColumnSel {
    fn from(pos: usize) -> Self {
        ColumnSel::Position(pos)
    }
}

impl From<&str> for ColumnSel {
    fn from(name: &str) -> Self {
        ColumnSel::Name(name.to_string())
    }
}

/// Options for [`Session::read_frame`].
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub header_rows: usize,
    pub index_cols: usize,
    /// 1-based sheet row where headers (or data) begin.
    pub start_row: usize,
    /// Columns to re-fetch with the unformatted render option.
    pub unformatted_columns: Vec<ColumnSel>,
    /// Columns to re-fetch as formulas.
    pub formula_columns: Vec<ColumnSel>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            header_rows: 1,
            index_cols: 1,
            start_row: 1,
            unformatted_columns: Vec::new(),
            formula_columns: Vec::new(),
        }
    }
}

/// Options for [`Session::write_frame`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub include_index: bool,
    pub include_headers: bool,
    /// Top-left cell of the written block.
    pub start: CellRef,
    /// Blank the worksheet (sized to fit) before writing.
    pub replace: bool,
    /// Replacement for null values.
    pub fill_value: String,
    pub freeze_index: bool,
    pub freeze_headers: bool,
    pub add_filter: bool,
    /// Merge horizontal runs of identical header labels after writing.
    pub merge_headers: bool,
    /// Collapse a multi-level header into one row joined by this separator.
    pub flatten_sep: Option<String>,
    /// Columns whose values the service must not reinterpret (RAW input).
    pub raw_columns: Vec<ColumnSel>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            include_index: true,
            include_headers: true,
            start: CellRef::Tuple(1, 1),
            replace: false,
            fill_value: String::new(),
            freeze_index: false,
            freeze_headers: false,
            add_filter: false,
            merge_headers: false,
            flatten_sep: None,
            raw_columns: Vec::new(),
        }
    }
}

/// An open spreadsheet plus at most one open worksheet.
///
/// Worksheet metadata (size, merges, freeze state) is cached from the last
/// spreadsheet fetch. Every mutating operation marks the cache stale; any
/// metadata read while stale triggers a synchronous refresh first. Another
/// session mutating the same spreadsheet can still leave this one with a
/// stale view until the next refresh; there is no cross-session locking.
pub struct Session<A> {
    api: A,
    config: SessionConfig,
    spreadsheet_id: String,
    spreadsheet_title: String,
    sheets: Vec<WorksheetMeta>,
    open_sheet_id: Option<i64>,
    metadata_stale: bool,
}

impl<A: SheetsApi + DriveApi> Session<A> {
    /// Open a spreadsheet by name, url, or key. With `create` set, a missing
    /// spreadsheet is created with `spread` as its title instead of failing.
    pub fn open(api: A, spread: &str, create: bool) -> Result<Self> {
        Self::open_with_config(api, SessionConfig::default(), spread, create)
    }

    pub fn open_with_config(
        api: A,
        config: SessionConfig,
        spread: &str,
        create: bool,
    ) -> Result<Self> {
        let meta = open_spreadsheet(&api, &config.retry, spread, create)?;
        Ok(Session {
            api,
            config,
            spreadsheet_id: meta.spreadsheet_id,
            spreadsheet_title: meta.properties.title,
            sheets: meta.sheets,
            open_sheet_id: None,
            metadata_stale: false,
        })
    }

    #[must_use]
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    #[must_use]
    pub fn spreadsheet_title(&self) -> &str {
        &self.spreadsheet_title
    }

    /// Browser url of the open spreadsheet.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}",
            self.spreadsheet_id
        )
    }

    /// Title of the open worksheet, if one is open (served from cache).
    #[must_use]
    pub fn open_worksheet_title(&self) -> Option<&str> {
        let id = self.open_sheet_id?;
        self.sheets
            .iter()
            .find(|s| s.properties.sheet_id == id)
            .map(|s| s.properties.title.as_str())
    }

    /// E-mail of the authenticated identity.
    pub fn email(&self) -> Result<String> {
        with_retry(&self.config.retry, "userinfo.get", || self.api.user_email()).map_err(
            |source| ClientError::Remote {
                operation: "userinfo.get",
                context: String::new(),
                source,
            },
        )
    }

    /// Open a worksheet by index or title. A missing title is created first
    /// when `create` is set; a missing index always fails.
    pub fn open_worksheet(&mut self, sheet: impl Into<WorksheetRef>, create: bool) -> Result<()> {
        self.ensure_fresh()?;
        match sheet.into() {
            WorksheetRef::Index(ix) => {
                let meta = self
                    .sheets
                    .get(ix)
                    .ok_or_else(|| ClientError::WorksheetNotFound(format!("index {ix}")))?;
                self.open_sheet_id = Some(meta.properties.sheet_id);
            }
            WorksheetRef::Title(title) => {
                let found = self
                    .sheets
                    .iter()
                    .find(|s| s.properties.title.eq_ignore_ascii_case(&title));
                match found {
                    Some(meta) => self.open_sheet_id = Some(meta.properties.sheet_id),
                    None if create => self.create_worksheet(&title, 1, 1)?,
                    None => return Err(ClientError::WorksheetNotFound(title)),
                }
            }
            WorksheetRef::Id(id) => {
                if !self.sheets.iter().any(|s| s.properties.sheet_id == id) {
                    return Err(ClientError::WorksheetNotFound(format!("sheet id {id}")));
                }
                self.open_sheet_id = Some(id);
            }
        }
        Ok(())
    }

    /// Create a worksheet and open it.
    pub fn create_worksheet(&mut self, title: &str, rows: usize, cols: usize) -> Result<()> {
        self.batch(
            vec![Request::add_sheet(title, rows, cols)],
            "addSheet",
            title.to_string(),
        )?;
        self.refresh_metadata()?;
        let meta = self
            .sheets
            .iter()
            .find(|s| s.properties.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| ClientError::WorksheetNotFound(title.to_string()))?;
        self.open_sheet_id = Some(meta.properties.sheet_id);
        tracing::info!(worksheet = title, "created worksheet");
        Ok(())
    }

    /// Delete a worksheet by title, dropping it from the cached list. If it
    /// was the open worksheet, the session reverts to no-worksheet-open.
    pub fn delete_worksheet(&mut self, title: &str) -> Result<()> {
        self.ensure_fresh()?;
        let sheet_id = self
            .sheets
            .iter()
            .find(|s| s.properties.title.eq_ignore_ascii_case(title))
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| ClientError::WorksheetNotFound(title.to_string()))?;

        self.batch(
            vec![Request::delete_sheet(sheet_id)],
            "deleteSheet",
            title.to_string(),
        )?;
        self.sheets.retain(|s| s.properties.sheet_id != sheet_id);
        if self.open_sheet_id == Some(sheet_id) {
            self.open_sheet_id = None;
        }
        tracing::info!(worksheet = title, "deleted worksheet");
        Ok(())
    }

    /// Titles of all worksheets, in sheet order.
    pub fn worksheet_titles(&mut self) -> Result<Vec<String>> {
        self.ensure_fresh()?;
        Ok(self
            .sheets
            .iter()
            .map(|s| s.properties.title.clone())
            .collect())
    }

    /// (rows, cols) of the open worksheet.
    pub fn dims(&mut self) -> Result<(usize, usize)> {
        let meta = self.open_meta()?;
        let grid = meta.properties.grid_properties;
        Ok((grid.row_count, grid.column_count))
    }

    /// (frozen rows, frozen cols) of the open worksheet.
    pub fn frozen(&mut self) -> Result<(usize, usize)> {
        let meta = self.open_meta()?;
        let grid = meta.properties.grid_properties;
        Ok((grid.frozen_row_count, grid.frozen_column_count))
    }

    /// Merged regions of the open worksheet.
    pub fn merges(&mut self) -> Result<Vec<Region>> {
        let meta = self.open_meta()?;
        Ok(meta.merges.iter().map(GridRange::region).collect())
    }

    /// Pull the open worksheet into a [`Frame`].
    ///
    /// Merged cells are filled from their anchor before decoding, so a value
    /// spanning several cells shows up in every one of them.
    pub fn read_frame(&mut self, opts: &ReadOptions) -> Result<Frame> {
        if opts.start_row < 1 {
            return Err(FrameError::InvalidAddress {
                input: format!("start_row {}", opts.start_row),
            }
            .into());
        }

        let meta = self.open_meta()?;
        let title = meta.properties.title.clone();

        let mut grid = self.remote_values_get(&quoted_title(&title))?;
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut grid {
            row.resize(width, String::new());
        }

        let regions: Vec<Region> = meta.merges.iter().map(GridRange::region).collect();
        fill_merged(&mut grid, &regions);

        let grid: Vec<Vec<String>> = if opts.start_row - 1 < grid.len() {
            grid[opts.start_row - 1..].to_vec()
        } else {
            Vec::new()
        };

        let decode_opts = DecodeOptions {
            header_rows: opts.header_rows,
            index_cols: opts.index_cols,
        };
        let frame = decode(&grid, &decode_opts)?;

        if opts.unformatted_columns.is_empty() && opts.formula_columns.is_empty() {
            return Ok(frame);
        }

        let mut patched = grid;
        self.patch_render_columns(
            &mut patched,
            &frame,
            &title,
            opts,
            ValueRenderOption::Unformatted,
            &opts.unformatted_columns,
        )?;
        self.patch_render_columns(
            &mut patched,
            &frame,
            &title,
            opts,
            ValueRenderOption::Formula,
            &opts.formula_columns,
        )?;
        decode(&patched, &decode_opts).map_err(Into::into)
    }

    /// Re-fetch whole columns with a different render option and splice them
    /// into the grid's data rows (headers keep their formatted values).
    fn patch_render_columns(
        &mut self,
        grid: &mut [Vec<String>],
        frame: &Frame,
        title: &str,
        opts: &ReadOptions,
        render: ValueRenderOption,
        cols: &[ColumnSel],
    ) -> Result<()> {
        if cols.is_empty() {
            return Ok(());
        }

        let mut sheet_cols = Vec::with_capacity(cols.len());
        for sel in cols {
            let col = match sel {
                ColumnSel::Position(pos) => Coord::new(1, *pos)?.col,
                ColumnSel::Name(name) => {
                    let pos = frame
                        .header()
                        .position(name)
                        .ok_or_else(|| ClientError::ColumnNotFound { name: name.clone() })?;
                    opts.index_cols + pos + 1
                }
            };
            sheet_cols.push(col);
        }

        let mut ranges = Vec::with_capacity(sheet_cols.len());
        for &col in &sheet_cols {
            let open = open_col_range(Coord::new(1, col)?, col)?;
            ranges.push(sheet_range(title, &open));
        }

        let fetched = with_retry(&self.config.retry, "values.batchGet", || {
            self.api.values_batch_get(
                &self.spreadsheet_id,
                &ranges,
                render,
                MajorDimension::Columns,
            )
        })
        .map_err(|source| ClientError::Remote {
            operation: "values.batchGet",
            context: ranges.join(", "),
            source,
        })?;

        for (i, &col) in sheet_cols.iter().enumerate() {
            let column: Vec<String> = fetched
                .get(i)
                .and_then(|r| r.first())
                .cloned()
                .unwrap_or_default();
            for (grid_row, row) in grid.iter_mut().enumerate().skip(opts.header_rows) {
                let sheet_row = opts.start_row + grid_row;
                let value = column.get(sheet_row - 1).cloned().unwrap_or_default();
                if let Some(cell) = row.get_mut(col - 1) {
                    *cell = value;
                }
            }
        }
        Ok(())
    }

    /// Save a [`Frame`] into the open worksheet, growing it as needed.
    pub fn write_frame(&mut self, frame: &Frame, opts: &WriteOptions) -> Result<()> {
        let start = opts.start.resolve()?;

        let encoded = encode(
            frame,
            &EncodeOptions {
                header_rows: if opts.include_headers { None } else { Some(0) },
                index_cols: if opts.include_index { None } else { Some(0) },
                flatten_sep: opts.flatten_sep.clone(),
                merge_headers: opts.merge_headers,
                fill_value: opts.fill_value.clone(),
            },
        )?;

        let width = encoded.rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Ok(());
        }
        let index_cols_written = if opts.include_index {
            frame.index().levels()
        } else {
            0
        };
        let header_rows_written = encoded.rows.len() - frame.nrows();

        let req_rows = start.row - 1 + encoded.rows.len();
        let req_cols = start.col - 1 + width;

        if opts.replace {
            self.clear(req_rows, req_cols)?;
        } else {
            let (cur_rows, cur_cols) = self.dims()?;
            if req_rows > cur_rows || req_cols > cur_cols {
                self.resize(req_rows.max(cur_rows), req_cols.max(cur_cols))?;
            }
        }

        let mut raw_cols = Vec::with_capacity(opts.raw_columns.len());
        for sel in &opts.raw_columns {
            let col = match sel {
                ColumnSel::Position(pos) => start.col - 1 + index_cols_written + Coord::new(1, *pos)?.col,
                ColumnSel::Name(name) => {
                    let pos = frame
                        .header()
                        .position(name)
                        .ok_or_else(|| ClientError::ColumnNotFound { name: name.clone() })?;
                    start.col + index_cols_written + pos
                }
            };
            raw_cols.push(col);
        }

        let vals: Vec<String> = encoded.rows.iter().flatten().cloned().collect();
        self.update_cells((start.row, start.col), (req_rows, req_cols), &vals, &raw_cols)?;

        self.freeze(
            opts.freeze_headers
                .then_some(start.row - 1 + header_rows_written),
            opts.freeze_index
                .then_some(start.col - 1 + index_cols_written),
        )?;

        if opts.add_filter && header_rows_written > 0 {
            let filter_start = Coord::new(start.row + header_rows_written - 1, start.col)?;
            self.add_filter(
                Some(filter_start.into()),
                Some(CellRef::Tuple(req_rows, req_cols)),
            )?;
        }

        if !encoded.header_merges.is_empty() {
            let sheet_id = self.open_meta()?.properties.sheet_id;
            let requests: Vec<Request> = encoded
                .header_merges
                .iter()
                .map(|merge| {
                    let shifted = Region::new(
                        merge.start_row + start.row - 1,
                        merge.end_row + start.row - 1,
                        merge.start_col + start.col - 1,
                        merge.end_col + start.col - 1,
                    );
                    Request::merge(
                        GridRange::from_region(sheet_id, shifted),
                        MergeType::MergeAll,
                    )
                })
                .collect();
            self.batch(requests, "mergeCells", "header merges".to_string())?;
        }

        Ok(())
    }

    /// Read an explicit rectangle, splitting oversized requests into row
    /// bands. Rows come back padded to the requested width.
    pub fn read_range(
        &mut self,
        start: impl Into<CellRef>,
        end: impl Into<CellRef>,
    ) -> Result<Vec<Vec<String>>> {
        let (start, end) = resolve_rect(start.into(), end.into())?;
        let title = self.open_meta()?.properties.title;

        let num_cols = end.col - start.col + 1;
        let chunk_rows = (self.config.max_cells_per_request / num_cols).max(1);

        let mut out = Vec::with_capacity(end.row - start.row + 1);
        let mut row = start.row;
        while row <= end.row {
            let band_end = end.row.min(row + chunk_rows - 1);
            let range = sheet_range(
                &title,
                &range_string(
                    Coord { row, col: start.col },
                    Coord {
                        row: band_end,
                        col: end.col,
                    },
                ),
            );
            tracing::debug!(range = %range, "reading chunk");
            let mut band = self.remote_values_get(&range)?;
            // the service trims trailing blanks; restore the requested shape
            band.resize(band_end - row + 1, Vec::new());
            for r in &mut band {
                r.resize(num_cols, String::new());
            }
            out.extend(band);
            row = band_end + 1;
        }
        Ok(out)
    }

    /// Write a flat sequence of values (row-major) into the given rectangle.
    ///
    /// The value count must match the cell count exactly; that is checked
    /// before anything is sent. Oversized writes are split into row bands
    /// issued in order, so a mid-write failure leaves a prefix of the bands
    /// applied and the surfaced error names the failing range.
    pub fn update_cells(
        &mut self,
        start: impl Into<CellRef>,
        end: impl Into<CellRef>,
        vals: &[String],
        raw_columns: &[usize],
    ) -> Result<()> {
        let (start, end) = resolve_rect(start.into(), end.into())?;
        let title = self.open_meta()?.properties.title;

        let num_cols = end.col - start.col + 1;
        let num_rows = end.row - start.row + 1;
        if num_rows * num_cols != vals.len() {
            return Err(ClientError::DimensionMismatch {
                expected: num_rows * num_cols,
                actual: vals.len(),
            });
        }

        let chunk_rows = (self.config.max_cells_per_request / num_cols).max(1);

        let mut row = start.row;
        let mut offset = 0;
        while row <= end.row {
            let band_end = end.row.min(row + chunk_rows - 1);
            let band_cells = (band_end - row + 1) * num_cols;
            let chunk = &vals[offset..offset + band_cells];
            self.write_band(&title, row, band_end, start.col, end.col, chunk, raw_columns)?;
            offset += band_cells;
            row = band_end + 1;
        }

        self.metadata_stale = true;
        Ok(())
    }

    /// Write one row band, splitting columns into maximal runs that share an
    /// input option so RAW columns go up as RAW and the rest as entered.
    #[allow(clippy::too_many_arguments)]
    fn write_band(
        &self,
        title: &str,
        start_row: usize,
        end_row: usize,
        start_col: usize,
        end_col: usize,
        chunk: &[String],
        raw_columns: &[usize],
    ) -> Result<()> {
        let num_cols = end_col - start_col + 1;
        let band_rows = end_row - start_row + 1;

        let mut col = start_col;
        while col <= end_col {
            let raw = raw_columns.contains(&col);
            let mut run_end = col;
            while run_end < end_col && raw_columns.contains(&(run_end + 1)) == raw {
                run_end += 1;
            }

            let values: Vec<Vec<String>> = (0..band_rows)
                .map(|r| {
                    let from = r * num_cols + (col - start_col);
                    let to = r * num_cols + (run_end - start_col) + 1;
                    chunk[from..to].to_vec()
                })
                .collect();

            let range = sheet_range(
                title,
                &range_string(
                    Coord {
                        row: start_row,
                        col,
                    },
                    Coord {
                        row: end_row,
                        col: run_end,
                    },
                ),
            );
            let input = if raw {
                ValueInputOption::Raw
            } else {
                ValueInputOption::UserEntered
            };
            tracing::debug!(range = %range, input = input.as_str(), "writing chunk");

            with_retry(&self.config.retry, "values.update", || {
                self.api
                    .values_update(&self.spreadsheet_id, &range, &values, input)
            })
            .map_err(|source| ClientError::Remote {
                operation: "values.update",
                context: range.clone(),
                source,
            })?;

            col = run_end + 1;
        }
        Ok(())
    }

    /// Reset the open worksheet to a blank grid of the given size. Frozen
    /// rows/columns force a floor on the new size: a sheet cannot be shrunk
    /// to nothing but its frozen area.
    pub fn clear(&mut self, rows: usize, cols: usize) -> Result<()> {
        let (frozen_rows, frozen_cols) = self.frozen()?;
        let rows = rows.max(frozen_rows + 1).max(1);
        let cols = cols.max(frozen_cols + 1).max(1);

        self.resize(rows, cols)?;
        let blanks = vec![String::new(); rows * cols];
        self.update_cells((1, 1), (rows, cols), &blanks, &[])
    }

    /// Resize the open worksheet to exactly `rows` x `cols`.
    pub fn resize(&mut self, rows: usize, cols: usize) -> Result<()> {
        let sheet_id = self.open_meta()?.properties.sheet_id;
        self.batch(
            vec![Request::resize(sheet_id, rows, cols)],
            "updateSheetProperties",
            format!("resize to {rows}x{cols}"),
        )
    }

    /// Freeze leading rows and/or columns. `None` leaves that axis's current
    /// freeze untouched; `Some(0)` unfreezes it. Both `None` is a no-op.
    pub fn freeze(&mut self, rows: Option<usize>, cols: Option<usize>) -> Result<()> {
        if rows.is_none() && cols.is_none() {
            return Ok(());
        }
        let sheet_id = self.open_meta()?.properties.sheet_id;
        self.batch(
            vec![Request::freeze(sheet_id, rows, cols)],
            "updateSheetProperties",
            "freeze".to_string(),
        )
    }

    /// Merge a rectangle of cells. The range must lie inside the worksheet,
    /// and overlapping an existing merge is refused locally rather than
    /// letting the service split it.
    pub fn merge_cells(
        &mut self,
        start: impl Into<CellRef>,
        end: impl Into<CellRef>,
        merge_type: MergeType,
    ) -> Result<()> {
        let (start, end) = resolve_rect(start.into(), end.into())?;
        let meta = self.open_meta()?;
        let grid = meta.properties.grid_properties;

        let requested = Region::from_coords(start, end);
        if requested.end_row > grid.row_count || requested.end_col > grid.column_count {
            return Err(ClientError::RangeOutOfBounds {
                range: range_string(start, end),
                rows: grid.row_count,
                cols: grid.column_count,
            });
        }
        for merge in &meta.merges {
            let existing = merge.region();
            if requested.overlaps(&existing) {
                return Err(ClientError::MergeConflict {
                    requested,
                    existing,
                });
            }
        }

        self.batch(
            vec![Request::merge(
                GridRange::from_region(meta.properties.sheet_id, requested),
                merge_type,
            )],
            "mergeCells",
            range_string(start, end),
        )
    }

    /// Unmerge everything between `start` and `end`; defaults cover the
    /// whole worksheet.
    pub fn unmerge_cells(
        &mut self,
        start: Option<CellRef>,
        end: Option<CellRef>,
    ) -> Result<()> {
        let meta = self.open_meta()?;
        let grid = meta.properties.grid_properties;

        let start = match start {
            Some(cell) => cell.resolve()?,
            None => Coord::new(1, 1)?,
        };
        let end = match end {
            Some(cell) => cell.resolve()?,
            None => Coord::new(grid.row_count.max(1), grid.column_count.max(1))?,
        };

        self.batch(
            vec![Request::unmerge(GridRange::from_region(
                meta.properties.sheet_id,
                Region::from_coords(start, end),
            ))],
            "unmergeCells",
            range_string(start, end),
        )
    }

    /// Attach a basic filter; defaults cover the whole worksheet.
    pub fn add_filter(&mut self, start: Option<CellRef>, end: Option<CellRef>) -> Result<()> {
        let meta = self.open_meta()?;
        let grid = meta.properties.grid_properties;

        let start = match start {
            Some(cell) => cell.resolve()?,
            None => Coord::new(1, 1)?,
        };
        let end = match end {
            Some(cell) => cell.resolve()?,
            None => Coord::new(grid.row_count.max(1), grid.column_count.max(1))?,
        };

        self.batch(
            vec![Request::basic_filter(GridRange::from_region(
                meta.properties.sheet_id,
                Region::from_coords(start, end),
            ))],
            "setBasicFilter",
            range_string(start, end),
        )
    }

    /// Share the spreadsheet; see [`Permission`] for the string format.
    pub fn add_permission(&self, spec: &str) -> Result<()> {
        let permission: Permission = spec.parse()?;
        with_retry(&self.config.retry, "permissions.create", || {
            self.api
                .create_permission(&self.spreadsheet_id, &permission)
        })
        .map_err(|source| ClientError::Remote {
            operation: "permissions.create",
            context: spec.to_string(),
            source,
        })
    }

    pub fn add_permissions(&self, specs: &[&str]) -> Result<()> {
        for spec in specs {
            self.add_permission(spec)?;
        }
        Ok(())
    }

    pub fn list_permissions(&self) -> Result<Vec<PermissionInfo>> {
        with_retry(&self.config.retry, "permissions.list", || {
            self.api.list_permissions(&self.spreadsheet_id)
        })
        .map_err(|source| ClientError::Remote {
            operation: "permissions.list",
            context: self.spreadsheet_id.clone(),
            source,
        })
    }

    fn refresh_metadata(&mut self) -> Result<()> {
        let meta = with_retry(&self.config.retry, "spreadsheets.get", || {
            self.api.spreadsheet_meta(&self.spreadsheet_id)
        })
        .map_err(|source| ClientError::Remote {
            operation: "spreadsheets.get",
            context: self.spreadsheet_id.clone(),
            source,
        })?;

        tracing::debug!(
            spreadsheet = %self.spreadsheet_id,
            sheets = meta.sheets.len(),
            "metadata refreshed"
        );
        self.spreadsheet_title = meta.properties.title;
        self.sheets = meta.sheets;
        if let Some(id) = self.open_sheet_id {
            if !self.sheets.iter().any(|s| s.properties.sheet_id == id) {
                self.open_sheet_id = None;
            }
        }
        self.metadata_stale = false;
        Ok(())
    }

    fn ensure_fresh(&mut self) -> Result<()> {
        if self.metadata_stale {
            self.refresh_metadata()?;
        }
        Ok(())
    }

    /// Metadata of the open worksheet, refreshed first if stale.
    fn open_meta(&mut self) -> Result<WorksheetMeta> {
        self.ensure_fresh()?;
        let id = self.open_sheet_id.ok_or(ClientError::NoWorksheetOpen)?;
        self.sheets
            .iter()
            .find(|s| s.properties.sheet_id == id)
            .cloned()
            .ok_or_else(|| ClientError::WorksheetNotFound(format!("sheet id {id}")))
    }

    fn batch(
        &mut self,
        requests: Vec<Request>,
        operation: &'static str,
        context: String,
    ) -> Result<()> {
        with_retry(&self.config.retry, operation, || {
            self.api.batch_update(&self.spreadsheet_id, &requests)
        })
        .map_err(|source| ClientError::Remote {
            operation,
            context,
            source,
        })?;
        self.metadata_stale = true;
        Ok(())
    }

    fn remote_values_get(&self, range: &str) -> Result<Vec<Vec<String>>> {
        with_retry(&self.config.retry, "values.get", || {
            self.api.values_get(&self.spreadsheet_id, range)
        })
        .map_err(|source| ClientError::Remote {
            operation: "values.get",
            context: range.to_string(),
            source,
        })
    }
}

fn open_spreadsheet<A: SheetsApi + DriveApi>(
    api: &A,
    retry: &RetryPolicy,
    spread: &str,
    create: bool,
) -> Result<crate::api::SpreadsheetMeta> {
    if let Some(key) = spreadsheet_key(spread) {
        return match with_retry(retry, "spreadsheets.get", || api.spreadsheet_meta(&key)) {
            Ok(meta) => Ok(meta),
            Err(ApiError::NotFound(_)) if create => create_spreadsheet(api, retry, spread),
            Err(ApiError::NotFound(_)) => Err(ClientError::SpreadsheetNotFound(spread.to_string())),
            Err(source) => Err(ClientError::Remote {
                operation: "spreadsheets.get",
                context: key,
                source,
            }),
        };
    }

    // plain title: search the directory
    let query = format!(
        "mimeType='{}' and name='{}'",
        SPREADSHEET_MIME,
        spread.replace('\'', "\\'")
    );
    let files = with_retry(retry, "files.list", || api.list_files(&query)).map_err(|source| {
        ClientError::Remote {
            operation: "files.list",
            context: query.clone(),
            source,
        }
    })?;

    match files.iter().find(|f| f.name == spread) {
        Some(file) => {
            let id = file.id.clone();
            with_retry(retry, "spreadsheets.get", || api.spreadsheet_meta(&id)).map_err(
                |source| match source {
                    ApiError::NotFound(_) => ClientError::SpreadsheetNotFound(spread.to_string()),
                    source => ClientError::Remote {
                        operation: "spreadsheets.get",
                        context: id.clone(),
                        source,
                    },
                },
            )
        }
        None if create => create_spreadsheet(api, retry, spread),
        None => Err(ClientError::SpreadsheetNotFound(spread.to_string())),
    }
}

fn create_spreadsheet<A: SheetsApi>(
    api: &A,
    retry: &RetryPolicy,
    title: &str,
) -> Result<crate::api::SpreadsheetMeta> {
    let meta = with_retry(retry, "spreadsheets.create", || {
        api.create_spreadsheet(title)
    })
    .map_err(|source| ClientError::CreateFailed {
        title: title.to_string(),
        source,
    })?;
    tracing::info!(spreadsheet = title, id = %meta.spreadsheet_id, "created spreadsheet");
    Ok(meta)
}

/// Extract the spreadsheet key from a bare key or a full url; `None` means
/// the input is a plain title.
fn spreadsheet_key(spread: &str) -> Option<String> {
    if SPREADSHEET_KEY.is_match(spread) {
        return Some(spread.to_string());
    }
    if spread.contains(SPREADSHEET_URL_MARKER) {
        if let Some(captures) = URL_KEY.captures(spread) {
            return Some(captures[1].to_string());
        }
    }
    None
}

/// Quote a worksheet title for use in a range, doubling embedded quotes.
fn quoted_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn sheet_range(title: &str, range: &str) -> String {
    format!("{}!{}", quoted_title(title), range)
}

fn resolve_rect(start: CellRef, end: CellRef) -> Result<(Coord, Coord)> {
    let start = start.resolve()?;
    let end = end.resolve()?;
    if end.row < start.row || end.col < start.col {
        return Err(FrameError::InvalidAddress {
            input: format!("{}:{}", start.to_a1(), end.to_a1()),
        }
        .into());
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_key_detection() {
        let key = "1u626GkYm1RAJSmHcGyd5_VsHNr_c_IfUcE_W-fQGxIM";
        assert_eq!(key.len(), 44);
        assert_eq!(spreadsheet_key(key).as_deref(), Some(key));
        assert_eq!(
            spreadsheet_key(&format!(
                "https://docs.google.com/spreadsheets/d/{key}/edit#gid=0"
            ))
            .as_deref(),
            Some(key)
        );
        assert_eq!(spreadsheet_key("Quarterly Numbers"), None);
        assert_eq!(spreadsheet_key("short-key"), None);
    }

    #[test]
    fn test_quoted_title() {
        assert_eq!(quoted_title("Sheet1"), "'Sheet1'");
        assert_eq!(quoted_title("Bob's sheet"), "'Bob''s sheet'");
        assert_eq!(sheet_range("Sheet1", "A1:B2"), "'Sheet1'!A1:B2");
    }

    #[test]
    fn test_resolve_rect_orders() {
        let (start, end) = resolve_rect("A1".into(), CellRef::Tuple(3, 2)).unwrap();
        assert_eq!(start, Coord { row: 1, col: 1 });
        assert_eq!(end, Coord { row: 3, col: 2 });
        assert!(resolve_rect("B2".into(), "A1".into()).is_err());
    }
}
