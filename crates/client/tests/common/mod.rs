//! In-memory fakes of the service boundary for session and catalog tests.
#![allow(dead_code)]

use sheetframe_client::api::{
    ApiError, ApiResult, DriveApi, DriveFile, GridProperties, GridRange, MajorDimension,
    Request, SheetsApi, SpreadsheetMeta, SpreadsheetProperties, ValueInputOption,
    ValueRenderOption, WorksheetMeta, WorksheetProperties, FOLDER_MIME, SPREADSHEET_MIME,
};
use sheetframe_client::permissions::{Permission, PermissionInfo};
use sheetframe_frame::{letters_to_col, parse_a1, Coord};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

pub struct FakeSheet {
    pub id: i64,
    pub title: String,
    pub rows: usize,
    pub cols: usize,
    pub frozen_rows: usize,
    pub frozen_cols: usize,
    pub merges: Vec<GridRange>,
    /// 1-based (row, col) -> value; absent cells are blank.
    pub cells: HashMap<(usize, usize), String>,
    /// Values served for non-default render options; falls back to `cells`.
    pub raw_cells: HashMap<(usize, usize), String>,
}

impl FakeSheet {
    pub fn new(id: i64, title: &str, rows: usize, cols: usize) -> Self {
        FakeSheet {
            id,
            title: title.to_string(),
            rows,
            cols,
            frozen_rows: 0,
            frozen_cols: 0,
            merges: Vec::new(),
            cells: HashMap::new(),
            raw_cells: HashMap::new(),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: &str) {
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value.to_string());
        }
    }

    pub fn get(&self, row: usize, col: usize) -> String {
        self.cells.get(&(row, col)).cloned().unwrap_or_default()
    }

    pub fn get_rendered(&self, row: usize, col: usize, render: ValueRenderOption) -> String {
        if render != ValueRenderOption::Formatted {
            if let Some(value) = self.raw_cells.get(&(row, col)) {
                return value.clone();
            }
        }
        self.get(row, col)
    }

    fn used_extent(&self) -> (usize, usize) {
        let rows = self.cells.keys().map(|&(r, _)| r).max().unwrap_or(0);
        let cols = self.cells.keys().map(|&(_, c)| c).max().unwrap_or(0);
        (rows, cols)
    }
}

#[derive(Default)]
pub struct Inner {
    pub spreadsheet_id: String,
    pub title: String,
    pub sheets: Vec<FakeSheet>,
    pub next_sheet_id: i64,
    pub meta_fetches: usize,
    pub update_attempts: usize,
    /// (range, input option) of every successful values update.
    pub update_log: Vec<(String, String)>,
    pub filter_log: Vec<GridRange>,
    /// Errors handed out by the next values updates before any succeed.
    pub fail_updates: VecDeque<ApiError>,
    pub drive_files: Vec<DriveFile>,
    pub permissions: Vec<PermissionInfo>,
    pub created_permissions: Vec<Permission>,
}

/// A shared-state fake implementing both halves of the service. Cloning
/// shares the underlying state so tests keep a handle for inspection after
/// moving a clone into a `Session`.
#[derive(Clone)]
pub struct FakeApi {
    inner: Rc<RefCell<Inner>>,
}

impl FakeApi {
    pub fn new(spreadsheet_id: &str, title: &str) -> Self {
        FakeApi {
            inner: Rc::new(RefCell::new(Inner {
                spreadsheet_id: spreadsheet_id.to_string(),
                title: title.to_string(),
                next_sheet_id: 100,
                ..Inner::default()
            })),
        }
    }

    /// A fake with one worksheet and its spreadsheet registered in the
    /// drive listing under the spreadsheet title.
    pub fn with_sheet(title: &str, rows: usize, cols: usize) -> Self {
        let fake = Self::new("fake-spreadsheet-id", "Fake Book");
        {
            let mut inner = fake.inner.borrow_mut();
            inner.sheets.push(FakeSheet::new(1, title, rows, cols));
            inner.drive_files.push(DriveFile {
                id: "fake-spreadsheet-id".to_string(),
                name: "Fake Book".to_string(),
                mime_type: SPREADSHEET_MIME.to_string(),
                kind: "drive#file".to_string(),
            });
        }
        fake
    }

    pub fn inner(&self) -> std::cell::Ref<'_, Inner> {
        self.inner.borrow()
    }

    pub fn inner_mut(&self) -> std::cell::RefMut<'_, Inner> {
        self.inner.borrow_mut()
    }

    fn meta(inner: &Inner) -> SpreadsheetMeta {
        SpreadsheetMeta {
            spreadsheet_id: inner.spreadsheet_id.clone(),
            properties: SpreadsheetProperties {
                title: inner.title.clone(),
            },
            sheets: inner
                .sheets
                .iter()
                .enumerate()
                .map(|(ix, sheet)| WorksheetMeta {
                    properties: WorksheetProperties {
                        sheet_id: sheet.id,
                        title: sheet.title.clone(),
                        index: ix,
                        grid_properties: GridProperties {
                            row_count: sheet.rows,
                            column_count: sheet.cols,
                            frozen_row_count: sheet.frozen_rows,
                            frozen_column_count: sheet.frozen_cols,
                        },
                    },
                    merges: sheet.merges.clone(),
                })
                .collect(),
        }
    }
}

/// A parsed fake range: which sheet, and which cells.
enum RangePart {
    Whole,
    Rect { start: Coord, end: Coord },
    OpenCol { start: Coord, end_col: usize },
}

fn parse_range(range: &str) -> (String, RangePart) {
    let (title, rest) = match range.split_once('!') {
        Some((title, rest)) => (title, Some(rest)),
        None => (range, None),
    };
    let title = title.trim_matches('\'').replace("''", "'");

    let part = match rest {
        None => RangePart::Whole,
        Some(rest) => match rest.split_once(':') {
            None => {
                let cell = parse_a1(rest).expect("fake range");
                RangePart::Rect {
                    start: cell,
                    end: cell,
                }
            }
            Some((start, end)) => {
                let start = parse_a1(start).expect("fake range");
                if end.bytes().any(|b| b.is_ascii_digit()) {
                    RangePart::Rect {
                        start,
                        end: parse_a1(end).expect("fake range"),
                    }
                } else {
                    RangePart::OpenCol {
                        start,
                        end_col: letters_to_col(end).expect("fake range"),
                    }
                }
            }
        },
    };
    (title, part)
}

/// Trim trailing blank cells per row and trailing blank rows, the way the
/// real service shapes its value responses.
fn trim_grid(mut grid: Vec<Vec<String>>) -> Vec<Vec<String>> {
    for row in &mut grid {
        while row.last().is_some_and(String::is_empty) {
            row.pop();
        }
    }
    while grid.last().is_some_and(Vec::is_empty) {
        grid.pop();
    }
    grid
}

impl SheetsApi for FakeApi {
    fn spreadsheet_meta(&self, spreadsheet_id: &str) -> ApiResult<SpreadsheetMeta> {
        let mut inner = self.inner.borrow_mut();
        if spreadsheet_id != inner.spreadsheet_id {
            return Err(ApiError::NotFound(spreadsheet_id.to_string()));
        }
        inner.meta_fetches += 1;
        Ok(Self::meta(&inner))
    }

    fn create_spreadsheet(&self, title: &str) -> ApiResult<SpreadsheetMeta> {
        let mut inner = self.inner.borrow_mut();
        inner.spreadsheet_id = format!("created-{title}");
        inner.title = title.to_string();
        inner.sheets = vec![FakeSheet::new(1, "Sheet1", 1000, 26)];
        Ok(Self::meta(&inner))
    }

    fn values_get(&self, _spreadsheet_id: &str, range: &str) -> ApiResult<Vec<Vec<String>>> {
        let inner = self.inner.borrow();
        let (title, part) = parse_range(range);
        let sheet = inner
            .sheets
            .iter()
            .find(|s| s.title == title)
            .ok_or_else(|| ApiError::NotFound(title.clone()))?;

        let (start, end) = match part {
            RangePart::Whole => {
                let (rows, cols) = sheet.used_extent();
                if rows == 0 {
                    return Ok(Vec::new());
                }
                (Coord { row: 1, col: 1 }, Coord { row: rows, col: cols })
            }
            RangePart::Rect { start, end } => (start, end),
            RangePart::OpenCol { start, end_col } => {
                let (rows, _) = sheet.used_extent();
                (
                    start,
                    Coord {
                        row: rows.max(start.row),
                        col: end_col,
                    },
                )
            }
        };

        let grid = (start.row..=end.row)
            .map(|r| (start.col..=end.col).map(|c| sheet.get(r, c)).collect())
            .collect();
        Ok(trim_grid(grid))
    }

    fn values_batch_get(
        &self,
        _spreadsheet_id: &str,
        ranges: &[String],
        render: ValueRenderOption,
        major_dimension: MajorDimension,
    ) -> ApiResult<Vec<Vec<Vec<String>>>> {
        assert_eq!(major_dimension, MajorDimension::Columns);
        let inner = self.inner.borrow();
        let mut out = Vec::new();
        for range in ranges {
            let (title, part) = parse_range(range);
            let sheet = inner
                .sheets
                .iter()
                .find(|s| s.title == title)
                .ok_or_else(|| ApiError::NotFound(title.clone()))?;
            let RangePart::OpenCol { start, end_col } = part else {
                return Err(ApiError::BadResponse(format!("unexpected range {range}")));
            };
            let (rows, _) = sheet.used_extent();
            let mut column: Vec<String> = (start.row..=rows.max(start.row))
                .map(|r| sheet.get_rendered(r, end_col, render))
                .collect();
            while column.last().is_some_and(String::is_empty) {
                column.pop();
            }
            out.push(vec![column]);
        }
        Ok(out)
    }

    fn values_update(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        input: ValueInputOption,
    ) -> ApiResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.update_attempts += 1;
        if let Some(err) = inner.fail_updates.pop_front() {
            return Err(err);
        }

        let (title, part) = parse_range(range);
        let RangePart::Rect { start, .. } = part else {
            return Err(ApiError::BadResponse(format!("unexpected range {range}")));
        };
        let sheet = inner
            .sheets
            .iter_mut()
            .find(|s| s.title == title)
            .ok_or_else(|| ApiError::NotFound(title.clone()))?;

        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet.set(start.row + r, start.col + c, value);
            }
        }

        inner
            .update_log
            .push((range.to_string(), input.as_str().to_string()));
        Ok(())
    }

    fn batch_update(&self, _spreadsheet_id: &str, requests: &[Request]) -> ApiResult<()> {
        let mut inner = self.inner.borrow_mut();
        for request in requests {
            match request {
                Request::AddSheet(req) => {
                    let id = inner.next_sheet_id;
                    inner.next_sheet_id += 1;
                    let rows = req.properties.grid_properties.row_count.unwrap_or(1);
                    let cols = req.properties.grid_properties.column_count.unwrap_or(1);
                    inner
                        .sheets
                        .push(FakeSheet::new(id, &req.properties.title, rows, cols));
                }
                Request::DeleteSheet(req) => {
                    inner.sheets.retain(|s| s.id != req.sheet_id);
                }
                Request::UpdateSheetProperties(req) => {
                    let gp = &req.properties.grid_properties;
                    let sheet_id = req.properties.sheet_id;
                    let sheet = inner
                        .sheets
                        .iter_mut()
                        .find(|s| s.id == sheet_id)
                        .ok_or_else(|| ApiError::NotFound(format!("sheet {sheet_id}")))?;
                    if let Some(rows) = gp.row_count {
                        sheet.rows = rows;
                    }
                    if let Some(cols) = gp.column_count {
                        sheet.cols = cols;
                    }
                    if let Some(frozen) = gp.frozen_row_count {
                        sheet.frozen_rows = frozen;
                    }
                    if let Some(frozen) = gp.frozen_column_count {
                        sheet.frozen_cols = frozen;
                    }
                }
                Request::MergeCells(req) => {
                    let sheet_id = req.range.sheet_id;
                    let sheet = inner
                        .sheets
                        .iter_mut()
                        .find(|s| s.id == sheet_id)
                        .ok_or_else(|| ApiError::NotFound(format!("sheet {sheet_id}")))?;
                    sheet.merges.push(req.range);
                }
                Request::UnmergeCells(req) => {
                    let sheet_id = req.range.sheet_id;
                    let region = req.range.region();
                    let sheet = inner
                        .sheets
                        .iter_mut()
                        .find(|s| s.id == sheet_id)
                        .ok_or_else(|| ApiError::NotFound(format!("sheet {sheet_id}")))?;
                    sheet.merges.retain(|m| !m.region().overlaps(&region));
                }
                Request::SetBasicFilter(req) => {
                    inner.filter_log.push(req.filter.range);
                }
            }
        }
        Ok(())
    }
}

impl DriveApi for FakeApi {
    fn list_files(&self, query: &str) -> ApiResult<Vec<DriveFile>> {
        let inner = self.inner.borrow();
        let mut files: Vec<DriveFile> = inner.drive_files.clone();
        if let Some(name) = extract_between(query, "name='", "'") {
            files.retain(|f| f.name == name);
        }
        if query.contains(SPREADSHEET_MIME) {
            files.retain(|f| f.mime_type == SPREADSHEET_MIME);
        }
        Ok(files)
    }

    fn create_permission(&self, _file_id: &str, permission: &Permission) -> ApiResult<()> {
        self.inner
            .borrow_mut()
            .created_permissions
            .push(permission.clone());
        Ok(())
    }

    fn list_permissions(&self, _file_id: &str) -> ApiResult<Vec<PermissionInfo>> {
        Ok(self.inner.borrow().permissions.clone())
    }

    fn user_email(&self) -> ApiResult<String> {
        Ok("tester@example.com".to_string())
    }
}

fn extract_between<'a>(haystack: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let start = haystack.find(prefix)? + prefix.len();
    let end = haystack[start..].find(suffix)? + start;
    Some(&haystack[start..end])
}

fn parent_id(query: &str) -> Option<&str> {
    let end = query.find("' in parents")?;
    let start = query[..end].rfind('\'')? + 1;
    Some(&query[start..end])
}

/// A drive-only fake with an explicit folder graph, for catalog tests.
#[derive(Clone, Default)]
pub struct FakeDrive {
    inner: Rc<RefCell<DriveInner>>,
}

#[derive(Default)]
pub struct DriveInner {
    pub spreadsheets: Vec<DriveFile>,
    pub folders: Vec<DriveFile>,
    /// folder id -> children (folders and spreadsheets)
    pub children: HashMap<String, Vec<DriveFile>>,
    pub queries: Vec<String>,
}

pub fn folder(id: &str, name: &str) -> DriveFile {
    DriveFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: FOLDER_MIME.to_string(),
        kind: "drive#file".to_string(),
    }
}

pub fn spreadsheet_file(id: &str, name: &str) -> DriveFile {
    DriveFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: SPREADSHEET_MIME.to_string(),
        kind: "drive#file".to_string(),
    }
}

impl FakeDrive {
    pub fn inner_mut(&self) -> std::cell::RefMut<'_, DriveInner> {
        self.inner.borrow_mut()
    }

    pub fn inner(&self) -> std::cell::Ref<'_, DriveInner> {
        self.inner.borrow()
    }

    pub fn add_child(&self, parent: &str, child: DriveFile) {
        self.inner
            .borrow_mut()
            .children
            .entry(parent.to_string())
            .or_default()
            .push(child);
    }
}

impl DriveApi for FakeDrive {
    fn list_files(&self, query: &str) -> ApiResult<Vec<DriveFile>> {
        let mut inner = self.inner.borrow_mut();
        inner.queries.push(query.to_string());

        let want_folders = query.contains(FOLDER_MIME);

        if let Some(parent) = parent_id(query) {
            let children = inner.children.get(parent).cloned().unwrap_or_default();
            return Ok(children
                .into_iter()
                .filter(|f| f.is_folder() == want_folders)
                .collect());
        }

        if want_folders {
            let name_query = extract_between(query, "name contains '", "'").unwrap_or("");
            return Ok(inner
                .folders
                .iter()
                .filter(|f| f.name.to_lowercase().contains(&name_query.to_lowercase()))
                .cloned()
                .collect());
        }

        Ok(inner.spreadsheets.clone())
    }

    fn create_permission(&self, _file_id: &str, _permission: &Permission) -> ApiResult<()> {
        Ok(())
    }

    fn list_permissions(&self, _file_id: &str) -> ApiResult<Vec<PermissionInfo>> {
        Ok(Vec::new())
    }

    fn user_email(&self) -> ApiResult<String> {
        Ok("tester@example.com".to_string())
    }
}
