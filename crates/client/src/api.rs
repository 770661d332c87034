//! The boundary to the remote service: collaborator traits, wire types, and
//! the typed batch-update requests the session issues.
//!
//! Everything network-shaped is behind [`SheetsApi`] and [`DriveApi`] so the
//! session and catalog can be exercised against in-memory fakes; the real
//! HTTP implementation lives in [`crate::http`].

use crate::permissions::{Permission, PermissionInfo};
use serde::{Deserialize, Serialize};
use sheetframe_frame::Region;
use thiserror::Error;

pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Failure at the service boundary. Only quota exhaustion is transient;
/// everything else is surfaced immediately.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    BadResponse(String),
}

impl ApiError {
    /// Whether the caller should retry after backing off.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::QuotaExceeded(_))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// How written values are interpreted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInputOption {
    Raw,
    UserEntered,
}

impl ValueInputOption {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

/// How read values are rendered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueRenderOption {
    #[default]
    Formatted,
    Unformatted,
    Formula,
}

impl ValueRenderOption {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueRenderOption::Formatted => "FORMATTED_VALUE",
            ValueRenderOption::Unformatted => "UNFORMATTED_VALUE",
            ValueRenderOption::Formula => "FORMULA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MajorDimension {
    #[default]
    Rows,
    Columns,
}

impl MajorDimension {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MajorDimension::Rows => "ROWS",
            MajorDimension::Columns => "COLUMNS",
        }
    }
}

/// A rectangle in the service's own coordinate space: sheet-scoped, 0-based,
/// half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    pub start_row_index: usize,
    pub end_row_index: usize,
    pub start_column_index: usize,
    pub end_column_index: usize,
}

impl GridRange {
    #[must_use]
    pub fn from_region(sheet_id: i64, region: Region) -> Self {
        GridRange {
            sheet_id,
            start_row_index: region.start_row,
            end_row_index: region.end_row,
            start_column_index: region.start_col,
            end_column_index: region.end_col,
        }
    }

    #[must_use]
    pub fn region(&self) -> Region {
        Region::new(
            self.start_row_index,
            self.end_row_index,
            self.start_column_index,
            self.end_column_index,
        )
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetProperties {
    pub title: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GridProperties {
    pub row_count: usize,
    pub column_count: usize,
    pub frozen_row_count: usize,
    pub frozen_column_count: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub grid_properties: GridProperties,
}

/// Metadata for one worksheet: identity, size, merges, freeze state.
/// Replaced wholesale on every refresh, never patched incrementally.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetMeta {
    pub properties: WorksheetProperties,
    #[serde(default)]
    pub merges: Vec<GridRange>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetMeta {
    pub spreadsheet_id: String,
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<WorksheetMeta>,
}

/// A file visible to the authenticated identity.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub kind: String,
}

impl DriveFile {
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    #[must_use]
    pub fn is_spreadsheet(&self) -> bool {
        self.mime_type == SPREADSHEET_MIME
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum MergeType {
    #[serde(rename = "MERGE_ALL")]
    MergeAll,
    #[serde(rename = "MERGE_ROWS")]
    MergeRows,
    #[serde(rename = "MERGE_COLUMNS")]
    MergeColumns,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MergeCellsRequest {
    pub range: GridRange,
    pub merge_type: MergeType,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnmergeCellsRequest {
    pub range: GridRange,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridPropertiesUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_column_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SheetPropertiesUpdate {
    pub sheet_id: i64,
    pub grid_properties: GridPropertiesUpdate,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSheetPropertiesRequest {
    pub properties: SheetPropertiesUpdate,
    /// Field mask naming exactly the properties being changed; anything not
    /// listed keeps its current value on the remote.
    pub fields: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BasicFilter {
    pub range: GridRange,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SetBasicFilterRequest {
    pub filter: BasicFilter,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddSheetProperties {
    pub title: String,
    pub grid_properties: GridPropertiesUpdate,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AddSheetRequest {
    pub properties: AddSheetProperties,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSheetRequest {
    pub sheet_id: i64,
}

/// One entry of a batch-update call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum Request {
    #[serde(rename = "mergeCells")]
    MergeCells(MergeCellsRequest),
    #[serde(rename = "unmergeCells")]
    UnmergeCells(UnmergeCellsRequest),
    #[serde(rename = "updateSheetProperties")]
    UpdateSheetProperties(UpdateSheetPropertiesRequest),
    #[serde(rename = "setBasicFilter")]
    SetBasicFilter(SetBasicFilterRequest),
    #[serde(rename = "addSheet")]
    AddSheet(AddSheetRequest),
    #[serde(rename = "deleteSheet")]
    DeleteSheet(DeleteSheetRequest),
}

impl Request {
    #[must_use]
    pub fn merge(range: GridRange, merge_type: MergeType) -> Self {
        Request::MergeCells(MergeCellsRequest { range, merge_type })
    }

    #[must_use]
    pub fn unmerge(range: GridRange) -> Self {
        Request::UnmergeCells(UnmergeCellsRequest { range })
    }

    /// Freeze leading rows/columns. An axis passed as `None` is left out of
    /// the field mask and keeps whatever freeze it currently has; `Some(0)`
    /// explicitly unfreezes it.
    #[must_use]
    pub fn freeze(sheet_id: i64, rows: Option<usize>, cols: Option<usize>) -> Self {
        let mut changed = Vec::new();
        if rows.is_some() {
            changed.push("frozenRowCount");
        }
        if cols.is_some() {
            changed.push("frozenColumnCount");
        }
        Request::UpdateSheetProperties(UpdateSheetPropertiesRequest {
            properties: SheetPropertiesUpdate {
                sheet_id,
                grid_properties: GridPropertiesUpdate {
                    frozen_row_count: rows,
                    frozen_column_count: cols,
                    ..GridPropertiesUpdate::default()
                },
            },
            fields: format!("gridProperties({})", changed.join(",")),
        })
    }

    #[must_use]
    pub fn resize(sheet_id: i64, rows: usize, cols: usize) -> Self {
        Request::UpdateSheetProperties(UpdateSheetPropertiesRequest {
            properties: SheetPropertiesUpdate {
                sheet_id,
                grid_properties: GridPropertiesUpdate {
                    row_count: Some(rows),
                    column_count: Some(cols),
                    ..GridPropertiesUpdate::default()
                },
            },
            fields: "gridProperties(rowCount,columnCount)".to_string(),
        })
    }

    #[must_use]
    pub fn basic_filter(range: GridRange) -> Self {
        Request::SetBasicFilter(SetBasicFilterRequest {
            filter: BasicFilter { range },
        })
    }

    #[must_use]
    pub fn add_sheet(title: &str, rows: usize, cols: usize) -> Self {
        Request::AddSheet(AddSheetRequest {
            properties: AddSheetProperties {
                title: title.to_string(),
                grid_properties: GridPropertiesUpdate {
                    row_count: Some(rows),
                    column_count: Some(cols),
                    ..GridPropertiesUpdate::default()
                },
            },
        })
    }

    #[must_use]
    pub fn delete_sheet(sheet_id: i64) -> Self {
        Request::DeleteSheet(DeleteSheetRequest { sheet_id })
    }
}

/// The spreadsheet half of the authenticated session provider.
///
/// Implementations report transient quota pressure as
/// [`ApiError::QuotaExceeded`]; callers own the retry loop.
pub trait SheetsApi {
    fn spreadsheet_meta(&self, spreadsheet_id: &str) -> ApiResult<SpreadsheetMeta>;

    fn create_spreadsheet(&self, title: &str) -> ApiResult<SpreadsheetMeta>;

    /// Fetch a range of cell values. The range may be a bare quoted sheet
    /// title (whole sheet), a rectangle, or an open-ended column range.
    fn values_get(&self, spreadsheet_id: &str, range: &str) -> ApiResult<Vec<Vec<String>>>;

    /// Fetch several ranges in one round trip, e.g. whole columns with a
    /// non-default render option.
    fn values_batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
        render: ValueRenderOption,
        major_dimension: MajorDimension,
    ) -> ApiResult<Vec<Vec<Vec<String>>>>;

    fn values_update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        input: ValueInputOption,
    ) -> ApiResult<()>;

    fn batch_update(&self, spreadsheet_id: &str, requests: &[Request]) -> ApiResult<()>;
}

/// The directory half: file listing and sharing.
pub trait DriveApi {
    /// Run a file query, following result pages to exhaustion.
    fn list_files(&self, query: &str) -> ApiResult<Vec<DriveFile>>;

    fn create_permission(&self, file_id: &str, permission: &Permission) -> ApiResult<()>;

    fn list_permissions(&self, file_id: &str) -> ApiResult<Vec<PermissionInfo>>;

    fn user_email(&self) -> ApiResult<String>;
}
