//! Blocking HTTP implementation of the collaborator traits.
//!
//! Token acquisition and refresh belong to the [`TokenProvider`]; this
//! module only attaches the bearer token it is handed and maps HTTP
//! failures onto [`ApiError`], leaving the retry loop to the caller.

use crate::api::{
    ApiError, ApiResult, DriveApi, DriveFile, MajorDimension, Request, SheetsApi,
    SpreadsheetMeta, ValueInputOption, ValueRenderOption,
};
use crate::permissions::{Permission, PermissionInfo, PermissionTarget};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const GOOGLE_BASE: &str = "https://www.googleapis.com";
const DRIVE_PAGE_SIZE: usize = 1000;

/// Supplies a currently-valid bearer token, refreshing behind the scenes
/// when needed.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> ApiResult<String>;
}

/// A fixed token, for service flows that manage their own lifetime (and for
/// tests).
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> ApiResult<String> {
        Ok(self.0.clone())
    }
}

/// Sheets v4 + Drive v3 over a blocking client.
#[derive(Clone)]
pub struct HttpApi {
    http: Client,
    auth: Arc<dyn TokenProvider>,
    sheets_base: String,
    google_base: String,
}

impl HttpApi {
    pub fn new(auth: Arc<dyn TokenProvider>) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpApi {
            http,
            auth,
            sheets_base: SHEETS_BASE.to_string(),
            google_base: GOOGLE_BASE.to_string(),
        })
    }

    /// Point at different service roots. Used by tests to talk to a local
    /// mock server.
    #[must_use]
    pub fn with_base_urls(mut self, sheets_base: &str, google_base: &str) -> Self {
        self.sheets_base = sheets_base.trim_end_matches('/').to_string();
        self.google_base = google_base.trim_end_matches('/').to_string();
        self
    }

    fn sheets_url(&self, segments: &[&str]) -> ApiResult<reqwest::Url> {
        url_with_segments(&self.sheets_base, segments)
    }

    fn drive_url(&self, segments: &[&str]) -> ApiResult<reqwest::Url> {
        let base = format!("{}/drive/v3/files", self.google_base);
        url_with_segments(&base, segments)
    }

    fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let token = self.auth.token()?;
        let response = builder
            .bearer_auth(token)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .map_err(|e| ApiError::BadResponse(format!("invalid response body: {e}")))
        } else {
            let body = response.text().unwrap_or_default();
            Err(map_status(status, &body))
        }
    }
}

fn url_with_segments(base: &str, segments: &[&str]) -> ApiResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ApiError::BadResponse(format!("invalid base url {base}: {e}")))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| ApiError::BadResponse(format!("invalid base url {base}")))?;
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

/// Classify an error status. Quota pressure shows up as HTTP 429 or as a
/// RESOURCE_EXHAUSTED payload on some endpoints.
fn map_status(status: StatusCode, body: &str) -> ApiError {
    let detail = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));

    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        ApiError::QuotaExceeded(detail)
    } else if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
        ApiError::PermissionDenied(detail)
    } else if status == StatusCode::NOT_FOUND {
        ApiError::NotFound(detail)
    } else {
        ApiError::BadResponse(detail)
    }
}

fn error_message(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    parsed["error"]["message"].as_str().map(ToString::to_string)
}

/// The service returns formatted values as strings but unformatted ones as
/// raw JSON numbers/booleans; normalize everything to the grid's string
/// space.
fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(true) => "TRUE".to_string(),
        serde_json::Value::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    fn into_strings(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PermissionList {
    #[serde(default)]
    permissions: Vec<PermissionInfo>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
}

impl SheetsApi for HttpApi {
    fn spreadsheet_meta(&self, spreadsheet_id: &str) -> ApiResult<SpreadsheetMeta> {
        let url = self.sheets_url(&[spreadsheet_id])?;
        self.execute(self.http.get(url).query(&[(
            "fields",
            "spreadsheetId,properties.title,sheets(properties,merges)",
        )]))
    }

    fn create_spreadsheet(&self, title: &str) -> ApiResult<SpreadsheetMeta> {
        let url = self.sheets_url(&[])?;
        self.execute(
            self.http
                .post(url)
                .json(&json!({ "properties": { "title": title } })),
        )
    }

    fn values_get(&self, spreadsheet_id: &str, range: &str) -> ApiResult<Vec<Vec<String>>> {
        let url = self.sheets_url(&[spreadsheet_id, "values", range])?;
        let range: ValueRange = self.execute(self.http.get(url))?;
        Ok(range.into_strings())
    }

    fn values_batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
        render: ValueRenderOption,
        major_dimension: MajorDimension,
    ) -> ApiResult<Vec<Vec<Vec<String>>>> {
        let url = self.sheets_url(&[spreadsheet_id, "values:batchGet"])?;
        let mut request = self.http.get(url).query(&[
            ("valueRenderOption", render.as_str()),
            ("majorDimension", major_dimension.as_str()),
        ]);
        for range in ranges {
            request = request.query(&[("ranges", range)]);
        }
        let response: BatchGetResponse = self.execute(request)?;
        Ok(response
            .value_ranges
            .into_iter()
            .map(ValueRange::into_strings)
            .collect())
    }

    fn values_update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        input: ValueInputOption,
    ) -> ApiResult<()> {
        let url = self.sheets_url(&[spreadsheet_id, "values", range])?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        self.execute::<serde_json::Value>(
            self.http
                .put(url)
                .query(&[("valueInputOption", input.as_str())])
                .json(&body),
        )?;
        Ok(())
    }

    fn batch_update(&self, spreadsheet_id: &str, requests: &[Request]) -> ApiResult<()> {
        let url = self.sheets_url(&[&format!("{spreadsheet_id}:batchUpdate")])?;
        self.execute::<serde_json::Value>(
            self.http.post(url).json(&json!({ "requests": requests })),
        )?;
        Ok(())
    }
}

impl DriveApi for HttpApi {
    fn list_files(&self, query: &str) -> ApiResult<Vec<DriveFile>> {
        let url = self.drive_url(&[])?;
        let page_size = DRIVE_PAGE_SIZE.to_string();
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(url.clone()).query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("fields", "files(id,name,mimeType,kind),nextPageToken"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: FileList = self.execute(request)?;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(files),
            }
        }
    }

    fn create_permission(&self, file_id: &str, permission: &Permission) -> ApiResult<()> {
        let url = self.drive_url(&[file_id, "permissions"])?;

        let mut body = json!({
            "type": permission.target.type_str(),
            "role": permission.role.as_str(),
        });
        if let Some(email) = permission.target.email() {
            body["emailAddress"] = json!(email);
        }
        if let Some(domain) = permission.target.domain() {
            body["domain"] = json!(domain);
        }
        if matches!(
            permission.target,
            PermissionTarget::Domain(_) | PermissionTarget::Anyone
        ) {
            body["allowFileDiscovery"] = json!(!permission.with_link);
        }

        let mut request = self.http.post(url);
        if permission.target.email().is_some() {
            // only valid for user/group grants
            request = request.query(&[(
                "sendNotificationEmail",
                if permission.notify { "true" } else { "false" },
            )]);
        }

        self.execute::<serde_json::Value>(request.json(&body))?;
        Ok(())
    }

    fn list_permissions(&self, file_id: &str) -> ApiResult<Vec<PermissionInfo>> {
        let url = self.drive_url(&[file_id, "permissions"])?;
        let list: PermissionList = self.execute(self.http.get(url).query(&[(
            "fields",
            "permissions(id,type,role,emailAddress,domain)",
        )]))?;
        Ok(list.permissions)
    }

    fn user_email(&self) -> ApiResult<String> {
        let url = format!("{}/userinfo/v2/me", self.google_base);
        let info: UserInfo = self.execute(self.http.get(url))?;
        Ok(info.email)
    }
}
