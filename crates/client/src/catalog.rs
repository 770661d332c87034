//! The directory catalog: what the authenticated identity can see, outside
//! the scope of any single spreadsheet.

use crate::api::{DriveApi, DriveFile, FOLDER_MIME, SPREADSHEET_MIME};
use crate::error::{ClientError, Result};
use crate::retry::{with_retry, RetryPolicy};
use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};

/// Cached view of the spreadsheets and folders reachable by the
/// authenticated identity. The spreadsheet listing is fetched once and kept
/// until [`Catalog::refresh`]; folder queries always go to the service.
pub struct Catalog<D> {
    drive: D,
    retry: RetryPolicy,
    spreadsheets: Option<Vec<DriveFile>>,
}

impl<D: DriveApi> Catalog<D> {
    #[must_use]
    pub fn new(drive: D) -> Self {
        Self::with_retry_policy(drive, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_retry_policy(drive: D, retry: RetryPolicy) -> Self {
        Catalog {
            drive,
            retry,
            spreadsheets: None,
        }
    }

    #[must_use]
    pub fn drive(&self) -> &D {
        &self.drive
    }

    /// All spreadsheets visible to the identity, cached after the first
    /// call.
    pub fn list_spreadsheets(&mut self) -> Result<&[DriveFile]> {
        if self.spreadsheets.is_none() {
            let files = self.query(&format!("mimeType='{SPREADSHEET_MIME}'"))?;
            tracing::debug!(count = files.len(), "cached spreadsheet listing");
            self.spreadsheets = Some(files);
        }
        Ok(self.spreadsheets.as_deref().unwrap_or_default())
    }

    /// Drop the cached listing and re-query.
    pub fn refresh(&mut self) -> Result<()> {
        self.spreadsheets = None;
        self.list_spreadsheets()?;
        Ok(())
    }

    /// Find a spreadsheet by exact name in the cached listing.
    pub fn find_spreadsheet(&mut self, name: &str) -> Result<Option<DriveFile>> {
        Ok(self
            .list_spreadsheets()?
            .iter()
            .find(|f| f.name == name)
            .cloned())
    }

    /// All folders whose name contains `name_query` (matched by the
    /// service, case-insensitively).
    pub fn find_folders(&self, name_query: &str) -> Result<Vec<DriveFile>> {
        self.query(&format!(
            "mimeType='{FOLDER_MIME}' and name contains '{}'",
            escape_query(name_query)
        ))
    }

    /// Spreadsheets directly inside one folder.
    pub fn spreadsheets_in_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        self.query(&format!(
            "mimeType='{SPREADSHEET_MIME}' and '{}' in parents",
            escape_query(folder_id)
        ))
    }

    /// Spreadsheets grouped by each folder matching `name_query`, keyed by
    /// folder name in discovery order.
    pub fn find_spreadsheets_in_folders(
        &self,
        name_query: &str,
    ) -> Result<IndexMap<String, Vec<DriveFile>>> {
        let mut results = IndexMap::new();
        for folder in self.find_folders(name_query)? {
            let files = self.spreadsheets_in_folder(&folder.id)?;
            results.insert(folder.name, files);
        }
        Ok(results)
    }

    /// Walk the folder tree under `root_id` breadth-first, returning every
    /// reachable folder once, in visit order (the root itself excluded).
    ///
    /// `max_depth` bounds the walk: `Some(1)` lists only direct children.
    /// A folder reachable along two paths (or containing itself through a
    /// shortcut) is visited a single time, so cyclic graphs terminate.
    pub fn walk_folder(
        &self,
        root_id: &str,
        max_depth: Option<usize>,
    ) -> Result<Vec<DriveFile>> {
        let mut visited: HashSet<String> = HashSet::from([root_id.to_string()]);
        let mut queue: VecDeque<(String, usize)> = VecDeque::from([(root_id.to_string(), 0)]);
        let mut found = Vec::new();

        while let Some((folder_id, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|limit| depth >= limit) {
                continue;
            }
            for child in self.child_folders(&folder_id)? {
                if visited.insert(child.id.clone()) {
                    queue.push_back((child.id.clone(), depth + 1));
                    found.push(child);
                }
            }
        }

        Ok(found)
    }

    fn child_folders(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        self.query(&format!(
            "mimeType='{FOLDER_MIME}' and '{}' in parents",
            escape_query(folder_id)
        ))
    }

    fn query(&self, q: &str) -> Result<Vec<DriveFile>> {
        with_retry(&self.retry, "files.list", || self.drive.list_files(q)).map_err(|source| {
            ClientError::Remote {
                operation: "files.list",
                context: q.to_string(),
                source,
            }
        })
    }
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
