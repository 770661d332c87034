use crate::error::{FrameError, Result};
use crate::value::CellValue;
use serde::{Deserialize, Serialize};

/// Column header of a [`Frame`]: one label tuple per column, all of the same
/// depth, plus an optional name per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    labels: Vec<Vec<String>>,
    names: Vec<Option<String>>,
}

impl Header {
    /// Single-level header.
    #[must_use]
    pub fn single(labels: Vec<String>) -> Self {
        Header {
            labels: labels.into_iter().map(|l| vec![l]).collect(),
            names: vec![None],
        }
    }

    /// Multi-level header from per-column label tuples. Every column must
    /// carry the same number of levels, and at least one level.
    pub fn multi(labels: Vec<Vec<String>>) -> Result<Self> {
        let levels = labels.first().map_or(1, Vec::len);
        if levels == 0 {
            return Err(FrameError::encode("header must have at least one level"));
        }
        for label in &labels {
            if label.len() != levels {
                return Err(FrameError::LengthMismatch {
                    expected: levels,
                    actual: label.len(),
                });
            }
        }
        Ok(Header {
            labels,
            names: vec![None; levels],
        })
    }

    /// Attach per-level names; the vector length must match the depth.
    pub fn with_names(mut self, names: Vec<Option<String>>) -> Result<Self> {
        if names.len() != self.levels() {
            return Err(FrameError::LengthMismatch {
                expected: self.levels(),
                actual: names.len(),
            });
        }
        self.names = names;
        Ok(self)
    }

    /// Number of header levels (depth).
    #[must_use]
    pub fn levels(&self) -> usize {
        self.names.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn labels(&self) -> &[Vec<String>] {
        &self.labels
    }

    #[must_use]
    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    /// Label tuple of one column.
    #[must_use]
    pub fn label(&self, col: usize) -> Option<&[String]> {
        self.labels.get(col).map(Vec::as_slice)
    }

    /// Per-column labels with the levels joined by `sep`, skipping empty
    /// levels: `("Q1", "Jan")` -> `"Q1 Jan"` for `sep = " "`.
    #[must_use]
    pub fn flat_labels(&self, sep: &str) -> Vec<String> {
        self.labels
            .iter()
            .map(|label| {
                label
                    .iter()
                    .filter(|level| !level.is_empty())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(sep)
            })
            .collect()
    }

    /// Find a column by name: matches the flattened label (space-joined) or
    /// any single level value.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.flat_labels(" ")
            .iter()
            .position(|flat| flat == name)
            .or_else(|| {
                self.labels
                    .iter()
                    .position(|label| label.iter().any(|level| level == name))
            })
    }
}

/// Row index of a [`Frame`]: one entry tuple per body row plus an optional
/// name per level. A table decoded with no index columns gets the ordinal
/// index `0..n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    entries: Vec<Vec<CellValue>>,
    names: Vec<Option<String>>,
}

impl Index {
    /// Positional index `0..n`, unnamed.
    #[must_use]
    pub fn ordinal(len: usize) -> Self {
        Index {
            entries: (0..len).map(|i| vec![CellValue::Int(i as i64)]).collect(),
            names: vec![None],
        }
    }

    /// Single-level index.
    #[must_use]
    pub fn single(name: Option<String>, entries: Vec<CellValue>) -> Self {
        Index {
            entries: entries.into_iter().map(|e| vec![e]).collect(),
            names: vec![name],
        }
    }

    /// Multi-level index; every entry tuple must match the number of names.
    pub fn multi(names: Vec<Option<String>>, entries: Vec<Vec<CellValue>>) -> Result<Self> {
        if names.is_empty() {
            return Err(FrameError::encode("index must have at least one level"));
        }
        for entry in &entries {
            if entry.len() != names.len() {
                return Err(FrameError::LengthMismatch {
                    expected: names.len(),
                    actual: entry.len(),
                });
            }
        }
        Ok(Index { entries, names })
    }

    /// Number of index levels (depth).
    #[must_use]
    pub fn levels(&self) -> usize {
        self.names.len()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[Vec<CellValue>] {
        &self.entries
    }

    #[must_use]
    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }
}

/// An in-memory labeled table: a column header, a row index, and a body of
/// values. Produced fresh by every decode; holds no reference back to the
/// worksheet it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    header: Header,
    index: Index,
    rows: Vec<Vec<CellValue>>,
}

impl Frame {
    /// Assemble a frame, validating that the index covers every body row and
    /// every body row matches the header width.
    pub fn new(header: Header, index: Index, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        if index.len() != rows.len() {
            return Err(FrameError::LengthMismatch {
                expected: rows.len(),
                actual: index.len(),
            });
        }
        for row in &rows {
            if row.len() != header.len() {
                return Err(FrameError::LengthMismatch {
                    expected: header.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Frame {
            header,
            index,
            rows,
        })
    }

    /// Convenience constructor: single-level header, ordinal index.
    pub fn from_rows<L, T>(labels: Vec<L>, rows: Vec<Vec<T>>) -> Result<Self>
    where
        L: Into<String>,
        T: Into<CellValue>,
    {
        let rows: Vec<Vec<CellValue>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        let header = Header::single(labels.into_iter().map(Into::into).collect());
        let index = Index::ordinal(rows.len());
        Frame::new(header, index, rows)
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of body rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    /// Number of body columns.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.header.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Body cell at 0-based (row, col).
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}
