use crate::error::{FrameError, Result};
use std::fmt;
use std::str::FromStr;

/// A cell position, 1-based on both axes ((1, 1) is `A1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    /// Create a coordinate, rejecting zero on either axis.
    pub fn new(row: usize, col: usize) -> Result<Self> {
        if row < 1 || col < 1 {
            return Err(FrameError::invalid_address(format!("({row}, {col})")));
        }
        Ok(Coord { row, col })
    }

    /// Render as A1 notation, e.g. `(1, 1)` -> "A1", `(3, 28)` -> "AB3".
    #[must_use]
    pub fn to_a1(self) -> String {
        format!("{}{}", col_to_letters(self.col), self.row)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl FromStr for Coord {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        parse_a1(s)
    }
}

/// Either format callers are allowed to pass wherever a cell is requested:
/// a 1-based `(row, col)` tuple or an A1 address string. Normalized into a
/// [`Coord`] exactly once at the entry boundary via [`CellRef::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellRef {
    Tuple(usize, usize),
    A1(String),
}

impl CellRef {
    /// Normalize to the canonical coordinate, validating either form.
    pub fn resolve(&self) -> Result<Coord> {
        match self {
            CellRef::Tuple(row, col) => Coord::new(*row, *col),
            CellRef::A1(s) => parse_a1(s),
        }
    }
}

impl From<(usize, usize)> for CellRef {
    fn from((row, col): (usize, usize)) -> Self {
        CellRef::Tuple(row, col)
    }
}

impl From<Coord> for CellRef {
    fn from(coord: Coord) -> Self {
        CellRef::Tuple(coord.row, coord.col)
    }
}

impl From<&str> for CellRef {
    fn from(s: &str) -> Self {
        CellRef::A1(s.to_string())
    }
}

impl From<String> for CellRef {
    fn from(s: String) -> Self {
        CellRef::A1(s)
    }
}

/// Convert a 1-based column number to letters: 1 -> "A", 26 -> "Z",
/// 27 -> "AA". Bijective base-26, so there is no zero digit.
#[must_use]
pub fn col_to_letters(mut col: usize) -> String {
    let mut letters = String::new();
    while col > 0 {
        col -= 1;
        letters.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    letters
}

/// Convert column letters to a 1-based column number, case-insensitive.
pub fn letters_to_col(letters: &str) -> Result<usize> {
    if letters.is_empty() {
        return Err(FrameError::invalid_address(letters));
    }
    let mut col = 0usize;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(FrameError::invalid_address(letters));
        }
        col = col * 26 + usize::from(b.to_ascii_uppercase() - b'A') + 1;
    }
    Ok(col)
}

/// Parse an A1 address like "B12" into a 1-based coordinate.
pub fn parse_a1(s: &str) -> Result<Coord> {
    let split = s
        .bytes()
        .position(|b| b.is_ascii_digit())
        .ok_or_else(|| FrameError::invalid_address(s))?;
    if split == 0 {
        return Err(FrameError::invalid_address(s));
    }

    let col = letters_to_col(&s[..split])?;
    let row: usize = s[split..]
        .parse()
        .map_err(|_| FrameError::invalid_address(s))?;
    if row == 0 {
        return Err(FrameError::invalid_address(s));
    }

    Ok(Coord { row, col })
}

/// Render a rectangular range as "A1:B5". A degenerate range collapses to
/// the single address with no colon, which is what the remote service
/// expects for one-cell requests.
#[must_use]
pub fn range_string(start: Coord, end: Coord) -> String {
    if start == end {
        start.to_a1()
    } else {
        format!("{}:{}", start.to_a1(), end.to_a1())
    }
}

/// Render an open-ended column range like "B2:B": every row of the column
/// from `start` downward. Only meaningful for reads.
pub fn open_col_range(start: Coord, end_col: usize) -> Result<String> {
    if end_col < 1 {
        return Err(FrameError::invalid_address(format!("column {end_col}")));
    }
    Ok(format!("{}:{}", start.to_a1(), col_to_letters(end_col)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letters() {
        assert_eq!(col_to_letters(1), "A");
        assert_eq!(col_to_letters(26), "Z");
        assert_eq!(col_to_letters(27), "AA");
        assert_eq!(col_to_letters(28), "AB");
        assert_eq!(col_to_letters(52), "AZ");
        assert_eq!(col_to_letters(53), "BA");
        assert_eq!(col_to_letters(702), "ZZ");
        assert_eq!(col_to_letters(703), "AAA");
    }

    #[test]
    fn test_letters_to_col() {
        assert_eq!(letters_to_col("A").unwrap(), 1);
        assert_eq!(letters_to_col("z").unwrap(), 26);
        assert_eq!(letters_to_col("aa").unwrap(), 27);
        assert!(letters_to_col("").is_err());
        assert!(letters_to_col("A1").is_err());
    }

    #[test]
    fn test_parse_a1() {
        assert_eq!(parse_a1("A1").unwrap(), Coord { row: 1, col: 1 });
        assert_eq!(parse_a1("b3").unwrap(), Coord { row: 3, col: 2 });
        assert_eq!(parse_a1("AA100").unwrap(), Coord { row: 100, col: 27 });
    }

    #[test]
    fn test_parse_a1_rejects_malformed() {
        for bad in ["", "A", "1", "A0", "1A", "A-1", "A1B", "this is not a cell"] {
            assert!(parse_a1(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_roundtrip() {
        for row in 1..=40 {
            for col in 1..=120 {
                let coord = Coord::new(row, col).unwrap();
                assert_eq!(parse_a1(&coord.to_a1()).unwrap(), coord);
            }
        }
    }

    #[test]
    fn test_coord_rejects_zero() {
        assert!(Coord::new(0, 1).is_err());
        assert!(Coord::new(1, 0).is_err());
    }

    #[test]
    fn test_cell_ref_both_forms() {
        let from_tuple: CellRef = (2, 3).into();
        let from_str: CellRef = "C2".into();
        assert_eq!(from_tuple.resolve().unwrap(), from_str.resolve().unwrap());
        assert!(CellRef::Tuple(0, 0).resolve().is_err());
        assert!(CellRef::from("bogus").resolve().is_err());
    }

    #[test]
    fn test_range_string() {
        let a1 = Coord::new(1, 1).unwrap();
        let b2 = Coord::new(2, 2).unwrap();
        assert_eq!(range_string(a1, a1), "A1");
        assert_eq!(range_string(a1, b2), "A1:B2");
    }

    #[test]
    fn test_open_col_range() {
        let a1 = Coord::new(1, 1).unwrap();
        assert_eq!(open_col_range(a1, 1).unwrap(), "A1:A");
        let b2 = Coord::new(2, 2).unwrap();
        assert_eq!(open_col_range(b2, 2).unwrap(), "B2:B");
    }
}
