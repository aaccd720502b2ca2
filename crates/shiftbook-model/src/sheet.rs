use serde::{Deserialize, Serialize};

/// One worksheet's cell values as fetched from the store: row-major strings,
/// first row headers. Missing trailing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSnapshot {
    pub rows: Vec<Vec<String>>,
}

impl SheetSnapshot {
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header titles, trimmed. Empty when the sheet has no rows.
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.iter().map(|h| h.trim().to_string()).collect())
            .unwrap_or_default()
    }

    /// 0-based column index of a header title, located by trimmed equality.
    #[must_use]
    pub fn col(&self, title: &str) -> Option<usize> {
        self.rows
            .first()?
            .iter()
            .position(|h| h.trim() == title.trim())
    }

    /// Cell at 0-based (row, col); `""` when out of range.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }

    /// Data rows paired with their 1-based sheet row number (headers are
    /// sheet row 1, so data starts at 2).
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &Vec<String>)> {
        self.rows.iter().enumerate().skip(1).map(|(i, r)| (i + 1, r))
    }
}

/// A1 notation for a 1-based (row, col), e.g. `a1(3, 2) == "B3"`.
#[must_use]
pub fn a1(row: usize, col: usize) -> String {
    let mut letters = String::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    format!("{letters}{row}")
}
