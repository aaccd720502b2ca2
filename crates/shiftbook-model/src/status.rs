use std::fmt::{Display, Formatter};

/// Resolved status of one roster day. The priority order is fixed:
/// `Worked` > `Absent` > `Scheduled` > `Off`. When one employee owns several
/// rows in a month sheet (one per vehicle/shift), the highest-priority cell
/// wins for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayStatus {
    /// `O` — worked.
    Worked,
    /// `X` — absent.
    Absent,
    /// `R` — scheduled.
    Scheduled,
    /// `/` — off day.
    Off,
}

impl DayStatus {
    /// Parses a raw day cell. Empty cells and unknown tokens carry no status.
    /// `O`/`X`/`R` match case-insensitively; `/` must be exact.
    #[must_use]
    pub fn parse_cell(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if s.eq_ignore_ascii_case("O") {
            return Some(Self::Worked);
        }
        if s.eq_ignore_ascii_case("X") {
            return Some(Self::Absent);
        }
        if s.eq_ignore_ascii_case("R") {
            return Some(Self::Scheduled);
        }
        if s == "/" {
            return Some(Self::Off);
        }
        None
    }

    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Worked => 4,
            Self::Absent => 3,
            Self::Scheduled => 2,
            Self::Off => 1,
        }
    }

    /// The canonical cell value written back to the sheet.
    #[must_use]
    pub const fn as_cell(self) -> &'static str {
        match self {
            Self::Worked => "O",
            Self::Absent => "X",
            Self::Scheduled => "R",
            Self::Off => "/",
        }
    }
}

impl Display for DayStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_cell())
    }
}

/// Shift type of a roster row (`근무유형`). Anything the sheet holds outside
/// the three known values normalizes to `Day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShiftType {
    #[default]
    Day,
    Night,
    Daily,
}

impl ShiftType {
    #[must_use]
    pub fn parse_cell(raw: &str) -> Self {
        match raw.trim() {
            "야간" => Self::Night,
            "일차" => Self::Daily,
            _ => Self::Day,
        }
    }

    #[must_use]
    pub const fn as_cell(self) -> &'static str {
        match self {
            Self::Day => "주간",
            Self::Night => "야간",
            Self::Daily => "일차",
        }
    }
}

impl Display for ShiftType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_cell())
    }
}
