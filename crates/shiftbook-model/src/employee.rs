use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const ACCOUNTS_SHEET: &str = "accounts";
pub const H_ACCOUNT_EMPLOYEE_ID: &str = "employee_id";
pub const H_ACCOUNT_PASSWORD_HASH: &str = "password_hash";
pub const H_ACCOUNT_NAME: &str = "name";

pub const EMPLOYEE_ID_MAX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("employee id must not be empty".to_string()));
        }
        if s.len() > EMPLOYEE_ID_MAX_LEN {
            return Err(ValidationError(format!(
                "employee id exceeds max length {EMPLOYEE_ID_MAX_LEN}"
            )));
        }
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError(
                "employee id must be a numeric string".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for EmployeeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cell comparison the way the workbooks require it: exact string match after
/// trimming, or numeric equality when both sides parse (sheets store ids
/// sometimes as text, sometimes as numbers).
#[must_use]
pub fn employee_id_matches(cell: &str, wanted: &str) -> bool {
    let cell = cell.trim();
    let wanted = wanted.trim();
    if cell.is_empty() || wanted.is_empty() {
        return false;
    }
    if cell == wanted {
        return true;
    }
    match (cell.parse::<i64>(), wanted.parse::<i64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// One month worksheet of the work spreadsheet. The worksheet title for
/// month `m` is `"{m}월"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthSheet(u8);

impl MonthSheet {
    pub fn new(month: u8) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError(format!("month out of range: {month}")));
        }
        Ok(Self(month))
    }

    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.month() as u8)
    }

    #[must_use]
    pub fn month(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn title(self) -> String {
        format!("{}월", self.0)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (1..=12).map(Self)
    }
}

impl Display for MonthSheet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_id_rejects_non_numeric_and_empty() {
        assert!(EmployeeId::parse("").is_err());
        assert!(EmployeeId::parse("12a4").is_err());
        assert!(EmployeeId::parse(" 1042 ").is_ok());
    }

    #[test]
    fn id_matching_tolerates_numeric_formatting() {
        assert!(employee_id_matches("1042", "1042"));
        assert!(employee_id_matches(" 1042 ", "1042"));
        assert!(employee_id_matches("01042", "1042"));
        assert!(!employee_id_matches("", "1042"));
        assert!(!employee_id_matches("1043", "1042"));
    }

    #[test]
    fn month_sheet_titles_follow_workbook_naming() {
        assert_eq!(MonthSheet::new(1).unwrap().title(), "1월");
        assert_eq!(MonthSheet::new(12).unwrap().title(), "12월");
        assert!(MonthSheet::new(0).is_err());
        assert!(MonthSheet::new(13).is_err());
        assert_eq!(MonthSheet::all().count(), 12);
    }
}
