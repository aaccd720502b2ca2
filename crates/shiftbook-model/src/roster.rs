use crate::employee::employee_id_matches;
use crate::sheet::SheetSnapshot;
use crate::status::ShiftType;
use std::collections::BTreeMap;

pub const H_EMPLOYEE_ID: &str = "사번";
pub const H_VEHICLE_NUMBER: &str = "차량번호";
pub const H_VEHICLE_MODEL: &str = "차종";
pub const H_SHIFT_TYPE: &str = "근무유형";
pub const H_WORKED_DAYS: &str = "근무일수";
pub const H_ABSENT_DAYS: &str = "결근일수";

/// Integer parsing the way the sheets demand it: trim, strip comma grouping,
/// and degrade to 0 on anything unparsable.
#[must_use]
pub fn parse_lenient_int(raw: &str) -> i64 {
    let s: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if s.is_empty() {
        return 0;
    }
    s.parse().unwrap_or(0)
}

/// Day columns of a month sheet: headers that parse as a day number 1..=31,
/// as 0-based `(column, day)` pairs.
#[must_use]
pub fn day_columns(headers: &[String]) -> Vec<(usize, u8)> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| {
            let day: u8 = h.trim().parse().ok()?;
            (1..=31).contains(&day).then_some((idx, day))
        })
        .collect()
}

/// One roster row of a month sheet. An employee may own several rows in the
/// same month (one per vehicle/shift type); callers resolve across them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    /// 1-based sheet row, for cell writes.
    pub row_index: usize,
    pub employee_id: String,
    pub vehicle_number: String,
    pub vehicle_model: String,
    pub shift_type_raw: String,
    pub worked_days_raw: String,
    pub absent_days_raw: String,
    /// Raw day cells keyed by day number; only days whose column exists.
    pub day_cells: BTreeMap<u8, String>,
}

impl RosterRow {
    /// All rows of `snapshot` belonging to `employee_id`.
    #[must_use]
    pub fn rows_for_employee(snapshot: &SheetSnapshot, employee_id: &str) -> Vec<Self> {
        let Some(id_col) = snapshot.col(H_EMPLOYEE_ID) else {
            return Vec::new();
        };
        let headers = snapshot.headers();
        let days = day_columns(&headers);
        let col_of = |title: &str| snapshot.col(title);
        let vehicle_col = col_of(H_VEHICLE_NUMBER);
        let model_col = col_of(H_VEHICLE_MODEL);
        let shift_col = col_of(H_SHIFT_TYPE);
        let worked_col = col_of(H_WORKED_DAYS);
        let absent_col = col_of(H_ABSENT_DAYS);

        let mut out = Vec::new();
        for (row_index, _) in snapshot.data_rows() {
            let r = row_index - 1;
            if !employee_id_matches(snapshot.cell(r, id_col), employee_id) {
                continue;
            }
            let get = |col: Option<usize>| {
                col.map_or(String::new(), |c| snapshot.cell(r, c).trim().to_string())
            };
            let day_cells = days
                .iter()
                .map(|&(col, day)| (day, snapshot.cell(r, col).to_string()))
                .collect();
            out.push(Self {
                row_index,
                employee_id: snapshot.cell(r, id_col).trim().to_string(),
                vehicle_number: get(vehicle_col),
                vehicle_model: get(model_col),
                shift_type_raw: get(shift_col),
                worked_days_raw: get(worked_col),
                absent_days_raw: get(absent_col),
                day_cells,
            });
        }
        out
    }

    /// Raw cell for a day; `""` when the day column does not exist.
    #[must_use]
    pub fn day_cell(&self, day: u8) -> &str {
        self.day_cells.get(&day).map_or("", String::as_str)
    }

    #[must_use]
    pub fn shift_type(&self) -> ShiftType {
        ShiftType::parse_cell(&self.shift_type_raw)
    }

    #[must_use]
    pub fn worked_days(&self) -> i64 {
        parse_lenient_int(&self.worked_days_raw)
    }

    #[must_use]
    pub fn absent_days(&self) -> i64 {
        parse_lenient_int(&self.absent_days_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month_sheet() -> SheetSnapshot {
        SheetSnapshot::new(vec![
            vec![
                "사번", "차량번호", "차종", "근무유형", "근무일수", "결근일수", "1", "2", "3",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            vec!["1042", "33바1810", "카니발", "주간", "12", "1", "O", "", "R"]
                .into_iter()
                .map(String::from)
                .collect(),
            vec!["1042", "77사2001", "스타리아", "야간", "3", "0", "", "X", ""]
                .into_iter()
                .map(String::from)
                .collect(),
            vec!["2077", "11가0001", "쏘렌토", "주간", "20", "2", "O", "O", "O"]
                .into_iter()
                .map(String::from)
                .collect(),
        ])
    }

    #[test]
    fn lenient_int_strips_commas_and_degrades_to_zero() {
        assert_eq!(parse_lenient_int("12,000"), 12_000);
        assert_eq!(parse_lenient_int(" 7 "), 7);
        assert_eq!(parse_lenient_int(""), 0);
        assert_eq!(parse_lenient_int("abc"), 0);
    }

    #[test]
    fn day_columns_only_accept_1_to_31() {
        let headers: Vec<String> = ["사번", "0", "1", "31", "32", "x"]
            .into_iter()
            .map(String::from)
            .collect();
        let days: Vec<u8> = day_columns(&headers).into_iter().map(|(_, d)| d).collect();
        assert_eq!(days, vec![1, 31]);
    }

    #[test]
    fn rows_for_employee_collects_every_matching_row() {
        let rows = RosterRow::rows_for_employee(&month_sheet(), "1042");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 2);
        assert_eq!(rows[0].vehicle_number, "33바1810");
        assert_eq!(rows[0].day_cell(1), "O");
        assert_eq!(rows[1].shift_type(), ShiftType::Night);
        assert_eq!(rows[0].worked_days() + rows[1].worked_days(), 15);
    }

    #[test]
    fn missing_employee_yields_no_rows() {
        assert!(RosterRow::rows_for_employee(&month_sheet(), "9999").is_empty());
    }
}
