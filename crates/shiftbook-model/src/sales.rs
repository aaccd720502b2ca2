use crate::employee::EmployeeId;

pub const H_SALES_OPERATION_DATE: &str = "운행일";
pub const H_SALES_SHIFT_TYPE: &str = "근무유형";
pub const H_SALES_EMPLOYEE_ID: &str = "사번";
pub const H_SALES_DRIVER_NAME: &str = "운전기사";
pub const H_SALES_VEHICLE_NUMBER: &str = "차량번호";
pub const H_SALES_VEHICLE_MODEL: &str = "차종";
pub const H_SALES_CASH_FARE: &str = "현금운임";
pub const H_SALES_CARD_FARE: &str = "카드운임";
pub const H_SALES_TOLL_FEE: &str = "통행료";
pub const H_SALES_FUEL_COST: &str = "연료비";
pub const H_SALES_FUEL_USAGE: &str = "연료사용량";
pub const H_SALES_DURATION_MIN: &str = "근무시간(분)";
pub const H_SALES_REMARKS: &str = "특기사항";

/// Loaner-vehicle worksheet of the work spreadsheet. Vehicle number, model
/// and employee id columns reuse the roster titles.
pub const LOANER_SHEET: &str = "대차차량";
pub const H_LOANER_AVAILABLE: &str = "대차가능";
pub const H_LOANER_RETURN_BY: &str = "복귀시간(엄수)";
pub const H_LOANER_APPLIED_ON: &str = "대차신청일";
pub const H_LOANER_APPLIER: &str = "대차사용자";

/// Sales sheets accept dates in either `2026-08-27` or `2026/08/27` form;
/// comparisons and appended rows use the slash form.
#[must_use]
pub fn normalize_operation_date(raw: &str) -> String {
    raw.trim().replace('-', "/")
}

/// One trip record appended to the sales spreadsheet's month worksheet on
/// work end. Fare and fuel amounts are whole won / whole liters; the sheet
/// has no fractional columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRecord {
    /// `%Y/%m/%d`.
    pub operation_date: String,
    pub shift_type: String,
    pub employee_id: EmployeeId,
    pub driver_name: String,
    pub vehicle_number: String,
    pub vehicle_model: String,
    pub cash_fare: i64,
    pub card_fare: i64,
    pub toll_fee: i64,
    pub fuel_cost: i64,
    pub fuel_usage: i64,
    /// Absent when no work-start timestamp could be recovered.
    pub duration_minutes: Option<i64>,
    pub remarks: String,
}

impl SalesRecord {
    /// Lays the record out as one sheet row following the worksheet's own
    /// header order. Unknown header titles produce empty cells so extra
    /// columns added in the spreadsheet UI stay untouched.
    #[must_use]
    pub fn row_values(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|h| match h.trim() {
                H_SALES_OPERATION_DATE => normalize_operation_date(&self.operation_date),
                H_SALES_SHIFT_TYPE => self.shift_type.clone(),
                H_SALES_EMPLOYEE_ID => self.employee_id.as_str().to_string(),
                H_SALES_DRIVER_NAME => self.driver_name.clone(),
                H_SALES_VEHICLE_NUMBER => self.vehicle_number.clone(),
                H_SALES_VEHICLE_MODEL => self.vehicle_model.clone(),
                H_SALES_CASH_FARE => self.cash_fare.to_string(),
                H_SALES_CARD_FARE => self.card_fare.to_string(),
                H_SALES_TOLL_FEE => self.toll_fee.to_string(),
                H_SALES_FUEL_COST => self.fuel_cost.to_string(),
                H_SALES_FUEL_USAGE => self.fuel_usage.to_string(),
                H_SALES_DURATION_MIN => self
                    .duration_minutes
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
                H_SALES_REMARKS => self.remarks.clone(),
                _ => String::new(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SalesRecord {
        SalesRecord {
            operation_date: "2026-08-27".to_string(),
            shift_type: "주간".to_string(),
            employee_id: EmployeeId::parse("1042").expect("valid id"),
            driver_name: "김기사".to_string(),
            vehicle_number: "33바1810".to_string(),
            vehicle_model: "카니발".to_string(),
            cash_fare: 120_000,
            card_fare: 98_500,
            toll_fee: 4_800,
            fuel_cost: 60_000,
            fuel_usage: 42,
            duration_minutes: Some(612),
            remarks: String::new(),
        }
    }

    #[test]
    fn operation_dates_normalize_to_slash_form() {
        assert_eq!(normalize_operation_date("2026-08-27"), "2026/08/27");
        assert_eq!(normalize_operation_date(" 2026/08/27 "), "2026/08/27");
    }

    #[test]
    fn row_follows_header_order_not_struct_order() {
        let headers: Vec<String> = [
            H_SALES_EMPLOYEE_ID,
            H_SALES_OPERATION_DATE,
            H_SALES_CASH_FARE,
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(
            record().row_values(&headers),
            vec!["1042", "2026/08/27", "120000"]
        );
    }

    #[test]
    fn unknown_headers_and_missing_duration_yield_empty_cells() {
        let headers: Vec<String> = ["정산확인", H_SALES_DURATION_MIN]
            .into_iter()
            .map(String::from)
            .collect();
        let mut r = record();
        r.duration_minutes = None;
        assert_eq!(r.row_values(&headers), vec!["", ""]);
    }
}
