#![forbid(unsafe_code)]
//! Shiftbook domain model SSOT.
//!
//! Everything that touches a spreadsheet cell goes through the types and
//! header constants in this crate. The sheet layout (Korean column titles,
//! day columns `"1"`..`"31"`, `key: value` cell notes) is the wire format of
//! the deployed workbooks and is not negotiable here.

mod employee;
mod note;
mod roster;
mod sales;
mod sheet;
mod status;

pub use employee::{
    employee_id_matches, EmployeeId, MonthSheet, ValidationError, ACCOUNTS_SHEET,
    H_ACCOUNT_EMPLOYEE_ID, H_ACCOUNT_NAME, H_ACCOUNT_PASSWORD_HASH,
};
pub use note::{
    WorkNote, NOTE_REMARKS, NOTE_REPORT, NOTE_SHIFT_TYPE, NOTE_STARTED_AT, NOTE_VEHICLE,
};
pub use roster::{
    day_columns, parse_lenient_int, RosterRow, H_ABSENT_DAYS, H_EMPLOYEE_ID, H_SHIFT_TYPE,
    H_VEHICLE_MODEL, H_VEHICLE_NUMBER, H_WORKED_DAYS,
};
pub use sales::{
    normalize_operation_date, SalesRecord, H_SALES_CARD_FARE, H_SALES_CASH_FARE,
    H_SALES_DRIVER_NAME, H_SALES_DURATION_MIN, H_SALES_EMPLOYEE_ID, H_SALES_FUEL_COST,
    H_SALES_FUEL_USAGE, H_SALES_OPERATION_DATE, H_SALES_REMARKS, H_SALES_SHIFT_TYPE,
    H_SALES_TOLL_FEE, H_SALES_VEHICLE_MODEL, H_SALES_VEHICLE_NUMBER, LOANER_SHEET,
    H_LOANER_APPLIED_ON, H_LOANER_APPLIER, H_LOANER_AVAILABLE, H_LOANER_RETURN_BY,
};
pub use sheet::{a1, SheetSnapshot};
pub use status::{DayStatus, ShiftType};

/// Timestamp format written into work-start notes and sales-row notes.
pub const TIMESTAMP_FMT: &str = "%Y/%m/%d %H:%M:%S";

/// Operation-date format of the sales sheet's first column.
pub const DATE_FMT: &str = "%Y/%m/%d";

pub const CRATE_NAME: &str = "shiftbook-model";
