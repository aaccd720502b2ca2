#![forbid(unsafe_code)]
//! Pure resolution logic over roster rows: day-status resolution under the
//! fixed priority order, attendance aggregates, work gates, calendar grids
//! and shift-duration math. No I/O; everything here is a function of sheet
//! snapshots already fetched by the caller.

mod calendar;
mod resolve;

pub use calendar::{
    clamp_year_month, month_grid, next_month, prev_month, start_lookup_dates, ShiftDuration,
};
pub use resolve::{
    attendance_totals, best_row_for_day, count_row_statuses, history_counts, resolve_day_status,
    resolve_month_statuses, vehicle_assignment, work_gates, AttendanceTotals, HistoryCounts,
    StatusCounts, VehicleAssignment, WorkGates,
};

pub const CRATE_NAME: &str = "shiftbook-roster";
