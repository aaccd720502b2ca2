use shiftbook_model::{DayStatus, RosterRow, ShiftType};
use std::collections::BTreeMap;

/// Resolves one day across every row the employee owns in the month: each
/// raw cell is parsed and the highest-priority status wins. Priorities are
/// distinct, so the result is deterministic regardless of row order.
#[must_use]
pub fn resolve_day_status(rows: &[RosterRow], day: u8) -> Option<DayStatus> {
    rows.iter()
        .filter_map(|r| DayStatus::parse_cell(r.day_cell(day)))
        .max_by_key(|s| s.priority())
}

/// Resolved statuses for every day 1..=31 that carries one. Days with no
/// parsable cell in any row are absent from the map.
#[must_use]
pub fn resolve_month_statuses(rows: &[RosterRow]) -> BTreeMap<u8, DayStatus> {
    (1..=31)
        .filter_map(|day| resolve_day_status(rows, day).map(|s| (day, s)))
        .collect()
}

/// The row holding the winning status for a day.
#[must_use]
pub fn best_row_for_day(rows: &[RosterRow], day: u8) -> Option<&RosterRow> {
    rows.iter()
        .filter_map(|r| DayStatus::parse_cell(r.day_cell(day)).map(|s| (s.priority(), r)))
        .max_by_key(|(p, _)| *p)
        .map(|(_, r)| r)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleAssignment {
    pub vehicle_number: String,
    pub vehicle_model: String,
    pub shift_type: ShiftType,
}

/// The vehicle assigned to the employee for a day: the winning row's vehicle
/// when it has one, otherwise the first row in sheet order that does.
#[must_use]
pub fn vehicle_assignment(rows: &[RosterRow], day: u8) -> Option<VehicleAssignment> {
    let from_row = |r: &RosterRow| VehicleAssignment {
        vehicle_number: r.vehicle_number.clone(),
        vehicle_model: r.vehicle_model.clone(),
        shift_type: r.shift_type(),
    };
    if let Some(best) = best_row_for_day(rows, day) {
        if !best.vehicle_number.is_empty() {
            return Some(from_row(best));
        }
    }
    rows.iter()
        .find(|r| !r.vehicle_number.is_empty())
        .map(from_row)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceTotals {
    pub worked_days: i64,
    pub absent_days: i64,
}

/// Sums the `근무일수`/`결근일수` counters across the employee's rows.
#[must_use]
pub fn attendance_totals(rows: &[RosterRow]) -> AttendanceTotals {
    rows.iter().fold(AttendanceTotals::default(), |acc, r| {
        AttendanceTotals {
            worked_days: acc.worked_days + r.worked_days(),
            absent_days: acc.absent_days + r.absent_days(),
        }
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub worked: u32,
    pub absent: u32,
    pub scheduled: u32,
    pub off: u32,
}

/// Per-row status tally from the raw day cells; feeds the counter rewrite
/// after a status update.
#[must_use]
pub fn count_row_statuses(row: &RosterRow) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for cell in row.day_cells.values() {
        match DayStatus::parse_cell(cell) {
            Some(DayStatus::Worked) => counts.worked += 1,
            Some(DayStatus::Absent) => counts.absent += 1,
            Some(DayStatus::Scheduled) => counts.scheduled += 1,
            Some(DayStatus::Off) => counts.off += 1,
            None => {}
        }
    }
    counts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryCounts {
    pub worked_days: i64,
    pub absent_days: i64,
    pub scheduled_days: u32,
    pub off_days: u32,
}

/// One month's history entry. Worked/absent come from the sheet counters
/// (summed over rows); scheduled/off are tallied from the first row's cells,
/// which is where the roster keeps the plan.
#[must_use]
pub fn history_counts(rows: &[RosterRow]) -> HistoryCounts {
    let totals = attendance_totals(rows);
    let (scheduled, off) = rows
        .first()
        .map(|r| {
            let c = count_row_statuses(r);
            (c.scheduled, c.off)
        })
        .unwrap_or_default();
    HistoryCounts {
        worked_days: totals.worked_days,
        absent_days: totals.absent_days,
        scheduled_days: scheduled,
        off_days: off,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkGates {
    pub can_start_work: bool,
    pub can_end_work: bool,
}

impl Default for WorkGates {
    /// The gates for any month other than the current one.
    fn default() -> Self {
        Self {
            can_start_work: true,
            can_end_work: false,
        }
    }
}

/// Gates for the current month: ending a shift requires today to already be
/// resolved as worked; starting one requires the opposite.
#[must_use]
pub fn work_gates(statuses: &BTreeMap<u8, DayStatus>, today: u8) -> WorkGates {
    let worked_today = statuses.get(&today) == Some(&DayStatus::Worked);
    WorkGates {
        can_start_work: !worked_today,
        can_end_work: worked_today,
    }
}
