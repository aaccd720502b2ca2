// SPDX-License-Identifier: Apache-2.0

use crate::cache::SheetCacheManager;
use crate::store::{SheetDoc, StoreError};
use chrono::{Datelike, NaiveDate};
use shiftbook_model::{
    a1, normalize_operation_date, parse_lenient_int, DayStatus, MonthSheet, RosterRow,
    SalesRecord, SheetSnapshot, WorkNote, ACCOUNTS_SHEET, H_ACCOUNT_EMPLOYEE_ID, H_ACCOUNT_NAME,
    H_ACCOUNT_PASSWORD_HASH, H_ABSENT_DAYS, H_EMPLOYEE_ID, H_LOANER_APPLIED_ON, H_LOANER_APPLIER,
    H_LOANER_AVAILABLE, H_LOANER_RETURN_BY, H_SALES_CARD_FARE, H_SALES_CASH_FARE,
    H_SALES_DURATION_MIN, H_SALES_EMPLOYEE_ID, H_SALES_FUEL_COST, H_SALES_OPERATION_DATE,
    H_SALES_VEHICLE_NUMBER, H_VEHICLE_MODEL, H_VEHICLE_NUMBER, H_WORKED_DAYS, LOANER_SHEET,
};
use shiftbook_roster::{count_row_statuses, start_lookup_dates, vehicle_assignment};
use std::sync::Arc;
use tracing::{info, warn};

use shiftbook_model::employee_id_matches;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// 1-based sheet row.
    pub row_index: usize,
    pub employee_id: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkStartInfo {
    pub date: NaiveDate,
    pub month: MonthSheet,
    pub day: u8,
    pub vehicle_number: String,
    pub vehicle_model: String,
    pub shift_type: String,
    /// `%Y/%m/%d %H:%M:%S` from the cell note; absent when no note survived.
    pub started_at: Option<String>,
    pub vehicle_report: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalesSummary {
    /// Cash plus card fares.
    pub total_revenue: i64,
    pub total_fuel_cost: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoanerVehicle {
    pub vehicle_number: String,
    pub vehicle_model: String,
    pub return_by: String,
}

/// All spreadsheet access of the service, expressed in domain terms on top
/// of the snapshot cache.
pub struct SheetRepository {
    cache: Arc<SheetCacheManager>,
}

impl SheetRepository {
    pub fn new(cache: Arc<SheetCacheManager>) -> Self {
        Self { cache }
    }

    pub async fn accounts(&self) -> Result<SheetSnapshot, StoreError> {
        self.cache.sheet(SheetDoc::Work, ACCOUNTS_SHEET).await
    }

    pub async fn account_by_id(&self, employee_id: &str) -> Result<Option<Account>, StoreError> {
        let snapshot = self.accounts().await?;
        let (Some(id_col), Some(hash_col), Some(name_col)) = (
            snapshot.col(H_ACCOUNT_EMPLOYEE_ID),
            snapshot.col(H_ACCOUNT_PASSWORD_HASH),
            snapshot.col(H_ACCOUNT_NAME),
        ) else {
            return Err(StoreError("accounts sheet is missing headers".to_string()));
        };
        for (row_index, _) in snapshot.data_rows() {
            let r = row_index - 1;
            if employee_id_matches(snapshot.cell(r, id_col), employee_id) {
                return Ok(Some(Account {
                    row_index,
                    employee_id: snapshot.cell(r, id_col).trim().to_string(),
                    password_hash: snapshot.cell(r, hash_col).trim().to_string(),
                    name: snapshot.cell(r, name_col).trim().to_string(),
                }));
            }
        }
        Ok(None)
    }

    pub async fn set_password_hash(
        &self,
        account: &Account,
        hash: &str,
    ) -> Result<(), StoreError> {
        let snapshot = self.accounts().await?;
        let col = snapshot
            .col(H_ACCOUNT_PASSWORD_HASH)
            .ok_or_else(|| StoreError("accounts sheet is missing headers".to_string()))?;
        self.cache
            .update_cell(SheetDoc::Work, ACCOUNTS_SHEET, account.row_index, col + 1, hash)
            .await
    }

    pub async fn roster_rows(
        &self,
        month: MonthSheet,
        employee_id: &str,
    ) -> Result<Vec<RosterRow>, StoreError> {
        let snapshot = self.cache.sheet(SheetDoc::Work, &month.title()).await?;
        Ok(RosterRow::rows_for_employee(&snapshot, employee_id))
    }

    /// Writes a status into the employee's day cell, optionally pinning the
    /// row by vehicle number, then stores the note and rewrites the row's
    /// worked/absent counters. Counter cells are sometimes protected in the
    /// live workbook; those failures are logged and swallowed.
    pub async fn update_work_status(
        &self,
        month: MonthSheet,
        employee_id: &str,
        day: u8,
        status: DayStatus,
        vehicle_number: Option<&str>,
        note: Option<&WorkNote>,
    ) -> Result<(), StoreError> {
        let title = month.title();
        let snapshot = self.cache.sheet(SheetDoc::Work, &title).await?;
        let day_col = snapshot
            .col(&day.to_string())
            .ok_or_else(|| StoreError(format!("day column {day} missing in {title}")))?;
        let rows = RosterRow::rows_for_employee(&snapshot, employee_id);
        let row = match vehicle_number.filter(|v| !v.is_empty()) {
            // An explicit vehicle must name one of the employee's rows.
            Some(vehicle) => rows
                .iter()
                .find(|r| r.vehicle_number == vehicle)
                .ok_or_else(|| {
                    StoreError(format!(
                        "employee {employee_id} has no row for vehicle {vehicle} in {title}"
                    ))
                })?,
            None => rows.first().ok_or_else(|| {
                StoreError(format!("employee {employee_id} has no row in {title}"))
            })?,
        };

        self.cache
            .update_cell(SheetDoc::Work, &title, row.row_index, day_col + 1, status.as_cell())
            .await?;
        info!(%title, row = row.row_index, day, status = status.as_cell(), "status written");

        if let Some(note) = note {
            if let Err(e) = self
                .cache
                .write_note(SheetDoc::Work, &title, row.row_index, day_col + 1, &note.format())
                .await
            {
                warn!(%title, cell = %a1(row.row_index, day_col + 1), error = %e, "note write failed");
            }
        }

        self.rewrite_attendance_counters(month, employee_id, row.row_index)
            .await;
        Ok(())
    }

    /// Recounts O/X over the row's day cells and rewrites `근무일수` and
    /// `결근일수`.
    async fn rewrite_attendance_counters(
        &self,
        month: MonthSheet,
        employee_id: &str,
        row_index: usize,
    ) {
        let title = month.title();
        let snapshot = match self.cache.sheet(SheetDoc::Work, &title).await {
            Ok(s) => s,
            Err(e) => {
                warn!(%title, error = %e, "counter refresh fetch failed");
                return;
            }
        };
        let rows = RosterRow::rows_for_employee(&snapshot, employee_id);
        let Some(row) = rows.iter().find(|r| r.row_index == row_index) else {
            return;
        };
        let counts = count_row_statuses(row);
        for (header, value) in [
            (H_WORKED_DAYS, counts.worked),
            (H_ABSENT_DAYS, counts.absent),
        ] {
            let Some(col) = snapshot.col(header) else {
                continue;
            };
            if let Err(e) = self
                .cache
                .update_cell(SheetDoc::Work, &title, row_index, col + 1, &value.to_string())
                .await
            {
                warn!(%title, header, error = %e, "counter write failed, keeping stale value");
            }
        }
    }

    /// Work-start details for a date: the note stored in the day cell of the
    /// employee's rows, preferring the row whose note carries `운행시작일시`.
    /// Falls back to the row's own vehicle columns when no note exists.
    pub async fn work_start_info(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Option<WorkStartInfo>, StoreError> {
        let month = MonthSheet::from_date(date);
        let title = month.title();
        let day = date.day() as u8;
        let snapshot = self.cache.sheet(SheetDoc::Work, &title).await?;
        let Some(day_col) = snapshot.col(&day.to_string()) else {
            return Ok(None);
        };
        let rows = RosterRow::rows_for_employee(&snapshot, employee_id);
        if rows.is_empty() {
            return Ok(None);
        }

        let info_from = |row: &RosterRow, note: Option<WorkNote>| {
            let note = note.unwrap_or_default();
            WorkStartInfo {
                date,
                month,
                day,
                vehicle_number: note
                    .vehicle_number
                    .clone()
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| row.vehicle_number.clone()),
                vehicle_model: row.vehicle_model.clone(),
                shift_type: note
                    .shift_type
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| row.shift_type_raw.clone()),
                started_at: note.started_at,
                vehicle_report: note.vehicle_report,
                remarks: note.remarks,
            }
        };

        let mut first_row_info = None;
        for row in &rows {
            let note = self
                .cache
                .read_note(SheetDoc::Work, &title, row.row_index, day_col + 1)
                .await?
                .map(|n| WorkNote::parse(&n));
            if note
                .as_ref()
                .is_some_and(|n| n.started_at.as_deref().is_some_and(|s| !s.is_empty()))
            {
                return Ok(Some(info_from(row, note)));
            }
            if first_row_info.is_none() {
                first_row_info = Some(info_from(row, note));
            }
        }
        Ok(first_row_info)
    }

    /// Today's info when today's cell has a start note, otherwise
    /// yesterday's (night shifts cross midnight).
    pub async fn work_start_info_with_fallback(
        &self,
        employee_id: &str,
        today: NaiveDate,
    ) -> Result<Option<WorkStartInfo>, StoreError> {
        let mut first = None;
        for date in start_lookup_dates(today) {
            match self.work_start_info(employee_id, date).await? {
                Some(info) if info.started_at.is_some() => return Ok(Some(info)),
                Some(info) => {
                    if first.is_none() {
                        first = Some(info);
                    }
                }
                None => {}
            }
        }
        Ok(first)
    }

    /// The vehicle model the roster assigns to a vehicle number this month.
    pub async fn vehicle_model_for(
        &self,
        month: MonthSheet,
        employee_id: &str,
        vehicle_number: &str,
    ) -> Result<String, StoreError> {
        let rows = self.roster_rows(month, employee_id).await?;
        Ok(rows
            .iter()
            .find(|r| r.vehicle_number == vehicle_number)
            .map(|r| r.vehicle_model.clone())
            .unwrap_or_default())
    }

    /// Appends a sales row following the sheet's own header order, then
    /// attaches the timing note to the `근무시간(분)` cell and the vehicle
    /// report to the `차량번호` cell. Note failures never fail the append.
    pub async fn append_sales_record(
        &self,
        month: MonthSheet,
        record: &SalesRecord,
        timing_note: Option<&str>,
        report_note: Option<&str>,
    ) -> Result<(), StoreError> {
        let title = month.title();
        let snapshot = self.cache.sheet(SheetDoc::Sales, &title).await?;
        if snapshot.is_empty() {
            return Err(StoreError(format!("sales sheet {title} has no headers")));
        }
        let headers = snapshot.headers();
        let next_row = snapshot.rows.len() + 1;
        self.cache
            .append_row(SheetDoc::Sales, &title, &record.row_values(&headers))
            .await?;
        info!(%title, row = next_row, employee = %record.employee_id, "sales row appended");

        let notes = [
            (H_SALES_DURATION_MIN, timing_note),
            (H_SALES_VEHICLE_NUMBER, report_note),
        ];
        for (header, note) in notes {
            let (Some(note), Some(col)) = (note, snapshot.col(header)) else {
                continue;
            };
            if let Err(e) = self
                .cache
                .write_note(SheetDoc::Sales, &title, next_row, col + 1, note)
                .await
            {
                warn!(%title, header, error = %e, "sales note write failed");
            }
        }
        Ok(())
    }

    /// Month revenue/fuel totals for one employee. Unparsable cells count
    /// as zero rather than failing the calendar.
    pub async fn sales_summary(
        &self,
        month: MonthSheet,
        employee_id: &str,
    ) -> Result<SalesSummary, StoreError> {
        let snapshot = match self.cache.sheet(SheetDoc::Sales, &month.title()).await {
            Ok(s) => s,
            Err(e) => {
                warn!(month = %month, error = %e, "sales sheet unavailable, summary empty");
                return Ok(SalesSummary::default());
            }
        };
        let Some(id_col) = snapshot.col(H_SALES_EMPLOYEE_ID) else {
            return Ok(SalesSummary::default());
        };
        let cash_col = snapshot.col(H_SALES_CASH_FARE);
        let card_col = snapshot.col(H_SALES_CARD_FARE);
        let fuel_col = snapshot.col(H_SALES_FUEL_COST);

        let mut summary = SalesSummary::default();
        for (row_index, _) in snapshot.data_rows() {
            let r = row_index - 1;
            if !employee_id_matches(snapshot.cell(r, id_col), employee_id) {
                continue;
            }
            let amount = |col: Option<usize>| {
                col.map_or(0, |c| parse_lenient_int(snapshot.cell(r, c)))
            };
            summary.total_revenue += amount(cash_col) + amount(card_col);
            summary.total_fuel_cost += amount(fuel_col);
        }
        Ok(summary)
    }

    /// Whether the employee already has a sales row for an operation date.
    pub async fn has_sales_record(
        &self,
        month: MonthSheet,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let snapshot = match self.cache.sheet(SheetDoc::Sales, &month.title()).await {
            Ok(s) => s,
            Err(_) => return Ok(false),
        };
        let (Some(id_col), Some(date_col)) = (
            snapshot.col(H_SALES_EMPLOYEE_ID),
            snapshot.col(H_SALES_OPERATION_DATE),
        ) else {
            return Ok(false);
        };
        let wanted = date.format(shiftbook_model::DATE_FMT).to_string();
        for (row_index, _) in snapshot.data_rows() {
            let r = row_index - 1;
            if employee_id_matches(snapshot.cell(r, id_col), employee_id)
                && normalize_operation_date(snapshot.cell(r, date_col)) == wanted
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Loaner vehicles currently marked available (`대차가능 == O`).
    pub async fn loaner_vehicles(&self) -> Result<Vec<LoanerVehicle>, StoreError> {
        let snapshot = self.cache.sheet(SheetDoc::Work, LOANER_SHEET).await?;
        let (Some(vehicle_col), Some(avail_col)) = (
            snapshot.col(H_VEHICLE_NUMBER),
            snapshot.col(H_LOANER_AVAILABLE),
        ) else {
            return Err(StoreError("loaner sheet is missing headers".to_string()));
        };
        let model_col = snapshot.col(H_VEHICLE_MODEL);
        let return_col = snapshot.col(H_LOANER_RETURN_BY);

        let mut out = Vec::new();
        for (row_index, _) in snapshot.data_rows() {
            let r = row_index - 1;
            if !snapshot.cell(r, avail_col).trim().eq_ignore_ascii_case("O") {
                continue;
            }
            let vehicle_number = snapshot.cell(r, vehicle_col).trim().to_string();
            if vehicle_number.is_empty() {
                continue;
            }
            out.push(LoanerVehicle {
                vehicle_number,
                vehicle_model: model_col
                    .map_or(String::new(), |c| snapshot.cell(r, c).trim().to_string()),
                return_by: return_col
                    .map_or(String::new(), |c| snapshot.cell(r, c).trim().to_string()),
            });
        }
        Ok(out)
    }

    /// Claims a loaner: flips availability to `X` and records the applicant
    /// and date. Returns false when the vehicle is unknown or already taken.
    pub async fn apply_loaner(
        &self,
        vehicle_number: &str,
        employee_id: &str,
        name: &str,
        applied_on: NaiveDate,
    ) -> Result<bool, StoreError> {
        let snapshot = self.cache.sheet(SheetDoc::Work, LOANER_SHEET).await?;
        let (Some(vehicle_col), Some(avail_col)) = (
            snapshot.col(H_VEHICLE_NUMBER),
            snapshot.col(H_LOANER_AVAILABLE),
        ) else {
            return Err(StoreError("loaner sheet is missing headers".to_string()));
        };
        let row_index = snapshot
            .data_rows()
            .find(|(i, _)| snapshot.cell(i - 1, vehicle_col).trim() == vehicle_number)
            .map(|(i, _)| i);
        let Some(row_index) = row_index else {
            return Ok(false);
        };
        if !snapshot
            .cell(row_index - 1, avail_col)
            .trim()
            .eq_ignore_ascii_case("O")
        {
            return Ok(false);
        }

        let updates = [
            (Some(avail_col), "X".to_string()),
            (
                snapshot.col(H_LOANER_APPLIED_ON),
                applied_on.format(shiftbook_model::DATE_FMT).to_string(),
            ),
            (snapshot.col(H_LOANER_APPLIER), name.to_string()),
            (snapshot.col(H_EMPLOYEE_ID), employee_id.to_string()),
        ];
        for (col, value) in updates {
            let Some(col) = col else { continue };
            self.cache
                .update_cell(SheetDoc::Work, LOANER_SHEET, row_index, col + 1, &value)
                .await?;
        }
        info!(vehicle = vehicle_number, employee = employee_id, "loaner claimed");
        Ok(true)
    }

    /// Rewrites the `보고사항` line of the day-cell note after a loaner swap,
    /// on the row whose note holds `운행시작일시` (first row as fallback).
    pub async fn update_day_note_report(
        &self,
        month: MonthSheet,
        employee_id: &str,
        day: u8,
        report: &str,
    ) -> Result<(), StoreError> {
        let title = month.title();
        let snapshot = self.cache.sheet(SheetDoc::Work, &title).await?;
        let day_col = snapshot
            .col(&day.to_string())
            .ok_or_else(|| StoreError(format!("day column {day} missing in {title}")))?;
        let rows = RosterRow::rows_for_employee(&snapshot, employee_id);
        if rows.is_empty() {
            return Err(StoreError(format!(
                "employee {employee_id} has no row in {title}"
            )));
        }

        let mut target = None;
        for row in &rows {
            let note = self
                .cache
                .read_note(SheetDoc::Work, &title, row.row_index, day_col + 1)
                .await?;
            let parsed = note.as_deref().map(WorkNote::parse);
            if parsed.as_ref().is_some_and(|n| n.started_at.is_some()) {
                target = Some((row.row_index, note.unwrap_or_default()));
                break;
            }
            if target.is_none() {
                target = Some((row.row_index, note.unwrap_or_default()));
            }
        }
        if let Some((row_index, body)) = target {
            let updated = WorkNote::rewrite_report_line(&body, report);
            self.cache
                .write_note(SheetDoc::Work, &title, row_index, day_col + 1, &updated)
                .await?;
        }
        Ok(())
    }

    /// Vehicle assignment for a day, straight off the roster.
    pub async fn assignment(
        &self,
        month: MonthSheet,
        employee_id: &str,
        day: u8,
    ) -> Result<Option<shiftbook_roster::VehicleAssignment>, StoreError> {
        let rows = self.roster_rows(month, employee_id).await?;
        Ok(vehicle_assignment(&rows, day))
    }
}
