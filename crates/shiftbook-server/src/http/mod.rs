// SPDX-License-Identifier: Apache-2.0

use crate::auth::{
    self, hash_password, is_hashed, issue_session_cookie, verify_password, verify_session_cookie,
    Session, DEFAULT_PASSWORD, SESSION_COOKIE,
};
use crate::error::{api_error_response, error_json, ApiError, ApiErrorCode};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::header::{HeaderMap, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use shiftbook_model::{
    DayStatus, EmployeeId, MonthSheet, SalesRecord, WorkNote, DATE_FMT, TIMESTAMP_FMT,
};
use shiftbook_roster::{
    attendance_totals, clamp_year_month, history_counts, month_grid, next_month, prev_month,
    resolve_month_statuses, work_gates, ShiftDuration, WorkGates,
};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

fn session_cookie_header(value: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

fn session_from_headers(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    let raw = cookies.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })?;
    verify_session_cookie(
        state.cfg.session_secret.as_bytes(),
        &raw,
        Local::now().timestamp(),
    )
}

fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, Response> {
    session_from_headers(state, headers).ok_or_else(ApiError::unauthorized)
}

/// Money fields arrive as numbers or comma-grouped strings; anything else
/// counts as zero, matching the sheet's own leniency.
fn money(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => shiftbook_model::parse_lenient_int(s),
        _ => 0,
    }
}

fn opt_text(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    employee_id: String,
    password: String,
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Response {
    let invalid = || {
        api_error_response(
            StatusCode::UNAUTHORIZED,
            error_json(
                ApiErrorCode::InvalidCredentials,
                "unknown employee id or wrong password",
                Value::Null,
            ),
        )
    };
    let Ok(employee_id) = EmployeeId::parse(&req.employee_id) else {
        return invalid();
    };
    let account = match state.repo.account_by_id(employee_id.as_str()).await {
        Ok(Some(account)) => account,
        Ok(None) => return invalid(),
        Err(e) => return ApiError::store(&e),
    };
    if !verify_password(&account.password_hash, &req.password) {
        return invalid();
    }

    // Legacy plaintext cells get upgraded in place on first login.
    if !is_hashed(&account.password_hash) {
        if let Err(e) = state
            .repo
            .set_password_hash(&account, &hash_password(&req.password))
            .await
        {
            warn!(employee = %employee_id, error = %e, "password upgrade failed");
        } else {
            info!(employee = %employee_id, "plaintext password upgraded to hash");
        }
    }

    let ttl = state.cfg.session_ttl.as_secs() as i64;
    let session = Session {
        employee_id: employee_id.as_str().to_string(),
        name: account.name.clone(),
        expires_at_unix: Local::now().timestamp() + ttl,
    };
    let Some(cookie) = issue_session_cookie(state.cfg.session_secret.as_bytes(), &session) else {
        return api_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_json(ApiErrorCode::Internal, "session signing failed", Value::Null),
        );
    };
    (
        [(SET_COOKIE, session_cookie_header(&cookie, ttl))],
        Json(json!({
            "employee_id": employee_id.as_str(),
            "name": account.name,
            "password_change_required": req.password == DEFAULT_PASSWORD,
        })),
    )
        .into_response()
}

pub(crate) async fn logout() -> Response {
    (
        [(SET_COOKIE, session_cookie_header("", 0))],
        Json(json!({"ok": true})),
    )
        .into_response()
}

#[derive(Deserialize)]
pub(crate) struct PasswordChangeRequest {
    new_password: String,
    confirm_password: String,
}

pub(crate) async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordChangeRequest>,
) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if req.new_password != req.confirm_password {
        return ApiError::validation("passwords do not match");
    }
    if let Err(e) = auth::validate_new_password(&req.new_password, &session.employee_id) {
        return ApiError::validation(&e.0);
    }
    let account = match state.repo.account_by_id(&session.employee_id).await {
        Ok(Some(account)) => account,
        Ok(None) => return ApiError::not_found("account not found"),
        Err(e) => return ApiError::store(&e),
    };
    if let Err(e) = state
        .repo
        .set_password_hash(&account, &hash_password(&req.new_password))
        .await
    {
        return ApiError::store(&e);
    }
    info!(employee = %session.employee_id, "password changed");
    Json(json!({"ok": true})).into_response()
}

pub(crate) async fn calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let today = now_local().date();
    let parse_param = |name: &str, default: i32| -> Result<i32, Response> {
        match params.get(name) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ApiError::invalid_param(name, raw)),
        }
    };
    let year = match parse_param("year", today.year()) {
        Ok(y) => y,
        Err(resp) => return resp,
    };
    let month = match parse_param("month", today.month() as i32) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let (year, month) = clamp_year_month(year, month);
    let month_sheet = match MonthSheet::new(month) {
        Ok(m) => m,
        Err(e) => return ApiError::validation(&e.0),
    };

    let rows = match state
        .repo
        .roster_rows(month_sheet, &session.employee_id)
        .await
    {
        Ok(rows) => rows,
        Err(e) => return ApiError::store(&e),
    };
    let statuses = resolve_month_statuses(&rows);
    let totals = attendance_totals(&rows);

    let viewing_current = year == today.year() && u32::from(month) == today.month();
    let today_day = today.day() as u8;
    let gates = if viewing_current {
        work_gates(&statuses, today_day)
    } else {
        WorkGates::default()
    };
    let assignment = if viewing_current {
        shiftbook_roster::vehicle_assignment(&rows, today_day)
    } else {
        None
    };
    let sales = match state
        .repo
        .sales_summary(month_sheet, &session.employee_id)
        .await
    {
        Ok(s) => s,
        Err(e) => return ApiError::store(&e),
    };

    let status_map: HashMap<String, &'static str> = statuses
        .iter()
        .map(|(day, status)| (day.to_string(), status.as_cell()))
        .collect();
    let (py, pm) = prev_month(year, month);
    let (ny, nm) = next_month(year, month);
    Json(json!({
        "year": year,
        "month": month,
        "weeks": month_grid(year, month),
        "statuses": status_map,
        "worked_days": totals.worked_days,
        "absent_days": totals.absent_days,
        "can_start_work": gates.can_start_work,
        "can_end_work": gates.can_end_work,
        "today_vehicle": assignment.as_ref().map(|a| &a.vehicle_number),
        "today_vehicle_model": assignment.as_ref().map(|a| &a.vehicle_model),
        "sales_total_revenue": sales.total_revenue,
        "sales_total_fuel_cost": sales.total_fuel_cost,
        "prev": {"year": py, "month": pm},
        "next": {"year": ny, "month": nm},
    }))
    .into_response()
}

pub(crate) async fn work_start_prefill(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let now = now_local();
    let month = MonthSheet::from_date(now.date());
    let assignment = match state
        .repo
        .assignment(month, &session.employee_id, now.day() as u8)
        .await
    {
        Ok(a) => a,
        Err(e) => return ApiError::store(&e),
    };
    Json(json!({
        "date": now.date().format(DATE_FMT).to_string(),
        "timestamp": now.format(TIMESTAMP_FMT).to_string(),
        "vehicle_number": assignment.as_ref().map(|a| &a.vehicle_number),
        "vehicle_model": assignment.as_ref().map(|a| &a.vehicle_model),
        "shift_type": assignment.as_ref().map(|a| a.shift_type.as_cell()),
    }))
    .into_response()
}

#[derive(Deserialize)]
pub(crate) struct WorkStartRequest {
    /// `%Y/%m/%d`; today when absent.
    date: Option<String>,
    vehicle_number: String,
    shift_type: Option<String>,
    vehicle_report: Option<String>,
    remarks: Option<String>,
}

pub(crate) async fn work_start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WorkStartRequest>,
) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let now = now_local();
    let date = match &req.date {
        None => now.date(),
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), DATE_FMT) {
            Ok(d) => d,
            Err(_) => return ApiError::validation("date must be formatted %Y/%m/%d"),
        },
    };
    let month = MonthSheet::from_date(date);
    let note = WorkNote {
        vehicle_number: Some(req.vehicle_number.trim().to_string()),
        started_at: Some(now.format(TIMESTAMP_FMT).to_string()),
        shift_type: opt_text(&req.shift_type),
        vehicle_report: opt_text(&req.vehicle_report),
        remarks: opt_text(&req.remarks),
    };
    if let Err(e) = state
        .repo
        .update_work_status(
            month,
            &session.employee_id,
            date.day() as u8,
            DayStatus::Worked,
            Some(req.vehicle_number.trim()),
            Some(&note),
        )
        .await
    {
        return ApiError::store(&e);
    }
    info!(employee = %session.employee_id, %month, day = date.day(), "work started");
    Json(json!({
        "ok": true,
        "started_at": note.started_at,
    }))
    .into_response()
}

pub(crate) async fn work_end_prefill(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let now = now_local();
    let info = match state
        .repo
        .work_start_info_with_fallback(&session.employee_id, now.date())
        .await
    {
        Ok(info) => info,
        Err(e) => return ApiError::store(&e),
    };
    let already_recorded = match state
        .repo
        .has_sales_record(
            MonthSheet::from_date(now.date()),
            &session.employee_id,
            now.date(),
        )
        .await
    {
        Ok(b) => b,
        Err(e) => return ApiError::store(&e),
    };
    Json(json!({
        "timestamp": now.format(TIMESTAMP_FMT).to_string(),
        "already_recorded": already_recorded,
        "start": info.map(|i| json!({
            "date": i.date.format(DATE_FMT).to_string(),
            "vehicle_number": i.vehicle_number,
            "vehicle_model": i.vehicle_model,
            "shift_type": i.shift_type,
            "started_at": i.started_at,
            "vehicle_report": i.vehicle_report,
            "remarks": i.remarks,
        })),
    }))
    .into_response()
}

#[derive(Deserialize)]
pub(crate) struct WorkEndRequest {
    vehicle_number: Option<String>,
    shift_type: Option<String>,
    vehicle_report: Option<String>,
    remarks: Option<String>,
    #[serde(default)]
    cash_fare: Value,
    #[serde(default)]
    card_fare: Value,
    #[serde(default)]
    toll_fee: Value,
    #[serde(default)]
    fuel_usage: Value,
    #[serde(default)]
    fuel_cost: Value,
}

pub(crate) async fn work_end(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WorkEndRequest>,
) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let employee_id = match EmployeeId::parse(&session.employee_id) {
        Ok(id) => id,
        Err(e) => return ApiError::validation(&e.0),
    };
    let now = now_local();
    let today = now.date();
    let month = MonthSheet::from_date(today);
    let end_ts = now.format(TIMESTAMP_FMT).to_string();

    let start = match state
        .repo
        .work_start_info_with_fallback(&session.employee_id, today)
        .await
    {
        Ok(info) => info,
        Err(e) => return ApiError::store(&e),
    };

    let vehicle_number = opt_text(&req.vehicle_number)
        .or_else(|| start.as_ref().map(|i| i.vehicle_number.clone()))
        .unwrap_or_default();
    let shift_type = opt_text(&req.shift_type)
        .or_else(|| start.as_ref().map(|i| i.shift_type.clone()))
        .unwrap_or_default();
    // The model comes from the roster of the month the shift started in,
    // which differs from the current month right after midnight on the 1st.
    let model_month = start.as_ref().map_or(month, |i| i.month);
    let vehicle_model = match state
        .repo
        .vehicle_model_for(model_month, &session.employee_id, &vehicle_number)
        .await
    {
        Ok(m) => m,
        Err(e) => return ApiError::store(&e),
    };

    let started_at = start.as_ref().and_then(|i| i.started_at.clone());
    let duration = started_at
        .as_deref()
        .and_then(|s| ShiftDuration::between(s, &end_ts).ok());

    let already_recorded = match state
        .repo
        .has_sales_record(month, &session.employee_id, today)
        .await
    {
        Ok(b) => b,
        Err(e) => return ApiError::store(&e),
    };

    let record = SalesRecord {
        operation_date: today.format(DATE_FMT).to_string(),
        shift_type,
        employee_id,
        driver_name: session.name.clone(),
        vehicle_number: vehicle_number.clone(),
        vehicle_model,
        cash_fare: money(&req.cash_fare),
        card_fare: money(&req.card_fare),
        toll_fee: money(&req.toll_fee),
        fuel_cost: money(&req.fuel_cost),
        fuel_usage: money(&req.fuel_usage),
        duration_minutes: duration.map(ShiftDuration::total_minutes),
        remarks: opt_text(&req.remarks)
            .or_else(|| start.as_ref().and_then(|i| i.remarks.clone()))
            .unwrap_or_default(),
    };

    let mut timing_lines = Vec::new();
    if let Some(s) = &started_at {
        timing_lines.push(format!("운행시작일시: {s}"));
    }
    timing_lines.push(format!("운행종료일시: {end_ts}"));
    if let Some(d) = duration {
        timing_lines.push(format!("근무시간: {d}"));
    }
    let timing_note = timing_lines.join("\n");
    let report_note = opt_text(&req.vehicle_report)
        .or_else(|| start.as_ref().and_then(|i| i.vehicle_report.clone()))
        .map(|r| format!("차량상태: {r}"));

    if let Err(e) = state
        .repo
        .append_sales_record(month, &record, Some(&timing_note), report_note.as_deref())
        .await
    {
        return ApiError::store(&e);
    }
    info!(employee = %session.employee_id, %month, "work ended");
    Json(json!({
        "ok": true,
        "already_recorded": already_recorded,
        "ended_at": end_ts,
        "duration": duration.map(|d| d.to_string()),
        "duration_minutes": duration.map(ShiftDuration::total_minutes),
    }))
    .into_response()
}

pub(crate) async fn set_day_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(day): Path<u8>,
) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if !(1..=31).contains(&day) {
        return ApiError::validation("day must be between 1 and 31");
    }
    let month = MonthSheet::from_date(now_local().date());
    if let Err(e) = state
        .repo
        .update_work_status(month, &session.employee_id, day, DayStatus::Worked, None, None)
        .await
    {
        return ApiError::store(&e);
    }
    Json(json!({"ok": true, "day": day, "status": DayStatus::Worked.as_cell()})).into_response()
}

pub(crate) async fn history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let mut months = Vec::new();
    for month in MonthSheet::all() {
        let rows = match state.repo.roster_rows(month, &session.employee_id).await {
            Ok(rows) => rows,
            // Month sheets that do not exist yet read as empty history.
            Err(_) => Vec::new(),
        };
        if rows.is_empty() {
            continue;
        }
        let counts = history_counts(&rows);
        months.push(json!({
            "month": month.month(),
            "worked_days": counts.worked_days,
            "absent_days": counts.absent_days,
            "scheduled_days": counts.scheduled_days,
            "off_days": counts.off_days,
        }));
    }
    Json(json!({"months": months})).into_response()
}

pub(crate) async fn loaners(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_session(&state, &headers) {
        return resp;
    }
    match state.repo.loaner_vehicles().await {
        Ok(vehicles) => Json(json!({"vehicles": vehicles})).into_response(),
        Err(e) => ApiError::store(&e),
    }
}

#[derive(Deserialize)]
pub(crate) struct LoanerApplyRequest {
    vehicle_number: String,
}

pub(crate) async fn apply_loaner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoanerApplyRequest>,
) -> Response {
    let session = match require_session(&state, &headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let vehicle = req.vehicle_number.trim().to_string();
    if vehicle.is_empty() {
        return ApiError::validation("vehicle_number must not be empty");
    }
    let today = now_local().date();
    match state
        .repo
        .apply_loaner(&vehicle, &session.employee_id, &session.name, today)
        .await
    {
        Ok(true) => {}
        Ok(false) => return ApiError::not_found("loaner vehicle not available"),
        Err(e) => return ApiError::store(&e),
    }
    // The roster note records the swap; a failure here leaves the claim valid.
    if let Err(e) = state
        .repo
        .update_day_note_report(
            MonthSheet::from_date(today),
            &session.employee_id,
            today.day() as u8,
            &format!("{vehicle} (대차)"),
        )
        .await
    {
        warn!(employee = %session.employee_id, error = %e, "loaner note update failed");
    }
    Json(json!({"ok": true, "vehicle_number": vehicle})).into_response()
}

pub(crate) async fn healthz() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

pub(crate) async fn readyz(State(state): State<AppState>) -> Response {
    // A failed startup probe is not final; the accounts sheet may have
    // become reachable since.
    if !state.ready.load(Ordering::Relaxed) {
        match state.repo.accounts().await {
            Ok(_) => state.ready.store(true, Ordering::Relaxed),
            Err(e) => warn!(error = %e, "accounts sheet still unreachable"),
        }
    }
    if state.ready.load(Ordering::Relaxed) {
        Json(json!({"status": "ready"})).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready"})),
        )
            .into_response()
    }
}
