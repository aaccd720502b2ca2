// SPDX-License-Identifier: Apache-2.0

use chrono::{Datelike, Local};
use serde_json::{json, Value};
use shiftbook_server::auth::hash_password;
use shiftbook_server::{
    build_router, AppConfig, AppState, FakeSheetStore, SheetCacheConfig, SheetCacheManager,
    SheetDoc, SheetRepository,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const EMPLOYEE: &str = "1042";
const DRIVER_NAME: &str = "김기사";
const VEHICLE: &str = "33바1810";

fn month_headers() -> Vec<String> {
    let mut headers: Vec<String> = ["사번", "차량번호", "차종", "근무유형", "근무일수", "결근일수"]
        .into_iter()
        .map(String::from)
        .collect();
    headers.extend((1..=31).map(|d| d.to_string()));
    headers
}

fn roster_row(day_cells: &[(u8, &str)]) -> Vec<String> {
    let mut row: Vec<String> = [EMPLOYEE, VEHICLE, "카니발", "주간", "0", "0"]
        .into_iter()
        .map(String::from)
        .collect();
    row.extend(std::iter::repeat(String::new()).take(31));
    for (day, value) in day_cells {
        row[5 + *day as usize] = (*value).to_string();
    }
    row
}

fn sales_headers() -> Vec<String> {
    [
        "운행일", "근무유형", "사번", "운전기사", "차량번호", "차종", "현금운임", "카드운임",
        "통행료", "연료비", "연료사용량", "근무시간(분)", "특기사항",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Column (1-based) of a day cell in a month sheet seeded by `month_headers`.
fn day_col(day: u8) -> usize {
    6 + day as usize
}

async fn seed_store(store: &FakeSheetStore, password_cell: &str, day_cells: &[(u8, &str)]) {
    store
        .seed(
            SheetDoc::Work,
            "accounts",
            vec![
                vec![
                    "employee_id".to_string(),
                    "password_hash".to_string(),
                    "name".to_string(),
                ],
                vec![
                    EMPLOYEE.to_string(),
                    password_cell.to_string(),
                    DRIVER_NAME.to_string(),
                ],
            ],
        )
        .await;
    let month_title = format!("{}월", Local::now().month());
    store
        .seed(
            SheetDoc::Work,
            &month_title,
            vec![month_headers(), roster_row(day_cells)],
        )
        .await;
    store
        .seed(SheetDoc::Sales, &month_title, vec![sales_headers()])
        .await;
}

async fn serve(store: Arc<FakeSheetStore>) -> String {
    serve_with_readiness(store, true).await
}

async fn serve_with_readiness(store: Arc<FakeSheetStore>, ready: bool) -> String {
    let cache = Arc::new(SheetCacheManager::new(
        store,
        SheetCacheConfig {
            ttl: Duration::from_secs(30),
            max_entries: 32,
        },
    ));
    let repo = Arc::new(SheetRepository::new(cache));
    let mut cfg = AppConfig::default();
    cfg.sheets.work_spreadsheet_id = "work-test".to_string();
    cfg.sheets.sales_spreadsheet_id = "sales-test".to_string();
    cfg.session_secret = "integration-test-secret".to_string();
    let state = AppState::new(repo, cfg);
    state.ready.store(ready, Ordering::Relaxed);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });
    format!("http://{addr}")
}

async fn login(base: &str, password: &str) -> (reqwest::StatusCode, Value, Option<String>) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/v1/login"))
        .json(&json!({"employee_id": EMPLOYEE, "password": password}))
        .send()
        .await
        .expect("login request");
    let status = resp.status();
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let body: Value = resp.json().await.expect("login body");
    (status, body, cookie)
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_flags_default_password() {
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, "1234", &[]).await;
    let base = serve(store.clone()).await;

    let (status, body, _) = login(&base, "9999").await;
    assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("invalid_credentials"));

    let (status, body, cookie) = login(&base, "1234").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["name"], json!(DRIVER_NAME));
    assert_eq!(body["password_change_required"], json!(true));
    assert!(cookie.expect("cookie").starts_with("shiftbook_session="));

    // The plaintext cell was upgraded in place and still verifies.
    let stored = store.cell(SheetDoc::Work, "accounts", 2, 2).await;
    assert!(stored.starts_with("pbkdf2$"));
    let (status, _, _) = login(&base, "1234").await;
    assert_eq!(status, reqwest::StatusCode::OK);
}

#[tokio::test]
async fn authenticated_routes_require_a_session() {
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, "1234", &[]).await;
    let base = serve(store).await;

    let resp = reqwest::get(format!("{base}/v1/calendar"))
        .await
        .expect("calendar");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("body");
    assert_eq!(body["error"]["code"], json!("unauthorized"));
}

#[tokio::test]
async fn calendar_resolves_statuses_and_gates() {
    let today = Local::now().day() as u8;
    let other_day = if today == 1 { 2 } else { 1 };
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, &hash_password("4711"), &[(today, "O"), (other_day, "R")]).await;
    let base = serve(store).await;
    let (_, _, cookie) = login(&base, "4711").await;
    let cookie = cookie.expect("cookie");

    let body: Value = reqwest::Client::new()
        .get(format!("{base}/v1/calendar"))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("calendar")
        .json()
        .await
        .expect("body");

    assert_eq!(body["statuses"][today.to_string()], json!("O"));
    assert_eq!(body["can_end_work"], json!(true));
    assert_eq!(body["can_start_work"], json!(false));
    assert_eq!(body["today_vehicle"], json!(VEHICLE));
    let weeks = body["weeks"].as_array().expect("weeks");
    assert!(weeks.len() >= 4);

    // A month that is not the current one keeps the default gates.
    let other_month = if Local::now().month() == 1 { 2 } else { 1 };
    let body: Value = reqwest::Client::new()
        .get(format!("{base}/v1/calendar?month={other_month}"))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("calendar")
        .json()
        .await
        .expect("body");
    assert_eq!(body["can_start_work"], json!(true));
    assert_eq!(body["can_end_work"], json!(false));
}

#[tokio::test]
async fn work_start_writes_status_cell_and_note() {
    let today = Local::now().day() as u8;
    let month_title = format!("{}월", Local::now().month());
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, &hash_password("4711"), &[]).await;
    let base = serve(store.clone()).await;
    let (_, _, cookie) = login(&base, "4711").await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/v1/work/start"))
        .header("cookie", cookie.expect("cookie"))
        .json(&json!({
            "vehicle_number": VEHICLE,
            "shift_type": "주간",
            "vehicle_report": "양호",
        }))
        .send()
        .await
        .expect("work start");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let cell = store
        .cell(SheetDoc::Work, &month_title, 2, day_col(today))
        .await;
    assert_eq!(cell, "O");
    let note = store
        .note(SheetDoc::Work, &month_title, 2, day_col(today))
        .await
        .expect("note");
    assert!(note.contains(&format!("운행차량: {VEHICLE}")));
    assert!(note.contains("운행시작일시: "));
    assert!(note.contains("보고사항: 양호"));

    // Counters were recomputed from the row's cells.
    assert_eq!(store.cell(SheetDoc::Work, &month_title, 2, 5).await, "1");
    assert_eq!(store.cell(SheetDoc::Work, &month_title, 2, 6).await, "0");
}

#[tokio::test]
async fn work_end_appends_a_sales_row_with_duration_note() {
    let month_title = format!("{}월", Local::now().month());
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, &hash_password("4711"), &[]).await;
    let base = serve(store.clone()).await;
    let (_, _, cookie) = login(&base, "4711").await;
    let cookie = cookie.expect("cookie");
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/v1/work/start"))
        .header("cookie", &cookie)
        .json(&json!({"vehicle_number": VEHICLE, "shift_type": "주간"}))
        .send()
        .await
        .expect("work start");

    let body: Value = client
        .post(format!("{base}/v1/work/end"))
        .header("cookie", &cookie)
        .json(&json!({
            "cash_fare": "120,000",
            "card_fare": 98_500,
            "toll_fee": 4_800,
            "fuel_cost": 60_000,
            "fuel_usage": 42,
        }))
        .send()
        .await
        .expect("work end")
        .json()
        .await
        .expect("body");
    assert_eq!(body["ok"], json!(true));
    assert!(body["duration_minutes"].is_i64());

    assert_eq!(store.row_count(SheetDoc::Sales, &month_title).await, 2);
    let row = store.last_row(SheetDoc::Sales, &month_title).await;
    // 운행일, 근무유형, 사번, 운전기사, 차량번호, 차종, 현금운임, …
    assert_eq!(row[2], EMPLOYEE);
    assert_eq!(row[3], DRIVER_NAME);
    assert_eq!(row[4], VEHICLE);
    assert_eq!(row[5], "카니발");
    assert_eq!(row[6], "120000");
    assert_eq!(row[7], "98500");

    let timing = store
        .note(SheetDoc::Sales, &month_title, 2, 12)
        .await
        .expect("timing note");
    assert!(timing.contains("운행시작일시: "));
    assert!(timing.contains("운행종료일시: "));

    // A second end on the same day reports the duplicate.
    let body: Value = client
        .post(format!("{base}/v1/work/end"))
        .header("cookie", &cookie)
        .json(&json!({"cash_fare": 0}))
        .send()
        .await
        .expect("work end")
        .json()
        .await
        .expect("body");
    assert_eq!(body["already_recorded"], json!(true));
}

#[tokio::test]
async fn work_end_without_a_start_note_still_appends_the_sales_row() {
    let month_title = format!("{}월", Local::now().month());
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, &hash_password("4711"), &[]).await;
    let base = serve(store.clone()).await;
    let (_, _, cookie) = login(&base, "4711").await;

    let body: Value = reqwest::Client::new()
        .post(format!("{base}/v1/work/end"))
        .header("cookie", cookie.expect("cookie"))
        .json(&json!({"cash_fare": 50_000, "card_fare": 30_000}))
        .send()
        .await
        .expect("work end")
        .json()
        .await
        .expect("body");
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["duration_minutes"], json!(null));
    assert_eq!(body["duration"], json!(null));

    assert_eq!(store.row_count(SheetDoc::Sales, &month_title).await, 2);
    let row = store.last_row(SheetDoc::Sales, &month_title).await;
    // Vehicle comes off the roster row; the duration cell stays empty.
    assert_eq!(row[4], VEHICLE);
    assert_eq!(row[6], "50000");
    assert_eq!(row[11], "");
    let timing = store
        .note(SheetDoc::Sales, &month_title, 2, 12)
        .await
        .expect("timing note");
    assert!(timing.contains("운행종료일시: "));
    assert!(!timing.contains("운행시작일시"));
}

#[tokio::test]
async fn readiness_recovers_once_the_accounts_sheet_is_reachable() {
    let store = Arc::new(FakeSheetStore::default());
    // No accounts sheet seeded yet: the startup probe would have failed.
    let base = serve_with_readiness(store.clone(), false).await;

    let resp = reqwest::get(format!("{base}/readyz")).await.expect("readyz");
    assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    store
        .seed(
            SheetDoc::Work,
            "accounts",
            vec![
                vec![
                    "employee_id".to_string(),
                    "password_hash".to_string(),
                    "name".to_string(),
                ],
                vec![EMPLOYEE.to_string(), "1234".to_string(), DRIVER_NAME.to_string()],
            ],
        )
        .await;
    let resp = reqwest::get(format!("{base}/readyz")).await.expect("readyz");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    // The flag sticks once flipped.
    let resp = reqwest::get(format!("{base}/readyz")).await.expect("readyz");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn password_change_enforces_the_four_digit_rule() {
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, &hash_password("4711"), &[]).await;
    let base = serve(store.clone()).await;
    let (_, _, cookie) = login(&base, "4711").await;
    let cookie = cookie.expect("cookie");
    let client = reqwest::Client::new();

    for bad in [
        json!({"new_password": "12345", "confirm_password": "12345"}),
        json!({"new_password": "abcd", "confirm_password": "abcd"}),
        json!({"new_password": EMPLOYEE, "confirm_password": EMPLOYEE}),
        json!({"new_password": "4712", "confirm_password": "4713"}),
    ] {
        let resp = client
            .post(format!("{base}/v1/password"))
            .header("cookie", &cookie)
            .json(&bad)
            .send()
            .await
            .expect("password change");
        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    }

    let resp = client
        .post(format!("{base}/v1/password"))
        .header("cookie", &cookie)
        .json(&json!({"new_password": "4712", "confirm_password": "4712"}))
        .send()
        .await
        .expect("password change");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let (status, _, _) = login(&base, "4712").await;
    assert_eq!(status, reqwest::StatusCode::OK);
}

#[tokio::test]
async fn loaner_listing_and_claim_update_the_sheet() {
    let today = Local::now().day() as u8;
    let month_title = format!("{}월", Local::now().month());
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, &hash_password("4711"), &[(today, "O")]).await;
    store
        .seed(
            SheetDoc::Work,
            "대차차량",
            vec![
                vec![
                    "차량번호", "차종", "대차가능", "복귀시간(엄수)", "대차신청일", "대차사용자",
                    "사번",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
                vec!["11가0001", "쏘렌토", "O", "22:00", "", "", ""]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                vec!["22나0002", "카니발", "X", "", "", "", ""]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ],
        )
        .await;
    let base = serve(store.clone()).await;
    let (_, _, cookie) = login(&base, "4711").await;
    let cookie = cookie.expect("cookie");
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("{base}/v1/loaners"))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("loaners")
        .json()
        .await
        .expect("body");
    let vehicles = body["vehicles"].as_array().expect("vehicles");
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0]["vehicle_number"], json!("11가0001"));

    let resp = client
        .post(format!("{base}/v1/loaners/apply"))
        .header("cookie", &cookie)
        .json(&json!({"vehicle_number": "11가0001"}))
        .send()
        .await
        .expect("apply");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(store.cell(SheetDoc::Work, "대차차량", 2, 3).await, "X");
    assert_eq!(store.cell(SheetDoc::Work, "대차차량", 2, 6).await, DRIVER_NAME);
    let note = store
        .note(SheetDoc::Work, &month_title, 2, day_col(today))
        .await
        .expect("note");
    assert!(note.contains("보고사항: 11가0001 (대차)"));

    // Claiming an already-taken vehicle fails.
    let resp = client
        .post(format!("{base}/v1/loaners/apply"))
        .header("cookie", &cookie)
        .json(&json!({"vehicle_number": "22나0002"}))
        .send()
        .await
        .expect("apply");
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_aggregates_only_months_with_rows() {
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, &hash_password("4711"), &[(1, "O"), (2, "X"), (3, "R")]).await;
    // A second month with plan-only cells.
    let other_title = if Local::now().month() == 1 { "2월" } else { "1월" };
    store
        .seed(
            SheetDoc::Work,
            other_title,
            vec![month_headers(), roster_row(&[(10, "R"), (11, "/")])],
        )
        .await;
    let base = serve(store).await;
    let (_, _, cookie) = login(&base, "4711").await;

    let body: Value = reqwest::Client::new()
        .get(format!("{base}/v1/history"))
        .header("cookie", &cookie.expect("cookie"))
        .send()
        .await
        .expect("history")
        .json()
        .await
        .expect("body");
    let months = body["months"].as_array().expect("months");
    assert_eq!(months.len(), 2);
    let other: &Value = months
        .iter()
        .find(|m| m["month"] == json!(other_title.trim_end_matches('월').parse::<u8>().expect("month")))
        .expect("other month entry");
    assert_eq!(other["scheduled_days"], json!(1));
    assert_eq!(other["off_days"], json!(1));
}

#[tokio::test]
async fn health_and_readiness_respond() {
    let store = Arc::new(FakeSheetStore::default());
    seed_store(&store, "1234", &[]).await;
    let base = serve(store).await;

    let resp = reqwest::get(format!("{base}/healthz")).await.expect("healthz");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let resp = reqwest::get(format!("{base}/readyz")).await.expect("readyz");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}
