// SPDX-License-Identifier: Apache-2.0

use super::{SheetDoc, SheetStoreBackend, StoreError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use shiftbook_model::{a1, SheetSnapshot};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{instrument, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSheetsConfig {
    /// Base of the spreadsheets resource, no trailing slash.
    pub base_url: String,
    pub work_spreadsheet_id: String,
    pub sales_spreadsheet_id: String,
    pub auth_bearer: Option<String>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Default for HttpSheetsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            work_spreadsheet_id: String::new(),
            sales_spreadsheet_id: String::new(),
            auth_bearer: None,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Sheets v4 REST backend. Cell notes have no `values/` endpoint, so they go
/// through `batchUpdate`/grid-data reads, which need the numeric sheet id;
/// those are resolved once per worksheet title and memoized.
pub struct HttpSheetsBackend {
    cfg: HttpSheetsConfig,
    client: reqwest::Client,
    sheet_ids: Mutex<HashMap<(SheetDoc, String), i64>>,
}

impl HttpSheetsBackend {
    #[must_use]
    pub fn new(cfg: HttpSheetsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            cfg,
            client,
            sheet_ids: Mutex::new(HashMap::new()),
        }
    }

    fn spreadsheet_id(&self, doc: SheetDoc) -> &str {
        match doc {
            SheetDoc::Work => &self.cfg.work_spreadsheet_id,
            SheetDoc::Sales => &self.cfg.sales_spreadsheet_id,
        }
    }

    /// `{base}/{spreadsheet}/{segments…}`; each segment is pushed through the
    /// url parser so worksheet titles (Korean, parentheses) get escaped.
    fn url(&self, doc: SheetDoc, segments: &[&str]) -> Result<reqwest::Url, StoreError> {
        let mut url = reqwest::Url::parse(&self.cfg.base_url)
            .map_err(|e| StoreError(format!("invalid sheets base url: {e}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| StoreError("sheets base url cannot be a base".to_string()))?;
            path.push(self.spreadsheet_id(doc));
            for seg in segments {
                path.push(seg);
            }
        }
        Ok(url)
    }

    fn auth_headers(&self) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.cfg.auth_bearer {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| StoreError(format!("invalid auth header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    #[instrument(name = "sheets_send_with_retry", skip_all, fields(url = %url))]
    async fn send_with_retry(
        &self,
        url: &reqwest::Url,
        build: impl Fn() -> reqwest::RequestBuilder + Send + Sync,
    ) -> Result<Value, StoreError> {
        let headers = self.auth_headers()?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match build().headers(headers.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let text = resp
                        .text()
                        .await
                        .map_err(|e| StoreError(format!("read body failed: {e}")))?;
                    if text.is_empty() {
                        return Ok(Value::Null);
                    }
                    return serde_json::from_str(&text)
                        .map_err(|e| StoreError(format!("bad sheets response: {e}")));
                }
                Ok(resp) => {
                    if attempt >= self.cfg.retry.max_attempts {
                        return Err(StoreError(format!(
                            "sheets request failed status={} url={url}",
                            resp.status()
                        )));
                    }
                    warn!(status = %resp.status(), attempt, "sheets request failed, retrying");
                }
                Err(e) => {
                    if attempt >= self.cfg.retry.max_attempts {
                        return Err(StoreError(format!("sheets request failed url={url}: {e}")));
                    }
                    warn!(error = %e, attempt, "sheets transport error, retrying");
                }
            }
            tokio::time::sleep(Duration::from_millis(
                self.cfg.retry.base_backoff_ms * attempt as u64,
            ))
            .await;
        }
    }

    async fn sheet_id(&self, doc: SheetDoc, title: &str) -> Result<i64, StoreError> {
        let key = (doc, title.to_string());
        if let Ok(ids) = self.sheet_ids.lock() {
            if let Some(id) = ids.get(&key) {
                return Ok(*id);
            }
        }
        let mut url = self.url(doc, &[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");
        let body = self
            .send_with_retry(&url, || self.client.get(url.clone()))
            .await?;
        let sheets = body["sheets"].as_array().cloned().unwrap_or_default();
        let mut found = None;
        if let Ok(mut ids) = self.sheet_ids.lock() {
            for sheet in &sheets {
                let props = &sheet["properties"];
                if let (Some(t), Some(id)) = (props["title"].as_str(), props["sheetId"].as_i64()) {
                    ids.insert((doc, t.to_string()), id);
                    if t == title {
                        found = Some(id);
                    }
                }
            }
        }
        found.ok_or_else(|| StoreError(format!("worksheet not found: {title}")))
    }
}

#[async_trait]
impl SheetStoreBackend for HttpSheetsBackend {
    async fn fetch_sheet(&self, doc: SheetDoc, title: &str) -> Result<SheetSnapshot, StoreError> {
        let url = self.url(doc, &["values", title])?;
        let body = self
            .send_with_retry(&url, || self.client.get(url.clone()))
            .await?;
        let rows = body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|c| match c {
                                        Value::String(s) => s.clone(),
                                        other => other.to_string(),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(SheetSnapshot::new(rows))
    }

    async fn update_cell(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        let range = format!("{title}!{}", a1(row, col));
        let mut url = self.url(doc, &["values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW");
        let payload = json!({ "values": [[value]] });
        self.send_with_retry(&url, || self.client.put(url.clone()).json(&payload))
            .await?;
        Ok(())
    }

    async fn append_row(
        &self,
        doc: SheetDoc,
        title: &str,
        values: &[String],
    ) -> Result<(), StoreError> {
        let segment = format!("{title}:append");
        let mut url = self.url(doc, &["values", &segment])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let payload = json!({ "values": [values] });
        self.send_with_retry(&url, || self.client.post(url.clone()).json(&payload))
            .await?;
        Ok(())
    }

    async fn read_note(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
    ) -> Result<Option<String>, StoreError> {
        let mut url = self.url(doc, &[])?;
        url.query_pairs_mut()
            .append_pair("ranges", &format!("{title}!{}", a1(row, col)))
            .append_pair("includeGridData", "true")
            .append_pair("fields", "sheets.data.rowData.values.note");
        let body = self
            .send_with_retry(&url, || self.client.get(url.clone()))
            .await?;
        let note = body["sheets"][0]["data"][0]["rowData"][0]["values"][0]["note"]
            .as_str()
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Ok(note)
    }

    async fn write_note(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
        note: &str,
    ) -> Result<(), StoreError> {
        let sheet_id = self.sheet_id(doc, title).await?;
        let url = {
            let mut url = self.url(doc, &[])?;
            let spreadsheet = url
                .path_segments()
                .and_then(|s| s.last())
                .map(str::to_string)
                .ok_or_else(|| StoreError("missing spreadsheet id".to_string()))?;
            url.path_segments_mut()
                .map_err(|()| StoreError("sheets base url cannot be a base".to_string()))?
                .pop()
                .push(&format!("{spreadsheet}:batchUpdate"));
            url
        };
        let payload = json!({
            "requests": [{
                "updateCells": {
                    "start": {
                        "sheetId": sheet_id,
                        "rowIndex": row - 1,
                        "columnIndex": col - 1,
                    },
                    "rows": [{ "values": [{ "note": note }] }],
                    "fields": "note",
                }
            }]
        });
        self.send_with_retry(&url, || self.client.post(url.clone()).json(&payload))
            .await?;
        Ok(())
    }
}
