// SPDX-License-Identifier: Apache-2.0

use super::{SheetDoc, SheetStoreBackend, StoreError};
use async_trait::async_trait;
use shiftbook_model::SheetSnapshot;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct FakeSheet {
    rows: Vec<Vec<String>>,
    notes: HashMap<(usize, usize), String>,
}

/// In-memory spreadsheet pair for tests. Cells grow on demand; writes to a
/// cell listed in `protected_cells` fail the way the live API rejects writes
/// to protected ranges.
#[derive(Default)]
pub struct FakeSheetStore {
    sheets: Mutex<HashMap<(SheetDoc, String), FakeSheet>>,
    protected_cells: Mutex<HashSet<(SheetDoc, String, usize, usize)>>,
    pub fetch_calls: AtomicU64,
}

impl FakeSheetStore {
    pub async fn seed(&self, doc: SheetDoc, title: &str, rows: Vec<Vec<String>>) {
        self.sheets
            .lock()
            .await
            .insert((doc, title.to_string()), FakeSheet { rows, notes: HashMap::new() });
    }

    pub async fn protect_cell(&self, doc: SheetDoc, title: &str, row: usize, col: usize) {
        self.protected_cells
            .lock()
            .await
            .insert((doc, title.to_string(), row, col));
    }

    pub async fn cell(&self, doc: SheetDoc, title: &str, row: usize, col: usize) -> String {
        self.sheets
            .lock()
            .await
            .get(&(doc, title.to_string()))
            .and_then(|s| s.rows.get(row - 1))
            .and_then(|r| r.get(col - 1))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn note(&self, doc: SheetDoc, title: &str, row: usize, col: usize) -> Option<String> {
        self.sheets
            .lock()
            .await
            .get(&(doc, title.to_string()))
            .and_then(|s| s.notes.get(&(row, col)).cloned())
    }

    pub async fn row_count(&self, doc: SheetDoc, title: &str) -> usize {
        self.sheets
            .lock()
            .await
            .get(&(doc, title.to_string()))
            .map_or(0, |s| s.rows.len())
    }

    pub async fn last_row(&self, doc: SheetDoc, title: &str) -> Vec<String> {
        self.sheets
            .lock()
            .await
            .get(&(doc, title.to_string()))
            .and_then(|s| s.rows.last().cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SheetStoreBackend for FakeSheetStore {
    async fn fetch_sheet(&self, doc: SheetDoc, title: &str) -> Result<SheetSnapshot, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.sheets
            .lock()
            .await
            .get(&(doc, title.to_string()))
            .map(|s| SheetSnapshot::new(s.rows.clone()))
            .ok_or_else(|| StoreError(format!("worksheet not found: {title}")))
    }

    async fn update_cell(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        if self
            .protected_cells
            .lock()
            .await
            .contains(&(doc, title.to_string(), row, col))
        {
            return Err(StoreError(format!(
                "cell is protected: {title} r{row}c{col}"
            )));
        }
        let mut sheets = self.sheets.lock().await;
        let sheet = sheets.entry((doc, title.to_string())).or_default();
        if sheet.rows.len() < row {
            sheet.rows.resize(row, Vec::new());
        }
        let r = &mut sheet.rows[row - 1];
        if r.len() < col {
            r.resize(col, String::new());
        }
        r[col - 1] = value.to_string();
        Ok(())
    }

    async fn append_row(
        &self,
        doc: SheetDoc,
        title: &str,
        values: &[String],
    ) -> Result<(), StoreError> {
        let mut sheets = self.sheets.lock().await;
        let sheet = sheets
            .get_mut(&(doc, title.to_string()))
            .ok_or_else(|| StoreError(format!("worksheet not found: {title}")))?;
        sheet.rows.push(values.to_vec());
        Ok(())
    }

    async fn read_note(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .sheets
            .lock()
            .await
            .get(&(doc, title.to_string()))
            .and_then(|s| s.notes.get(&(row, col)).cloned()))
    }

    async fn write_note(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
        note: &str,
    ) -> Result<(), StoreError> {
        let mut sheets = self.sheets.lock().await;
        let sheet = sheets.entry((doc, title.to_string())).or_default();
        sheet.notes.insert((row, col), note.to_string());
        Ok(())
    }
}
