// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use shiftbook_model::SheetSnapshot;

mod fake;
mod http;

pub use fake::FakeSheetStore;
pub use http::{HttpSheetsBackend, HttpSheetsConfig, RetryPolicy};

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for StoreError {}

/// Which spreadsheet a worksheet lives in. The service spans two: the work
/// roster (months, accounts, loaners) and the sales ledger (months).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetDoc {
    Work,
    Sales,
}

/// Spreadsheet access, narrowed to what the service needs: whole-sheet
/// reads, single-cell writes, row appends and the cell-note side channel.
/// Rows and columns are 1-based, matching the sheet UI and A1 notation.
#[async_trait]
pub trait SheetStoreBackend: Send + Sync + 'static {
    async fn fetch_sheet(&self, doc: SheetDoc, title: &str) -> Result<SheetSnapshot, StoreError>;

    async fn update_cell(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), StoreError>;

    async fn append_row(
        &self,
        doc: SheetDoc,
        title: &str,
        values: &[String],
    ) -> Result<(), StoreError>;

    async fn read_note(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
    ) -> Result<Option<String>, StoreError>;

    async fn write_note(
        &self,
        doc: SheetDoc,
        title: &str,
        row: usize,
        col: usize,
        note: &str,
    ) -> Result<(), StoreError>;
}
