/// Structured cell note written into the day cell on work start. Lines are
/// `key: value`; unknown keys are ignored on parse so notes survive manual
/// edits in the spreadsheet UI.
pub const NOTE_VEHICLE: &str = "운행차량";
pub const NOTE_STARTED_AT: &str = "운행시작일시";
pub const NOTE_SHIFT_TYPE: &str = "근무유형";
pub const NOTE_REPORT: &str = "보고사항";
pub const NOTE_REMARKS: &str = "특기사항";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkNote {
    pub vehicle_number: Option<String>,
    pub started_at: Option<String>,
    pub shift_type: Option<String>,
    pub vehicle_report: Option<String>,
    pub remarks: Option<String>,
}

impl WorkNote {
    /// Renders the note; only present fields emit a line. An all-empty note
    /// renders as `""`.
    #[must_use]
    pub fn format(&self) -> String {
        let mut lines = Vec::new();
        let mut push = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                if !v.trim().is_empty() {
                    lines.push(format!("{key}: {}", v.trim()));
                }
            }
        };
        push(NOTE_VEHICLE, &self.vehicle_number);
        push(NOTE_STARTED_AT, &self.started_at);
        push(NOTE_SHIFT_TYPE, &self.shift_type);
        push(NOTE_REPORT, &self.vehicle_report);
        push(NOTE_REMARKS, &self.remarks);
        lines.join("\n")
    }

    /// Parses a note body. Splits each line on the first `:`; lines without
    /// one and unknown keys are skipped.
    #[must_use]
    pub fn parse(note: &str) -> Self {
        let mut out = Self::default();
        for line in note.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().to_string();
            match key {
                NOTE_VEHICLE => out.vehicle_number = Some(value),
                NOTE_STARTED_AT => out.started_at = Some(value),
                NOTE_SHIFT_TYPE => out.shift_type = Some(value),
                NOTE_REPORT => out.vehicle_report = Some(value),
                NOTE_REMARKS => out.remarks = Some(value),
                _ => {}
            }
        }
        out
    }

    /// Rewrites only the `보고사항` line of an existing note body, appending
    /// it when absent. Other lines (known or not) pass through untouched.
    #[must_use]
    pub fn rewrite_report_line(note: &str, report_value: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut found = false;
        for line in note.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.starts_with(&format!("{NOTE_REPORT}:")) {
                lines.push(format!("{NOTE_REPORT}: {report_value}"));
                found = true;
            } else {
                lines.push(line.to_string());
            }
        }
        if !found {
            lines.push(format!("{NOTE_REPORT}: {report_value}"));
        }
        lines.join("\n")
    }
}
