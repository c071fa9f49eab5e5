use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    clock::Clock,
    error::SyncError,
    models::{parse_reports, Report},
    store::ReportSlot,
};

/// Detects reports appended to the slot since the last successful sync.
///
/// The watermark starts at construction time and, whenever a poll finds new
/// records, jumps to that poll's wall-clock time rather than to the newest
/// record's timestamp.
pub struct Poller {
    slot: ReportSlot,
    clock: Arc<dyn Clock>,
    last_sync: DateTime<Utc>,
}

impl Poller {
    pub fn new(slot: ReportSlot, clock: Arc<dyn Clock>) -> Self {
        let last_sync = clock.now();
        Self {
            slot,
            clock,
            last_sync,
        }
    }

    pub fn last_sync(&self) -> DateTime<Utc> {
        self.last_sync
    }

    /// One check of the slot. Returns the reports newer than the watermark.
    pub fn poll(&mut self) -> Result<Vec<Report>, SyncError> {
        let Some(raw) = self.slot.read_raw()? else {
            return Ok(Vec::new());
        };
        let reports = parse_reports(&raw)?;

        let new_reports: Vec<Report> = reports
            .into_iter()
            .filter(|r| r.is_newer_than(self.last_sync))
            .collect();

        if !new_reports.is_empty() {
            self.last_sync = self.clock.now();
        }
        Ok(new_reports)
    }
}
