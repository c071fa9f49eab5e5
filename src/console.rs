//! Headless dashboard that renders to the log instead of a page.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use serde::Serialize;

use crate::{hooks::DashboardHooks, models::Report, store::ReportSlot};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

impl DashboardStats {
    pub fn from_reports(reports: &[Report]) -> Self {
        let mut stats = Self {
            total: reports.len(),
            ..Default::default()
        };
        for report in reports {
            *stats.by_status.entry(report.status.clone()).or_default() += 1;
            *stats.by_priority.entry(report.priority.clone()).or_default() += 1;
            *stats.by_category.entry(report.category.clone()).or_default() += 1;
        }
        stats
    }

    pub fn count_status(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or(0)
    }

    pub fn count_priority(&self, priority: &str) -> usize {
        self.by_priority.get(priority).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub priority: Option<String>,
    pub category: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        let priority_ok = self.priority.as_deref().map_or(true, |p| report.priority == p);
        let category_ok = self.category.as_deref().map_or(true, |c| report.category == c);
        priority_ok && category_ok
    }

    pub fn apply<'a>(&self, reports: &'a [Report]) -> Vec<&'a Report> {
        reports.iter().filter(|r| self.matches(r)).collect()
    }
}

pub struct ConsoleDashboard {
    slot: ReportSlot,
    filter: ReportFilter,
    reports: Mutex<Vec<Report>>,
}

impl ConsoleDashboard {
    pub fn new(slot: ReportSlot, filter: ReportFilter) -> Self {
        Self {
            slot,
            filter,
            reports: Mutex::new(Vec::new()),
        }
    }

    /// Wires the dashboard into every hook slot.
    pub fn hooks(self: &Arc<Self>) -> DashboardHooks {
        let load = Arc::clone(self);
        let stats = Arc::clone(self);
        let filters = Arc::clone(self);
        let notify = Arc::clone(self);
        DashboardHooks::new()
            .with_load_reports_from_storage(move || load.load_reports_from_storage())
            .with_update_stats(move || {
                stats.update_stats();
            })
            .with_apply_filters(move || {
                filters.apply_filters();
            })
            .with_show_notification(move |msg| notify.show_notification(msg))
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Re-reads the slot. A broken slot keeps the previously loaded list.
    pub fn load_reports_from_storage(&self) {
        match self.slot.load() {
            Ok(reports) => {
                tracing::debug!("dashboard loaded {} report(s)", reports.len());
                *self.reports.lock().unwrap_or_else(|e| e.into_inner()) = reports;
            }
            Err(e) => tracing::warn!("dashboard could not load reports: {}", e),
        }
    }

    pub fn update_stats(&self) -> DashboardStats {
        let stats = DashboardStats::from_reports(&self.reports());
        tracing::info!(
            total = stats.total,
            pending = stats.count_status("pending"),
            critical = stats.count_priority("critical"),
            high = stats.count_priority("high"),
            medium = stats.count_priority("medium"),
            low = stats.count_priority("low"),
            "dashboard stats updated"
        );
        stats
    }

    /// Returns how many loaded reports pass the active filter.
    pub fn apply_filters(&self) -> usize {
        let reports = self.reports();
        let visible = self.filter.apply(&reports).len();
        tracing::info!("dashboard showing {} of {} report(s)", visible, reports.len());
        visible
    }

    pub fn show_notification(&self, message: &str) {
        tracing::info!("{}", message);
    }
}
