use std::{
    fmt,
    str::FromStr,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};

use crate::{hooks::DashboardHooks, models::Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Default,
    Granted,
    Denied,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::Default => "default",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        };
        f.write_str(s)
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Permission::Default),
            "granted" => Ok(Permission::Granted),
            "denied" => Ok(Permission::Denied),
            other => Err(format!("unknown notification permission: {}", other)),
        }
    }
}

/// A system-level notification. Notifications sharing a `tag` replace each
/// other instead of stacking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub tag: String,
}

/// Platform notification API.
pub trait PlatformNotifier: Send + Sync {
    fn permission(&self) -> Permission;
    fn request_permission(&self) -> Permission;
    fn show(&self, notification: PlatformNotification);
}

/// Headless platform notifier that emits notifications as log events.
pub struct TracingNotifier {
    permission: Mutex<Permission>,
    grant_on_request: bool,
}

impl TracingNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            grant_on_request: true,
        }
    }

    /// Answer a pending (`default`) permission prompt with a denial.
    pub fn deny_on_request(mut self) -> Self {
        self.grant_on_request = false;
        self
    }
}

impl PlatformNotifier for TracingNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request_permission(&self) -> Permission {
        let mut permission = self.permission.lock().unwrap_or_else(|e| e.into_inner());
        if *permission == Permission::Default {
            *permission = if self.grant_on_request {
                Permission::Granted
            } else {
                Permission::Denied
            };
        }
        *permission
    }

    fn show(&self, notification: PlatformNotification) {
        tracing::info!(
            tag = %notification.tag,
            icon = %notification.icon,
            "{}: {}",
            notification.title,
            notification.body
        );
    }
}

/// Fans new reports out to the dashboard hooks and platform notifications.
pub struct Notifier {
    hooks: DashboardHooks,
    platform: Option<Arc<dyn PlatformNotifier>>,
    title: String,
    icon: String,
}

impl Notifier {
    pub fn new(
        hooks: DashboardHooks,
        platform: Option<Arc<dyn PlatformNotifier>>,
        title: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            hooks,
            platform,
            title: title.into(),
            icon: icon.into(),
        }
    }

    pub fn platform(&self) -> Option<&Arc<dyn PlatformNotifier>> {
        self.platform.as_ref()
    }

    /// Reloads the dashboard and, when reports are given, notifies each one
    /// and refreshes stats and filters once.
    pub fn handle_new_reports(&self, new_reports: Option<&[Report]>) {
        self.hooks.load_reports_from_storage();

        let Some(reports) = new_reports.filter(|r| !r.is_empty()) else {
            return;
        };
        for report in reports {
            self.show_new_report_notification(report);
        }
        self.hooks.update_stats();
        self.hooks.apply_filters();
    }

    pub fn show_new_report_notification(&self, report: &Report) {
        self.hooks.show_notification(&format_message(report));

        if let Some(platform) = &self.platform {
            if platform.permission() == Permission::Granted {
                platform.show(PlatformNotification {
                    title: self.title.clone(),
                    body: format!("{} - {}", report.title, report.location),
                    icon: self.icon.clone(),
                    tag: report.id.clone(),
                });
            }
        }
    }
}

pub fn format_message(report: &Report) -> String {
    format!(
        "🚨 New {} priority {} report: \"{}\"",
        report.priority, report.category, report.title
    )
}
