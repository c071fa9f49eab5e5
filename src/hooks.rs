use std::{fmt, sync::Arc};

/// Callback with no arguments, e.g. a dashboard refresh.
pub type HookFunc = Arc<dyn Fn() + Send + Sync>;

/// Callback receiving an in-app notification message.
pub type MessageHookFunc = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional dashboard collaborators. An empty slot means the dashboard does
/// not offer that capability and the call is skipped.
#[derive(Clone, Default)]
pub struct DashboardHooks {
    pub load_reports_from_storage: Option<HookFunc>,
    pub update_stats: Option<HookFunc>,
    pub apply_filters: Option<HookFunc>,
    pub show_notification: Option<MessageHookFunc>,
}

impl DashboardHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load_reports_from_storage(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.load_reports_from_storage = Some(Arc::new(f));
        self
    }

    pub fn with_update_stats(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.update_stats = Some(Arc::new(f));
        self
    }

    pub fn with_apply_filters(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.apply_filters = Some(Arc::new(f));
        self
    }

    pub fn with_show_notification(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.show_notification = Some(Arc::new(f));
        self
    }

    pub(crate) fn load_reports_from_storage(&self) {
        if let Some(hook) = &self.load_reports_from_storage {
            hook();
        }
    }

    pub(crate) fn update_stats(&self) {
        if let Some(hook) = &self.update_stats {
            hook();
        }
    }

    pub(crate) fn apply_filters(&self) {
        if let Some(hook) = &self.apply_filters {
            hook();
        }
    }

    pub(crate) fn show_notification(&self, message: &str) {
        if let Some(hook) = &self.show_notification {
            hook(message);
        }
    }
}

impl fmt::Debug for DashboardHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardHooks")
            .field("load_reports_from_storage", &self.load_reports_from_storage.is_some())
            .field("update_stats", &self.update_stats.is_some())
            .field("apply_filters", &self.apply_filters.is_some())
            .field("show_notification", &self.show_notification.is_some())
            .finish()
    }
}
