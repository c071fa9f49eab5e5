use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use dashboard_sync::{
    clock::ManualClock,
    config::Config,
    console::{ConsoleDashboard, ReportFilter},
    notifier::{Permission, PlatformNotification, PlatformNotifier},
    store::{FileStore, KeyValueStore, ReportSlot},
    DashboardSync,
};

#[derive(Default)]
struct Shown(Mutex<Vec<PlatformNotification>>);

impl PlatformNotifier for Shown {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn show(&self, notification: PlatformNotification) {
        self.0.lock().unwrap().push(notification);
    }
}

#[test]
fn dashboard_picks_up_reports_written_by_another_process() {
    let tmp = tempfile::tempdir().unwrap();
    let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

    let dashboard_store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(tmp.path()).unwrap());
    let mobile_store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(tmp.path()).unwrap());

    let dashboard_clock = Arc::new(ManualClock::new(start));
    let mobile_clock = Arc::new(ManualClock::new(start + Duration::seconds(1)));

    let console = Arc::new(ConsoleDashboard::new(
        ReportSlot::new(Arc::clone(&dashboard_store), "civicReports"),
        ReportFilter::default(),
    ));
    let shown = Arc::new(Shown::default());
    let dashboard = DashboardSync::builder(Config::default(), dashboard_store)
        .clock(dashboard_clock.clone())
        .hooks(console.hooks())
        .platform_notifier(shown.clone())
        .build();
    let mobile = DashboardSync::builder(Config::default(), mobile_store)
        .clock(mobile_clock.clone())
        .build();

    let first = mobile.simulate_varied_mobile_report().unwrap();
    mobile_clock.advance(Duration::seconds(1));
    let second = mobile.simulate_varied_mobile_report().unwrap();
    assert_ne!(first.title, second.title);

    dashboard_clock.advance(Duration::seconds(5));
    assert_eq!(dashboard.check_for_new_reports(), 2);
    assert_eq!(console.reports().len(), 2);

    let tags: Vec<String> = shown.0.lock().unwrap().iter().map(|n| n.tag.clone()).collect();
    assert_eq!(tags, vec![first.id, second.id]);

    // Nothing new on the next cycle.
    dashboard_clock.advance(Duration::seconds(5));
    assert_eq!(dashboard.check_for_new_reports(), 0);
    assert_eq!(shown.0.lock().unwrap().len(), 2);
}

#[test]
fn corrupt_slot_file_is_reported_and_recovered_from() {
    let tmp = tempfile::tempdir().unwrap();
    let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(tmp.path()).unwrap());
    let clock = Arc::new(ManualClock::new(start));

    let dashboard = DashboardSync::builder(Config::default(), Arc::clone(&store))
        .clock(clock.clone())
        .build();

    std::fs::write(tmp.path().join("civicReports.json"), "{ not json").unwrap();
    assert_eq!(dashboard.check_for_new_reports(), 0);

    clock.advance(Duration::seconds(1));
    let err = dashboard.simulate_mobile_report().unwrap_err();
    assert!(err.to_string().contains("not valid JSON"), "{}", err);

    std::fs::remove_file(tmp.path().join("civicReports.json")).unwrap();
    let report = dashboard.simulate_mobile_report().unwrap();
    clock.advance(Duration::seconds(1));
    assert_eq!(dashboard.check_for_new_reports(), 1);
    assert_eq!(dashboard.slot().load().unwrap()[0].id, report.id);
}
