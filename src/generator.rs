//! Dummy report generation for exercising the dashboard without the mobile app.

use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, thread_rng, Rng};

use crate::models::{
    iso_timestamp, AiAnalysis, Coordinates, Report, ReportUser, STATUS_PENDING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub priority: &'static str,
    pub location: &'static str,
    pub user_type: &'static str,
}

pub const TEMPLATES: &[ReportTemplate] = &[
    ReportTemplate {
        title: "Large pothole on Main Street causing vehicle damage",
        description: "There is a dangerous pothole approximately 2 feet wide and 6 inches deep on Main Street near the intersection with Oak Avenue. Multiple vehicles have been damaged, and it poses a serious safety hazard especially during night hours.",
        category: "infrastructure",
        priority: "high",
        location: "Main Street & Oak Avenue Intersection",
        user_type: "concerned_citizen",
    },
    ReportTemplate {
        title: "Street light not working for 3 days",
        description: "The street light on Pine Avenue has been out for three consecutive days. This creates a safety concern for pedestrians and drivers, especially during evening hours. The area is poorly lit and accidents may occur.",
        category: "infrastructure",
        priority: "medium",
        location: "Pine Avenue, Block 200",
        user_type: "resident",
    },
    ReportTemplate {
        title: "Water pipe burst flooding sidewalk",
        description: "A water main has burst on Elm Street causing significant flooding on the sidewalk and road. Water is continuously flowing and creating hazardous conditions. Immediate attention required to prevent further damage.",
        category: "infrastructure",
        priority: "critical",
        location: "Elm Street, Near City Park",
        user_type: "emergency_reporter",
    },
    ReportTemplate {
        title: "Overflowing garbage bins attracting pests",
        description: "The public garbage bins at Central Park have been overflowing for over a week. This is attracting rats, flies, and creating unsanitary conditions. Families with children are avoiding the area.",
        category: "environment",
        priority: "medium",
        location: "Central Park, East Entrance",
        user_type: "parent",
    },
    ReportTemplate {
        title: "Broken playground equipment - safety hazard",
        description: "The swing set at Riverside Park has broken chains and the slide has sharp edges. This poses a serious injury risk to children. The equipment needs immediate repair or removal until fixed.",
        category: "safety",
        priority: "high",
        location: "Riverside Park Playground",
        user_type: "parent",
    },
    ReportTemplate {
        title: "Traffic signal malfunction causing congestion",
        description: "The traffic light at the busy intersection of 5th and Broadway is stuck on red in all directions. This is causing major traffic backup during rush hour and confusion among drivers.",
        category: "transport",
        priority: "high",
        location: "5th Street & Broadway Intersection",
        user_type: "commuter",
    },
    ReportTemplate {
        title: "Illegal dumping in residential area",
        description: "Someone has dumped construction debris and old furniture behind the apartment complex on Maple Street. This is creating an eyesore and potential health hazard for residents.",
        category: "environment",
        priority: "low",
        location: "Maple Street Apartment Complex",
        user_type: "resident",
    },
    ReportTemplate {
        title: "Damaged sidewalk creating accessibility issues",
        description: "The sidewalk on Cherry Lane has multiple cracks and raised sections that make it impossible for wheelchairs and difficult for elderly residents to navigate safely.",
        category: "infrastructure",
        priority: "medium",
        location: "Cherry Lane, Residential Block",
        user_type: "accessibility_advocate",
    },
];

pub const USER_NAMES: &[&str] = &[
    "John Smith",
    "Sarah Johnson",
    "Mike Davis",
    "Lisa Wilson",
    "David Brown",
    "Emma Garcia",
];

pub const EMAIL_DOMAIN: &str = "resolve360.com";

pub const BASE_COORDINATES: Coordinates = Coordinates {
    lat: 40.7128,
    lng: -74.0060,
};

/// Half-width of the coordinate jitter, in degrees.
pub const COORDINATE_JITTER: f64 = 0.05;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Round-robin over [`TEMPLATES`], randomising everything the template does
/// not fix.
#[derive(Debug, Default)]
pub struct DummyReportGenerator {
    counter: usize,
}

impl DummyReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reports generated so far.
    pub fn generated(&self) -> usize {
        self.counter
    }

    pub fn next_template(&mut self) -> &'static ReportTemplate {
        let template = &TEMPLATES[self.counter % TEMPLATES.len()];
        self.counter += 1;
        template
    }

    pub fn generate(&mut self, now: DateTime<Utc>) -> Report {
        self.generate_with(now, &mut thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> Report {
        let template = self.next_template();
        let name = USER_NAMES.choose(rng).copied().unwrap_or(USER_NAMES[0]);
        let ts = iso_timestamp(now);

        Report {
            id: format!("report_{}_{}", now.timestamp_millis(), random_suffix(rng)),
            title: template.title.to_string(),
            description: template.description.to_string(),
            category: template.category.to_string(),
            priority: template.priority.to_string(),
            status: STATUS_PENDING.to_string(),
            location: template.location.to_string(),
            coordinates: random_coordinates(rng),
            user: ReportUser {
                name: name.to_string(),
                email: email_for(name),
                phone: random_phone(rng),
            },
            timestamp: ts.clone(),
            created_at: ts,
            ai_analysis: AiAnalysis {
                confidence: rng.gen_range(0.7..1.0),
                tags: relevant_tags(template.category, rng),
                estimated_resolution_time: estimated_resolution_time(template.priority).to_string(),
                urgency: urgency_score(template.priority),
            },
        }
    }
}

/// The fixed record the basic dashboard uses to demonstrate a sync.
pub fn basic_test_report(now: DateTime<Utc>) -> Report {
    let ts = iso_timestamp(now);
    Report {
        id: format!("report_{}", now.timestamp_millis()),
        title: "Test Report from Mobile App".to_string(),
        description: "This is a test report to demonstrate real-time sync".to_string(),
        category: "infrastructure".to_string(),
        priority: "medium".to_string(),
        status: STATUS_PENDING.to_string(),
        location: "Test Location, City".to_string(),
        coordinates: BASE_COORDINATES,
        user: ReportUser {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "123-456-7890".to_string(),
        },
        timestamp: ts.clone(),
        created_at: ts,
        ai_analysis: AiAnalysis {
            confidence: 0.85,
            tags: vec!["test".to_string(), "demo".to_string()],
            estimated_resolution_time: "2-3 days".to_string(),
            urgency: 6,
        },
    }
}

pub fn email_for(name: &str) -> String {
    format!("{}@{}", name.to_lowercase().replace(' ', "."), EMAIL_DOMAIN)
}

pub fn random_coordinates<R: Rng + ?Sized>(rng: &mut R) -> Coordinates {
    Coordinates {
        lat: BASE_COORDINATES.lat + rng.gen_range(-COORDINATE_JITTER..COORDINATE_JITTER),
        lng: BASE_COORDINATES.lng + rng.gen_range(-COORDINATE_JITTER..COORDINATE_JITTER),
    }
}

/// `(AAA) BBB-CCCC`
pub fn random_phone<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "({}) {}-{}",
        rng.gen_range(100..=999),
        rng.gen_range(100..=999),
        rng.gen_range(1000..=9999)
    )
}

/// First two to four tags of the category's list.
pub fn relevant_tags<R: Rng + ?Sized>(category: &str, rng: &mut R) -> Vec<String> {
    let base: &[&str] = match category {
        "infrastructure" => &["maintenance", "repair", "safety", "public-works"],
        "environment" => &["sanitation", "health", "cleanup", "waste-management"],
        "safety" => &["urgent", "hazard", "public-safety", "emergency"],
        "transport" => &["traffic", "congestion", "signals", "road-safety"],
        _ => &["general", "civic"],
    };
    let count = rng.gen_range(2..=4);
    base.iter().take(count).map(|t| t.to_string()).collect()
}

pub fn estimated_resolution_time(priority: &str) -> &'static str {
    match priority {
        "critical" => "2-6 hours",
        "high" => "1-2 days",
        "medium" => "3-5 days",
        "low" => "1-2 weeks",
        _ => "3-5 days",
    }
}

pub fn urgency_score(priority: &str) -> i32 {
    match priority {
        "critical" => 9,
        "high" => 7,
        "medium" => 5,
        "low" => 3,
        _ => 5,
    }
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
