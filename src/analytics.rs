//! In-process analytics event log.
//!
//! Mirrors the funnel's tracking calls (payment initialized/verified,
//! checklist downloads, contact submissions) into an in-memory log and the
//! tracing stream. There is no external analytics transport.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum AnalyticsEvent {
    PageView {
        page: String,
        timestamp: DateTime<Utc>,
    },
    Event {
        category: String,
        action: String,
        label: String,
        value: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    Conversion {
        kind: String,
        value: Option<f64>,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Default)]
pub struct Analytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl Analytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_page_view(&self, page: &str) {
        let clean = page.strip_prefix('/').unwrap_or(page);
        tracing::info!("Page view: {}", clean);
        self.push(AnalyticsEvent::PageView {
            page: clean.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn track_event(&self, category: &str, action: &str, label: &str, value: Option<f64>) {
        tracing::info!("Event: {} - {} - {}", category, action, label);
        self.push(AnalyticsEvent::Event {
            category: category.to_string(),
            action: action.to_string(),
            label: label.to_string(),
            value,
            timestamp: Utc::now(),
        });
    }

    pub fn track_conversion(&self, kind: &str, value: Option<f64>) {
        tracing::info!("Conversion: {} ({:?})", kind, value);
        self.push(AnalyticsEvent::Conversion {
            kind: kind.to_string(),
            value,
            timestamp: Utc::now(),
        });
    }

    /// Snapshot of the log, oldest first.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: AnalyticsEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
