// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Detection event store - bounded, most recent first

mod export;

pub use export::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

use crate::device::{BoundingBox, InferenceMetadata, InferenceResponse};

/// Default store capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 50;

/// One inference that found something. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub detections: Vec<BoundingBox>,
    pub thumbnail: Option<String>,
    pub metadata: InferenceMetadata,
}

impl DetectionEvent {
    /// Build an event from a response. `None` when nothing was detected.
    pub fn from_response(response: &InferenceResponse, timestamp: DateTime<Utc>) -> Option<Self> {
        if response.detections.is_empty() {
            return None;
        }
        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            detections: response.detections.clone(),
            thumbnail: response.encoded_image.clone(),
            metadata: response.metadata.clone(),
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.detections.iter().map(|d| d.label.as_str())
    }

    pub fn max_confidence(&self) -> f64 {
        self.detections
            .iter()
            .map(|d| d.confidence)
            .fold(0.0, f64::max)
    }
}

/// Which labels to show
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LabelFilter {
    #[default]
    All,
    Label(String),
}

impl LabelFilter {
    /// `"all"` (any case) or empty means every label
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            LabelFilter::All
        } else {
            LabelFilter::Label(value.to_string())
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        match self {
            LabelFilter::All => true,
            LabelFilter::Label(wanted) => wanted == label,
        }
    }
}

/// Display/export filter over the store
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventFilter {
    pub label: LabelFilter,
    /// 0..=100
    pub min_confidence_percent: f64,
}

impl EventFilter {
    pub fn new(label: LabelFilter, min_confidence_percent: f64) -> Self {
        Self {
            label,
            min_confidence_percent,
        }
    }

    /// Label match and confidence threshold are checked independently: the
    /// two may be satisfied by different boxes of the same event.
    pub fn matches(&self, event: &DetectionEvent) -> bool {
        let threshold = self.min_confidence_percent / 100.0;
        let label_ok = event.detections.iter().any(|d| self.label.matches(&d.label));
        let confidence_ok = event.detections.iter().any(|d| d.confidence >= threshold);
        label_ok && confidence_ok
    }
}

/// Bounded log of detection events, newest at the front
#[derive(Debug, Clone)]
pub struct EventStore {
    events: VecDeque<DetectionEvent>,
    capacity: usize,
}

impl EventStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend, evicting the oldest insertion past capacity
    pub fn append(&mut self, event: DetectionEvent) {
        debug!("Recording detection event {} ({} boxes)", event.id, event.detections.len());
        self.events.push_front(event);
        while self.events.len() > self.capacity {
            self.events.pop_back();
        }
    }

    /// Non-destructive filtered view, newest first
    pub fn filter(&self, filter: &EventFilter) -> Vec<DetectionEvent> {
        self.events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Distinct labels currently held, sorted
    pub fn labels(&self) -> Vec<String> {
        self.events
            .iter()
            .flat_map(|e| e.labels())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn latest(&self) -> Option<&DetectionEvent> {
        self.events.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn event(boxes: &[(&str, f64)]) -> DetectionEvent {
        DetectionEvent {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            detections: boxes
                .iter()
                .map(|(label, conf)| BoundingBox::new(label, *conf, 0.0, 0.0, 10.0, 10.0))
                .collect(),
            thumbnail: None,
            metadata: InferenceMetadata {
                detection_count: boxes.len(),
                inference_ms: 20.0,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut store = EventStore::default();
        let first = event(&[("car", 0.9)]);
        let first_id = first.id.clone();
        store.append(first);
        for _ in 0..49 {
            store.append(event(&[("dog", 0.5)]));
        }
        assert_eq!(store.len(), 50);
        assert!(store.iter().any(|e| e.id == first_id));

        let newest = event(&[("person", 0.7)]);
        let newest_id = newest.id.clone();
        store.append(newest);
        assert_eq!(store.len(), 50);
        assert!(!store.iter().any(|e| e.id == first_id));
        assert_eq!(store.latest().map(|e| e.id.as_str()), Some(newest_id.as_str()));
    }

    #[test]
    fn test_filter_label_and_confidence() {
        let mut store = EventStore::default();
        // appended oldest first so the store reads [car .9, dog .4, car .3]
        store.append(event(&[("car", 0.3)]));
        store.append(event(&[("dog", 0.4)]));
        store.append(event(&[("car", 0.9)]));

        let filter = EventFilter::new(LabelFilter::parse("car"), 50.0);
        let result = store.filter(&filter);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].detections[0].confidence, 0.9);

        // filtering never mutates
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_filter_conditions_may_use_different_boxes() {
        let mut store = EventStore::default();
        store.append(event(&[("car", 0.2), ("dog", 0.8)]));
        let filter = EventFilter::new(LabelFilter::Label("car".into()), 50.0);
        assert_eq!(store.filter(&filter).len(), 1);
    }

    #[test]
    fn test_all_labels() {
        let mut store = EventStore::default();
        store.append(event(&[("car", 0.3)]));
        store.append(event(&[("dog", 0.6), ("car", 0.1)]));
        assert_eq!(store.filter(&EventFilter::new(LabelFilter::All, 0.0)).len(), 2);
        assert_eq!(store.filter(&EventFilter::new(LabelFilter::parse("ALL"), 50.0)).len(), 1);
        assert_eq!(store.labels(), vec!["car".to_string(), "dog".to_string()]);
    }

    #[test]
    fn test_no_event_without_detections() {
        let response = InferenceResponse::default();
        assert!(DetectionEvent::from_response(&response, Utc::now()).is_none());
    }
}
