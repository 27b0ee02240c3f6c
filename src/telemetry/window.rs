// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Sliding time window of detection counts

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// `(timestamp, count)` entries kept while `now - timestamp < span`
#[derive(Debug, Clone)]
pub struct RateWindow {
    entries: VecDeque<(DateTime<Utc>, usize)>,
    span: Duration,
}

impl RateWindow {
    pub fn new(span: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            span,
        }
    }

    pub fn span(&self) -> Duration {
        self.span
    }

    /// Append an entry, then drop expired ones from the front.
    ///
    /// Entries arrive in timestamp order, so expiry only ever happens at
    /// the front.
    pub fn record(&mut self, count: usize, now: DateTime<Utc>) {
        self.entries.push_back((now, count));
        self.prune(now);
    }

    pub fn prune(&mut self, now: DateTime<Utc>) {
        while let Some((ts, _)) = self.entries.front() {
            if now - *ts >= self.span {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Sum of counts still inside the window at `now`. Does not mutate.
    pub fn sum(&self, now: DateTime<Utc>) -> usize {
        self.entries
            .iter()
            .filter(|(ts, _)| now - *ts < self.span)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_prunes_on_record() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut window = RateWindow::new(Duration::seconds(60));

        window.record(2, t0);
        window.record(1, t0 + Duration::seconds(30));
        assert_eq!(window.len(), 2);

        window.record(4, t0 + Duration::seconds(60));
        // the t0 entry is exactly 60 s old and falls out
        assert_eq!(window.len(), 2);
        assert_eq!(window.sum(t0 + Duration::seconds(60)), 5);
    }

    #[test]
    fn test_sum_ignores_stale_entries_without_prune() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut window = RateWindow::new(Duration::seconds(60));
        window.record(3, t0);
        assert_eq!(window.sum(t0 + Duration::seconds(59)), 3);
        assert_eq!(window.sum(t0 + Duration::seconds(61)), 0);
        assert_eq!(window.len(), 1);
    }
}
