//! Per-user sliding-window state.

use crate::config::ActivitySettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// One cross-tenant request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossTenantRequestRecord {
    /// When the request was made.
    pub at: DateTime<Utc>,
    /// Tenant the request came from.
    pub source_tenant: String,
    /// Tenant the request targeted.
    pub target_tenant: String,
    /// Operation name.
    pub operation: String,
}

/// Result of recording a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityAssessment {
    /// Whether any threshold tripped.
    pub suspicious: bool,
    /// Which thresholds tripped.
    pub reasons: Vec<String>,
    /// Consecutive switches including this request.
    pub consecutive_switches: u32,
    /// Requests retained in the window including this one.
    pub requests_in_window: usize,
    /// Distinct target tenants in the window.
    pub distinct_targets: usize,
}

/// Cross-tenant activity of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityState {
    history: VecDeque<CrossTenantRequestRecord>,
    last_switch: Option<DateTime<Utc>>,
    consecutive_switches: u32,
}

impl ActivityState {
    /// Records a request and assesses the updated state.
    ///
    /// Expired history is dropped first. The request is recorded even when
    /// the assessment is suspicious.
    pub fn record(
        &mut self,
        record: CrossTenantRequestRecord,
        settings: &ActivitySettings,
    ) -> ActivityAssessment {
        let now = record.at;
        self.evict(now, settings);

        self.consecutive_switches = match self.last_switch {
            Some(last) if now - last <= settings.switch_window() => {
                self.consecutive_switches.saturating_add(1)
            }
            _ => 1,
        };
        self.last_switch = Some(now);
        self.history.push_back(record);

        let requests_in_window = self.history.len();
        let distinct_targets = self.distinct_targets();

        let mut reasons = Vec::new();
        if self.consecutive_switches > settings.max_consecutive_switches {
            reasons.push(format!(
                "{} tenant switches within {}s",
                self.consecutive_switches, settings.switch_window_secs
            ));
        }
        if requests_in_window >= settings.max_requests_per_window {
            reasons.push(format!(
                "{requests_in_window} cross-tenant requests within {}s",
                settings.window_secs
            ));
        }
        if distinct_targets > settings.max_distinct_targets {
            reasons.push(format!(
                "{distinct_targets} distinct target tenants within {}s",
                settings.window_secs
            ));
        }

        ActivityAssessment {
            suspicious: !reasons.is_empty(),
            reasons,
            consecutive_switches: self.consecutive_switches,
            requests_in_window,
            distinct_targets,
        }
    }

    fn evict(&mut self, now: DateTime<Utc>, settings: &ActivitySettings) {
        let cutoff = now - settings.window();
        while self.history.front().is_some_and(|r| r.at < cutoff) {
            self.history.pop_front();
        }
    }

    fn distinct_targets(&self) -> usize {
        self.history
            .iter()
            .map(|r| r.target_tenant.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Returns true if the latest request has left the window, so nothing
    /// about this state can still contribute to an assessment.
    #[must_use]
    pub fn is_idle(&self, now: DateTime<Utc>, settings: &ActivitySettings) -> bool {
        self.history
            .back()
            .is_none_or(|r| r.at < now - settings.window())
    }

    /// Retained history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CrossTenantRequestRecord> {
        self.history.iter()
    }

    /// Time of the last switch.
    #[must_use]
    pub const fn last_switch(&self) -> Option<DateTime<Utc>> {
        self.last_switch
    }

    /// Current consecutive switch count.
    #[must_use]
    pub const fn consecutive_switches(&self) -> u32 {
        self.consecutive_switches
    }
}
