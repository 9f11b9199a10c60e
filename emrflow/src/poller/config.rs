// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Status-set configuration of a [`ResourcePoller`](super::ResourcePoller).
//!
//! Clusters and notebook executions are polled by the same state machine;
//! they only differ in the data held here.

use super::{PollOutcome, StatusSnapshot};
use crate::configs::{duration_setting, list_setting};
use crate::error::Result;
use ini::Ini;
use std::collections::HashSet;
use std::time::Duration;

/// Cluster states that mean EMR is still working on the cluster.
pub const CLUSTER_NON_TERMINAL_STATES: &[&str] = &["STARTING", "BOOTSTRAPPING", "TERMINATING"];

/// Cluster states that fail the sensor. Intentionally empty: a cluster that
/// ends up in `TERMINATED_WITH_ERRORS` is classified as [`PollOutcome::Succeeded`].
pub const CLUSTER_FAILED_STATES: &[&str] = &[];

/// Notebook execution states that mean the notebook is still running.
pub const NOTEBOOK_NON_TERMINAL_STATES: &[&str] = &[
    "START_PENDING",
    "STARTING",
    "RUNNING",
    "FINISHING",
    "STOP_PENDING",
    "STOPPING",
];

/// Notebook execution states that fail the sensor.
pub const NOTEBOOK_FAILED_STATES: &[&str] = &["FAILING", "FAILED"];

/// Reason reported when a resource fails without saying why.
pub const DEFAULT_FAILURE_REASON: &str = "EMR job failed";

/// The default interval between two pokes.
pub const DEFAULT_POKE_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration of one poller instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Human readable resource kind, used in logs and errors.
    pub kind:                String,
    /// How long the caller should wait before polling again after
    /// [`PollOutcome::Continue`]. The poller itself never sleeps.
    pub interval:            Duration,
    /// States in which the resource is still making progress.
    pub non_terminal_states: HashSet<String>,
    /// Terminal states that are reported as [`PollOutcome::Failed`].
    pub failed_states:       HashSet<String>,
}

impl PollerConfig {
    /// Creates a configuration with empty status sets.
    pub fn new(kind: &str, interval: Duration) -> Self {
        Self {
            kind: kind.to_owned(),
            interval,
            non_terminal_states: HashSet::new(),
            failed_states: HashSet::new(),
        }
    }

    /// The EMR cluster sensor configuration.
    pub fn cluster() -> Self {
        Self::new("cluster", DEFAULT_POKE_INTERVAL)
            .with_non_terminal_states(CLUSTER_NON_TERMINAL_STATES.iter().copied())
            .with_failed_states(CLUSTER_FAILED_STATES.iter().copied())
    }

    /// The EMR notebook execution sensor configuration.
    pub fn notebook_execution() -> Self {
        Self::new("notebook execution", DEFAULT_POKE_INTERVAL)
            .with_non_terminal_states(NOTEBOOK_NON_TERMINAL_STATES.iter().copied())
            .with_failed_states(NOTEBOOK_FAILED_STATES.iter().copied())
    }

    /// Reads the status sets from `section` (`cluster` or `notebook`) and
    /// the poke interval from the `[sensor]` section.
    pub fn from_ini(conf: &Ini, section: &str, kind: &str) -> Result<Self> {
        Ok(
            Self::new(kind, duration_setting(conf, "sensor", "poke_interval")?)
                .with_non_terminal_states(list_setting(conf, section, "non_terminal_states")?)
                .with_failed_states(list_setting(conf, section, "failed_states")?),
        )
    }

    /// Replaces the non-terminal status set.
    pub fn with_non_terminal_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_terminal_states = states.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the failure status set.
    pub fn with_failed_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failed_states = states.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the poke interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Classifies one snapshot.
    ///
    /// Non-terminal wins over failure if a state is listed in both sets, and
    /// anything listed in neither is a success.
    pub fn classify(&self, snapshot: &StatusSnapshot) -> PollOutcome {
        if self.non_terminal_states.contains(&snapshot.status) {
            PollOutcome::Continue
        } else if self.failed_states.contains(&snapshot.status) {
            let reason = snapshot
                .failure_reason
                .as_deref()
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_FAILURE_REASON);
            PollOutcome::Failed(reason.to_owned())
        } else {
            PollOutcome::Succeeded
        }
    }
}
