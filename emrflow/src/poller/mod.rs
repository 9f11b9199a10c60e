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

//! The polling state machine for asynchronously provisioned EMR resources.
//!
//! A resource starts out non-terminal and is polled until it is either
//! succeeded or failed:
//!
//! ```text
//!              +-----------+
//!   start ---> | Continue  | ---+
//!              +-----------+    |  poll() again after `interval`
//!                 |    ^--------+
//!                 |
//!        +--------+---------+
//!        v                  v
//!  +-----------+      +-----------+
//!  | Succeeded |      |  Failed   |
//!  +-----------+      +-----------+
//! ```
//!
//! One [`ResourcePoller::poll`] call is one status query. Sleeping between
//! polls, retry budgets and deadlines belong to the caller, see
//! [`crate::workflow`].

mod config;
pub use config::*;

use crate::error::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque identifier of a cloud resource, e.g. a cluster id (`j-…`) or a
/// notebook execution id (`ex-…`). It never changes once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    /// Wraps an identifier returned by a creation call.
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self(id.into())
    }

    /// Returns the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The result of one status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// The status code reported by EMR.
    pub status:         String,
    /// Why the resource entered its current state, if EMR says so.
    pub failure_reason: Option<String>,
}

impl StatusSnapshot {
    /// Creates a new snapshot.
    pub fn new<S: Into<String>>(status: S, failure_reason: Option<&str>) -> Self {
        Self {
            status:         status.into(),
            failure_reason: failure_reason.map(str::to_owned),
        }
    }
}

/// Classification of a [`StatusSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The resource is still in progress; poll again later.
    Continue,
    /// The resource reached a terminal state that is not a failure.
    Succeeded,
    /// The resource reached a failure state. Carries the reason.
    Failed(String),
}

/// Where a poller gets its status from.
///
/// `fetch` issues exactly one external read; `snapshot` maps the raw response
/// to a [`StatusSnapshot`] without any I/O.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// The raw response of the status query.
    type Response: Send;

    /// Queries the current status of `handle`.
    async fn fetch(&self, handle: &ResourceHandle) -> Result<Self::Response>;

    /// Extracts the status code and failure reason from a response.
    fn snapshot(&self, response: &Self::Response) -> Result<StatusSnapshot>;
}

/// Polls one kind of resource. Clusters and notebook executions use the same
/// type with a different [`PollerConfig`].
#[derive(Debug)]
pub struct ResourcePoller<S> {
    config: PollerConfig,
    source: S,
}

impl<S: StatusSource> ResourcePoller<S> {
    /// Creates a new poller.
    pub fn new(config: PollerConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Returns the status-set configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Returns the status source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Issues one status query for `handle` and classifies the answer.
    ///
    /// Errors of the query itself are returned as is, never retried.
    pub async fn poll(&self, handle: &ResourceHandle) -> Result<PollOutcome> {
        info!("Poking {} {}", self.config.kind, handle);
        let response = self.source.fetch(handle).await?;
        let snapshot = self.source.snapshot(&response)?;
        info!(
            "{} {} is in state {}",
            self.config.kind, handle, snapshot.status
        );

        let outcome = self.config.classify(&snapshot);
        if outcome == PollOutcome::Succeeded && snapshot.status.starts_with("TERMINATED") {
            warn!(
                "{} {} reached {} ({}), which is not a declared failure state; \
                 treating it as success",
                self.config.kind,
                handle,
                snapshot.status,
                snapshot.failure_reason.as_deref().unwrap_or("no reason given")
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::FlowError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers status queries from a fixed script, one entry per call.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedSource {
        script:  Mutex<VecDeque<Result<StatusSnapshot>>>,
        queried: Mutex<Vec<ResourceHandle>>,
    }

    impl ScriptedSource {
        pub(crate) fn new(statuses: &[&str], reason: Option<&str>) -> Self {
            let script = statuses
                .iter()
                .map(|s| Ok(StatusSnapshot::new(*s, reason)))
                .collect();
            Self {
                script:  Mutex::new(script),
                queried: Mutex::new(vec![]),
            }
        }

        pub(crate) fn push_error(&self, err: FlowError) {
            self.script.lock().unwrap().push_back(Err(err));
        }

        pub(crate) fn queried(&self) -> Vec<ResourceHandle> {
            self.queried.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        type Response = StatusSnapshot;

        async fn fetch(&self, handle: &ResourceHandle) -> Result<StatusSnapshot> {
            self.queried.lock().unwrap().push(handle.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FlowError::Internal("script exhausted".to_owned())))
        }

        fn snapshot(&self, response: &StatusSnapshot) -> Result<StatusSnapshot> {
            Ok(response.clone())
        }
    }

    #[tokio::test]
    async fn cluster_reaches_waiting() -> Result<()> {
        let handle = ResourceHandle::new("j-ABC123");
        let poller = ResourcePoller::new(
            PollerConfig::cluster(),
            ScriptedSource::new(&["STARTING", "BOOTSTRAPPING", "WAITING"], None),
        );

        let mut outcomes = vec![];
        for _ in 0..3 {
            outcomes.push(poller.poll(&handle).await?);
        }

        assert_eq!(
            vec![
                PollOutcome::Continue,
                PollOutcome::Continue,
                PollOutcome::Succeeded
            ],
            outcomes
        );
        assert_eq!(vec![handle.clone(); 3], poller.source().queried());
        Ok(())
    }

    #[tokio::test]
    async fn notebook_execution_runs_out_of_memory() -> Result<()> {
        let handle = ResourceHandle::new("ex-J0123456789");
        let poller = ResourcePoller::new(
            PollerConfig::notebook_execution(),
            ScriptedSource::new(&["START_PENDING", "RUNNING", "FAILED"], Some("out of memory")),
        );

        let mut outcomes = vec![];
        for _ in 0..3 {
            outcomes.push(poller.poll(&handle).await?);
        }

        assert_eq!(
            vec![
                PollOutcome::Continue,
                PollOutcome::Continue,
                PollOutcome::Failed("out of memory".to_owned())
            ],
            outcomes
        );
        Ok(())
    }

    #[tokio::test]
    async fn query_errors_propagate() {
        let source = ScriptedSource::new(&["STARTING"], None);
        source.push_error(FlowError::AWS("ExpiredToken".to_owned()));
        let poller = ResourcePoller::new(PollerConfig::cluster(), source);
        let handle = ResourceHandle::new("j-ABC123");

        assert_eq!(PollOutcome::Continue, poller.poll(&handle).await.unwrap());
        match poller.poll(&handle).await {
            Err(FlowError::AWS(msg)) => assert_eq!("ExpiredToken", msg),
            other => panic!("unexpected poll result: {:?}", other),
        }
    }

    #[test]
    fn handles_serialize_as_plain_strings() -> Result<()> {
        let handle = ResourceHandle::new("j-ABC123");
        assert_eq!("\"j-ABC123\"", serde_json::to_string(&handle)?);
        assert_eq!("j-ABC123", handle.to_string());
        Ok(())
    }
}
