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

//! Retry budget of a sensor and the bookkeeping of one wait.

use crate::configs::{duration_setting, parse_setting, EMRFLOW_CONF};
use crate::error::{FlowError, Result};
use crate::poller::{PollOutcome, ResourceHandle, ResourcePoller, StatusSource};
use ini::Ini;
use log::info;
use std::time::Duration;
use tokio::time::Instant;

/// How long a sensor keeps poking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorPolicy {
    /// Give up once this much time has passed since the first poke.
    pub timeout:      Option<Duration>,
    /// Give up after this many pokes.
    pub max_attempts: Option<usize>,
}

impl SensorPolicy {
    /// Reads the `[sensor]` section of the bundled settings.
    pub fn try_new() -> Result<Self> {
        Self::from_ini(&EMRFLOW_CONF)
    }

    /// Reads the `[sensor]` section. A `max_attempts` of zero means no limit.
    pub fn from_ini(conf: &Ini) -> Result<Self> {
        let max_attempts = parse_setting::<usize>(conf, "sensor", "max_attempts")?;
        Ok(Self {
            timeout:      Some(duration_setting(conf, "sensor", "timeout")?),
            max_attempts: if max_attempts == 0 {
                None
            } else {
                Some(max_attempts)
            },
        })
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the maximum number of pokes.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// State carried across the pokes of one wait.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The resource being waited on.
    pub handle:   ResourceHandle,
    /// Pokes issued so far.
    pub attempt:  usize,
    /// Give up once this instant has passed.
    pub deadline: Option<Instant>,
}

impl RunContext {
    /// Starts the clock for `handle`.
    pub fn new(handle: ResourceHandle, policy: &SensorPolicy) -> Self {
        Self {
            handle,
            attempt: 0,
            deadline: policy.timeout.map(|t| Instant::now() + t),
        }
    }

    /// Fails with [`FlowError::Timeout`] once the budget is spent.
    pub fn check_budget(&self, policy: &SensorPolicy) -> Result<()> {
        if let Some(max) = policy.max_attempts {
            if self.attempt >= max {
                return Err(FlowError::Timeout(format!(
                    "{} still in progress after {} attempts",
                    self.handle, self.attempt
                )));
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(FlowError::Timeout(format!(
                    "{} still in progress after {} attempts, deadline passed",
                    self.handle, self.attempt
                )));
            }
        }
        Ok(())
    }
}

/// Pokes `handle` until it reaches a terminal state, sleeping the poller's
/// interval between two pokes.
///
/// # Returns
/// The context of the finished wait, or
/// * [`FlowError::ResourceFailed`] if the resource failed,
/// * [`FlowError::Timeout`] if the policy ran out,
/// * whatever error the status query raised.
pub async fn wait_for<S: StatusSource>(
    poller: &ResourcePoller<S>,
    handle: ResourceHandle,
    policy: &SensorPolicy,
) -> Result<RunContext> {
    let mut ctx = RunContext::new(handle, policy);
    loop {
        ctx.attempt += 1;
        match poller.poll(&ctx.handle).await? {
            PollOutcome::Succeeded => {
                info!(
                    "{} {} is done after {} attempts",
                    poller.config().kind,
                    ctx.handle,
                    ctx.attempt
                );
                return Ok(ctx);
            }
            PollOutcome::Failed(reason) => {
                return Err(FlowError::ResourceFailed(format!(
                    "{} {} failed with reason: {}",
                    poller.config().kind,
                    ctx.handle,
                    reason
                )));
            }
            PollOutcome::Continue => {
                ctx.check_budget(policy)?;
                tokio::time::sleep(poller.config().interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::tests::ScriptedSource;
    use crate::poller::PollerConfig;

    #[test]
    fn bundled_policy() -> Result<()> {
        let policy = SensorPolicy::try_new()?;
        assert_eq!(Some(Duration::from_secs(7 * 24 * 3600)), policy.timeout);
        assert_eq!(None, policy.max_attempts);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_done() -> Result<()> {
        let poller = ResourcePoller::new(
            PollerConfig::cluster(),
            ScriptedSource::new(&["STARTING", "BOOTSTRAPPING", "WAITING"], None),
        );
        let start = Instant::now();
        let ctx = wait_for(
            &poller,
            ResourceHandle::new("j-ABC123"),
            &SensorPolicy::default(),
        )
        .await?;

        assert_eq!(3, ctx.attempt);
        assert_eq!("j-ABC123", ctx.handle.as_str());
        // two sleeps of the default 60s interval
        assert!(start.elapsed() >= Duration::from_secs(120));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn failures_carry_the_reason() {
        let poller = ResourcePoller::new(
            PollerConfig::notebook_execution(),
            ScriptedSource::new(&["START_PENDING", "RUNNING", "FAILED"], Some("out of memory")),
        );
        match wait_for(
            &poller,
            ResourceHandle::new("ex-J0123456789"),
            &SensorPolicy::default(),
        )
        .await
        {
            Err(FlowError::ResourceFailed(msg)) => {
                assert_eq!(
                    "notebook execution ex-J0123456789 failed with reason: out of memory",
                    msg
                )
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_budget() {
        let poller = ResourcePoller::new(
            PollerConfig::cluster(),
            ScriptedSource::new(&["STARTING", "STARTING", "STARTING", "WAITING"], None),
        );
        let policy = SensorPolicy::default().with_max_attempts(2);
        match wait_for(&poller, ResourceHandle::new("j-ABC123"), &policy).await {
            Err(FlowError::Timeout(msg)) => assert!(msg.contains("2 attempts")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(2, poller.source().queried().len());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline() {
        let poller = ResourcePoller::new(
            PollerConfig::cluster().with_interval(Duration::from_secs(30)),
            ScriptedSource::new(&["STARTING"; 10], None),
        );
        let policy = SensorPolicy::default().with_timeout(Duration::from_secs(90));
        match wait_for(&poller, ResourceHandle::new("j-ABC123"), &policy).await {
            Err(FlowError::Timeout(msg)) => assert!(msg.contains("deadline")),
            other => panic!("unexpected result: {:?}", other),
        }
        // pokes at 0s, 30s, 60s and 90s
        assert_eq!(4, poller.source().queried().len());
    }
}
