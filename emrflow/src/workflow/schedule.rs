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

//! Fixed-cadence triggering of workflow runs.

use super::{RunReport, Workflow};
use crate::configs::{duration_setting, EMRFLOW_CONF};
use crate::error::{FlowError, Result};
use async_trait::async_trait;
use ini::Ini;
use log::{info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Called after every scheduled run, e.g. to print the run or to clean up
/// the resources it left behind.
#[async_trait]
pub trait RunObserver: Send + Sync {
    /// Inspects a finished, failed or interrupted run.
    async fn on_run(&self, report: &RunReport);
}

#[async_trait]
impl RunObserver for () {
    async fn on_run(&self, _report: &RunReport) {}
}

/// Run counts of a schedule. Reports themselves are handed to the
/// [`RunObserver`] and not kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    /// Runs triggered, including an interrupted one.
    pub runs:        usize,
    /// Runs that did not succeed, including an interrupted one.
    pub failed:      usize,
    /// True if the schedule stopped because of a shutdown request.
    pub interrupted: bool,
}

impl ScheduleSummary {
    fn record(&mut self, report: &RunReport) {
        self.runs += 1;
        if report.outcome.is_err() {
            self.failed += 1;
        }
    }
}

/// Triggers a workflow every `interval`, starting immediately.
///
/// Ticks missed while a run is still in progress are skipped rather than
/// replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between two triggers.
    pub interval: Duration,
}

impl Schedule {
    /// Creates a schedule.
    pub fn every(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(FlowError::Config(
                "schedule interval must be positive".to_string(),
            ));
        }
        Ok(Self { interval })
    }

    /// Reads `[workflow] schedule_interval` from the bundled settings.
    pub fn try_new() -> Result<Self> {
        Self::from_ini(&EMRFLOW_CONF)
    }

    /// Reads `[workflow] schedule_interval` from `conf`.
    pub fn from_ini(conf: &Ini) -> Result<Self> {
        Self::every(duration_setting(conf, "workflow", "schedule_interval")?)
    }

    /// Runs `workflow` on this schedule until `max_runs` runs are done (never,
    /// if `None`) or `shutdown` completes.
    ///
    /// `shutdown` is watched while waiting for the next tick and while a run
    /// is in progress; a run it interrupts is still handed to `observer`.
    /// A failed run is logged and the next tick still fires.
    pub async fn run<F, O>(
        &self,
        workflow: &Workflow,
        max_runs: Option<usize>,
        shutdown: F,
        observer: &O,
    ) -> ScheduleSummary
    where
        F: Future<Output = ()>,
        O: RunObserver + ?Sized,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = ScheduleSummary::default();
        while max_runs.map_or(true, |max| summary.runs < max) {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    summary.interrupted = true;
                    break;
                }
            }

            let report = workflow.run_until(&mut shutdown).await;
            match &report.outcome {
                Ok(_) => info!("[OK] {} run {} succeeded", workflow.name(), report.run_id),
                Err(e) => warn!("{} run {} failed: {}", workflow.name(), report.run_id, e),
            }
            observer.on_run(&report).await;
            summary.record(&report);

            if matches!(report.outcome, Err(FlowError::Cancelled(_))) {
                summary.interrupted = true;
                break;
            }
        }

        if summary.interrupted {
            info!("{} stopped after {} runs", workflow.name(), summary.runs);
        }
        summary
    }
}
