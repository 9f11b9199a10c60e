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

//! Runs a fixed, linear list of steps.
//!
//! The EMR notebook workflow is four steps long:
//!
//! ```text
//! create_cluster_task >> check_cluster >> start_execution_task >> check_notebook_execution
//! ```
//!
//! Every run gets a fresh [`HandoffStore`] through which the cluster id
//! reaches the notebook execution. The first failing step aborts the run.
//! There is no global state: the schedule, the retry budget and the handoff
//! values are all explicit arguments.

mod context;
mod handoff;
mod schedule;
mod step;

pub use context::{wait_for, RunContext, SensorPolicy};
pub use handoff::HandoffStore;
pub use schedule::{RunObserver, Schedule, ScheduleSummary};
pub use step::{CreateStep, Provisioner, SensorStep, Step};

use crate::aws::emr::{
    ClusterProvisioner, ClusterStatusSource, NotebookExecutionProvisioner,
    NotebookExecutionStatusSource,
};
use crate::configs::{setting, EmrClusterConfig, NotebookExecutionConfig};
use crate::error::{FlowError, Result};
use crate::poller::{PollerConfig, ResourcePoller, StatusSource};
use chrono::{DateTime, Utc};
use ini::Ini;
use log::{error, info};
use rusoto_emr::EmrClient;
use std::future::Future;

/// Creates the cluster.
pub const CREATE_CLUSTER_STEP: &str = "create_cluster_task";
/// Waits for the cluster to come up.
pub const CHECK_CLUSTER_STEP: &str = "check_cluster";
/// Starts the notebook execution.
pub const START_EXECUTION_STEP: &str = "start_execution_task";
/// Waits for the notebook execution to finish.
pub const CHECK_EXECUTION_STEP: &str = "check_notebook_execution";

/// The result of one run.
#[derive(Debug)]
pub struct RunReport {
    /// `<workflow>__<start time>`.
    pub run_id:      String,
    /// When the run started.
    pub started_at:  DateTime<Utc>,
    /// When the run finished or aborted.
    pub finished_at: DateTime<Utc>,
    /// The values produced by the steps that ran.
    pub store:       HandoffStore,
    /// `Ok` if every step succeeded, else the error of the failing step.
    pub outcome:     Result<()>,
}

/// A named sequence of steps.
pub struct Workflow {
    name:  String,
    steps: Vec<Box<dyn Step>>,
}

impl Workflow {
    /// Creates an empty workflow.
    pub fn new(name: &str) -> Self {
        Self {
            name:  name.to_owned(),
            steps: vec![],
        }
    }

    /// Appends a step.
    pub fn step<T: Step + 'static>(mut self, step: T) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// The workflow name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step once, in order.
    pub async fn run(&self) -> RunReport {
        self.run_until(std::future::pending()).await
    }

    /// Runs every step once, in order, unless `shutdown` completes first.
    ///
    /// An interrupted run stops the step in progress and reports
    /// [`FlowError::Cancelled`]. Values already handed off stay in the
    /// report's store.
    pub async fn run_until<F>(&self, shutdown: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let started_at = Utc::now();
        let run_id = format!("{}__{}", self.name, started_at.to_rfc3339());
        info!("Starting run {}", run_id);

        let mut store = HandoffStore::new();
        let mut outcome = Ok(());
        for step in &self.steps {
            info!("[{}] running {}", run_id, step.name());
            let result = tokio::select! {
                result = step.execute(&mut store) => result,
                _ = &mut shutdown => Err(FlowError::Cancelled(format!(
                    "{} interrupted during {}",
                    run_id,
                    step.name()
                ))),
            };
            if let Err(e) = result {
                error!("[{}] {} failed: {}", run_id, step.name(), e);
                outcome = Err(e);
                break;
            }
        }

        RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            store,
            outcome,
        }
    }
}

/// Assembles the four-step notebook workflow from its parts.
pub fn notebook_workflow<CP, CS, NP, NS>(
    name: &str,
    create_cluster: CP,
    cluster_poller: ResourcePoller<CS>,
    start_execution: NP,
    execution_poller: ResourcePoller<NS>,
    policy: SensorPolicy,
) -> Workflow
where
    CP: Provisioner + 'static,
    CS: StatusSource + 'static,
    NP: Provisioner + 'static,
    NS: StatusSource + 'static,
{
    Workflow::new(name)
        .step(CreateStep::new(CREATE_CLUSTER_STEP, create_cluster))
        .step(SensorStep::new(
            CHECK_CLUSTER_STEP,
            CREATE_CLUSTER_STEP,
            cluster_poller,
            policy,
        ))
        .step(CreateStep::new(START_EXECUTION_STEP, start_execution))
        .step(SensorStep::new(
            CHECK_EXECUTION_STEP,
            START_EXECUTION_STEP,
            execution_poller,
            policy,
        ))
}

/// Builds the notebook workflow against EMR, reading every setting from
/// `conf`.
pub fn emr_notebook_workflow(client: EmrClient, conf: &Ini) -> Result<Workflow> {
    Ok(notebook_workflow(
        setting(conf, "workflow", "name")?,
        ClusterProvisioner::new(client.clone(), EmrClusterConfig::from_ini(conf)?),
        ResourcePoller::new(
            PollerConfig::from_ini(conf, "cluster", "cluster")?,
            ClusterStatusSource::new(client.clone()),
        ),
        NotebookExecutionProvisioner::new(
            client.clone(),
            NotebookExecutionConfig::from_ini(conf)?,
            CREATE_CLUSTER_STEP,
        ),
        ResourcePoller::new(
            PollerConfig::from_ini(conf, "notebook", "notebook execution")?,
            NotebookExecutionStatusSource::new(client),
        ),
        SensorPolicy::from_ini(conf)?,
    ))
}
