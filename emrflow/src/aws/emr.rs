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

//! This crate contains all wrapped functions of the Amazon EMR service.

use crate::configs::{EmrClusterConfig, NotebookExecutionConfig};
use crate::error::{FlowError, Result};
use crate::poller::{ResourceHandle, StatusSnapshot, StatusSource};
use crate::workflow::{HandoffStore, Provisioner};
use async_trait::async_trait;
use log::info;
use rusoto_emr::{
    DescribeClusterInput, DescribeClusterOutput, DescribeNotebookExecutionInput,
    DescribeNotebookExecutionOutput, Emr, EmrClient, TerminateJobFlowsInput,
};

/// Creates an EMR cluster.
///
/// # Arguments
/// * `client` - The EMR client.
/// * `conf` - The cluster configuration.
///
/// # Returns
/// The id of the new cluster (job flow), e.g. `j-2AXXXXXXGAPLF`.
pub async fn run_job_flow(client: &EmrClient, conf: &EmrClusterConfig) -> Result<ResourceHandle> {
    let cluster_id = client
        .run_job_flow(conf.to_request())
        .await
        .map_err(|e| FlowError::AWS(e.to_string()))?
        .job_flow_id
        .ok_or_else(|| FlowError::AWS("No job flow id!".to_string()))?;
    info!("Created a cluster: {}", cluster_id);
    Ok(ResourceHandle::new(cluster_id))
}

/// Starts a notebook execution.
///
/// # Arguments
/// * `client` - The EMR client.
/// * `conf` - The notebook configuration.
/// * `cluster` - The cluster to run the notebook on.
///
/// # Returns
/// The id of the new notebook execution, e.g. `ex-J0123456789`.
pub async fn start_notebook_execution(
    client: &EmrClient,
    conf: &NotebookExecutionConfig,
    cluster: &ResourceHandle,
) -> Result<ResourceHandle> {
    info!("Starting an execution using cluster: {}", cluster);
    let execution_id = client
        .start_notebook_execution(conf.to_request(cluster))
        .await
        .map_err(|e| FlowError::AWS(e.to_string()))?
        .notebook_execution_id
        .ok_or_else(|| FlowError::AWS("No notebook execution id!".to_string()))?;
    info!("Started an execution: {}", execution_id);
    Ok(ResourceHandle::new(execution_id))
}

/// Describes a cluster.
pub async fn describe_cluster(
    client: &EmrClient,
    cluster: &ResourceHandle,
) -> Result<DescribeClusterOutput> {
    client
        .describe_cluster(DescribeClusterInput {
            cluster_id: cluster.as_str().to_owned(),
        })
        .await
        .map_err(|e| FlowError::AWS(e.to_string()))
}

/// Describes a notebook execution.
pub async fn describe_notebook_execution(
    client: &EmrClient,
    execution: &ResourceHandle,
) -> Result<DescribeNotebookExecutionOutput> {
    client
        .describe_notebook_execution(DescribeNotebookExecutionInput {
            notebook_execution_id: execution.as_str().to_owned(),
        })
        .await
        .map_err(|e| FlowError::AWS(e.to_string()))
}

/// Terminates a cluster. Clusters are kept alive after the notebook
/// finishes, so they have to be shut down explicitly.
pub async fn terminate_cluster(client: &EmrClient, cluster: &ResourceHandle) -> Result<()> {
    client
        .terminate_job_flows(TerminateJobFlowsInput {
            job_flow_ids: vec![cluster.as_str().to_owned()],
        })
        .await
        .map_err(|e| FlowError::AWS(e.to_string()))?;
    info!("Terminating cluster: {}", cluster);
    Ok(())
}

/// Extracts the cluster state and its state change message.
pub fn cluster_snapshot(response: &DescribeClusterOutput) -> Result<StatusSnapshot> {
    let status = response
        .cluster
        .as_ref()
        .and_then(|c| c.status.as_ref())
        .ok_or_else(|| FlowError::AWS("No cluster status in response!".to_string()))?;
    Ok(StatusSnapshot {
        status:         status
            .state
            .clone()
            .ok_or_else(|| FlowError::AWS("No cluster state in response!".to_string()))?,
        failure_reason: status
            .state_change_reason
            .as_ref()
            .and_then(|r| r.message.clone()),
    })
}

/// Extracts the notebook execution status and its last state change reason.
pub fn notebook_execution_snapshot(
    response: &DescribeNotebookExecutionOutput,
) -> Result<StatusSnapshot> {
    let execution = response
        .notebook_execution
        .as_ref()
        .ok_or_else(|| FlowError::AWS("No notebook execution in response!".to_string()))?;
    Ok(StatusSnapshot {
        status:         execution.status.clone().ok_or_else(|| {
            FlowError::AWS("No notebook execution status in response!".to_string())
        })?,
        failure_reason: execution.last_state_change_reason.clone(),
    })
}

/// Cluster status queries through `DescribeCluster`.
#[derive(Clone)]
pub struct ClusterStatusSource {
    client: EmrClient,
}

impl ClusterStatusSource {
    /// Creates a new source on top of `client`.
    pub fn new(client: EmrClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusSource for ClusterStatusSource {
    type Response = DescribeClusterOutput;

    async fn fetch(&self, handle: &ResourceHandle) -> Result<DescribeClusterOutput> {
        describe_cluster(&self.client, handle).await
    }

    fn snapshot(&self, response: &DescribeClusterOutput) -> Result<StatusSnapshot> {
        cluster_snapshot(response)
    }
}

/// Notebook execution status queries through `DescribeNotebookExecution`.
#[derive(Clone)]
pub struct NotebookExecutionStatusSource {
    client: EmrClient,
}

impl NotebookExecutionStatusSource {
    /// Creates a new source on top of `client`.
    pub fn new(client: EmrClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusSource for NotebookExecutionStatusSource {
    type Response = DescribeNotebookExecutionOutput;

    async fn fetch(&self, handle: &ResourceHandle) -> Result<DescribeNotebookExecutionOutput> {
        describe_notebook_execution(&self.client, handle).await
    }

    fn snapshot(&self, response: &DescribeNotebookExecutionOutput) -> Result<StatusSnapshot> {
        notebook_execution_snapshot(response)
    }
}

/// Creates the cluster of a workflow run.
#[derive(Clone)]
pub struct ClusterProvisioner {
    client: EmrClient,
    conf:   EmrClusterConfig,
}

impl ClusterProvisioner {
    /// Creates a new provisioner.
    pub fn new(client: EmrClient, conf: EmrClusterConfig) -> Self {
        Self { client, conf }
    }
}

#[async_trait]
impl Provisioner for ClusterProvisioner {
    async fn provision(&self, _: &HandoffStore) -> Result<ResourceHandle> {
        run_job_flow(&self.client, &self.conf).await
    }
}

/// Starts the notebook execution of a workflow run on the cluster produced by
/// the step named `cluster_step`.
#[derive(Clone)]
pub struct NotebookExecutionProvisioner {
    client:       EmrClient,
    conf:         NotebookExecutionConfig,
    cluster_step: String,
}

impl NotebookExecutionProvisioner {
    /// Creates a new provisioner.
    pub fn new(client: EmrClient, conf: NotebookExecutionConfig, cluster_step: &str) -> Self {
        Self {
            client,
            conf,
            cluster_step: cluster_step.to_owned(),
        }
    }
}

#[async_trait]
impl Provisioner for NotebookExecutionProvisioner {
    async fn provision(&self, store: &HandoffStore) -> Result<ResourceHandle> {
        let cluster = store.pull(&self.cluster_step)?;
        start_notebook_execution(&self.client, &self.conf, cluster).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusoto_emr::{Cluster, ClusterStateChangeReason, ClusterStatus, NotebookExecution};

    fn cluster_output(state: Option<&str>, message: Option<&str>) -> DescribeClusterOutput {
        DescribeClusterOutput {
            cluster: Some(Cluster {
                id: Some("j-ABC123".to_owned()),
                status: Some(ClusterStatus {
                    state: state.map(str::to_owned),
                    state_change_reason: Some(ClusterStateChangeReason {
                        code:    Some("BOOTSTRAP_FAILURE".to_owned()),
                        message: message.map(str::to_owned),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn cluster_state_and_reason() -> Result<()> {
        let snapshot = cluster_snapshot(&cluster_output(
            Some("TERMINATED_WITH_ERRORS"),
            Some("bootstrap action 1 failed"),
        ))?;
        assert_eq!(
            StatusSnapshot::new("TERMINATED_WITH_ERRORS", Some("bootstrap action 1 failed")),
            snapshot
        );

        let snapshot = cluster_snapshot(&cluster_output(Some("WAITING"), None))?;
        assert_eq!(StatusSnapshot::new("WAITING", None), snapshot);
        Ok(())
    }

    #[test]
    fn cluster_response_without_state() {
        assert!(matches!(
            cluster_snapshot(&cluster_output(None, None)),
            Err(FlowError::AWS(_))
        ));
        assert!(matches!(
            cluster_snapshot(&DescribeClusterOutput::default()),
            Err(FlowError::AWS(_))
        ));
    }

    #[test]
    fn notebook_status_and_reason() -> Result<()> {
        let response = DescribeNotebookExecutionOutput {
            notebook_execution: Some(NotebookExecution {
                notebook_execution_id: Some("ex-J0123456789".to_owned()),
                status: Some("FAILED".to_owned()),
                last_state_change_reason: Some("out of memory".to_owned()),
                ..Default::default()
            }),
        };
        assert_eq!(
            StatusSnapshot::new("FAILED", Some("out of memory")),
            notebook_execution_snapshot(&response)?
        );

        assert!(matches!(
            notebook_execution_snapshot(&DescribeNotebookExecutionOutput::default()),
            Err(FlowError::AWS(_))
        ));
        Ok(())
    }
}
