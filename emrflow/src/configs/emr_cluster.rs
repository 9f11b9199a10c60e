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

//! Helper functions to create an EMR cluster.

use super::emrflow::{list_setting, parse_setting, setting, EMRFLOW_CONF};
use crate::error::Result;
use ini::Ini;
use rusoto_emr::{Application, InstanceGroupConfig, JobFlowInstancesConfig, RunJobFlowInput};

/// EMR cluster configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmrClusterConfig {
    /// The name of the job flow.
    pub name:                  String,
    /// The Amazon EMR release label, which determines the version of
    /// open-source application packages installed on the cluster. Release
    /// labels are in the form `emr-x.x.x`, where x.x.x is an Amazon EMR
    /// release version such as `emr-6.2.0`.
    ///
    /// EMR notebooks need at least `emr-5.18.0`; notebook executions need
    /// `emr-5.32.0` or `emr-6.2.0` and later.
    pub release_label:         String,
    /// Applications to install on the cluster. A notebook execution needs
    /// `Spark`, `Livy` and `JupyterEnterpriseGateway`.
    pub applications:          Vec<String>,
    /// The friendly name of the master instance group.
    pub instance_group_name:   String,
    /// `ON_DEMAND` or `SPOT`.
    pub market:                String,
    /// The role of the instance group in the cluster, e.g. `MASTER`.
    pub instance_role:         String,
    /// The EC2 instance type, e.g. `m5.xlarge`.
    pub instance_type:         String,
    /// Target number of instances for the instance group.
    pub instance_count:        i64,
    /// Keeps the cluster in `WAITING` when it has no steps left, so that
    /// notebooks can be attached to it.
    pub keep_alive:            bool,
    /// Locks the cluster against accidental termination.
    pub termination_protected: bool,
    /// The subnet the cluster is launched in. Notebook executions require a
    /// cluster in a VPC subnet.
    pub subnet_id:             String,
    /// The IAM role that cluster EC2 instances assume.
    pub job_flow_role:         String,
    /// The IAM role that EMR assumes to access AWS resources on your behalf.
    pub service_role:          String,
}

impl EmrClusterConfig {
    /// Creates a new cluster configuration from the bundled settings.
    pub fn try_new() -> Result<EmrClusterConfig> {
        Self::from_ini(&EMRFLOW_CONF)
    }

    /// Creates a new cluster configuration from the `[cluster]` and `[aws]`
    /// sections of `conf`.
    pub fn from_ini(conf: &Ini) -> Result<EmrClusterConfig> {
        Ok(EmrClusterConfig {
            name:                  setting(conf, "cluster", "name")?.to_owned(),
            release_label:         setting(conf, "cluster", "release_label")?.to_owned(),
            applications:          list_setting(conf, "cluster", "applications")?,
            instance_group_name:   setting(conf, "cluster", "instance_group_name")?.to_owned(),
            market:                setting(conf, "cluster", "market")?.to_owned(),
            instance_role:         setting(conf, "cluster", "instance_role")?.to_owned(),
            instance_type:         setting(conf, "cluster", "instance_type")?.to_owned(),
            instance_count:        parse_setting(conf, "cluster", "instance_count")?,
            keep_alive:            parse_setting(conf, "cluster", "keep_alive")?,
            termination_protected: parse_setting(conf, "cluster", "termination_protected")?,
            subnet_id:             setting(conf, "aws", "subnet_id")?.to_owned(),
            job_flow_role:         setting(conf, "cluster", "job_flow_role")?.to_owned(),
            service_role:          setting(conf, "cluster", "service_role")?.to_owned(),
        })
    }

    /// Sets the cluster name.
    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_owned();
        self
    }

    /// Sets the EMR release label.
    pub fn set_release_label(&mut self, release_label: &str) -> &mut Self {
        self.release_label = release_label.to_owned();
        self
    }

    /// Sets the master instance type.
    pub fn set_instance_type(&mut self, instance_type: &str) -> &mut Self {
        self.instance_type = instance_type.to_owned();
        self
    }

    /// Sets the number of master instances.
    pub fn set_instance_count(&mut self, instance_count: i64) -> &mut Self {
        self.instance_count = instance_count;
        self
    }

    /// Sets the subnet id.
    pub fn set_subnet_id(&mut self, subnet_id: &str) -> &mut Self {
        self.subnet_id = subnet_id.to_owned();
        self
    }

    /// Builds the `RunJobFlow` request.
    pub fn to_request(&self) -> RunJobFlowInput {
        RunJobFlowInput {
            name: self.name.clone(),
            release_label: Some(self.release_label.clone()),
            applications: Some(
                self.applications
                    .iter()
                    .map(|name| Application {
                        name: Some(name.clone()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            visible_to_all_users: Some(true),
            instances: JobFlowInstancesConfig {
                instance_groups: Some(vec![InstanceGroupConfig {
                    name: Some(self.instance_group_name.clone()),
                    market: Some(self.market.clone()),
                    instance_role: self.instance_role.clone(),
                    instance_type: self.instance_type.clone(),
                    instance_count: self.instance_count,
                    ..Default::default()
                }]),
                keep_job_flow_alive_when_no_steps: Some(self.keep_alive),
                termination_protected: Some(self.termination_protected),
                ec_2_subnet_id: Some(self.subnet_id.clone()),
                ..Default::default()
            },
            job_flow_role: Some(self.job_flow_role.clone()),
            service_role: Some(self.service_role.clone()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_cluster_request() -> Result<()> {
        let mut conf = EmrClusterConfig::try_new()?;
        conf.set_subnet_id("subnet-0abc");
        let request = conf.to_request();

        assert_eq!("Demo-Cluster", request.name);
        assert_eq!(Some("emr-6.2.0".to_owned()), request.release_label);
        assert_eq!(
            vec!["Spark", "Livy", "JupyterEnterpriseGateway"],
            request
                .applications
                .unwrap()
                .into_iter()
                .filter_map(|a| a.name)
                .collect::<Vec<_>>()
        );
        assert_eq!(Some(true), request.visible_to_all_users);
        assert_eq!(Some("EMR_EC2_DefaultRole".to_owned()), request.job_flow_role);
        assert_eq!(Some("EMR_DefaultRole".to_owned()), request.service_role);

        let instances = request.instances;
        assert_eq!(Some(true), instances.keep_job_flow_alive_when_no_steps);
        assert_eq!(Some(false), instances.termination_protected);
        assert_eq!(Some("subnet-0abc".to_owned()), instances.ec_2_subnet_id);

        let groups = instances.instance_groups.unwrap();
        assert_eq!(1, groups.len());
        assert_eq!(Some("Master nodes".to_owned()), groups[0].name);
        assert_eq!(Some("ON_DEMAND".to_owned()), groups[0].market);
        assert_eq!("MASTER", groups[0].instance_role);
        assert_eq!("m5.xlarge", groups[0].instance_type);
        assert_eq!(1, groups[0].instance_count);
        Ok(())
    }
}
