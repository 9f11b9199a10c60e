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

//! emrflow CLI creates, watches and terminates EMR clusters.

use crate::rainbow::{rainbow_banner, rainbow_println};
use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use emrflow::aws::emr;
use emrflow::prelude::*;
use ini::Ini;
use rusoto_emr::EmrClient;

pub fn command_args() -> Command<'static> {
    Command::new("cluster")
        .about("Creates, watches and terminates EMR clusters")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Creates a cluster and prints its id")
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .help("Overrides the cluster name")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("subnet")
                        .short('s')
                        .long("subnet")
                        .value_name("SUBNET_ID")
                        .help("Overrides the subnet the cluster is launched in")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("release")
                        .short('r')
                        .long("release")
                        .value_name("LABEL")
                        .help("Overrides the EMR release label, e.g. emr-6.2.0")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("instance type")
                        .short('i')
                        .long("instance-type")
                        .value_name("TYPE")
                        .help("Overrides the master instance type")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("count")
                        .long("count")
                        .value_name("N")
                        .help("Overrides the number of master instances")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("wait")
                        .short('w')
                        .long("wait")
                        .help("Waits until the cluster is ready"),
                ),
        )
        .subcommand(cluster_id_command("status", "Polls the cluster state once"))
        .subcommand(cluster_id_command(
            "wait",
            "Polls the cluster until it leaves STARTING, BOOTSTRAPPING and TERMINATING",
        ))
        .subcommand(cluster_id_command("terminate", "Terminates the cluster"))
}

fn cluster_id_command(name: &'static str, about: &'static str) -> Command<'static> {
    Command::new(name).about(about).arg(
        Arg::new("cluster id")
            .value_name("CLUSTER_ID")
            .help("The cluster id, e.g. j-2AXXXXXXGAPLF")
            .required(true)
            .takes_value(true),
    )
}

pub async fn command(matches: &ArgMatches, conf: &Ini, client: &EmrClient) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub)) => {
            rainbow_banner("Create an EMR cluster");
            let cluster = cluster_config(sub, conf)?;
            let handle = emr::run_job_flow(client, &cluster).await?;
            rainbow_println(format!("[OK] created cluster {}", handle));
            if sub.is_present("wait") {
                wait(conf, client, handle).await?;
            }
        }
        Some(("status", sub)) => {
            let handle = cluster_id(sub)?;
            let outcome = poller(conf, client)?.poll(&handle).await?;
            rainbow_println(format!("{}: {:?}", handle, outcome));
        }
        Some(("wait", sub)) => {
            wait(conf, client, cluster_id(sub)?).await?;
        }
        Some(("terminate", sub)) => {
            let handle = cluster_id(sub)?;
            emr::terminate_cluster(client, &handle).await?;
            rainbow_println(format!("[OK] terminating cluster {}", handle));
        }
        _ => unreachable!("clap requires a cluster subcommand"),
    }
    Ok(())
}

fn cluster_config(matches: &ArgMatches, conf: &Ini) -> Result<EmrClusterConfig> {
    let mut cluster = EmrClusterConfig::from_ini(conf)?;
    if let Some(name) = matches.value_of("name") {
        cluster.set_name(name);
    }
    if let Some(subnet) = matches.value_of("subnet") {
        cluster.set_subnet_id(subnet);
    }
    if let Some(release) = matches.value_of("release") {
        cluster.set_release_label(release);
    }
    if let Some(instance_type) = matches.value_of("instance type") {
        cluster.set_instance_type(instance_type);
    }
    if let Some(count) = matches.value_of("count") {
        cluster.set_instance_count(count.parse()?);
    }
    Ok(cluster)
}

fn cluster_id(matches: &ArgMatches) -> Result<ResourceHandle> {
    matches
        .value_of("cluster id")
        .map(ResourceHandle::new)
        .ok_or_else(|| anyhow!("No cluster id provided"))
}

fn poller(conf: &Ini, client: &EmrClient) -> Result<ResourcePoller<ClusterStatusSource>> {
    Ok(ResourcePoller::new(
        PollerConfig::from_ini(conf, "cluster", "cluster")?,
        ClusterStatusSource::new(client.clone()),
    ))
}

async fn wait(conf: &Ini, client: &EmrClient, handle: ResourceHandle) -> Result<()> {
    let ctx = wait_for(&poller(conf, client)?, handle, &SensorPolicy::from_ini(conf)?).await?;
    rainbow_println(format!(
        "[OK] cluster {} is ready after {} polls",
        ctx.handle, ctx.attempt
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cluster_commands() {
        let matches = command_args()
            .try_get_matches_from(vec!["cluster", "wait", "j-ABC123"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!("wait", name);
        assert_eq!("j-ABC123", cluster_id(sub).unwrap().as_str());

        let matches = command_args()
            .try_get_matches_from(vec!["cluster", "create", "-s", "subnet-0abc", "--wait"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(Some("subnet-0abc"), sub.value_of("subnet"));
        assert!(sub.is_present("wait"));

        assert!(command_args()
            .try_get_matches_from(vec!["cluster", "status"])
            .is_err());
    }

    #[test]
    fn create_overrides() -> Result<()> {
        let matches = command_args().try_get_matches_from(vec![
            "cluster",
            "create",
            "-n",
            "Nightly",
            "--release",
            "emr-6.5.0",
            "-i",
            "m5.2xlarge",
            "--count",
            "3",
        ])?;
        let (_, sub) = matches.subcommand().unwrap();
        let request = cluster_config(sub, &EMRFLOW_CONF)?.to_request();

        assert_eq!("Nightly", request.name);
        assert_eq!(Some("emr-6.5.0".to_owned()), request.release_label);
        let group = &request.instances.instance_groups.unwrap()[0];
        assert_eq!("m5.2xlarge", group.instance_type);
        assert_eq!(3, group.instance_count);
        // untouched settings keep the bundled values
        assert_eq!(Some("subnet-123456".to_owned()), request.instances.ec_2_subnet_id);

        let matches =
            command_args().try_get_matches_from(vec!["cluster", "create", "--count", "many"])?;
        let (_, sub) = matches.subcommand().unwrap();
        assert!(cluster_config(sub, &EMRFLOW_CONF).is_err());
        Ok(())
    }
}
