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

//! emrflow CLI starts and watches EMR notebook executions.

use crate::rainbow::{rainbow_banner, rainbow_println};
use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use emrflow::aws::emr;
use emrflow::prelude::*;
use ini::Ini;
use rusoto_emr::EmrClient;

pub fn command_args() -> Command<'static> {
    Command::new("notebook")
        .about("Starts and watches EMR notebook executions")
        .subcommand_required(true)
        .subcommand(
            Command::new("start")
                .about("Runs a notebook on a cluster and prints the execution id")
                .arg(
                    Arg::new("cluster id")
                        .short('C')
                        .long("cluster")
                        .value_name("CLUSTER_ID")
                        .help("The cluster to run the notebook on")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::new("editor id")
                        .short('e')
                        .long("editor")
                        .value_name("EDITOR_ID")
                        .help("Overrides the notebook (editor) id, e.g. e-ABCDEFG")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("path")
                        .short('p')
                        .long("path")
                        .value_name("PATH")
                        .help("Overrides the notebook file, e.g. folder/demo.ipynb")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("wait")
                        .short('w')
                        .long("wait")
                        .help("Waits until the execution finishes"),
                ),
        )
        .subcommand(execution_id_command(
            "status",
            "Polls the notebook execution once",
        ))
        .subcommand(execution_id_command(
            "wait",
            "Polls the notebook execution until it finishes or fails",
        ))
}

fn execution_id_command(name: &'static str, about: &'static str) -> Command<'static> {
    Command::new(name).about(about).arg(
        Arg::new("execution id")
            .value_name("EXECUTION_ID")
            .help("The notebook execution id, e.g. ex-J0123456789")
            .required(true)
            .takes_value(true),
    )
}

pub async fn command(matches: &ArgMatches, conf: &Ini, client: &EmrClient) -> Result<()> {
    match matches.subcommand() {
        Some(("start", sub)) => {
            rainbow_banner("Start an EMR notebook execution");
            let mut notebook = NotebookExecutionConfig::from_ini(conf)?;
            if let Some(editor_id) = sub.value_of("editor id") {
                notebook.set_editor_id(editor_id);
            }
            if let Some(path) = sub.value_of("path") {
                notebook.set_relative_path(path);
            }
            let cluster = handle(sub, "cluster id")?;
            let execution = emr::start_notebook_execution(client, &notebook, &cluster).await?;
            rainbow_println(format!("[OK] started execution {}", execution));
            if sub.is_present("wait") {
                wait(conf, client, execution).await?;
            }
        }
        Some(("status", sub)) => {
            let execution = handle(sub, "execution id")?;
            let outcome = poller(conf, client)?.poll(&execution).await?;
            rainbow_println(format!("{}: {:?}", execution, outcome));
        }
        Some(("wait", sub)) => {
            wait(conf, client, handle(sub, "execution id")?).await?;
        }
        _ => unreachable!("clap requires a notebook subcommand"),
    }
    Ok(())
}

fn handle(matches: &ArgMatches, arg: &str) -> Result<ResourceHandle> {
    matches
        .value_of(arg)
        .map(ResourceHandle::new)
        .ok_or_else(|| anyhow!("No {} provided", arg))
}

fn poller(
    conf: &Ini,
    client: &EmrClient,
) -> Result<ResourcePoller<NotebookExecutionStatusSource>> {
    Ok(ResourcePoller::new(
        PollerConfig::from_ini(conf, "notebook", "notebook execution")?,
        NotebookExecutionStatusSource::new(client.clone()),
    ))
}

async fn wait(conf: &Ini, client: &EmrClient, execution: ResourceHandle) -> Result<()> {
    let ctx = wait_for(
        &poller(conf, client)?,
        execution,
        &SensorPolicy::from_ini(conf)?,
    )
    .await?;
    rainbow_println(format!(
        "[OK] execution {} finished after {} polls",
        ctx.handle, ctx.attempt
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_needs_a_cluster() {
        assert!(command_args()
            .try_get_matches_from(vec!["notebook", "start"])
            .is_err());

        let matches = command_args()
            .try_get_matches_from(vec![
                "notebook", "start", "-C", "j-ABC123", "-e", "e-XYZ", "-p", "a/b.ipynb",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!("j-ABC123", handle(sub, "cluster id").unwrap().as_str());
        assert_eq!(Some("e-XYZ"), sub.value_of("editor id"));
        assert_eq!(Some("a/b.ipynb"), sub.value_of("path"));
        assert!(!sub.is_present("wait"));
    }
}
