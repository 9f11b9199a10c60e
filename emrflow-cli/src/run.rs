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

//! emrflow CLI runs the cluster + notebook workflow, once or on a schedule.

use crate::rainbow::{rainbow_banner, rainbow_println};
use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use emrflow::aws::emr;
use emrflow::prelude::*;
use emrflow::workflow::CREATE_CLUSTER_STEP;
use ini::Ini;
use log::warn;
use rusoto_emr::EmrClient;
use std::future::{pending, Future};

pub fn command_args() -> Command<'static> {
    Command::new("run")
        .about("Runs create cluster >> check cluster >> start notebook >> check notebook")
        .arg(
            Arg::new("repeat")
                .short('r')
                .long("repeat")
                .help("Keeps triggering runs on the configured schedule"),
        )
        .arg(
            Arg::new("runs")
                .short('n')
                .long("runs")
                .value_name("N")
                .help("Stops after N scheduled runs")
                .requires("repeat")
                .takes_value(true),
        )
        .arg(
            Arg::new("every")
                .long("every")
                .value_name("DURATION")
                .help("Overrides the schedule interval, e.g. 10min")
                .requires("repeat")
                .takes_value(true),
        )
        .arg(
            Arg::new("terminate")
                .short('t')
                .long("terminate")
                .help("Terminates the cluster when a run is over"),
        )
}

pub async fn command(matches: &ArgMatches, conf: &Ini, client: &EmrClient) -> Result<()> {
    let workflow = emr_notebook_workflow(client.clone(), conf)?;
    rainbow_banner(&format!("Workflow {}", workflow.name()));
    rainbow_println(workflow.step_names().join(" >> "));

    let schedule = match matches.value_of("every") {
        Some(every) => Schedule::every(humantime::parse_duration(every)?)?,
        None => Schedule::from_ini(conf)?,
    };
    let max_runs = if matches.is_present("repeat") {
        matches
            .value_of("runs")
            .map(|n| n.parse::<usize>())
            .transpose()?
    } else {
        Some(1)
    };
    if max_runs != Some(1) {
        rainbow_println(format!(
            "Triggering {} every {}, Ctrl-C to stop",
            workflow.name(),
            humantime::format_duration(schedule.interval)
        ));
    }

    let printer = RunPrinter {
        client:    client.clone(),
        terminate: matches.is_present("terminate"),
    };
    let summary = schedule
        .run(&workflow, max_runs, interrupted(), &printer)
        .await;
    summarize(&summary)
}

/// Completes on the first Ctrl-C. Created once, so a signal sent while a run
/// is in progress is not lost.
fn interrupted() -> impl Future<Output = ()> {
    async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            pending::<()>().await;
        }
    }
}

/// Prints every run and optionally shuts its cluster down.
struct RunPrinter {
    client:    EmrClient,
    terminate: bool,
}

#[async_trait]
impl RunObserver for RunPrinter {
    async fn on_run(&self, report: &RunReport) {
        let elapsed = (report.finished_at - report.started_at)
            .to_std()
            .unwrap_or_default();
        match &report.outcome {
            Ok(()) => rainbow_println(format!(
                "[OK] {} in {}",
                report.run_id,
                humantime::format_duration(elapsed)
            )),
            Err(e) => rainbow_println(format!(
                "[FAILED] {} after {}: {}",
                report.run_id,
                humantime::format_duration(elapsed),
                e
            )),
        }

        if self.terminate {
            if let Some(cluster) = report.store.get(CREATE_CLUSTER_STEP) {
                if let Err(e) = emr::terminate_cluster(&self.client, cluster).await {
                    warn!("Failed to terminate cluster {}: {}", cluster, e);
                }
            }
        }
    }
}

fn summarize(summary: &ScheduleSummary) -> Result<()> {
    if summary.interrupted {
        rainbow_println(format!("Interrupted after {} runs", summary.runs));
    }
    if summary.failed > 0 {
        bail!("{} of {} runs failed", summary.failed, summary.runs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusoto_core::Region;

    #[test]
    fn runs_need_repeat() {
        assert!(command_args()
            .try_get_matches_from(vec!["run", "--runs", "3"])
            .is_err());

        let matches = command_args()
            .try_get_matches_from(vec!["run", "-r", "-n", "3", "--every", "5min", "-t"])
            .unwrap();
        assert!(matches.is_present("repeat"));
        assert!(matches.is_present("terminate"));
        assert_eq!(Some("3"), matches.value_of("runs"));
        assert_eq!(Some("5min"), matches.value_of("every"));
    }

    #[test]
    fn summary_fails_when_a_run_failed() {
        let ok = ScheduleSummary {
            runs: 3,
            ..Default::default()
        };
        assert!(summarize(&ok).is_ok());

        let interrupted = ScheduleSummary {
            runs:        2,
            failed:      1,
            interrupted: true,
        };
        assert!(summarize(&interrupted).is_err());
    }

    #[tokio::test]
    async fn printer_leaves_the_cluster_alone_by_default() {
        let now = chrono::Utc::now();
        let mut store = HandoffStore::new();
        store
            .push(CREATE_CLUSTER_STEP, ResourceHandle::new("j-ABC123"))
            .unwrap();
        let report = RunReport {
            run_id: "dag__now".to_owned(),
            started_at: now,
            finished_at: now,
            store,
            outcome: Err(FlowError::Cancelled("dag__now interrupted".to_owned())),
        };

        // no EMR call is made without --terminate
        let printer = RunPrinter {
            client:    EmrClient::new(Region::UsWest2),
            terminate: false,
        };
        printer.on_run(&report).await;
    }
}
