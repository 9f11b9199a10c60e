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

mod args;
mod cluster;
mod notebook;
mod rainbow;
mod run;
mod transform;

use crate::rainbow::rainbow_println;
use anyhow::{Context, Result};
use clap::{crate_version, ArgMatches, Command};
use emrflow::configs::{load_config, setting, EMRFLOW_CONF};
use ini::Ini;
use rusoto_core::Region;
use rusoto_emr::EmrClient;

fn cli() -> Command<'static> {
    Command::new("emrflow")
        .version(crate_version!())
        .about("Command Line Controller for EMR clusters and notebook executions")
        .author("UMD Database Group")
        .args(args::get_args())
        .subcommand(cluster::command_args())
        .subcommand(notebook::command_args())
        .subcommand(run::command_args())
        .subcommand(transform::command_args())
}

fn config(matches: &ArgMatches) -> Result<Ini> {
    match matches.value_of("config") {
        Some(path) => {
            load_config(path).with_context(|| format!("Failed to load config file {}", path))
        }
        None => Ok(EMRFLOW_CONF.clone()),
    }
}

fn emr_client(conf: &Ini) -> Result<EmrClient> {
    let region = setting(conf, "aws", "region")?
        .parse::<Region>()
        .context("Invalid [aws] region")?;
    Ok(EmrClient::new(region))
}

#[tokio::main]
pub async fn main() -> Result<()> {
    let mut app = cli();
    let matches = app.get_matches_mut();
    args::get_logging(&matches)?.init();

    if !matches.is_present("silent") {
        rainbow_println(include_str!("./emrflow"));
    }

    let conf = config(&matches)?;
    match matches.subcommand() {
        Some(("cluster", sub)) => cluster::command(sub, &conf, &emr_client(&conf)?).await?,
        Some(("notebook", sub)) => notebook::command(sub, &conf, &emr_client(&conf)?).await?,
        Some(("run", sub)) => run::command(sub, &conf, &emr_client(&conf)?).await?,
        Some(("transform", sub)) => transform::command(sub)?,
        _ => app.print_help()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rainbow_print() {
        let text = include_str!("./emrflow");
        rainbow_println(text);
    }

    #[tokio::test]
    async fn default_config_and_region() -> Result<()> {
        let matches = cli().try_get_matches_from(vec!["emrflow", "run"])?;
        let conf = config(&matches)?;
        assert_eq!("us-west-2", setting(&conf, "aws", "region")?);
        emr_client(&conf)?;
        Ok(())
    }

    #[test]
    fn missing_config_file() {
        let matches = cli()
            .try_get_matches_from(vec!["emrflow", "-c", "/nonexistent/emrflow.toml", "run"])
            .unwrap();
        assert!(config(&matches).is_err());
    }
}
