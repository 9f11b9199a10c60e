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

//! emrflow CLI runs the fleet sizing macro against a local event.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use emrflow::prelude::*;
use std::io::Read;

pub fn command_args() -> Command<'static> {
    Command::new("transform")
        .about("Applies the fleet sizing macro to a CloudFormation macro event")
        .arg(
            Arg::new("event file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Reads the event from FILE instead of stdin")
                .takes_value(true),
        )
}

pub fn command(matches: &ArgMatches) -> Result<()> {
    let payload = match matches.value_of("event file") {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    println!("{}", apply(&payload)?);
    Ok(())
}

fn apply(payload: &str) -> Result<String> {
    let event: MacroEvent = serde_json::from_str(payload)?;
    Ok(serde_json::to_string_pretty(&transform(event)?)?)
}
