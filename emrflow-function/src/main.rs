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

//! The main entry point for the EMR fleet sizing macro function.
//!
//! Register it with CloudFormation as a macro, then reference it from a
//! template:
//!
//! ```yaml
//! TaskFleet:
//!   Fn::Transform:
//!     Name: EmrFleetSize
//!     Parameters:
//!       FleetType: task
//!       InputSize: !Ref TaskNodeCount
//! ```

use emrflow::prelude::*;
use lambda_runtime::{service_fn, LambdaEvent};
use log::info;

async fn handler(event: LambdaEvent<MacroEvent>) -> Result<MacroResponse> {
    info!(
        "Transforming fragment for request {} (aws request id {})",
        event.payload.request_id, event.context.request_id
    );
    transform(event.payload)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    lambda_runtime::run(service_fn(handler)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_runtime::Context;
    use serde_json::json;

    #[tokio::test]
    async fn handler_resizes_the_task_fleet() -> Result<()> {
        let payload: MacroEvent = serde_json::from_value(json!({
            "requestId": "f00d",
            "params": { "FleetType": "task", "InputSize": "8" },
            "fragment": {
                "Properties": {
                    "TargetOnDemandCapacity": 0,
                    "TargetSpotCapacity": "custom::Target"
                }
            }
        }))?;

        let resp = handler(LambdaEvent::new(payload, Context::default())).await?;
        assert_eq!(
            json!({
                "requestId": "f00d",
                "status": "success",
                "statusCode": 200,
                "fragment": {
                    "Properties": {
                        "TargetOnDemandCapacity": 0,
                        "TargetSpotCapacity": 8
                    }
                }
            }),
            serde_json::to_value(&resp)?
        );
        Ok(())
    }
}
