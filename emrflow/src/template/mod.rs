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

//! A CloudFormation macro that sizes the task fleet of an EMR cluster
//! template.
//!
//! The template marks the capacity to fill in with a placeholder:
//!
//! ```json
//! {
//!     "Type": "AWS::EMR::InstanceFleetConfig",
//!     "Properties": {
//!         "InstanceFleetType": "TASK",
//!         "TargetOnDemandCapacity": "custom::Target",
//!         "TargetSpotCapacity": 0
//!     }
//! }
//! ```
//!
//! When invoked with `FleetType = task` and `InputSize = 4`, the placeholder
//! becomes `4`. Any other fleet type leaves the fragment alone.
//!
//! More details: <https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/template-macros.html>

use crate::error::{FlowError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The placeholder a template uses for the capacity to fill in.
pub const TARGET_PLACEHOLDER: &str = "custom::Target";

/// The only fleet type that gets resized.
pub const TASK_FLEET: &str = "task";

/// The on-demand capacity property of an instance fleet.
pub const ON_DEMAND_CAPACITY: &str = "TargetOnDemandCapacity";

/// The spot capacity property of an instance fleet.
pub const SPOT_CAPACITY: &str = "TargetSpotCapacity";

/// The event CloudFormation sends to a macro function. Fields this macro
/// does not use (`accountId`, `region`, `transformId`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroEvent {
    /// Echoed back in the response.
    pub request_id: String,
    /// The template fragment to transform.
    pub fragment:   Value,
    /// The parameters given to `Fn::Transform`.
    pub params:     MacroParams,
}

/// Parameters of the fleet sizing macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroParams {
    /// `task`, `core` or `master`.
    #[serde(rename = "FleetType")]
    pub fleet_type: String,
    /// The target capacity, as a decimal string.
    #[serde(rename = "InputSize")]
    pub input_size: String,
}

/// The response a macro function returns to CloudFormation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroResponse {
    /// Copied from the event.
    pub request_id:  String,
    /// Always `success`.
    pub status:      String,
    /// Always `200`.
    pub status_code: u16,
    /// The transformed fragment.
    pub fragment:    Value,
}

impl MacroResponse {
    /// A successful response.
    pub fn success(request_id: String, fragment: Value) -> Self {
        Self {
            request_id,
            status: "success".to_owned(),
            status_code: 200,
            fragment,
        }
    }
}

/// Runs the macro.
///
/// `InputSize` must be an integer even when the fleet is not resized.
/// Malformed events are errors; nothing is repaired.
pub fn transform(event: MacroEvent) -> Result<MacroResponse> {
    let size = event
        .params
        .input_size
        .trim()
        .parse::<i64>()
        .map_err(|e| {
            FlowError::Template(format!(
                "InputSize {:?} is not an integer: {}",
                event.params.input_size, e
            ))
        })?;

    info!("{}", event.fragment);

    let mut fragment = event.fragment;
    if event.params.fleet_type == TASK_FLEET {
        resize_task_fleet(&mut fragment, size)?;
    }

    info!("{}", fragment);

    Ok(MacroResponse::success(event.request_id, fragment))
}

/// Replaces the placeholder in `TargetOnDemandCapacity` or, failing that,
/// in `TargetSpotCapacity` with `size`. At most one field changes.
pub fn resize_task_fleet(fragment: &mut Value, size: i64) -> Result<()> {
    let properties = fragment
        .get_mut("Properties")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| FlowError::Template("fragment has no Properties".to_owned()))?;

    if is_placeholder(properties, ON_DEMAND_CAPACITY)? {
        properties.insert(ON_DEMAND_CAPACITY.to_owned(), json!(size));
    } else if is_placeholder(properties, SPOT_CAPACITY)? {
        properties.insert(SPOT_CAPACITY.to_owned(), json!(size));
    }
    Ok(())
}

fn is_placeholder(properties: &Map<String, Value>, key: &str) -> Result<bool> {
    properties
        .get(key)
        .map(|v| v.as_str() == Some(TARGET_PLACEHOLDER))
        .ok_or_else(|| FlowError::Template(format!("fragment has no Properties.{}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(fleet_type: &str, size: &str, on_demand: Value, spot: Value) -> MacroEvent {
        serde_json::from_value(json!({
            "region": "us-west-2",
            "accountId": "123456789012",
            "transformId": "123456789012::EmrFleetSize",
            "templateParameterValues": {},
            "requestId": "a1b2c3",
            "params": { "FleetType": fleet_type, "InputSize": size },
            "fragment": {
                "Type": "AWS::EMR::InstanceFleetConfig",
                "Properties": {
                    "ClusterId": { "Ref": "Cluster" },
                    "InstanceFleetType": "TASK",
                    "TargetOnDemandCapacity": on_demand,
                    "TargetSpotCapacity": spot
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn on_demand_placeholder() -> Result<()> {
        let resp = transform(event("task", "4", json!(TARGET_PLACEHOLDER), json!(2)))?;
        assert_eq!(json!(4), resp.fragment["Properties"][ON_DEMAND_CAPACITY]);
        assert_eq!(json!(2), resp.fragment["Properties"][SPOT_CAPACITY]);
        assert_eq!("a1b2c3", resp.request_id);
        assert_eq!("success", resp.status);
        assert_eq!(200, resp.status_code);
        Ok(())
    }

    #[test]
    fn spot_placeholder() -> Result<()> {
        let resp = transform(event("task", "12", json!(1), json!(TARGET_PLACEHOLDER)))?;
        assert_eq!(json!(1), resp.fragment["Properties"][ON_DEMAND_CAPACITY]);
        assert_eq!(json!(12), resp.fragment["Properties"][SPOT_CAPACITY]);
        Ok(())
    }

    #[test]
    fn on_demand_wins_when_both_are_placeholders() -> Result<()> {
        let resp = transform(event(
            "task",
            "3",
            json!(TARGET_PLACEHOLDER),
            json!(TARGET_PLACEHOLDER),
        ))?;
        assert_eq!(json!(3), resp.fragment["Properties"][ON_DEMAND_CAPACITY]);
        assert_eq!(
            json!(TARGET_PLACEHOLDER),
            resp.fragment["Properties"][SPOT_CAPACITY]
        );
        Ok(())
    }

    #[test]
    fn other_fleets_pass_through() -> Result<()> {
        for fleet in &["core", "master", "TASK", ""] {
            let input = event(fleet, "4", json!(TARGET_PLACEHOLDER), json!(0));
            let before = serde_json::to_string(&input.fragment)?;
            let resp = transform(input)?;
            assert_eq!(before, serde_json::to_string(&resp.fragment)?);
        }
        Ok(())
    }

    #[test]
    fn non_numeric_size() {
        for size in &["four", "", "4.5"] {
            let result = transform(event("core", size, json!(1), json!(1)));
            assert!(matches!(result, Err(FlowError::Template(_))), "{}", size);
        }
    }

    #[test]
    fn missing_capacity_fields() {
        let mut fragment = json!({ "Properties": { "TargetSpotCapacity": "custom::Target" } });
        assert!(matches!(
            resize_task_fleet(&mut fragment, 2),
            Err(FlowError::Template(_))
        ));

        // the spot field is only looked at when on-demand is not a placeholder
        let mut fragment = json!({ "Properties": { "TargetOnDemandCapacity": "custom::Target" } });
        resize_task_fleet(&mut fragment, 2).unwrap();
        assert_eq!(json!({ "Properties": { "TargetOnDemandCapacity": 2 } }), fragment);

        let mut fragment = json!({ "Type": "AWS::EMR::InstanceFleetConfig" });
        assert!(resize_task_fleet(&mut fragment, 2).is_err());
    }

    #[test]
    fn response_wire_format() -> Result<()> {
        let resp = MacroResponse::success("a1b2c3".to_owned(), json!({ "Type": "X" }));
        assert_eq!(
            json!({
                "requestId": "a1b2c3",
                "status": "success",
                "statusCode": 200,
                "fragment": { "Type": "X" }
            }),
            serde_json::to_value(&resp)?
        );
        Ok(())
    }
}
