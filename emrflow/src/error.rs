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

//! emrflow error types

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::result;

/// Result type for operations that could result in an [FlowError]
pub type Result<T> = result::Result<T, FlowError>;

/// emrflow error
#[derive(Debug)]
pub enum FlowError {
    /// Error associated to Lambda runtime execution.
    LambdaError(Box<dyn std::error::Error + Send + Sync>),
    /// Error associated to I/O operations and associated traits.
    IoError(io::Error),
    /// Error returned when serde_json failed to serialize or deserialize data.
    SerdeJson(serde_json::Error),
    /// Error returned when accessing the AWS services fails, including a
    /// status query that could not be answered. The poller never retries
    /// these; the caller decides.
    AWS(String),
    /// Error returned when a cluster or a notebook execution reached an
    /// explicit failure state. Carries the reason reported by EMR.
    ResourceFailed(String),
    /// Error returned when a sensor ran out of attempts or passed its
    /// deadline before the resource reached a terminal state.
    Timeout(String),
    /// Error returned when a run was interrupted by a shutdown request before
    /// all of its steps finished.
    Cancelled(String),
    /// Error returned when a step asks for a value that no upstream step has
    /// produced.
    Handoff(String),
    /// Error returned when a CloudFormation macro event is malformed.
    Template(String),
    /// Error returned when a configuration value is missing or unparsable.
    Config(String),
    /// Error returned as a consequence of an error in emrflow.
    /// This error should not happen in normal usage of emrflow.
    Internal(String),
}

impl From<io::Error> for FlowError {
    fn from(e: io::Error) -> Self {
        FlowError::IoError(e)
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self {
        FlowError::SerdeJson(e)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for FlowError {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        FlowError::LambdaError(e)
    }
}

impl From<humantime::DurationError> for FlowError {
    fn from(e: humantime::DurationError) -> Self {
        FlowError::Config(e.to_string())
    }
}

impl From<&str> for FlowError {
    fn from(e: &str) -> Self {
        FlowError::Internal(e.to_string())
    }
}

impl Display for FlowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            FlowError::LambdaError(ref desc) => write!(f, "Lambda error: {}", desc),
            FlowError::IoError(ref desc) => write!(f, "IO error: {}", desc),
            FlowError::SerdeJson(ref desc) => write!(f, "serde_json error: {:?}", desc),
            FlowError::AWS(ref desc) => write!(f, "AWS error: {}", desc),
            FlowError::ResourceFailed(ref desc) => write!(f, "Resource failed: {}", desc),
            FlowError::Timeout(ref desc) => write!(f, "Timeout: {}", desc),
            FlowError::Cancelled(ref desc) => write!(f, "Cancelled: {}", desc),
            FlowError::Handoff(ref desc) => write!(f, "Handoff error: {}", desc),
            FlowError::Template(ref desc) => write!(f, "Template error: {}", desc),
            FlowError::Config(ref desc) => write!(f, "Configuration error: {}", desc),
            FlowError::Internal(ref desc) => write!(
                f,
                "Internal error: {}. This was likely caused by a bug in emrflow's \
                    code and we would welcome that you file an bug report in our issue tracker",
                desc
            ),
        }
    }
}

impl error::Error for FlowError {}
