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

//! This module provides various default configurations for emrflow.
//!
//! Every setting lives in the bundled `config.toml`, exposed as
//! [`EMRFLOW_CONF`]. Components read their section through `from_ini`, so an
//! override file loaded with [`load_config`] reaches all of them.

pub mod emr_cluster;
pub use emr_cluster::EmrClusterConfig;

pub mod notebook;
pub use notebook::NotebookExecutionConfig;

mod emrflow;
pub use self::emrflow::*;
