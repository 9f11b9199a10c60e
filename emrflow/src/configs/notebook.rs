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

//! Helper functions to start an EMR notebook execution.

use super::emrflow::{setting, EMRFLOW_CONF};
use crate::error::Result;
use crate::poller::ResourceHandle;
use ini::Ini;
use rusoto_emr::{ExecutionEngineConfig, StartNotebookExecutionInput};

/// EMR notebook execution configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookExecutionConfig {
    /// The unique identifier of the EMR notebook (editor), e.g. `e-ABCDEFG`.
    pub editor_id:     String,
    /// The path and file name of the notebook file relative to the editor
    /// root, e.g. `folder/demo.ipynb`.
    pub relative_path: String,
    /// The execution engine type. Only `EMR` is supported by the service.
    pub engine_type:   String,
    /// The IAM role that EMR assumes to run the notebook.
    pub service_role:  String,
}

impl NotebookExecutionConfig {
    /// Creates a new notebook configuration from the bundled settings.
    pub fn try_new() -> Result<NotebookExecutionConfig> {
        Self::from_ini(&EMRFLOW_CONF)
    }

    /// Creates a new notebook configuration from the `[notebook]` section.
    pub fn from_ini(conf: &Ini) -> Result<NotebookExecutionConfig> {
        Ok(NotebookExecutionConfig {
            editor_id:     setting(conf, "notebook", "editor_id")?.to_owned(),
            relative_path: setting(conf, "notebook", "relative_path")?.to_owned(),
            engine_type:   setting(conf, "notebook", "engine_type")?.to_owned(),
            service_role:  setting(conf, "notebook", "service_role")?.to_owned(),
        })
    }

    /// Sets the editor id.
    pub fn set_editor_id(&mut self, editor_id: &str) -> &mut Self {
        self.editor_id = editor_id.to_owned();
        self
    }

    /// Sets the notebook path.
    pub fn set_relative_path(&mut self, relative_path: &str) -> &mut Self {
        self.relative_path = relative_path.to_owned();
        self
    }

    /// Builds the `StartNotebookExecution` request that runs the notebook on
    /// `cluster`.
    pub fn to_request(&self, cluster: &ResourceHandle) -> StartNotebookExecutionInput {
        StartNotebookExecutionInput {
            editor_id: self.editor_id.clone(),
            relative_path: self.relative_path.clone(),
            execution_engine: ExecutionEngineConfig {
                id: cluster.as_str().to_owned(),
                type_: Some(self.engine_type.clone()),
                ..Default::default()
            },
            service_role: self.service_role.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_runs_on_the_given_cluster() -> Result<()> {
        let mut conf = NotebookExecutionConfig::try_new()?;
        conf.set_editor_id("e-XYZ").set_relative_path("reports/daily.ipynb");

        let request = conf.to_request(&ResourceHandle::new("j-ABC123"));
        assert_eq!("e-XYZ", request.editor_id);
        assert_eq!("reports/daily.ipynb", request.relative_path);
        assert_eq!("j-ABC123", request.execution_engine.id);
        assert_eq!(Some("EMR".to_owned()), request.execution_engine.type_);
        assert_eq!("EMR_Notebooks_DefaultRole", request.service_role);
        Ok(())
    }
}
