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

//! Values passed from one step to the next within a single run.

use crate::error::{FlowError, Result};
use crate::poller::ResourceHandle;
use log::debug;
use std::collections::HashMap;

/// Resource handles keyed by the name of the step that produced them.
///
/// A store lives for exactly one run and is handed to every step by
/// reference. Each key is written once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HandoffStore {
    values: HashMap<String, ResourceHandle>,
}

impl HandoffStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the handle produced by `step`.
    pub fn push(&mut self, step: &str, handle: ResourceHandle) -> Result<()> {
        if let Some(existing) = self.values.get(step) {
            return Err(FlowError::Handoff(format!(
                "step {} already produced {}",
                step, existing
            )));
        }
        debug!("{} -> {}", step, handle);
        self.values.insert(step.to_owned(), handle);
        Ok(())
    }

    /// Reads the handle produced by `step`.
    pub fn pull(&self, step: &str) -> Result<&ResourceHandle> {
        self.values
            .get(step)
            .ok_or_else(|| FlowError::Handoff(format!("no value produced by step {}", step)))
    }

    /// Returns the handle produced by `step`, if any.
    pub fn get(&self, step: &str) -> Option<&ResourceHandle> {
        self.values.get(step)
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no step produced a value yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
