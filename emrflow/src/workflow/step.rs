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

//! The two kinds of steps a workflow is made of: one that creates a
//! resource, and one that waits for it.

use super::context::{wait_for, SensorPolicy};
use super::handoff::HandoffStore;
use crate::error::Result;
use crate::poller::{ResourceHandle, ResourcePoller, StatusSource};
use async_trait::async_trait;

/// A single unit of work in a workflow.
#[async_trait]
pub trait Step: Send + Sync {
    /// The name other steps use to read this step's output.
    fn name(&self) -> &str;

    /// Runs the step. Outputs are written to `store` under [`Step::name`].
    async fn execute(&self, store: &mut HandoffStore) -> Result<()>;
}

/// Issues a one-shot creation call.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Creates the resource, reading upstream outputs from `store` if needed.
    async fn provision(&self, store: &HandoffStore) -> Result<ResourceHandle>;
}

/// Creates a resource and publishes its handle.
pub struct CreateStep<P> {
    name:        String,
    provisioner: P,
}

impl<P: Provisioner> CreateStep<P> {
    /// Creates a new step.
    pub fn new(name: &str, provisioner: P) -> Self {
        Self {
            name: name.to_owned(),
            provisioner,
        }
    }
}

#[async_trait]
impl<P: Provisioner> Step for CreateStep<P> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, store: &mut HandoffStore) -> Result<()> {
        let handle = self.provisioner.provision(store).await?;
        store.push(&self.name, handle)
    }
}

/// Waits for the resource created by `upstream`.
pub struct SensorStep<S> {
    name:     String,
    upstream: String,
    poller:   ResourcePoller<S>,
    policy:   SensorPolicy,
}

impl<S: StatusSource> SensorStep<S> {
    /// Creates a new step.
    pub fn new(name: &str, upstream: &str, poller: ResourcePoller<S>, policy: SensorPolicy) -> Self {
        Self {
            name: name.to_owned(),
            upstream: upstream.to_owned(),
            poller,
            policy,
        }
    }
}

#[async_trait]
impl<S: StatusSource> Step for SensorStep<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, store: &mut HandoffStore) -> Result<()> {
        let handle = store.pull(&self.upstream)?.clone();
        wait_for(&self.poller, handle, &self.policy).await?;
        Ok(())
    }
}
