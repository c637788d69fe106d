//! In-memory mirrors of remote Jenkins objects.
//!
//! Every resource follows the same shape: a `raw` snapshot decoded from the
//! server, a `base` path that addresses it, and a clone of the shared
//! [`Jenkins`](crate::Jenkins) handle. `raw` starts out as its `Default`
//! value and is only ever replaced wholesale by a successful `poll`.
//!
//! Resources are not synchronized internally. Polling or mutating one takes
//! `&mut self`; share a resource across tasks behind your own lock.

use log::warn;

use crate::error::{JenkinsError, Result};

mod build;
mod folder;
mod invoke;
mod job;
mod label;
mod node;
mod pipeline;
mod plugin;
mod queue;
mod view;

pub use build::{Artifact, Build, BuildAction, BuildCause, BuildParameter, BuildResponse};
pub use folder::{Folder, FolderResponse};
pub use invoke::{BuildFile, Invocation, InvokeOptions, QueueItemId};
pub use job::{
    BuildKind, HealthReport, InnerJob, Job, JobBuild, JobProperty, JobResponse, JobStatus,
    ParameterDefinition, ParameterValue,
};
pub use label::{Label, LabelNode, LabelResponse};
pub use node::{Node, NodeMode, NodeResponse};
pub use pipeline::{
    Link, Links, PipelineArtifact, PipelineInputAction, PipelineNode, PipelineNodeLog,
    PipelineNodeResponse, PipelineRun, PipelineRunResponse,
};
pub use plugin::{Plugin, PluginDependency, PluginResponse, Plugins};
pub use queue::{Queue, QueueItem, QueueResponse, QueueTask, TaskInfo};
pub use view::{detect_view_type, View, ViewData, ViewResponse, ViewType};

/// Result of a create-style action.
///
/// The resource exists on the server once this is returned. The follow-up
/// poll that populates it may still have failed; that failure is kept in
/// `poll_warning` instead of being dropped or turned into an error.
#[derive(Debug)]
pub struct Created<T> {
    pub resource: T,
    pub poll_warning: Option<JenkinsError>,
}

impl<T> Created<T> {
    /// Wraps a freshly created resource with the outcome of its follow-up poll.
    pub(crate) fn settle(resource: T, poll: Result<u16>, name: &str) -> Self {
        let poll_warning = match poll {
            Ok(200) => None,
            Ok(code) => Some(JenkinsError::Status { code }),
            Err(err) => Some(err),
        };
        if let Some(err) = &poll_warning {
            warn!("{name} was created but could not be polled: {err}");
        }
        Self {
            resource,
            poll_warning,
        }
    }

    /// Whether the follow-up poll populated the resource.
    pub fn is_populated(&self) -> bool {
        self.poll_warning.is_none()
    }

    pub fn into_inner(self) -> T {
        self.resource
    }
}
