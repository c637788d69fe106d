use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::jenkins::Jenkins;
use crate::links;
use crate::requester::RequestBody;

/// How eagerly a node takes builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeMode {
    /// Use the node as much as possible.
    #[default]
    Normal,
    /// Only build jobs whose label expression matches the node.
    Exclusive,
}

impl NodeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Exclusive => "EXCLUSIVE",
        }
    }
}

impl fmt::Display for NodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of `GET /computer/<name>/api/json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeResponse {
    #[serde(rename = "_class")]
    pub class: String,
    pub display_name: String,
    pub description: Option<String>,
    pub icon: String,
    pub idle: bool,
    pub jnlp_agent: bool,
    pub launch_supported: bool,
    pub manual_launch_allowed: bool,
    pub num_executors: i64,
    pub offline: bool,
    pub offline_cause: Option<serde_json::Value>,
    pub offline_cause_reason: String,
    pub temporarily_offline: bool,
}

#[derive(Debug, Clone)]
pub struct Node {
    raw: NodeResponse,
    base: String,
    jenkins: Jenkins,
}

impl Node {
    pub fn new(jenkins: Jenkins, base: impl Into<String>) -> Self {
        Self {
            raw: NodeResponse::default(),
            base: base.into(),
            jenkins,
        }
    }

    pub(crate) fn from_response(jenkins: Jenkins, base: String, raw: NodeResponse) -> Self {
        Self { raw, base, jenkins }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &NodeResponse {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.raw.display_name
    }

    pub fn is_online(&self) -> bool {
        !self.raw.offline
    }

    pub fn is_idle(&self) -> bool {
        self.raw.idle
    }

    pub fn num_executors(&self) -> i64 {
        self.raw.num_executors
    }

    /// Why the node is offline, when the server gave a reason.
    pub fn offline_reason(&self) -> Option<&str> {
        Some(self.raw.offline_cause_reason.as_str()).filter(|reason| !reason.is_empty())
    }

    pub async fn poll(&mut self) -> Result<u16> {
        self.jenkins.poll_into(&self.base, &[], &mut self.raw).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.jenkins
            .post_action(&links::join(&self.base, "doDelete"), &[], RequestBody::Empty)
            .await?;
        info!("Deleted node {}", self.base);
        Ok(())
    }
}
