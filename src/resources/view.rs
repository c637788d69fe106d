use std::fmt;
use std::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{JenkinsError, Result};
use crate::jenkins::Jenkins;
use crate::links;
use crate::requester::RequestBody;

use super::InnerJob;

/// Name and URL of a view, as listed by the root or a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewData {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewResponse {
    #[serde(rename = "_class")]
    pub class: String,
    pub description: Option<String>,
    pub jobs: Vec<InnerJob>,
    pub name: String,
    pub url: String,
}

/// View classes the server can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    ListView,
    NestedView,
    MyView,
    DashboardView,
    PipelineView,
}

impl ViewType {
    pub const ALL: [ViewType; 5] = [
        Self::ListView,
        Self::NestedView,
        Self::MyView,
        Self::DashboardView,
        Self::PipelineView,
    ];

    /// Java class name sent as the view `mode`.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::ListView => "hudson.model.ListView",
            Self::NestedView => "hudson.plugins.nested_view.NestedView",
            Self::MyView => "hudson.model.MyView",
            Self::DashboardView => "hudson.plugins.view.dashboard.Dashboard",
            Self::PipelineView => {
                "au.com.centrumsystems.hudson.plugin.buildpipeline.BuildPipelineView"
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListView => "LIST_VIEW",
            Self::NestedView => "NESTED_VIEW",
            Self::MyView => "MY_VIEW",
            Self::DashboardView => "DASHBOARD_VIEW",
            Self::PipelineView => "PIPELINE_VIEW",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = JenkinsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|view_type| view_type.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                JenkinsError::Config(format!(
                    "Unsupported view type {s}; use one of {}",
                    supported.join(", ")
                ))
            })
    }
}

/// Maps a view type name (`LIST_VIEW`, ...) to its server class name.
pub fn detect_view_type(name: &str) -> Result<&'static str> {
    name.parse::<ViewType>().map(ViewType::class_name)
}

#[derive(Debug, Clone)]
pub struct View {
    raw: ViewResponse,
    base: String,
    jenkins: Jenkins,
}

impl View {
    pub fn new(jenkins: Jenkins, base: impl Into<String>) -> Self {
        Self {
            raw: ViewResponse::default(),
            base: base.into(),
            jenkins,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &ViewResponse {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn description(&self) -> &str {
        self.raw.description.as_deref().unwrap_or_default()
    }

    pub fn url(&self) -> &str {
        &self.raw.url
    }

    pub fn jobs(&self) -> &[InnerJob] {
        &self.raw.jobs
    }

    pub async fn poll(&mut self) -> Result<u16> {
        self.jenkins.poll_into(&self.base, &[], &mut self.raw).await
    }

    pub async fn add_job(&self, name: &str) -> Result<()> {
        self.jenkins
            .post_action(
                &links::join(&self.base, "addJobToView"),
                &[("name", name)],
                RequestBody::Empty,
            )
            .await?;
        info!("Added {name} to view {}", self.base);
        Ok(())
    }

    pub async fn remove_job(&self, name: &str) -> Result<()> {
        self.jenkins
            .post_action(
                &links::join(&self.base, "removeJobFromView"),
                &[("name", name)],
                RequestBody::Empty,
            )
            .await?;
        info!("Removed {name} from view {}", self.base);
        Ok(())
    }
}
