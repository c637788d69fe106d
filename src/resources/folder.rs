use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{JenkinsError, Result};
use crate::jenkins::Jenkins;
use crate::links;
use crate::requester::RequestBody;

use super::{Created, InnerJob, Job, ViewData};

const FOLDER_MODE: &str = "com.cloudbees.hudson.plugins.folder.Folder";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FolderResponse {
    #[serde(rename = "_class")]
    pub class: String,
    pub description: Option<String>,
    pub display_name: String,
    pub name: String,
    pub url: String,
    pub jobs: Vec<InnerJob>,
    pub primary_view: Option<ViewData>,
    pub views: Vec<ViewData>,
}

/// A CloudBees folder. Addressed like a job (`/job/<a>/job/<b>`).
#[derive(Debug, Clone)]
pub struct Folder {
    raw: FolderResponse,
    base: String,
    jenkins: Jenkins,
}

impl Folder {
    pub fn new(jenkins: Jenkins, base: impl Into<String>) -> Self {
        Self {
            raw: FolderResponse::default(),
            base: base.into(),
            jenkins,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &FolderResponse {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn jobs(&self) -> &[InnerJob] {
        &self.raw.jobs
    }

    pub async fn poll(&mut self) -> Result<u16> {
        self.jenkins.poll_into(&self.base, &[], &mut self.raw).await
    }

    /// Fetches a job directly inside this folder.
    pub async fn get_job(&self, name: &str) -> Result<Job> {
        let mut job = Job::new(
            self.jenkins.clone(),
            format!("{}/job/{}", self.base, urlencoding::encode(name)),
        );
        crate::jenkins::ensure_found(job.poll().await?)?;
        Ok(job)
    }

    /// Creates the folder this handle points at, inside its parent folder.
    pub async fn create(mut self) -> Result<Created<Folder>> {
        let name = links::job_name(&self.base)
            .ok_or_else(|| JenkinsError::MissingField(format!("folder name in {}", self.base)))?;
        let json = serde_json::json!({ "name": name, "mode": FOLDER_MODE }).to_string();

        self.jenkins
            .post_action(
                &links::join(links::parent_base(&self.base), "createItem"),
                &[
                    ("name", name.as_str()),
                    ("mode", FOLDER_MODE),
                    ("Submit", "OK"),
                    ("json", json.as_str()),
                ],
                RequestBody::Empty,
            )
            .await?;
        info!("Created folder {name}");

        let outcome = self.poll().await;
        Ok(Created::settle(self, outcome, &name))
    }
}
