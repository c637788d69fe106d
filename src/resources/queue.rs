use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::jenkins::Jenkins;
use crate::requester::RequestBody;

use super::JobBuild;

const QUEUE_BASE: &str = "/queue";

/// The job a queue item will build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueTask {
    pub name: String,
    pub url: String,
    pub color: String,
}

/// One waiting build request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(rename = "_class")]
    pub class: String,
    pub id: i64,
    pub blocked: bool,
    pub buildable: bool,
    pub stuck: bool,
    pub pending: bool,
    pub cancelled: Option<bool>,
    pub in_queue_since: i64,
    pub params: String,
    pub task: QueueTask,
    pub url: String,
    /// Human-readable reason the item is still waiting.
    pub why: Option<String>,
    /// The build this item became, once an executor picked it up.
    pub executable: Option<JobBuild>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueResponse {
    pub items: Vec<TaskInfo>,
}

/// The server's build queue.
#[derive(Debug, Clone)]
pub struct Queue {
    raw: QueueResponse,
    jenkins: Jenkins,
}

impl Queue {
    pub fn new(jenkins: Jenkins) -> Self {
        Self {
            raw: QueueResponse::default(),
            jenkins,
        }
    }

    pub fn base(&self) -> &str {
        QUEUE_BASE
    }

    pub fn raw(&self) -> &QueueResponse {
        &self.raw
    }

    pub fn items(&self) -> &[TaskInfo] {
        &self.raw.items
    }

    /// Items queued for the job named `name`.
    pub fn items_for_job(&self, name: &str) -> Vec<&TaskInfo> {
        self.raw
            .items
            .iter()
            .filter(|item| item.task.name == name)
            .collect()
    }

    pub async fn poll(&mut self) -> Result<u16> {
        self.jenkins.poll_into(QUEUE_BASE, &[], &mut self.raw).await
    }

    /// Removes an item from the queue. The server answers 200 or 204.
    pub async fn cancel_item(&self, id: i64) -> Result<()> {
        cancel(&self.jenkins, id).await
    }
}

/// A single queue item, addressed as `/queue/item/<id>`.
///
/// The item outlives its stay in the queue for a few minutes, which is when
/// [`QueueItem::build_number`] becomes available.
#[derive(Debug, Clone)]
pub struct QueueItem {
    raw: TaskInfo,
    base: String,
    jenkins: Jenkins,
}

impl QueueItem {
    pub fn new(jenkins: Jenkins, id: &str) -> Self {
        Self {
            raw: TaskInfo::default(),
            base: format!("{QUEUE_BASE}/item/{}", urlencoding::encode(id)),
            jenkins,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &TaskInfo {
        &self.raw
    }

    pub fn id(&self) -> i64 {
        self.raw.id
    }

    pub fn why(&self) -> Option<&str> {
        self.raw.why.as_deref()
    }

    /// Number of the build this item turned into; `None` while it waits.
    pub fn build_number(&self) -> Option<i64> {
        self.raw.executable.as_ref().map(|build| build.number)
    }

    pub async fn poll(&mut self) -> Result<u16> {
        self.jenkins.poll_into(&self.base, &[], &mut self.raw).await
    }

    pub async fn cancel(&self) -> Result<()> {
        cancel(&self.jenkins, self.raw.id).await
    }
}

async fn cancel(jenkins: &Jenkins, id: i64) -> Result<()> {
    let id = id.to_string();
    let response = jenkins
        .post(
            &format!("{QUEUE_BASE}/cancelItem"),
            &[("id", id.as_str())],
            RequestBody::Empty,
        )
        .await?;
    response.ensure_status(&[200, 204])?;
    info!("Cancelled queue item {id}");
    Ok(())
}
