use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::jenkins::Jenkins;

use super::NodeMode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelNode {
    #[serde(rename = "_class")]
    pub class: String,
    pub node_name: String,
    pub node_description: Option<String>,
    pub num_executors: i64,
    pub mode: Option<NodeMode>,
}

/// Snapshot of `GET /label/<name>/api/json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelResponse {
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<LabelNode>,
    pub offline: bool,
    pub idle_executors: i64,
    pub busy_executors: i64,
    pub total_executors: i64,
}

#[derive(Debug, Clone)]
pub struct Label {
    raw: LabelResponse,
    base: String,
    jenkins: Jenkins,
}

impl Label {
    pub fn new(jenkins: Jenkins, base: impl Into<String>) -> Self {
        Self {
            raw: LabelResponse::default(),
            base: base.into(),
            jenkins,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &LabelResponse {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn nodes(&self) -> &[LabelNode] {
        &self.raw.nodes
    }

    pub async fn poll(&mut self) -> Result<u16> {
        self.jenkins.poll_into(&self.base, &[], &mut self.raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_label_executor_counts() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/label/linux%20%26%26%20docker/api/json")
            .with_status(200)
            .with_body(r#"{
                "name": "linux && docker",
                "nodes": [{"nodeName": "agent-1", "numExecutors": 2, "mode": "EXCLUSIVE"},
                          {"nodeName": "agent-2", "numExecutors": 2, "mode": "NORMAL"}],
                "offline": false,
                "idleExecutors": 3,
                "busyExecutors": 1,
                "totalExecutors": 4
            }"#)
            .create_async()
            .await;

        let jenkins = Jenkins::new(&server.url(), None).unwrap();
        let label = jenkins.get_label("linux && docker").await.unwrap();

        assert_eq!(label.name(), "linux && docker");
        assert_eq!(label.nodes().len(), 2);
        assert_eq!(label.nodes()[0].mode, Some(NodeMode::Exclusive));
        assert_eq!(label.raw().busy_executors, 1);
        assert_eq!(label.raw().total_executors, 4);
    }

    #[tokio::test]
    async fn test_unknown_label() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/label/gpu/api/json")
            .with_status(404)
            .create_async()
            .await;

        let jenkins = Jenkins::new(&server.url(), None).unwrap();
        assert!(jenkins.get_label("gpu").await.unwrap_err().is_not_found());
    }
}
