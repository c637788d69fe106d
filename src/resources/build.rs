use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::jenkins::Jenkins;
use crate::links;
use crate::requester::RequestBody;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildParameter {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildCause {
    pub short_description: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub upstream_project: Option<String>,
    pub upstream_build: Option<i64>,
}

/// One entry of a build's `actions`. Most action classes carry neither
/// field; only parameter and cause actions are decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildAction {
    #[serde(rename = "_class")]
    pub class: String,
    pub parameters: Vec<BuildParameter>,
    pub causes: Vec<BuildCause>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Artifact {
    pub display_path: Option<String>,
    pub file_name: String,
    pub relative_path: String,
}

/// Snapshot of `GET /job/<name>/<number>/api/json?depth=1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildResponse {
    #[serde(rename = "_class")]
    pub class: String,
    pub actions: Vec<BuildAction>,
    pub artifacts: Vec<Artifact>,
    pub building: bool,
    pub built_on: String,
    pub description: Option<String>,
    pub display_name: String,
    /// Milliseconds.
    pub duration: i64,
    pub estimated_duration: i64,
    pub full_display_name: String,
    pub id: String,
    pub keep_log: bool,
    pub number: i64,
    pub queue_id: i64,
    /// `None` while the build is running.
    pub result: Option<String>,
    /// Start time, milliseconds since the epoch.
    pub timestamp: i64,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Build {
    raw: BuildResponse,
    base: String,
    jenkins: Jenkins,
}

impl Build {
    pub fn new(jenkins: Jenkins, base: impl Into<String>) -> Self {
        Self {
            raw: BuildResponse::default(),
            base: base.into(),
            jenkins,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &BuildResponse {
        &self.raw
    }

    /// Polls with `depth=1`, which inlines parameters and causes.
    pub async fn poll(&mut self) -> Result<u16> {
        self.jenkins
            .poll_into(&self.base, &[("depth", "1")], &mut self.raw)
            .await
    }

    pub fn number(&self) -> i64 {
        self.raw.number
    }

    pub fn url(&self) -> &str {
        &self.raw.url
    }

    /// Re-polls and reports whether the build is still running.
    pub async fn is_running(&mut self) -> Result<bool> {
        crate::jenkins::ensure_found(self.poll().await?)?;
        Ok(self.raw.building)
    }

    /// `SUCCESS`, `FAILURE`, `UNSTABLE`, `ABORTED`, `NOT_BUILT`; `None` while running.
    pub fn result(&self) -> Option<&str> {
        self.raw.result.as_deref()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.raw.duration).unwrap_or_default())
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.raw.timestamp)
    }

    pub fn parameters(&self) -> Vec<BuildParameter> {
        self.raw
            .actions
            .iter()
            .flat_map(|action| action.parameters.iter().cloned())
            .collect()
    }

    pub fn causes(&self) -> Vec<BuildCause> {
        self.raw
            .actions
            .iter()
            .flat_map(|action| action.causes.iter().cloned())
            .collect()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.raw.artifacts
    }

    pub fn artifact_path(&self, artifact: &Artifact) -> String {
        links::join(&self.base, &format!("artifact/{}", artifact.relative_path))
    }

    pub async fn download_artifact(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        let response = self.jenkins.get(&self.artifact_path(artifact), &[]).await?;
        response.ensure_status(&[200])?;
        Ok(response.body)
    }

    pub async fn console_output(&self) -> Result<String> {
        let response = self
            .jenkins
            .get(&links::join(&self.base, "consoleText"), &[])
            .await?;
        response.ensure_status(&[200])?;
        Ok(response.text())
    }

    pub async fn stop(&self) -> Result<()> {
        self.jenkins
            .post_action(&links::join(&self.base, "stop"), &[], RequestBody::Empty)
            .await?;
        info!("Stopped {}", self.base);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    const FINISHED: &str = r#"{
        "_class": "hudson.model.FreeStyleBuild",
        "number": 12,
        "url": "http://ci/job/app/12/",
        "building": false,
        "result": "SUCCESS",
        "duration": 61500,
        "timestamp": 1700000000000,
        "actions": [
            {"_class": "hudson.model.ParametersAction",
             "parameters": [{"_class": "hudson.model.StringParameterValue", "name": "ENV", "value": "prod"}]},
            {"_class": "hudson.model.CauseAction",
             "causes": [{"shortDescription": "Started by user admin", "userId": "admin", "userName": "admin"}]},
            {},
            {"_class": "hudson.plugins.git.util.BuildData", "remoteUrls": ["git@host:app.git"]}
        ],
        "artifacts": [{"displayPath": "app.tar.gz", "fileName": "app.tar.gz", "relativePath": "dist/app.tar.gz"}]
    }"#;

    async fn finished_build(server: &mut ServerGuard) -> Build {
        server
            .mock("GET", "/job/app/12/api/json")
            .match_query(Matcher::UrlEncoded("depth".into(), "1".into()))
            .with_status(200)
            .with_body(FINISHED)
            .create_async()
            .await;
        let jenkins = Jenkins::new(&server.url(), None).unwrap();
        jenkins.get_build("app", 12).await.unwrap()
    }

    #[tokio::test]
    async fn test_build_accessors() {
        let mut server = Server::new_async().await;
        let build = finished_build(&mut server).await;

        assert_eq!(build.number(), 12);
        assert_eq!(build.base(), "/job/app/12");
        assert_eq!(build.result(), Some("SUCCESS"));
        assert_eq!(build.duration(), Duration::from_millis(61_500));
        assert_eq!(
            build.timestamp().map(|t| t.to_rfc3339()),
            Some("2023-11-14T22:13:20+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn test_parameters_and_causes_from_actions() {
        let mut server = Server::new_async().await;
        let build = finished_build(&mut server).await;

        let parameters = build.parameters();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].name, "ENV");
        assert_eq!(parameters[0].value, serde_json::json!("prod"));

        let causes = build.causes();
        assert_eq!(causes[0].short_description, "Started by user admin");
        assert_eq!(causes[0].user_id.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_artifact_download() {
        let mut server = Server::new_async().await;
        let build = finished_build(&mut server).await;
        server
            .mock("GET", "/job/app/12/artifact/dist/app.tar.gz")
            .with_status(200)
            .with_body(vec![0x1f, 0x8b, 0x08])
            .create_async()
            .await;

        let artifact = &build.artifacts()[0];
        assert_eq!(build.artifact_path(artifact), "/job/app/12/artifact/dist/app.tar.gz");
        assert_eq!(build.download_artifact(artifact).await.unwrap(), vec![0x1f, 0x8b, 0x08]);
    }

    #[tokio::test]
    async fn test_console_output() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/app/12/consoleText")
            .with_status(200)
            .with_body("Started by user admin\nFinished: SUCCESS\n")
            .create_async()
            .await;

        let build = Build::new(Jenkins::new(&server.url(), None).unwrap(), "/job/app/12");
        let output = build.console_output().await.unwrap();
        assert!(output.ends_with("Finished: SUCCESS\n"));
    }

    #[tokio::test]
    async fn test_running_build_has_no_result() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/app/13/api/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"number": 13, "building": true, "result": null, "timestamp": 0}"#)
            .create_async()
            .await;

        let mut build = Build::new(Jenkins::new(&server.url(), None).unwrap(), "/job/app/13");
        assert!(build.is_running().await.unwrap());
        assert_eq!(build.result(), None);
    }

    #[tokio::test]
    async fn test_stop() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/job/app/13/stop")
            .with_status(200)
            .create_async()
            .await;

        let build = Build::new(Jenkins::new(&server.url(), None).unwrap(), "/job/app/13");
        build.stop().await.unwrap();
        mock.assert_async().await;
    }
}
