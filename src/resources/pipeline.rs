//! Pipeline runs as reported by the workflow API (`wfapi`).
//!
//! Unlike other resources, runs and flow nodes are not addressed from a
//! job-relative path. Each one carries `_links.self.href`, and its base is
//! that link with the `/wfapi/...` tail stripped. Bases are derived for the
//! whole tree (run, stages, nested flow nodes) before a [`PipelineRun`] is
//! handed out, so every sub-request is issued against a derived base.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{JenkinsError, Result};
use crate::jenkins::Jenkins;
use crate::links;
use crate::requester::RequestBody;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Option<Link>,
}

/// Snapshot of `GET <run>/wfapi/describe` (one entry of `wfapi/runs`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineRunResponse {
    #[serde(rename = "_links")]
    pub links: Links,
    pub id: String,
    pub name: String,
    pub status: String,
    pub start_time_millis: i64,
    pub end_time_millis: i64,
    pub duration_millis: i64,
    pub stages: Vec<PipelineNodeResponse>,
}

/// A stage, or a flow node nested inside a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineNodeResponse {
    #[serde(rename = "_links")]
    pub links: Links,
    pub id: String,
    pub name: String,
    pub status: String,
    pub exec_node: String,
    pub start_time_millis: i64,
    pub duration_millis: i64,
    pub stage_flow_nodes: Vec<PipelineNodeResponse>,
    #[serde(deserialize_with = "node_ids")]
    pub parent_nodes: Vec<String>,
}

/// Parent IDs arrive as strings or numbers depending on the plugin version.
fn node_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        })
        .collect())
}

/// A manual approval gate waiting on a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineInputAction {
    pub id: String,
    pub message: String,
    pub proceed_text: String,
    pub proceed_url: String,
    pub abort_url: String,
    pub inputs: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineArtifact {
    pub id: String,
    pub name: String,
    pub path: String,
    pub url: String,
    pub size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineNodeLog {
    pub node_id: String,
    pub node_status: String,
    pub length: i64,
    pub has_more: bool,
    pub text: String,
    pub console_url: String,
}

fn derive_base(own: &Links, kind: &str, id: &str) -> Result<String> {
    let href = own
        .self_link
        .as_ref()
        .map(|link| link.href.as_str())
        .ok_or_else(|| JenkinsError::InvalidLink(format!("{kind} {id} has no self link")))?;

    links::wfapi_base(href)
        .map(str::to_string)
        .ok_or_else(|| JenkinsError::InvalidLink(href.to_string()))
}

fn millis(value: i64) -> Duration {
    Duration::from_millis(u64::try_from(value).unwrap_or_default())
}

/// One execution of a pipeline job.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    raw: PipelineRunResponse,
    base: String,
    stages: Vec<PipelineNode>,
    jenkins: Jenkins,
}

impl PipelineRun {
    /// Derives the run's base and the bases of every stage and nested node.
    ///
    /// # Errors
    ///
    /// Returns [`JenkinsError::InvalidLink`] if any self link is missing or
    /// does not point into the workflow API.
    pub fn from_response(jenkins: Jenkins, raw: PipelineRunResponse) -> Result<Self> {
        let base = derive_base(&raw.links, "run", &raw.id)?;
        let stages = raw
            .stages
            .iter()
            .map(|stage| PipelineNode::from_response(jenkins.clone(), stage.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw,
            base,
            stages,
            jenkins,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &PipelineRunResponse {
        &self.raw
    }

    pub fn id(&self) -> &str {
        &self.raw.id
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn status(&self) -> &str {
        &self.raw.status
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.raw.start_time_millis)
    }

    pub fn duration(&self) -> Duration {
        millis(self.raw.duration_millis)
    }

    pub fn stages(&self) -> &[PipelineNode] {
        &self.stages
    }

    /// Re-reads `<base>/wfapi/describe`. Like every poll, only a 200 whose
    /// links all resolve replaces the current state.
    pub async fn poll(&mut self) -> Result<u16> {
        let response = self
            .jenkins
            .get(&links::join(&self.base, "wfapi/describe"), &[])
            .await?;
        if response.status == 200 {
            *self = Self::from_response(self.jenkins.clone(), response.json()?)?;
        }
        Ok(response.status)
    }

    pub async fn pending_input_actions(&self) -> Result<Vec<PipelineInputAction>> {
        self.jenkins
            .get_json(&links::join(&self.base, "wfapi/pendingInputActions"), &[])
            .await
    }

    async fn first_pending_input(&self) -> Result<String> {
        self.pending_input_actions()
            .await?
            .into_iter()
            .next()
            .map(|action| action.id)
            .ok_or_else(|| JenkinsError::NoPendingInput {
                run: self.base.clone(),
            })
    }

    /// Approves the first pending input of the run.
    pub async fn proceed_input(&self) -> Result<()> {
        let id = self.first_pending_input().await?;
        self.proceed_input_action(&id).await
    }

    /// Rejects the first pending input of the run.
    pub async fn abort_input(&self) -> Result<()> {
        let id = self.first_pending_input().await?;
        self.abort_input_action(&id).await
    }

    pub async fn proceed_input_action(&self, id: &str) -> Result<()> {
        self.jenkins
            .post_action(
                &links::join(&self.base, "wfapi/inputSubmit"),
                &[],
                RequestBody::Form(vec![
                    ("inputId".to_string(), id.to_string()),
                    ("json".to_string(), "{}".to_string()),
                ]),
            )
            .await?;
        info!("Approved input {id} on {}", self.base);
        Ok(())
    }

    pub async fn abort_input_action(&self, id: &str) -> Result<()> {
        self.jenkins
            .post_action(
                &links::join(&self.base, &format!("input/{id}/abort")),
                &[],
                RequestBody::Form(vec![("json".to_string(), "{}".to_string())]),
            )
            .await?;
        info!("Aborted input {id} on {}", self.base);
        Ok(())
    }

    pub async fn artifacts(&self) -> Result<Vec<PipelineArtifact>> {
        self.jenkins
            .get_json(&links::join(&self.base, "wfapi/artifacts"), &[])
            .await
    }

    /// Fetches one flow node of this run by ID.
    pub async fn node(&self, id: &str) -> Result<PipelineNode> {
        let raw = self
            .jenkins
            .get_json(
                &links::join(&self.base, &format!("execution/node/{id}/wfapi/describe")),
                &[],
            )
            .await?;
        PipelineNode::from_response(self.jenkins.clone(), raw)
    }
}

/// A stage of a run, or a flow node inside a stage.
#[derive(Debug, Clone)]
pub struct PipelineNode {
    raw: PipelineNodeResponse,
    base: String,
    stage_flow_nodes: Vec<PipelineNode>,
    jenkins: Jenkins,
}

impl PipelineNode {
    fn from_response(jenkins: Jenkins, raw: PipelineNodeResponse) -> Result<Self> {
        let base = derive_base(&raw.links, "node", &raw.id)?;
        let stage_flow_nodes = raw
            .stage_flow_nodes
            .iter()
            .map(|node| Self::from_response(jenkins.clone(), node.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw,
            base,
            stage_flow_nodes,
            jenkins,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &PipelineNodeResponse {
        &self.raw
    }

    pub fn id(&self) -> &str {
        &self.raw.id
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn status(&self) -> &str {
        &self.raw.status
    }

    pub fn duration(&self) -> Duration {
        millis(self.raw.duration_millis)
    }

    pub fn stage_flow_nodes(&self) -> &[PipelineNode] {
        &self.stage_flow_nodes
    }

    pub async fn poll(&mut self) -> Result<u16> {
        let response = self
            .jenkins
            .get(&links::join(&self.base, "wfapi/describe"), &[])
            .await?;
        if response.status == 200 {
            *self = Self::from_response(self.jenkins.clone(), response.json()?)?;
        }
        Ok(response.status)
    }

    pub async fn log(&self) -> Result<PipelineNodeLog> {
        self.jenkins
            .get_json(&links::join(&self.base, "wfapi/log"), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Job;
    use mockito::{Matcher, Server, ServerGuard};

    fn describe(host: &str) -> String {
        format!(
            r##"{{
            "_links": {{"self": {{"href": "{host}/job/x/3/wfapi/describe"}}}},
            "id": "3",
            "name": "#3",
            "status": "PAUSED_PENDING_INPUT",
            "startTimeMillis": 1700000000000,
            "durationMillis": 4200,
            "stages": [
                {{"_links": {{"self": {{"href": "/job/x/3/execution/node/6/wfapi/describe"}}}},
                  "id": "6", "name": "Build", "status": "SUCCESS", "execNode": "",
                  "stageFlowNodes": [
                      {{"_links": {{"self": {{"href": "/job/x/3/execution/node/7/wfapi/describe"}}}},
                        "id": "7", "name": "Shell Script", "status": "SUCCESS", "parentNodes": ["6"]}}
                  ]}},
                {{"_links": {{"self": {{"href": "/job/x/3/execution/node/12/wfapi/describe"}}}},
                  "id": "12", "name": "Approve", "status": "PAUSED_PENDING_INPUT", "parentNodes": [6]}}
            ]
        }}"##
        )
    }

    fn jenkins(server: &ServerGuard) -> Jenkins {
        Jenkins::new(&server.url(), None).unwrap()
    }

    async fn run(server: &mut ServerGuard) -> PipelineRun {
        server
            .mock("GET", "/job/x/3/wfapi/describe")
            .with_status(200)
            .with_body(describe(&server.url()))
            .create_async()
            .await;
        Job::new(jenkins(server), "/job/x")
            .get_pipeline_run("3")
            .await
            .unwrap()
    }

    #[test]
    fn test_bases_derived_from_self_links() {
        let raw: PipelineRunResponse = serde_json::from_str(&describe("http://host")).unwrap();
        let jenkins = Jenkins::new("http://host", None).unwrap();
        let run = PipelineRun::from_response(jenkins, raw).unwrap();

        assert_eq!(run.base(), "http://host/job/x/3");
        assert_eq!(run.stages()[0].base(), "/job/x/3/execution/node/6");
        assert_eq!(
            run.stages()[0].stage_flow_nodes()[0].base(),
            "/job/x/3/execution/node/7"
        );
        assert_eq!(run.stages()[1].raw().parent_nodes, vec!["6".to_string()]);
        assert_eq!(run.duration(), Duration::from_millis(4200));
    }

    #[test]
    fn test_link_outside_wfapi_is_rejected() {
        let raw = PipelineRunResponse {
            links: Links {
                self_link: Some(Link {
                    href: "http://host/job/x/3/describe".to_string(),
                }),
            },
            ..PipelineRunResponse::default()
        };
        let jenkins = Jenkins::new("http://host", None).unwrap();
        let err = PipelineRun::from_response(jenkins, raw).unwrap_err();
        assert!(matches!(err, JenkinsError::InvalidLink(ref href) if href.ends_with("/describe")));
    }

    #[test]
    fn test_missing_stage_link_is_rejected() {
        let mut raw: PipelineRunResponse = serde_json::from_str(&describe("http://host")).unwrap();
        raw.stages[1].links = Links::default();
        let jenkins = Jenkins::new("http://host", None).unwrap();
        assert!(matches!(
            PipelineRun::from_response(jenkins, raw),
            Err(JenkinsError::InvalidLink(_))
        ));
    }

    #[tokio::test]
    async fn test_runs_listing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/x/wfapi/runs")
            .with_status(200)
            .with_body(format!("[{}]", describe(&server.url())))
            .create_async()
            .await;

        let runs = Job::new(jenkins(&server), "/job/x")
            .get_pipeline_runs()
            .await
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].base(), format!("{}/job/x/3", server.url()));
        assert_eq!(runs[0].stages().len(), 2);
    }

    #[tokio::test]
    async fn test_proceed_first_pending_input() {
        let mut server = Server::new_async().await;
        let run = run(&mut server).await;
        server
            .mock("GET", "/job/x/3/wfapi/pendingInputActions")
            .with_status(200)
            .with_body(r#"[{"id": "Release", "message": "Ship it?", "proceedText": "Proceed",
                            "proceedUrl": "/job/x/3/input/Release/proceedEmpty",
                            "abortUrl": "/job/x/3/input/Release/abort"},
                           {"id": "Other", "message": "Second gate"}]"#)
            .create_async()
            .await;
        let submit = server
            .mock("POST", "/job/x/3/wfapi/inputSubmit")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("inputId".into(), "Release".into()),
                Matcher::UrlEncoded("json".into(), "{}".into()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        run.proceed_input().await.unwrap();
        submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_abort_explicit_input() {
        let mut server = Server::new_async().await;
        let run = run(&mut server).await;
        let abort = server
            .mock("POST", "/job/x/3/input/Other/abort")
            .match_body(Matcher::UrlEncoded("json".into(), "{}".into()))
            .with_status(200)
            .create_async()
            .await;

        run.abort_input_action("Other").await.unwrap();
        abort.assert_async().await;
    }

    #[tokio::test]
    async fn test_nothing_pending() {
        let mut server = Server::new_async().await;
        let run = run(&mut server).await;
        server
            .mock("GET", "/job/x/3/wfapi/pendingInputActions")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let submit = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        assert!(matches!(
            run.proceed_input().await,
            Err(JenkinsError::NoPendingInput { .. })
        ));
        assert!(matches!(
            run.abort_input().await,
            Err(JenkinsError::NoPendingInput { .. })
        ));
        submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_artifacts_and_node_log() {
        let mut server = Server::new_async().await;
        let run = run(&mut server).await;
        server
            .mock("GET", "/job/x/3/wfapi/artifacts")
            .with_status(200)
            .with_body(r#"[{"id": "n1", "name": "report.html", "path": "out/report.html",
                            "url": "/job/x/3/artifact/out/report.html", "size": 2048}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/job/x/3/execution/node/7/wfapi/log")
            .with_status(200)
            .with_body(r#"{"nodeId": "7", "nodeStatus": "SUCCESS", "length": 12, "hasMore": false,
                           "text": "+ make test\n", "consoleUrl": "/job/x/3/execution/node/7/log"}"#)
            .create_async()
            .await;

        let artifacts = run.artifacts().await.unwrap();
        assert_eq!(artifacts[0].size, 2048);

        let shell = &run.stages()[0].stage_flow_nodes()[0];
        let log = shell.log().await.unwrap();
        assert_eq!(log.text, "+ make test\n");
        assert!(!log.has_more);
    }

    #[tokio::test]
    async fn test_node_by_id() {
        let mut server = Server::new_async().await;
        let run = run(&mut server).await;
        server
            .mock("GET", "/job/x/3/execution/node/12/wfapi/describe")
            .with_status(200)
            .with_body(r#"{"_links": {"self": {"href": "/job/x/3/execution/node/12/wfapi/describe"}},
                           "id": "12", "name": "Approve", "status": "PAUSED_PENDING_INPUT"}"#)
            .create_async()
            .await;

        let node = run.node("12").await.unwrap();
        assert_eq!(node.base(), "/job/x/3/execution/node/12");
        assert_eq!(node.name(), "Approve");
    }

    #[tokio::test]
    async fn test_run_listing_rejects_stage_without_link() {
        let mut server = Server::new_async().await;
        let runs = format!(
            r##"[{},
                 {{"_links": {{"self": {{"href": "/job/x/2/wfapi/describe"}}}},
                   "id": "2", "name": "#2", "status": "SUCCESS",
                   "stages": [{{"id": "5", "name": "Build", "status": "SUCCESS"}}]}}]"##,
            describe(&server.url())
        );
        let mock = server
            .mock("GET", "/job/x/wfapi/runs")
            .with_status(200)
            .with_body(runs)
            .create_async()
            .await;

        let err = Job::new(jenkins(&server), "/job/x")
            .get_pipeline_runs()
            .await
            .unwrap_err();
        assert!(matches!(err, JenkinsError::InvalidLink(ref msg) if msg.contains("5")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_run() {
        let mut server = Server::new_async().await;
        let mut run = run(&mut server).await;

        server
            .mock("GET", "/job/x/3/wfapi/describe")
            .with_status(503)
            .create_async()
            .await;

        assert_eq!(run.poll().await.unwrap(), 503);
        assert_eq!(run.status(), "PAUSED_PENDING_INPUT");
        assert_eq!(run.stages().len(), 2);
    }
}
