use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{JenkinsError, Result};
use crate::jenkins::{ensure_found, Jenkins};
use crate::links;
use crate::requester::RequestBody;

use super::{Build, Created, PipelineRun, PipelineRunResponse, QueueItemId, ViewData};

/// Number and URL of a build, as listed on its job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobBuild {
    pub number: i64,
    pub url: String,
}

/// Reference to a job listed by another resource (root, folder, view,
/// upstream/downstream projects). Resolve it to get a full [`Job`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerJob {
    #[serde(rename = "_class")]
    pub class: String,
    pub name: String,
    pub url: String,
    /// Ball color; empty for folders.
    pub color: String,
}

impl InnerJob {
    /// Fetches the job this reference points at.
    pub async fn resolve(&self, jenkins: &Jenkins) -> Result<Job> {
        let base = links::relative_base(&self.url).unwrap_or_else(|| links::job_base(&self.name));
        let mut job = Job::new(jenkins.clone(), base);
        ensure_found(job.poll().await?)?;
        Ok(job)
    }
}

impl InnerJob {
    pub fn status(&self) -> JobStatus {
        JobStatus::from_color(&self.color)
    }
}

/// Job state as encoded in its ball color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Success,
    Unstable,
    Failed,
    Aborted,
    /// Any color with the `_anime` suffix: a build is running.
    InProgress,
    NotBuilt,
    Disabled,
    Other,
}

impl JobStatus {
    pub fn from_color(color: &str) -> Self {
        if color.ends_with("_anime") {
            return Self::InProgress;
        }
        match color {
            "blue" | "green" => Self::Success,
            "yellow" => Self::Unstable,
            "red" => Self::Failed,
            "aborted" => Self::Aborted,
            "notbuilt" | "grey" => Self::NotBuilt,
            "disabled" => Self::Disabled,
            _ => Self::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Unstable => "unstable",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::InProgress => "running",
            Self::NotBuilt => "not built",
            Self::Disabled => "disabled",
            Self::Other => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterValue {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub default_parameter_value: Option<ParameterValue>,
    pub description: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobProperty {
    pub parameter_definitions: Vec<ParameterDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthReport {
    pub description: String,
    pub icon_class_name: String,
    pub icon_url: String,
    pub score: i64,
}

/// Snapshot of `GET /job/<name>/api/json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobResponse {
    #[serde(rename = "_class")]
    pub class: String,
    pub actions: Vec<serde_json::Value>,
    pub buildable: bool,
    pub builds: Vec<JobBuild>,
    pub color: String,
    pub concurrent_build: bool,
    pub description: Option<String>,
    pub display_name: String,
    pub display_name_or_null: Option<String>,
    pub downstream_projects: Vec<InnerJob>,
    pub first_build: Option<JobBuild>,
    pub full_name: String,
    pub full_display_name: String,
    pub health_report: Vec<HealthReport>,
    pub in_queue: bool,
    pub keep_dependencies: bool,
    pub last_build: Option<JobBuild>,
    pub last_completed_build: Option<JobBuild>,
    pub last_failed_build: Option<JobBuild>,
    pub last_stable_build: Option<JobBuild>,
    pub last_successful_build: Option<JobBuild>,
    pub last_unstable_build: Option<JobBuild>,
    pub last_unsuccessful_build: Option<JobBuild>,
    pub name: String,
    pub next_build_number: i64,
    pub property: Vec<JobProperty>,
    pub queue_item: Option<serde_json::Value>,
    pub upstream_projects: Vec<InnerJob>,
    pub url: String,
    pub jobs: Vec<InnerJob>,
    pub primary_view: Option<ViewData>,
    pub views: Vec<ViewData>,
}

/// The well-known build permalinks of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
    First,
    Last,
    LastCompleted,
    LastFailed,
    LastStable,
    LastSuccessful,
    LastUnstable,
    LastUnsuccessful,
}

impl BuildKind {
    fn pick(self, raw: &JobResponse) -> Option<&JobBuild> {
        match self {
            Self::First => raw.first_build.as_ref(),
            Self::Last => raw.last_build.as_ref(),
            Self::LastCompleted => raw.last_completed_build.as_ref(),
            Self::LastFailed => raw.last_failed_build.as_ref(),
            Self::LastStable => raw.last_stable_build.as_ref(),
            Self::LastSuccessful => raw.last_successful_build.as_ref(),
            Self::LastUnstable => raw.last_unstable_build.as_ref(),
            Self::LastUnsuccessful => raw.last_unsuccessful_build.as_ref(),
        }
    }
}

#[derive(Deserialize)]
struct AllBuildsResponse {
    #[serde(default, rename = "allBuilds")]
    all_builds: Vec<JobBuild>,
}

/// A Jenkins job (freestyle, pipeline, multibranch child, ...).
#[derive(Debug, Clone)]
pub struct Job {
    pub(super) raw: JobResponse,
    pub(super) base: String,
    pub(super) jenkins: Jenkins,
}

impl Job {
    /// Creates an unpopulated handle; call [`Job::poll`] to fill it.
    pub fn new(jenkins: Jenkins, base: impl Into<String>) -> Self {
        Self {
            raw: JobResponse::default(),
            base: base.into(),
            jenkins,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &JobResponse {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn description(&self) -> &str {
        self.raw.description.as_deref().unwrap_or_default()
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_color(&self.raw.color)
    }

    pub async fn poll(&mut self) -> Result<u16> {
        self.jenkins.poll_into(&self.base, &[], &mut self.raw).await
    }

    /// Polls and fails unless the job answered 200.
    pub(super) async fn refresh(&mut self) -> Result<()> {
        ensure_found(self.poll().await?)
    }

    /// Name used in messages: the polled name, or the one encoded in `base`.
    pub(super) fn display_name(&self) -> String {
        if self.raw.name.is_empty() {
            links::job_name(&self.base).unwrap_or_else(|| self.base.clone())
        } else {
            self.raw.name.clone()
        }
    }

    // --- Builds ---

    pub async fn get_build(&self, number: i64) -> Result<Build> {
        let mut build = Build::new(self.jenkins.clone(), links::join(&self.base, &number.to_string()));
        ensure_found(build.poll().await?)?;
        Ok(build)
    }

    /// Fetches one of the job's permalinks from the last polled snapshot.
    ///
    /// Returns `None` when the job has no such build.
    pub async fn get_build_of_kind(&self, kind: BuildKind) -> Result<Option<Build>> {
        match kind.pick(&self.raw) {
            Some(reference) => self.get_build(reference.number).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_first_build(&self) -> Result<Option<Build>> {
        self.get_build_of_kind(BuildKind::First).await
    }

    pub async fn get_last_build(&self) -> Result<Option<Build>> {
        self.get_build_of_kind(BuildKind::Last).await
    }

    pub async fn get_last_completed_build(&self) -> Result<Option<Build>> {
        self.get_build_of_kind(BuildKind::LastCompleted).await
    }

    pub async fn get_last_failed_build(&self) -> Result<Option<Build>> {
        self.get_build_of_kind(BuildKind::LastFailed).await
    }

    pub async fn get_last_stable_build(&self) -> Result<Option<Build>> {
        self.get_build_of_kind(BuildKind::LastStable).await
    }

    pub async fn get_last_successful_build(&self) -> Result<Option<Build>> {
        self.get_build_of_kind(BuildKind::LastSuccessful).await
    }

    /// Projects the job's recent builds (`builds`, at most 100) onto `fields`
    /// and decodes the result into a caller-supplied shape.
    ///
    /// # Errors
    ///
    /// Returns [`JenkinsError::MissingField`] if `fields` is empty.
    pub async fn get_builds_fields<T: DeserializeOwned>(&self, fields: &[&str]) -> Result<T> {
        if fields.is_empty() {
            return Err(JenkinsError::MissingField(
                "one or more build fields must be specified".to_string(),
            ));
        }
        let tree = format!("builds[{}]", fields.join(","));
        self.jenkins
            .get_json(&links::api_json(&self.base), &[("tree", tree.as_str())])
            .await
    }

    /// Number and URL of every build the server still keeps.
    pub async fn get_all_build_ids(&self) -> Result<Vec<JobBuild>> {
        let response: AllBuildsResponse = self
            .jenkins
            .get_json(
                &links::api_json(&self.base),
                &[("tree", "allBuilds[number,url]")],
            )
            .await?;
        Ok(response.all_builds)
    }

    // --- Related jobs ---

    pub fn upstream_jobs_metadata(&self) -> &[InnerJob] {
        &self.raw.upstream_projects
    }

    pub fn downstream_jobs_metadata(&self) -> &[InnerJob] {
        &self.raw.downstream_projects
    }

    pub fn inner_jobs_metadata(&self) -> &[InnerJob] {
        &self.raw.jobs
    }

    pub async fn get_upstream_jobs(&self) -> Result<Vec<Job>> {
        resolve_all(&self.jenkins, &self.raw.upstream_projects).await
    }

    pub async fn get_downstream_jobs(&self) -> Result<Vec<Job>> {
        resolve_all(&self.jenkins, &self.raw.downstream_projects).await
    }

    /// Fetches a job nested directly below this one (folders, multibranch).
    pub async fn get_inner_job(&self, name: &str) -> Result<Job> {
        let base = format!(
            "{}/job/{}",
            self.base.trim_end_matches('/'),
            urlencoding::encode(name)
        );
        let mut job = Job::new(self.jenkins.clone(), base);
        ensure_found(job.poll().await?)?;
        Ok(job)
    }

    pub async fn get_inner_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs = Vec::with_capacity(self.raw.jobs.len());
        for inner in &self.raw.jobs {
            jobs.push(self.get_inner_job(&inner.name).await?);
        }
        Ok(jobs)
    }

    // --- Actions ---

    pub async fn enable(&self) -> Result<()> {
        self.jenkins
            .post_action(&links::join(&self.base, "enable"), &[], RequestBody::Empty)
            .await?;
        info!("Enabled {}", self.base);
        Ok(())
    }

    pub async fn disable(&self) -> Result<()> {
        self.jenkins
            .post_action(&links::join(&self.base, "disable"), &[], RequestBody::Empty)
            .await?;
        info!("Disabled {}", self.base);
        Ok(())
    }

    pub async fn delete(&self) -> Result<()> {
        self.jenkins
            .post_action(&links::join(&self.base, "doDelete"), &[], RequestBody::Empty)
            .await?;
        info!("Deleted {}", self.base);
        Ok(())
    }

    /// Renames the job, re-points `base` at the new name and re-polls.
    ///
    /// A failed re-poll is only logged; `raw` then still describes the job
    /// under its old name until the next successful poll.
    pub async fn rename(&mut self, new_name: &str) -> Result<()> {
        self.jenkins
            .post_action(
                &links::join(&self.base, "doRename"),
                &[],
                RequestBody::Form(vec![("newName".to_string(), new_name.to_string())]),
            )
            .await?;

        let renamed = format!(
            "{}/job/{}",
            links::parent_base(&self.base),
            urlencoding::encode(new_name)
        );
        info!("Renamed {} to {renamed}", self.base);
        self.base = renamed;

        match self.poll().await {
            Ok(200) => {}
            Ok(code) => warn!("{} renamed but poll returned {code}", self.base),
            Err(err) => warn!("{} renamed but poll failed: {err}", self.base),
        }
        Ok(())
    }

    /// Creates the job this handle points at from an XML configuration.
    pub async fn create(mut self, config: &str) -> Result<Created<Job>> {
        let name = links::job_name(&self.base)
            .ok_or_else(|| JenkinsError::MissingField(format!("job name in {}", self.base)))?;
        let create_item = links::join(links::parent_base(&self.base), "createItem");

        self.jenkins
            .post_action(
                &create_item,
                &[("name", name.as_str())],
                RequestBody::Xml(config.to_string()),
            )
            .await?;
        info!("Created job {name}");

        let outcome = self.poll().await;
        Ok(Created::settle(self, outcome, &name))
    }

    /// Copies this job to a sibling named `new_name`.
    pub async fn copy(&self, new_name: &str) -> Result<Created<Job>> {
        let parent = links::parent_base(&self.base);
        let from = self.display_name();

        self.jenkins
            .post_action(
                &links::join(parent, "createItem"),
                &[("name", new_name), ("mode", "copy"), ("from", from.as_str())],
                RequestBody::Empty,
            )
            .await?;
        info!("Copied {from} to {new_name}");

        let mut job = Job::new(
            self.jenkins.clone(),
            format!("{parent}/job/{}", urlencoding::encode(new_name)),
        );
        let outcome = job.poll().await;
        Ok(Created::settle(job, outcome, new_name))
    }

    /// Replaces the job's `config.xml`, then re-polls.
    ///
    /// A failed re-poll is logged and does not fail the update.
    pub async fn update_config(&mut self, config: &str) -> Result<()> {
        self.jenkins
            .post_action(
                &links::join(&self.base, "config.xml"),
                &[],
                RequestBody::Xml(config.to_string()),
            )
            .await?;

        match self.poll().await {
            Ok(200) => {}
            Ok(code) => warn!("{} updated but poll returned {code}", self.base),
            Err(err) => warn!("{} updated but poll failed: {err}", self.base),
        }
        Ok(())
    }

    pub async fn get_config(&self) -> Result<String> {
        let response = self
            .jenkins
            .get(&links::join(&self.base, "config.xml"), &[])
            .await?;
        response.ensure_status(&[200])?;
        Ok(response.text())
    }

    // --- State queries ---

    pub(super) fn parameter_definitions(&self) -> Vec<ParameterDefinition> {
        self.raw
            .property
            .iter()
            .flat_map(|property| property.parameter_definitions.iter().cloned())
            .collect()
    }

    pub async fn get_parameters(&mut self) -> Result<Vec<ParameterDefinition>> {
        self.refresh().await?;
        Ok(self.parameter_definitions())
    }

    pub async fn is_queued(&mut self) -> Result<bool> {
        self.refresh().await?;
        Ok(self.raw.in_queue)
    }

    /// Whether the job's last build is still running. A job without builds
    /// is not running.
    pub async fn is_running(&mut self) -> Result<bool> {
        self.refresh().await?;
        match self.get_last_build().await? {
            Some(mut build) => build.is_running().await,
            None => Ok(false),
        }
    }

    pub async fn is_enabled(&mut self) -> Result<bool> {
        self.refresh().await?;
        Ok(self.raw.color != "disabled")
    }

    /// Looks up the build a queue item turned into.
    ///
    /// Returns `None` while the item is still waiting for an executor.
    pub async fn resolve_build_number(&self, queue_item: &QueueItemId) -> Result<Option<i64>> {
        let item = self.jenkins.get_queue_item(queue_item.as_str()).await?;
        Ok(item.build_number())
    }

    // --- Pipelines ---

    /// Lists the job's pipeline runs from `wfapi/runs`.
    ///
    /// Fails with [`JenkinsError::InvalidLink`] if any run, stage or flow node
    /// in the listing lacks a self link; no partial listing is returned.
    pub async fn get_pipeline_runs(&self) -> Result<Vec<PipelineRun>> {
        let runs: Vec<PipelineRunResponse> = self
            .jenkins
            .get_json(&links::join(&self.base, "wfapi/runs"), &[])
            .await?;

        runs.into_iter()
            .map(|raw| PipelineRun::from_response(self.jenkins.clone(), raw))
            .collect()
    }

    pub async fn get_pipeline_run(&self, id: &str) -> Result<PipelineRun> {
        let raw: PipelineRunResponse = self
            .jenkins
            .get_json(&links::join(&self.base, &format!("{id}/wfapi/describe")), &[])
            .await?;
        PipelineRun::from_response(self.jenkins.clone(), raw)
    }
}

async fn resolve_all(jenkins: &Jenkins, references: &[InnerJob]) -> Result<Vec<Job>> {
    let mut jobs = Vec::with_capacity(references.len());
    for reference in references {
        jobs.push(reference.resolve(jenkins).await?);
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    const APP_JOB: &str = r#"{
        "_class": "hudson.model.FreeStyleProject",
        "name": "app",
        "url": "http://ci.internal/job/app/",
        "color": "blue",
        "description": null,
        "inQueue": false,
        "buildable": true,
        "nextBuildNumber": 8,
        "firstBuild": {"number": 1, "url": "http://ci.internal/job/app/1/"},
        "lastBuild": {"number": 7, "url": "http://ci.internal/job/app/7/"},
        "lastFailedBuild": null,
        "healthReport": [{"description": "Build stability", "iconClassName": "icon-health-80plus", "iconUrl": "health-80plus.png", "score": 100}],
        "property": [
            {"_class": "hudson.model.ParametersDefinitionProperty",
             "parameterDefinitions": [{"name": "BRANCH", "type": "StringParameterDefinition", "description": null,
                                       "defaultParameterValue": {"name": "BRANCH", "value": "main"}}]},
            {"_class": "jenkins.model.BuildDiscarderProperty"}
        ],
        "upstreamProjects": [{"name": "lib", "url": "http://ci.internal/job/lib/", "color": "blue"}]
    }"#;

    fn jenkins(server: &ServerGuard) -> Jenkins {
        Jenkins::new(&server.url(), None).unwrap()
    }

    async fn polled_app(server: &mut ServerGuard) -> Job {
        server
            .mock("GET", "/job/app/api/json")
            .with_status(200)
            .with_body(APP_JOB)
            .create_async()
            .await;
        jenkins(server).get_job("app").await.unwrap()
    }

    #[tokio::test]
    async fn test_poll_replaces_snapshot() {
        let mut server = Server::new_async().await;
        let job = polled_app(&mut server).await;

        assert_eq!(job.name(), "app");
        assert_eq!(job.description(), "");
        assert_eq!(job.raw().next_build_number, 8);
        assert_eq!(job.raw().last_build.as_ref().map(|b| b.number), Some(7));
        assert!(job.raw().last_failed_build.is_none());
        assert_eq!(job.raw().health_report[0].score, 100);
    }

    #[tokio::test]
    async fn test_non_200_poll_leaves_snapshot_untouched() {
        let mut server = Server::new_async().await;
        let mut job = polled_app(&mut server).await;
        let before = job.raw().clone();

        server
            .mock("GET", "/job/app/api/json")
            .with_status(404)
            .with_body("<html>Not Found</html>")
            .create_async()
            .await;

        assert_eq!(job.poll().await.unwrap(), 404);
        assert_eq!(job.raw(), &before);
    }

    #[tokio::test]
    async fn test_undecodable_poll_leaves_snapshot_untouched() {
        let mut server = Server::new_async().await;
        let mut job = polled_app(&mut server).await;
        let before = job.raw().clone();

        server
            .mock("GET", "/job/app/api/json")
            .with_status(200)
            .with_body(r#"{"name": "app", "inQueue": "#)
            .create_async()
            .await;

        let err = job.poll().await.unwrap_err();
        assert!(matches!(err, JenkinsError::Json(_)));
        assert_eq!(job.raw(), &before);
    }

    #[tokio::test]
    async fn test_enable_twice_posts_twice() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/job/app/enable")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let job = Job::new(jenkins(&server), "/job/app");
        assert!(job.enable().await.is_ok());
        assert!(job.enable().await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_disable_rejected_carries_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/job/app/disable")
            .with_status(403)
            .create_async()
            .await;

        let job = Job::new(jenkins(&server), "/job/app");
        let err = job.disable().await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
    }

    #[tokio::test]
    async fn test_delete_nested_job() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/job/team/job/app/doDelete")
            .with_status(200)
            .create_async()
            .await;

        jenkins(&server).delete_job("team/app").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rename_repoints_base() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/job/team/job/app/doRename")
            .match_body(Matcher::UrlEncoded("newName".into(), "service".into()))
            .with_status(200)
            .create_async()
            .await;

        let poll = server
            .mock("GET", "/job/team/job/service/api/json")
            .with_status(200)
            .with_body(r#"{"name": "service", "fullName": "team/service", "color": "blue"}"#)
            .create_async()
            .await;

        let job = jenkins(&server).rename_job("team/app", "service").await.unwrap();
        assert_eq!(job.base(), "/job/team/job/service");
        assert_eq!(job.name(), "service");
        mock.assert_async().await;
        poll.assert_async().await;
    }

    #[tokio::test]
    async fn test_rename_survives_failed_poll() {
        let mut server = Server::new_async().await;
        let mut job = polled_app(&mut server).await;
        server
            .mock("POST", "/job/app/doRename")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/job/service/api/json")
            .with_status(500)
            .create_async()
            .await;

        job.rename("service").await.unwrap();
        assert_eq!(job.base(), "/job/service");
        assert_eq!(job.name(), "app");
    }

    #[tokio::test]
    async fn test_create_job_posts_config_to_parent() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/job/team/createItem")
            .match_query(Matcher::UrlEncoded("name".into(), "app".into()))
            .match_header("content-type", "application/xml")
            .match_body("<project/>")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/job/team/job/app/api/json")
            .with_status(200)
            .with_body(r#"{"name": "app", "color": "notbuilt"}"#)
            .create_async()
            .await;

        let created = jenkins(&server)
            .create_job_in_folder("<project/>", "app", &["team"])
            .await
            .unwrap();

        assert!(created.is_populated());
        assert_eq!(created.resource.name(), "app");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_job_conflict_is_status_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/createItem")
            .match_query(Matcher::Any)
            .with_status(400)
            .create_async()
            .await;

        let err = jenkins(&server)
            .create_job("<project/>", "app")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "400");
    }

    #[tokio::test]
    async fn test_copy_job_polls_copy() {
        let mut server = Server::new_async().await;
        let job = polled_app(&mut server).await;
        let copy = server
            .mock("POST", "/createItem")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "app-copy".into()),
                Matcher::UrlEncoded("mode".into(), "copy".into()),
                Matcher::UrlEncoded("from".into(), "app".into()),
            ]))
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/job/app-copy/api/json")
            .with_status(200)
            .with_body(r#"{"name": "app-copy"}"#)
            .create_async()
            .await;

        let created = job.copy("app-copy").await.unwrap();
        assert_eq!(created.into_inner().name(), "app-copy");
        copy.assert_async().await;
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/app/config.xml")
            .with_status(200)
            .with_body("<project><disabled>false</disabled></project>")
            .create_async()
            .await;
        let update = server
            .mock("POST", "/job/app/config.xml")
            .match_body("<project><disabled>true</disabled></project>")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/job/app/api/json")
            .with_status(500)
            .create_async()
            .await;

        let mut job = Job::new(jenkins(&server), "/job/app");
        let config = job.get_config().await.unwrap();
        assert!(config.contains("<disabled>false</disabled>"));

        job.update_config(&config.replace("false", "true")).await.unwrap();
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_parameters_and_state_queries() {
        let mut server = Server::new_async().await;
        let mut job = polled_app(&mut server).await;

        let parameters = job.get_parameters().await.unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].name, "BRANCH");
        assert_eq!(
            parameters[0].default_parameter_value.as_ref().map(|v| v.value.clone()),
            Some(serde_json::json!("main"))
        );
        assert!(!job.is_queued().await.unwrap());
        assert!(job.is_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn test_is_running_reads_last_build() {
        let mut server = Server::new_async().await;
        let mut job = polled_app(&mut server).await;
        server
            .mock("GET", "/job/app/7/api/json")
            .match_query(Matcher::UrlEncoded("depth".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"number": 7, "building": true}"#)
            .create_async()
            .await;

        assert!(job.is_running().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_permalink_is_none() {
        let mut server = Server::new_async().await;
        let job = polled_app(&mut server).await;

        assert!(job.get_last_failed_build().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_builds_fields_require_fields() {
        let server = Server::new_async().await;
        let job = Job::new(jenkins(&server), "/job/app");

        let err = job
            .get_builds_fields::<serde_json::Value>(&[])
            .await
            .unwrap_err();
        assert!(matches!(err, JenkinsError::MissingField(_)));
    }

    #[tokio::test]
    async fn test_builds_fields_projection() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/app/api/json")
            .match_query(Matcher::UrlEncoded("tree".into(), "builds[number,result]".into()))
            .with_status(200)
            .with_body(r#"{"builds": [{"number": 2, "result": "FAILURE"}, {"number": 1, "result": "SUCCESS"}]}"#)
            .create_async()
            .await;

        #[derive(Deserialize)]
        struct Builds {
            builds: Vec<Row>,
        }
        #[derive(Deserialize)]
        struct Row {
            number: i64,
            result: String,
        }

        let job = Job::new(jenkins(&server), "/job/app");
        let builds: Builds = job.get_builds_fields(&["number", "result"]).await.unwrap();
        assert_eq!(builds.builds.len(), 2);
        assert_eq!(builds.builds[0].number, 2);
        assert_eq!(builds.builds[0].result, "FAILURE");
    }

    #[tokio::test]
    async fn test_all_build_ids() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/app/api/json")
            .match_query(Matcher::UrlEncoded("tree".into(), "allBuilds[number,url]".into()))
            .with_status(200)
            .with_body(r#"{"allBuilds": [{"number": 3, "url": "u3"}, {"number": 2, "url": "u2"}]}"#)
            .create_async()
            .await;

        let job = Job::new(jenkins(&server), "/job/app");
        let ids = job.get_all_build_ids().await.unwrap();
        assert_eq!(ids.iter().map(|b| b.number).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn test_status_from_color() {
        assert_eq!(JobStatus::from_color("blue"), JobStatus::Success);
        assert_eq!(JobStatus::from_color("red"), JobStatus::Failed);
        assert_eq!(JobStatus::from_color("red_anime"), JobStatus::InProgress);
        assert_eq!(JobStatus::from_color("notbuilt_anime"), JobStatus::InProgress);
        assert_eq!(JobStatus::from_color("notbuilt"), JobStatus::NotBuilt);
        assert_eq!(JobStatus::from_color("disabled"), JobStatus::Disabled);
        assert_eq!(JobStatus::from_color(""), JobStatus::Other);
    }

    #[tokio::test]
    async fn test_resolve_build_number_from_queue_item() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/queue/item/42/api/json")
            .with_status(200)
            .with_body(r#"{"id": 42, "executable": {"number": 8, "url": "http://ci.internal/job/app/8/"}}"#)
            .create_async()
            .await;

        let job = Job::new(jenkins(&server), "/job/app");
        let number = job
            .resolve_build_number(&QueueItemId::new("42"))
            .await
            .unwrap();
        assert_eq!(number, Some(8));
    }

    #[tokio::test]
    async fn test_upstream_jobs_resolve_by_url_path() {
        let mut server = Server::new_async().await;
        let job = polled_app(&mut server).await;
        server
            .mock("GET", "/job/lib/api/json")
            .with_status(200)
            .with_body(r#"{"name": "lib"}"#)
            .create_async()
            .await;

        let upstream = job.get_upstream_jobs().await.unwrap();
        assert_eq!(upstream.len(), 1);
        assert_eq!(upstream[0].name(), "lib");
        assert!(job.get_downstream_jobs().await.unwrap().is_empty());
    }
}
