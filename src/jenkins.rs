//! The shared root handle.
//!
//! [`Jenkins`] owns the [`Requester`] and the server root URL. It is cheap to
//! clone and never changes after construction; every resource keeps its own
//! clone to reach the server. The poll and action protocols all resources
//! share are implemented here once.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::Credentials;
use crate::error::{JenkinsError, Result};
use crate::links;
use crate::requester::{ApiRequest, ApiResponse, HttpRequester, Method, RequestBody, Requester};
use crate::resources::{
    Build, Created, Folder, InnerJob, Job, Label, Node, NodeMode, NodeResponse, Plugins, Queue,
    QueueItem, View, ViewData, ViewType,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Snapshot of the server root (`GET /api/json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutorResponse {
    pub mode: String,
    pub node_name: String,
    pub node_description: Option<String>,
    pub num_executors: i64,
    pub description: Option<String>,
    pub jobs: Vec<InnerJob>,
    pub primary_view: Option<ViewData>,
    pub views: Vec<ViewData>,
    pub quieting_down: bool,
    pub use_crumbs: bool,
    pub use_security: bool,
}

#[derive(Deserialize)]
struct ComputerListResponse {
    #[serde(default)]
    computer: Vec<NodeResponse>,
}

/// Read-only handle to one Jenkins server.
#[derive(Clone)]
pub struct Jenkins {
    requester: Arc<dyn Requester>,
    server: Url,
}

impl std::fmt::Debug for Jenkins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jenkins")
            .field("server", &self.server.as_str())
            .finish_non_exhaustive()
    }
}

impl Jenkins {
    /// Creates a handle backed by [`HttpRequester`] with a 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`JenkinsError::Config`] if the server URL cannot be parsed or
    /// the HTTP client cannot be built.
    pub fn new(server: &str, credentials: Option<Credentials>) -> Result<Self> {
        let requester = HttpRequester::new(credentials, DEFAULT_TIMEOUT, false)?;
        Self::with_requester(server, Arc::new(requester))
    }

    /// Creates a handle around an injected [`Requester`].
    pub fn with_requester(server: &str, requester: Arc<dyn Requester>) -> Result<Self> {
        let server = Url::parse(server)
            .map_err(|e| JenkinsError::Config(format!("Invalid server URL {server}: {e}")))?;

        Ok(Self { requester, server })
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn requester(&self) -> &dyn Requester {
        self.requester.as_ref()
    }

    // --- Transport helpers ---

    pub(crate) async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse> {
        let request = ApiRequest::new(Method::GET, links::resolve(&self.server, path)).query(query);
        self.requester.execute(request).await
    }

    pub(crate) async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> Result<ApiResponse> {
        let request = ApiRequest::new(Method::POST, links::resolve(&self.server, path))
            .query(query)
            .body(body);
        self.requester.execute(request).await
    }

    /// GETs `path` and decodes the body, failing on any status but 200.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self.get(path, query).await?;
        response.ensure_status(&[200])?;
        response.json()
    }

    /// Poll protocol: GET `<base>/api/json` and replace `raw` on a 200.
    ///
    /// `raw` is only assigned after the whole body decoded, so a failed or
    /// non-200 poll leaves the previous snapshot in place. The status is
    /// returned rather than raised so callers can tell "not found" apart.
    pub(crate) async fn poll_into<T: DeserializeOwned>(
        &self,
        base: &str,
        query: &[(&str, &str)],
        raw: &mut T,
    ) -> Result<u16> {
        let response = self.get(&links::api_json(base), query).await?;
        if response.status == 200 {
            *raw = response.json()?;
        }
        Ok(response.status)
    }

    /// Action protocol: POST and require a 200.
    pub(crate) async fn post_action(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> Result<ApiResponse> {
        let response = self.post(path, query, body).await?;
        response.ensure_status(&[200])?;
        Ok(response)
    }

    // --- Root ---

    /// Polls the server root, failing if it is not reachable with a 200.
    pub async fn init(self) -> Result<Self> {
        let info = self.info().await?;
        info!(
            "Connected to {} ({} jobs visible)",
            self.server,
            info.jobs.len()
        );
        Ok(self)
    }

    pub async fn info(&self) -> Result<ExecutorResponse> {
        self.get_json(&links::api_json(""), &[]).await
    }

    // --- Jobs ---

    /// Fetches a job by its slash-separated path (`"team/app"` for nested jobs).
    pub async fn get_job(&self, path: &str) -> Result<Job> {
        let mut job = Job::new(self.clone(), links::job_base(path));
        ensure_found(job.poll().await?)?;
        Ok(job)
    }

    /// Fetches every top-level job listed on the server root.
    pub async fn get_all_jobs(&self) -> Result<Vec<Job>> {
        let info = self.info().await?;
        let mut jobs = Vec::with_capacity(info.jobs.len());
        for inner in &info.jobs {
            jobs.push(inner.resolve(self).await?);
        }
        Ok(jobs)
    }

    pub async fn create_job(&self, config: &str, name: &str) -> Result<Created<Job>> {
        Job::new(self.clone(), links::job_base(name))
            .create(config)
            .await
    }

    /// Creates a job inside nested folders, outermost folder first.
    pub async fn create_job_in_folder(
        &self,
        config: &str,
        name: &str,
        folders: &[&str],
    ) -> Result<Created<Job>> {
        let mut path = folders.join("/");
        path.push('/');
        path.push_str(name);
        Job::new(self.clone(), links::job_base(&path))
            .create(config)
            .await
    }

    pub async fn delete_job(&self, path: &str) -> Result<()> {
        Job::new(self.clone(), links::job_base(path)).delete().await
    }

    pub async fn rename_job(&self, path: &str, new_name: &str) -> Result<Job> {
        let mut job = Job::new(self.clone(), links::job_base(path));
        job.rename(new_name).await?;
        Ok(job)
    }

    pub async fn copy_job(&self, path: &str, new_name: &str) -> Result<Created<Job>> {
        self.get_job(path).await?.copy(new_name).await
    }

    pub async fn get_build(&self, job_path: &str, number: i64) -> Result<Build> {
        Job::new(self.clone(), links::job_base(job_path))
            .get_build(number)
            .await
    }

    // --- Folders ---

    pub async fn get_folder(&self, path: &str) -> Result<Folder> {
        let mut folder = Folder::new(self.clone(), links::job_base(path));
        ensure_found(folder.poll().await?)?;
        Ok(folder)
    }

    /// Creates a folder, optionally nested inside `parents` (outermost first).
    pub async fn create_folder(&self, name: &str, parents: &[&str]) -> Result<Created<Folder>> {
        let mut path = parents.join("/");
        path.push('/');
        path.push_str(name);
        Folder::new(self.clone(), links::job_base(&path))
            .create()
            .await
    }

    // --- Views ---

    pub async fn get_view(&self, name: &str) -> Result<View> {
        let mut view = View::new(self.clone(), view_base(name));
        ensure_found(view.poll().await?)?;
        Ok(view)
    }

    pub async fn get_all_views(&self) -> Result<Vec<View>> {
        let info = self.info().await?;
        let mut views = Vec::with_capacity(info.views.len());
        for data in &info.views {
            views.push(self.get_view(&data.name).await?);
        }
        Ok(views)
    }

    pub async fn create_view(&self, name: &str, view_type: ViewType) -> Result<Created<View>> {
        let mode = view_type.class_name();
        let json = serde_json::json!({ "name": name, "mode": mode }).to_string();
        self.post_action(
            "/createView",
            &[
                ("name", name),
                ("mode", mode),
                ("Submit", "OK"),
                ("json", json.as_str()),
            ],
            RequestBody::Empty,
        )
        .await?;
        info!("Created view {name} ({mode})");

        let mut view = View::new(self.clone(), view_base(name));
        let outcome = view.poll().await;
        Ok(Created::settle(view, outcome, name))
    }

    // --- Nodes and labels ---

    pub async fn get_node(&self, name: &str) -> Result<Node> {
        let mut node = Node::new(self.clone(), node_base(name));
        ensure_found(node.poll().await?)?;
        Ok(node)
    }

    /// Lists every node from the `/computer` summary in a single request.
    pub async fn get_all_nodes(&self) -> Result<Vec<Node>> {
        let list: ComputerListResponse = self.get_json(&links::api_json("/computer"), &[]).await?;
        Ok(list
            .computer
            .into_iter()
            .map(|raw| {
                let base = node_base(&raw.display_name);
                Node::from_response(self.clone(), base, raw)
            })
            .collect())
    }

    /// Registers a permanent agent launched over JNLP.
    pub async fn create_node(
        &self,
        name: &str,
        num_executors: u32,
        description: &str,
        remote_fs: &str,
        labels: &str,
        mode: NodeMode,
    ) -> Result<Created<Node>> {
        const NODE_TYPE: &str = "hudson.slaves.DumbSlave$DescriptorImpl";
        let json = serde_json::json!({
            "name": name,
            "nodeDescription": description,
            "numExecutors": num_executors,
            "remoteFS": remote_fs,
            "labelString": labels,
            "mode": mode.as_str(),
            "type": NODE_TYPE,
            "retentionStrategy": { "stapler-class": "hudson.slaves.RetentionStrategy$Always" },
            "nodeProperties": { "stapler-class-bag": "true" },
            "launcher": { "stapler-class": "hudson.slaves.JNLPLauncher" },
        })
        .to_string();

        self.post_action(
            "/computer/doCreateItem",
            &[("name", name), ("type", NODE_TYPE), ("json", json.as_str())],
            RequestBody::Empty,
        )
        .await?;
        info!("Created node {name}");

        let mut node = Node::new(self.clone(), node_base(name));
        let outcome = node.poll().await;
        Ok(Created::settle(node, outcome, name))
    }

    pub async fn delete_node(&self, name: &str) -> Result<()> {
        Node::new(self.clone(), node_base(name)).delete().await
    }

    pub async fn get_label(&self, name: &str) -> Result<Label> {
        let base = format!("/label/{}", urlencoding::encode(name));
        let mut label = Label::new(self.clone(), base);
        ensure_found(label.poll().await?)?;
        Ok(label)
    }

    // --- Plugins ---

    /// Lists installed plugins; `depth` 2 or more also fills in dependencies.
    pub async fn get_plugins(&self, depth: u32) -> Result<Plugins> {
        let mut plugins = Plugins::new(self.clone(), depth);
        ensure_found(plugins.poll().await?)?;
        Ok(plugins)
    }

    // --- Queue ---

    pub async fn get_queue(&self) -> Result<Queue> {
        let mut queue = Queue::new(self.clone());
        ensure_found(queue.poll().await?)?;
        Ok(queue)
    }

    /// Fetches one queue item; this is how a queued invocation is resolved
    /// to the build it eventually became.
    pub async fn get_queue_item(&self, id: &str) -> Result<QueueItem> {
        let mut item = QueueItem::new(self.clone(), id);
        ensure_found(item.poll().await?)?;
        Ok(item)
    }
}

/// Turns a poll status into an error unless the resource was found.
pub(crate) fn ensure_found(status: u16) -> Result<()> {
    if status == 200 {
        Ok(())
    } else {
        Err(JenkinsError::Status { code: status })
    }
}

pub(crate) fn view_base(name: &str) -> String {
    format!("/view/{}", urlencoding::encode(name))
}

/// Path of a node. The controller's own node is listed under a display name
/// but only served at its reserved URL name.
pub(crate) fn node_base(name: &str) -> String {
    match name {
        "Built-In Node" | "built-in" | "(built-in)" => "/computer/(built-in)".to_string(),
        "master" | "(master)" => "/computer/(master)".to_string(),
        _ => format!("/computer/{}", urlencoding::encode(name)),
    }
}
