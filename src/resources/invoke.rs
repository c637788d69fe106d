use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use log::info;
use serde_json::json;

use crate::error::{JenkinsError, Result};
use crate::links;
use crate::requester::{ApiResponse, FilePart, RequestBody};

use super::Job;

/// ID of the queue item the server created for a build request.
///
/// This is not a build number. Resolve it with
/// [`Job::resolve_build_number`] once an executor picked it up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueItemId(String);

impl QueueItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form of the ID, when the server issued a numeric one.
    pub fn as_number(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a build request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// The server accepted the request and queued it.
    Queued(QueueItemId),
    /// The job already had a build waiting in the queue; nothing was sent.
    AlreadyQueued,
}

impl Invocation {
    pub fn queue_item(&self) -> Option<&QueueItemId> {
        match self {
            Self::Queued(id) => Some(id),
            Self::AlreadyQueued => None,
        }
    }
}

/// A file uploaded into a file parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFile {
    /// Name of the job's file parameter.
    pub parameter: String,
    pub path: PathBuf,
}

impl BuildFile {
    pub fn new(parameter: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            parameter: parameter.into(),
            path: path.into(),
        }
    }
}

/// Inputs of [`Job::invoke`].
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// `Some` selects `/buildWithParameters`, even when empty.
    pub parameters: Option<IndexMap<String, String>>,
    /// Any file switches the request to a multipart `/build`.
    pub files: Vec<BuildFile>,
    pub skip_if_running: bool,
    pub cause: Option<String>,
    /// Remote-trigger token configured on the job.
    pub token: Option<String>,
}

impl Job {
    /// Requests a build with plain string parameters.
    ///
    /// `/buildWithParameters` is used when the job declares parameters,
    /// `/build` otherwise. Nothing is submitted if a build is already queued.
    pub async fn invoke_simple(
        &mut self,
        parameters: &IndexMap<String, String>,
    ) -> Result<Invocation> {
        self.refresh().await?;
        if self.raw.in_queue {
            info!("{} already has a queued build", self.display_name());
            return Ok(Invocation::AlreadyQueued);
        }

        let endpoint = if self.parameter_definitions().is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let response = self
            .jenkins
            .post(
                &links::join(&self.base, endpoint),
                &[],
                RequestBody::Form(form_pairs(parameters)),
            )
            .await?;

        self.accept_invocation(&response)
    }

    /// Requests a build with parameters, files, a trigger token and a cause.
    ///
    /// # Errors
    ///
    /// Returns [`JenkinsError::AlreadyRunning`] when `skip_if_running` is set
    /// and the last build has not finished, [`JenkinsError::Status`] when the
    /// server answers anything but 200/201 and
    /// [`JenkinsError::MissingLocation`] when it does not say where the
    /// request was queued.
    pub async fn invoke(&mut self, options: &InvokeOptions) -> Result<Invocation> {
        self.refresh().await?;
        if self.raw.in_queue {
            info!("{} already has a queued build", self.display_name());
            return Ok(Invocation::AlreadyQueued);
        }

        if options.skip_if_running {
            if let Some(mut last) = self.get_last_build().await? {
                if last.is_running().await? {
                    return Err(JenkinsError::AlreadyRunning {
                        job: self.display_name(),
                    });
                }
            }
        }

        let endpoint = if !options.files.is_empty() || options.parameters.is_none() {
            "build"
        } else {
            "buildWithParameters"
        };

        let mut query = Vec::new();
        if let Some(token) = &options.token {
            query.push(("token", token.as_str()));
        }
        if let Some(cause) = &options.cause {
            query.push(("cause", cause.as_str()));
        }

        let empty = IndexMap::new();
        let parameters = options.parameters.as_ref().unwrap_or(&empty);
        let body = if options.files.is_empty() {
            RequestBody::Form(form_pairs(parameters))
        } else {
            multipart_body(parameters, &options.files).await?
        };

        let response = self
            .jenkins
            .post(&links::join(&self.base, endpoint), &query, body)
            .await?;

        self.accept_invocation(&response)
    }

    fn accept_invocation(&self, response: &ApiResponse) -> Result<Invocation> {
        response.ensure_status(&[200, 201])?;

        let location = response
            .header("location")
            .ok_or(JenkinsError::MissingLocation)?;
        let id = links::queue_item_id(location)
            .ok_or_else(|| JenkinsError::InvalidLocation(location.to_string()))?;

        info!("Queued {} as queue item {id}", self.display_name());
        Ok(Invocation::Queued(QueueItemId::new(id)))
    }
}

fn form_pairs(parameters: &IndexMap<String, String>) -> Vec<(String, String)> {
    parameters
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// `json` describes every parameter; file parameters point at their part.
async fn multipart_body(
    parameters: &IndexMap<String, String>,
    files: &[BuildFile],
) -> Result<RequestBody> {
    let mut described: Vec<serde_json::Value> = parameters
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    let mut parts = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let field = format!("file{index}");
        let contents = tokio::fs::read(&file.path).await?;
        let file_name = file
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.clone());

        described.push(json!({ "name": file.parameter, "file": field }));
        parts.push(FilePart {
            field,
            file_name,
            contents,
        });
    }

    Ok(RequestBody::Multipart {
        fields: vec![(
            "json".to_string(),
            json!({ "parameter": described }).to_string(),
        )],
        files: parts,
    })
}
