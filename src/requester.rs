//! The HTTP capability every resource talks through.
//!
//! Resources never touch `reqwest` directly: they describe a request as an
//! [`ApiRequest`] and hand it to a [`Requester`]. [`HttpRequester`] is the
//! production implementation; anything else implementing the trait (a
//! recording fake, a proxy) can be injected through
//! [`Jenkins::with_requester`](crate::Jenkins::with_requester).

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::auth::Credentials;
use crate::error::{JenkinsError, Result};

pub use reqwest::Method;

const USER_AGENT: &str = concat!("jenkins-client/", env!("CARGO_PKG_VERSION"));

/// Request payload shapes used by the Jenkins REST surface.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// Raw job/folder configuration document.
    Xml(String),
    /// Text fields plus uploaded files.
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

/// A file attached to a multipart submission.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field the file is sent under (`file0`, `file1`, ...).
    pub field: String,
    pub file_name: String,
    pub contents: Vec<u8>,
}

#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// Fully resolved URL.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn query(mut self, query: &[(&str, &str)]) -> Self {
        self.query
            .extend(query.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

/// Status, headers and the fully read body of a response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Fails with [`JenkinsError::Status`] unless the status is in `accepted`.
    pub fn ensure_status(&self, accepted: &[u16]) -> Result<()> {
        if accepted.contains(&self.status) {
            Ok(())
        } else {
            Err(JenkinsError::Status { code: self.status })
        }
    }
}

/// Performs one HTTP round trip. Implementations must not retry.
#[async_trait]
pub trait Requester: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `reqwest`-backed [`Requester`] with basic auth.
pub struct HttpRequester {
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpRequester {
    pub fn new(
        credentials: Option<Credentials>,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| JenkinsError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(credentials) = &self.credentials {
            request.basic_auth(&credentials.username, Some(credentials.token.as_str()))
        } else {
            request
        }
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .auth_request(self.client.request(request.method, &request.url))
            .query(&request.query);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Xml(document) => builder
                .header(CONTENT_TYPE, "application/xml")
                .body(document),
            RequestBody::Multipart { fields, files } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                for file in files {
                    form = form.part(file.field, Part::bytes(file.contents).file_name(file.file_name));
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!("{} -> {status}", request.url);

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
