//! Client-side object model for the Jenkins REST API.
//!
//! A [`Jenkins`] handle addresses one server. Jobs, builds, folders, views,
//! nodes, labels, the queue and pipeline runs are mirrored locally as
//! resources that are refreshed with `poll` and changed through actions.
//!
//! ```no_run
//! # async fn run() -> jenkins_client::Result<()> {
//! use jenkins_client::{Credentials, Invocation, Jenkins};
//!
//! let jenkins = Jenkins::new("http://localhost:8080", Some(Credentials::new("admin", "token")))?
//!     .init()
//!     .await?;
//! let mut job = jenkins.get_job("team/app").await?;
//! if let Invocation::Queued(item) = job.invoke_simple(&Default::default()).await? {
//!     println!("queued as {item}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod jenkins;
pub mod links;
pub mod requester;
pub mod resources;

pub use auth::{Credentials, Token};
pub use error::{JenkinsError, Result};
pub use jenkins::{ExecutorResponse, Jenkins};
pub use requester::{ApiRequest, ApiResponse, FilePart, HttpRequester, Method, RequestBody, Requester};
pub use resources::*;
