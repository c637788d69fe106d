use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use jenkins_client::{BuildFile, Invocation, InvokeOptions, Jenkins, QueueItemId, ViewType};

use crate::config::Config;
use crate::output::{self, QueueWait};

const QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "jenkins-client")]
#[command(author, version, about = "Drive a Jenkins server from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./jenkins.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Jenkins root URL
    #[arg(long, global = true, env = "JENKINS_URL")]
    url: Option<String>,

    #[arg(long, global = true, env = "JENKINS_USER")]
    user: Option<String>,

    /// API token of --user
    #[arg(long, global = true, env = "JENKINS_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Print raw JSON snapshots instead of tables
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List all top-level jobs with their status
    Jobs,

    /// Show one job (`folder/job` for nested jobs)
    Job { path: String },

    /// Request a build
    Build {
        path: String,

        /// Build parameter, repeatable
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// File parameter upload, repeatable
        #[arg(short = 'f', long = "file", value_parser = parse_key_value)]
        files: Vec<(String, String)>,

        /// Remote-trigger token configured on the job
        #[arg(long)]
        token: Option<String>,

        #[arg(long)]
        cause: Option<String>,

        /// Refuse to build while the last build is still running
        #[arg(long, default_value_t = false)]
        skip_if_running: bool,

        /// Wait until the queued request gets a build number
        #[arg(long, default_value_t = false)]
        wait: bool,
    },

    Enable { path: String },

    Disable { path: String },

    Delete { path: String },

    /// Show the build queue
    Queue,

    /// List nodes and their executors
    Nodes,

    /// List views
    Views,

    /// List installed plugins
    Plugins {
        /// Include disabled and inactive plugins
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Create a view (LIST_VIEW, NESTED_VIEW, MY_VIEW, DASHBOARD_VIEW, PIPELINE_VIEW)
    CreateView { name: String, view_type: ViewType },

    /// Show the stages of one pipeline run
    Pipeline { path: String, run_id: String },

    /// Write the effective connection settings to a config file
    InitConfig { path: PathBuf },
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

impl Cli {
    fn effective_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(url) = &self.url {
            config.server.url.clone_from(url);
        }
        if let Some(user) = &self.user {
            config.server.username = Some(user.clone());
        }
        if let Some(token) = &self.api_token {
            config.server.token = Some(token.clone());
        }
        if self.json {
            config.output.json = true;
        }
        Ok(config)
    }

    fn print_json<T: Serialize>(value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    async fn execute_build(
        &self,
        jenkins: &Jenkins,
        path: &str,
        options: InvokeOptions,
        wait: bool,
    ) -> Result<()> {
        let mut job = jenkins
            .get_job(path)
            .await
            .with_context(|| format!("Failed to load job {path}"))?;

        match job.invoke(&options).await? {
            Invocation::AlreadyQueued => {
                println!("{path} already has a build waiting in the queue");
            }
            Invocation::Queued(item) if wait => {
                let number = wait_for_build(jenkins, path, &item).await?;
                println!("{path} #{number}");
            }
            Invocation::Queued(item) => {
                println!("{path} queued as item {item}");
            }
        }
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.effective_config()?;
        if let Commands::InitConfig { path } = &self.command {
            config.save(path)?;
            println!("{} {}", output::bright_green("Wrote"), path.display());
            return Ok(());
        }

        let json = config.output.json;
        let jenkins = config.server.connect()?;
        info!("Using Jenkins at {}", jenkins.server());

        match &self.command {
            Commands::Jobs => {
                let jobs = jenkins.get_all_jobs().await.context("Failed to list jobs")?;
                let raw: Vec<_> = jobs.iter().map(|job| job.raw().clone()).collect();
                if json {
                    return Self::print_json(&raw);
                }
                print!("{}", output::render_jobs(&raw));
            }
            Commands::Job { path } => {
                let job = jenkins
                    .get_job(path)
                    .await
                    .with_context(|| format!("Failed to load job {path}"))?;
                if json {
                    return Self::print_json(job.raw());
                }
                print!("{}", output::render_job(job.raw()));
            }
            Commands::Build {
                path,
                params,
                files,
                token,
                cause,
                skip_if_running,
                wait,
            } => {
                let options = InvokeOptions {
                    parameters: (!params.is_empty())
                        .then(|| params.iter().cloned().collect::<IndexMap<_, _>>()),
                    files: files
                        .iter()
                        .map(|(parameter, file)| {
                            BuildFile::new(parameter.as_str(), file.as_str())
                        })
                        .collect(),
                    skip_if_running: *skip_if_running,
                    cause: cause.clone(),
                    token: token.clone(),
                };
                self.execute_build(&jenkins, path, options, *wait).await?;
            }
            Commands::Enable { path } => {
                jenkins.get_job(path).await?.enable().await?;
                println!("{} {path}", output::bright_green("Enabled"));
            }
            Commands::Disable { path } => {
                jenkins.get_job(path).await?.disable().await?;
                println!("{} {path}", output::bright_green("Disabled"));
            }
            Commands::Delete { path } => {
                jenkins
                    .delete_job(path)
                    .await
                    .with_context(|| format!("Failed to delete {path}"))?;
                println!("{} {path}", output::bright_green("Deleted"));
            }
            Commands::Queue => {
                let queue = jenkins.get_queue().await.context("Failed to read the queue")?;
                if json {
                    return Self::print_json(queue.raw());
                }
                print!("{}", output::render_queue(queue.items()));
            }
            Commands::Nodes => {
                let nodes = jenkins.get_all_nodes().await.context("Failed to list nodes")?;
                let raw: Vec<_> = nodes.iter().map(|node| node.raw().clone()).collect();
                if json {
                    return Self::print_json(&raw);
                }
                print!("{}", output::render_nodes(&raw));
            }
            Commands::Views => {
                let views = jenkins.get_all_views().await.context("Failed to list views")?;
                let raw: Vec<_> = views.iter().map(|view| view.raw().clone()).collect();
                if json {
                    return Self::print_json(&raw);
                }
                print!("{}", output::render_views(&raw));
            }
            Commands::Plugins { all } => {
                let plugins = jenkins.get_plugins(1).await.context("Failed to list plugins")?;
                if json {
                    return Self::print_json(plugins.raw());
                }
                print!("{}", output::render_plugins(plugins.plugins(), *all));
            }
            Commands::CreateView { name, view_type } => {
                let created = jenkins.create_view(name, *view_type).await?;
                if let Some(warning) = &created.poll_warning {
                    eprintln!("{} {warning}", output::dim("View created but not readable yet:"));
                }
                println!("{} {name} ({view_type})", output::bright_green("Created view"));
            }
            Commands::Pipeline { path, run_id } => {
                let run = jenkins
                    .get_job(path)
                    .await?
                    .get_pipeline_run(run_id)
                    .await
                    .with_context(|| format!("Failed to load run {run_id} of {path}"))?;
                if json {
                    return Self::print_json(run.raw());
                }
                print!("{}", output::render_stages(run.raw()));
            }
            // Written above, before connecting.
            Commands::InitConfig { .. } => {}
        }

        Ok(())
    }
}

/// Polls a queue item until an executor turns it into a build.
async fn wait_for_build(jenkins: &Jenkins, path: &str, item: &QueueItemId) -> Result<i64> {
    let spinner = QueueWait::start(path, item.as_str());
    loop {
        let queued = jenkins
            .get_queue_item(item.as_str())
            .await
            .with_context(|| format!("Failed to read queue item {item}"))?;

        if let Some(number) = queued.build_number() {
            spinner.finish_started(number);
            return Ok(number);
        }
        if queued.raw().cancelled == Some(true) {
            spinner.finish_cancelled();
            bail!("Queue item {item} for {path} was cancelled");
        }
        if let Some(why) = queued.why() {
            spinner.waiting(why);
        }
        tokio::time::sleep(QUEUE_POLL_INTERVAL).await;
    }
}
