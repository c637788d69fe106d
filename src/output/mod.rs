mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::QueueWait;
pub use styling::{bright_green, dim, magenta_bold};
pub use summary::{
    render_job, render_jobs, render_nodes, render_plugins, render_queue, render_stages,
    render_views,
};

/// Prints the `jenkins-client` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🛠  jenkins-client"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Jenkins REST client")
    );
}
