use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_red, bright_yellow};

/// Spinner shown while a queued build waits for an executor.
pub struct QueueWait {
    pb: ProgressBar,
}

impl QueueWait {
    pub fn start(job: &str, item: &str) -> Self {
        let pb = create_spinner(
            bright_yellow(format!("Waiting for {job} (queue item {item})")).to_string(),
        );
        Self { pb }
    }

    /// Updates the spinner with the server's reason for the wait.
    pub fn waiting(&self, why: &str) {
        self.pb.set_message(bright_yellow(why).to_string());
    }

    pub fn finish_started(self, number: i64) {
        self.pb
            .finish_with_message(bright_green(format!("Build #{number} started ✓")).to_string());
    }

    pub fn finish_cancelled(self) {
        self.pb
            .finish_with_message(bright_red("Queue item was cancelled").to_string());
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
