use std::time::Duration;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};
use jenkins_client::JobStatus;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn status_cell(status: JobStatus) -> Cell {
    let cell = Cell::new(status.label());
    match status {
        JobStatus::Success => cell.fg(TableColor::Green),
        JobStatus::Unstable | JobStatus::InProgress => cell.fg(TableColor::Yellow),
        JobStatus::Failed => cell.fg(TableColor::Red),
        JobStatus::Aborted | JobStatus::NotBuilt | JobStatus::Disabled | JobStatus::Other => {
            cell.fg(TableColor::DarkGrey)
        }
    }
}

/// Colors a build or stage result (`SUCCESS`, `FAILED`, `IN_PROGRESS`, ...).
pub fn result_cell(result: &str) -> Cell {
    let cell = Cell::new(result);
    match result {
        "SUCCESS" => cell.fg(TableColor::Green),
        "FAILURE" | "FAILED" => cell.fg(TableColor::Red),
        "UNSTABLE" | "IN_PROGRESS" | "PAUSED_PENDING_INPUT" => cell.fg(TableColor::Yellow),
        _ => cell.fg(TableColor::DarkGrey),
    }
}

pub fn duration_cell(duration: Duration) -> Cell {
    let seconds = duration.as_secs();
    let text = if seconds >= 60 {
        format!("{}m {:02}s", seconds / 60, seconds % 60)
    } else {
        format!("{}.{}s", seconds, duration.subsec_millis() / 100)
    };
    Cell::new(text)
}

pub fn flag_cell(set: bool, label: &str) -> Cell {
    if set {
        Cell::new(label).fg(TableColor::Yellow)
    } else {
        Cell::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_cell_formats() {
        assert_eq!(duration_cell(Duration::from_millis(4_200)).content(), "4.2s");
        assert_eq!(duration_cell(Duration::from_secs(125)).content(), "2m 05s");
    }

    #[test]
    fn test_status_cell_uses_label() {
        assert_eq!(status_cell(JobStatus::InProgress).content(), "running");
        assert_eq!(status_cell(JobStatus::Failed).content(), "failed");
    }
}
