use std::fmt::Write;
use std::time::Duration;

use chrono::DateTime;
use comfy_table::{Cell, Color as TableColor, Table};
use jenkins_client::{
    JobResponse, JobStatus, NodeResponse, PipelineNodeResponse, PipelineRunResponse, Plugin,
    TaskInfo, ViewResponse,
};

use super::styling::{bright, cyan, dim, status_style};
use super::tables::{
    create_table, cyan_header, duration_cell, flag_cell, result_cell, status_cell,
};

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn millis(value: i64) -> Duration {
    Duration::from_millis(u64::try_from(value).unwrap_or_default())
}

/// One row per job: name, status and last build number.
pub fn render_jobs(jobs: &[JobResponse]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🧱", "Jobs");

    if jobs.is_empty() {
        let _ = writeln!(output, "  {}", dim("No jobs found"));
        return output;
    }

    let mut table = create_table();
    table.set_header(cyan_header(&["Job", "Status", "Last build", "Queued"]));
    for job in jobs {
        let last_build = job
            .last_build
            .as_ref()
            .map_or_else(|| "-".to_string(), |build| format!("#{}", build.number));
        table.add_row(vec![
            Cell::new(display_name(job)),
            status_cell(JobStatus::from_color(&job.color)),
            Cell::new(last_build),
            flag_cell(job.in_queue, "queued"),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

fn display_name(job: &JobResponse) -> &str {
    if job.full_name.is_empty() {
        &job.name
    } else {
        &job.full_name
    }
}

/// Overview of a single job with its health and parameters.
pub fn render_job(job: &JobResponse) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🧱", display_name(job));

    let status = JobStatus::from_color(&job.color);
    let _ = writeln!(output, "  {} {}", dim("Status:"), status_style(status));
    if let Some(description) = job.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(output, "  {} {}", dim("Description:"), description);
    }
    let _ = writeln!(output, "  {} {}", dim("URL:"), cyan(&job.url));
    for (label, build) in [
        ("Last build:", &job.last_build),
        ("Last success:", &job.last_successful_build),
        ("Last failure:", &job.last_failed_build),
    ] {
        if let Some(build) = build {
            let _ = writeln!(output, "  {} #{}", dim(label), build.number);
        }
    }
    let _ = writeln!(output, "  {} #{}", dim("Next build:"), job.next_build_number);
    for report in &job.health_report {
        let _ = writeln!(output, "  {} {}", dim("Health:"), report.description);
    }

    let parameters: Vec<_> = job
        .property
        .iter()
        .flat_map(|property| &property.parameter_definitions)
        .collect();
    if !parameters.is_empty() {
        output.push('\n');
        add_section_header(&mut output, "⚙️", "Parameters");
        let mut table = create_table();
        table.set_header(cyan_header(&["Name", "Type", "Default"]));
        for parameter in parameters {
            let default = parameter
                .default_parameter_value
                .as_ref()
                .map(|value| match &value.value {
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            table.add_row(vec![
                Cell::new(&parameter.name),
                Cell::new(parameter.kind.trim_end_matches("ParameterDefinition")),
                Cell::new(default),
            ]);
        }
        let _ = writeln!(output, "{table}");
    }
    output
}

pub fn render_queue(items: &[TaskInfo]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "⏳", "Queue");

    if items.is_empty() {
        let _ = writeln!(output, "  {}", dim("The queue is empty"));
        return output;
    }

    let mut table = create_table();
    table.set_header(cyan_header(&["ID", "Job", "Queued since", "State", "Why"]));
    for item in items {
        let since = DateTime::from_timestamp_millis(item.in_queue_since)
            .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let state = if item.stuck {
            "stuck"
        } else if item.blocked {
            "blocked"
        } else if item.buildable {
            "buildable"
        } else {
            "waiting"
        };
        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(&item.task.name),
            Cell::new(since),
            flag_cell(true, state),
            Cell::new(item.why.as_deref().unwrap_or_default()),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

pub fn render_nodes(nodes: &[NodeResponse]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🖥️", "Nodes");

    let mut table = create_table();
    table.set_header(cyan_header(&["Node", "Executors", "State", "Offline reason"]));
    for node in nodes {
        let state = match (node.offline, node.idle) {
            (true, _) => Cell::new("offline").fg(TableColor::Red),
            (false, true) => Cell::new("idle").fg(TableColor::Green),
            (false, false) => Cell::new("busy").fg(TableColor::Yellow),
        };
        table.add_row(vec![
            Cell::new(&node.display_name),
            Cell::new(node.num_executors),
            state,
            Cell::new(&node.offline_cause_reason),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

pub fn render_views(views: &[ViewResponse]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🗂️", "Views");

    let mut table = create_table();
    table.set_header(cyan_header(&["View", "Jobs", "Description"]));
    for view in views {
        table.add_row(vec![
            Cell::new(&view.name),
            Cell::new(view.jobs.len()),
            Cell::new(view.description.as_deref().unwrap_or_default()),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

/// Active plugins; the rest only when `all` is set.
pub fn render_plugins(plugins: &[Plugin], all: bool) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🧩", "Plugins");

    let mut table = create_table();
    table.set_header(cyan_header(&["Plugin", "Version", "", ""]));
    for plugin in plugins.iter().filter(|p| all || (p.active && p.enabled)) {
        let name = if plugin.long_name.is_empty() {
            &plugin.short_name
        } else {
            &plugin.long_name
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(&plugin.version),
            flag_cell(!plugin.enabled, "disabled"),
            flag_cell(plugin.has_update, "update"),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

/// Stages of a run; nested flow nodes are indented below their stage.
pub fn render_stages(run: &PipelineRunResponse) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🚀", &format!("Run {} ({})", run.name, run.status));

    let mut table = create_table();
    table.set_header(cyan_header(&["Stage", "Status", "Duration"]));
    for stage in &run.stages {
        add_stage_rows(&mut table, stage, 0);
    }
    let _ = writeln!(output, "{table}");
    let _ = writeln!(
        output,
        "  {} {}",
        dim("Total:"),
        duration_cell(millis(run.duration_millis)).content()
    );
    output
}

fn add_stage_rows(table: &mut Table, node: &PipelineNodeResponse, depth: usize) {
    table.add_row(vec![
        Cell::new(format!("{}{}", "│ ".repeat(depth), node.name)),
        result_cell(&node.status),
        duration_cell(millis(node.duration_millis)),
    ]);
    for child in &node.stage_flow_nodes {
        add_stage_rows(table, child, depth + 1);
    }
}
