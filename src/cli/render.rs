use pipeline_poller::core::models::{DataSource, FarmJobPage, FarmNode};
use serde_json::Value;

pub fn print_payload(source: &DataSource, payload: &Value) {
    let rendered = match source {
        DataSource::FarmJobs(_) => serde_json::from_value::<FarmJobPage>(payload.clone())
            .ok()
            .map(|page| render_jobs(&page)),
        DataSource::FarmNodes => serde_json::from_value::<Vec<FarmNode>>(payload.clone())
            .ok()
            .map(|nodes| render_nodes(&nodes)),
        _ => None,
    };

    match rendered {
        Some(text) => print!("{text}"),
        None => println!(
            "{}",
            serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
        ),
    }
}

fn render_jobs(page: &FarmJobPage) -> String {
    let mut out = String::new();
    for job in &page.results {
        let node = job
            .node
            .as_ref()
            .map(|n| n.machine_name.as_str())
            .unwrap_or("-");
        let progress = job.progress.as_deref().unwrap_or("");
        out.push_str(&format!(
            "{:>7}  {:<11} {:<14} {:<40} {}\n",
            job.id, job.status, node, job.job_class, progress
        ));
    }
    match page.count {
        Some(total) => out.push_str(&format!("{} of {} jobs\n", page.results.len(), total)),
        None => out.push_str(&format!("{} jobs\n", page.results.len())),
    }
    out
}

fn render_nodes(nodes: &[FarmNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        let state = if node.active { "active" } else { "inactive" };
        let cpu = node
            .cpu_percent
            .map(|c| format!("{c:>5.1}%"))
            .unwrap_or_else(|| "    -".to_string());
        out.push_str(&format!(
            "{:>5}  {:<20} {:<9} {:<10} cpu {}  jobs {}\n",
            node.id,
            node.machine_name,
            state,
            node.status.as_deref().unwrap_or("-"),
            cpu,
            node.running_jobs.len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_jobs_with_total() {
        let page: FarmJobPage = serde_json::from_value(json!({
            "count": 12,
            "results": [
                {"id": 5, "job_class": "jobs.export.Export", "status": "failed"},
                {"id": 6, "job_class": "jobs.export.Export", "status": "running",
                 "node": {"id": 1, "machine_name": "farm-01"}, "progress": "10%"}
            ]
        }))
        .unwrap();

        let text = render_jobs(&page);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("failed"));
        assert!(lines[1].contains("farm-01"));
        assert!(lines[1].ends_with("10%"));
        assert_eq!(lines[2], "2 of 12 jobs");
    }

    #[test]
    fn test_render_nodes() {
        let nodes: Vec<FarmNode> = serde_json::from_value(json!([
            {"id": 1, "machine_name": "farm-01", "active": true, "status": "accepting",
             "cpu_percent": 12.5, "running_jobs": [{"id": 3}]}
        ]))
        .unwrap();

        let text = render_nodes(&nodes);
        assert!(text.contains("farm-01"));
        assert!(text.contains("active"));
        assert!(text.contains(" 12.5%"));
        assert!(text.trim_end().ends_with("jobs 1"));
    }
}
