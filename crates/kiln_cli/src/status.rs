//! `kiln status` — reports what the latest build changed.

use kiln_cache::{CacheEntry, Snapshot};

use crate::project::Project;
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// Runs the `kiln status` command.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;
    let snapshot = Snapshot::load(&project.cache_config(global))?;

    match args.format {
        ReportFormat::Text => print!("{}", render_text(&snapshot)),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&render_json(&snapshot))?;
            println!("{json}");
        }
    }
    Ok(0)
}

fn render_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let unchanged = snapshot.unchanged().count();
    out.push_str(&format!(
        "{} routes: {} added, {} unchanged, {} evicted\n",
        snapshot.current().len(),
        snapshot.added().len(),
        unchanged,
        snapshot.evicted().len()
    ));
    for entry in snapshot.added() {
        out.push_str(&format!("  + {}\n", entry.path));
    }
    for entry in snapshot.evicted() {
        out.push_str(&format!("  - {}\n", entry.path));
    }
    out
}

fn render_json(snapshot: &Snapshot) -> serde_json::Value {
    serde_json::json!({
        "added": paths(snapshot.added().iter()),
        "evicted": paths(snapshot.evicted().iter()),
        "unchanged": paths(snapshot.unchanged()),
    })
}

fn paths<'a>(entries: impl Iterator<Item = &'a CacheEntry>) -> Vec<&'a str> {
    entries.map(|e| e.path.as_str()).collect()
}
