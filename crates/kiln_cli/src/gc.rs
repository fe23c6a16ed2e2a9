//! `kiln gc` — removes body files no generation references.

use crate::project::Project;
use crate::GlobalArgs;

/// Runs the `kiln gc` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;
    let cache = project.cache_config(global);
    let report = kiln_cache::collect_garbage(&cache)?;

    if !global.quiet {
        eprintln!(
            "   Removed {} unreferenced bodies ({} kept, {} temporary files)",
            report.removed, report.kept, report.temp_removed
        );
    }
    Ok(0)
}
