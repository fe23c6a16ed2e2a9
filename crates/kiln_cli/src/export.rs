//! `kiln export` — minimal-diff publication to a directory.
//!
//! Writes the bodies of added routes (or of every current route with
//! `--full`) and deletes the files of evicted routes. Routes map to files as
//! follows: `/` becomes `index.html`, `/about` becomes `about/index.html`, and
//! a route whose last segment has an extension (`/feed.xml`) keeps its name.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use kiln_cache::{CacheEntry, Snapshot};
use kiln_config::ExportStrategy;

use crate::project::Project;
use crate::{ExportArgs, GlobalArgs};

/// Counts of what an export did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Files written.
    pub written: usize,
    /// Files deleted.
    pub deleted: usize,
    /// Routes without a body. A file published for them earlier is deleted.
    pub skipped: usize,
}

/// Runs the `kiln export` command.
pub fn run(args: &ExportArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;
    let snapshot = Snapshot::load(&project.cache_config(global))?;
    let out = project.out_dir(args.out.as_ref());
    let strategy = if args.full {
        ExportStrategy::Full
    } else {
        project.config.export.strategy
    };

    let report = export(&snapshot, &out, strategy)?;
    if !global.quiet {
        eprintln!(
            "  Exported {} files, deleted {} ({} bodyless routes skipped) to {}",
            report.written,
            report.deleted,
            report.skipped,
            out.display()
        );
    }
    Ok(0)
}

/// Publishes `snapshot` into `out`.
pub fn export(
    snapshot: &Snapshot,
    out: &Path,
    strategy: ExportStrategy,
) -> Result<ExportReport, Box<dyn std::error::Error>> {
    let mut report = ExportReport::default();

    let to_write: &[CacheEntry] = match strategy {
        ExportStrategy::Delta => snapshot.added(),
        ExportStrategy::Full => snapshot.current(),
    };
    for entry in to_write {
        let target = out.join(route_file(&entry.path)?);
        let Some(body) = snapshot.body(entry)? else {
            tracing::debug!(path = %entry.path, "route has no body, clearing output");
            report.skipped += 1;
            if remove_output(&target)? {
                report.deleted += 1;
            }
            continue;
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, body)?;
        report.written += 1;
    }

    // Two route spellings can share an output file; never delete a live one.
    let live: HashSet<PathBuf> = snapshot
        .current()
        .iter()
        .map(|entry| route_file(&entry.path))
        .collect::<Result<_, _>>()?;
    for entry in snapshot.evicted() {
        let file = route_file(&entry.path)?;
        if live.contains(&file) {
            continue;
        }
        if remove_output(&out.join(&file))? {
            report.deleted += 1;
        }
    }

    tracing::info!(
        written = report.written,
        deleted = report.deleted,
        "export finished"
    );
    Ok(report)
}

/// Deletes a published file, returning whether one was there.
fn remove_output(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Maps a route path to a file path relative to the output directory.
pub fn route_file(route: &str) -> Result<PathBuf, String> {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(PathBuf::from("index.html"));
    }

    let mut file = PathBuf::new();
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        match Path::new(segment).components().next() {
            Some(Component::Normal(_)) => file.push(segment),
            _ => return Err(format!("route '{route}' escapes the output directory")),
        }
    }

    let has_extension = !route.ends_with('/') && file.extension().is_some();
    if !has_extension {
        file.push("index.html");
    }
    Ok(file)
}
