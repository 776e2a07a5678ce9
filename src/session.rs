//! Headless session
//!
//! The non-script run mode: open the project named on the command line (if
//! any), project its object lists into stores, summarise every specimen's
//! pattern on the worker pool and print the result as text tables.

use crate::binding::ChoiceBinding;
use crate::cache::ComputationCache;
use crate::error::Result;
use crate::mathtext::string_safe;
use crate::pool::WorkerPool;
use crate::project::{Pattern, PatternSummary, Project};
use crate::store::{ObjectListStore, ObjectStoreBuilder, SortOrder};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// List properties of a project shown as tables
pub const TABLES: [&str; 2] = ["specimens", "phases"];

/// What a session showed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub project: Option<String>,
    pub tables: Vec<String>,
    /// Specimen name, summary and whether it came from the cache
    pub summaries: Vec<(String, PatternSummary, bool)>,
}

/// Load the startup project; failures are logged and yield `None`
pub fn open_project(filename: Option<&Path>) -> Option<Project> {
    let path = filename?;
    tracing::info!("Opening project: {}", path.display());
    match Project::load(path) {
        Ok(project) => Some(project),
        Err(e) => {
            // TODO: surface load failures to the user once a frontend exists
            tracing::info!("Could not load project file {}: {}", path.display(), e);
            None
        }
    }
}

/// Run a session, writing tables to `out`
pub fn run_session(
    filename: Option<&Path>,
    pool: &WorkerPool,
    cache: &ComputationCache,
    out: &mut dyn Write,
) -> Result<SessionReport> {
    let mut report = SessionReport::default();
    let Some(mut project) = open_project(filename) else {
        writeln!(out, "No project loaded")?;
        return Ok(report);
    };
    report.project = Some(project.name.clone());

    writeln!(out, "Project: {}", project.name)?;
    if !project.description.is_empty() {
        writeln!(out, "{}", project.description)?;
    }
    let layout = ChoiceBinding::builder("layout")
        .list_property("layout_choices")
        .bind(&project)?;
    writeln!(
        out,
        "Layout: {}",
        layout.active_label().unwrap_or_else(|| project.layout.clone())
    )?;

    for property in TABLES {
        let store = ObjectStoreBuilder::new()
            .list_property(&mut project, property)
            .build()?;
        let weight_column = store.borrow().column_index("weight_fraction");
        if let Some(column) = weight_column {
            store.borrow_mut().sort_by(column, SortOrder::Descending)?;
        }
        writeln!(out)?;
        writeln!(out, "[{}]", property)?;
        render_table(&store.borrow(), out)?;
        report.tables.push(property.to_string());
    }

    let specimens: Vec<(String, Arc<Pattern>)> = project
        .specimens
        .iter()
        .map(|(_, s)| (s.name.clone(), Arc::clone(&s.pattern)))
        .collect();
    let summaries = summarise_patterns(
        pool,
        cache,
        specimens.iter().map(|(_, p)| Arc::clone(p)).collect(),
    )?;

    if !summaries.is_empty() {
        writeln!(out)?;
        writeln!(out, "[patterns]")?;
    }
    for ((name, _), (summary, cached)) in specimens.into_iter().zip(summaries) {
        writeln!(
            out,
            "{}: {} points, 2θ {:.2}-{:.2}, max {:.1}, area {:.1}{}",
            name,
            summary.points,
            summary.min_two_theta,
            summary.max_two_theta,
            summary.max_intensity,
            summary.integrated_intensity,
            if cached { " (cached)" } else { "" }
        )?;
        report.summaries.push((name, summary, cached));
    }
    Ok(report)
}

/// Summarise patterns on the pool
///
/// Workers read the cache; new results are written back from this thread.
pub fn summarise_patterns(
    pool: &WorkerPool,
    cache: &ComputationCache,
    patterns: Vec<Arc<Pattern>>,
) -> Result<Vec<(PatternSummary, bool)>> {
    let keys: Vec<String> = patterns.iter().map(|p| p.cache_key()).collect();
    let results = pool.map(patterns, |ctx, pattern: Arc<Pattern>| {
        let key = pattern.cache_key();
        match ctx.cache.get_json::<PatternSummary>(&key) {
            Ok(Some(summary)) => (summary, true),
            Ok(None) => (pattern.summary(), false),
            Err(e) => {
                tracing::warn!("Worker {} cache read failed: {}", ctx.worker_id, e);
                (pattern.summary(), false)
            }
        }
    })?;

    for (key, (summary, cached)) in keys.iter().zip(&results) {
        if !cached {
            if let Err(e) = cache.put_json(key, summary) {
                tracing::warn!("Could not cache pattern summary: {}", e);
            }
        }
    }
    Ok(results)
}

/// Write a store as a plain text table with `string_safe` headers
pub fn render_table(store: &ObjectListStore, out: &mut dyn Write) -> Result<()> {
    let headers: Vec<String> = store
        .columns()
        .iter()
        .map(|c| string_safe(c.label).trim().to_string())
        .collect();
    let rows: Vec<Vec<String>> = (0..store.len())
        .map(|row| {
            (0..store.n_columns())
                .map(|column| {
                    store
                        .value(row, column)
                        .map(|v| v.to_text())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    write_row(out, &headers, &widths)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(out, &rule, &widths)?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }
    if rows.is_empty() {
        writeln!(out, "(empty)")?;
    }
    Ok(())
}

fn write_row(out: &mut dyn Write, cells: &[String], widths: &[usize]) -> Result<()> {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    writeln!(out, "{}", line.join(" | ").trim_end())?;
    Ok(())
}
