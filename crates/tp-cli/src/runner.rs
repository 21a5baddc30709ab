//! Execution driver.
//!
//! Iterates regions, invokes the decision engine, and either reports the
//! plan (dry-run) or issues one tag-write call per WRITE entry (apply).
//! Nothing here aborts a run: fetch failures fail only their region,
//! write failures fail only their entry.

use anyhow::Result;
use colored::Colorize;
use tp_aws::{ComputeSource, StorageSource, TagSink};
use tp_core::{
    plan, ComputeGraph, GraphIssue, OrphanClassifier, PlanAction, PropagationConfig, StorageGraph,
    TagPlanEntry,
};
use tp_observability::{RunMetrics, RunSummary, TagAuditLog, TagWriteOutcome};
use tracing::{debug, warn};

/// Output format for plan reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// Options resolved from the CLI for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Report only; issue no writes.
    pub dry_run: bool,
    /// Also process EFS + FSx forests.
    pub tag_storage: bool,
    /// Only fix orphaned snapshots/images; skip lineage propagation.
    pub fix_orphans: bool,
    /// Plan output format.
    pub format: OutputFormat,
}

/// Compute-side collaborators for one region.
pub struct ComputeServices<'a> {
    pub source: &'a dyn ComputeSource,
    pub sink: &'a dyn TagSink,
}

/// One storage service's collaborators for one region.
pub struct StorageServices<'a> {
    /// Service label for reporting ("EFS", "FSx").
    pub service: &'a str,
    pub source: &'a dyn StorageSource,
    pub sink: &'a dyn TagSink,
}

/// Processes one region end to end.
pub async fn process_region(
    region: &str,
    compute: ComputeServices<'_>,
    storage: &[StorageServices<'_>],
    config: &PropagationConfig,
    opts: RunOptions,
    metrics: &mut RunMetrics,
    audit: &TagAuditLog,
) -> Result<()> {
    print_region_banner(region, opts);

    let listings = compute.source.fetch_compute().await?;
    let graph = ComputeGraph::build(&listings, config.correlation);
    report_issues(&graph.issues);

    if opts.fix_orphans {
        let classifier = OrphanClassifier::new(config.constraints.clone(), config.policy);
        let entries = classifier.classify(&listings.snapshots, &listings.images, &graph);
        for entry in entries.iter().filter(|e| e.is_write()) {
            debug!(resource_id = %entry.resource_id, "orphan fix planned");
            metrics.orphan_planned();
        }
        execute_entries(region, &entries, compute.sink, opts, metrics, audit).await?;
        metrics.region_processed();
        return Ok(());
    }

    let entries: Vec<TagPlanEntry> =
        plan(&graph.forest, &config.constraints, config.policy).collect();
    println!(
        "[EC2] {} instances, {} resources in lineage",
        graph.forest.trees.len(),
        graph.forest.len()
    );
    execute_entries(region, &entries, compute.sink, opts, metrics, audit).await?;

    if opts.tag_storage {
        for svc in storage {
            match svc.source.fetch_storage().await {
                Ok(listings) => {
                    let graph = StorageGraph::build(&listings);
                    report_issues(&graph.issues);
                    let entries: Vec<TagPlanEntry> =
                        plan(&graph.forest, &config.constraints, config.policy).collect();
                    println!(
                        "[{}] {} roots, {} resources",
                        svc.service,
                        graph.forest.trees.len(),
                        graph.forest.len()
                    );
                    execute_entries(region, &entries, svc.sink, opts, metrics, audit).await?;
                }
                Err(e) => {
                    println!(
                        "[{}] {} in {}: {}",
                        svc.service,
                        "not accessible".yellow(),
                        region,
                        e
                    );
                }
            }
        }
    }

    metrics.region_processed();
    Ok(())
}

/// Reports or applies a batch of plan entries against one sink.
async fn execute_entries(
    region: &str,
    entries: &[TagPlanEntry],
    sink: &dyn TagSink,
    opts: RunOptions,
    metrics: &mut RunMetrics,
    audit: &TagAuditLog,
) -> Result<()> {
    if opts.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(entries)?);
    }

    for entry in entries {
        match entry.action {
            PlanAction::Write => {
                let Some(key) = &entry.key else { continue };
                metrics.write_planned();
                let kind = entry.kind.to_string();

                if opts.dry_run {
                    if opts.format == OutputFormat::Text {
                        print_entry_line(entry, "PLAN".yellow());
                    }
                    audit
                        .record(
                            region,
                            &entry.resource_id,
                            &kind,
                            key.as_str(),
                            &entry.value,
                            TagWriteOutcome::Planned,
                        )
                        .await;
                    continue;
                }

                match sink
                    .write_tag(&entry.resource_id, key.as_str(), &entry.value)
                    .await
                {
                    Ok(()) => {
                        if opts.format == OutputFormat::Text {
                            print_entry_line(entry, "APPLY".green());
                        }
                        metrics.write_applied();
                        audit
                            .record(
                                region,
                                &entry.resource_id,
                                &kind,
                                key.as_str(),
                                &entry.value,
                                TagWriteOutcome::Applied,
                            )
                            .await;
                    }
                    Err(e) => {
                        eprintln!(
                            "    [{}] {} {}: {}",
                            "ERROR".red(),
                            entry.kind,
                            entry.resource_id,
                            e
                        );
                        metrics.write_failed();
                        audit
                            .record(
                                region,
                                &entry.resource_id,
                                &kind,
                                key.as_str(),
                                &entry.value,
                                TagWriteOutcome::Failed(e.to_string()),
                            )
                            .await;
                    }
                }
            }
            PlanAction::SkipAlreadyTagged => {
                debug!(resource_id = %entry.resource_id, "already tagged, skipping");
                metrics.skipped_already_tagged();
            }
            PlanAction::SkipNoSourceName => {
                debug!(resource_id = %entry.resource_id, "no source name, skipping");
                metrics.skipped_no_source_name();
            }
        }
    }

    Ok(())
}

fn print_entry_line(entry: &TagPlanEntry, label: colored::ColoredString) {
    let key = entry.key.as_ref().map(|k| k.as_str()).unwrap_or_default();
    let value = if entry.value.is_empty() {
        "(empty)"
    } else {
        &entry.value
    };
    println!(
        "    [{}] {} {} → {} = {}",
        label, entry.kind, entry.resource_id, key, value
    );
}

/// Read-only inventory of one region.
pub async fn show_region(
    region: &str,
    compute: &dyn ComputeSource,
    storage: &[StorageServices<'_>],
) -> Result<()> {
    println!("\n{}", "=".repeat(80));
    println!("[SHOW] REGION: {}", region.to_uppercase());
    println!("{}", "=".repeat(80));

    match compute.fetch_compute().await {
        Ok(listings) => {
            println!("[EC2] Instances: {}", listings.instances.len());
            println!("[EBS] Volumes: {}", listings.volumes.len());
            println!("[EBS] Snapshots: {}", listings.snapshots.len());
            println!("[AMI] Images: {}", listings.images.len());
        }
        Err(e) => println!("[EC2] {}: {}", "not accessible".yellow(), e),
    }

    for svc in storage {
        match svc.source.fetch_storage().await {
            Ok(listings) => {
                println!("[{}] Resources: {}", svc.service, listings.entries.len())
            }
            Err(e) => println!("[{}] {}: {}", svc.service, "not accessible".yellow(), e),
        }
    }

    Ok(())
}

/// Prints the final run summary.
pub fn print_summary(summary: &RunSummary, opts: RunOptions) {
    println!("\n{}", "═".repeat(80));
    println!("{}", "TAG PROPAGATION COMPLETED!".bold());
    println!(
        "→ {} regions, {} resources planned, {} writes {}, {} skipped (already tagged), {} skipped (no name)",
        summary.regions,
        summary.resources_planned,
        if opts.dry_run {
            summary.writes_planned
        } else {
            summary.writes_applied
        },
        if opts.dry_run { "planned" } else { "applied" },
        summary.skipped_already_tagged,
        summary.skipped_no_source_name,
    );
    if summary.writes_failed > 0 {
        println!(
            "→ {}",
            format!("{} writes failed (see errors above)", summary.writes_failed).red()
        );
    }
    if opts.fix_orphans {
        println!("→ {} orphan fixes planned", summary.orphans_planned);
    }
    println!("{}", "═".repeat(80));
}

fn print_region_banner(region: &str, opts: RunOptions) {
    println!("\n{}", "=".repeat(80));
    let mode = if opts.fix_orphans {
        "Orphan Fix Mode".to_string()
    } else if opts.dry_run {
        "DRY-RUN".to_string()
    } else {
        "APPLY".to_string()
    };
    println!("REGION: {} | Mode: {}", region.to_uppercase(), mode);
    println!("{}", "=".repeat(80));
}

fn report_issues(issues: &[GraphIssue]) {
    for issue in issues {
        warn!(%issue, "graph issue");
    }
}
