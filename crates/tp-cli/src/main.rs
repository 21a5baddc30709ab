//! tagging CLI
//!
//! Propagates a workload's name tag from EC2 instances to their volumes,
//! snapshots, and images, and optionally to EFS + FSx resources. Everything
//! runs in dry-run mode unless `--apply` is given.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod config;
mod runner;

use config::AppConfig;
use runner::{
    print_summary, process_region, show_region, ComputeServices, OutputFormat, RunOptions,
    StorageServices,
};
use tp_aws::{
    resolve_regions, AuthConfig, ConnectorConfig, Ec2Config, Ec2Connector, EfsConfig,
    EfsConnector, FsxConfig, FsxConnector, SecureString,
};
use tp_observability::{RunMetrics, TagAuditLog};

#[derive(Parser)]
#[command(name = "tagging")]
#[command(version)]
#[command(
    about = "Propagates workload name tags across EC2, EFS, and FSx resources",
    long_about = None
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Apply real changes (everything is dry-run without this)
    #[arg(long)]
    apply: bool,

    /// Also tag EFS + all FSx types in each region
    #[arg(long)]
    tag_storage: bool,

    /// Only fix orphaned snapshots and images (no lineage tagging)
    #[arg(long)]
    fix_orphans: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process all target regions
    All,

    /// Process a single region only
    Set {
        /// Region name, e.g. us-east-1
        region: String,
    },

    /// Force dry-run, even when --apply is present
    DryRun {
        /// Optional region (default: all target regions)
        region: Option<String>,
    },

    /// Show resource counts only; never modifies anything
    Show {
        /// Optional region (default: all target regions)
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tp_observability::init_logging_with_config(tp_observability::LoggingConfig {
        level: log_level,
        json_format: cli.format == OutputFormat::Json,
        ..Default::default()
    });

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    // The dry-run and show actions never mutate, whatever the flags say.
    let dry_run = match &cli.command {
        Commands::DryRun { .. } | Commands::Show { .. } => true,
        _ => !cli.apply,
    };

    let mut regions = match &cli.command {
        Commands::All => target_regions(&config).await?,
        Commands::Set { region } => vec![region.clone()],
        Commands::DryRun { region } | Commands::Show { region } => match region {
            Some(r) => vec![r.clone()],
            None => target_regions(&config).await?,
        },
    };
    regions.sort();

    if let Commands::Show { .. } = cli.command {
        println!("\n[SHOW MODE] No changes will be made.");
        for region in &regions {
            let efs = efs_connector(&config, region)?;
            let fsx = fsx_connector(&config, region)?;
            let ec2 = ec2_connector(&config, region)?;
            let storage = [
                StorageServices {
                    service: "EFS",
                    source: &efs,
                    sink: &efs,
                },
                StorageServices {
                    service: "FSx",
                    source: &fsx,
                    sink: &fsx,
                },
            ];
            show_region(region, &ec2, &storage).await?;
        }
        return Ok(());
    }

    let opts = RunOptions {
        dry_run,
        tag_storage: cli.tag_storage,
        fix_orphans: cli.fix_orphans,
        format: cli.format,
    };

    if opts.fix_orphans {
        println!(
            "\n=== ORPHANED SNAPSHOT FIX MODE {} ===",
            if dry_run { "(DRY-RUN)" } else { "(APPLY)" }
        );
    } else if dry_run {
        println!("\n{}", "DRY-RUN MODE".yellow().bold());
    } else {
        println!("\n{}", "APPLY MODE – REAL CHANGES!".red().bold());
    }
    println!("Target regions: {}", regions.join(", "));

    let audit = TagAuditLog::new(config.audit_capacity);
    let mut metrics = RunMetrics::new();

    for region in &regions {
        let ec2 = ec2_connector(&config, region)?;
        let efs = efs_connector(&config, region)?;
        let fsx = fsx_connector(&config, region)?;
        let compute = ComputeServices {
            source: &ec2,
            sink: &ec2,
        };
        let storage = [
            StorageServices {
                service: "EFS",
                source: &efs,
                sink: &efs,
            },
            StorageServices {
                service: "FSx",
                source: &fsx,
                sink: &fsx,
            },
        ];

        if let Err(e) = process_region(
            region,
            compute,
            &storage,
            &config.propagation,
            opts,
            &mut metrics,
            &audit,
        )
        .await
        {
            eprintln!("[{}] {}: {}", "ERROR".red(), region, e);
        }
    }

    print_summary(metrics.summary(), opts);
    Ok(())
}

/// Resolves the run's target regions from configuration, falling back to
/// provider discovery when the configured list is empty.
async fn target_regions(config: &AppConfig) -> Result<Vec<String>> {
    let bootstrap = ec2_connector(config, "us-east-1")?;
    let regions = resolve_regions(&config.region_selection(), &bootstrap).await?;
    Ok(regions)
}

fn connector_config(config: &AppConfig, name: String, base_url: String) -> ConnectorConfig {
    let auth = match &config.api_token {
        Some(token) => AuthConfig::BearerToken {
            token: SecureString::new(token.clone()),
        },
        None => AuthConfig::None,
    };
    ConnectorConfig {
        name,
        base_url,
        auth,
        timeout_secs: config.timeout_secs,
        max_retries: config.max_retries,
        headers: Default::default(),
    }
}

fn ec2_connector(config: &AppConfig, region: &str) -> Result<Ec2Connector> {
    let connector = Ec2Connector::new(Ec2Config {
        connector: connector_config(
            config,
            format!("ec2-{}", region),
            format!("https://ec2.{}.amazonaws.com", region),
        ),
        region: region.to_string(),
    })?;
    Ok(connector)
}

fn efs_connector(config: &AppConfig, region: &str) -> Result<EfsConnector> {
    let connector = EfsConnector::new(EfsConfig {
        connector: connector_config(
            config,
            format!("efs-{}", region),
            format!("https://elasticfilesystem.{}.amazonaws.com", region),
        ),
        region: region.to_string(),
    })?;
    Ok(connector)
}

fn fsx_connector(config: &AppConfig, region: &str) -> Result<FsxConnector> {
    let connector = FsxConnector::new(FsxConfig {
        connector: connector_config(
            config,
            format!("fsx-{}", region),
            format!("https://fsx.{}.amazonaws.com", region),
        ),
        region: region.to_string(),
    })?;
    Ok(connector)
}
