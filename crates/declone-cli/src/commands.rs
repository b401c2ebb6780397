use anyhow::Context;
use colored::Colorize;
use declone_merge::{
    CancelSignal, DecloneEngine, PersistenceAdapter, PromoterConfig, PromotionDriver,
    PromotionOutcome, PromotionReport, VariantFetcher,
};
use declone_store::ManifestStepAction;
use declone_types::decode_clone_reference;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::cli::*;
use crate::fixture::{Backends, Fixture};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args, cli.format).await,
        Command::Resolve(args) => cmd_resolve(args, cli.format),
    }
}

fn load_config(args: &RunArgs, fixture: &Fixture) -> anyhow::Result<PromoterConfig> {
    let mut config = match &args.config {
        Some(path) => PromoterConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PromoterConfig::default(),
    };
    if let Some(store) = &fixture.store {
        config.target_store = store.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_run(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
    let fixture = Fixture::load(&args.fixture)?;
    let config = load_config(&args, &fixture)?;
    let manifest_id = args.manifest.unwrap_or_else(Uuid::now_v7);
    let clones = fixture.manifest.clone();
    let store = config.target_store.clone();

    let Backends {
        items,
        relationships,
        manifest,
    } = fixture.into_backends(&store, manifest_id)?;

    let driver = PromotionDriver::new(
        config,
        manifest,
        VariantFetcher::new(items.clone(), relationships.clone(), store.clone()),
        DecloneEngine::default(),
        PersistenceAdapter::new(items.clone(), relationships.clone(), store.clone()),
    )?;

    let (handle, signal) = CancelSignal::new();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current batch");
            handle.cancel();
        }
    });
    let result = driver
        .run(manifest_id, ManifestStepAction::PromoteCloneVariant, &signal)
        .await;
    watcher.abort();
    let report = result?;

    let mut merged = Vec::with_capacity(clones.len());
    for id in &clones {
        if let Some(variant) = items.get(id)? {
            let edges = relationships.get(&store, id)?;
            merged.push((variant, edges));
        }
    }

    match format {
        OutputFormat::Json => {
            let variants: Vec<_> = merged
                .iter()
                .map(|(variant, edges)| json!({ "variant": variant, "relationships": edges }))
                .collect();
            let out = json!({ "report": report_json(&report), "variants": variants });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            print_report(&report);
            for (variant, edges) in &merged {
                println!("\n{} {}", "variant".bold(), variant.identifier.to_string().cyan());
                for field in &variant.fields {
                    println!("  {} = {}", field.field_id.to_string().dimmed(), field.raw_value);
                }
                for edge in edges {
                    println!(
                        "  {} {} -> {}",
                        edge.relationship_type.to_string().yellow(),
                        edge.source_id,
                        edge.target_id
                    );
                }
            }
        }
    }
    Ok(())
}

fn report_json(report: &PromotionReport) -> serde_json::Value {
    json!({
        "manifest": report.manifest,
        "step": report.step,
        "outcome": match report.outcome {
            PromotionOutcome::Completed => "completed",
            PromotionOutcome::Cancelled => "cancelled",
        },
        "batches": report.batches,
        "clones_requested": report.clones_requested,
        "variants_written": report.variants_written,
        "relationships_written": report.relationships_written,
        "orphans": report.orphans,
        "skipped": report.skipped,
        "elapsed_ms": u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
    })
}

fn print_report(report: &PromotionReport) {
    match report.outcome {
        PromotionOutcome::Completed => println!("{} Promotion completed", "✓".green().bold()),
        PromotionOutcome::Cancelled => println!("{} Promotion cancelled", "!".yellow().bold()),
    }
    println!("  Manifest: {}", report.manifest.to_string().cyan());
    println!("  Batches: {}", report.batches);
    println!(
        "  Written: {} variants, {} relationships",
        report.variants_written.to_string().bold(),
        report.relationships_written.to_string().bold()
    );
    if report.orphans > 0 {
        println!("  Orphaned clones: {}", report.orphans.to_string().yellow());
    }
    if report.skipped > 0 {
        println!("  Skipped: {}", report.skipped.to_string().yellow());
    }
}

fn cmd_resolve(args: ResolveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let fixture = Fixture::load(&args.fixture)?;
    let rows: Vec<_> = fixture
        .variants
        .iter()
        .map(|v| (v, decode_clone_reference(v)))
        .collect();

    match format {
        OutputFormat::Json => {
            let out: Vec<_> = rows
                .iter()
                .map(|(v, reference)| {
                    json!({
                        "variant": v.identifier,
                        "source": reference.as_ref().map(|r| &r.source),
                        "store": reference.as_ref().map(|r| &r.store),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            for (v, reference) in rows {
                match reference {
                    Some(r) => println!("{} -> {} ({})", v.identifier, r.source.to_string().green(), r.store),
                    None => println!("{} -> {}", v.identifier, "not a clone".dimmed()),
                }
            }
        }
    }
    Ok(())
}
