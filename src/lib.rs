// src/lib.rs

pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod reload;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error as AnyhowError;
use tokio::sync::mpsc;
use tracing::info;

use crate::classify::RuleSet;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::job::{JobRegistry, JobRunner};
use crate::pipeline::PipelineDefinition;
use crate::reload::ReloadHub;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - rule compilation / pipeline definition / job registry
/// - core runtime + async shell
/// - job runner
/// - (watch mode) file watcher + live reload hub
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let registry = JobRegistry::from_config(&cfg);
    run_with_registry(&args, &cfg, registry).await
}

/// Like [`run`], but with a caller-supplied job registry.
///
/// Library users register one-shot handlers here on top of (or instead of)
/// the command-backed jobs a config declares.
pub async fn run_with_registry(
    args: &CliArgs,
    cfg: &ConfigFile,
    registry: JobRegistry,
) -> Result<()> {
    let pipeline = PipelineDefinition::new(cfg.pipeline().to_vec());

    // Fatal before any watching begins.
    registry.validate_against(&pipeline)?;

    let rules = RuleSet::from_config(cfg.rules())?;

    let config_path = PathBuf::from(&args.config);
    let base_directory = config_root_dir(&config_path);

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = JobRunner::new(Arc::new(registry), base_directory.clone(), rt_tx.clone());

    // Watch-mode collaborators: file watcher and live reload hub.
    let (reload, _watcher_handle) = if args.once {
        (None, None)
    } else {
        let reload = cfg
            .reload()
            .map(|section| ReloadHub::bind(&section.addr, base_directory.join(&section.site_root)))
            .transpose()?;

        let watcher = watch::spawn_watcher(
            base_directory.clone(),
            &cfg.watch().paths,
            rt_tx.clone(),
        )?;

        (reload, Some(watcher))
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Once mode schedules the full pipeline unconditionally for one pass.
    if args.once {
        rt_tx
            .send(RuntimeEvent::FullPassRequested)
            .await
            .map_err(AnyhowError::from)?;
    }

    let options = RuntimeOptions { once: args.once };
    let debounce = Duration::from_millis(cfg.watch().debounce_ms);

    info!(
        once = args.once,
        debounce_ms = cfg.watch().debounce_ms,
        pipeline = ?cfg.pipeline(),
        "session starting"
    );

    // Pure core + async IO shell around it.
    let core = CoreRuntime::new(rules, pipeline, options);
    let runtime = Runtime::new(core, rt_rx, rt_tx, executor, reload, debounce);
    runtime.run().await
}

/// Figure out a sensible project root.
///
/// - If the config path has a non-empty parent (e.g. "configs/Pipewatch.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Pipewatch.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print pipeline, rules and jobs.
fn print_dry_run(cfg: &ConfigFile) {
    println!("pipewatch dry-run");
    println!("  watch.paths = {:?}", cfg.watch().paths);
    println!("  watch.debounce_ms = {}", cfg.watch().debounce_ms);
    println!();

    println!("pipeline ({}):", cfg.pipeline().len());
    for name in cfg.pipeline() {
        println!("  - {name}");
    }
    println!();

    println!("rules ({}):", cfg.rules().len());
    for rule in cfg.rules() {
        println!("  - pattern: {}", rule.pattern);
        println!("      jobs: {:?}", rule.jobs);
        if rule.short_circuit {
            println!("      short_circuit: true");
        }
    }
    println!();

    println!("jobs ({}):", cfg.jobs().len());
    for (name, job) in cfg.jobs().iter() {
        println!("  - {name}");
        println!("      kind: {:?}", job.kind);
        println!("      command: {}", job.command);
    }

    if let Some(reload) = cfg.reload() {
        println!();
        println!("reload:");
        println!("  addr: {}", reload.addr);
        println!("  site_root: {}", reload.site_root);
    }
}
