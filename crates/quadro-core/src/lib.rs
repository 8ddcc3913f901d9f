pub mod cli;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod datetime;
pub mod idea;
pub mod quadrant;
pub mod render;
pub mod storage;
pub mod store;
pub mod tags;
pub mod task;
pub mod views;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let global = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(global.verbose, global.quiet)?;

    info!(
        verbose = global.verbose,
        quiet = global.quiet,
        "starting quadro CLI"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(global.config.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(global.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let data_dir = config::resolve_data_dir(&cfg, global.data.as_deref())
        .context("failed to resolve data directory")?;

    let storage = storage::Storage::open(&data_dir)
        .with_context(|| format!("failed to open storage at {}", data_dir.display()))?;

    let mut tasks = store::TaskStore::load(storage.clone());
    let mut ideas = idea::IdeaStore::load(storage.clone());
    let mut tags = tags::TagRegistry::load(storage);

    let mut renderer = render::Renderer::new(&cfg)?;
    let mut confirm = confirm::from_config(&cfg, global.assume_yes);

    let mut ctx = commands::CommandContext {
        tasks: &mut tasks,
        ideas: &mut ideas,
        tags: &mut tags,
        cfg: &cfg,
        renderer: &mut renderer,
        confirm: confirm.as_mut(),
    };
    commands::dispatch(&mut ctx, global.command)?;

    info!("done");
    Ok(())
}
