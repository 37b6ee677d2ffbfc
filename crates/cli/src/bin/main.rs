// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! `relq`: run rewrite passes over a serialized expression tree and print
//! it as debug text or SQL

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relq_cli::{OutputMode, RelqConfig, render, run_passes};
use relq_ir::ExprRef;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "relq")]
#[command(version, about = "Rewrite and render relq expression trees", long_about = None)]
struct Cli {
    /// YAML or JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print SQL instead of debug text
    #[arg(long)]
    sql: bool,

    /// Fold locally evaluable subtrees
    #[arg(long)]
    evaluate: bool,

    /// Remove and merge redundant subqueries
    #[arg(long)]
    remove_redundant: bool,

    /// Re-mint aliases declared more than once
    #[arg(long)]
    dedupe_aliases: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    /// Serialized expression tree (JSON)
    input: PathBuf,
}

impl Cli {
    /// Flags only ever switch features on over the config file
    fn apply_to(&self, config: &mut RelqConfig) {
        if self.sql {
            config.output = OutputMode::Sql;
        }
        config.passes.evaluate |= self.evaluate;
        config.passes.deduplicate_aliases |= self.dedupe_aliases;
        config.passes.remove_redundant_subqueries |= self.remove_redundant;
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => RelqConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RelqConfig::default(),
    };
    cli.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    let content = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let tree: ExprRef = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse expression tree from {}", cli.input.display()))?;
    tracing::debug!(input = %cli.input.display(), "loaded expression tree");

    let tree = run_passes(&tree, &config).context("Rewrite pass failed")?;
    let output = render(&tree, &config).context("Failed to render expression tree")?;
    println!("{}", output);
    Ok(())
}
