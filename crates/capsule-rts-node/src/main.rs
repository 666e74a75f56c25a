// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capsule deployment node CLI
//!
//! # Usage
//!
//! ```bash
//! # Write an example node file
//! capsule-rts-node gen-config --output node.toml
//!
//! # Run the main host
//! capsule-rts-node --config node.toml --address tcp://127.0.0.1:7000 --plan plan.json
//!
//! # Run a child host (receives its plan from the parent)
//! capsule-rts-node --config node.toml --address tcp://127.0.0.1:7001
//! ```

use capsule_rts::deployment::{DeploymentMap, QueueControllerFactory};
use capsule_rts::transport::TcpTransport;
use capsule_rts::ExecutionDirector;
use capsule_rts_node::{install_abort_handler, NodeConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Capsule deployment node
#[derive(Parser, Debug)]
#[command(name = "capsule-rts-node")]
#[command(about = "Run one host of a distributed capsule deployment")]
#[command(version)]
struct Args {
    /// Node configuration file (TOML, or JSON by extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local address (tcp://host:port), overrides the file
    #[arg(short, long)]
    address: Option<String>,

    /// Deployment plan; only the main host loads one
    #[arg(short, long)]
    plan: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "node.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let mut config = match &args.config {
        Some(path) => NodeConfig::from_file(path)?,
        None => return Err("Missing --config (see gen-config)".into()),
    };
    if let Some(address) = args.address {
        config.runtime.local_address = Some(address);
    }
    if let Some(plan) = args.plan {
        config.runtime.plan_path = Some(plan);
    }
    config.validate()?;

    let map = Arc::new(DeploymentMap::new());
    map.set_default_slot_list(config.build_slots())?;
    let registry = Arc::new(config.build_registry()?);
    let transport = Arc::new(TcpTransport::new(config.runtime.tcp_options()));

    tracing::info!(
        address = config.runtime.local_address.as_deref().unwrap_or("-"),
        slots = config.slots.len(),
        "Capsule node starting"
    );

    let director = ExecutionDirector::new(
        map,
        registry,
        transport,
        config.runtime,
        Arc::new(QueueControllerFactory),
    );

    install_abort_handler(director.handle())?;

    director.spawn()?;
    director.join()?;

    tracing::info!("Capsule node stopped");
    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml = NodeConfig::example().to_toml()?;
    std::fs::write(&output, toml)?;
    println!("Generated example configuration: {}", output.display());
    Ok(())
}

fn cmd_validate(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = NodeConfig::from_file(&path)?;
    config.build_registry()?;
    println!("Configuration is valid: {}", path.display());
    println!("  Protocols: {}", config.protocols.len());
    println!("  Slots: {}", config.slots.len());
    if let Some(plan) = &config.runtime.plan_path {
        DeploymentMap::new().from_file(plan)?;
        println!("  Plan: {}", plan.display());
    }
    Ok(())
}
