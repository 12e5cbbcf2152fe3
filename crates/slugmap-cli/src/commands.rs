use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use slugmap_server::{ServerConfig, SlugmapServer};
use slugmap_service::{HealthStatus, MappingService};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => {
            if let Some(bind) = args.bind {
                config.bind_addr = bind;
            }
            cmd_serve(config).await
        }
        Command::GetId(args) => cmd_get_id(&config, &cli.format, args).await,
        Command::Resolve(args) => cmd_resolve(&config, &cli.format, args).await,
        Command::Health => cmd_health(&config, &cli.format).await,
    }
}

/// Defaults, then the config file, then the environment, then flags.
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env()?;
    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn service(config: &ServerConfig) -> anyhow::Result<MappingService> {
    config.build_service().context("invalid database URL")
}

async fn cmd_serve(config: ServerConfig) -> anyhow::Result<()> {
    let server = SlugmapServer::new(config)?;
    server.serve().await?;
    Ok(())
}

async fn cmd_get_id(
    config: &ServerConfig,
    format: &OutputFormat,
    args: GetIdArgs,
) -> anyhow::Result<()> {
    let id = service(config)?
        .get_or_create_identifier(&args.slug, &args.kind)
        .await?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "uuid": id })),
        OutputFormat::Text => println!(
            "{} {} ({}) -> {}",
            "✓".green().bold(),
            args.slug.bold(),
            args.kind.cyan(),
            id.to_string().yellow()
        ),
    }
    Ok(())
}

async fn cmd_resolve(
    config: &ServerConfig,
    format: &OutputFormat,
    args: ResolveArgs,
) -> anyhow::Result<()> {
    let record = service(config)?.resolve_identifier(&args.identifier).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&record)?),
        OutputFormat::Text => {
            println!("Identifier: {}", record.identifier.to_string().yellow());
            println!("  Slug: {}", record.slug.bold());
            println!("  Type: {}", record.kind.cyan());
        }
    }
    Ok(())
}

async fn cmd_health(config: &ServerConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let service = service(config)?;
    let target = service.connection().target();
    let status = service.health_check().await;
    match (format, &status) {
        (OutputFormat::Json, HealthStatus::Connected) => {
            println!("{}", json!({ "status": "OK", "database": "Connected" }))
        }
        (OutputFormat::Json, HealthStatus::Disconnected { reason }) => {
            println!("{}", json!({ "status": "Error", "message": reason }))
        }
        (OutputFormat::Text, HealthStatus::Connected) => {
            println!("{} {} is reachable", "✓".green().bold(), target.bold())
        }
        (OutputFormat::Text, HealthStatus::Disconnected { reason }) => {
            println!("{} {}: {}", "✗".red().bold(), target.bold(), reason)
        }
    }
    if let HealthStatus::Disconnected { reason } = status {
        bail!("store unreachable: {reason}");
    }
    Ok(())
}
