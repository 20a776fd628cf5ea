//! dnskeeper - keeps DNS records pointed at the current IP.

use clap::{Parser, Subcommand};
use dnskeeper::config::Config;
use dnskeeper::providers::RecordLookup;
use dnskeeper::{DdnsError, DomainUpdater, Services, Supervisor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dnskeeper")]
#[command(about = "Dynamic DNS updater for Cloudflare, AliDNS, DNSPod, HE, DuckDNS and No-IP")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the update loops until interrupted
    Run {
        /// Check interval in seconds (overrides the config file)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run a single pass over every domain
    Update,

    /// Show current IP and published records
    Status,

    /// Validate configuration and provider credentials
    Validate,

    /// Print an example configuration
    Example,
}

fn get_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    let candidates = [
        dirs::config_dir().map(|p| p.join("dnskeeper/config.toml")),
        Some(PathBuf::from("/etc/dnskeeper/config.toml")),
        Some(PathBuf::from("config.toml")),
    ];

    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            return candidate;
        }
    }

    // Return default even if it doesn't exist
    Config::default_path().unwrap_or_else(|_| PathBuf::from("config.toml"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Example = cli.command {
        print!("{}", Config::example().to_toml()?);
        return Ok(());
    }

    let config_path = get_config_path(cli.config);
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Run { interval } => cmd_run(config, interval).await?,
        Commands::Update => cmd_update(config).await?,
        Commands::Status => cmd_status(config).await?,
        Commands::Validate => cmd_validate(config).await?,
        Commands::Example => {}
    }

    Ok(())
}

async fn cmd_run(mut config: Config, interval: Option<u64>) -> anyhow::Result<()> {
    if let Some(secs) = interval {
        config.check_interval_secs = secs;
    }
    config.validate()?;

    let services = Services::from_config(&config)?;
    let config = Arc::new(config);

    tracing::info!(
        "Starting dnskeeper with {} (interval: {}s, {} domains)",
        services.provider.name(),
        config.check_interval_secs,
        config.domains.len()
    );

    let supervisor = Supervisor::new(Arc::clone(&config), services);

    if let Err(e) = supervisor.run_until(tokio::signal::ctrl_c()).await {
        tracing::error!("{}", e);
        if matches!(e, DdnsError::CrashBudgetExhausted { .. }) {
            std::process::exit(1);
        }
        return Err(e.into());
    }

    Ok(())
}

async fn cmd_update(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let services = Services::from_config(&config)?;
    let config = Arc::new(config);

    for domain in &config.domains {
        let mut updater = DomainUpdater::new(
            Arc::new(domain.clone()),
            Arc::clone(&config),
            services.clone(),
        );
        let report = updater.check_once().await;

        match &report.current_ip {
            Some(ip) => println!("{} (current IP {})", domain.domain_name, ip),
            None => {
                println!("{}: failed to detect current IP", domain.domain_name);
                continue;
            }
        }
        for (fqdn, outcome) in &report.subdomains {
            println!("  {}: {}", fqdn, outcome);
        }
    }

    Ok(())
}

async fn cmd_status(config: Config) -> anyhow::Result<()> {
    let services = Services::from_config(&config)?;

    println!("dnskeeper Status");
    println!("================\n");
    println!("Provider: {}", services.provider.name());

    match services.ip_source.current_ip().await {
        Ok(ip) => println!("Current IP: {}", ip.trim_end()),
        Err(e) => println!("Failed to detect IP: {}", e),
    }

    let listing = services.provider.lookup() == RecordLookup::Listing;

    for domain in &config.domains {
        println!("\n{}:", domain.domain_name);

        let records = if listing {
            match services.provider.list_records(&domain.domain_name).await {
                Ok(records) => records,
                Err(e) => {
                    println!("  error: {}", e);
                    continue;
                }
            }
        } else {
            Vec::new()
        };

        for label in &domain.sub_domains {
            let fqdn = domain.fqdn(label);
            print!("  {}: ", fqdn);

            if listing {
                match records.iter().find(|r| r.name.eq_ignore_ascii_case(&fqdn)) {
                    Some(record) => println!("{}", record.value),
                    None => println!("(no record)"),
                }
            } else {
                match services.resolver.resolve(&fqdn).await {
                    Ok(ip) => println!("{}", ip),
                    Err(e) => println!("error: {}", e),
                }
            }
        }
    }

    Ok(())
}

async fn cmd_validate(config: Config) -> anyhow::Result<()> {
    println!("Validating configuration...\n");

    if let Err(e) = config.validate() {
        println!("FAILED - {}", e);
        std::process::exit(1);
    }
    println!("  config: OK");

    let services = Services::from_config(&config)?;
    let provider = &services.provider;
    let mut all_valid = true;

    if provider.lookup() != RecordLookup::Resolve {
        for domain in &config.domains {
            print!("  {} ({}): ", provider.name(), domain.domain_name);
            match provider.list_records(&domain.domain_name).await {
                Ok(records) => println!("OK ({} records)", records.len()),
                Err(e) => {
                    println!("FAILED - {}", e);
                    all_valid = false;
                }
            }
        }
    }

    println!();

    if all_valid {
        println!("Configuration validated successfully.");
    } else {
        println!("Some domains failed validation.");
        std::process::exit(1);
    }

    Ok(())
}
