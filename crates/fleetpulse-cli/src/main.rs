//! Fleetpulse - device health reconciliation CLI
//!
//! The `fleetpulse` command reconciles endpoint-compliance data against
//! the fleet registry's device health records.
//!
//! ## Commands
//!
//! - `update-devices`: run one reconciliation pass and submit the bulk
//!   health update (cron entry point)
//! - `list-checks`: dump all compliance checks as JSON
//! - `validate-checks`: verify every check carries a severity tag

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::Level;

use fleetpulse_core::{
    ComplianceApi, ComplianceClient, ComplianceConfig, Criticality, CriticalityPolicy, Error,
    FleetClient, FleetConfig, HealthEvaluator, ReconciliationEngine,
};

#[derive(Parser)]
#[command(name = "fleetpulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Device health reconciliation between the compliance service and the fleet registry", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the health status of all fleet devices based on
    /// compliance check failures
    UpdateDevices {
        /// Token used with the compliance API
        #[arg(short = 't', long, env = "KOLIDE_API_TOKEN", hide_env_values = true)]
        kolide_api_token: Option<String>,

        /// Check IDs to ignore for this run (comma-separated or repeated)
        #[arg(
            short = 'i',
            long,
            value_delimiter = ',',
            env = "KOLIDE_CHECKS_IGNORED"
        )]
        ignore_checks: Vec<i64>,

        /// Username used for fleet service authentication (basic auth)
        #[arg(short = 'u', long, env = "APISERVER_USERNAME", default_value = "fleetpulse")]
        apiserver_username: String,

        /// Password used for fleet service authentication (basic auth)
        #[arg(short = 'p', long, env = "APISERVER_PASSWORD", hide_env_values = true)]
        apiserver_password: Option<String>,

        /// Fleet service host
        #[arg(long, env = "APISERVER_HOST", default_value = "10.255.240.1")]
        apiserver_host: String,

        /// Fleet service port (443 implies https)
        #[arg(long, env = "APISERVER_PORT")]
        apiserver_port: Option<u16>,
    },

    /// List compliance checks as JSON
    ListChecks {
        /// Token used with the compliance API
        #[arg(short = 't', long, env = "KOLIDE_API_TOKEN", hide_env_values = true)]
        kolide_api_token: Option<String>,
    },

    /// Verify that all compliance checks carry a severity tag
    ValidateChecks {
        /// Token used with the compliance API
        #[arg(short = 't', long, env = "KOLIDE_API_TOKEN", hide_env_values = true)]
        kolide_api_token: Option<String>,
    },
}

/// Reject missing or empty credentials before any network call.
fn require(value: Option<String>, option: &str) -> Result<String, Error> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config(format!("specify {option}")))
}

/// Build the compliance client from the token option.
fn compliance_client(token: Option<String>) -> Result<ComplianceClient> {
    let token = require(
        token,
        "a token for the compliance API using -t/--kolide-api-token",
    )?;
    ComplianceClient::new(ComplianceConfig::new(token))
        .context("failed to build compliance client")
}

async fn cmd_update_devices(
    kolide_api_token: Option<String>,
    ignore_checks: Vec<i64>,
    apiserver_username: String,
    apiserver_password: Option<String>,
    apiserver_host: String,
    apiserver_port: Option<u16>,
) -> Result<()> {
    let password = require(
        apiserver_password,
        "a password for the fleet service using -p/--apiserver-password",
    )?;

    let compliance = compliance_client(kolide_api_token)?;
    let fleet = FleetClient::new(FleetConfig::new(
        apiserver_host,
        apiserver_port,
        apiserver_username,
        password,
    ))
    .context("failed to build fleet client")?;

    let evaluator = HealthEvaluator::new(CriticalityPolicy::default(), ignore_checks);
    let engine = ReconciliationEngine::new(&fleet, &compliance, evaluator);
    engine.run(Utc::now()).await?;

    Ok(())
}

async fn cmd_list_checks(compliance: &dyn ComplianceApi) -> Result<()> {
    let checks = compliance.list_checks().await?;
    println!("{}", serde_json::to_string(&checks)?);

    Ok(())
}

async fn cmd_validate_checks(compliance: &dyn ComplianceApi) -> Result<()> {
    let mut checks = compliance.list_checks().await?;
    checks.sort_by_key(|check| check.id);

    let incomplete: Vec<_> = checks
        .iter()
        .filter(|check| !check.tags.iter().any(|tag| Criticality::is_severity_tag(tag)))
        .collect();

    if !incomplete.is_empty() {
        eprintln!("The following checks are missing a severity tag:");
        for check in &incomplete {
            eprintln!("{} (ID: {}): {}", check.name, check.id, check.description);
        }
        anyhow::bail!("{} check(s) are missing a severity tag", incomplete.len());
    }

    println!("All checks have been configured");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::UpdateDevices {
            kolide_api_token,
            ignore_checks,
            apiserver_username,
            apiserver_password,
            apiserver_host,
            apiserver_port,
        } => {
            cmd_update_devices(
                kolide_api_token,
                ignore_checks,
                apiserver_username,
                apiserver_password,
                apiserver_host,
                apiserver_port,
            )
            .await
        }
        Commands::ListChecks { kolide_api_token } => {
            let compliance = compliance_client(kolide_api_token)?;
            cmd_list_checks(&compliance).await
        }
        Commands::ValidateChecks { kolide_api_token } => {
            let compliance = compliance_client(kolide_api_token)?;
            cmd_validate_checks(&compliance).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    fleetpulse_core::init_tracing(cli.json, level);

    if let Err(err) = run(cli).await {
        // One structured line on stdout so the log pipeline picks the
        // failure up like any other event.
        println!(
            "{}",
            serde_json::json!({
                "component": "fleetpulse",
                "level": "error",
                "message": format!("{err:#}"),
                "timestamp": Utc::now().timestamp(),
            })
        );
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use fleetpulse_core::fakes::MemoryComplianceApi;
    use fleetpulse_core::ComplianceCheck;

    fn check(id: i64, tags: &[&str]) -> ComplianceCheck {
        ComplianceCheck {
            id,
            name: format!("check {id}"),
            description: String::new(),
            failing_device_count: 0,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn require_rejects_missing_and_empty_values() {
        assert!(require(None, "a token").is_err());
        assert!(require(Some(String::new()), "a token").is_err());
        assert_eq!(require(Some("t".into()), "a token").unwrap(), "t");
    }

    #[tokio::test]
    async fn validate_checks_flags_checks_without_severity_tag() {
        let compliance = MemoryComplianceApi::new(Vec::new()).with_checks(vec![
            check(1, &["CRITICAL", "macos"]),
            check(2, &["macos", "sharing"]),
        ]);

        let result = cmd_validate_checks(&compliance).await;
        let message = result.unwrap_err().to_string();
        assert!(message.contains("1 check(s)"));
    }

    #[tokio::test]
    async fn validate_checks_passes_when_all_checks_are_tagged() {
        let compliance = MemoryComplianceApi::new(Vec::new())
            .with_checks(vec![check(1, &["CRITICAL"]), check(2, &["info"])]);

        assert!(cmd_validate_checks(&compliance).await.is_ok());
    }

    #[test]
    fn ignore_checks_accepts_comma_separated_list() {
        let cli = Cli::try_parse_from([
            "fleetpulse",
            "update-devices",
            "-t",
            "token",
            "-p",
            "secret",
            "--ignore-checks",
            "1,2,3",
        ])
        .unwrap();

        match cli.command {
            Commands::UpdateDevices { ignore_checks, .. } => {
                assert_eq!(ignore_checks, vec![1, 2, 3]);
            }
            _ => panic!("expected update-devices"),
        }
    }
}
