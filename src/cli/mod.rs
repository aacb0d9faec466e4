//! # Command Line Interface
//!
//! Issues identities through the configured signer and inspects or maintains
//! certificate records in the configured store.

pub mod output;

use crate::config::{AppConfig, CertStoreKind};
use crate::domain::X509CertRecord;
use crate::observability::{init_observability, log_config_info};
use crate::services::InstanceManager;
use crate::signer::HttpCertSigner;
use crate::storage::build_cert_store;
use crate::utils::{resolve_instance_id, InstanceCertificate};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "zts-instance")]
#[command(about = "Instance identity issuance and certificate record tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Certificate store override (none, memory, sql)
    #[arg(long, global = true)]
    pub cert_store: Option<CertStoreKind>,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Certificate signer base URL override
    #[arg(long, global = true)]
    pub signer_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign a CSR and print the resulting identity
    Issue {
        /// Path to the PEM-encoded certificate signing request
        #[arg(long)]
        csr: PathBuf,

        /// Identity name, usually the service's canonical name
        #[arg(long)]
        name: String,

        /// Request attribute as key=value (repeatable)
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,
    },

    /// Certificate record commands
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// Show the record for an instance
    Get {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        instance_id: String,
    },

    /// Show the record for the instance named in a certificate
    GetByCert {
        #[arg(long)]
        provider: String,
        /// Path to the PEM-encoded instance certificate
        #[arg(long)]
        cert: PathBuf,
    },

    /// Create a record from a freshly issued certificate
    Register {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        service: String,
        #[arg(long)]
        cert: PathBuf,
        /// Address the certificate was requested from
        #[arg(long)]
        ip: String,
        #[arg(long)]
        hostname: Option<String>,
        /// Mark as a client-only certificate
        #[arg(long)]
        client_cert: bool,
    },

    /// Record a renewal: the stored certificate becomes the previous one
    Renew {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        cert: PathBuf,
        #[arg(long)]
        ip: String,
    },

    /// Delete the record for an instance
    Delete {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        instance_id: String,
    },
}

/// Run CLI commands
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv();

    let mut config = AppConfig::from_env()?;
    if let Some(kind) = cli.cert_store {
        config.cert_store.kind = kind;
    }
    if let Some(url) = cli.database_url {
        config.cert_store.url = url;
    }
    if let Some(url) = cli.signer_url {
        config.signer.url = Some(url);
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    config.validate()?;

    init_observability(&config.observability)?;
    tracing::info!(app_name = crate::APP_NAME, version = crate::VERSION, "Starting zts-instance");
    log_config_info(&config);

    let manager = InstanceManager::new(build_cert_store(&config.cert_store).await?);

    match cli.command {
        Commands::Issue { csr, name, attributes } => {
            handle_issue(&manager, &config, &csr, &name, attributes.into_iter().collect()).await
        }
        Commands::Record { command } => handle_record_command(&manager, command).await,
    }
}

fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }
}

async fn handle_issue(
    manager: &InstanceManager,
    config: &AppConfig,
    csr_path: &Path,
    name: &str,
    attributes: BTreeMap<String, String>,
) -> Result<()> {
    let signer = HttpCertSigner::from_config(&config.signer)?
        .context("No certificate signer configured (set ZTS_SIGNER_URL or --signer-url)")?;
    let csr = read_file(csr_path).await?;

    match manager.generate_identity(&signer, &csr, name, Some(&attributes)).await? {
        Some(identity) => output::print_json(&identity),
        None => anyhow::bail!("Certificate signer declined to issue a certificate for '{}'", name),
    }
}

async fn handle_record_command(manager: &InstanceManager, command: RecordCommands) -> Result<()> {
    match command {
        RecordCommands::Get { provider, instance_id } => {
            let outcome = manager.get_x509_cert_record(&provider, &instance_id).await?;
            output::print_record_outcome(outcome)
        }

        RecordCommands::GetByCert { provider, cert } => {
            let certificate = read_certificate(&cert).await?;
            let outcome =
                manager.get_x509_cert_record_for_certificate(&provider, &certificate).await?;
            output::print_record_outcome(outcome)
        }

        RecordCommands::Register { provider, service, cert, ip, hostname, client_cert } => {
            let certificate = read_certificate(&cert).await?;
            let instance_id = require_instance_id(&certificate)?;

            let mut record = X509CertRecord::new(
                &provider,
                &instance_id,
                service,
                certificate.serial_number(),
                ip,
                chrono::Utc::now(),
            );
            record.client_cert = client_cert;
            record.expiry_time = Some(certificate.not_after());
            record.hostname = hostname;

            let outcome = manager.insert_x509_cert_record(&record).await?;
            output::print_mutation_outcome("register", &provider, &instance_id, outcome)
        }

        RecordCommands::Renew { provider, cert, ip } => {
            let certificate = read_certificate(&cert).await?;
            let instance_id = require_instance_id(&certificate)?;

            let Some(mut record) =
                manager.get_x509_cert_record(&provider, &instance_id).await?.into_record()
            else {
                anyhow::bail!("No certificate record for {}/{}", provider, instance_id);
            };

            record.rotate(certificate.serial_number(), ip, chrono::Utc::now());
            record.expiry_time = Some(certificate.not_after());

            let outcome = manager.update_x509_cert_record(&record).await?;
            output::print_mutation_outcome("renew", &provider, &instance_id, outcome)
        }

        RecordCommands::Delete { provider, instance_id } => {
            let outcome = manager.delete_x509_cert_record(&provider, &instance_id).await?;
            output::print_mutation_outcome("delete", &provider, &instance_id, outcome)
        }
    }
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn read_certificate(path: &Path) -> Result<InstanceCertificate> {
    let pem = read_file(path).await?;
    InstanceCertificate::from_pem(&pem)
        .with_context(|| format!("Failed to parse certificate {}", path.display()))
}

fn require_instance_id(certificate: &InstanceCertificate) -> Result<String> {
    resolve_instance_id(certificate).with_context(|| {
        format!("Certificate '{}' carries no instance id", certificate.subject())
    })
}

fn parse_attribute(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}
