//! CAdES Signer CLI
//!
//! Command-line front-end for CryptoPro CAdES-BES signing: provider
//! detection, certificate listing and file signing through the bridge host.

use cades_signer::{
    format_certificate_info, BridgeConfig, BridgeLocator, ConfigManager, ExecutionContext,
    ExportFormat, ProviderDetector, ProviderState, SignerConfiguration, SigningInput,
    SigningSession,
};
use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cades-signer")]
#[command(about = "CAdES-BES signing through the CryptoPro CAdESCOM plugin")]
#[command(long_about = "
CAdES Signer - detached and attached CAdES-BES signatures with CryptoPro

EXAMPLES:
    # Check that the plugin is reachable
    cades-signer --bridge-url http://127.0.0.1:8095 detect

    # List certificates with a private key, newest first
    cades-signer list

    # Sign a file with a detached signature
    cades-signer sign contract.pdf --fingerprint 0A1B2C... --detached

    # Embed the content even when default_detached is set
    cades-signer sign contract.pdf --fingerprint 0A1B2C... --attached

ENVIRONMENT VARIABLES:
    CADES_BRIDGE_URL    Bridge host endpoint
    CADES_PAGE_ORIGIN   Origin presented to the plugin
    RUST_LOG            Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Page origin presented to the plugin (overrides config)
    #[arg(long, global = true, env = "CADES_PAGE_ORIGIN")]
    origin: Option<String>,

    /// Bridge host endpoint (overrides config)
    #[arg(long, global = true, env = "CADES_BRIDGE_URL")]
    bridge_url: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the CryptoPro plugin is available
    Detect,

    /// List certificates usable for signing
    List {
        /// Show full certificate details
        #[arg(short, long)]
        detailed: bool,
    },

    /// Show details of one certificate
    Show {
        /// Certificate SHA-1 fingerprint
        fingerprint: String,
    },

    /// Sign a file with a CAdES-BES signature
    Sign {
        /// File to sign
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Fingerprint of the signing certificate
        #[arg(short, long)]
        fingerprint: String,

        /// Produce a detached signature (overrides `default_detached`)
        #[arg(short, long, overrides_with = "attached")]
        detached: bool,

        /// Embed the content in the signature (overrides `default_detached`)
        #[arg(short, long, overrides_with = "detached")]
        attached: bool,

        /// Output file path (defaults to `<input>.sig`)
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Export configuration
    Export {
        /// Export format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import configuration
    Import {
        /// Configuration file to import
        file: PathBuf,
        /// Import format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
    },
}

#[derive(ValueEnum, Clone)]
enum ExportFormatArg {
    Toml,
    Json,
    Yaml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new().into_diagnostic()?,
    };

    let command = match cli.command {
        Commands::Config(config_cmd) => {
            init_logging(cli.verbose);
            return handle_config_command(&config_manager, config_cmd);
        }
        command => command,
    };

    let mut config = config_manager
        .load_or_default()
        .into_diagnostic()
        .context("Failed to load configuration")?;
    if let Some(origin) = cli.origin {
        config.page_origin = origin;
    }
    if let Some(url) = cli.bridge_url {
        config.bridge_url = Some(url);
    }
    init_logging(cli.verbose || config.verbose);

    let detector = build_detector(&config)?;
    let mut session = SigningSession::new();

    match command {
        Commands::Detect => {
            let state = session.initialize(&detector).await;
            print_state(state);
            if !state.is_available() {
                std::process::exit(1);
            }
        }

        Commands::List { detailed } => {
            require_provider(&mut session, &detector).await;
            handle_list_command(&mut session, detailed).await?;
        }

        Commands::Show { fingerprint } => {
            require_provider(&mut session, &detector).await;
            session
                .refresh_certificates()
                .await
                .into_diagnostic()
                .context("Failed to list certificates")?;
            let certificate = session.certificate(&fingerprint);
            println!("{}", format_certificate_info(certificate));
            if certificate.is_none() {
                std::process::exit(1);
            }
        }

        Commands::Sign {
            input_file,
            fingerprint,
            detached,
            attached,
            output,
        } => {
            require_provider(&mut session, &detector).await;
            let detached = detached_choice(detached, attached).unwrap_or(config.default_detached);
            handle_sign_command(&mut session, &config, &input_file, fingerprint, detached, output)
                .await?;
        }

        // handled before the provider is needed
        Commands::Config(_) => {}
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn build_detector(config: &SignerConfiguration) -> Result<ProviderDetector> {
    let context = ExecutionContext::new(&config.page_origin)
        .into_diagnostic()
        .context("Invalid page origin")?;

    let bridge = config
        .bridge_url
        .as_ref()
        .map(|url| BridgeConfig::new(url).with_timeout(config.network_timeout_seconds));
    let locator = BridgeLocator::new(bridge)
        .into_diagnostic()?
        .with_loader_script(&config.loader_script);

    Ok(ProviderDetector::new(context, Arc::new(locator)))
}

/// The caller's explicit choice; `None` leaves it to the configuration.
fn detached_choice(detached: bool, attached: bool) -> Option<bool> {
    match (detached, attached) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

async fn require_provider(session: &mut SigningSession, detector: &ProviderDetector) {
    let state = session.initialize(detector).await;
    if !state.is_available() {
        print_state(state);
        std::process::exit(1);
    }
}

fn print_state(state: &ProviderState) {
    if state.is_available() {
        println!("✅ {}", state.message());
    } else {
        println!("❌ {}", state.message());
    }

    for detail in state.details() {
        println!("  {}: {}", detail.label, detail.value);
    }

    if !state.hints().is_empty() {
        println!("\n💡 What to try:");
        for hint in state.hints() {
            println!("  - {hint}");
        }
    }
}

async fn handle_list_command(session: &mut SigningSession, detailed: bool) -> Result<()> {
    let certificates = session
        .refresh_certificates()
        .await
        .into_diagnostic()
        .context("Failed to list certificates")?;

    if certificates.is_empty() {
        println!("📋 No certificates with a private key found");
        return Ok(());
    }

    println!("📋 Certificates ({}):", certificates.len());
    for certificate in certificates {
        println!("  {}  {}", certificate.fingerprint, certificate.selection_label());
        if detailed {
            for line in certificate.summary_lines().iter().skip(1) {
                println!("      {line}");
            }
        }
    }

    Ok(())
}

async fn handle_sign_command(
    session: &mut SigningSession,
    config: &SignerConfiguration,
    input_file: &Path,
    fingerprint: String,
    detached: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let input = SigningInput::from_file(input_file, fingerprint, detached)
        .await
        .into_diagnostic()?;

    let result = match session.sign(&input).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("❌ Signing failed: {e}");
            std::process::exit(1);
        }
    };

    let saved = match output {
        Some(path) => {
            tokio::fs::write(&path, result.signature.as_bytes())
                .await
                .into_diagnostic()
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path
        }
        None => {
            let directory = config
                .output_directory
                .clone()
                .or_else(|| input_file.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."));
            result
                .save_in(&directory)
                .await
                .into_diagnostic()
                .context("Failed to save signature")?
        }
    };

    println!("✅ File signed successfully!");
    println!(
        "  Signature: {}",
        if result.detached { "detached" } else { "attached" }
    );
    println!("  Saved to: {}", saved.display());
    Ok(())
}

fn handle_config_command(config_manager: &ConfigManager, config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show => {
            if !config_manager.config_path().exists() {
                println!("📋 No configuration file found. Use 'config init' to create one.");
                return Ok(());
            }

            let config = config_manager
                .load()
                .into_diagnostic()
                .context("Failed to load configuration")?;
            println!("📋 Current Configuration:");
            println!("  Page origin: {}", config.page_origin);
            println!(
                "  Bridge URL: {}",
                config.bridge_url.as_deref().unwrap_or("(not set)")
            );
            println!("  Loader script: {}", config.loader_script);
            println!("  Network timeout: {}s", config.network_timeout_seconds);
            println!("  Detached by default: {}", config.default_detached);
            if let Some(dir) = &config.output_directory {
                println!("  Output directory: {}", dir.display());
            }
            println!("  Verbose: {}", config.verbose);
            println!(
                "  Configuration file: {}",
                config_manager.config_path().display()
            );
        }

        ConfigCommands::Init => {
            config_manager.load_or_create_default().into_diagnostic()?;
            println!(
                "✅ Configuration initialized: {}",
                config_manager.config_path().display()
            );
            println!("   Edit the file to customize settings, or use 'config set' commands.");
        }

        ConfigCommands::Set { key, value } => {
            config_manager
                .update_value(&key, &value)
                .into_diagnostic()?;
            println!("✅ Configuration updated: {key} = {value}");
        }

        ConfigCommands::Export { format, output } => {
            let content = config_manager
                .export_config(format.into())
                .into_diagnostic()?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, content).into_diagnostic()?;
                println!("✅ Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }

        ConfigCommands::Import { file, format } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            config_manager
                .import_config(&content, format.into())
                .into_diagnostic()?;
            println!("✅ Configuration imported from: {}", file.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_flags(args: &[&str]) -> (bool, bool) {
        let mut argv = vec!["cades-signer", "sign", "doc.pdf", "-f", "AABBCC"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Sign {
                detached, attached, ..
            } => (detached, attached),
            _ => panic!("expected sign command"),
        }
    }

    #[test]
    fn test_detached_choice() {
        assert_eq!(detached_choice(false, false), None);
        assert_eq!(detached_choice(true, false), Some(true));
        assert_eq!(detached_choice(false, true), Some(false));
    }

    #[test]
    fn test_last_signature_flag_wins() {
        assert_eq!(sign_flags(&[]), (false, false));
        assert_eq!(sign_flags(&["--detached", "--attached"]), (false, true));
        assert_eq!(sign_flags(&["--attached", "--detached"]), (true, false));
    }
}
