use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use irisgate::{
    config, EnrollmentService, Extractor, FileStore, Identity, MatchPolicy, OnnxEmbedder,
    Preprocessor, TemplateStore, UpstreamError, Verification, VerificationService,
};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "irisgate")]
#[command(version, about = "Iris enrollment and verification")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll an iris image for an identity, replacing any previous template
    Enroll {
        /// Identity (account or wallet address) to enroll
        #[arg(short, long)]
        user: String,
        /// Iris image file
        image: PathBuf,
    },
    /// Verify an iris image against the enrolled template
    Verify {
        /// Identity (account or wallet address) to verify
        #[arg(short, long)]
        user: String,
        /// Iris image file
        image: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the enrolled template for an identity
    Purge {
        /// Identity to purge
        #[arg(short, long)]
        user: String,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Enroll { user, image } => enroll(&cfg, &user, &image),
        Commands::Verify { user, image, json } => verify(&cfg, &user, &image, json),
        Commands::Purge { user } => purge(&cfg, &user),
        Commands::Config => open_config(&cfg, cli.config.as_deref()),
    }
}

/// The model is loaded on first use, so lookups that end before an image
/// is processed never touch it.
fn extractor(cfg: &config::Config) -> Extractor {
    let preprocessor = Preprocessor::from(&cfg.preprocess);
    let embedder = OnnxEmbedder::new(&cfg.model_path);
    Extractor::new(Arc::new(preprocessor), Arc::new(embedder))
}

fn store(cfg: &config::Config) -> Result<Arc<FileStore>> {
    let store = FileStore::open(&cfg.store_dir).context("Failed to open template store")?;
    Ok(Arc::new(store))
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading image {}", path.display()))
}

fn enroll(cfg: &config::Config, user: &str, image: &Path) -> Result<()> {
    info!("Enrolling identity: {}", user);

    let raw = read_image(image)?;
    let service = EnrollmentService::new(extractor(cfg), store(cfg)?)
        .with_identity_case(cfg.identity_case)
        .with_reenrollment(cfg.reenrollment);

    let enrolled = service.enroll(user, &raw).context("Enrollment failed")?;
    if enrolled.replaced {
        warn!("Previous template for {} was replaced", enrolled.identity);
    }

    info!("✓ Iris enrolled successfully for: {}", enrolled.identity);
    Ok(())
}

fn verify(cfg: &config::Config, user: &str, image: &Path, json: bool) -> Result<()> {
    info!("Verifying identity: {}", user);

    let service = VerificationService::new(
        extractor(cfg),
        store(cfg)?,
        MatchPolicy::new(cfg.threshold),
    )
    .with_identity_case(cfg.identity_case);

    let outcome = service
        .verify_with(user, || {
            read_image(image).map_err(UpstreamError::UnreadableImage)
        })
        .context("Verification failed")?;

    match outcome {
        Verification::Decided(result) => {
            if json {
                let out = serde_json::json!({
                    "verified": result.matched,
                    "similarity": result.similarity,
                });
                println!("{}", out);
            }
            info!(
                "Similarity: {:.4} (threshold: {:.4})",
                result.similarity, cfg.threshold
            );
            if !result.matched {
                anyhow::bail!("Verification failed: iris does not match");
            }
            info!("✓ Verification successful!");
            Ok(())
        }
        Verification::NotEnrolled(identity) => {
            if json {
                let out = serde_json::json!({
                    "verified": false,
                    "error": "not enrolled",
                });
                println!("{}", out);
            }
            anyhow::bail!(
                "No enrolled template found for: {}. Run 'enroll' first.",
                identity
            )
        }
    }
}

fn purge(cfg: &config::Config, user: &str) -> Result<()> {
    let identity = Identity::parse(user, cfg.identity_case)?;
    info!("Purging enrolled template for: {}", identity);

    let removed = store(cfg)?
        .remove(&identity)
        .context("Failed to purge template")?;

    if removed {
        info!("✓ Template purged for: {}", identity);
    } else {
        warn!("No template was enrolled for: {}", identity);
    }
    Ok(())
}

fn open_config(cfg: &config::Config, path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(&config::CONFIG_PATH);
    if !config_path.exists() {
        config::save_config(cfg, Some(config_path)).context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
