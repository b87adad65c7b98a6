//! Try-On CLI - Headless Surface for the Virtual Try-On Workflow
//!
//! Drives the same controller a storefront page would, from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog
//! tryon catalog
//!
//! # Dress the dog in outfit #3 and save the result
//! tryon try-on --outfit 3 --photo dog.png --export
//!
//! # Use a local folder of outfit images instead of the backend catalog
//! tryon --catalog-dir ./outfits try-on --outfit 2 --photo dog.jpg --share
//!
//! # Share or download a stored result
//! tryon share 6f1c...
//! tryon download 6f1c... --output ./pictures
//!
//! # Catalog maintenance
//! TRYON_ADMIN_PASSWORD=... tryon admin --username admin upload-catalog spring.pdf
//!
//! # Verbose logging
//! RUST_LOG=debug tryon catalog
//! ```

mod admin;
mod surface;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tryon_core::{
    default_config_path, load_config_from_path, AdminCredentials, CatalogSource,
    CatalogSourceKind, CatalogState, ConfigOverrides, ControllerConfig, ControllerMessage,
    HttpBackend, RawFile, RemoteCatalog, StaticCatalog, SurfaceEvent, TryOnBackend, TryOnConfig,
    TryOnController, TryOnId,
};

use admin::AdminCommand;
use surface::Printer;

/// Try-On CLI - dress a pet photo in a catalog outfit
#[derive(Parser, Debug)]
#[command(name = "tryon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (defaults to the user config folder)
    #[arg(short = 'c', long, env = "TRYON_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config and TRYON_BACKEND_URL)
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    request_timeout: Option<u64>,

    /// Read outfits from a local folder instead of the backend
    #[arg(long, value_name = "DIR")]
    catalog_dir: Option<PathBuf>,

    /// Interval between progress lines, in milliseconds
    #[arg(long, value_name = "MS")]
    progress_interval: Option<u64>,

    /// Default folder for exported images
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Print controller messages as JSON lines
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "TRYON_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the outfits available for try-on
    Catalog,

    /// Run one try-on from outfit choice to result
    TryOn(TryOnArgs),

    /// Create a share link for a stored result
    Share {
        /// Result identifier printed by `try-on`
        #[arg(value_name = "RESULT_ID")]
        result_id: String,
    },

    /// Download a stored result image
    Download {
        /// Result identifier printed by `try-on`
        #[arg(value_name = "RESULT_ID")]
        result_id: String,

        /// Folder to write into (defaults to the export folder)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Check whether the backend is reachable
    Health,

    /// Catalog maintenance (requires admin credentials)
    Admin {
        /// Admin user name
        #[arg(short, long, env = "TRYON_ADMIN_USER")]
        username: String,

        /// Admin password
        #[arg(short, long, env = "TRYON_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(clap::Args, Debug)]
struct TryOnArgs {
    /// Outfit number (`3` or `#3`) or outfit id
    #[arg(short, long, value_name = "OUTFIT")]
    outfit: String,

    /// Pet photo; only the first file is used
    #[arg(short, long, value_name = "FILE", required = true, num_args = 1..)]
    photo: Vec<PathBuf>,

    /// Customer name stored with the result
    #[arg(short, long)]
    name: Option<String>,

    /// Save the result image (optionally into DIR)
    #[arg(short, long, value_name = "DIR", num_args = 0..=1)]
    export: Option<Option<PathBuf>>,

    /// Print a share link for the result
    #[arg(short, long)]
    share: bool,
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so stdout stays clean for results.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("tryon={level},tryon_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(args: &Args) -> Result<TryOnConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config =
        load_config_from_path(path.as_deref()).context("Failed to load configuration")?;

    let overrides = ConfigOverrides {
        backend_url: args.backend_url.clone(),
        request_timeout_secs: args.request_timeout,
        catalog_dir: args.catalog_dir.clone(),
        progress_interval_ms: args.progress_interval,
        export_dir: args.export_dir.clone(),
    };
    overrides
        .apply(&mut config)
        .context("Invalid command-line option")?;

    debug!(
        source = ?config.source(),
        backend = %config.backend.base_url,
        catalog = ?config.catalog.kind,
        "Configuration resolved"
    );
    Ok(config)
}

fn catalog_source(config: &TryOnConfig, backend: &Arc<HttpBackend>) -> Box<dyn CatalogSource> {
    match (config.catalog.kind, config.catalog.static_dir.as_ref()) {
        (CatalogSourceKind::Static, Some(dir)) => Box::new(StaticCatalog::new(dir.clone())),
        _ => Box::new(RemoteCatalog::new(Arc::clone(backend))),
    }
}

async fn list_catalog(
    config: &TryOnConfig,
    backend: &Arc<HttpBackend>,
    printer: Printer,
) -> Result<()> {
    let source = catalog_source(config, backend);
    info!(source = %source.describe(), "Loading catalog");
    let state = CatalogState::from_result(source.load_catalog().await);
    let failure = match &state {
        CatalogState::Failed(reason) => Some(reason.clone()),
        _ => None,
    };
    printer.print(&ControllerMessage::Catalog { state });
    if let Some(reason) = failure {
        bail!("Catalog unavailable: {reason}");
    }
    Ok(())
}

async fn run_try_on(
    config: &TryOnConfig,
    backend: Arc<HttpBackend>,
    printer: Printer,
    opts: TryOnArgs,
) -> Result<()> {
    let catalog = catalog_source(config, &backend);
    let (tx, mut rx) = mpsc::channel(100);
    let printer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            printer.print(&msg);
        }
    });

    let mut controller =
        TryOnController::new(backend, catalog, ControllerConfig::from_config(config), tx);
    let outcome = drive_try_on(&mut controller, opts).await;

    if !controller.quit_requested() {
        controller.shutdown().await;
    }
    drop(controller);
    if let Err(e) = printer_task.await {
        warn!(error = %e, "Printer task ended abnormally");
    }
    outcome
}

async fn drive_try_on<C: CatalogSource>(
    controller: &mut TryOnController<HttpBackend, C>,
    opts: TryOnArgs,
) -> Result<()> {
    controller.start().await;
    controller.handle_event(SurfaceEvent::connected()).await?;

    if opts.name.is_some() {
        controller
            .handle_event(SurfaceEvent::customer_name(opts.name))
            .await?;
    }
    controller
        .handle_event(SurfaceEvent::outfit_chosen(surface::parse_selector(
            &opts.outfit,
        )))
        .await?;

    let mut files = Vec::with_capacity(opts.photo.len());
    for path in &opts.photo {
        let file = RawFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }
    controller
        .handle_event(SurfaceEvent::photo_submitted(files))
        .await?;

    let result_id: TryOnId = tokio::select! {
        outcome = controller.wait_generation() => match outcome {
            Some(result) => result?,
            None => bail!("No generation was started"),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted while generating");
            bail!("Interrupted");
        }
    };
    info!(result_id = %result_id, "Try-on finished");

    if let Some(directory) = opts.export {
        controller
            .handle_event(SurfaceEvent::export(directory))
            .await?;
    }
    if opts.share {
        controller.handle_event(SurfaceEvent::share()).await?;
    }
    controller.handle_event(SurfaceEvent::quit()).await?;
    Ok(())
}

async fn share_result(backend: &HttpBackend, printer: Printer, result_id: String) -> Result<()> {
    let link = backend
        .share_link(&TryOnId(result_id))
        .await
        .context("Could not create a share link")?;
    printer.print(&ControllerMessage::ShareLink {
        url: link.url,
        message: link.message,
    });
    Ok(())
}

/// File name for a downloaded result, kept inside the target folder
fn download_file_name(result_id: &str) -> Result<String> {
    if !result_id.chars().any(|c| c.is_ascii_alphanumeric()) {
        bail!("'{result_id}' is not a valid result id");
    }
    let stem: String = result_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    Ok(format!("pet-tryon-{stem}.png"))
}

async fn download_result(
    backend: &HttpBackend,
    printer: Printer,
    result_id: String,
    directory: PathBuf,
) -> Result<()> {
    let file_name = download_file_name(&result_id)?;
    let id = TryOnId(result_id);
    let encoded = backend
        .result_image(&id)
        .await
        .context("Could not fetch the result image")?;
    let bytes = tryon_core::capture::decode_base64(&encoded)
        .context("The backend sent an unreadable image")?;

    tokio::fs::create_dir_all(&directory)
        .await
        .with_context(|| format!("Failed to create {}", directory.display()))?;
    let path = directory.join(file_name);
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(result_id = %id, bytes = bytes.len(), "Result downloaded");
    printer.print(&ControllerMessage::Exported { path });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    debug!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = resolve_config(&args)?;
    let backend = Arc::new(
        HttpBackend::from_settings(&config.backend).context("Failed to build the HTTP client")?,
    );
    let printer = Printer::new(args.json);

    match args.command {
        Command::Catalog => list_catalog(&config, &backend, printer).await,
        Command::TryOn(opts) => run_try_on(&config, backend, printer, opts).await,
        Command::Share { result_id } => share_result(&backend, printer, result_id).await,
        Command::Download { result_id, output } => {
            let directory = output.unwrap_or_else(|| config.session.export_dir.clone());
            download_result(&backend, printer, result_id, directory).await
        }
        Command::Health => {
            let reachable = backend.health_check().await;
            printer.print_health(backend.base_url(), reachable);
            if !reachable {
                bail!("{} is not reachable", backend.base_url());
            }
            Ok(())
        }
        Command::Admin {
            username,
            password,
            command,
        } => {
            let credentials = AdminCredentials { username, password };
            admin::run(backend.as_ref(), &credentials, command).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_try_on_args() {
        let args = Args::try_parse_from([
            "tryon",
            "--backend-url",
            "http://localhost:9000",
            "try-on",
            "--outfit",
            "#3",
            "--photo",
            "dog.png",
            "cat.png",
            "--export",
        ])
        .unwrap();
        assert_eq!(args.backend_url.as_deref(), Some("http://localhost:9000"));
        let Command::TryOn(opts) = args.command else {
            panic!("expected try-on");
        };
        assert_eq!(opts.outfit, "#3");
        assert_eq!(opts.photo.len(), 2);
        assert_eq!(opts.export, Some(None));
        assert!(!opts.share);
    }

    #[test]
    fn test_try_on_requires_photo() {
        assert!(Args::try_parse_from(["tryon", "try-on", "--outfit", "1"]).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_config_read_from_user_config_folder() {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join("pet-tryon");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("tryon.toml"),
            "[backend]\nbase_url = \"http://from-file:9\"\n",
        )
        .unwrap();

        std::env::remove_var("TRYON_CONFIG");
        std::env::remove_var("TRYON_BACKEND_URL");
        std::env::set_var("XDG_CONFIG_HOME", home.path());

        let args = Args::try_parse_from(["tryon", "health"]).unwrap();
        assert!(args.config.is_none());
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.backend.base_url, "http://from-file:9");

        let args =
            Args::try_parse_from(["tryon", "--backend-url", "http://flag:1", "health"]).unwrap();
        assert_eq!(resolve_config(&args).unwrap().backend.base_url, "http://flag:1");
    }

    #[test]
    fn test_download_file_name_stays_in_folder() {
        assert_eq!(download_file_name("6f1c-ab_9").unwrap(), "pet-tryon-6f1c-ab_9.png");
        assert_eq!(download_file_name("../../etc/x").unwrap(), "pet-tryon-______etc_x.png");
        assert!(download_file_name("..").is_err());
        assert!(download_file_name("").is_err());

        let folder = std::path::Path::new("/tmp/results");
        let path = folder.join(download_file_name("a/../../b").unwrap());
        assert_eq!(path.parent(), Some(folder));
    }
}
