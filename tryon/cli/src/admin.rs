//! Catalog maintenance commands
//!
//! Every command logs in first; rejected credentials stop before any change.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;
use tryon_core::{AdminBackend, AdminCredentials, MediaType, TryOnRecord, UploadSummary};

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Verify the admin credentials
    LoginCheck,

    /// Upload a PDF catalog; each page becomes an outfit
    UploadCatalog {
        /// PDF file
        #[arg(value_name = "PDF")]
        pdf: PathBuf,
    },

    /// Upload a single outfit image
    UploadOutfit {
        /// Display name of the outfit
        #[arg(short, long)]
        name: String,

        /// PNG, JPG or WEBP image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },

    /// Remove every outfit from the catalog
    Clear {
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },

    /// List stored try-on results
    Results,
}

pub async fn run<B: AdminBackend + ?Sized>(
    backend: &B,
    credentials: &AdminCredentials,
    command: AdminCommand,
) -> Result<()> {
    let accepted = backend
        .login(credentials)
        .await
        .context("Login request failed")?;
    if !accepted {
        bail!("Invalid admin credentials for '{}'", credentials.username);
    }
    info!(user = %credentials.username, "Admin login accepted");

    match command {
        AdminCommand::LoginCheck => println!("Credentials accepted"),

        AdminCommand::UploadCatalog { pdf } => {
            let bytes = tokio::fs::read(&pdf)
                .await
                .with_context(|| format!("Failed to read {}", pdf.display()))?;
            let summary = backend
                .upload_catalog(&file_name(&pdf), bytes)
                .await
                .context("Catalog upload failed")?;
            println!("{}", describe_upload(&summary));
        }

        AdminCommand::UploadOutfit { name, image } => {
            let Some(media_type) = MediaType::from_path(&image) else {
                bail!("{} is not a PNG, JPG or WEBP image", image.display());
            };
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let summary = backend
                .upload_outfit_image(&name, &file_name(&image), media_type.mime(), bytes)
                .await
                .context("Outfit upload failed")?;
            println!("{}", describe_upload(&summary));
        }

        AdminCommand::Clear { yes } => {
            if !yes {
                bail!("Refusing to clear the catalog without --yes");
            }
            backend
                .clear_catalog()
                .await
                .context("Clearing the catalog failed")?;
            println!("Catalog cleared");
        }

        AdminCommand::Results => {
            let records = backend
                .list_results()
                .await
                .context("Listing results failed")?;
            if records.is_empty() {
                println!("No try-ons yet");
            }
            for record in &records {
                println!("{}", describe_record(record));
            }
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned())
}

fn describe_upload(summary: &UploadSummary) -> String {
    match summary.outfits {
        Some(n) => format!("{} ({n} outfit(s))", summary.message),
        None => summary.message.clone(),
    }
}

fn describe_record(record: &TryOnRecord) -> String {
    format!(
        "{}  outfit={}  customer={}  shared={}  {}",
        record.id,
        record.outfit_id,
        record.customer_name.as_deref().unwrap_or("-"),
        if record.whatsapp_shared { "yes" } else { "no" },
        record.created_at.as_deref().unwrap_or(""),
    )
}
