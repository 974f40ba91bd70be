//! Sealbox CLI - Command line interface for hybrid file encryption.
//!
//! This tool generates RSA key pairs, seals and opens files as JSON
//! envelopes, and stores sealed files in a local blob directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use sealbox_crypto::{
    EncryptedEnvelope, HybridEnvelope, KeyPair, OpenOptions, OsRandom, PrivateKey, PublicKey,
};
use sealbox_storage::StoreConfig;
use sealbox_vault::{FileRecord, FileVault, VaultConfig};

const PUBLIC_KEY_FILE: &str = "public.key";
const PRIVATE_KEY_FILE: &str = "private.key";

#[derive(Parser)]
#[command(name = "sealbox")]
#[command(about = "Sealbox - Hybrid RSA/AES file encryption")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new RSA-2048 key pair.
    Keygen {
        /// Directory to write public.key and private.key into.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Seal a file for a recipient.
    Seal {
        /// Recipient public key file.
        #[arg(short = 'k', long)]
        public_key: PathBuf,

        /// File to seal.
        #[arg(short, long)]
        input: PathBuf,

        /// Envelope JSON to write.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Open a sealed envelope.
    Open {
        /// Recipient private key file.
        #[arg(short = 'k', long)]
        private_key: PathBuf,

        /// Envelope JSON to read.
        #[arg(short, long)]
        input: PathBuf,

        /// Plaintext file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// Fail if the stored IV differs from the wrapped IV.
        #[arg(long)]
        strict_iv: bool,
    },

    /// Show envelope sizes and metadata without opening it.
    Inspect {
        /// Envelope JSON to read.
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Store a file in a local blob directory.
    Put {
        /// Blob directory.
        #[arg(short, long)]
        store: PathBuf,

        /// File to store.
        #[arg(short, long)]
        input: PathBuf,

        /// Seal for this public key before storing.
        #[arg(short = 'k', long)]
        public_key: Option<PathBuf>,

        /// File record JSON to write.
        #[arg(short, long)]
        record: PathBuf,

        /// Owner recorded with the file.
        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// Retrieve a stored file.
    Get {
        /// Blob directory.
        #[arg(short, long)]
        store: PathBuf,

        /// File record JSON written by `put`.
        #[arg(short, long)]
        record: PathBuf,

        /// Private key for sealed files.
        #[arg(short = 'k', long)]
        private_key: Option<PathBuf>,

        /// Plaintext file to write.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Delete a stored file.
    Remove {
        /// Blob directory.
        #[arg(short, long)]
        store: PathBuf,

        /// File record JSON written by `put`.
        #[arg(short, long)]
        record: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Keygen { out } => cmd_keygen(&out),

        Commands::Seal {
            public_key,
            input,
            output,
        } => cmd_seal(&public_key, &input, &output),

        Commands::Open {
            private_key,
            input,
            output,
            strict_iv,
        } => cmd_open(&private_key, &input, &output, strict_iv),

        Commands::Inspect { input } => cmd_inspect(&input),

        Commands::Put {
            store,
            input,
            public_key,
            record,
            owner,
        } => cmd_put(&store, &input, public_key.as_deref(), &record, &owner).await,

        Commands::Get {
            store,
            record,
            private_key,
            output,
        } => cmd_get(&store, &record, private_key.as_deref(), &output).await,

        Commands::Remove { store, record } => cmd_remove(&store, &record).await,
    }
}

fn read_public_key(path: &Path) -> Result<PublicKey> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read public key {}", path.display()))?;
    PublicKey::import_base64(text.trim()).context("Invalid public key")
}

fn read_private_key(path: &Path) -> Result<PrivateKey> {
    let text = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read private key {}", path.display()))?,
    );
    PrivateKey::import_base64(text.trim()).context("Invalid private key")
}

fn read_envelope(path: &Path) -> Result<EncryptedEnvelope> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read envelope {}", path.display()))?;
    EncryptedEnvelope::from_json(&json).context("Invalid envelope")
}

fn read_record(path: &Path) -> Result<FileRecord> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read record {}", path.display()))?;
    serde_json::from_str(&json).context("Invalid file record")
}

fn open_vault(store: &Path) -> Result<FileVault> {
    let config = VaultConfig {
        store: StoreConfig::Local {
            root: store.to_path_buf(),
        },
        ..VaultConfig::default()
    };
    FileVault::from_config(config).context("Failed to open blob store")
}

/// Write a private key readable only by the owner where the platform
/// supports it.
fn write_private(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Generate a key pair.
fn cmd_keygen(out: &Path) -> Result<()> {
    info!("Generating RSA-2048 key pair");

    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;

    let keys = KeyPair::generate(&OsRandom).context("Key generation failed")?;
    let public = keys.public().export_base64()?;
    let private = keys.private().export_base64()?;

    let public_path = out.join(PUBLIC_KEY_FILE);
    let private_path = out.join(PRIVATE_KEY_FILE);
    std::fs::write(&public_path, public.as_bytes())
        .with_context(|| format!("Failed to write {}", public_path.display()))?;
    write_private(&private_path, &private)
        .with_context(|| format!("Failed to write {}", private_path.display()))?;

    println!("Key pair generated!");
    println!("  Public key: {}", public_path.display());
    println!("  Private key: {}", private_path.display());

    Ok(())
}

/// Seal a file into an envelope.
fn cmd_seal(public_key: &Path, input: &Path, output: &Path) -> Result<()> {
    info!("Sealing {}", input.display());

    let recipient = read_public_key(public_key)?;
    let plaintext = Zeroizing::new(
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?,
    );

    let envelope = sealbox_crypto::seal_file(&plaintext, &recipient).context("Sealing failed")?;
    std::fs::write(output, envelope.to_json()?)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Sealed {} bytes to {}", plaintext.len(), output.display());

    Ok(())
}

/// Open an envelope.
fn cmd_open(private_key: &Path, input: &Path, output: &Path, strict_iv: bool) -> Result<()> {
    info!("Opening {}", input.display());

    let recipient = read_private_key(private_key)?;
    let envelope = read_envelope(input)?;

    let opener = HybridEnvelope::default().with_options(OpenOptions { strict_iv });
    let plaintext = Zeroizing::new(
        opener
            .open_file(&envelope, &recipient)
            .context("Failed to open envelope")?,
    );

    std::fs::write(output, plaintext.as_slice())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Opened {} bytes to {}", plaintext.len(), output.display());

    Ok(())
}

/// Show envelope information.
fn cmd_inspect(input: &Path) -> Result<()> {
    let envelope = read_envelope(input)?;
    let metadata = envelope.metadata();

    println!("Envelope Information:");
    println!("  Payload: {} bytes", envelope.encrypted_payload.len());
    println!("  Wrapped key: {} bytes", envelope.encrypted_key_bundle.len());
    println!("  Wrapped key (base64): {}", metadata.encrypted_aes_key);
    println!("  IV (base64): {}", metadata.iv);

    Ok(())
}

/// Store a file.
async fn cmd_put(
    store: &Path,
    input: &Path,
    public_key: Option<&Path>,
    record: &Path,
    owner: &str,
) -> Result<()> {
    info!("Storing {}", input.display());

    let vault = open_vault(store)?;
    let recipient = public_key.map(read_public_key).transpose()?;
    let content =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let file = vault
        .upload(owner, &filename, content, recipient.as_ref())
        .await
        .context("Failed to store file")?;

    std::fs::write(record, serde_json::to_string_pretty(&file)?)
        .with_context(|| format!("Failed to write {}", record.display()))?;

    println!("File stored!");
    println!("  ID: {}", file.id);
    println!("  Blob: {}", file.blob);
    println!("  Size: {} bytes", file.size);
    println!("  Encrypted: {}", file.is_encrypted());

    Ok(())
}

/// Retrieve a file.
async fn cmd_get(
    store: &Path,
    record: &Path,
    private_key: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let vault = open_vault(store)?;
    let file = read_record(record)?;
    info!("Retrieving {}", file.filename);

    let recipient = private_key.map(read_private_key).transpose()?;
    let content = Zeroizing::new(
        vault
            .download(&file, recipient.as_ref())
            .await
            .context("Failed to retrieve file")?,
    );

    std::fs::write(output, content.as_slice())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Retrieved {} ({}, {} bytes) to {}",
        file.filename,
        file.mime_type(),
        content.len(),
        output.display()
    );

    Ok(())
}

/// Delete a stored file.
async fn cmd_remove(store: &Path, record: &Path) -> Result<()> {
    let vault = open_vault(store)?;
    let file = read_record(record)?;

    match vault.delete(&file).await.context("Failed to delete file")? {
        sealbox_vault::DeleteOutcome::Deleted => println!("Deleted {}", file.filename),
        sealbox_vault::DeleteOutcome::AlreadyGone => {
            println!("{} was already deleted", file.filename)
        }
    }

    Ok(())
}
