//! dropfs command-line client.
//!
//! Usage:
//!   export DROPFS_URL='dropbox://?access_token=...'
//!   dropfs ls /
//!   dropfs stat /Photos/cat.jpg
//!   dropfs cat /notes.txt > notes.txt
//!   dropfs put /notes.txt < notes.txt
//!   dropfs mkdir /Archive/2024 --recreate
//!   dropfs rm /old.txt
//!   dropfs rmdir /Archive/2023
//!
//! Logs go to stderr; set `RUST_LOG=dropfs=debug` to see remote calls.

use std::io::{Read, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use dropfs::{Config, EntryInfo, Filesystem};

/// Browse and edit a Dropbox account as a filesystem.
#[derive(Parser, Debug)]
#[command(name = "dropfs", version)]
struct Args {
    /// Account locator: dropbox://[label]/[subtree]?access_token=... or
    /// dropbox://[label]/[subtree]?refresh_token=...&app_key=...
    #[arg(long, env = "DROPFS_URL", hide_env_values = true)]
    url: String,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Show kind, size and modification time
        #[arg(short, long)]
        long: bool,
    },
    /// Show metadata for a path
    Stat { path: String },
    /// Write a file's content to stdout
    Cat { path: String },
    /// Replace a file's content with stdin
    Put {
        path: String,
        /// Fail if the file already exists
        #[arg(long)]
        exclusive: bool,
    },
    /// Create a directory
    Mkdir {
        path: String,
        /// Succeed if the directory already exists
        #[arg(long)]
        recreate: bool,
    },
    /// Remove a file
    Rm { path: String },
    /// Remove an empty directory
    Rmdir { path: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dropfs: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading config")?;

    let fs = dropfs::open_fs(&args.url, &config)
        .await
        .context("opening filesystem")?;

    match args.command {
        Command::Ls { path, long } => ls(&fs, &path, long).await,
        Command::Stat { path } => {
            let info = fs.getinfo(&path).await.with_context(|| format!("stat {path}"))?;
            print_stat(&info);
            Ok(())
        }
        Command::Cat { path } => {
            let data = fs.readbytes(&path).await.with_context(|| format!("reading {path}"))?;
            std::io::stdout().lock().write_all(&data)?;
            Ok(())
        }
        Command::Put { path, exclusive } => {
            let mut data = Vec::new();
            std::io::stdin().lock().read_to_end(&mut data)?;
            let mode = if exclusive { "xb" } else { "wb" };
            let mut file = fs.openbin(&path, mode).await.with_context(|| format!("opening {path}"))?;
            file.write(&data)?;
            file.close().await.with_context(|| format!("uploading {path}"))?;
            tracing::info!(path = %path, bytes = data.len(), "uploaded");
            Ok(())
        }
        Command::Mkdir { path, recreate } => {
            fs.makedir(&path, recreate)
                .await
                .with_context(|| format!("creating {path}"))?;
            Ok(())
        }
        Command::Rm { path } => fs.remove(&path).await.with_context(|| format!("removing {path}")),
        Command::Rmdir { path } => fs
            .removedir(&path)
            .await
            .with_context(|| format!("removing directory {path}")),
    }
}

async fn ls(fs: &Arc<dyn Filesystem>, path: &str, long: bool) -> Result<()> {
    let entries = fs
        .scandir(path, None)
        .await
        .with_context(|| format!("listing {path}"))?;
    let mut out = std::io::stdout().lock();
    for info in entries {
        if long {
            let kind = if info.is_dir() { 'd' } else { '-' };
            let size = info.size.map(|s| s.to_string()).unwrap_or_default();
            let modified = info
                .modified
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            writeln!(out, "{kind} {size:>12} {modified:>16} {}", info.name)?;
        } else {
            writeln!(out, "{}", info.name)?;
        }
    }
    Ok(())
}

fn print_stat(info: &EntryInfo) {
    println!("name:     {}", info.name);
    println!("kind:     {:?}", info.kind);
    if let Some(size) = info.size {
        println!("size:     {size}");
    }
    if let Some(modified) = info.modified {
        println!("modified: {modified}");
    }
    if let Some(client_modified) = info.client_modified {
        println!("client:   {client_modified}");
    }
    if let Some(rev) = &info.rev {
        println!("rev:      {rev}");
    }
    if let Some(hash) = &info.content_hash {
        println!("hash:     {hash}");
    }
    if let Some(media) = &info.media {
        if let Some((w, h)) = media.dimensions {
            println!("pixels:   {w}x{h}");
        }
        if let Some((lat, lon)) = media.location {
            println!("location: {lat}, {lon}");
        }
    }
}
