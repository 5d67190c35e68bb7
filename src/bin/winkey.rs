//! Command-line front end: prints the Windows product key found in SOFTWARE hives.

use anyhow::{Context, Result};
use clap::Parser;
use encoding_rs::Encoding;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winkey::product_key::{DIGITAL_PRODUCT_ID, WINDOWS_KEY_PATH};
use winkey::{Hive, HiveOptions};

#[derive(Parser)]
#[command(name = "winkey")]
#[command(about = "Recover the Windows product key from a SOFTWARE registry hive")]
#[command(version)]
struct Cli {
    /// Hive files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Code page for single-byte key and value names
    #[arg(long, default_value = "windows-1252")]
    codepage: String,

    /// Treat a header checksum mismatch as an error
    #[arg(long)]
    strict_checksum: bool,

    /// Also print the raw DigitalProductId in hex
    #[arg(long)]
    dump: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let options = match Encoding::for_label(cli.codepage.as_bytes()) {
        Some(encoding) => HiveOptions::default()
            .with_ansi_encoding(encoding)
            .with_strict_checksum(cli.strict_checksum),
        None => {
            eprintln!("Unknown code page: {}", cli.codepage);
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for path in &cli.files {
        if let Err(e) = inspect(path, options, cli.dump) {
            error!(path = %path.display(), "{:#}", e);
            eprintln!("{}: error: {:#}", path.display(), e);
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn inspect(path: &Path, options: HiveOptions, dump: bool) -> Result<()> {
    info!(path = %path.display(), "Loading file");
    let file = File::open(path).context("Error loading file")?;

    // SAFETY: the file is opened read-only and the mapping is dropped before
    // this function returns. Every access goes through bounds-checked views.
    let mmap = unsafe { Mmap::map(&file) }.context("Error loading file")?;

    info!(path = %path.display(), "Parsing file");
    let hive = Hive::with_options(&mmap, options).context("Error parsing file")?;

    info!(path = %path.display(), "Searching for Windows key");
    let product_key = hive.windows_product_key().context("Error searching")?;

    match product_key {
        Some(product_key) => println!("{}: {}", path.display(), product_key),
        None => println!("{}: key not found", path.display()),
    }

    if dump {
        dump_product_id(&hive, path)?;
    }

    Ok(())
}

/// Prints the raw `DigitalProductId`, if the hive has one.
fn dump_product_id(hive: &Hive<'_>, path: &Path) -> Result<()> {
    if let Some((name, value_type, data)) = product_id_dump(hive)? {
        println!("{}: {} ({}) = {}", path.display(), name, value_type, data);
    }
    Ok(())
}

/// Name, type and hex payload of the `DigitalProductId` value.
///
/// A missing key or value is not an error.
fn product_id_dump(hive: &Hive<'_>) -> Result<Option<(String, String, String)>> {
    let Some(key) = hive.open_key(&WINDOWS_KEY_PATH.join("\\"))? else {
        return Ok(None);
    };

    let Some(value) = key.value(DIGITAL_PRODUCT_ID)? else {
        return Ok(None);
    };

    Ok(Some((
        value.name().to_string(),
        value.value_type().to_string(),
        hex::encode(value.data()?),
    )))
}
