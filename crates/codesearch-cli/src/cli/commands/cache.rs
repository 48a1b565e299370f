use std::path::{Path, PathBuf};
use std::time::Duration;

use codesearch_client::{callers, CacheEntryInfo, CacheStore, DiskCache, CALLERS_FILE};

use crate::cli::args::CacheCmd;
use crate::exit_codes;

pub async fn run(cmd: CacheCmd) -> anyhow::Result<i32> {
    match cmd {
        CacheCmd::List { dir, json } => list(&dir, json).await,
        CacheCmd::Missing { dir, json } => missing(&dir, json).await,
        CacheCmd::Gc { dir, ttl } => {
            let store = DiskCache::with_dir(&dir).with_ttl(Some(Duration::from_secs(ttl)));
            let purged = store.purge_expired().await?;
            println!("purged {} expired entries from {}", purged, dir.display());
            Ok(exit_codes::SUCCESS)
        }
        CacheCmd::Clear { dir } => {
            DiskCache::with_dir(&dir).clear().await?;
            println!("cleared {}", dir.display());
            Ok(exit_codes::SUCCESS)
        }
        CacheCmd::Unused { dir, callers, json } => unused(&dir, callers, json).await,
    }
}

fn print_entries(entries: &[CacheEntryInfo]) {
    for entry in entries {
        println!(
            "{}  {:>8}  {}",
            entry.fingerprint,
            entry.size,
            entry.created_at.to_rfc3339()
        );
    }
}

async fn list(dir: &Path, json: bool) -> anyhow::Result<i32> {
    let entries = DiskCache::with_dir(dir).list().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(exit_codes::SUCCESS);
    }

    print_entries(&entries);
    Ok(exit_codes::SUCCESS)
}

async fn unused(dir: &Path, callers_file: Option<PathBuf>, json: bool) -> anyhow::Result<i32> {
    let callers_file = callers_file.unwrap_or_else(|| dir.join(CALLERS_FILE));
    if !callers_file.is_file() {
        anyhow::bail!("no callers file at {}", callers_file.display());
    }
    let seen = callers::load(&callers_file).await?;
    let entries = callers::unreferenced(&DiskCache::with_dir(dir), &seen).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(exit_codes::SUCCESS);
    }
    print_entries(&entries);
    Ok(exit_codes::SUCCESS)
}

async fn missing(dir: &Path, json: bool) -> anyhow::Result<i32> {
    let descriptors = DiskCache::with_dir(dir).list_missing().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(exit_codes::SUCCESS);
    }

    for d in &descriptors {
        println!(
            "{}  {:<12}  {}",
            d.fingerprint,
            d.method,
            d.recorded_at.to_rfc3339()
        );
    }
    Ok(exit_codes::SUCCESS)
}
