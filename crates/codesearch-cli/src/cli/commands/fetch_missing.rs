//! Out-of-band fetch of responses recorded as missing by replay-only runs.

use anyhow::Context;
use codesearch_client::{resolve_missing, CacheMode, DiskCache, HttpTransport};

use crate::cli::args::{FetchMissingArgs, GlobalArgs};
use crate::exit_codes;

pub async fn run(args: FetchMissingArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    if !args.dir.is_dir() {
        anyhow::bail!("not a directory: {}", args.dir.display());
    }

    let config = global.client_config().with_cache_mode(CacheMode::Live);
    config.validate()?;
    let transport = HttpTransport::new(&config).context("failed to build HTTP transport")?;
    let store = DiskCache::with_dir(&args.dir);

    let report = resolve_missing(&store, &transport).await?;

    for failure in &report.failed {
        eprintln!(
            "failed {} {}: {}",
            failure.method,
            failure.fingerprint.short(),
            failure.error
        );
    }
    println!(
        "resolved {}, failed {} in {}",
        report.resolved.len(),
        report.failed.len(),
        args.dir.display()
    );

    if report.resolved.is_empty() && report.failed.is_empty() {
        return Ok(exit_codes::NOTHING_RESOLVED);
    }
    if !report.failed.is_empty() {
        return Ok(exit_codes::FETCH_FAILED);
    }
    Ok(exit_codes::SUCCESS)
}
