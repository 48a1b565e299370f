use codesearch_client::{DiskCache, Fingerprint, FixtureState};

use crate::cli::args::StateArgs;
use crate::exit_codes;

pub async fn run(args: StateArgs) -> anyhow::Result<i32> {
    let fingerprint = Fingerprint::parse(args.fingerprint.trim())?;
    let store = DiskCache::with_dir(&args.dir);
    let state = FixtureState::of(&store, &fingerprint).await?;

    if args.json {
        let out = serde_json::json!({
            "fingerprint": fingerprint,
            "state": state,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{state}");
    }
    Ok(exit_codes::SUCCESS)
}
