use clap::{Args, Parser, Subcommand};
use codesearch_client::{CacheMode, ClientConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "codesearch",
    version,
    about = "Query a code search backend through a local response cache"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Response cache directory (in-memory when unset)
    #[arg(long, global = true, env = "CODESEARCH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// live, cached-first or replay-only
    #[arg(long, global = true, env = "CODESEARCH_CACHE_MODE", default_value = "live")]
    pub mode: CacheMode,

    /// Backend base URL
    #[arg(long, global = true, env = "CODESEARCH_HOST")]
    pub host: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "CODESEARCH_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl GlobalArgs {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env().with_cache_mode(self.mode);
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        if let Some(host) = &self.host {
            config = config.with_host(host);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout_secs(timeout);
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Text search
    Search(SearchArgs),
    /// Cross references of a signature
    Xrefs(XrefsArgs),
    /// Fetch every recorded missing response live and store it
    FetchMissing(FetchMissingArgs),
    /// Inspect or prune a cache directory
    Cache(CacheArgs),
    /// Show the fixture state of one fingerprint
    State(StateArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value_t = 10)]
    pub max: u32,
}

#[derive(Args, Debug)]
pub struct XrefsArgs {
    pub signature: String,

    /// Edge kind filter (numeric, repeatable)
    #[arg(long = "edge")]
    pub edges: Vec<u32>,

    #[arg(long, default_value_t = 100)]
    pub max: u32,
}

#[derive(Args, Debug)]
pub struct FetchMissingArgs {
    /// Directory holding `.missing` descriptors
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub cmd: CacheCmd,
}

#[derive(Subcommand, Debug)]
pub enum CacheCmd {
    /// List cached responses
    List {
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List missing-resource descriptors
    Missing {
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Delete entries older than the TTL
    Gc {
        dir: PathBuf,
        /// Entry lifetime in seconds
        #[arg(long, env = "CODESEARCH_CACHE_TTL")]
        ttl: u64,
    },
    /// Delete all entries and descriptors
    Clear { dir: PathBuf },
    /// List cached responses no call site in callers.json asked for
    Unused {
        dir: PathBuf,
        /// Callers file (default: <dir>/callers.json)
        #[arg(long)]
        callers: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct StateArgs {
    pub dir: PathBuf,
    pub fingerprint: String,

    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "codesearch",
            "search",
            "LOG",
            "--mode",
            "replay-only",
            "--cache-dir",
            "/tmp/responses",
        ])
        .unwrap();

        assert_eq!(cli.global.mode, CacheMode::ReplayOnly);
        let config = cli.global.client_config();
        assert_eq!(config.cache_mode, CacheMode::ReplayOnly);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/responses")));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["codesearch", "--mode", "sometimes", "search", "x"]).is_err());
    }
}
