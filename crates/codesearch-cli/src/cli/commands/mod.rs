use super::args::*;

pub mod cache;
pub mod fetch_missing;
pub mod search;
pub mod state;
pub mod xrefs;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let global = cli.global;
    match cli.cmd {
        Command::Search(args) => search::run(args, &global).await,
        Command::Xrefs(args) => xrefs::run(args, &global).await,
        Command::FetchMissing(args) => fetch_missing::run(args, &global).await,
        Command::Cache(args) => cache::run(args.cmd).await,
        Command::State(args) => state::run(args).await,
    }
}
