use codesearch_client::CodeSearchClient;

use crate::cli::args::{GlobalArgs, SearchArgs};
use crate::exit_codes;

pub async fn run(args: SearchArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let client = CodeSearchClient::new(global.client_config())?;
    let results = client.search(&args.query, args.max).await?;

    for result in &results {
        let path = &result.top_file.file.name;
        if result.matches.is_empty() {
            println!("{path}");
        }
        for m in &result.matches {
            println!("{}:{}: {}", path, m.line_number, m.line_text.trim_end());
        }
    }

    tracing::debug!(results = results.len(), stats = ?client.stats(), "search done");
    Ok(exit_codes::SUCCESS)
}
