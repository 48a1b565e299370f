use codesearch_client::{CodeSearchClient, EdgeKind, XrefNode};

use crate::cli::args::{GlobalArgs, XrefsArgs};
use crate::exit_codes;

pub async fn run(args: XrefsArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let client = CodeSearchClient::new(global.client_config())?;
    let edges: Vec<EdgeKind> = args.edges.into_iter().map(EdgeKind).collect();

    let node = XrefNode::from_signature(args.signature, None);
    for edge in node.edges(&client, &edges, args.max).await? {
        match edge.matched.kind.as_str() {
            "" => println!("{edge}"),
            kind => println!("{edge} ({kind})"),
        }
    }

    Ok(exit_codes::SUCCESS)
}
