use anyhow::{Context, Result};

use super::{print_outcome, AppContext};
use crate::cli::RunOptions;
use crate::editor::load_document_ref;
use crate::merge::execute_split_merge_plan;
use crate::session::SplitMergeSession;

pub fn run(ctx: &AppContext, document: u64, after: &[u32], options: &RunOptions) -> Result<()> {
    let doc = load_document_ref(&ctx.store, document)
        .with_context(|| format!("Failed to load document {}", document))?;

    let mut session = SplitMergeSession::new();
    session.add_document(doc);
    let parts = session.split_document(0, after)?;
    if parts == 1 {
        anyhow::bail!("None of the pages {:?} splits document {}", after, document);
    }

    let plan = session.to_plan();
    let request = ctx.request(plan, options);
    let outcome = execute_split_merge_plan(&ctx.store, &request, ctx.scratch_dir())
        .context("Split failed")?;

    println!("Split document {} into {} parts", document, parts);
    print_outcome(&outcome);
    Ok(())
}
