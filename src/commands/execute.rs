use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use super::{print_outcome, AppContext};
use crate::merge::execute_split_merge_plan;
use crate::plan::SplitMergeRequest;

pub fn read_request(path: &Path) -> Result<SplitMergeRequest> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read request from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request: {}", path.display()))?
    };
    serde_json::from_str(&text).context("Invalid split/merge request")
}

pub fn run(ctx: &AppContext, path: &Path, preview: bool) -> Result<()> {
    let mut request = read_request(path)?;
    request.preview |= preview;

    let outcome = execute_split_merge_plan(&ctx.store, &request, ctx.scratch_dir())
        .context("Split/merge failed")?;
    print_outcome(&outcome);
    Ok(())
}
