use anyhow::{Context, Result};

use super::{print_outcome, AppContext};
use crate::cli::RunOptions;
use crate::merge::execute_split_merge_plan;
use crate::plan::SourceSpec;

/// Parse `ID` or `ID:PAGES`.
pub fn parse_source(text: &str) -> Result<SourceSpec> {
    let (id, pages) = match text.split_once(':') {
        Some((id, pages)) => (id, Some(pages.trim().to_string())),
        None => (text, None),
    };
    let document = id
        .trim()
        .parse()
        .with_context(|| format!("Invalid document id in source: {}", text))?;
    Ok(SourceSpec { document, pages })
}

pub fn run(ctx: &AppContext, sources: &[String], options: &RunOptions) -> Result<()> {
    let target = sources
        .iter()
        .map(|s| parse_source(s))
        .collect::<Result<Vec<_>>>()?;
    let request = ctx.request(vec![target], options);

    let outcome = execute_split_merge_plan(&ctx.store, &request, ctx.scratch_dir())
        .context("Merge failed")?;

    println!("Merged {} source(s)", sources.len());
    print_outcome(&outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            parse_source("4").unwrap(),
            SourceSpec {
                document: 4,
                pages: None
            }
        );
        assert_eq!(
            parse_source("4:1-3,7").unwrap(),
            SourceSpec {
                document: 4,
                pages: Some("1-3,7".to_string())
            }
        );
        assert!(parse_source("four").is_err());
        assert!(parse_source(":1-3").is_err());
    }
}
