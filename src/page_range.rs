use regex::Regex;
use std::sync::LazyLock;

use crate::error::MergeError;

/// Upper bound on how many pages [`decode`] produces.
pub const MAX_DECODED_PAGES: usize = 100_000;

static SIMPLE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("page token pattern is valid"));
static RANGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("page range pattern is valid"));

/// One comma-separated token of page range text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Single(u32),
    Range { start: u32, end: u32 },
}

impl PageToken {
    /// Parse a token leniently: whitespace is trimmed and anything after a
    /// second dash is ignored. Returns `None` for empty or non-numeric tokens.
    pub fn parse_lenient(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        if token.contains('-') {
            let mut bounds = token.split('-');
            let start = bounds.next()?.trim().parse().ok()?;
            let end = bounds.next()?.trim().parse().ok()?;
            Some(PageToken::Range { start, end })
        } else {
            token.parse().ok().map(PageToken::Single)
        }
    }

    /// Ascending expansion of at most `limit` pages; a reversed range is empty.
    fn expand_ascending(self, out: &mut Vec<u32>, limit: usize) {
        match self {
            PageToken::Single(page) => out.extend(std::iter::once(page).take(limit)),
            PageToken::Range { start, end } => out.extend((start..=end).take(limit)),
        }
    }

    /// The first page of the token outside `1..=max_page`, if any.
    fn out_of_range(self, max_page: u32) -> Option<u32> {
        let outside = |page: u32| page == 0 || page > max_page;
        match self {
            PageToken::Single(page) => Some(page).filter(|&p| outside(p)),
            PageToken::Range { start, end } => {
                [start, end].into_iter().find(|&p| outside(p))
            }
        }
    }

    /// Expansion in the written direction; `9-6` yields `9,8,7,6`.
    fn expand_directed(self, out: &mut Vec<u32>) {
        match self {
            PageToken::Single(page) => out.push(page),
            PageToken::Range { start, end } if start <= end => out.extend(start..=end),
            PageToken::Range { start, end } => out.extend((end..=start).rev()),
        }
    }
}

/// Decode page range text such as `"1-3,5,8-9"` into page numbers.
///
/// Tokens are expanded in order without sorting or deduplication. Empty and
/// malformed tokens are skipped, and a reversed range like `"5-3"` contributes
/// nothing. Expansion stops after [`MAX_DECODED_PAGES`] pages. This never
/// fails; use [`parse_page_list`] when input must be validated.
pub fn decode(text: &str) -> Vec<u32> {
    let mut pages = Vec::new();
    for token in text.split(',').filter_map(PageToken::parse_lenient) {
        let remaining = MAX_DECODED_PAGES - pages.len();
        if remaining == 0 {
            break;
        }
        token.expand_ascending(&mut pages, remaining);
    }
    pages
}

/// Encode page numbers into compact page range text.
///
/// Only runs where each page is exactly one more than the previous collapse
/// into `start-end`; a gap, a repeat or a decrease starts a new run.
pub fn encode(pages: &[u32]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut run: Option<(u32, u32)> = None;

    for &page in pages {
        run = match run {
            Some((start, last)) if last.checked_add(1) == Some(page) => Some((start, page)),
            Some(finished) => {
                parts.push(format_run(finished));
                Some((page, page))
            }
            None => Some((page, page)),
        };
    }

    if let Some(finished) = run {
        parts.push(format_run(finished));
    }

    parts.join(",")
}

fn format_run((start, end): (u32, u32)) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

/// Strictly parse page range text as carried in a split/merge plan.
///
/// Every token must be digits or `digits-digits` with no whitespace. Empty
/// text yields no tokens.
pub fn parse_page_tokens(text: &str) -> Result<Vec<PageToken>, MergeError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let invalid = || MergeError::InvalidPageRange(text.to_string());
    text.split(',')
        .map(|part| {
            if SIMPLE_TOKEN.is_match(part) {
                Ok(PageToken::Single(part.parse().map_err(|_| invalid())?))
            } else if let Some(caps) = RANGE_TOKEN.captures(part) {
                Ok(PageToken::Range {
                    start: caps[1].parse().map_err(|_| invalid())?,
                    end: caps[2].parse().map_err(|_| invalid())?,
                })
            } else {
                Err(invalid())
            }
        })
        .collect()
}

/// Strictly parse page range text for a document of `max_page` pages.
///
/// Every page must lie in `1..=max_page`; this is checked before any range
/// is expanded. Reversed ranges expand in descending order.
pub fn parse_page_list(text: &str, max_page: u32) -> Result<Vec<u32>, MergeError> {
    let tokens = parse_page_tokens(text)?;
    if let Some(page) = tokens.iter().find_map(|t| t.out_of_range(max_page)) {
        return Err(MergeError::PageOutOfRange(page));
    }

    let mut pages = Vec::new();
    for token in tokens {
        token.expand_directed(&mut pages);
    }
    Ok(pages)
}
