use anyhow::Result;

use crate::page_range::{decode, encode};

pub fn run_decode(text: &str) -> Result<()> {
    let pages = decode(text);
    println!("{}", serde_json::to_string(&pages)?);
    Ok(())
}

pub fn run_encode(pages: &[u32]) -> Result<()> {
    println!("{}", encode(pages));
    Ok(())
}
