//! # Slugify Subcommand

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use folio_core::Slug;

/// Arguments for the `folio slugify` subcommand.
#[derive(Args, Debug)]
pub struct SlugifyArgs {
    /// Title to derive a slug from. Multiple words are joined with spaces.
    #[arg(value_name = "TITLE", required = true, num_args = 1..)]
    pub title: Vec<String>,
}

/// Execute the slugify subcommand.
pub fn run_slugify(args: &SlugifyArgs, out: &mut impl Write) -> Result<u8> {
    let title = args.title.join(" ");
    let slug = Slug::derive(&title).with_context(|| format!("no slug for {title:?}"))?;
    writeln!(out, "{slug}")?;
    Ok(0)
}
