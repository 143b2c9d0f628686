use super::import::import_files;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use vellum_core::{linearize, Page, Parent};
use vellum_io::Format;

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// File to import and print
    pub file: PathBuf,

    /// Source format (figma, pdf); guessed from the extension when omitted
    #[arg(short, long)]
    pub format: Option<Format>,

    /// Include hidden nodes
    #[arg(long)]
    pub all: bool,
}

pub fn tree(args: TreeArgs, config: &Config, cwd: &Path) -> Result<()> {
    let (editor, _) = import_files(std::slice::from_ref(&args.file), args.format, config, cwd)?;

    for page in editor.document().pages_in_order() {
        println!("{}", page.name.bright_white().bold());
        for line in outline(page, args.all) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// One indented line per node in paint order
fn outline(page: &Page, include_hidden: bool) -> Vec<String> {
    linearize(&page.graph, Parent::Root)
        .into_iter()
        .filter_map(|row| {
            let node = page.graph.get(row.node)?;
            if !include_hidden && !node.active {
                return None;
            }
            let indent = "  ".repeat(row.depth + 1);
            Some(format!("{}{} {}", indent, node.kind.name().cyan(), node.name))
        })
        .collect()
}
