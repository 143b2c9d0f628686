use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use vellum_core::Document;
use vellum_editor::{Action, Editor, TemplateRegistry};
use vellum_io::{importer_for, Diagnostic, Format};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Files to import; each one's pages are appended in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Source format (figma, pdf); guessed from the extension when omitted
    #[arg(short, long)]
    pub format: Option<Format>,

    /// Print the resulting document as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// One imported file and what did not map
pub struct Imported {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn import(args: ImportArgs, config: &Config, cwd: &Path) -> Result<()> {
    let (editor, imported) = import_files(&args.files, args.format, config, cwd)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(editor.document())?);
        return Ok(());
    }

    println!("{}", "📥 Importing design files...".bright_blue().bold());
    for file in &imported {
        if file.diagnostics.is_empty() {
            println!("  {} {}", "✓".green(), file.path.display());
        } else {
            println!(
                "  {} {} ({} diagnostics)",
                "⚠".yellow(),
                file.path.display(),
                file.diagnostics.len()
            );
            for diagnostic in &file.diagnostics {
                println!("      {}", diagnostic.to_string().dimmed());
            }
        }
    }

    let document = editor.document();
    println!();
    println!(
        "{} {} pages, {} nodes",
        "✅ Imported".green().bold(),
        document.page_count(),
        document.node_count()
    );
    for page in document.pages_in_order() {
        println!("  {} ({} nodes)", page.name.bright_white(), page.graph.len());
    }

    Ok(())
}

/// Import every file and merge them into one editor document through the
/// action protocol
pub fn import_files(
    files: &[PathBuf],
    format: Option<Format>,
    config: &Config,
    cwd: &Path,
) -> Result<(Editor, Vec<Imported>)> {
    let mut editor = Editor::new(
        Document::new(),
        TemplateRegistry::shared(),
        config.editor.clone(),
    );
    let mut imported = Vec::new();

    for file in files {
        let path = cwd.join(file);
        let format = format
            .or_else(|| Format::from_path(&path))
            .or(config.default_format)
            .ok_or_else(|| anyhow!("Cannot tell the format of {}; pass --format", file.display()))?;

        let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let output = importer_for(format)
            .import(&bytes)
            .with_context(|| format!("Failed to import {} as {}", file.display(), format))?;

        editor.dispatch(Action::ImportPages {
            document: output.document,
        })?;
        imported.push(Imported {
            path: file.clone(),
            diagnostics: output.diagnostics,
        });
    }

    Ok((editor, imported))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_files_merges_pages() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.pdf"), "0 0 10 10 re f").unwrap();
        fs::write(
            dir.path().join("frame.json"),
            r#"{ "type": "FRAME", "id": "1:1", "name": "Frame", "children": [] }"#,
        )
        .unwrap();

        let files = vec![PathBuf::from("page.pdf"), PathBuf::from("frame.json")];
        let (editor, imported) = import_files(&files, None, &Config::default(), dir.path()).unwrap();

        assert_eq!(editor.document().page_count(), 2);
        assert_eq!(editor.document().node_count(), 2);
        assert!(imported.iter().all(|f| f.diagnostics.is_empty()));
        assert_eq!(editor.history().undo_levels(), 2);
    }

    #[test]
    fn test_unknown_extension_needs_format() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "0 0 m").unwrap();

        let files = vec![PathBuf::from("notes.txt")];
        assert!(import_files(&files, None, &Config::default(), dir.path()).is_err());

        let config = Config {
            default_format: Some(Format::Pdf),
            ..Config::default()
        };
        let (_, imported) = import_files(&files, None, &config, dir.path()).unwrap();
        // A lone moveto is never painted
        assert_eq!(imported[0].diagnostics.len(), 1);
    }
}
