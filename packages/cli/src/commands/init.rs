use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;
use vellum_io::Format;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Format assumed for files without a known extension
    #[arg(short, long)]
    pub default_format: Option<Format>,

    /// Undo steps kept by the editor
    #[arg(long, default_value_t = 100)]
    pub history_limit: usize,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = Config::path(cwd);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let mut config = Config {
        default_format: args.default_format,
        ..Config::default()
    };
    config.editor.history_limit = args.history_limit;

    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. Export a Figma file as JSON or a PDF page's content stream");
    println!("  2. Run: vellum import <file>");
    println!("  3. Run: vellum tree <file>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            default_format: Some(Format::Figma),
            history_limit: 25,
            force: false,
        };
        init(args, dir.path()).unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.editor.history_limit, 25);
        assert_eq!(config.default_format, Some(Format::Figma));
    }

    #[test]
    fn test_init_keeps_existing_without_force() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(Config::path(dir.path()), r#"{ "logLevel": "warn" }"#).unwrap();

        let args = InitArgs {
            default_format: None,
            history_limit: 100,
            force: false,
        };
        init(args, dir.path()).unwrap();

        assert_eq!(Config::load(dir.path()).unwrap().log_level, "warn");
    }
}
