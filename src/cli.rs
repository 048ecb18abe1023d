//! Command-line interface for connascence.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use globset::GlobSet;
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::engine::Engine;
use crate::parser::Language;
use crate::report::{self, Format};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Config file names looked up in the current directory.
const DEFAULT_CONFIG_NAMES: &[&str] = &["connascence.yaml", ".connascence.yaml"];

/// Directories never worth descending into.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "target", "__pycache__"];

/// Static analysis for connascence, NASA-style safety rules, god objects and
/// duplicated code.
#[derive(Parser)]
#[command(name = "connascence")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log analysis phases to stderr (same as RUST_LOG=connascence=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a file or directory
    #[command(visible_alias = "check")]
    Lint(LintArgs),
    /// Write a config file with every option at its default
    Init(InitArgs),
}

#[derive(Parser)]
pub struct LintArgs {
    /// Path to check (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover, else built-in defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Show suppressed violations in output
    #[arg(long)]
    pub show_suppressed: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "connascence.yaml")]
    pub output: PathBuf,
}

fn discover_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Supported source files under `root`, sorted for stable output.
pub fn collect_files(root: &Path, excluded: &GlobSet) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if !e.file_type().is_dir() || e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&&*name)
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || Language::from_path(entry.path()).is_none() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if excluded.is_match(relative) {
            continue;
        }
        files.push(entry.path().to_path_buf());
    }
    files.sort();
    Ok(files)
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs) -> anyhow::Result<i32> {
    let format: Format = match args.format.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let config_path = args.config.clone().or_else(discover_config);
    let config = match &config_path {
        Some(path) => match AnalysisConfig::parse_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error parsing config {}: {}", path.display(), e);
                return Ok(EXIT_ERROR);
            }
        },
        None => AnalysisConfig::default(),
    };

    let engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let root = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let files = if root.is_dir() {
        let excluded = engine.config().exclusion_set()?;
        collect_files(&root, &excluded)
            .with_context(|| format!("walking {}", root.display()))?
    } else {
        vec![root.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no files to scan");
        return Ok(EXIT_SUCCESS);
    }

    let result = engine.analyze(&files);
    report::write_report(
        format,
        &root,
        config_path.as_deref(),
        &result,
        args.show_suppressed,
    )?;

    if result.has_blocking_violations() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let yaml = serde_yaml::to_string(&AnalysisConfig::default())?;
    std::fs::write(&args.output, yaml)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to tune thresholds for your project", args.output.display());
    println!("  2. Run: connascence lint . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_skips_vendor_and_unknown() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("vendor/lib")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("gen")).unwrap();
        fs::write(root.join("src/b.py"), "x = 1\n").unwrap();
        fs::write(root.join("src/a.rs"), "fn main() {}\n").unwrap();
        fs::write(root.join("src/notes.md"), "# notes\n").unwrap();
        fs::write(root.join("vendor/lib/c.py"), "x = 1\n").unwrap();
        fs::write(root.join(".git/d.py"), "x = 1\n").unwrap();
        fs::write(root.join("gen/e.py"), "x = 1\n").unwrap();

        let config = AnalysisConfig {
            excluded_paths: vec!["gen/**".to_string()],
            ..Default::default()
        };
        let files = collect_files(root, &config.exclusion_set().unwrap()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["src/a.rs", "src/b.py"]);
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("conf/connascence.yaml");
        let code = run_init(&InitArgs {
            output: output.clone(),
        })
        .unwrap();
        assert_eq!(code, EXIT_SUCCESS);
        let loaded = AnalysisConfig::parse_file(&output).unwrap();
        assert_eq!(loaded, AnalysisConfig::default());

        let again = run_init(&InitArgs { output }).unwrap();
        assert_eq!(again, EXIT_ERROR);
    }
}
