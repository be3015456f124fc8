//! Mapguard CLI - validate ETL mapping configurations from the shell.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mapguard::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "mapguard", version, about = "Validate ETL mapping configurations")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate mapping files or directories of them.
    Validate {
        /// Files or directories (searched for .yaml, .yml and .json).
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// structural, comprehensive, sql or job.
        #[arg(long, default_value = "comprehensive")]
        profile: String,
        /// Explicit rule categories; overrides the profile.
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Validator settings (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// -v for info, -vv for debug logging.
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
    /// List registered operations.
    Operations {
        #[arg(long)]
        category: Option<String>,
    },
    /// Show parameters and examples of one operation.
    Info { operation: String },
    /// List the built-in validation rules.
    Rules,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Outcome for one input file.
#[derive(Serialize)]
struct FileOutcome {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FileOutcome {
    fn passed(&self) -> bool {
        self.result.as_ref().is_some_and(ValidationResult::is_valid)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate {
            paths,
            profile,
            categories,
            format,
            config,
            verbose,
        } => {
            init_logging(verbose);
            let all_passed = validate(&paths, &profile, &categories, format, config.as_deref())?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        Command::Operations { category } => list_operations(category.as_deref()),
        Command::Info { operation } => operation_info(&operation)?,
        Command::Rules => list_rules(),
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn validate(paths: &[PathBuf], profile: &str, categories: &[String], format: Format, config: Option<&Path>) -> Result<bool> {
    let profile: Profile = profile.parse()?;
    let config = match config {
        Some(path) => ValidatorConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))?,
        None => ValidatorConfig::default(),
    };
    let files = collect_files(paths)?;
    if files.is_empty() {
        bail!("no .yaml, .yml or .json files found");
    }
    log::info!("Validating {} file(s) with profile '{}'", files.len(), profile);

    let validators = Validators::builder().config(config).build();
    let selected: Vec<&str> = categories.iter().map(String::as_str).collect();

    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|path| match load_document(path) {
            Ok(document) => {
                let result = if selected.is_empty() {
                    validators.validate(&document, profile)
                } else {
                    validators.validate_categories(&document, &selected)
                };
                FileOutcome {
                    path: path.clone(),
                    result: Some(result),
                    error: None,
                }
            }
            Err(err) => {
                log::warn!("{}: {:#}", path.display(), err);
                FileOutcome {
                    path: path.clone(),
                    result: None,
                    error: Some(format!("{:#}", err)),
                }
            }
        })
        .collect();

    match format {
        Format::Text => print_text(&outcomes),
        Format::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
    }
    Ok(outcomes.iter().all(FileOutcome::passed))
}

/// Expand directories into their mapping files, sorted by path.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.file_type().is_file() && is_mapping_file(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
            files.extend(found);
        } else if path.exists() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

fn is_mapping_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("yaml" | "yml" | "json")
    )
}

fn load_document(path: &Path) -> Result<ConfigDocument> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let document = if is_json {
        ConfigDocument::from_json_str(&text)
    } else {
        ConfigDocument::from_yaml_str(&text)
    };
    document.with_context(|| format!("parsing {}", path.display()))
}

fn print_text(outcomes: &[FileOutcome]) {
    for outcome in outcomes {
        match (&outcome.result, &outcome.error) {
            (Some(result), _) => {
                println!("{}: {}", outcome.path.display(), result.summary());
                for line in result.detailed_errors() {
                    println!("  {}", line);
                }
            }
            (None, Some(error)) => println!("{}: unreadable: {}", outcome.path.display(), error),
            (None, None) => {}
        }
    }
    let failed = outcomes.iter().filter(|o| !o.passed()).count();
    println!();
    println!("{} file(s) checked, {} failed", outcomes.len(), failed);
}

fn list_operations(category: Option<&str>) {
    let registry = OperationRegistry::with_builtins();
    let specs = match category {
        Some(category) => registry.get_by_category(category),
        None => registry.names().iter().filter_map(|name| registry.get(name)).collect(),
    };
    if specs.is_empty() {
        println!("No operations found");
        return;
    }
    for spec in specs {
        println!("{:<22} {:<12} {}", spec.name, spec.category, spec.description);
    }
}

fn operation_info(name: &str) -> Result<()> {
    let registry = OperationRegistry::with_builtins();
    match registry.help(name) {
        Some(help) => {
            print!("{}", help);
            Ok(())
        }
        None => {
            let suggestions = registry.suggest(name, 3);
            if suggestions.is_empty() {
                bail!("unknown operation '{}'", name);
            }
            bail!("unknown operation '{}'; did you mean {}?", name, suggestions.join(", "));
        }
    }
}

fn list_rules() {
    let validators = Validators::builder().logger(std::sync::Arc::new(SilentLogger)).build();
    for rule in validators.list_rules() {
        let categories: Vec<&str> = rule.categories.iter().map(String::as_str).collect();
        println!("{:<28} [{}] {}", rule.name, categories.join(","), rule.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collect_files_walks_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.yaml"), "mappings: []").unwrap();
        fs::write(dir.path().join("a.JSON"), "{}").unwrap();
        fs::write(dir.path().join("nested/c.yml"), "mappings: []").unwrap();
        fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.yaml", "c.yml"]);
    }

    #[test]
    fn test_collect_files_rejects_missing_path() {
        let dir = tempdir().unwrap();
        assert!(collect_files(&[dir.path().join("missing.yaml")]).is_err());
    }

    #[test]
    fn test_load_document_by_extension() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("job.json");
        fs::write(&json, r#"{"mappings": []}"#).unwrap();
        assert!(load_document(&json).unwrap().get("mappings").is_some());

        let broken = dir.path().join("broken.yaml");
        fs::write(&broken, "mappings: [unclosed").unwrap();
        let err = load_document(&broken).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));
    }

    #[test]
    fn test_unreadable_file_fails_the_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.yaml"), "- just\n- a list").unwrap();
        let passed = validate(&[dir.path().to_path_buf()], "structural", &[], Format::Json, None).unwrap();
        assert!(!passed);
    }

    #[test]
    fn test_unknown_profile_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("job.yaml"), "mappings: []").unwrap();
        assert!(validate(&[dir.path().to_path_buf()], "strictest", &[], Format::Text, None).is_err());
    }

    #[test]
    fn test_cli_parses_categories() {
        let cli = Cli::parse_from(["mapguard", "validate", "jobs", "--categories", "structure,security", "-vv"]);
        match cli.cmd {
            Command::Validate { categories, verbose, .. } => {
                assert_eq!(categories, vec!["structure", "security"]);
                assert_eq!(verbose, 2);
            }
            _ => panic!("expected validate"),
        }
    }
}
