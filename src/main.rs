use anyhow::{Context, Result};
use clap::Parser;
use class_bytes::cli::{Cli, Commands, ListFormat, OutputFormat};
use class_bytes::config::resolve_classpath;
use class_bytes::logging::init_logging;
use class_bytes::naming::candidate_paths;
use class_bytes::parse::{hash_bytes, normalize_source_name};
use class_bytes::{ClassBytesRepository, LocationKind, RepositoryStats};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::warn;

fn main() -> Result<()> {
    init_logging();
    let cli = parse_cli();

    match cli.command.clone() {
        Commands::Find {
            source_name,
            format,
            output,
        } => {
            let repo = ClassBytesRepository::new(resolve_classpath(&cli)?);
            let source_name = normalize_source_name(&source_name);
            find_class(repo, &source_name, format, output.as_deref())?;
        }
        Commands::List { format, with_size } => {
            let repo = ClassBytesRepository::new(resolve_classpath(&cli)?);
            let result = list_classes(repo, with_size);
            write_list_output(&result, format)?;
        }
        Commands::Candidates { source_name } => {
            for candidate in candidate_paths(&normalize_source_name(&source_name)) {
                println!("{candidate}");
            }
        }
        Commands::Locations => {
            let repo = ClassBytesRepository::new(resolve_classpath(&cli)?);
            let output = LocationsResult {
                locations: repo
                    .locations()
                    .iter()
                    .map(|l| LocationRow {
                        index: l.id().0,
                        path: l.path().to_string_lossy().to_string(),
                        kind: l.kind(),
                    })
                    .collect(),
                stats: repo.stats(),
            };
            repo.close();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_find(args))
}

fn rewrite_args_for_implicit_find(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["find", "list", "candidates", "locations", "help"];
    let valued = ["--classpath", "--cp", "--entry"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if valued.contains(&a) {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "find".to_string());
        }
    }

    args
}

#[derive(Debug, Serialize)]
struct FindResult {
    source_name: String,
    found: bool,
    class_path: Option<String>,
    size: Option<usize>,
    content_hash: Option<String>,
    duration_ms: u64,
    archives_released: usize,
}

#[derive(Debug, Serialize)]
struct ListEntry {
    source_name: String,
    size: Option<usize>,
    content_hash: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResult {
    classes: usize,
    skipped: usize,
    duration_ms: u64,
    archives_released: usize,
    entries: Vec<ListEntry>,
}

#[derive(Debug, Serialize)]
struct LocationRow {
    index: usize,
    path: String,
    kind: LocationKind,
}

#[derive(Debug, Serialize)]
struct LocationsResult {
    locations: Vec<LocationRow>,
    stats: RepositoryStats,
}

fn find_class(
    repo: ClassBytesRepository,
    source_name: &str,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();
    let found = match repo.find(source_name)? {
        Some((class_path, supplier)) => Some((class_path, supplier.load()?)),
        None => None,
    };
    let archives_released = repo.close();

    if format == OutputFormat::Raw {
        let (_, bytes) =
            found.with_context(|| format!("Class not found on classpath: {source_name}"))?;
        return write_output(&bytes, output);
    }

    let result = FindResult {
        source_name: source_name.to_string(),
        found: found.is_some(),
        class_path: found.as_ref().map(|(p, _)| p.clone()),
        size: found.as_ref().map(|(_, b)| b.len()),
        content_hash: found.as_ref().map(|(_, b)| hash_bytes(b)),
        duration_ms: start.elapsed().as_millis() as u64,
        archives_released,
    };

    let content = match format {
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("source_name: {}\n", result.source_name));
            out.push_str(&format!("found: {}\n", result.found));
            if let (Some(path), Some(size)) = (&result.class_path, result.size) {
                out.push_str(&format!("class_path: {path}\n"));
                out.push_str(&format!("size: {size}\n"));
            }
            out.push_str(&format!("duration_ms: {}\n", result.duration_ms));
            out
        }
        _ => serde_json::to_string_pretty(&result)? + "\n",
    };
    write_output(content.as_bytes(), output)
}

fn list_classes(repo: ClassBytesRepository, with_size: bool) -> ListResult {
    let start = Instant::now();
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for (source_name, supplier) in repo.all_classes_bytes_by_source_name() {
        if !with_size {
            entries.push(ListEntry {
                source_name,
                size: None,
                content_hash: None,
            });
            continue;
        }
        match supplier.load() {
            Ok(bytes) => entries.push(ListEntry {
                source_name,
                size: Some(bytes.len()),
                content_hash: Some(hash_bytes(&bytes)),
            }),
            Err(err) => {
                warn!(%source_name, "skipping unreadable class: {err:#}");
                skipped += 1;
            }
        }
    }

    ListResult {
        classes: entries.len(),
        skipped,
        duration_ms: start.elapsed().as_millis() as u64,
        archives_released: repo.close(),
        entries,
    }
}

fn write_list_output(result: &ListResult, format: ListFormat) -> Result<()> {
    let content = match format {
        ListFormat::Json => serde_json::to_string_pretty(result)? + "\n",
        ListFormat::Text => {
            let mut out = String::new();
            for e in &result.entries {
                match e.size {
                    Some(size) => out.push_str(&format!("{} {size}\n", e.source_name)),
                    None => out.push_str(&format!("{}\n", e.source_name)),
                }
            }
            out
        }
    };
    write_output(content.as_bytes(), None)
}

fn write_output(content: &[u8], output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content)?;
        stdout.flush()?;
    }

    Ok(())
}
