/*!
Shadow CLI - command-line interface for the shadow snapshot store.

Saves, lists, restores and deletes versions of individual files.
*/

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use shadow_core::observability::{init_tracing, LogOptions};
use shadow_core::{
    FileEntry, PathResolver, SaveOptions, ShadowConfig, ShadowEngine, TrackedFile, VersionList,
};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::debug;

#[derive(Parser)]
#[command(name = "shadow")]
#[command(about = "Simple file versioning without git")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Where stores live; overrides the config file
    #[arg(long, global = true, env = "SHADOW_REPO_PATH")]
    repo_path: Option<String>,

    /// Config file to read instead of ~/.config/shadow/config.yml
    #[arg(long, global = true, env = "SHADOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a version of a file
    Save {
        /// File to snapshot
        file: PathBuf,
        /// Tags for this version (repeatable or comma separated)
        #[arg(short, long = "tag", value_delimiter = ',')]
        tags: Vec<String>,
        /// Notes for this version
        #[arg(short, long = "note", default_value = "")]
        note: String,
    },
    /// List tracked files, or the versions of one file
    List {
        /// File whose versions to show
        file: Option<PathBuf>,
        /// Print the metadata as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore a file to a specific version
    Restore {
        /// File to restore
        file: PathBuf,
        /// Version id to restore
        version_id: String,
        /// Don't save the current state before restoring
        #[arg(long)]
        no_save: bool,
    },
    /// Delete a specific version of a file
    Delete {
        /// File whose version to delete
        file: PathBuf,
        /// Version id to delete
        version_id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Check that a version's snapshot still matches its recorded hash
    Verify {
        /// File the version belongs to
        file: PathBuf,
        /// Version id to verify
        version_id: String,
    },
}

#[derive(Tabled)]
struct FileInfo {
    #[tabled(rename = "File")]
    path: String,
    #[tabled(rename = "Versions")]
    versions: usize,
    #[tabled(rename = "Size")]
    size: String,
}

#[derive(Tabled)]
struct VersionInfo {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Saved")]
    age: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(LogOptions {
        verbose: cli.verbose,
        json: cli.json_logs,
    }) {
        eprintln!("Warning: {e}");
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), anyhow::Error> {
    let config = load_config(&cli)?;
    let resolver = PathResolver::from_env()?;
    debug!("Using repo_path {:?}", config.repo_path);

    match cli.command {
        Commands::Save { file, tags, note } => save_file(&resolver, &config, &file, tags, note),
        Commands::List { file, json } => list(&resolver, &config, file.as_deref(), json),
        Commands::Restore {
            file,
            version_id,
            no_save,
        } => restore_file(&resolver, &config, &file, &version_id, !no_save),
        Commands::Delete {
            file,
            version_id,
            force,
        } => delete_version(&resolver, &config, &file, &version_id, force),
        Commands::Verify { file, version_id } => {
            verify_version(&resolver, &config, &file, &version_id)
        }
    }
}

fn load_config(cli: &Cli) -> Result<ShadowConfig, anyhow::Error> {
    if let Some(repo_path) = &cli.repo_path {
        return Ok(ShadowConfig::with_repo_path(repo_path.as_str()));
    }
    let config = match &cli.config {
        Some(path) => ShadowConfig::from_file(path)?,
        None => ShadowConfig::load()?,
    };
    Ok(config)
}

fn locate(
    resolver: &PathResolver,
    config: &ShadowConfig,
    file: &Path,
) -> Result<(TrackedFile, ShadowEngine), anyhow::Error> {
    let tracked = resolver.locate(file, &config.repo_path)?;
    debug!("Store for {} is {}", tracked.path.display(), tracked.store_root.display());
    let engine = ShadowEngine::open(&tracked.store_root);
    Ok((tracked, engine))
}

fn save_file(
    resolver: &PathResolver,
    config: &ShadowConfig,
    file: &Path,
    tags: Vec<String>,
    note: String,
) -> Result<(), anyhow::Error> {
    let (tracked, engine) = locate(resolver, config, file)?;
    let tags = tags
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();

    let version = engine.save(&tracked.path, SaveOptions::new(tags, note))?;
    println!("✓ Saved version {} of {}", version.id, file.display());
    Ok(())
}

fn list(
    resolver: &PathResolver,
    config: &ShadowConfig,
    file: Option<&Path>,
    json: bool,
) -> Result<(), anyhow::Error> {
    let target = file.unwrap_or_else(|| resolver.cwd());
    let (tracked, engine) = locate(resolver, config, target)?;
    let list = engine.list()?;

    match file {
        None if json => println!("{}", serde_json::to_string_pretty(&list)?),
        None => list_all_files(&list, &tracked.store_root),
        Some(_) => {
            let entry = engine.history(&tracked.path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                list_file_versions(&entry, &tracked.path);
            }
        }
    }
    Ok(())
}

fn list_all_files(list: &VersionList, store_root: &Path) {
    if list.is_empty() {
        println!("No files tracked yet");
        return;
    }

    println!("Files tracked in shadow ({}):", store_root.display());
    let rows: Vec<FileInfo> = list
        .files
        .iter()
        .map(|entry| FileInfo {
            path: entry.path.clone(),
            versions: entry.versions.len(),
            size: format_size(entry.total_size()),
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn list_file_versions(entry: &FileEntry, path: &Path) {
    println!("{}", entry.path);
    match std::fs::metadata(path) {
        Ok(meta) => println!("  → VIRTUAL HEAD (current: {})", format_size(meta.len())),
        Err(_) => println!("  → VIRTUAL HEAD (file not found)"),
    }

    let now = Utc::now();
    let rows: Vec<VersionInfo> = entry
        .versions
        .iter()
        .map(|v| VersionInfo {
            id: v.id.clone(),
            age: format_age(now, v.created_at),
            tags: v.tags.join(", "),
            size: format_size(v.size),
            notes: v.notes.clone(),
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn restore_file(
    resolver: &PathResolver,
    config: &ShadowConfig,
    file: &Path,
    version_id: &str,
    auto_save: bool,
) -> Result<(), anyhow::Error> {
    let (tracked, engine) = locate(resolver, config, file)?;
    let outcome = engine.restore(&tracked.path, version_id, auto_save)?;

    if let Some(saved) = outcome.auto_saved {
        println!("✓ Saved current state as {}", saved.id);
    }
    println!("✓ Restored {} to version {}", file.display(), outcome.restored.id);
    Ok(())
}

fn delete_version(
    resolver: &PathResolver,
    config: &ShadowConfig,
    file: &Path,
    version_id: &str,
    force: bool,
) -> Result<(), anyhow::Error> {
    let (tracked, engine) = locate(resolver, config, file)?;
    let version = engine.version(&tracked.path, version_id)?;

    println!("Version {} of {}", version.id, file.display());
    println!(
        "  Created: {}",
        version
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    if !version.tags.is_empty() {
        println!("  Tags: {}", version.tags.join(", "));
    }
    if !version.notes.is_empty() {
        println!("  Notes: {}", version.notes);
    }
    println!("  Size: {}", format_size(version.size));
    println!();

    if !force {
        print!("Delete this version? (y/N): ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            println!("Cancelled");
            return Ok(());
        }
    }

    engine.delete(&tracked.path, version_id)?;
    println!("✓ Deleted version {version_id}");
    Ok(())
}

fn verify_version(
    resolver: &PathResolver,
    config: &ShadowConfig,
    file: &Path,
    version_id: &str,
) -> Result<(), anyhow::Error> {
    let (tracked, engine) = locate(resolver, config, file)?;
    let version = engine.verify(&tracked.path, version_id)?;
    println!("✓ Snapshot {} is intact ({})", version.id, format_size(version.size));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB", "EB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(then);
    if age.num_minutes() < 1 {
        "just now".to_string()
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_days() < 1 {
        format!("{}h ago", age.num_hours())
    } else {
        format!("{}d ago", age.num_days())
    }
}
