use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use courier::config::{self, BuildConfig, Config};
use courier::engine::{self, Reporter, RunOptions};
use courier::make::CommandMaker;
use courier::snapshot::SnapshotStore;
use courier::target::{TargetLoader, TargetRegistry, TargetSpec};
use courier::types::DispatchReport;

#[derive(Parser, Debug)]
#[command(name = "courier", version)]
#[command(about = "Publish build output, or checkpoint it and publish it later")]
struct Cli {
    /// Working directory (default: current directory)
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Config file layered over the discovered .courier.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only print warnings and errors to stderr.
    #[arg(long, short)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run make and publish its output (or checkpoint / resume it).
    Publish {
        /// Publish target to use (repeatable). Overrides `publishers` from config.
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Run make and save its output to the snapshot root instead of publishing.
        #[arg(long, conflicts_with = "dry_run_resume")]
        dry_run: bool,

        /// Publish every saved snapshot record without running make.
        #[arg(long)]
        dry_run_resume: bool,

        /// Let make and targets prompt on the terminal.
        #[arg(long)]
        interactive: bool,

        /// Print the dispatch report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List snapshot records under the snapshot root.
    Snapshots,
    /// List known publish targets.
    Targets,
    /// Print the resolved configuration as TOML.
    Config,
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

struct CliReporter {
    quiet: bool,
}

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        if !self.quiet {
            eprintln!("[info] {msg}");
        }
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.cmd {
        clap_complete::generate(shell, &mut Cli::command(), "courier", &mut io::stdout());
        return Ok(());
    }

    let dir = absolute_dir(&cli.dir)?;
    let loaded = load_config(&dir, cli.config.as_deref())?;
    let build = BuildConfig::resolve(&dir, &loaded);
    let registry = TargetRegistry::with_builtins();
    let mut reporter = CliReporter { quiet: cli.quiet };

    match cli.cmd {
        Commands::Publish {
            targets,
            dry_run,
            dry_run_resume,
            interactive,
            json,
        } => {
            let opts = RunOptions {
                dir: dir.clone(),
                interactive,
                targets: if targets.is_empty() {
                    None
                } else {
                    Some(targets.into_iter().map(TargetSpec::from).collect())
                },
                dry_run,
                dry_run_resume,
            };
            let maker = CommandMaker::new(build.make_command.clone());
            let report = engine::run_publish(&opts, &build, &maker, &registry, &mut reporter)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("failed to serialize report")?
                );
            } else {
                print_report(&report, &build);
            }
        }
        Commands::Snapshots => {
            print_snapshots(&SnapshotStore::new(&build.snapshot_dir))?;
        }
        Commands::Targets => {
            print_targets(&registry, &build);
        }
        Commands::Config => {
            let rendered = toml::to_string(&build).context("failed to render configuration")?;
            print!("{rendered}");
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn absolute_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(dir))
}

/// The discovered `.courier.toml`, with an explicit `--config` file layered
/// on top.
fn load_config(dir: &Path, explicit: Option<&Path>) -> Result<Config> {
    let base = match config::find_config(dir) {
        Some(path) => config::load_config_from_file(&path)?,
        None => Config::default(),
    };

    let Some(path) = explicit else {
        return Ok(base);
    };
    let path = config::resolve_dir(dir, path);
    if !path.exists() {
        anyhow::bail!("config file not found: {}", path.display());
    }
    let overlay = config::load_config_from_file(&path)?;
    Ok(base.merge(&overlay))
}

fn print_report(report: &DispatchReport, build: &BuildConfig) {
    println!("mode: {}", report.mode);
    if report.targets.is_empty() {
        println!("targets: (none)");
    } else {
        println!("targets: {}", report.targets.join(", "));
    }
    println!("groups: {}", report.group_count);
    if let Some(record) = &report.snapshot_record {
        println!("snapshot: {}", build.snapshot_dir.join(record).display());
    }
    println!();

    for inv in &report.invocations {
        println!(
            "{} <- group {}: {} ({} artifacts, {})",
            inv.target,
            inv.group + 1,
            inv.platforms.join(", "),
            inv.artifact_count,
            humantime::format_duration(Duration::from_millis(inv.duration_ms))
        );
    }
}

fn print_snapshots(store: &SnapshotStore) -> Result<()> {
    println!("snapshot_root: {}", store.root().display());
    let records = store.list_records()?;
    if records.is_empty() {
        println!("no snapshot records");
        return Ok(());
    }

    println!();
    for record in &records {
        println!(
            "{}: {} artifact set(s) [{}]",
            record.name,
            record.artifact_sets,
            record.platforms.join(", ")
        );
    }
    Ok(())
}

fn print_targets(loader: &dyn TargetLoader, build: &BuildConfig) {
    for name in loader.available() {
        if build.publishers.contains(&name) {
            println!("{name} (configured)");
        } else {
            println!("{name}");
        }
    }
}
