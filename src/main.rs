//! # docvault CLI (`dv`)
//!
//! Browse, search, and upload documents inside one sandboxed repository
//! root, and review code against the standards documents kept there.
//!
//! ## Usage
//!
//! ```bash
//! dv --config ./config/dv.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dv list [dir]` | List a directory, directories first |
//! | `dv read <file>` | Print a document, bounded by bytes and lines |
//! | `dv upload <dest> --from <file>` | Store a local file in the repository |
//! | `dv search [query]` | Rank documents by name and content |
//! | `dv review ...` | Review code against the standards documents |
//! | `dv standards` | Show the checklist extracted from the standards |
//! | `dv config show` | Print the effective configuration |
//! | `dv config set-root --path <dir>` | Point the config at another root |
//!
//! ## Examples
//!
//! ```bash
//! # Page through a long document
//! dv read handbook/onboarding.md --max-lines 200 --offset 200
//!
//! # Upload without clobbering an existing file
//! dv upload specs/api.md --from ./api.md --conflict rename
//!
//! # Keyword search limited to one directory
//! dv search --keywords deploy,rollback --dir runbooks --top-k 5
//!
//! # Review staged changes in CI
//! git diff --cached | dv review --diff-file - --json --fail-on-findings
//! ```
//!
//! With `--json`, every invocation prints one envelope on stdout; logs go
//! to stderr (`DV_LOG` overrides `--log-level`).

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use docvault::config::{self, Config};
use docvault::output;
use docvault::review::{CodeInput, ReviewRequest, Reviewer};
use docvault::search::{SearchEngine, SearchOptions, SearchRequest};
use docvault::store::{DocumentStore, ReadOptions};
use docvault::Error;
use docvault_core::models::{ConflictPolicy, ReviewStatus};

/// docvault CLI: a sandboxed document repository with ranked search and
/// standards-driven code review.
#[derive(Parser)]
#[command(
    name = "dv",
    about = "docvault: sandboxed documents, ranked search, and standards-driven code review",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dv.toml")]
    config: PathBuf,

    /// Print one JSON envelope instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Log level when `DV_LOG` is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory under the repository root.
    List {
        /// Root-relative directory (default: the root).
        dir: Option<String>,
    },

    /// Read a document.
    ///
    /// Output stops at whichever of `--max-bytes` and `--max-lines` is hit
    /// first; the header says whether the content was truncated and which
    /// `--offset` continues it.
    Read {
        /// Root-relative file path.
        file: String,

        #[arg(long)]
        max_bytes: Option<u64>,

        #[arg(long)]
        max_lines: Option<usize>,

        /// Lines to skip before reading.
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Upload a local file into the repository.
    Upload {
        /// Root-relative destination path.
        dest: String,

        /// Local file to upload.
        #[arg(long)]
        from: PathBuf,

        /// What to do when the destination exists: `overwrite` or `rename`.
        #[arg(long)]
        conflict: Option<String>,
    },

    /// Search documents by name and content.
    ///
    /// `--keywords` takes precedence over the free-text query.
    Search {
        /// Free-text query.
        query: Option<String>,

        /// Comma-separated keywords.
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Root-relative directory to search (default: the root).
        #[arg(long)]
        dir: Option<String>,

        #[arg(long)]
        top_k: Option<usize>,

        /// Match file names only; skip reading content.
        #[arg(long)]
        name_only: bool,
    },

    /// Review code against the standards documents in the repository.
    ///
    /// Exactly one input is required.
    Review {
        /// Inline code snippet.
        #[arg(long)]
        snippet: Option<String>,

        /// Local file holding a snippet (`-` for stdin).
        #[arg(long)]
        snippet_file: Option<PathBuf>,

        /// Label used for snippet findings.
        #[arg(long)]
        label: Option<String>,

        /// One workspace-relative file.
        #[arg(long)]
        file: Option<String>,

        /// Comma-separated workspace-relative files.
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,

        /// Inline unified diff.
        #[arg(long)]
        diff: Option<String>,

        /// Local file holding a unified diff (`-` for stdin).
        #[arg(long)]
        diff_file: Option<PathBuf>,

        /// Workspace root for `--file`/`--files` (default from config).
        #[arg(long)]
        workspace: Option<PathBuf>,

        /// Comma-separated standards locations, replacing the configured ones.
        #[arg(long, value_delimiter = ',')]
        standards: Vec<String>,

        /// Exit with status 1 when the review finds issues.
        #[arg(long)]
        fail_on_findings: bool,
    },

    /// Show the rules extracted from the standards documents.
    Standards {
        /// Comma-separated standards locations, replacing the configured ones.
        #[arg(long, value_delimiter = ',')]
        standards: Vec<String>,
    },

    /// Inspect or change the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Set the repository root, creating the directory when missing.
    SetRoot {
        #[arg(long)]
        path: PathBuf,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::List { .. } => "list",
            Commands::Read { .. } => "read",
            Commands::Upload { .. } => "upload",
            Commands::Search { .. } => "search",
            Commands::Review { .. } => "review",
            Commands::Standards { .. } => "standards",
            Commands::Config { .. } => "config",
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            if cli.json {
                println!("{}", output::failure_json(cli.command.name(), &err));
            } else {
                eprint!("{}", output::render_error(&err));
            }
            output::exit_code(&err)
        }
    };
    std::process::exit(code);
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env("DV_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let command = cli.command.name();

    if let Commands::Config {
        action: ConfigAction::SetRoot { path },
    } = &cli.command
    {
        let cfg = config::set_root(&cli.config, path)?;
        emit(cli.json, command, &cfg, |c| {
            format!(
                "repository.root = {}\nsaved to {}\n",
                c.repository.root.display(),
                cli.config.display()
            )
        })?;
        return Ok(0);
    }

    let cfg = config::load_config(&cli.config)?;
    let store = DocumentStore::from_config(&cfg)?;

    match &cli.command {
        Commands::List { dir } => {
            let listing = store.list(dir.as_deref().unwrap_or("."))?;
            emit(cli.json, command, &listing, output::render_listing)?;
        }

        Commands::Read {
            file,
            max_bytes,
            max_lines,
            offset,
        } => {
            let defaults = store.read_defaults();
            let opts = ReadOptions {
                max_bytes: max_bytes.unwrap_or(defaults.max_bytes),
                max_lines: max_lines.unwrap_or(defaults.max_lines),
                offset: *offset,
            };
            if opts.max_bytes == 0 || opts.max_lines == 0 {
                return Err(Error::InvalidInput("read limits must be at least 1".into()).into());
            }
            let result = store.read(file, opts)?;
            emit(cli.json, command, &result, output::render_read)?;
        }

        Commands::Upload {
            dest,
            from,
            conflict,
        } => {
            let policy = match conflict {
                Some(p) => p.parse::<ConflictPolicy>()?,
                None => cfg.upload.conflict,
            };
            let receipt = store.upload_file(dest, from, policy)?;
            emit(cli.json, command, &receipt, output::render_receipt)?;
        }

        Commands::Search {
            query,
            keywords,
            dir,
            top_k,
            name_only,
        } => {
            let engine = SearchEngine::new(&store, SearchOptions::from_config(&cfg)?);
            let response = engine.search(&SearchRequest {
                query: query.clone(),
                keywords: keywords.clone(),
                dir: dir.clone(),
                top_k: *top_k,
                name_only: *name_only,
            })?;
            emit(cli.json, command, &response, output::render_search)?;
        }

        Commands::Review {
            snippet,
            snippet_file,
            label,
            file,
            files,
            diff,
            diff_file,
            workspace,
            standards,
            fail_on_findings,
        } => {
            let mut inputs = Vec::new();
            if let Some(text) = snippet {
                inputs.push(CodeInput::Snippet {
                    label: label.clone(),
                    text: text.clone(),
                });
            }
            if let Some(path) = snippet_file {
                let default_label = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .filter(|n| n != "-");
                inputs.push(CodeInput::Snippet {
                    label: label.clone().or(default_label),
                    text: read_local(path)?,
                });
            }
            if let Some(path) = file {
                inputs.push(CodeInput::File(path.clone()));
            }
            if !files.is_empty() {
                inputs.push(CodeInput::Files(files.clone()));
            }
            if let Some(text) = diff {
                inputs.push(CodeInput::Diff(text.clone()));
            }
            if let Some(path) = diff_file {
                inputs.push(CodeInput::Diff(read_local(path)?));
            }
            if inputs.len() != 1 {
                return Err(Error::InvalidInput(
                    "pass exactly one of --snippet, --snippet-file, --file, --files, --diff, --diff-file"
                        .into(),
                )
                .into());
            }

            let request = ReviewRequest {
                input: inputs.remove(0),
                workspace_root: workspace.clone(),
                standards: standards.clone(),
            };
            let report = Reviewer::new(&store, &cfg)?.review(&request)?;
            emit(cli.json, command, &report, output::render_review)?;
            if *fail_on_findings && report.status == ReviewStatus::IssuesFound {
                return Ok(1);
            }
        }

        Commands::Standards { standards } => {
            let checklist = Reviewer::new(&store, &cfg)?.checklist(standards)?;
            emit(cli.json, command, &checklist, output::render_checklist)?;
        }

        Commands::Config {
            action: ConfigAction::Show,
        } => {
            emit(cli.json, command, &cfg, |c: &Config| {
                toml::to_string_pretty(c).unwrap_or_default()
            })?;
        }

        // Handled before the config is loaded.
        Commands::Config {
            action: ConfigAction::SetRoot { .. },
        } => {}
    }

    Ok(0)
}

fn emit<T: Serialize>(
    json: bool,
    command: &str,
    data: &T,
    render: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", output::success_json(command, data)?);
    } else {
        print!("{}", render(data));
    }
    Ok(())
}

/// Read a caller-side file, or stdin for `-`.
fn read_local(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
