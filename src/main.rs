//! Story Station CLI — batch analysis driver and history browser.
//!
//! Usage:
//!   story-station analyze <files..> [--api-key KEY] [--model M] [--delay-secs N]
//!   story-station list
//!   story-station show <id>
//!   story-station clear
//!
//! All commands accept `--db PATH`; the archive defaults to
//! ~/StoryStation/story_station.db.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use story_station::config;
use story_station::db::{self, open_database};
use story_station::graph::{extract_relationships, GraphStatus};
use story_station::llm::GeminiClient;
use story_station::pipeline::{AnalysisEvent, AnalysisPipeline, FileInput};
use story_station::session::SessionContext;

#[derive(Parser)]
#[command(
    name = "story-station",
    version,
    about = "Streamed literary analysis with a local archive"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more text files and archive the results
    Analyze {
        /// Text files to analyze (processed sequentially)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// API key; the configured secret in GEMINI_API_KEY takes precedence
        #[arg(long)]
        api_key: Option<String>,
        /// Generation model identifier
        #[arg(long, default_value = config::DEFAULT_MODEL)]
        model: String,
        /// Pause between files, in seconds
        #[arg(long, default_value_t = config::DEFAULT_INTER_FILE_DELAY_SECS)]
        delay_secs: u64,
        /// Path to the archive database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List archived analyses, most recent first
    List {
        /// Path to the archive database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show one archived analysis with its relationship graph
    Show {
        /// Record id from `list`
        id: i64,
        /// Path to the archive database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Delete every archived analysis
    Clear {
        /// Path to the archive database
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn resolve_db_path(db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| {
        let dir = config::app_data_dir();
        std::fs::create_dir_all(&dir).ok();
        config::default_db_path()
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn cmd_analyze(
    files: &[PathBuf],
    api_key: Option<&str>,
    model: String,
    delay_secs: u64,
    db: Option<PathBuf>,
) -> i32 {
    let Some(key) = config::resolve_api_key(api_key) else {
        eprintln!(
            "Error: no API key available — set {} or pass --api-key",
            config::API_KEY_ENV
        );
        return 1;
    };

    let mut inputs = Vec::new();
    for path in files {
        match std::fs::read(path) {
            Ok(bytes) => inputs.push(FileInput {
                name: display_name(path),
                bytes,
            }),
            Err(e) => {
                eprintln!("Error: cannot read {}: {}", path.display(), e);
                return 1;
            }
        }
    }

    let client = GeminiClient::with_key(key.clone());
    let pipeline = AnalysisPipeline::new(client, Some(key), resolve_db_path(db))
        .with_model(model)
        .with_inter_file_delay(Duration::from_secs(delay_secs));

    let mut observer = |event: AnalysisEvent| match event {
        AnalysisEvent::FileStarted { filename } => {
            println!("── Analyzing {filename} ──");
        }
        AnalysisEvent::Fragment { text } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        AnalysisEvent::FileCompleted {
            filename,
            record_id,
        } => {
            println!("\n── {filename} archived as record {record_id} ──");
        }
        AnalysisEvent::FileSkipped { filename, reason } => {
            eprintln!("Skipped {filename}: {reason}");
        }
        AnalysisEvent::FileFailed { filename, error } => {
            eprintln!("\nFailed {filename}: {error}");
        }
    };

    match pipeline.run_batch(&inputs, &mut observer) {
        Ok(report) => {
            println!(
                "{} analyzed, {} skipped, {} failed",
                report.completed(),
                report.skipped(),
                report.failed()
            );
            if report.failed() > 0 {
                1
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn cmd_list(db: Option<PathBuf>) -> i32 {
    let conn = match open_database(&resolve_db_path(db)) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    match db::list_records(&conn) {
        Ok(records) if records.is_empty() => {
            println!("No archived analyses.");
            0
        }
        Ok(records) => {
            for record in records {
                println!("{:>5}  {}  {}", record.id, record.created_at, record.filename);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn cmd_show(id: i64, db: Option<PathBuf>) -> i32 {
    let conn = match open_database(&resolve_db_path(db)) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let mut session = SessionContext::new();
    session.select(id);

    let record = match session.selected_record(&conn) {
        Ok(Some(record)) => record,
        Ok(None) => {
            eprintln!("Error: no record with id {id}");
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    println!("{} ({})", record.filename, record.created_at);
    println!();

    let extraction = extract_relationships(&record.summary);
    println!("{}", extraction.readable_summary.trim_end());

    match extraction.graph {
        GraphStatus::Present(graph) => {
            println!("\nCharacters: {}", graph.nodes.join(", "));
            for edge in &graph.edges {
                println!("  {} → {} ({})", edge.source, edge.target, edge.label);
            }
        }
        GraphStatus::Absent => {
            println!("\nThis record contains no recognizable relationship data.");
        }
        GraphStatus::Malformed(reason) => {
            eprintln!("\nWarning: relationship data present but unreadable: {reason}");
        }
    }
    0
}

fn cmd_clear(db: Option<PathBuf>) -> i32 {
    let conn = match open_database(&resolve_db_path(db)) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    match db::delete_all_records(&conn) {
        Ok(removed) => {
            println!("Removed {removed} record(s).");
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn main() {
    story_station::init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Analyze {
            files,
            api_key,
            model,
            delay_secs,
            db,
        } => cmd_analyze(&files, api_key.as_deref(), model, delay_secs, db),
        Commands::List { db } => cmd_list(db),
        Commands::Show { id, db } => cmd_show(id, db),
        Commands::Clear { db } => cmd_clear(db),
    };

    std::process::exit(code);
}
