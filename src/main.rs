use std::io::{BufReader, Read};
use std::time::Instant;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::{debug, info};

use jobsignal::config::Settings;
use jobsignal::{aggregate, db, report, salary, sanitize};

#[derive(Parser)]
#[command(name = "jobsignal", about = "Salary, description and aggregate extraction for job postings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Load postings from a JSON Lines file
    Import {
        /// One JSON object per line
        path: std::path::PathBuf,
    },
    /// Compute salary_numeric and cleaned_description for new postings
    Process {
        /// Max postings to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Run and persist the three aggregate reports
    Report {
        /// Number of companies to list (default: top_limit setting)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Normalize a single salary string (stdin when omitted)
    Salary { text: Option<String> },
    /// Clean a single description (stdin when omitted)
    Clean { text: Option<String> },
    /// Show processing statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    debug!(?settings, "settings loaded");

    let result = match cli.command {
        Commands::Init => {
            open(&settings)?;
            println!("Schema ready at {}", settings.db_path);
            Ok(())
        }
        Commands::Import { path } => {
            let conn = open(&settings)?;
            let file = std::fs::File::open(&path)?;
            let inserted = db::import_jsonl(&conn, BufReader::new(file))?;
            info!(inserted, path = %path.display(), "import finished");
            println!("Imported {} postings", inserted);
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = open(&settings)?;
            let pending = db::fetch_unprocessed(&conn, limit)?;
            if pending.is_empty() {
                println!("No unprocessed postings. Run 'import' first.");
                return Ok(());
            }
            println!("Processing {} postings...", pending.len());
            let counts = process_postings(&conn, &pending, &settings)?;
            println!(
                "Saved {} postings ({} with a parseable salary).",
                counts.processed, counts.parseable
            );
            Ok(())
        }
        Commands::Report { top } => {
            let conn = open(&settings)?;
            let postings = db::fetch_postings(&conn)?;
            if postings.is_empty() {
                println!("No postings. Run 'import' first.");
                return Ok(());
            }
            let limit = top.unwrap_or(settings.top_limit);
            let salaries =
                aggregate::average_salary_by_title_and_state_with(&postings, &settings.salary_rules());
            let companies = aggregate::top_companies_by_openings(&postings, limit);
            let cities = aggregate::jobs_per_city_by_date(&postings);
            db::save_aggregates(&conn, &salaries, &companies, &cities)?;
            info!(
                groups = salaries.len(),
                companies = companies.len(),
                city_dates = cities.len(),
                "aggregates saved"
            );

            println!("--- Average monthly salary by title and state ---");
            print!("{}", report::salary_table(&salaries));
            println!("\n--- Top {} companies by openings ---", limit);
            print!("{}", report::companies_table(&companies));
            println!("\n--- Jobs per city and date ---");
            print!("{}", report::cities_table(&cities));
            Ok(())
        }
        Commands::Salary { text } => {
            let text = arg_or_stdin(text)?;
            match salary::parse_with(Some(text.as_str()), &settings.salary_rules()) {
                Some(monthly) => println!("{:.2}", monthly),
                None => println!("unparseable"),
            }
            Ok(())
        }
        Commands::Clean { text } => {
            let text = arg_or_stdin(text)?;
            println!("{}", sanitize::clean(Some(text.as_str())));
            Ok(())
        }
        Commands::Stats => {
            let conn = open(&settings)?;
            let s = db::get_stats(&conn)?;
            println!("Postings:           {}", s.postings);
            println!("Processed:          {}", s.processed);
            println!("Parseable salaries: {}", s.parseable_salaries);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open(settings: &Settings) -> anyhow::Result<Connection> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn arg_or_stdin(text: Option<String>) -> anyhow::Result<String> {
    match text {
        Some(t) => Ok(t),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

struct ProcessCounts {
    processed: usize,
    parseable: usize,
}

fn process_postings(
    conn: &Connection,
    pending: &[db::StoredPosting],
    settings: &Settings,
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let rules = settings.salary_rules();
    let mut counts = ProcessCounts {
        processed: 0,
        parseable: 0,
    };

    for chunk in pending.chunks(500) {
        let ids: Vec<i64> = chunk.iter().map(|s| s.id).collect();
        let postings: Vec<_> = chunk.iter().map(|s| s.posting.clone()).collect();
        let derived = aggregate::derive_columns(&postings, &rules);

        counts.processed += derived.len();
        counts.parseable += derived.iter().filter(|d| d.salary_numeric.is_some()).count();
        db::save_derived(conn, &ids, &derived)?;
        debug!(chunk = chunk.len(), total = counts.processed, "chunk saved");
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
