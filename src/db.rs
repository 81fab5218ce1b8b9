use std::io::BufRead;
use std::path::Path;

use rusqlite::Connection;

use crate::error::{PipelineError, Result};
use crate::model::{CityDateCount, CompanyOpenings, DerivedPosting, JobPosting, TitleStateSalary};

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS postings (
            id                   INTEGER PRIMARY KEY,
            job_title            TEXT,
            company_name         TEXT,
            state                TEXT,
            city                 TEXT,
            post_date            TEXT,
            salary_offered       TEXT,
            html_job_description TEXT,
            imported_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posting_derived (
            posting_id          INTEGER PRIMARY KEY REFERENCES postings(id),
            salary_numeric      REAL,
            cleaned_description TEXT NOT NULL,
            processed_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Aggregates, fully replaced on every report run
        CREATE TABLE IF NOT EXISTS salary_by_title_state (
            job_title          TEXT,
            state              TEXT,
            avg_monthly_salary REAL
        );

        CREATE TABLE IF NOT EXISTS top_companies (
            rank         INTEGER PRIMARY KEY,
            company_name TEXT,
            job_openings INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS jobs_per_city_date (
            posted_date TEXT,
            city        TEXT,
            job_count   INTEGER NOT NULL
        );
        ",
    )?;
    Ok(())
}

// ── Import ──

/// Load JSON Lines postings. The whole file commits or nothing does.
pub fn import_jsonl<R: BufRead>(conn: &Connection, reader: R) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO postings
             (job_title, company_name, state, city, post_date, salary_offered, html_job_description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let p: JobPosting = serde_json::from_str(&line).map_err(|source| {
                tracing::warn!(line = i + 1, error = %source, "malformed posting; aborting import");
                PipelineError::BadRecord { line: i + 1, source }
            })?;
            stmt.execute(rusqlite::params![
                p.job_title,
                p.company_name,
                p.state,
                p.city,
                p.post_date,
                p.salary_offered,
                p.html_job_description,
            ])?;
            count += 1;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Processing ──

pub struct StoredPosting {
    pub id: i64,
    pub posting: JobPosting,
}

const POSTING_COLUMNS: &str =
    "p.id, p.job_title, p.company_name, p.state, p.city, p.post_date, p.salary_offered, p.html_job_description";

fn row_to_stored(row: &rusqlite::Row) -> rusqlite::Result<StoredPosting> {
    Ok(StoredPosting {
        id: row.get(0)?,
        posting: JobPosting {
            job_title: row.get(1)?,
            company_name: row.get(2)?,
            state: row.get(3)?,
            city: row.get(4)?,
            post_date: row.get(5)?,
            salary_offered: row.get(6)?,
            html_job_description: row.get(7)?,
        },
    })
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<StoredPosting>> {
    let sql = format!(
        "SELECT {POSTING_COLUMNS}
         FROM postings p
         LEFT JOIN posting_derived d ON d.posting_id = p.id
         WHERE d.posting_id IS NULL
         ORDER BY p.id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_stored)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// All postings in insertion order.
pub fn fetch_postings(conn: &Connection) -> Result<Vec<JobPosting>> {
    let sql = format!("SELECT {POSTING_COLUMNS} FROM postings p ORDER BY p.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| row_to_stored(row).map(|s| s.posting))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn save_derived(conn: &Connection, ids: &[i64], rows: &[DerivedPosting]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO posting_derived (posting_id, salary_numeric, cleaned_description)
             VALUES (?1, ?2, ?3)",
        )?;
        for (id, r) in ids.iter().zip(rows) {
            stmt.execute(rusqlite::params![id, r.salary_numeric, r.cleaned_description])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Aggregates ──

pub fn save_aggregates(
    conn: &Connection,
    salaries: &[TitleStateSalary],
    companies: &[CompanyOpenings],
    cities: &[CityDateCount],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "DELETE FROM salary_by_title_state;
         DELETE FROM top_companies;
         DELETE FROM jobs_per_city_date;",
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO salary_by_title_state (job_title, state, avg_monthly_salary) VALUES (?1, ?2, ?3)",
        )?;
        for r in salaries {
            stmt.execute(rusqlite::params![r.job_title, r.state, r.avg_monthly_salary])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO top_companies (rank, company_name, job_openings) VALUES (?1, ?2, ?3)",
        )?;
        for (i, r) in companies.iter().enumerate() {
            stmt.execute(rusqlite::params![
                (i + 1) as i64,
                r.company_name,
                r.job_openings as i64
            ])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO jobs_per_city_date (posted_date, city, job_count) VALUES (?1, ?2, ?3)",
        )?;
        for r in cities {
            stmt.execute(rusqlite::params![
                r.posted_date.map(|d| d.format("%Y-%m-%d").to_string()),
                r.city,
                r.job_count as i64
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub postings: i64,
    pub processed: i64,
    pub parseable_salaries: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let postings = conn.query_row("SELECT COUNT(*) FROM postings", [], |r| r.get(0))?;
    let processed = conn.query_row("SELECT COUNT(*) FROM posting_derived", [], |r| r.get(0))?;
    let parseable_salaries = conn.query_row(
        "SELECT COUNT(*) FROM posting_derived WHERE salary_numeric IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        postings,
        processed,
        parseable_salaries,
    })
}
