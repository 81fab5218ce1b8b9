use std::fs::File;
use std::io::BufReader;

use jobsignal::aggregate::{self, DEFAULT_TOP_LIMIT};
use jobsignal::db;
use jobsignal::salary::SalaryRules;
use rusqlite::Connection;

fn load_fixture() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let file = File::open("tests/fixtures/postings.jsonl").unwrap();
    let inserted = db::import_jsonl(&conn, BufReader::new(file)).unwrap();
    assert_eq!(inserted, 5, "blank line must be skipped");
    conn
}

#[test]
fn derived_columns_round_through_the_store() {
    let conn = load_fixture();
    let pending = db::fetch_unprocessed(&conn, None).unwrap();
    let ids: Vec<i64> = pending.iter().map(|p| p.id).collect();
    let postings: Vec<_> = pending.iter().map(|p| p.posting.clone()).collect();
    let derived = aggregate::derive_columns(&postings, &SalaryRules::default());

    let cleaned: Vec<&str> = derived.iter().map(|d| d.cleaned_description.as_str()).collect();
    assert_eq!(
        cleaned,
        vec![
            "Build pipelines .",
            "Plain text description",
            "Own the warehouse",
            "",
            "",
        ]
    );

    let salaries: Vec<Option<f64>> = derived.iter().map(|d| d.salary_numeric).collect();
    assert_eq!(salaries[0], Some(10_000.0));
    assert_eq!(salaries[1], None);
    assert!((salaries[2].unwrap() - 100_000.0 / 12.0).abs() < 1e-6);
    assert_eq!(salaries[3], Some(3120.0));
    assert_eq!(salaries[4], Some(3000.0));

    db::save_derived(&conn, &ids, &derived).unwrap();
    assert!(db::fetch_unprocessed(&conn, None).unwrap().is_empty());
    let stats = db::get_stats(&conn).unwrap();
    assert_eq!((stats.postings, stats.processed, stats.parseable_salaries), (5, 5, 4));
}

#[test]
fn aggregates_are_persisted() {
    let conn = load_fixture();
    let postings = db::fetch_postings(&conn).unwrap();

    let salaries = aggregate::average_salary_by_title_and_state(&postings);
    let companies = aggregate::top_companies_by_openings(&postings, DEFAULT_TOP_LIMIT);
    let cities = aggregate::jobs_per_city_by_date(&postings);

    assert_eq!(salaries.len(), 2);
    let engineer = &salaries[0];
    assert_eq!(engineer.job_title.as_deref(), Some("Data Engineer"));
    let expected = (10_000.0 + 100_000.0 / 12.0) / 2.0;
    assert!((engineer.avg_monthly_salary.unwrap() - expected).abs() < 1e-6);
    assert_eq!(salaries[1].avg_monthly_salary, Some(3060.0));

    let names: Vec<_> = companies
        .iter()
        .map(|c| (c.company_name.as_deref().unwrap(), c.job_openings))
        .collect();
    assert_eq!(names, vec![("Acme", 3), ("Globex", 1), ("Initech", 1)]);

    db::save_aggregates(&conn, &salaries, &companies, &cities).unwrap();
    // A second run replaces rather than appends.
    db::save_aggregates(&conn, &salaries, &companies, &cities).unwrap();

    let rows: Vec<(Option<String>, String, i64)> = conn
        .prepare("SELECT posted_date, city, job_count FROM jobs_per_city_date ORDER BY rowid")
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            (None, "Seattle".to_string(), 1),
            (Some("2024-03-01".to_string()), "San Jose".to_string(), 2),
            (Some("2024-03-01".to_string()), "Seattle".to_string(), 1),
            (Some("2024-03-02".to_string()), "Oakland".to_string(), 1),
        ]
    );

    let top: i64 = conn
        .query_row("SELECT COUNT(*) FROM top_companies", [], |r| r.get(0))
        .unwrap();
    assert_eq!(top, 3);
}
