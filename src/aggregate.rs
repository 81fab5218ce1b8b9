use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use chrono::NaiveDate;
use rayon::prelude::*;
use regex::Regex;

use crate::model::{CityDateCount, CompanyOpenings, DerivedPosting, JobPosting, TitleStateSalary};
use crate::salary::{self, SalaryRules};
use crate::sanitize;

pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Row-wise transform: attach `salary_numeric` and `cleaned_description`.
pub fn derive_columns(records: &[JobPosting], rules: &SalaryRules) -> Vec<DerivedPosting> {
    records
        .par_iter()
        .map(|p| DerivedPosting {
            salary_numeric: salary::parse_with(p.salary_offered.as_deref(), rules),
            cleaned_description: sanitize::clean(p.html_job_description.as_deref()),
            posting: p.clone(),
        })
        .collect()
}

pub fn average_salary_by_title_and_state(records: &[JobPosting]) -> Vec<TitleStateSalary> {
    average_salary_by_title_and_state_with(records, &SalaryRules::default())
}

/// Groups come back in first-encounter order. Unparseable salaries keep the
/// group alive but stay out of the average.
pub fn average_salary_by_title_and_state_with(
    records: &[JobPosting],
    rules: &SalaryRules,
) -> Vec<TitleStateSalary> {
    let salaries: Vec<Option<f64>> = records
        .par_iter()
        .map(|p| salary::parse_with(p.salary_offered.as_deref(), rules))
        .collect();

    let mut index: HashMap<(Option<&str>, Option<&str>), usize> = HashMap::new();
    let mut groups: Vec<(&JobPosting, f64, usize)> = Vec::new();

    for (posting, salary) in records.iter().zip(salaries) {
        let key = (posting.job_title.as_deref(), posting.state.as_deref());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((posting, 0.0, 0));
            groups.len() - 1
        });
        if let Some(value) = salary {
            groups[slot].1 += value;
            groups[slot].2 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(first, sum, n)| TitleStateSalary {
            job_title: first.job_title.clone(),
            state: first.state.clone(),
            avg_monthly_salary: (n > 0).then(|| sum / n as f64),
        })
        .collect()
}

/// Companies by posting count, descending; ties keep first-encounter order.
pub fn top_companies_by_openings(records: &[JobPosting], limit: usize) -> Vec<CompanyOpenings> {
    let mut index: HashMap<Option<&str>, usize> = HashMap::new();
    let mut counts: Vec<(Option<&str>, usize)> = Vec::new();

    for posting in records {
        let key = posting.company_name.as_deref();
        let slot = *index.entry(key).or_insert_with(|| {
            counts.push((key, 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);

    counts
        .into_iter()
        .map(|(name, job_openings)| CompanyOpenings {
            company_name: name.map(str::to_string),
            job_openings,
        })
        .collect()
}

/// Postings per (date, city), ascending. Missing or malformed dates group
/// under `None`, which sorts first.
pub fn jobs_per_city_by_date(records: &[JobPosting]) -> Vec<CityDateCount> {
    let mut counts: BTreeMap<(Option<NaiveDate>, Option<&str>), usize> = BTreeMap::new();
    for posting in records {
        let date = posting.post_date.as_deref().and_then(parse_post_date);
        *counts.entry((date, posting.city.as_deref())).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((posted_date, city), job_count)| CityDateCount {
            posted_date,
            city: city.map(str::to_string),
            job_count,
        })
        .collect()
}

/// Strict `YYYY-MM-DD`; anything else (unpadded, short year, padding) is `None`.
pub fn parse_post_date(raw: &str) -> Option<NaiveDate> {
    if !post_date_re().is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn post_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap())
}
