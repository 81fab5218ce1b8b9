use crate::model::{CityDateCount, CompanyOpenings, TitleStateSalary};

const NULL: &str = "-";

pub fn salary_table(rows: &[TitleStateSalary]) -> String {
    let mut out = format!("{:<32} | {:<6} | {:>12}\n", "Job title", "State", "Avg monthly");
    out.push_str(&"-".repeat(56));
    out.push('\n');
    for r in rows {
        let avg = r
            .avg_monthly_salary
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| NULL.into());
        out.push_str(&format!(
            "{:<32} | {:<6} | {:>12}\n",
            truncate(r.job_title.as_deref().unwrap_or(NULL), 32),
            r.state.as_deref().unwrap_or(NULL),
            avg
        ));
    }
    out
}

pub fn companies_table(rows: &[CompanyOpenings]) -> String {
    let mut out = format!("{:>3} | {:<32} | {:>8}\n", "#", "Company", "Openings");
    out.push_str(&"-".repeat(49));
    out.push('\n');
    for (i, r) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:>3} | {:<32} | {:>8}\n",
            i + 1,
            truncate(r.company_name.as_deref().unwrap_or(NULL), 32),
            r.job_openings
        ));
    }
    out
}

pub fn cities_table(rows: &[CityDateCount]) -> String {
    let mut out = format!("{:<10} | {:<24} | {:>5}\n", "Date", "City", "Jobs");
    out.push_str(&"-".repeat(45));
    out.push('\n');
    for r in rows {
        let date = r
            .posted_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| NULL.into());
        out.push_str(&format!(
            "{:<10} | {:<24} | {:>5}\n",
            date,
            truncate(r.city.as_deref().unwrap_or(NULL), 24),
            r.job_count
        ));
    }
    out
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
