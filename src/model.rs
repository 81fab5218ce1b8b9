use chrono::NaiveDate;
use serde::Deserialize;

/// One raw posting. Every column may be missing in the source data.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct JobPosting {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub post_date: Option<String>,
    pub salary_offered: Option<String>,
    pub html_job_description: Option<String>,
}

/// A posting with its derived columns attached.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedPosting {
    pub posting: JobPosting,
    /// Monthly salary, `None` when unparseable.
    pub salary_numeric: Option<f64>,
    pub cleaned_description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleStateSalary {
    pub job_title: Option<String>,
    pub state: Option<String>,
    /// `None` when no posting in the group had a parseable salary.
    pub avg_monthly_salary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyOpenings {
    pub company_name: Option<String>,
    pub job_openings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityDateCount {
    pub posted_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub job_count: usize,
}
