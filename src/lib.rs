//! Salary normalization, description cleanup and aggregate reports over
//! scraped job postings.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod report;
pub mod salary;
pub mod sanitize;

pub use error::PipelineError;
pub use model::{CityDateCount, CompanyOpenings, DerivedPosting, JobPosting, TitleStateSalary};
