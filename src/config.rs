use config::{Config, Environment, File};
use serde::Deserialize;

use crate::aggregate::DEFAULT_TOP_LIMIT;
use crate::error::Result;
use crate::salary::SalaryRules;

pub const DEFAULT_DB_PATH: &str = "data/jobs.sqlite";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub db_path: String,
    pub top_limit: usize,
    pub hourly_ceiling: f64,
    pub hours_per_year: f64,
}

impl Default for Settings {
    fn default() -> Self {
        let rules = SalaryRules::default();
        Settings {
            db_path: DEFAULT_DB_PATH.to_string(),
            top_limit: DEFAULT_TOP_LIMIT,
            hourly_ceiling: rules.hourly_ceiling,
            hours_per_year: rules.hours_per_year,
        }
    }
}

impl Settings {
    pub fn salary_rules(&self) -> SalaryRules {
        SalaryRules {
            hourly_ceiling: self.hourly_ceiling,
            hours_per_year: self.hours_per_year,
        }
    }

    /// Defaults, then `jobsignal.toml` if present, then `JOBSIGNAL_*` env vars.
    pub fn load() -> Result<Self> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("jobsignal").required(false))
                .add_source(Environment::with_prefix("JOBSIGNAL")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let defaults = Settings::default();
        let settings = builder
            .set_default("db_path", defaults.db_path)?
            .set_default("top_limit", defaults.top_limit as i64)?
            .set_default("hourly_ceiling", defaults.hourly_ceiling)?
            .set_default("hours_per_year", defaults.hours_per_year)?
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
