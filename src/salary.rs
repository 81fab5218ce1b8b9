use regex::Regex;
use std::sync::OnceLock;

/// Values at or below this are read as an hourly rate.
pub const HOURLY_CEILING: f64 = 250.0;
/// 40 hours/week x 52 weeks.
pub const HOURS_PER_YEAR: f64 = 2080.0;
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Unit heuristics applied when a salary string carries no reliable unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryRules {
    pub hourly_ceiling: f64,
    pub hours_per_year: f64,
}

impl Default for SalaryRules {
    fn default() -> Self {
        SalaryRules {
            hourly_ceiling: HOURLY_CEILING,
            hours_per_year: HOURS_PER_YEAR,
        }
    }
}

/// Parse a free-text salary into a monthly amount. `None` means unparseable.
pub fn parse(raw: Option<&str>) -> Option<f64> {
    parse_with(raw, &SalaryRules::default())
}

pub fn parse_with(raw: Option<&str>, rules: &SalaryRules) -> Option<f64> {
    let raw = raw.filter(|s| !s.is_empty())?;

    let lowered = raw.replace(['$', ','], "").trim().to_lowercase();
    let cut = lowered.split('/').next().unwrap_or_default().trim();

    // Unit keywords are read after the slash cut but before the strip below
    // removes the letters. "20/hour" therefore loses its keyword.
    let hourly_hint = cut.contains("hour") || cut.contains("hr");
    let monthly_hint = cut.contains("month");

    let numeric = non_numeric_re().replace_all(cut, "");

    let monthly = if numeric.contains(" - ") {
        let avg = parse_range(&numeric)?;
        let yearly = if hourly_hint || avg <= rules.hourly_ceiling {
            avg * rules.hours_per_year
        } else {
            avg
        };
        yearly / MONTHS_PER_YEAR
    } else {
        let value = parse_number(&numeric)?;
        let yearly = if hourly_hint || value <= rules.hourly_ceiling {
            value * rules.hours_per_year
        } else if monthly_hint {
            value * MONTHS_PER_YEAR
        } else {
            value
        };
        yearly / MONTHS_PER_YEAR
    };

    if monthly.is_finite() && monthly >= 0.0 {
        Some(monthly)
    } else {
        tracing::trace!(raw, monthly, "salary outside the non-negative domain");
        None
    }
}

/// Midpoint of a "low - high" range.
fn parse_range(numeric: &str) -> Option<f64> {
    let parts: Vec<&str> = numeric.split(" - ").map(str::trim).collect();
    if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
        tracing::trace!(numeric, "malformed salary range");
        return None;
    }
    let low = parse_number(parts[0])?;
    // Tolerate stray tokens after the high bound.
    let high = parse_number(parts[1].split_whitespace().next()?)?;
    Some((low + high) / 2.0)
}

fn parse_number(token: &str) -> Option<f64> {
    match token.trim().parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::trace!(token, "salary token is not a number");
            None
        }
    }
}

fn non_numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\d.\- ]").unwrap())
}
