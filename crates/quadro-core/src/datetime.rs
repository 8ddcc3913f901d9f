use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

const TIMEZONE_CONFIG_FILE: &str = "quadro-time.toml";
const TIMEZONE_ENV_VAR: &str = "QUADRO_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "QUADRO_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

pub fn project_timezone() -> &'static Tz {
    static PROJECT_TZ: OnceLock<Tz> = OnceLock::new();
    PROJECT_TZ.get_or_init(resolve_project_timezone)
}

#[must_use]
pub fn today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(project_timezone()).date_naive()
}

fn resolve_project_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    chrono_tz::UTC
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &PathBuf) -> Option<Tz> {
    if !path.exists() {
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "failed reading timezone config file");
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "failed parsing timezone config file");
            return None;
        }
    };

    let timezone = parsed
        .timezone
        .or_else(|| parsed.time.and_then(|section| section.timezone))?;
    parse_timezone(timezone.as_str(), &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            info!(source, timezone = %trimmed, "configured project timezone");
            Some(tz)
        }
        Err(err) => {
            warn!(source, timezone = %trimmed, error = %err, "failed to parse timezone id");
            None
        }
    }
}

// Due dates are calendar dates. Unparseable input falls back to today, the
// same as the original capture flow.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_due_expr(input: &str, today: NaiveDate) -> NaiveDate {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "today" => return today,
        "tomorrow" => {
            return today.checked_add_days(Days::new(1)).unwrap_or(today);
        }
        "next-week" | "next week" => {
            return today.checked_add_days(Days::new(7)).unwrap_or(today);
        }
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return date;
    }

    if let Some(date) = parse_month_day(&lower, today) {
        return date;
    }

    warn!(input, "unrecognized due date expression; falling back to today");
    today
}

fn parse_month_day(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    let re = Regex::new(r"^(?P<month>[a-z]+)\.?\s+(?P<day>\d{1,2})$").ok()?;

    let caps = re.captures(lower)?;
    let month = parse_month_name(caps.name("month")?.as_str())?;
    let day: u32 = caps.name("day")?.as_str().parse().ok()?;

    let mut year = today.year();
    let candidate = NaiveDate::from_ymd_opt(year, month, day)?;
    if candidate < today && month < today.month() {
        year += 1;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_month_name(token: &str) -> Option<u32> {
    match token {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_due_expr;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_relative_keywords() {
        let today = date(2026, 2, 17);
        assert_eq!(parse_due_expr("today", today), today);
        assert_eq!(parse_due_expr("Tomorrow", today), date(2026, 2, 18));
        assert_eq!(parse_due_expr("next-week", today), date(2026, 2, 24));
        assert_eq!(parse_due_expr("next week", today), date(2026, 2, 24));
    }

    #[test]
    fn parses_iso_date() {
        let today = date(2026, 2, 17);
        assert_eq!(parse_due_expr("2026-05-03", today), date(2026, 5, 3));
    }

    #[test]
    fn parses_month_day_in_the_future() {
        let today = date(2026, 2, 17);
        assert_eq!(parse_due_expr("may 3", today), date(2026, 5, 3));
        assert_eq!(parse_due_expr("Sep 14", today), date(2026, 9, 14));
    }

    #[test]
    fn past_month_day_rolls_to_next_year() {
        let today = date(2026, 6, 10);
        assert_eq!(parse_due_expr("jan 5", today), date(2027, 1, 5));
    }

    #[test]
    fn later_day_in_earlier_month_still_this_year() {
        // The roll-over only triggers when the month itself has passed.
        let today = date(2026, 6, 10);
        assert_eq!(parse_due_expr("june 5", today), date(2026, 6, 5));
    }

    #[test]
    fn unparseable_input_falls_back_to_today() {
        let today = date(2026, 2, 17);
        assert_eq!(parse_due_expr("whenever", today), today);
        assert_eq!(parse_due_expr("", today), today);
        assert_eq!(parse_due_expr("may 99", today), today);
    }
}
