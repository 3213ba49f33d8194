//! Hand-rolled 5-field cron (`minute hour day-of-month month day-of-week`)
//! parsing and next-tick computation, plus the legacy cron-to-interval
//! migration mapping named in §4.1.
//!
//! No crate in the workspace's dependency stack (nor the teacher's, which
//! has no cron parser at all — `fc-scheduler` only does fixed-interval
//! dispatch) covers this, and the field set/migration rules are specific
//! enough to this system that pulling in a generic cron crate would mean
//! fighting its semantics instead of reusing them. See the Open Question
//! decision in `DESIGN.md`.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::error::{Result, SchedulerError};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    values: Vec<u32>,
}

impl Field {
    fn matches(&self, value: u32) -> bool {
        self.values.contains(&value)
    }
}

/// A parsed 5-field cron expression.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

/// How far ahead `next_after` will search before giving up. Four years
/// comfortably covers every realistic schedule (including "Feb 29 only").
const MAX_LOOKAHEAD_MINUTES: i64 = 4 * 366 * 24 * 60;

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(SchedulerError::InvalidCron(
                expr.to_string(),
                format!("expected 5 whitespace-separated fields, found {}", fields.len()),
            ));
        }
        let parse_one = |field_str: &str, min: u32, max: u32| -> Result<Field> {
            parse_field(field_str, min, max)
                .map_err(|e| SchedulerError::InvalidCron(expr.to_string(), e))
        };
        Ok(Self {
            minute: parse_one(fields[0], 0, 59)?,
            hour: parse_one(fields[1], 0, 23)?,
            day_of_month: parse_one(fields[2], 1, 31)?,
            month: parse_one(fields[3], 1, 12)?,
            day_of_week: parse_one(fields[4], 0, 6)?,
        })
    }

    fn matches(&self, t: DateTime<Utc>) -> bool {
        self.minute.matches(t.minute())
            && self.hour.matches(t.hour())
            && self.day_of_month.matches(t.day())
            && self.month.matches(t.month())
            && self.day_of_week.matches(t.weekday().num_days_from_sunday())
    }

    /// First tick strictly after `after`, truncated to whole minutes since
    /// cron has no finer resolution.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = (after + Duration::minutes(1))
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))?;
        let mut candidate = start;
        for _ in 0..MAX_LOOKAHEAD_MINUTES {
            if self.matches(candidate) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

fn parse_field(raw: &str, min: u32, max: u32) -> std::result::Result<Field, String> {
    let mut values = Vec::new();
    for part in raw.split(',') {
        values.extend(parse_part(part, min, max)?);
    }
    values.sort_unstable();
    values.dedup();
    if values.is_empty() {
        return Err(format!("field {raw:?} produced no values"));
    }
    Ok(Field { values })
}

fn parse_part(part: &str, min: u32, max: u32) -> std::result::Result<Vec<u32>, String> {
    let (range_part, step) = match part.split_once('/') {
        Some((r, s)) => (r, Some(s.parse::<u32>().map_err(|_| format!("bad step in {part:?}"))?)),
        None => (part, None),
    };

    let (lo, hi) = if range_part == "*" {
        (min, max)
    } else if let Some((a, b)) = range_part.split_once('-') {
        let a: u32 = a.parse().map_err(|_| format!("bad range start in {part:?}"))?;
        let b: u32 = b.parse().map_err(|_| format!("bad range end in {part:?}"))?;
        (a, b)
    } else {
        let v: u32 = range_part.parse().map_err(|_| format!("bad value {part:?}"))?;
        (v, v)
    };

    if lo < min || hi > max || lo > hi {
        return Err(format!("value {part:?} out of range [{min}, {max}]"));
    }

    let step = step.unwrap_or(1).max(1);
    Ok((lo..=hi).step_by(step as usize).collect())
}

/// Legacy cron-to-interval migration (§4.1): maps the common fixed-cadence
/// patterns onto `interval_minutes`, defaulting to hourly for anything
/// unrecognized rather than rejecting the source outright.
pub fn legacy_cron_to_interval_minutes(cron_expr: &str) -> i32 {
    let fields: Vec<&str> = cron_expr.split_whitespace().collect();
    if fields.len() != 5 {
        return 60;
    }
    let (minute, hour, dom, month, dow) = (fields[0], fields[1], fields[2], fields[3], fields[4]);

    if minute == "0" && hour == "*" && dom == "*" && month == "*" && dow == "*" {
        return 60;
    }
    if minute == "0" && dom == "*" && month == "*" && dow == "*" {
        if let Some(step) = hour.strip_prefix("*/") {
            if let Ok(n) = step.parse::<i32>() {
                return n * 60;
            }
        }
    }
    if minute == "0" && hour == "0" && dom == "*" && month == "*" && dow == "*" {
        return 1440;
    }
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_field_count() {
        assert!(CronSchedule::parse("* * * *").is_err());
    }

    #[test]
    fn every_hour_on_the_hour() {
        let schedule = CronSchedule::parse("0 * * * *").unwrap();
        let after = Utc::now().with_minute(15).unwrap().with_second(0).unwrap();
        let next = schedule.next_after(after).unwrap();
        assert_eq!(next.minute(), 0);
        assert!(next > after);
    }

    #[test]
    fn step_values_expand_correctly() {
        let field = parse_field("*/15", 0, 59).unwrap();
        assert_eq!(field.values, vec![0, 15, 30, 45]);
    }

    #[test]
    fn comma_list_and_range_combine() {
        let field = parse_field("1-3,8", 0, 23).unwrap();
        assert_eq!(field.values, vec![1, 2, 3, 8]);
    }

    #[test]
    fn legacy_migration_hourly() {
        assert_eq!(legacy_cron_to_interval_minutes("0 * * * *"), 60);
    }

    #[test]
    fn legacy_migration_every_n_hours() {
        assert_eq!(legacy_cron_to_interval_minutes("0 */6 * * *"), 360);
    }

    #[test]
    fn legacy_migration_daily() {
        assert_eq!(legacy_cron_to_interval_minutes("0 0 * * *"), 1440);
    }

    #[test]
    fn legacy_migration_unrecognized_defaults_hourly() {
        assert_eq!(legacy_cron_to_interval_minutes("*/5 * * * *"), 60);
    }
}
