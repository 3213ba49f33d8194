//! `next_run_at` recomputation, per schedule type (§4.1 step 4).

use chrono::{DateTime, Utc};
use nc_domain::{Job, ScheduleType};

use crate::cron::CronSchedule;
use crate::error::{Result, SchedulerError};

/// `interval -> now + N`; `cron -> next cron tick >= now`; `immediate` and
/// `event` both yield `None` — immediate jobs don't reschedule themselves,
/// event jobs only fire when their trigger does.
pub fn compute_next_run_at(job: &Job, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    match job.schedule_type {
        ScheduleType::Interval => {
            let minutes = job.interval_minutes.ok_or_else(|| {
                SchedulerError::Validation(format!("job {} is schedule_type=interval with no interval_minutes", job.id))
            })?;
            Ok(Some(now + chrono::Duration::minutes(minutes as i64)))
        }
        ScheduleType::Cron => {
            let expr = job.cron_expression.as_deref().ok_or_else(|| {
                SchedulerError::Validation(format!("job {} is schedule_type=cron with no cron_expression", job.id))
            })?;
            let schedule = CronSchedule::parse(expr)?;
            Ok(schedule.next_after(now))
        }
        ScheduleType::Immediate | ScheduleType::Event => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_domain::{DispatchTrigger, JobStatus};
    use uuid::Uuid;

    fn base_job() -> Job {
        Job {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            schedule_type: ScheduleType::Interval,
            interval_minutes: Some(30),
            cron_expression: None,
            trigger: DispatchTrigger::default(),
            priority: 50,
            status: JobStatus::Running,
            next_run_at: None,
            last_run_at: None,
            max_retries: 3,
            retry_backoff_seconds: 30,
            current_retry_count: 0,
            failure_count: 0,
            backoff_until: None,
            auto_managed: false,
            depends_on: vec![],
            timeout_seconds: 300,
            pre_pause_status: None,
        }
    }

    #[test]
    fn interval_adds_minutes() {
        let job = base_job();
        let now = Utc::now();
        let next = compute_next_run_at(&job, now).unwrap().unwrap();
        assert_eq!((next - now).num_minutes(), 30);
    }

    #[test]
    fn immediate_and_event_never_reschedule() {
        let mut job = base_job();
        job.schedule_type = ScheduleType::Immediate;
        assert!(compute_next_run_at(&job, Utc::now()).unwrap().is_none());
        job.schedule_type = ScheduleType::Event;
        job.trigger.channel_name = Some("articles:classified".to_string());
        assert!(compute_next_run_at(&job, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn cron_without_expression_is_rejected() {
        let mut job = base_job();
        job.schedule_type = ScheduleType::Cron;
        job.cron_expression = None;
        assert!(compute_next_run_at(&job, Utc::now()).is_err());
    }
}
