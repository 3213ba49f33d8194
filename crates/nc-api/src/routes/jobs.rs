//! `/api/v1/jobs` (§4.6, §6): CRUD plus lifecycle actions
//! (pause/resume/cancel/retry/force-run) and execution/log/stat
//! sub-resources.

use crate::auth::Authenticated;
use crate::common::{ListParams, PaginatedResponse, SuccessResponse};
use crate::error::{ApiError, Result};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use nc_domain::{DispatchTrigger, Job, JobExecution, JobStatus, ScheduleType};
use nc_storage::{JobExecutionRepository, JobRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

#[derive(Clone)]
pub struct JobsState {
    pub jobs: Arc<JobRepository>,
    pub executions: Arc<JobExecutionRepository>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJobRequest {
    pub source_id: Uuid,
    pub schedule_type: ScheduleType,
    pub interval_minutes: Option<i32>,
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub trigger: DispatchTrigger,
    #[serde(default = "default_priority")]
    pub priority: i16,
    #[serde(default)]
    pub depends_on: Vec<Uuid>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: i32,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: i64,
}

fn default_priority() -> i16 {
    50
}

fn default_timeout_seconds() -> i32 {
    300
}

fn default_max_retries() -> i32 {
    3
}

fn default_retry_backoff_seconds() -> i64 {
    30
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateJobRequest {
    pub schedule_type: Option<ScheduleType>,
    pub interval_minutes: Option<i32>,
    pub cron_expression: Option<String>,
    pub trigger: Option<DispatchTrigger>,
    pub priority: Option<i16>,
    pub depends_on: Option<Vec<Uuid>>,
    pub timeout_seconds: Option<i32>,
    pub max_retries: Option<i32>,
}

#[utoipa::path(
    get, path = "", tag = "jobs",
    params(ListParams),
    responses((status = 200, description = "List jobs", body = PaginatedResponse<Job>))
)]
pub async fn list_jobs(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Job>>> {
    let data = state.jobs.list(params.limit(), params.offset()).await?;
    let total = state.jobs.count().await?;
    Ok(Json(PaginatedResponse::new(data, &params, total)))
}

#[utoipa::path(
    post, path = "", tag = "jobs",
    request_body = CreateJobRequest,
    responses((status = 201, body = Job), (status = 400, description = "Invalid job configuration"))
)]
pub async fn create_job(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<Job>> {
    let job = Job {
        id: Uuid::new_v4(),
        source_id: req.source_id,
        schedule_type: req.schedule_type,
        interval_minutes: req.interval_minutes,
        cron_expression: req.cron_expression,
        trigger: req.trigger,
        priority: req.priority,
        status: JobStatus::Pending,
        next_run_at: Some(Utc::now()),
        last_run_at: None,
        max_retries: req.max_retries,
        retry_backoff_seconds: req.retry_backoff_seconds,
        current_retry_count: 0,
        failure_count: 0,
        backoff_until: None,
        auto_managed: false,
        depends_on: req.depends_on,
        timeout_seconds: req.timeout_seconds,
        pre_pause_status: None,
    };
    job.validate().map_err(ApiError::validation)?;
    state.jobs.insert(&job).await?;
    Ok(Json(job))
}

#[utoipa::path(
    get, path = "/{id}", tag = "jobs",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = Job), (status = 404, description = "Job not found"))
)]
pub async fn get_job(State(state): State<JobsState>, _auth: Authenticated, Path(id): Path<Uuid>) -> Result<Json<Job>> {
    let job = state.jobs.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Job", id.to_string()))?;
    Ok(Json(job))
}

#[utoipa::path(
    put, path = "/{id}", tag = "jobs",
    params(("id" = Uuid, Path)),
    request_body = UpdateJobRequest,
    responses((status = 200, body = Job), (status = 404, description = "Job not found"))
)]
pub async fn update_job(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<Job>> {
    let mut job = state.jobs.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Job", id.to_string()))?;

    if let Some(schedule_type) = req.schedule_type {
        job.schedule_type = schedule_type;
    }
    if req.interval_minutes.is_some() {
        job.interval_minutes = req.interval_minutes;
    }
    if req.cron_expression.is_some() {
        job.cron_expression = req.cron_expression;
    }
    if let Some(trigger) = req.trigger {
        job.trigger = trigger;
    }
    if let Some(priority) = req.priority {
        job.priority = priority;
    }
    if let Some(depends_on) = req.depends_on {
        job.depends_on = depends_on;
    }
    if let Some(timeout_seconds) = req.timeout_seconds {
        job.timeout_seconds = timeout_seconds;
    }
    if let Some(max_retries) = req.max_retries {
        job.max_retries = max_retries;
    }

    job.validate().map_err(ApiError::validation)?;
    state.jobs.update_config(&job).await?;
    Ok(Json(job))
}

#[utoipa::path(
    delete, path = "/{id}", tag = "jobs",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = SuccessResponse), (status = 404, description = "Job not found"))
)]
pub async fn delete_job(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>> {
    state.jobs.delete(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

macro_rules! job_action {
    ($name:ident, $path:literal, $method:ident) => {
        #[utoipa::path(
            post, path = $path, tag = "jobs",
            params(("id" = Uuid, Path)),
            responses((status = 200, body = SuccessResponse), (status = 404, description = "Job not found"))
        )]
        pub async fn $name(
            State(state): State<JobsState>,
            _auth: Authenticated,
            Path(id): Path<Uuid>,
        ) -> Result<Json<SuccessResponse>> {
            state.jobs.$method(id).await?;
            Ok(Json(SuccessResponse::ok()))
        }
    };
}

job_action!(cancel_job, "/{id}/cancel", cancel);
job_action!(force_run_job, "/{id}/force-run", force_run);
job_action!(retry_job, "/{id}/retry", retry);

#[utoipa::path(
    post, path = "/{id}/pause", tag = "jobs",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = SuccessResponse), (status = 404, description = "Job not found"))
)]
pub async fn pause_job(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>> {
    state.jobs.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Job", id.to_string()))?;
    state.jobs.pause(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    post, path = "/{id}/resume", tag = "jobs",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = SuccessResponse), (status = 404, description = "Job not found"))
)]
pub async fn resume_job(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>> {
    state.jobs.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Job", id.to_string()))?;
    state.jobs.resume(id, Utc::now()).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    get, path = "/{id}/executions", tag = "jobs",
    params(("id" = Uuid, Path), ListParams),
    responses((status = 200, description = "Job execution history", body = PaginatedResponse<JobExecution>))
)]
pub async fn list_executions(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<JobExecution>>> {
    let data = state.executions.list_for_job(id, params.limit(), params.offset()).await?;
    let total = state.executions.count_for_job(id).await?;
    Ok(Json(PaginatedResponse::new(data, &params, total)))
}

/// `GET /jobs/:id/logs`: the latest execution's error/stack trace, the
/// only per-job log surface this pipeline persists inline (§6; full logs
/// that were rotated to object storage are pointed to by
/// `JobExecution.archived_log` rather than served here).
#[derive(Debug, Serialize, ToSchema)]
pub struct JobLogsResponse {
    pub execution_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub stack_trace: Option<String>,
}

#[utoipa::path(
    get, path = "/{id}/logs", tag = "jobs",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = JobLogsResponse))
)]
pub async fn get_job_logs(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<JobLogsResponse>> {
    let latest = state.executions.latest_for_job(id).await?;
    Ok(Json(match latest {
        Some(exec) => JobLogsResponse {
            execution_id: Some(exec.id),
            error_message: exec.error_message,
            stack_trace: exec.stack_trace,
        },
        None => JobLogsResponse { execution_id: None, error_message: None, stack_trace: None },
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatsResponse {
    pub total_executions: i64,
    pub failure_count: i32,
    pub current_retry_count: i32,
    pub last_run_at: Option<chrono::DateTime<Utc>>,
    pub next_run_at: Option<chrono::DateTime<Utc>>,
    pub status: JobStatus,
}

#[utoipa::path(
    get, path = "/{id}/stats", tag = "jobs",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = JobStatsResponse), (status = 404, description = "Job not found"))
)]
pub async fn get_job_stats(
    State(state): State<JobsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatsResponse>> {
    let job = state.jobs.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Job", id.to_string()))?;
    let total_executions = state.executions.count_for_job(id).await?;
    Ok(Json(JobStatsResponse {
        total_executions,
        failure_count: job.failure_count,
        current_retry_count: job.current_retry_count,
        last_run_at: job.last_run_at,
        next_run_at: job.next_run_at,
        status: job.status,
    }))
}

pub fn jobs_router(state: JobsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_jobs, create_job))
        .routes(routes!(get_job, update_job, delete_job))
        .routes(routes!(pause_job))
        .routes(routes!(resume_job))
        .routes(routes!(cancel_job))
        .routes(routes!(retry_job))
        .routes(routes!(force_run_job))
        .routes(routes!(list_executions))
        .routes(routes!(get_job_logs))
        .routes(routes!(get_job_stats))
        .with_state(state)
}
