// Job polling operations

use crate::operations::OperationContext;
use crate::operations::params::{JobIdParams, JobStatusParams};
use crate::router::{HandlerError, Result};
use serde_json::{Value, json};
use tracing::debug;

pub async fn status(ctx: OperationContext, params: JobStatusParams) -> Result<Value> {
    let job = ctx
        .jobs
        .get(&params.job_id)
        .ok_or_else(|| HandlerError::JobNotFound(params.job_id.clone()))?;

    if params.consume && job.status.is_terminal() {
        ctx.jobs.remove(&job.id);
        debug!(job_id = %job.id, "terminal job consumed");
    }
    Ok(serde_json::to_value(job)?)
}

pub async fn cancel(ctx: OperationContext, params: JobIdParams) -> Result<Value> {
    let cancelled = ctx.jobs.cancel(&params.job_id);
    Ok(json!({ "jobId": params.job_id, "cancelled": cancelled }))
}

pub async fn list(ctx: OperationContext) -> Result<Value> {
    Ok(json!({ "jobs": ctx.jobs.list_active() }))
}

pub async fn remove(ctx: OperationContext, params: JobIdParams) -> Result<Value> {
    let removed = ctx.jobs.remove(&params.job_id);
    Ok(json!({ "jobId": params.job_id, "removed": removed }))
}
