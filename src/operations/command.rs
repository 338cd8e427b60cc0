// Process-backed operations: command.run and simulation.run

use crate::executor::ExecutionResult;
use crate::operations::OperationContext;
use crate::operations::params::{CommandRunParams, SimulationRunParams};
use crate::executor::PolicyOverrides;
use crate::router::{HandlerError, Result};
use serde_json::{Value, json};
use tracing::info;

pub async fn run_command(ctx: OperationContext, params: CommandRunParams) -> Result<Value> {
    let (program, args) = params
        .argv()
        .ok_or_else(|| HandlerError::InvalidParameters("command is empty".to_string()))?;
    let policy = ctx
        .executor
        .config()
        .bounded_policy(params.overrides())
        .map_err(|e| HandlerError::InvalidParameters(e.to_string()))?;

    if params.background {
        let job = ctx
            .jobs
            .spawn(ctx.executor.clone(), "command.run", program, args, policy);
        return Ok(json!({ "jobId": job.id, "status": job.status }));
    }

    let result = ctx.executor.execute(&program, &args, &policy).await;
    execution_outcome(result)
}

pub async fn run_simulation(ctx: OperationContext, params: SimulationRunParams) -> Result<Value> {
    let workflow = &params.workflow_path;
    if !workflow.is_file() {
        return Err(HandlerError::InvalidParameters(
            "workflowPath does not name an existing file".to_string(),
        ));
    }

    // The simulator writes its run directory next to the workflow
    let working_directory = workflow
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.to_path_buf());

    let config = ctx.executor.config();
    let policy = config
        .bounded_policy(PolicyOverrides {
            working_directory,
            timeout_millis: params.timeout_millis,
            memory_limit_mb: params.memory_limit_mb,
            ..Default::default()
        })
        .map_err(|e| HandlerError::InvalidParameters(e.to_string()))?;

    let program = config.simulator_program.clone();
    let job = ctx.jobs.spawn(
        ctx.executor.clone(),
        "simulation.run",
        program,
        params.simulator_args(),
        policy,
    );
    info!(job_id = %job.id, measures_only = params.measures_only, "simulation started");

    Ok(json!({ "jobId": job.id, "status": job.status }))
}

/// Successful runs return the whole result; anything else is COMMAND_FAILED
pub fn execution_outcome(result: ExecutionResult) -> Result<Value> {
    if result.success {
        return Ok(serde_json::to_value(result)?);
    }

    let message = match &result.error {
        Some(reason) => format!("Command failed: {}", reason),
        None => format!("Command failed with exit code {}", result.exit_code),
    };
    Err(HandlerError::CommandFailed {
        message,
        details: Some(json!({
            "exitCode": result.exit_code,
            "stderr": result.stderr,
            "stdout": result.stdout,
            "elapsedMillis": result.elapsed_millis,
            "timedOut": result.timed_out,
            "truncated": result.truncated,
            "pid": result.pid,
        })),
    })
}
