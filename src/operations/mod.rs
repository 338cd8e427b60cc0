// Operations module - the built-in operation handlers
// Each operation registers a closed schema and a typed handler together.

pub mod command;
pub mod jobs;
pub mod params;
pub mod schemas;

use crate::executor::Executor;
use crate::gateway::{Catalogue, Gateway, Result};
use crate::jobs::JobRegistry;
use crate::router::typed;
use params::{CommandRunParams, JobIdParams, JobStatusParams, NoParams, SimulationRunParams};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::info;

/// Shared state handed to every built-in handler
#[derive(Clone)]
pub struct OperationContext {
    pub executor: Arc<Executor>,
    pub jobs: Arc<JobRegistry>,
}

impl OperationContext {
    pub fn new(executor: Arc<Executor>, jobs: Arc<JobRegistry>) -> Self {
        Self { executor, jobs }
    }
}

/// Register every built-in operation on `gateway`
pub fn register_builtin(gateway: &mut Gateway, ctx: OperationContext) -> Result<()> {
    let config = ctx.executor.config().clone();

    gateway.register(
        "noop.echo",
        schemas::noop_echo(),
        typed(|params: Map<String, Value>| async move { Ok(json!({ "echo": params })) }),
    )?;

    let c = ctx.clone();
    gateway.register(
        "command.run",
        schemas::command_run(&config),
        typed(move |p: CommandRunParams| command::run_command(c.clone(), p)),
    )?;

    let c = ctx.clone();
    gateway.register(
        "simulation.run",
        schemas::simulation_run(&config),
        typed(move |p: SimulationRunParams| command::run_simulation(c.clone(), p)),
    )?;

    for op_type in ["job.status", "simulation.status"] {
        let c = ctx.clone();
        gateway.register(
            op_type,
            schemas::job_status(),
            typed(move |p: JobStatusParams| jobs::status(c.clone(), p)),
        )?;
    }

    for op_type in ["job.cancel", "simulation.cancel"] {
        let c = ctx.clone();
        gateway.register(
            op_type,
            schemas::job_id(),
            typed(move |p: JobIdParams| jobs::cancel(c.clone(), p)),
        )?;
    }

    let c = ctx.clone();
    gateway.register(
        "job.list",
        schemas::job_list(),
        typed(move |_: NoParams| jobs::list(c.clone())),
    )?;

    let c = ctx;
    gateway.register(
        "job.remove",
        schemas::job_id(),
        typed(move |p: JobIdParams| jobs::remove(c.clone(), p)),
    )?;

    let catalogue = gateway.catalogue();
    gateway.register(
        "gateway.operations",
        schemas::gateway_operations(),
        typed(move |_: NoParams| {
            let catalogue = Arc::clone(&catalogue);
            async move { Ok(json!({ "operations": list_operations(&catalogue) })) }
        }),
    )?;

    info!(operations = gateway.operation_count(), "built-in operations registered");
    Ok(())
}

/// `[{type, schema}]` sorted by type
fn list_operations(catalogue: &Catalogue) -> Vec<Value> {
    let entries = catalogue
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    entries
        .iter()
        .map(|(op_type, schema)| json!({ "type": op_type, "schema": schema }))
        .collect()
}
