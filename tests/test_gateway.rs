// End-to-end request handling: validation, routing, execution and jobs
// This file should be run with cargo test --test test_gateway
#![allow(dead_code)]

#[path = "../src/comm/mod.rs"]
mod comm;
#[path = "../src/config.rs"]
mod config;
#[path = "../src/executor/mod.rs"]
mod executor;
#[path = "../src/gateway/mod.rs"]
mod gateway;
#[path = "../src/jobs/mod.rs"]
mod jobs;
#[path = "../src/operations/mod.rs"]
mod operations;
#[path = "../src/protocol/mod.rs"]
mod protocol;
#[path = "../src/router/mod.rs"]
mod router;
#[path = "../src/schema/mod.rs"]
mod schema;
#[path = "../src/security/mod.rs"]
mod security;
#[path = "../src/validator/mod.rs"]
mod validator;

use config::GatewayConfig;
use executor::terminate::process_alive;
use executor::{Executor, ResourcePolicy};
use gateway::Gateway;
use jobs::JobRegistry;
use operations::OperationContext;
use protocol::{ErrorCode, Response, ResponseStatus};
use router::{HandlerError, typed};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    });
}

struct Fixture {
    gateway: Gateway,
    jobs: Arc<JobRegistry>,
}

/// Gateway with the built-in operations plus `run.slow` and `run.longtask`
fn create_fixture() -> Fixture {
    let mut config = GatewayConfig::default();
    config.executor.kill_grace_ms = 500;
    config.security.allowed_programs = vec![
        "echo".to_string(),
        "sleep".to_string(),
        "ls".to_string(),
        "openstudio".to_string(),
    ];

    let executor = Arc::new(Executor::new(config.executor.clone()));
    let jobs = Arc::new(JobRegistry::new(config.jobs.clone()));
    let ctx = OperationContext::new(executor.clone(), jobs.clone());
    let mut gateway = Gateway::with_builtin(&config, ctx).unwrap();

    let empty = json!({"type": "object", "properties": {}, "additionalProperties": false});

    let slow_executor = executor.clone();
    gateway
        .register(
            "run.slow",
            empty.clone(),
            typed(move |_: Map<String, Value>| {
                let executor = slow_executor.clone();
                async move {
                    let policy = ResourcePolicy::default().with_timeout_millis(100);
                    let result = executor.execute("sleep", &["5".to_string()], &policy).await;
                    operations::command::execution_outcome(result)
                }
            }),
        )
        .unwrap();

    let long_jobs = jobs.clone();
    gateway
        .register(
            "run.longtask",
            empty,
            typed(move |_: Map<String, Value>| {
                let job = long_jobs.spawn(
                    executor.clone(),
                    "run.longtask",
                    "sleep".to_string(),
                    vec!["30".to_string()],
                    ResourcePolicy::default(),
                );
                async move { Ok::<_, HandlerError>(json!({ "jobId": job.id, "status": job.status })) }
            }),
        )
        .unwrap();

    Fixture { gateway, jobs }
}

async fn send(gateway: &Gateway, request: Value) -> Response {
    gateway
        .handle_line(&request.to_string())
        .await
        .expect("non-blank line yields a response")
}

async fn job_status(gateway: &Gateway, job_id: &str) -> Value {
    let response = send(
        gateway,
        json!({"id": "poll", "type": "job.status", "params": {"jobId": job_id}}),
    )
    .await;
    assert!(response.is_success(), "{:?}", response);
    response.result.unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scenario_safe_echo() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({"id": "1", "type": "noop.echo", "params": {"path": "a/b.txt"}}),
        )
        .await;
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_scenario_traversal_rejected() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({"id": "2", "type": "noop.echo", "params": {"path": "../../etc/passwd"}}),
        )
        .await;
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.error_code(), Some(ErrorCode::SecurityValidationFailed));
    }

    #[tokio::test]
    async fn test_scenario_timeout() {
        init_tracing();
        let f = create_fixture();

        let start = Instant::now();
        let response = send(&f.gateway, json!({"id": "3", "type": "run.slow", "params": {}})).await;
        let elapsed = start.elapsed();

        assert_eq!(response.status, ResponseStatus::Error);
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::CommandFailed);
        assert!(error.message.contains("timed out"), "{}", error.message);
        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);

        let pid = error.details.unwrap()["pid"].as_u64().unwrap() as u32;
        assert!(!process_alive(pid));
    }

    #[tokio::test]
    async fn test_scenario_long_task_cancel() {
        init_tracing();
        let f = create_fixture();

        let started = send(&f.gateway, json!({"id": "4", "type": "run.longtask", "params": {}})).await;
        let job_id = started.result.unwrap()["jobId"].as_str().unwrap().to_string();

        let mut status = Value::Null;
        for _ in 0..100 {
            status = job_status(&f.gateway, &job_id).await;
            if status["status"] == "RUNNING" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status["status"], "RUNNING");
        let pid = status["pid"].as_u64().unwrap() as u32;

        let cancel = send(
            &f.gateway,
            json!({"id": "4c", "type": "job.cancel", "params": {"jobId": job_id}}),
        )
        .await;
        assert_eq!(cancel.result.unwrap()["cancelled"], true);

        let status = job_status(&f.gateway, &job_id).await;
        assert_eq!(status["status"], "CANCELLED");
        assert!(status["endedAt"].is_string());

        // A second cancel is a no-op
        let again = send(
            &f.gateway,
            json!({"id": "4d", "type": "simulation.cancel", "params": {"jobId": job_id}}),
        )
        .await;
        assert_eq!(again.result.unwrap()["cancelled"], false);

        for _ in 0..150 {
            if !process_alive(pid) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!process_alive(pid));
    }

    #[tokio::test]
    async fn test_scenario_unknown_type() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({"id": "5", "type": "does.not.exist", "params": {}}),
        )
        .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::UnknownRequestType);
        let types = error.details.unwrap()["availableTypes"].clone();
        assert!(!types.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_command_run_sync() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({
                "id": "6",
                "type": "command.run",
                "params": {"command": "echo hello", "args": ["world"], "timeoutMillis": "5000"}
            }),
        )
        .await;
        assert!(response.is_success(), "{:?}", response);
        let result = response.result.unwrap();
        assert_eq!(result["stdout"].as_str().unwrap().trim(), "hello world");
        assert_eq!(result["exitCode"], 0);
    }

    #[tokio::test]
    async fn test_command_run_failure_details() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({
                "id": "7",
                "type": "command.run",
                "params": {"command": "ls", "args": ["/nonexistent/simgate"]}
            }),
        )
        .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::CommandFailed);
        let details = error.details.unwrap();
        assert_ne!(details["exitCode"], 0);
        assert!(details["stderr"].as_str().unwrap().contains("nonexistent"));
    }

    #[tokio::test]
    async fn test_command_not_on_allow_list() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({"id": "8", "type": "command.run", "params": {"command": "rm /tmp/x"}}),
        )
        .await;
        assert_eq!(response.error_code(), Some(ErrorCode::SecurityValidationFailed));
    }

    #[tokio::test]
    async fn test_hostile_argument_rejected() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({"id": "9", "type": "command.run", "params": {"command": "echo", "args": ["$(id)"]}}),
        )
        .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::SecurityValidationFailed);
        assert_eq!(error.details.unwrap()["field"], "/args/0");
    }

    #[tokio::test]
    async fn test_out_of_bounds_override() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({"id": "10", "type": "command.run", "params": {"command": "echo", "niceness": 40}}),
        )
        .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::InvalidParameters);
        assert_eq!(error.details.unwrap()["fieldErrors"][0]["path"], "/niceness");
    }

    #[tokio::test]
    async fn test_unknown_param_rejected() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({"id": "11", "type": "noop.echo", "params": {"restricted": false}}),
        )
        .await;
        assert_eq!(response.error_code(), Some(ErrorCode::InvalidParameters));
    }

    #[tokio::test]
    async fn test_background_command_and_consume() {
        init_tracing();
        let f = create_fixture();

        let started = send(
            &f.gateway,
            json!({"id": "12", "type": "command.run", "params": {"command": "echo bg", "background": true}}),
        )
        .await;
        let job_id = started.result.unwrap()["jobId"].as_str().unwrap().to_string();

        let mut status = Value::Null;
        for _ in 0..100 {
            status = job_status(&f.gateway, &job_id).await;
            if status["status"] == "COMPLETE" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status["status"], "COMPLETE");
        assert_eq!(status["result"]["stdout"].as_str().unwrap().trim(), "bg");

        let consumed = send(
            &f.gateway,
            json!({"id": "13", "type": "job.status", "params": {"jobId": job_id, "consume": true}}),
        )
        .await;
        assert!(consumed.is_success());

        let gone = send(
            &f.gateway,
            json!({"id": "14", "type": "job.status", "params": {"jobId": job_id}}),
        )
        .await;
        assert_eq!(gone.error_code(), Some(ErrorCode::JobNotFound));
    }

    #[tokio::test]
    async fn test_job_list_and_remove() {
        init_tracing();
        let f = create_fixture();

        let started = send(&f.gateway, json!({"id": "15", "type": "run.longtask", "params": {}})).await;
        let job_id = started.result.unwrap()["jobId"].as_str().unwrap().to_string();

        let list = send(&f.gateway, json!({"id": "16", "type": "job.list", "params": {}})).await;
        let jobs = list.result.unwrap()["jobs"].clone();
        assert!(jobs.as_array().unwrap().iter().any(|j| j["id"] == job_id.as_str()));

        let removed = send(
            &f.gateway,
            json!({"id": "17", "type": "job.remove", "params": {"jobId": job_id}}),
        )
        .await;
        assert_eq!(removed.result.unwrap()["removed"], true);
        assert!(f.jobs.get(&job_id).is_none());
    }

    #[tokio::test]
    async fn test_simulation_run_missing_workflow() {
        init_tracing();
        let f = create_fixture();

        let response = send(
            &f.gateway,
            json!({"id": "18", "type": "simulation.run", "params": {"workflowPath": "nowhere/workflow.osw"}}),
        )
        .await;
        assert_eq!(response.error_code(), Some(ErrorCode::InvalidParameters));
    }

    #[tokio::test]
    async fn test_simulation_run_starts_job() {
        init_tracing();
        let f = create_fixture();

        let dir = tempfile::tempdir().unwrap();
        let workflow = dir.path().join("workflow.osw");
        std::fs::write(&workflow, "{}").unwrap();

        let response = send(
            &f.gateway,
            json!({
                "id": "19",
                "type": "simulation.run",
                "params": {"workflowPath": workflow.to_string_lossy(), "measuresOnly": true}
            }),
        )
        .await;
        assert!(response.is_success(), "{:?}", response);
        let job_id = response.result.unwrap()["jobId"].as_str().unwrap().to_string();

        // openstudio is usually absent here; either way the job reaches a terminal state
        let mut status = Value::Null;
        for _ in 0..250 {
            status = job_status(&f.gateway, &job_id).await;
            if status["status"] == "COMPLETE" || status["status"] == "FAILED" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(status["status"] == "COMPLETE" || status["status"] == "FAILED");
        assert_eq!(status["operation"], "simulation.run");
    }

    #[tokio::test]
    async fn test_malformed_envelope() {
        init_tracing();
        let f = create_fixture();

        let response = send(&f.gateway, json!({"id": "20", "params": {}})).await;
        assert_eq!(response.error_code(), Some(ErrorCode::InvalidRequestFormat));
        assert_eq!(response.id.as_deref(), Some("20"));

        let garbage = f.gateway.handle_line("not json at all").await.unwrap();
        assert_eq!(garbage.error_code(), Some(ErrorCode::ParseError));
        assert!(garbage.id.is_none());
    }
}
