mod comm;
mod config;
mod executor;
mod gateway;
mod jobs;
mod operations;
mod protocol;
mod router;
mod schema;
mod security;
mod validator;

use comm::{Server, Transport, serve_stdio};
use config::GatewayConfig;
use executor::Executor;
use gateway::Gateway;
use jobs::JobRegistry;
use operations::OperationContext;
use std::sync::Arc;
use tokio::signal;
use tracing::{Level, error, info};
use tracing_subscriber::fmt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::load()?;

    // Logs go to stderr; stdout belongs to the stdio transport
    fmt()
        .with_max_level(config.level().unwrap_or(Level::INFO))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting simgate daemon...");
    info!(
        transport = ?config.comm.transport,
        restricted = config.executor.restricted,
        default_timeout_ms = config.executor.default_timeout_ms,
        simulator = %config.executor.simulator_program,
        "Configuration loaded"
    );

    let executor = Arc::new(Executor::new(config.executor.clone()));
    let jobs = Arc::new(JobRegistry::new(config.jobs.clone()));
    let reaper = jobs.start_reaper();

    let ctx = OperationContext::new(Arc::clone(&executor), Arc::clone(&jobs));
    let gateway = Arc::new(Gateway::with_builtin(&config, ctx)?);
    info!(operations = ?gateway.available_types(), "Gateway initialized");

    let serve = {
        let gateway = Arc::clone(&gateway);
        let comm = config.comm.clone();
        async move {
            match comm.transport {
                Transport::Tcp => {
                    let server = Server::bind(&comm, gateway).await?;
                    server.run().await?;
                }
                Transport::Stdio => {
                    serve_stdio(gateway).await?;
                    info!("stdin closed");
                }
            }
            Ok::<(), Box<dyn std::error::Error>>(())
        }
    };

    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                error!(error = %e, "Transport failed");
            }
        }
        // Handle Ctrl+C / SIGTERM
        _ = shutdown_signal() => {
            info!("Received shutdown signal");
        }
    }

    info!("Starting shutdown...");
    let cancelled = jobs.cancel_all();
    info!(cancelled = cancelled, "Active jobs cancelled");

    // Give cancelled jobs their grace period to terminate their process groups
    let grace = std::time::Duration::from_millis(config.executor.kill_grace_ms + 500);
    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        if jobs.unsettled() == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    reaper.abort();
    info!("Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                signal::ctrl_c().await.ok();
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.ok();
    }
}
