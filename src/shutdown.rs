use crate::components::redis_service::RedisActorHandle;
use crate::components::refresh::CalendarEngine;
use crate::error::EngineResult;
use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Stop the refresh ticker, then the Redis actor
pub async fn shutdown_all(engine: &CalendarEngine, redis_handle: &RedisActorHandle) {
    engine.shutdown().await;

    if let Err(e) = redis_handle.shutdown().await {
        error!("Error shutting down Redis actor: {:?}", e);
    } else {
        info!("Redis actor shut down successfully");
    }
}

/// Wait for a termination signal, then shut everything down
pub async fn handle_signals(engine: CalendarEngine, redis_handle: RedisActorHandle) -> EngineResult<()> {
    wait_for_signal().await?;
    shutdown_all(&engine, &redis_handle).await;
    Ok(())
}

/// Platform-specific signal handling implementation
#[cfg(unix)]
pub async fn wait_for_signal() -> EngineResult<()> {
    // Handle SIGTERM (sent by Kubernetes when pod is terminating)
    let mut sigterm = signal(SignalKind::terminate())?;
    // Handle SIGINT (Ctrl+C)
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT signal, initiating graceful shutdown");
        }
    }
    Ok(())
}

/// Platform-specific signal handling implementation
#[cfg(not(unix))]
pub async fn wait_for_signal() -> EngineResult<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C signal, initiating graceful shutdown");
    Ok(())
}
