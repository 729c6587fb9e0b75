use std::sync::Arc;

use anyhow::Context;
use delivery_gateway::config::GatewayConfig;
use delivery_gateway::consumer::{GroupRunner, ResultHandler, RunnerState};
use delivery_gateway::routes::configure_routes;
use delivery_gateway::shutdown;
use delivery_gateway::storage::{ResultRepository, ResultStore, StorageError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = GatewayConfig::from_env()?;
    tracing::info!(
        brokers = ?cfg.kafka_brokers,
        group_id = %cfg.kafka_group_id,
        topics = ?cfg.kafka_topics,
        "delivery_gateway_starting"
    );

    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    // Startup below can block for the whole connect timeout
    shutdown::cancel_on(shutdown::ctrl_c(), cancel.clone());

    let store = match ResultStore::connect(&cfg.postgres, &cancel).await {
        Ok(store) => store,
        Err(StorageError::Cancelled) => {
            tracing::info!("delivery_gateway_stopped_during_startup");
            return Ok(());
        }
        Err(e) => return Err(e).context("result store unavailable"),
    };
    let repository: Arc<dyn ResultRepository> = Arc::new(store.clone());

    let handler = Arc::new(ResultHandler::new(Arc::clone(&repository)));
    let group = cfg.consumer_group();
    let topics = cfg.kafka_topics.clone();
    let runner = tokio::select! {
        _ = cancel.cancelled() => {
            store.close();
            tracing::info!("delivery_gateway_stopped_during_startup");
            return Ok(());
        }
        runner = GroupRunner::from_config(&group, topics, handler) => {
            runner.context("consumer group unavailable")?
        }
    };
    let mut runner = runner
        .with_retry_policy(cfg.retry_policy())
        .run(cancel.clone(), &tracker);

    let routes = configure_routes(repository);
    tracing::info!(addr = %cfg.http_addr, "http_server_listening");

    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::info!("delivery_gateway_shutdown");
        }
        _ = warp::serve(routes).run(cfg.http_addr) => {
            tracing::error!("http_server_exited");
        }
        _ = runner.wait_for_state(RunnerState::Stopped) => {
            tracing::error!("consumer_group_stopped");
        }
    }

    cancel.cancel();
    tracker.close();
    tracker.wait().await;

    let outcome = runner.join().await;
    store.close();

    if let Err(e) = outcome {
        tracing::error!(error = %e, "consumer_group_failed");
        return Err(e.into());
    }

    tracing::info!("delivery_gateway_stopped");
    Ok(())
}
