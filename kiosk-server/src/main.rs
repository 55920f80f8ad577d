use anyhow::Result;
use kiosk::{LoadTest, StopHandle, WorkflowGateway, stop_channel};
use kiosk_client::{ClientBuilder, KioskGateway};
use kiosk_server::config::Config;
use kiosk_server::metrics::Metrics;
use kiosk_server::transport::{
    Transport,
    http::{AppState, HttpTransport},
};
use kiosk_server::workflows;
use std::sync::Arc;
use tokio::task::JoinSet;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("kiosk={}", config.log_level).parse()?),
        )
        .init();

    let mut builder = ClientBuilder::new().connect_timeout(config.conductor.connect_timeout);
    if let Some(token) = &config.conductor.token {
        tracing::info!("Using token from configuration.");
        builder = builder.token(token.clone());
    }
    let client = builder.build(&config.conductor.endpoint)?;

    let published = match &config.workflow.definitions_dir {
        Some(dir) => workflows::publish_definitions(&client, dir).await?,
        None => Vec::new(),
    };
    let workflow = workflows::resolve_workflow(
        &published,
        &config.workflow.name,
        config.workflow.version,
    );
    tracing::info!(
        "Orders start workflow '{}' version {}",
        workflow.name,
        workflow.version
    );

    if config.cleanup {
        let terminated = client.cleanup_running().await?;
        tracing::info!("Cleanup terminated {} running workflows.", terminated);
    }

    let gateway: Arc<dyn WorkflowGateway> = Arc::new(KioskGateway::new(
        client,
        workflow,
        config.workflow.api_test_uri.clone(),
    ));
    let state = Arc::new(AppState::new(
        Arc::clone(&gateway),
        config.transient_retry(),
        Arc::new(Metrics::new()),
    ));

    let (server_stop, server_shutdown) = stop_channel();

    // Create a set to manage the listener and the load test
    let mut tasks = JoinSet::new();

    {
        let transport = HttpTransport::new(&config.http.host, config.http.port)?;
        let state = Arc::clone(&state);
        tasks.spawn(async move { transport.start(state, server_shutdown).await });
    }

    match config.load_test {
        Some(load_config) => {
            let load_test = LoadTest::new(load_config, gateway);
            state.attach_load_test(load_test.tracker());

            let (load_stop, load_token) = stop_channel();
            stop_on_ctrl_c(load_stop, "Stopping load test; waiting for in-flight workflows");

            tasks.spawn(async move {
                let summary = load_test.run(load_token).await;
                tracing::info!(
                    "Achieved {:.2} workflows per second over {:.1}s.",
                    summary.achieved_rate_per_second,
                    summary.elapsed_seconds
                );

                server_stop.stop();
                Ok(())
            });
        }
        None => stop_on_ctrl_c(server_stop, "Stopping HTTP server"),
    }

    // Wait for the listener and the load test to finish
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("Task failed: {}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::error!("Task panicked: {}", e);
                return Err(anyhow::anyhow!("Task panicked"));
            }
        }
    }

    Ok(())
}

/// Signal `handle` on the first Ctrl-C
fn stop_on_ctrl_c(handle: StopHandle, message: &'static str) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("{}", message);
            handle.stop();
        }
    });
}
