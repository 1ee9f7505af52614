use anyhow::{Context, Result};
use tonic::transport::Server;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

use crate::cli::commands::{LoggingConfig, RegisterCommand};
use crate::config::{GatewayConfig, LoggingSettings};
use crate::proto::gateway_service_client::GatewayServiceClient;
use crate::proto::{RegisterRequest, ServiceType};
use crate::service::GatewayServer;

/// Install the global tracing subscriber.
///
/// Console output always goes to stderr; when `settings.directory` is set a
/// daily rolling `rendezvous.log` is written there as well. The returned guard
/// must be kept alive for the file writer to flush.
pub fn init_logging(logging: &LoggingConfig, settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    LogTracer::init().context("Failed to initialize log tracer")?;

    let level = logging.get_effective_level(&settings.level).to_string();
    let filter = || {
        let directives = logging
            .log_filter
            .clone()
            .unwrap_or_else(|| format!("rendezvous_core={level},rendezvous={level},warn"));
        EnvFilter::builder().parse_lossy(directives)
    };

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter());

    let (file, guard) = match &settings.directory {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "rendezvous.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .compact()
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry().with(console).with(file);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to initialize tracing subscriber")?;

    Ok(guard)
}

/// Run the gateway until Ctrl-C.
pub async fn handle_server(config: GatewayConfig) -> Result<()> {
    let addr = config.listen_addr().context("Invalid listen address")?;
    let gateway = GatewayServer::in_memory(&config.session);

    tracing::info!(
        %addr,
        idle_timeout_secs = config.session.idle_timeout_secs,
        outbound_buffer = config.session.outbound_buffer,
        "Starting rendezvous gateway"
    );

    Server::builder()
        .add_service(gateway.into_service())
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Register a service with a running gateway and print the assigned identity.
pub async fn handle_register(cmd: &RegisterCommand) -> Result<()> {
    let service_type = ServiceType::from(cmd.role);
    if service_type == ServiceType::Unknown {
        anyhow::bail!("role must be producer or consumer");
    }

    let mut client = GatewayServiceClient::connect(cmd.endpoint.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", cmd.endpoint))?;

    let response = client
        .register(RegisterRequest {
            service_name: cmd.name.clone(),
            service_type: service_type as i32,
        })
        .await
        .context("Registration rejected")?
        .into_inner();

    if cmd.json {
        let body = serde_json::json!({
            "success": response.success,
            "message": response.message,
            "service_id": response.service_id,
            "service_name": cmd.name,
            "role": cmd.role,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", response.service_id);
    }
    Ok(())
}
