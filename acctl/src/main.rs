use acctl::{Application, Config, config::Args, telemetry};
use clap::Parser;
use tokio::signal;

/// Resolves once the process is asked to stop, so in-flight uploads can drain.
async fn stop_requested() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, stopping on Ctrl+C only");
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => tracing::info!("Ctrl+C received, draining connections"),
            _ = sigterm.recv() => tracing::info!("SIGTERM received, draining connections"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        tracing::info!("Ctrl+C received, draining connections");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("{}: configuration OK", args.config);
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::info!(
        config_file = %args.config,
        seeded_accounts = config.accounts.len(),
        "Starting acctl"
    );

    let app = Application::new(config).await?;
    app.serve(stop_requested()).await
}
