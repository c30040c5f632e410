use anyhow::Context;

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .init()
        .context("failed to build logger instance")?;

    let channels = kbs_bridge::BridgeChannels::default();
    let backend = kbs_backend::run(channels.backend_rx, channels.backend_tx);
    let result = kbs_console::run(channels.frontend_rx, channels.frontend_tx);

    // the console dropped its sender, so the backend is tearing down
    if backend.join().is_err() {
        log::error!("Backend thread panicked");
    }
    result.context("failed to run frontend")
}
