use std::sync::Arc;

use cdn_server::config::{AppState, Config};
use cdn_server::{logger, server, storage};
use clap::Parser;

/// Authenticated HTTP file server
#[derive(Parser, Debug)]
#[command(name = "cdn_server", version, about)]
struct Args {
    /// Configuration file (format follows the extension)
    #[arg(short, long, env = "CDN_CONFIG", default_value = "config.json")]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = Config::load_from(&args.config)?;
    logger::init(&cfg.logging)?;

    // Build the Tokio runtime, sizing worker threads from configuration
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.performance.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    logger::log_server_start(&addr, &cfg);
    match storage::list_upload_dir(&cfg.uploads_dir).await {
        Ok(files) => logger::log_upload_dir_contents(&cfg.uploads_dir, &files),
        Err(e) => logger::log_warning(&format!(
            "Could not list upload directory {}: {e}",
            cfg.uploads_dir.display()
        )),
    }

    let state = Arc::new(AppState::new(cfg));

    server::start_server_loop(listener, state, server::signal::shutdown_signal()).await;

    Ok(())
}
