use std::sync::Arc;

mod api;
mod config;
mod error;
mod http;
mod logger;
mod probe;
mod server;
mod store;
mod timefmt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Values from .env never override variables already set in the process
    dotenvy::dotenv().ok();

    let cfg = config::Config::load()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(config::AppState::new(cfg));
    server::start_signal_handler(Arc::clone(&state.shutdown_signal))?;

    server::start_server_loop(listener, state).await;

    Ok(())
}
