use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use micro_nio::config::{DEFAULT_BUFFER_INITIAL_CAPACITY, DEFAULT_PORT};
use micro_nio::{Server, ServerConfig};
use micro_nio_http::HttpFramerFactory;
use micro_nio_http::demo::demo_handler;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "micro-nio-http")]
#[command(version)]
#[command(about = "HTTP/1.0 demo server answering every request with a fixed page", long_about = None)]
struct Cli {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Initial receive buffer size per connection, in bytes
    #[arg(long, default_value_t = DEFAULT_BUFFER_INITIAL_CAPACITY)]
    buffer_size: usize,
    /// Read poll timeout; 0 busy-loops for the lowest latency
    #[arg(long, default_value_t = 0)]
    poll_timeout_ms: u64,
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    let config = match ServerConfig::builder()
        .port(cli.port)
        .buffer_initial_capacity(cli.buffer_size)
        .poll_timeout(Duration::from_millis(cli.poll_timeout_ms))
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            error!(cause = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let handle = match Server::new(config, HttpFramerFactory::new(), demo_handler()).start() {
        Ok(handle) => handle,
        Err(e) => {
            error!(cause = %e, "start server error");
            return ExitCode::FAILURE;
        }
    };

    info!(address = %handle.local_addr(), "welcome to micro-nio http server");
    handle.join();
    ExitCode::SUCCESS
}
