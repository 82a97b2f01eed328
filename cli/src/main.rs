//! Command-line entry point for the TurnKey EC2 image build tool.
//!
//! Sets up tracing and delegates to [`tkl_ec2_lib::cli`].

use anyhow::Result;

fn init_tracing() {
    // Don't include timestamps and such because they're not really useful and
    // too verbose, and plus several log targets such as journald will already
    // include timestamps.
    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_target(false)
        .compact();
    // BT_DEBUG is the historical debugging switch; it bumps the default
    // level unless RUST_LOG overrides it.
    let default_directive = if std::env::var_os("BT_DEBUG").is_some() {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    // Log to stderr by default
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(format)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    init_tracing();
    tracing::trace!("starting");
    tkl_ec2_lib::cli::run_from_iter(std::env::args()).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
