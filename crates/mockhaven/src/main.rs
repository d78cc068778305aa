use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Development HTTP server with static serving, wildcard file proxying,
/// and generated ajax mocks.
#[derive(Parser, Debug)]
#[command(name = "mockhaven", author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "mockhaven.yaml")]
    config: String,

    /// Override the configured listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the configured content base directory
    #[arg(long)]
    content_base: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = mockhaven::config::Config::from_file(&args.config)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(content_base) = args.content_base {
        config.content_base = content_base;
    }

    let server = mockhaven::server::DevServer::new(config)?;
    server.run().await
}
