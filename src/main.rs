use anyhow::Result;
use clap::Parser;
use fusion_transformers::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fusion_transformers=info".parse()?),
        )
        .init();

    Cli::parse().run()
}
