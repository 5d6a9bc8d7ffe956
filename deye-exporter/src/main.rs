//! Prometheus exporter for Deye inverters

use std::process::ExitCode;

use clap::Parser;

use deye_exporter::{Cli, DeyeCatalog, RegisterCatalog, Settings};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();

    if cli.list() {
        let catalog = DeyeCatalog::new();
        for name in catalog.names() {
            if let Some(register) = catalog.resolve(&name) {
                println!(
                    "{name:<32} {:>5}  {}",
                    register.address,
                    register.description().unwrap_or("-")
                );
            }
        }
        return ExitCode::SUCCESS;
    }

    let result = match Settings::from_process(&cli) {
        Ok(settings) => deye_exporter::run(settings).await,
        Err(err) => Err(err.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
