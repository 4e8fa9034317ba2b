mod app;
mod logging;
mod shutdown;

use std::process::ExitCode;

use clap::Parser;
use immich_common::{Config, config::ConfigOverrides};

/// Flags take precedence over the matching environment variables.
#[derive(Parser)]
#[command(name = "immich-exporter", about = "Prometheus exporter for immich", version)]
struct Cli {
    #[arg(long)]
    immich_host: Option<String>,

    #[arg(long)]
    immich_port: Option<String>,

    #[arg(long)]
    immich_api_token: Option<String>,

    #[arg(long)]
    exporter_port: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    metrics_prefix: Option<String>,

    #[arg(long)]
    request_timeout_secs: Option<String>,

    #[arg(long)]
    version_attempts: Option<String>,
}

impl From<Cli> for ConfigOverrides {
    fn from(cli: Cli) -> Self {
        Self {
            immich_host: cli.immich_host,
            immich_port: cli.immich_port,
            immich_api_token: cli.immich_api_token,
            exporter_port: cli.exporter_port,
            log_level: cli.log_level,
            metrics_prefix: cli.metrics_prefix,
            request_timeout_secs: cli.request_timeout_secs,
            version_attempts: cli.version_attempts,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let logs = logging::init();
    let cli = Cli::parse();
    let shutdown = shutdown::install();

    let config = Config::from_env(cli.into());
    ExitCode::from(app::run(config, Some(&logs), shutdown).await)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "immich-exporter",
            "--immich-host",
            "photos.lan",
            "--metrics-prefix",
            "family",
        ]);

        let overrides = ConfigOverrides::from(cli);

        assert_eq!(overrides.immich_host.as_deref(), Some("photos.lan"));
        assert_eq!(overrides.metrics_prefix.as_deref(), Some("family"));
        assert!(overrides.immich_api_token.is_none());
    }
}
