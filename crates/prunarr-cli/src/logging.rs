use anyhow::Result;
use std::io;
use std::io::IsTerminal;
use std::path::Path;
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Filter directives for the verbosity flags. `RUST_LOG` wins unless `-q` is given.
fn filter_for(verbose_level: u8, quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    let default = match verbose_level {
        0 => "info",
        // -v: debug without the hyper connection chatter
        1 => "debug,hyper::proto::h1=warn,hyper::client::pool=warn,reqwest::connect=info",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// JSON when `PRUNARR_LOG_JSON=true`, else the config's choice, else when stdout is not a terminal
fn use_json(configured: Option<bool>) -> bool {
    match std::env::var("PRUNARR_LOG_JSON") {
        Ok(value) => value.eq_ignore_ascii_case("true"),
        Err(_) => configured.unwrap_or_else(|| !io::stdout().is_terminal()),
    }
}

/// Rotation prefix for a log path: `prunarr` for `prunarr.log`
fn rotation_prefix(log_path: &Path) -> Result<(&Path, &str)> {
    let log_dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let log_filename = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log filename: {}", log_path.display()))?;
    let prefix = log_filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(log_filename);
    Ok((log_dir, prefix))
}

pub fn init_logging(verbose_level: u8, quiet: bool, json: Option<bool>, log_file: Option<&Path>) -> Result<()> {
    let json = use_json(json);
    let registry = Registry::default().with(filter_for(verbose_level, quiet));

    if let Some(log_path) = log_file {
        let (log_dir, prefix) = rotation_prefix(log_path)?;
        std::fs::create_dir_all(log_dir)?;

        // prunarr.log, prunarr.2024-06-01, ...
        let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, prefix);

        if json {
            let json_layer = fmt::layer()
                .json()
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(file_appender);
            registry.with(json_layer).init();
        } else {
            let fmt_layer = fmt::layer()
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_writer(file_appender);
            registry.with(fmt_layer).init();
        }
    } else if json {
        let json_layer = fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);
        registry.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);
        registry.with(fmt_layer).init();
    }

    Ok(())
}
