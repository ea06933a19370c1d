use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging levels accepted on the command line, as used in lhsm_cmd.conf.
pub const LOGGING_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Maps a `--logging-level` value to an `EnvFilter` directive.
pub fn level_directive(level: &str) -> Option<&'static str> {
    match level.to_ascii_uppercase().as_str() {
        "DEBUG" => Some("ct_gdrive=debug,warn"),
        "INFO" => Some("ct_gdrive=info,warn"),
        "WARNING" | "WARN" => Some("ct_gdrive=warn,warn"),
        "ERROR" | "CRITICAL" => Some("ct_gdrive=error,error"),
        _ => None,
    }
}

/// Logs go to stderr, which lhsmtool_cmd collects into its own log.
/// `RUST_LOG` takes precedence over the command line level.
pub fn init_cli_logger(level: &str) {
    let directive = level_directive(level).unwrap_or("ct_gdrive=error,error");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("debug"), Some("ct_gdrive=debug,warn"));
        assert_eq!(level_directive("WARNING"), Some("ct_gdrive=warn,warn"));
        assert_eq!(level_directive("CRITICAL"), level_directive("ERROR"));
        assert!(level_directive("verbose").is_none());
        for level in LOGGING_LEVELS {
            assert!(level_directive(level).is_some());
        }
    }
}
