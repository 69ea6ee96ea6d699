use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// JSON lines when `FEED_ENV` is `production`, human-readable otherwise.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("production") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Filter used when `RUST_LOG` is unset. Crate targets use underscores where the
/// service name has dashes.
pub fn default_filter(service_name: &str) -> String {
    let target = service_name.replace('-', "_");
    format!("info,{target}=debug,feed_shared=debug,tower_http=debug")
}

pub fn init_tracing(service_name: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(service_name)));

    let format = LogFormat::from_env_value(std::env::var("FEED_ENV").ok().as_deref());
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?,
    }

    tracing::info!(service = service_name, format = ?format, "tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_target_uses_crate_name() {
        let filter = default_filter("feed-social");
        assert!(filter.contains("feed_social=debug"));
        assert!(!filter.contains("feed-social"));
    }

    #[test]
    fn only_production_switches_to_json() {
        assert_eq!(LogFormat::from_env_value(Some("production")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("PRODUCTION")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("staging")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Pretty);
    }
}
