use std::time::Duration;

use streamsage_core::{ClientConfig, Provider, ProviderError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Legacy single-key variable, honoured for Gemini only.
const LEGACY_KEY_VAR: &str = "API_KEY";

/// Filter used when `RUST_LOG` is unset. Info-level cycle logs would fight
/// the spinner for stderr, so only warnings show by default.
fn default_filter(verbose: bool) -> &'static str {
    if verbose { "streamsage=debug" } else { "streamsage=warn" }
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays usable
/// for `--json` output.
pub fn init_logging(verbose: bool) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(env_filter)
            .init();
    }
}

fn lookup_key(provider: Provider, var: &str) -> Option<String> {
    std::env::var(var).ok().or_else(|| {
        (provider == Provider::Gemini)
            .then(|| std::env::var(LEGACY_KEY_VAR).ok())
            .flatten()
    })
}

/// Build the client configuration from the environment and CLI overrides.
pub fn client_config(
    provider: Provider,
    model: Option<String>,
    timeout: Duration,
    retries: u32,
) -> Result<ClientConfig, ProviderError> {
    let mut config = ClientConfig::from_lookup(provider, |var| lookup_key(provider, var))?
        .with_timeout(timeout)
        .with_max_retries(retries);

    if let Some(model) = model {
        config = config.with_model(model);
    }
    if let Ok(base_url) = std::env::var("STREAMSAGE_BASE_URL") {
        config = config.with_base_url(base_url);
    }

    Ok(config)
}
