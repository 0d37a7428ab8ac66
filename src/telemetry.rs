use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// Local play-testing gets compact human-readable lines; production gets
/// flattened JSON so table and session lifecycle fields (`table_id`,
/// `conn_id`, error codes) stay machine-searchable. `RUST_LOG` overrides
/// the default filter, which quiets per-connection websocket chatter
/// without hiding table events.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,actix_http=warn,mio=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_span_list(false)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry.with(fmt::layer().compact().with_target(false)).init();
    }
}
