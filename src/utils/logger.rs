use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日誌。輸出一律走 stderr，stdout 只留給命令結果。
///
/// `RUST_LOG` overrides the default filter; `json` switches to one JSON object
/// per line for log collectors.
pub fn init_logger(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "storage_adapter=debug,info"
    } else {
        "storage_adapter=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (json_layer, compact_layer) = if json {
        (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .json(),
            ),
            None,
        )
    } else {
        (
            None,
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            ),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(compact_layer)
        .init();
}
