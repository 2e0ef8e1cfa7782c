use clap::Parser;
use storage_adapter::config::cli::{execute, exit_code, Cli};
use storage_adapter::utils::logger;
use storage_adapter::{FileLocalStore, HttpTransport, StorageAdapter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logger::init_logger(cli.verbose, cli.log_json);

    // 解析並驗證設定
    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Configuration failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(&e));
        }
    };
    tracing::debug!(
        "Mode: {}, data file: {}",
        settings.adapter.mode,
        settings.data_file
    );

    let local = FileLocalStore::open(&settings.data_file).await?;
    let adapter = StorageAdapter::new(local, HttpTransport::new(), settings.adapter)?;

    match execute(&adapter, &cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Err(e) => {
            tracing::error!("❌ Command failed: {} (kind: {:?})", e, e.kind());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(&e));
        }
    }

    Ok(())
}
