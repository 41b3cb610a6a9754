use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use vocab_logger::api::{self, AppState};
use vocab_logger::config::ServerConfig;
use vocab_logger::extract::FieldExtractor;
use vocab_logger::schema::Schema;
use vocab_logger::store::VocabularyStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Check command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("extended");

    let schema = match mode.parse::<Schema>() {
        Ok(schema) => schema,
        Err(_) => {
            println!("💡 Available modes:");
            println!("   cargo run             - Extended workbook (26 columns, port 5001)");
            println!("   cargo run -- extended - Same as above");
            println!("   cargo run -- basic    - Basic workbook (6 columns, port 3000) with front-end");
            return Ok(());
        }
    };

    let config = ServerConfig::from_env(schema);
    run(config).await
}

async fn run(config: ServerConfig) -> Result<()> {
    let store = VocabularyStore::open_workbook(&config.workbook_path, config.schema)
        .with_context(|| format!("failed to open {}", config.workbook_path.display()))?;
    let extractor = FieldExtractor::for_schema(config.schema)?;

    if let Some(dir) = &config.static_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let app = api::create_router(AppState::new(store, extractor), config.static_dir.as_deref());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let url = format!("http://localhost:{}", config.port);
    println!("\n🚀 Vocabulary server started ({} schema)", config.schema);
    println!("📍 Address: {}", url);
    println!("📂 Workbook: {}", absolute(&config.workbook_path).display());
    tracing::info!(port = config.port, schema = %config.schema, "listening");

    if config.open_browser {
        println!("\n💡 If no browser window opens, visit the address above.");
        open_browser(&url);
    }

    api::serve(listener, app).await
}

fn absolute(path: &Path) -> std::path::PathBuf {
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Best effort. A missing launcher only gets logged.
fn open_browser(url: &str) {
    let launcher = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "linux") {
        "xdg-open"
    } else {
        tracing::debug!("no browser launcher for this platform");
        return;
    };

    if let Err(e) = std::process::Command::new(launcher).arg(url).spawn() {
        tracing::warn!("could not open browser with {}: {}", launcher, e);
    }
}
