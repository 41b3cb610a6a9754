use std::path::PathBuf;

use crate::consts::{
    DEFAULT_BASIC_PORT, DEFAULT_EXTENDED_PORT, DEFAULT_STATIC_DIR, DEFAULT_WORKBOOK_PATH,
    ENV_OPEN_BROWSER, ENV_PORT, ENV_STATIC_DIR, ENV_WORKBOOK,
};
use crate::schema::Schema;

/// Everything the server needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub schema: Schema,
    pub port: u16,
    pub workbook_path: PathBuf,
    /// Front-end assets served at `/`. Only the basic schema serves them.
    pub static_dir: Option<PathBuf>,
    pub open_browser: bool,
}

impl ServerConfig {
    /// Compiled-in defaults for a schema
    pub fn defaults(schema: Schema) -> Self {
        match schema {
            Schema::Basic => Self {
                schema,
                port: DEFAULT_BASIC_PORT,
                workbook_path: PathBuf::from(DEFAULT_WORKBOOK_PATH),
                static_dir: Some(PathBuf::from(DEFAULT_STATIC_DIR)),
                open_browser: true,
            },
            Schema::Extended => Self {
                schema,
                port: DEFAULT_EXTENDED_PORT,
                workbook_path: PathBuf::from(DEFAULT_WORKBOOK_PATH),
                static_dir: None,
                open_browser: false,
            },
        }
    }

    /// Defaults, overridden by any variables set in the process environment
    pub fn from_env(schema: Schema) -> Self {
        Self::with_overrides(schema, |key| std::env::var(key).ok())
    }

    fn with_overrides(schema: Schema, var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::defaults(schema);

        if let Some(port) = var(ENV_PORT).and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Some(path) = var(ENV_WORKBOOK).filter(|v| !v.is_empty()) {
            config.workbook_path = PathBuf::from(path);
        }
        if config.static_dir.is_some() {
            if let Some(dir) = var(ENV_STATIC_DIR).filter(|v| !v.is_empty()) {
                config.static_dir = Some(PathBuf::from(dir));
            }
        }
        if let Some(open) = var(ENV_OPEN_BROWSER).and_then(|v| v.parse().ok()) {
            config.open_browser = open;
        }

        config
    }
}
