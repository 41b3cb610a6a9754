/// Vocabulary Logger Constants

// =============================================================================
// SERVER
// =============================================================================

/// Port used when serving the extended (26 column) workbook
pub const DEFAULT_EXTENDED_PORT: u16 = 5001;

/// Port used when serving the basic (6 column) workbook
pub const DEFAULT_BASIC_PORT: u16 = 3000;

/// Directory of front-end assets served by the basic schema
pub const DEFAULT_STATIC_DIR: &str = "public";

// =============================================================================
// WORKBOOK
// =============================================================================

/// Default workbook path, relative to the working directory
pub const DEFAULT_WORKBOOK_PATH: &str = "vocabulary.xlsx";

/// Name of the single sheet in the workbook
pub const SHEET_NAME: &str = "Vocabulary";

/// Date format of the date column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// API
// =============================================================================

/// Number of entries returned by the recent listing when no count is given
pub const DEFAULT_RECENT_COUNT: usize = 3;

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Wrapper applied to `**bold**` spans by the basic schema
pub const HIGHLIGHT_REPLACEMENT: &str = r#"<span class="highlight">$1</span>"#;

// =============================================================================
// ENVIRONMENT OVERRIDES
// =============================================================================

pub const ENV_PORT: &str = "VOCAB_PORT";
pub const ENV_WORKBOOK: &str = "VOCAB_WORKBOOK";
pub const ENV_STATIC_DIR: &str = "VOCAB_STATIC_DIR";
pub const ENV_OPEN_BROWSER: &str = "VOCAB_OPEN_BROWSER";
