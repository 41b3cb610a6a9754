use std::fmt;
use std::str::FromStr;

/// Column layout of the vocabulary workbook.
///
/// Both layouts share columns A-E (word, meaning, method, example,
/// translation). They differ in where the date lives and whether the
/// store enforces unique words and allows edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Six columns, date in F. Append-only, duplicates allowed.
    Basic,
    /// Twenty-six columns, confusing words in F-G, reserved H-Y, date in Z.
    Extended,
}

pub const COL_WORD: usize = 0;
pub const COL_MEANING: usize = 1;
pub const COL_METHOD: usize = 2;
pub const COL_EXAMPLE: usize = 3;
pub const COL_TRANSLATION: usize = 4;
pub const COL_CONFUSING_EXCEL: usize = 5;
pub const COL_CONFUSING_DIRECT: usize = 6;

const RESERVED_COLUMNS: usize = 18;
const RESERVED_WIDTH: f64 = 10.0;

const BASIC_HEADER: [&str; 6] = [
    "Word",
    "Meaning",
    "Mnemonic",
    "Example",
    "Example Translation",
    "Date",
];

const BASIC_WIDTHS: [f64; 6] = [20.0, 30.0, 40.0, 50.0, 50.0, 12.0];

const EXTENDED_LEADING_HEADER: [&str; 7] = [
    "Word",
    "Meaning",
    "Mnemonic",
    "Example",
    "Example Translation",
    "Confusing Words (Excel)",
    "Confusing Words (Direct)",
];

const EXTENDED_LEADING_WIDTHS: [f64; 7] = [20.0, 30.0, 40.0, 50.0, 50.0, 40.0, 40.0];

impl Schema {
    /// Total number of columns in a row
    pub fn width(self) -> usize {
        match self {
            Schema::Basic => BASIC_HEADER.len(),
            Schema::Extended => EXTENDED_LEADING_HEADER.len() + RESERVED_COLUMNS + 1,
        }
    }

    /// Zero-based index of the date column (F or Z)
    pub fn date_column(self) -> usize {
        self.width() - 1
    }

    /// Header row labels, one per column
    pub fn header(self) -> Vec<&'static str> {
        match self {
            Schema::Basic => BASIC_HEADER.to_vec(),
            Schema::Extended => {
                let mut header = EXTENDED_LEADING_HEADER.to_vec();
                header.extend(std::iter::repeat("").take(RESERVED_COLUMNS));
                header.push("Date");
                header
            }
        }
    }

    /// Display widths in characters, one per column
    pub fn column_widths(self) -> Vec<f64> {
        match self {
            Schema::Basic => BASIC_WIDTHS.to_vec(),
            Schema::Extended => {
                let mut widths = EXTENDED_LEADING_WIDTHS.to_vec();
                widths.extend(std::iter::repeat(RESERVED_WIDTH).take(RESERVED_COLUMNS));
                widths.push(12.0);
                widths
            }
        }
    }

    /// Whether the schema carries the two confusing-words columns
    pub fn has_confusing_words(self) -> bool {
        matches!(self, Schema::Extended)
    }

    /// Whether appends are rejected when the word already exists
    pub fn rejects_duplicates(self) -> bool {
        matches!(self, Schema::Extended)
    }

    /// Whether rows may be updated or deleted after creation
    pub fn supports_edits(self) -> bool {
        matches!(self, Schema::Extended)
    }

    /// Whether extracted text gets `**bold**` rewritten into highlight spans
    pub fn highlights_emphasis(self) -> bool {
        matches!(self, Schema::Basic)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Basic => write!(f, "basic"),
            Schema::Extended => write!(f, "extended"),
        }
    }
}

impl FromStr for Schema {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Schema::Basic),
            "extended" => Ok(Schema::Extended),
            other => Err(anyhow::anyhow!("unknown schema: {}", other)),
        }
    }
}
