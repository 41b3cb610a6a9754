use regex::Regex;
use thiserror::Error;

use crate::consts::HIGHLIGHT_REPLACEMENT;
use crate::model::NewEntry;
use crate::schema::Schema;

/// The five fields every vocabulary entry is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Word,
    Meaning,
    Method,
    Example,
    Translation,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Word,
        Field::Meaning,
        Field::Method,
        Field::Example,
        Field::Translation,
    ];

    /// Uppercase name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Field::Word => "WORD",
            Field::Meaning => "MEANING",
            Field::Method => "METHOD",
            Field::Example => "EXAMPLE",
            Field::Translation => "TRANSLATION",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// How far a field's value runs after its marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extent {
    /// To the end of the marker's line
    Line,
    /// Across lines, up to a line starting with the given marker or end of input
    UntilMarker(String),
}

/// Maps one field to the literal label that introduces it in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpec {
    pub field: Field,
    pub marker: String,
    pub extent: Extent,
}

impl MarkerSpec {
    pub fn line(field: Field, marker: &str) -> Self {
        Self {
            field,
            marker: marker.to_string(),
            extent: Extent::Line,
        }
    }

    pub fn until(field: Field, marker: &str, next_marker: &str) -> Self {
        Self {
            field,
            marker: marker.to_string(),
            extent: Extent::UntilMarker(next_marker.to_string()),
        }
    }

    fn to_regex(&self) -> Result<Regex, regex::Error> {
        let marker = regex::escape(&self.marker);
        let pattern = match &self.extent {
            Extent::Line => format!(r"(?i){marker}\s*(.+)"),
            Extent::UntilMarker(next) => {
                format!(r"(?is){marker}\s*(.+?)(?:\n{}|\z)", regex::escape(next))
            }
        };
        Regex::new(&pattern)
    }
}

/// Markers produced by the prompt the vocabulary notes are generated with
pub fn default_markers() -> Vec<MarkerSpec> {
    vec![
        MarkerSpec::line(Field::Word, "WORD:"),
        MarkerSpec::line(Field::Meaning, "MEANING:"),
        MarkerSpec::until(Field::Method, "METHOD:", "EXAMPLE:"),
        MarkerSpec::line(Field::Example, "EXAMPLE:"),
        MarkerSpec::line(Field::Translation, "TRANSLATION:"),
    ]
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Parsing failed: could not find the following fields - {}", join_names(.0))]
    MissingFields(Vec<Field>),
}

fn join_names(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pulls labelled fields out of free text. All-or-nothing: either every
/// field is found or the call fails naming each missing one.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    patterns: Vec<(Field, Regex)>,
    highlight: Option<Regex>,
}

impl FieldExtractor {
    pub fn new(markers: &[MarkerSpec], highlight_emphasis: bool) -> Result<Self, regex::Error> {
        let patterns = markers
            .iter()
            .map(|spec| Ok((spec.field, spec.to_regex()?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let highlight = if highlight_emphasis {
            Some(Regex::new(r"\*\*(.+?)\*\*")?)
        } else {
            None
        };

        Ok(Self { patterns, highlight })
    }

    /// Extractor with the default markers and the schema's emphasis handling
    pub fn for_schema(schema: Schema) -> Result<Self, regex::Error> {
        Self::new(&default_markers(), schema.highlights_emphasis())
    }

    pub fn extract(&self, text: &str) -> Result<NewEntry, ExtractError> {
        let mut values: [Option<String>; 5] = Default::default();

        for (field, pattern) in &self.patterns {
            let slot = &mut values[field.index()];
            if slot.is_some() {
                continue;
            }
            *slot = pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string);
        }

        let missing: Vec<Field> = Field::ALL
            .into_iter()
            .filter(|field| values[field.index()].is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ExtractError::MissingFields(missing));
        }

        let [word, meaning, method, example, translation] =
            values.map(|value| self.decorate(value.unwrap_or_default()));

        Ok(NewEntry {
            word,
            meaning,
            method,
            example,
            translation,
        })
    }

    fn decorate(&self, value: String) -> String {
        match &self.highlight {
            Some(bold) => bold.replace_all(&value, HIGHLIGHT_REPLACEMENT).into_owned(),
            None => value,
        }
    }
}
