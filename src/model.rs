use serde::{Deserialize, Serialize};

use crate::schema::{
    Schema, COL_CONFUSING_DIRECT, COL_CONFUSING_EXCEL, COL_EXAMPLE, COL_MEANING, COL_METHOD,
    COL_TRANSLATION, COL_WORD,
};

/// One logged word as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub word: String,
    pub meaning: String,
    pub method: String,
    pub example: String,
    pub translation: String,
    /// Only present for the extended schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confusing_words_excel: Option<String>,
    /// Only present for the extended schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confusing_words_direct: Option<String>,
    pub date: String,
}

/// The five fields pulled out of a block of text, before a date is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub word: String,
    pub meaning: String,
    pub method: String,
    pub example: String,
    pub translation: String,
}

/// Partial update. Absent or empty fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub word: Option<String>,
    pub meaning: Option<String>,
    pub method: Option<String>,
    pub example: Option<String>,
    pub translation: Option<String>,
    pub confusing_words_excel: Option<String>,
    pub confusing_words_direct: Option<String>,
}

impl VocabularyEntry {
    /// Build an entry from a stored row. Short rows read as empty cells.
    pub fn from_row(row: &[String], schema: Schema) -> Self {
        let cell = |index: usize| row.get(index).cloned().unwrap_or_default();

        let (confusing_words_excel, confusing_words_direct) = if schema.has_confusing_words() {
            (Some(cell(COL_CONFUSING_EXCEL)), Some(cell(COL_CONFUSING_DIRECT)))
        } else {
            (None, None)
        };

        Self {
            word: cell(COL_WORD),
            meaning: cell(COL_MEANING),
            method: cell(COL_METHOD),
            example: cell(COL_EXAMPLE),
            translation: cell(COL_TRANSLATION),
            confusing_words_excel,
            confusing_words_direct,
            date: cell(schema.date_column()),
        }
    }
}

impl NewEntry {
    /// Lay the entry out as a full-width row stamped with `date`
    pub fn into_row(self, schema: Schema, date: &str) -> Vec<String> {
        let mut row = vec![String::new(); schema.width()];
        row[COL_WORD] = self.word;
        row[COL_MEANING] = self.meaning;
        row[COL_METHOD] = self.method;
        row[COL_EXAMPLE] = self.example;
        row[COL_TRANSLATION] = self.translation;
        row[schema.date_column()] = date.to_string();
        row
    }
}

impl EntryPatch {
    /// The replacement word, if the patch renames the entry
    pub fn new_word(&self) -> Option<&str> {
        non_empty(&self.word)
    }

    /// Overwrite the patched cells of `row` in place. The date column is never touched.
    pub fn apply(&self, row: &mut [String], schema: Schema) {
        let mut fields = vec![
            (COL_WORD, &self.word),
            (COL_MEANING, &self.meaning),
            (COL_METHOD, &self.method),
            (COL_EXAMPLE, &self.example),
            (COL_TRANSLATION, &self.translation),
        ];
        if schema.has_confusing_words() {
            fields.push((COL_CONFUSING_EXCEL, &self.confusing_words_excel));
            fields.push((COL_CONFUSING_DIRECT, &self.confusing_words_direct));
        }

        for (column, value) in fields {
            if let (Some(value), Some(cell)) = (non_empty(value), row.get_mut(column)) {
                *cell = value.to_string();
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
