//! Bilingual Odia / Desia dictionary loaded from CSV
//!
//! Cells are normalised by [`sanitize`]; rows that end up without both words
//! are dropped silently, as are duplicate word pairs.

use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::errors::{Result, TranslationError};

/// Column holding the Odia word
pub const ODIA_WORD: &str = "odia_word";
/// Column holding the Desia word
pub const DESIA_WORD: &str = "desia_word";
/// Column holding a Desia example sentence
pub const DESIA_SENTENCE: &str = "desia_sentence";

/// Raw fields read as missing, matching the default NA markers of dataframe readers
pub const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA",
    "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A table cell
///
/// Fields read from CSV are only ever `Null`, `Float(NaN)` or `Text`; the
/// other scalar shapes come from cells built in code.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Empty field
    Null,
    /// Floating-point value; NaN marks a missing value
    Float(f64),
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// Text kept exactly as written
    Text(String),
}

impl Cell {
    /// Classify a raw CSV field
    ///
    /// Only the missing-value sentinels are recognised; everything else stays
    /// text so that words like `007` or `True` survive unchanged.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Null;
        }
        if NA_MARKERS.contains(&raw) {
            return Cell::Float(f64::NAN);
        }
        Cell::Text(raw.to_string())
    }
}

/// Convert any cell to a trimmed single-line string
///
/// Null and NaN cells become the empty string; other scalars use their
/// display form.
pub fn sanitize(cell: &Cell) -> String {
    let value = match cell {
        Cell::Null => return String::new(),
        Cell::Float(value) if value.is_nan() => return String::new(),
        Cell::Float(value) => value.to_string(),
        Cell::Int(value) => value.to_string(),
        Cell::Bool(value) => value.to_string(),
        Cell::Text(value) => value.clone(),
    };

    value.replace(&['\r', '\n'][..], " ").trim().to_string()
}

/// One CSV row keyed by header name
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    cells: HashMap<String, Cell>,
}

impl TableRow {
    /// Sanitized value of a column; missing columns read as empty
    pub fn get(&self, column: &str) -> String {
        self.cells.get(column).map(sanitize).unwrap_or_default()
    }
}

/// Streaming reader over a headed CSV file
pub struct TableReader {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    path: PathBuf,
}

impl TableReader {
    /// Open a CSV file, failing with `MissingResource` if it is absent
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TranslationError::MissingResource {
                path: path.display().to_string(),
            });
        }

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        Ok(Self {
            reader,
            headers,
            path: path.to_path_buf(),
        })
    }

    /// Whether the header row names `column`
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Require the given columns to be present
    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        for column in columns {
            if !self.has_column(column) {
                return Err(TranslationError::InvalidFormat {
                    format: format!("{} has no '{}' column", self.path.display(), column),
                });
            }
        }
        Ok(())
    }

    /// Iterate rows; undecodable records are skipped with a warning
    pub fn rows(self) -> impl Iterator<Item = TableRow> {
        let headers = self.headers;
        let path = self.path;

        self.reader
            .into_records()
            .enumerate()
            .filter_map(move |(index, record)| match record {
                Ok(record) => {
                    let cells = headers
                        .iter()
                        .cloned()
                        .zip(record.iter().map(Cell::from_raw))
                        .collect();
                    Some(TableRow { cells })
                }
                Err(e) => {
                    warn!("Skipping unreadable row {} in {}: {}", index + 1, path.display(), e);
                    None
                }
            })
    }
}

/// A single Odia -> Desia pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DictionaryEntry {
    /// Odia word
    pub source_word: String,
    /// Desia word
    pub target_word: String,
    /// Desia example sentence, when the corpus has one
    pub example_sentence: Option<String>,
}

impl DictionaryEntry {
    /// Build an entry from sanitized parts; `None` if either word is empty
    pub fn new(source_word: String, target_word: String, example_sentence: Option<String>) -> Option<Self> {
        if source_word.is_empty() || target_word.is_empty() {
            return None;
        }
        Some(Self {
            source_word,
            target_word,
            example_sentence: example_sentence.filter(|s| !s.is_empty()),
        })
    }

    /// One line for prompts: `odia → desia (e.g. sentence)`
    pub fn render(&self) -> String {
        match &self.example_sentence {
            Some(example) => format!("{} → {} (e.g. {})", self.source_word, self.target_word, example),
            None => format!("{} → {}", self.source_word, self.target_word),
        }
    }
}

/// Row caps bounding dictionary size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryLimits {
    /// Cap on word-dictionary rows
    pub max_word_rows: usize,
    /// Cap on sentence-corpus rows
    pub max_sentence_rows: usize,
}

impl Default for DictionaryLimits {
    fn default() -> Self {
        Self {
            max_word_rows: 4000,
            max_sentence_rows: 3000,
        }
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{M}\p{N}]+").expect("valid token pattern"))
}

/// Split text into word tokens; marks stay attached to their letters
pub fn tokenize(text: &str) -> Vec<String> {
    token_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// In-memory ordered dictionary
#[derive(Debug, Clone, Default)]
pub struct DictionaryStore {
    entries: Vec<DictionaryEntry>,
}

impl DictionaryStore {
    /// Build a store from entries, dropping duplicate pairs
    pub fn from_entries(entries: impl IntoIterator<Item = DictionaryEntry>) -> Self {
        let mut store = Self::default();
        let mut seen = HashSet::new();
        for entry in entries {
            store.insert(entry, &mut seen);
        }
        store
    }

    /// Load the word dictionary and, if present, the sentence corpus
    pub fn load(words: &Path, sentences: Option<&Path>, limits: DictionaryLimits) -> Result<Self> {
        let mut store = Self::default();
        let mut seen = HashSet::new();

        let reader = TableReader::open(words)?;
        reader.require_columns(&[ODIA_WORD, DESIA_WORD])?;

        let mut word_rows = 0;
        for row in reader.rows() {
            if word_rows >= limits.max_word_rows {
                break;
            }
            let entry = DictionaryEntry::new(row.get(ODIA_WORD), row.get(DESIA_WORD), None);
            if let Some(entry) = entry {
                if store.insert(entry, &mut seen) {
                    word_rows += 1;
                }
            }
        }

        if let Some(sentences) = sentences {
            match TableReader::open(sentences) {
                Ok(reader) => {
                    reader.require_columns(&[ODIA_WORD, DESIA_WORD])?;
                    let mut sentence_rows = 0;
                    for row in reader.rows() {
                        if sentence_rows >= limits.max_sentence_rows {
                            break;
                        }
                        let sentence = row.get(DESIA_SENTENCE);
                        let entry = DictionaryEntry::new(
                            row.get(ODIA_WORD),
                            row.get(DESIA_WORD),
                            Some(sentence),
                        );
                        if let Some(entry) = entry {
                            store.insert(entry, &mut seen);
                            sentence_rows += 1;
                        }
                    }
                }
                Err(TranslationError::MissingResource { path }) => {
                    warn!("Sentence corpus {} not found, using word dictionary only", path);
                }
                Err(e) => return Err(e),
            }
        }

        info!("Loaded {} dictionary entries from {}", store.len(), words.display());
        Ok(store)
    }

    /// Insert unless the pair is known; a duplicate may still donate its example sentence
    fn insert(&mut self, entry: DictionaryEntry, seen: &mut HashSet<(String, String)>) -> bool {
        let key = (entry.source_word.clone(), entry.target_word.clone());
        if seen.insert(key) {
            self.entries.push(entry);
            return true;
        }

        if let Some(example) = entry.example_sentence {
            if let Some(existing) = self
                .entries
                .iter_mut()
                .find(|e| e.source_word == entry.source_word && e.target_word == entry.target_word)
            {
                existing.example_sentence.get_or_insert(example);
            }
        }
        false
    }

    /// Entries in load order
    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries relevant to `text`, at most `limit`
    ///
    /// Exact token matches on either side come first, then substring matches
    /// (a token inside a word or a word inside a token). Substring matching
    /// ignores single-character tokens and single-character words.
    pub fn lookup(&self, text: &str, limit: usize) -> Vec<&DictionaryEntry> {
        let tokens: HashSet<String> = tokenize(text).into_iter().collect();
        if tokens.is_empty() || limit == 0 {
            return Vec::new();
        }

        let exact = |entry: &DictionaryEntry| {
            tokens.contains(&entry.source_word.to_lowercase())
                || tokens.contains(&entry.target_word.to_lowercase())
        };
        let partial = |entry: &DictionaryEntry| {
            let source = entry.source_word.to_lowercase();
            let target = entry.target_word.to_lowercase();
            tokens.iter().filter(|t| t.chars().count() >= 2).any(|t| {
                source.contains(t.as_str())
                    || target.contains(t.as_str())
                    || (source.chars().count() >= 2 && t.contains(source.as_str()))
                    || (target.chars().count() >= 2 && t.contains(target.as_str()))
            })
        };

        let mut matches: Vec<&DictionaryEntry> = self.entries.iter().filter(|e| exact(*e)).take(limit).collect();
        if matches.len() < limit {
            let remaining = limit - matches.len();
            matches.extend(
                self.entries
                    .iter()
                    .filter(|e| !exact(*e) && partial(*e))
                    .take(remaining),
            );
        }

        debug!("Dictionary lookup matched {} entries", matches.len());
        matches
    }
}

/// Shared handle to the dictionary source, loaded on first use
#[derive(Debug)]
pub struct DictionarySource {
    words_path: PathBuf,
    sentences_path: Option<PathBuf>,
    limits: DictionaryLimits,
    loaded: RwLock<Option<Arc<DictionaryStore>>>,
}

impl DictionarySource {
    /// Source over the given files; nothing is read until first use
    pub fn new(words_path: impl Into<PathBuf>, sentences_path: Option<PathBuf>, limits: DictionaryLimits) -> Self {
        Self {
            words_path: words_path.into(),
            sentences_path,
            limits,
            loaded: RwLock::new(None),
        }
    }

    /// Path of the word dictionary
    pub fn words_path(&self) -> &Path {
        &self.words_path
    }

    /// The loaded store, reading the source on first call
    pub async fn current(&self) -> Result<Arc<DictionaryStore>> {
        if let Some(store) = self.loaded.read().await.as_ref() {
            return Ok(Arc::clone(store));
        }

        let mut loaded = self.loaded.write().await;
        if let Some(store) = loaded.as_ref() {
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(self.read_source().await?);
        *loaded = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Re-read the source, replacing the cached store only on success
    pub async fn reload(&self) -> Result<Arc<DictionaryStore>> {
        let store = Arc::new(self.read_source().await?);
        *self.loaded.write().await = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Parse the CSV sources on the blocking pool
    async fn read_source(&self) -> Result<DictionaryStore> {
        let words = self.words_path.clone();
        let sentences = self.sentences_path.clone();
        let limits = self.limits;

        tokio::task::spawn_blocking(move || DictionaryStore::load(&words, sentences.as_deref(), limits))
            .await
            .map_err(|e| TranslationError::InternalError(format!("dictionary load task failed: {}", e)))?
    }
}
