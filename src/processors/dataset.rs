//! Fine-tuning dataset export
//!
//! Turns the word dictionary and the sentence corpus into two JSONL files of
//! three-turn chat records (system, user instruction, assistant answer).

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::dictionary::{DictionaryLimits, TableReader, DESIA_SENTENCE, DESIA_WORD, ODIA_WORD};
use crate::core::errors::Result;
use crate::core::prompt::{ChatMessage, DATASET_SYSTEM_PROMPT};

/// Output file for word-pair records
pub const WORD_PAIRS_FILE: &str = "finetune_word_pairs.jsonl";
/// Output file for sentence records
pub const SENTENCES_FILE: &str = "finetune_sentences.jsonl";

/// One fine-tuning example
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinetuneRecord {
    /// System, user and assistant turns
    pub messages: Vec<ChatMessage>,
}

impl FinetuneRecord {
    fn new(instruction: String, answer: String) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(DATASET_SYSTEM_PROMPT),
                ChatMessage::user(instruction),
                ChatMessage::assistant(answer),
            ],
        }
    }
}

/// Where each output went and how many records it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Word-pair JSONL file
    pub word_pairs_path: PathBuf,
    /// Records written to it
    pub word_pair_records: usize,
    /// Sentence JSONL file
    pub sentences_path: PathBuf,
    /// Records written to it
    pub sentence_records: usize,
}

/// Builds and writes the JSONL datasets
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetExporter {
    limits: DictionaryLimits,
}

impl DatasetExporter {
    /// Exporter with the given row caps
    pub fn new(limits: DictionaryLimits) -> Self {
        Self { limits }
    }

    /// Records in both directions for every valid dictionary row
    pub fn build_word_pairs(&self, reader: TableReader) -> Result<Vec<FinetuneRecord>> {
        reader.require_columns(&[ODIA_WORD, DESIA_WORD])?;

        let mut records = Vec::new();
        let mut count = 0;
        for row in reader.rows() {
            let odia = row.get(ODIA_WORD);
            let desia = row.get(DESIA_WORD);
            if odia.is_empty() || desia.is_empty() {
                continue;
            }

            records.push(FinetuneRecord::new(format!("Translate Odia to Desia: {}", odia), desia.clone()));
            records.push(FinetuneRecord::new(format!("Translate Desia to Odia: {}", desia), odia));

            count += 1;
            if count >= self.limits.max_word_rows {
                break;
            }
        }
        Ok(records)
    }

    /// Sentence records, plus word records found in the same corpus
    ///
    /// Sentences of two words or fewer are skipped. Every visited row counts
    /// toward the cap.
    pub fn build_sentence_pairs(&self, reader: TableReader) -> Result<Vec<FinetuneRecord>> {
        reader.require_columns(&[ODIA_WORD])?;

        let mut records = Vec::new();
        let mut count = 0;
        for row in reader.rows() {
            let odia = row.get(ODIA_WORD);
            let sentence = row.get(DESIA_SENTENCE);
            let desia_word = row.get(DESIA_WORD);

            if !odia.is_empty() && sentence.split_whitespace().count() > 2 {
                records.push(FinetuneRecord::new(format!("Translate Odia text to Desia: {}", odia), sentence));
            }
            if !odia.is_empty() && !desia_word.is_empty() {
                records.push(FinetuneRecord::new(format!("Translate Odia to Desia: {}", odia), desia_word));
            }

            count += 1;
            if count >= self.limits.max_sentence_rows {
                break;
            }
        }
        Ok(records)
    }

    /// Write records one JSON object per line, returning the count
    pub fn write_jsonl(&self, path: &Path, records: &[FinetuneRecord]) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(path)?);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        info!("Wrote {} ({} examples)", path.display(), records.len());
        Ok(records.len())
    }

    /// Read both sources and write both datasets into `out_dir`
    pub fn export(&self, dictionary: &Path, sentences: &Path, out_dir: &Path) -> Result<ExportSummary> {
        let word_reader = TableReader::open(dictionary)?;
        let sentence_reader = TableReader::open(sentences)?;

        let word_records = self.build_word_pairs(word_reader)?;
        let sentence_records = self.build_sentence_pairs(sentence_reader)?;

        std::fs::create_dir_all(out_dir)?;
        let word_pairs_path = out_dir.join(WORD_PAIRS_FILE);
        let sentences_path = out_dir.join(SENTENCES_FILE);

        let word_pair_records = self.write_jsonl(&word_pairs_path, &word_records)?;
        let sentence_records = self.write_jsonl(&sentences_path, &sentence_records)?;

        Ok(ExportSummary {
            word_pairs_path,
            word_pair_records,
            sentences_path,
            sentence_records,
        })
    }
}
