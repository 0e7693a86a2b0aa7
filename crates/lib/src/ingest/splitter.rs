//! # Recursive Character Splitter
//!
//! Splits text on the coarsest separator that occurs in it (paragraphs, then lines,
//! then words, then characters) and greedily merges the pieces back into chunks of
//! at most `chunk_size` characters. Consecutive chunks share up to `chunk_overlap`
//! characters of trailing context.

use super::IngestError;
use crate::types::{Chunk, Document};
use serde_json::Value;

const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Fails unless `0 < chunk_size` and `chunk_overlap < chunk_size`; otherwise the
    /// merge step could not make progress.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunking {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits `text` into chunks of at most `chunk_size` characters.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Splits every document and tags each chunk with its position.
    ///
    /// Chunk ids are derived from the document metadata, the chunk index and the
    /// content, so splitting the same documents twice yields the same ids.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for (chunk_index, content) in self.split_text(&document.content).into_iter().enumerate() {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), Value::from(chunk_index));
                let id = format!(
                    "{:x}",
                    md5::compute(format!(
                        "{}::{chunk_index}::{content}",
                        Value::Object(document.metadata.clone())
                    ))
                );
                chunks.push(Chunk {
                    id,
                    content,
                    metadata,
                });
            }
        }
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for split in splits {
            if char_len(split) < self.chunk_size {
                small.push(split);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge_splits(&small, separator));
                small.clear();
            }
            if remaining.is_empty() {
                push_chunk(&mut chunks, &[split], separator);
            } else {
                chunks.extend(self.split_recursive(split, remaining));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge_splits(&small, separator));
        }
        chunks
    }

    /// Greedily joins pieces shorter than `chunk_size`, carrying a tail of at most
    /// `chunk_overlap` characters into the next chunk.
    fn merge_splits(&self, splits: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            let joined_len = |total: usize, current: &[&str]| {
                total + len + if current.is_empty() { 0 } else { separator_len }
            };

            if joined_len(total, &current) > self.chunk_size && !current.is_empty() {
                push_chunk(&mut chunks, &current, separator);
                while total > self.chunk_overlap
                    || (joined_len(total, &current) > self.chunk_size && total > 0)
                {
                    let first_len = char_len(current[0]);
                    total -= first_len + if current.len() > 1 { separator_len } else { 0 };
                    current.remove(0);
                }
            }

            total += len + if current.is_empty() { 0 } else { separator_len };
            current.push(split);
        }
        push_chunk(&mut chunks, &current, separator);
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, pieces: &[&str], separator: &str) {
    let chunk = pieces.join(separator);
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
