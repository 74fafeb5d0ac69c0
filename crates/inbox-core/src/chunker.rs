//! Recursive character splitter and email chunking.
//!
//! Text is split on the first separator of `["\n\n", "\n", " ", ""]` that
//! occurs in it. Each piece keeps its separator at the front. Pieces shorter
//! than the chunk size are merged greedily; longer pieces are split again
//! with the remaining separators. Lengths are counted in chars.

use std::collections::VecDeque;

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Email, EmailChunk};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 100 }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk size must be > 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    /// Chunk every email body. Output follows email order, then chunk index.
    pub fn chunk_emails(&self, emails: &[Email]) -> Vec<EmailChunk> {
        let mut out = Vec::new();
        for email in emails {
            let pieces = self.split_text(&email.body);
            let total_chunks = pieces.len();
            out.extend(pieces.into_iter().enumerate().map(|(index, chunk)| EmailChunk {
                id: email.id.clone(),
                index,
                total_chunks,
                chunk,
                subject: email.subject.clone(),
                from: email.from.clone(),
                to: email.to.clone(),
                timestamp: email.timestamp.clone(),
            }));
        }
        out
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut remaining: Option<&[&str]> = None;
        for (i, &sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = Some(&separators[i + 1..]);
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge_splits(&good));
                good.clear();
            }
            match remaining {
                Some(rest) => chunks.extend(self.split_recursive(piece, rest)),
                None => chunks.push(piece.to_string()),
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge_splits(&good));
        }
        chunks
    }

    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);
            if total + len > self.chunk_size && !current.is_empty() {
                if let Some(doc) = join_pieces(&current) {
                    docs.push(doc);
                }
                // Drop from the front until the carried tail fits the overlap
                // and leaves room for the next piece.
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }
            current.push_back((piece, len));
            total += len;
        }
        if let Some(doc) = join_pieces(&current) {
            docs.push(doc);
        }
        docs
    }
}

/// Chunk emails with the default 1000/100 splitter.
pub fn chunk_emails(emails: &[Email]) -> Vec<EmailChunk> {
    TextSplitter::default().chunk_emails(emails)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join_pieces(pieces: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = pieces.iter().map(|(p, _)| *p).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Split before every occurrence of `separator` (never at offset 0), so each
/// piece after the first starts with the separator. Empty pieces are dropped.
/// An empty separator splits into single chars.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, _) in text.char_indices().skip(1) {
        if text[i..].starts_with(separator) {
            pieces.push(&text[start..i]);
            start = i;
        }
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}
