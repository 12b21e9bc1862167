//! Knowledge store — sentence-window chunks with keyword-overlap retrieval.
//!
//! The source text is split into sentences, short fragments are dropped and
//! the rest is grouped into overlapping windows. Retrieval scores each chunk
//! by how many distinct query keywords appear in its word set.
//!
//! The store is immutable once built (apart from [`KnowledgeStore::ingest`],
//! which needs `&mut self`) and can be shared across pipelines behind an `Arc`.

use mizan_core::error::KnowledgeError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Sentence terminators. A boundary falls right after any of these.
const TERMINATORS: [char; 5] = ['.', '!', '?', '\u{061F}', '\n'];

/// How source text is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    window: usize,
    overlap: usize,
    min_sentence_chars: usize,
}

impl ChunkingParams {
    /// Validate and build chunking parameters. `overlap` must be smaller
    /// than `window`, otherwise the stride would never advance.
    pub fn new(
        window: usize,
        overlap: usize,
        min_sentence_chars: usize,
    ) -> Result<Self, KnowledgeError> {
        if window == 0 {
            return Err(KnowledgeError::EmptyWindow);
        }
        if overlap >= window {
            return Err(KnowledgeError::OverlapTooLarge { window, overlap });
        }
        Ok(Self {
            window,
            overlap,
            min_sentence_chars,
        })
    }

    /// Eight-sentence windows sharing two sentences.
    pub fn lightning() -> Self {
        Self {
            window: 8,
            overlap: 2,
            min_sentence_chars: 10,
        }
    }

    /// Five-sentence windows sharing one sentence.
    pub fn compact() -> Self {
        Self {
            window: 5,
            overlap: 1,
            min_sentence_chars: 10,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn min_sentence_chars(&self) -> usize {
        self.min_sentence_chars
    }

    fn stride(&self) -> usize {
        self.window - self.overlap
    }
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self::lightning()
    }
}

/// A contiguous window of sentences from the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Position in load order, starting at 0.
    pub index: usize,
    pub text: String,
}

/// A chunk selected for a query, with its keyword-overlap score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_index: usize,
    pub text: String,
    pub score: usize,
}

/// Read-only keyword index over the knowledge base chunks.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    params: ChunkingParams,
    chunks: Vec<KnowledgeChunk>,
    /// Lowercased word set of each chunk, parallel to `chunks`.
    word_sets: Vec<HashSet<String>>,
}

impl KnowledgeStore {
    /// An empty store; every retrieval returns nothing.
    pub fn empty(params: ChunkingParams) -> Self {
        Self {
            params,
            chunks: Vec::new(),
            word_sets: Vec::new(),
        }
    }

    /// Build a store from in-memory text.
    pub fn from_text(text: &str, params: ChunkingParams) -> Self {
        let mut store = Self::empty(params);
        store.ingest(text);
        store
    }

    /// Load the knowledge base file. A missing or unreadable file yields an
    /// empty store with a warning.
    pub fn load_file(path: &Path, params: ChunkingParams) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let store = Self::from_text(&text, params);
                info!(
                    path = %path.display(),
                    chunks = store.len(),
                    window = params.window,
                    overlap = params.overlap,
                    "Knowledge base loaded"
                );
                store
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Knowledge base not readable, starting empty");
                Self::empty(params)
            }
        }
    }

    /// Append another document. New chunks continue the index sequence.
    /// Returns the number of chunks added.
    pub fn ingest(&mut self, text: &str) -> usize {
        let start = self.chunks.len();
        for (offset, chunk_text) in chunk_text(text, &self.params).into_iter().enumerate() {
            self.word_sets.push(word_set(&chunk_text));
            self.chunks.push(KnowledgeChunk {
                index: start + offset,
                text: chunk_text,
            });
        }
        let added = self.chunks.len() - start;
        debug!(added, total = self.chunks.len(), "Ingested document");
        added
    }

    /// Rank chunks by the number of distinct query keywords they contain.
    ///
    /// Chunks scoring zero are excluded. Ties keep load order. At most
    /// `top_k` results are returned.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        let keywords = word_set(query);
        if keywords.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &KnowledgeChunk)> = self
            .chunks
            .iter()
            .zip(&self.word_sets)
            .filter_map(|(chunk, words)| {
                let score = keywords.iter().filter(|k| words.contains(*k)).count();
                (score > 0).then_some((score, chunk))
            })
            .collect();

        // sort_by is stable, so equal scores stay in load order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(score, chunk)| RetrievalResult {
                chunk_index: chunk.index,
                text: chunk.text.clone(),
                score,
            })
            .collect()
    }

    pub fn chunks(&self) -> &[KnowledgeChunk] {
        &self.chunks
    }

    pub fn params(&self) -> ChunkingParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Split text into trimmed sentences longer than `min_chars` characters.
pub fn split_sentences(text: &str, min_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if TERMINATORS.contains(&c) {
            push_sentence(&mut sentences, &current, min_chars);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current, min_chars);

    sentences
}

fn push_sentence(out: &mut Vec<String>, raw: &str, min_chars: usize) {
    let trimmed = raw.trim();
    if trimmed.chars().count() > min_chars {
        out.push(trimmed.to_string());
    }
}

/// Group sentences into overlapping windows joined by single spaces.
///
/// Windowing stops once a window reaches the last sentence, so no chunk is
/// a pure suffix of its predecessor.
pub fn chunk_text(text: &str, params: &ChunkingParams) -> Vec<String> {
    let sentences = split_sentences(text, params.min_sentence_chars);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < sentences.len() {
        let end = (start + params.window).min(sentences.len());
        let chunk = sentences[start..end].join(" ");
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == sentences.len() {
            break;
        }
        start += params.stride();
    }

    chunks
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
