// TF-IDF text vectorization for text attributes
use crate::schema::{TextConfig, TokenizerConfig};
use ahash::{AHashMap, AHashSet};
use cbrx_core::{Result, SparseVector};
use std::fmt::Debug;
use std::sync::Arc;

/// Turns documents into weighted term vectors
///
/// This is the seam for external vectorization: any implementation can back
/// a text attribute as long as it is fitted once on the training corpus and
/// then maps documents to comparable vectors.
pub trait TextVectorizer: Send + Sync + Debug {
    /// Learn vocabulary and term weights from the training corpus
    fn fit(&mut self, corpus: &[&str]) -> Result<()>;

    /// Weighted term vector of a document; unknown terms are ignored
    fn transform(&self, document: &str) -> SparseVector;

    fn vocabulary_size(&self) -> usize;
}

/// Builds a fresh, unfitted vectorizer for every fit
pub type VectorizerFactory = Arc<dyn Fn() -> Box<dyn TextVectorizer> + Send + Sync>;

/// Document tokenizer built from a [`TokenizerConfig`]
#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
    stopwords: AHashSet<String>,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        let stopwords = match &config {
            TokenizerConfig::Word { stopwords, .. } => {
                stopwords.iter().map(|s| s.to_lowercase()).collect()
            }
            TokenizerConfig::Whitespace => AHashSet::new(),
        };
        Self { config, stopwords }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        match &self.config {
            TokenizerConfig::Whitespace => {
                lowered.split_whitespace().map(str::to_string).collect()
            }
            TokenizerConfig::Word { min_token_length, ignore_numbers, .. } => lowered
                .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
                .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|s| !s.is_empty() && s.chars().count() >= *min_token_length)
                .filter(|s| !self.stopwords.contains(*s))
                .filter(|s| !(*ignore_numbers && s.parse::<f64>().is_ok()))
                .map(str::to_string)
                .collect(),
        }
    }
}

/// TF-IDF vectorizer with L2-normalised output
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    tokenizer: Tokenizer,
    smooth_idf: bool,
    sublinear_tf: bool,
    // term -> column
    vocabulary: AHashMap<String, u32>,
    // column -> idf
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(config: &TextConfig) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.tokenizer.clone()),
            smooth_idf: config.smooth_idf,
            sublinear_tf: config.sublinear_tf,
            vocabulary: AHashMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&col| self.idf[col as usize])
    }

    fn term_counts(&self, document: &str) -> AHashMap<String, u32> {
        let mut counts: AHashMap<String, u32> = AHashMap::new();
        for token in self.tokenizer.tokenize(document) {
            *counts.entry(token).or_insert(0) += 1;
        }
        counts
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn fit(&mut self, corpus: &[&str]) -> Result<()> {
        // term -> document frequency
        let mut dfs: AHashMap<String, u32> = AHashMap::new();
        for document in corpus {
            for (term, _) in self.term_counts(document) {
                *dfs.entry(term).or_insert(0) += 1;
            }
        }

        // Sorted terms give a deterministic column layout
        let mut terms: Vec<(String, u32)> = dfs.into_iter().collect();
        terms.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let n = corpus.len() as f64;
        let smooth = if self.smooth_idf { 1.0 } else { 0.0 };
        self.vocabulary = AHashMap::with_capacity(terms.len());
        self.idf = Vec::with_capacity(terms.len());
        for (col, (term, df)) in terms.into_iter().enumerate() {
            let idf = ((n + smooth) / (df as f64 + smooth)).ln() + 1.0;
            self.vocabulary.insert(term, col as u32);
            self.idf.push(idf);
        }

        tracing::debug!(
            documents = corpus.len(),
            vocabulary = self.vocabulary.len(),
            "tf-idf vectorizer fitted"
        );
        Ok(())
    }

    fn transform(&self, document: &str) -> SparseVector {
        let pairs: Vec<(u32, f64)> = self
            .term_counts(document)
            .into_iter()
            .filter_map(|(term, tf)| {
                let col = *self.vocabulary.get(&term)?;
                let tf = if self.sublinear_tf {
                    1.0 + (tf as f64).ln()
                } else {
                    tf as f64
                };
                Some((col, tf * self.idf[col as usize]))
            })
            .collect();

        let mut vector = SparseVector::from_pairs(pairs);
        vector.normalize();
        vector
    }

    fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}
