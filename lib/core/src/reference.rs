//! Reference Embedding Set
//!
//! Text-derived vectors the zero-shot classifier scores against: one per
//! vocabulary label in each category, plus one per prompt sentence. They are
//! produced once at startup, either by a [`TextEncoder`] or from a JSON file
//! exported by the text model, and never change afterwards.

use crate::vocabulary::{build_sentences, Category, SENTENCE_COUNT};
use crate::{Error, Result, Vector};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Turns label text into vectors in the same space as image embeddings
pub trait TextEncoder {
    fn dim(&self) -> usize;
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Deterministic encoder hashing character trigrams and words into buckets.
///
/// It shares no space with a real image model; it exists so the engine can
/// run without exported text embeddings, and as a fixture.
#[derive(Debug, Clone)]
pub struct HashingTextEncoder {
    dim: usize,
}

impl HashingTextEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn bucket(&self, token: &str) -> usize {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.dim
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();
        let padded: Vec<char> = format!("  {}  ", lowered).chars().collect();

        for window in padded.windows(3) {
            let trigram: String = window.iter().collect();
            vector[self.bucket(&trigram)] += 1.0;
        }
        for word in lowered.split_whitespace() {
            vector[self.bucket(word)] += 2.0;
        }

        let mut v = Vector::new(vector);
        v.normalize();
        v.into_inner()
    }
}

impl TextEncoder for HashingTextEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.dim == 0 {
            return Err(Error::InvalidConfig("encoder dimension must be > 0".into()));
        }
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }
}

/// Unit-length vectors paired with the text they were encoded from
#[derive(Debug, Clone)]
pub struct LabelBank {
    labels: Vec<String>,
    vectors: Vec<Vector>,
}

impl LabelBank {
    fn new(labels: Vec<String>, raw: Vec<Vec<f32>>, dim: usize, what: &str) -> Result<Self> {
        if labels.len() != raw.len() {
            return Err(Error::Reference(format!(
                "{}: expected {} vectors, got {}",
                what,
                labels.len(),
                raw.len()
            )));
        }

        let mut vectors = Vec::with_capacity(raw.len());
        for (label, data) in labels.iter().zip(raw) {
            if data.len() != dim {
                return Err(Error::Reference(format!(
                    "{} '{}': expected dimension {}, got {}",
                    what,
                    label,
                    dim,
                    data.len()
                )));
            }
            if !data.iter().all(|x| x.is_finite()) {
                return Err(Error::Reference(format!("{} '{}': non-finite values", what, label)));
            }
            let mut v = Vector::new(data);
            v.normalize();
            vectors.push(v);
        }

        Ok(Self { labels, vectors })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }
}

/// On-disk form: raw vectors in vocabulary / sentence order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceFile {
    pub age: Vec<Vec<f32>>,
    pub gender: Vec<Vec<f32>>,
    pub race: Vec<Vec<f32>>,
    pub sentences: Vec<Vec<f32>>,
}

/// Label and sentence banks for all three categories
#[derive(Debug, Clone)]
pub struct ReferenceEmbeddings {
    dim: usize,
    age: LabelBank,
    gender: LabelBank,
    race: LabelBank,
    sentences: LabelBank,
}

impl ReferenceEmbeddings {
    /// Validate and normalize raw vectors given in vocabulary order
    pub fn from_parts(dim: usize, file: ReferenceFile) -> Result<Self> {
        let names = |c: Category| c.labels().iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Ok(Self {
            dim,
            age: LabelBank::new(names(Category::Age), file.age, dim, "age")?,
            gender: LabelBank::new(names(Category::Gender), file.gender, dim, "gender")?,
            race: LabelBank::new(names(Category::Race), file.race, dim, "race")?,
            sentences: LabelBank::new(build_sentences(), file.sentences, dim, "sentence")?,
        })
    }

    /// Encode every label and prompt sentence
    pub fn build(encoder: &dyn TextEncoder) -> Result<Self> {
        let encode = |c: Category| {
            let texts: Vec<String> = c.labels().iter().map(|s| s.to_string()).collect();
            encoder.encode(&texts)
        };
        let file = ReferenceFile {
            age: encode(Category::Age)?,
            gender: encode(Category::Gender)?,
            race: encode(Category::Race)?,
            sentences: encoder.encode(&build_sentences())?,
        };
        tracing::debug!(
            dim = encoder.dim(),
            sentences = SENTENCE_COUNT,
            "Encoded reference labels"
        );
        Self::from_parts(encoder.dim(), file)
    }

    /// Load a [`ReferenceFile`] written by the text model
    pub fn from_file<P: AsRef<Path>>(path: P, dim: usize) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let file: ReferenceFile = serde_json::from_slice(&bytes)?;
        let reference = Self::from_parts(dim, file)?;
        tracing::info!(path = %path.as_ref().display(), dim, "Loaded reference embeddings");
        Ok(reference)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn bank(&self, category: Category) -> &LabelBank {
        match category {
            Category::Age => &self.age,
            Category::Gender => &self.gender,
            Category::Race => &self.race,
        }
    }

    #[inline]
    pub fn sentences(&self) -> &LabelBank {
        &self.sentences
    }
}
