//! Zero-Shot Classifier
//!
//! Scores an image embedding against the reference banks: cosine similarity
//! (both sides unit length), scaled by a temperature, then softmax.

use crate::reference::{LabelBank, ReferenceEmbeddings};
use crate::vocabulary::{extract_labels, Category, LabelSet};
use crate::{Error, Result, Vector};
use std::sync::Arc;

/// CLIP's logit scale
pub const DEFAULT_TEMPERATURE: f32 = 100.0;

/// A label with its softmax probability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredLabel<'a> {
    pub label: &'a str,
    pub probability: f32,
}

#[derive(Debug, Clone)]
pub struct ZeroShotClassifier {
    reference: Arc<ReferenceEmbeddings>,
    temperature: f32,
}

impl ZeroShotClassifier {
    pub fn new(reference: Arc<ReferenceEmbeddings>, temperature: f32) -> Self {
        Self {
            reference,
            temperature,
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.reference.dim()
    }

    #[inline]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    #[inline]
    pub fn reference(&self) -> &ReferenceEmbeddings {
        &self.reference
    }

    fn prepare(&self, embedding: &[f32]) -> Result<Vector> {
        Vector::validate(embedding, self.dim())?;
        Ok(Vector::from_slice(embedding).normalized())
    }

    fn probabilities(&self, bank: &LabelBank, query: &Vector) -> Vec<f32> {
        let logits: Vec<f32> = bank
            .vectors()
            .iter()
            .map(|v| self.temperature * crate::simd::dot_product(query.as_slice(), v.as_slice()))
            .collect();
        softmax(&logits)
    }

    fn ranked<'a>(&self, bank: &'a LabelBank, query: &Vector) -> Vec<ScoredLabel<'a>> {
        let mut scored: Vec<ScoredLabel<'a>> = bank
            .labels()
            .iter()
            .zip(self.probabilities(bank, query))
            .map(|(label, probability)| ScoredLabel {
                label: label.as_str(),
                probability,
            })
            .collect();
        // stable: equal scores keep vocabulary order
        scored.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        scored
    }

    /// Every label of `category`, most probable first
    pub fn rank(&self, category: Category, embedding: &[f32]) -> Result<Vec<ScoredLabel<'_>>> {
        let query = self.prepare(embedding)?;
        Ok(self.ranked(self.reference.bank(category), &query))
    }

    /// Top-1 label per category against the bare label embeddings
    pub fn classify(&self, embedding: &[f32]) -> Result<LabelSet> {
        let query = self.prepare(embedding)?;
        let mut labels = LabelSet::unidentified();
        for category in Category::ALL {
            let best = self
                .ranked(self.reference.bank(category), &query)
                .into_iter()
                .next()
                .ok_or_else(|| Error::Reference(format!("empty {} bank", category)))?;
            labels.set(category, best.label);
        }
        Ok(labels)
    }

    /// Best prompt sentence over the whole label product, and its probability
    pub fn best_sentence(&self, embedding: &[f32]) -> Result<ScoredLabel<'_>> {
        let query = self.prepare(embedding)?;
        self.ranked(self.reference.sentences(), &query)
            .into_iter()
            .next()
            .ok_or_else(|| Error::Reference("empty sentence bank".into()))
    }

    /// Labels read back out of the best-matching prompt sentence
    pub fn classify_sentences(&self, embedding: &[f32]) -> Result<LabelSet> {
        let best = self.best_sentence(embedding)?;
        Ok(extract_labels(best.label))
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
