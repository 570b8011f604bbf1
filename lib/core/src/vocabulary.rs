//! Fixed label vocabularies and the prompt sentences built from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label reported for a category that could not be resolved
pub const NO_LABEL: &str = "No Label Identified";

pub const AGE_LABELS: [&str; 9] = [
    "0-2",
    "3-9",
    "10-19",
    "20-29",
    "30-39",
    "40-49",
    "50-59",
    "60-69",
    "more than 70",
];

pub const GENDER_LABELS: [&str; 2] = ["Male", "Female"];

pub const RACE_LABELS: [&str; 7] = [
    "White",
    "Black",
    "Indian",
    "East Asian",
    "Southeast Asian",
    "Middle Eastern",
    "Latino",
];

/// Number of generated prompt sentences (age x race x gender)
pub const SENTENCE_COUNT: usize = AGE_LABELS.len() * RACE_LABELS.len() * GENDER_LABELS.len();

/// One of the demographic attributes being predicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Age,
    Gender,
    Race,
}

impl Category {
    /// Response order: age, gender, race
    pub const ALL: [Category; 3] = [Category::Age, Category::Gender, Category::Race];

    #[inline]
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Category::Age => &AGE_LABELS,
            Category::Gender => &GENDER_LABELS,
            Category::Race => &RACE_LABELS,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Age => "age",
            Category::Gender => "gender",
            Category::Race => "race",
        }
    }

    /// Look a label up in this category's vocabulary
    pub fn find(self, label: &str) -> Option<&'static str> {
        self.labels().iter().copied().find(|l| *l == label)
    }

    /// Vocabulary term of this category that occurs in `text`.
    ///
    /// Several terms are substrings of others ("Male" in "Female",
    /// "0-2" in "20-29", "East Asian" in "Southeast Asian"), so the
    /// longest occurring term wins.
    pub fn term_in(self, text: &str) -> Option<&'static str> {
        self.labels()
            .iter()
            .copied()
            .filter(|term| text.contains(term))
            .max_by_key(|term| term.len())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three resolved labels for one embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub age: String,
    pub gender: String,
    pub race: String,
}

impl LabelSet {
    /// Every category set to [`NO_LABEL`]
    pub fn unidentified() -> Self {
        Self {
            age: NO_LABEL.to_string(),
            gender: NO_LABEL.to_string(),
            race: NO_LABEL.to_string(),
        }
    }

    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Age => &self.age,
            Category::Gender => &self.gender,
            Category::Race => &self.race,
        }
    }

    pub fn set(&mut self, category: Category, label: impl Into<String>) {
        let slot = match category {
            Category::Age => &mut self.age,
            Category::Gender => &mut self.gender,
            Category::Race => &mut self.race,
        };
        *slot = label.into();
    }

    pub fn is_identified(&self, category: Category) -> bool {
        self.get(category) != NO_LABEL
    }

    /// `[age, gender, race]`
    pub fn into_array(self) -> [String; 3] {
        [self.age, self.gender, self.race]
    }
}

/// Prompt sentence for one label combination
pub fn sentence(age: &str, race: &str, gender: &str) -> String {
    format!("A photo of a {} year old {} {}.", age, race, gender)
}

/// All prompt sentences, nested age, then race, then gender
pub fn build_sentences() -> Vec<String> {
    let mut sentences = Vec::with_capacity(SENTENCE_COUNT);
    for age in AGE_LABELS {
        for race in RACE_LABELS {
            for gender in GENDER_LABELS {
                sentences.push(sentence(age, race, gender));
            }
        }
    }
    sentences
}

/// Recover the labels a sentence was built from. Categories with no
/// matching term come back as [`NO_LABEL`].
pub fn extract_labels(text: &str) -> LabelSet {
    let mut labels = LabelSet::unidentified();
    for category in Category::ALL {
        if let Some(term) = category.term_in(text) {
            labels.set(category, term);
        }
    }
    labels
}
