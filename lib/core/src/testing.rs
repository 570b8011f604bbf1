// Unit-test fixtures: reference vectors where every vocabulary label owns
// one axis, so the expected zero-shot answer is obvious from the query.

use crate::reference::{ReferenceEmbeddings, ReferenceFile};
use crate::vocabulary::{build_sentences, extract_labels, Category};

pub const TEST_DIM: usize = 32;

/// Free axis used to place neighbours at increasing distances
const SPREAD_AXIS: usize = 24;

fn offset(category: Category) -> usize {
    match category {
        Category::Age => 0,
        Category::Gender => 9,
        Category::Race => 11,
    }
}

pub fn label_axis(category: Category, label: &str) -> usize {
    let slot = category
        .labels()
        .iter()
        .position(|l| *l == label)
        .unwrap_or_else(|| panic!("{} is not a {} label", label, category));
    offset(category) + slot
}

fn unit(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; TEST_DIM];
    v[axis] = 1.0;
    v
}

pub fn embedding_for(age: &str, gender: &str, race: &str) -> Vec<f32> {
    let mut v = vec![0.0; TEST_DIM];
    v[label_axis(Category::Age, age)] = 1.0;
    v[label_axis(Category::Gender, gender)] = 1.0;
    v[label_axis(Category::Race, race)] = 1.0;
    v
}

/// `base` moved `steps` small increments along an axis no label uses
pub fn nudge(base: &[f32], steps: usize) -> Vec<f32> {
    let mut v = base.to_vec();
    v[SPREAD_AXIS] += steps as f32 * 0.05;
    v
}

pub fn axis_reference() -> ReferenceEmbeddings {
    let bank = |c: Category| -> Vec<Vec<f32>> {
        c.labels().iter().map(|l| unit(label_axis(c, l))).collect()
    };
    let sentences: Vec<Vec<f32>> = build_sentences()
        .iter()
        .map(|s| {
            let labels = extract_labels(s);
            embedding_for(&labels.age, &labels.gender, &labels.race)
        })
        .collect();

    ReferenceEmbeddings::from_parts(
        TEST_DIM,
        ReferenceFile {
            age: bank(Category::Age),
            gender: bank(Category::Gender),
            race: bank(Category::Race),
            sentences,
        },
    )
    .expect("axis reference is well formed")
}
