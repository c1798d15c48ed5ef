//! Descriptive statistics over an aggregated tree.
//!
//! Kept apart from scoring; nothing here feeds back into the metrics.

use crate::aggregate::GhostTree;
use crate::prediction::{Category, Prediction};
use serde::{Deserialize, Serialize};

/// Question counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub objects: usize,
    pub attributes: usize,
    pub relations: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Objects => self.objects,
            Category::Attributes => self.attributes,
            Category::Relations => self.relations,
        }
    }

    fn add(&mut self, category: Category, count: usize) {
        match category {
            Category::Objects => self.objects += count,
            Category::Attributes => self.attributes += count,
            Category::Relations => self.relations += count,
        }
    }
}

/// How often each normalized answer occurred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionCounts {
    #[serde(rename = "true")]
    pub true_count: usize,
    #[serde(rename = "false")]
    pub false_count: usize,
    pub unknown: usize,
}

impl PredictionCounts {
    fn add(&mut self, prediction: Prediction) {
        match prediction {
            Prediction::True => self.true_count += 1,
            Prediction::False => self.false_count += 1,
            Prediction::Unknown => self.unknown += 1,
        }
    }
}

/// Counts reported next to the metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionStats {
    pub total_questions: usize,
    pub unique_images: usize,
    pub unique_objects: usize,
    pub per_category: CategoryCounts,
    pub predictions: PredictionCounts,
}

impl PredictionStats {
    /// Reduce the tree to counts.
    pub fn from_tree(tree: &GhostTree) -> Self {
        let mut stats = Self {
            unique_images: tree.image_count(),
            ..Self::default()
        };

        for (_, object) in tree.objects() {
            stats.unique_objects += 1;
            for category in Category::ALL {
                stats.per_category.add(category, object.bucket(category).len());
            }
            for (_, entry) in object.entries() {
                stats.total_questions += 1;
                stats.predictions.add(entry.prediction);
            }
        }

        stats
    }
}
