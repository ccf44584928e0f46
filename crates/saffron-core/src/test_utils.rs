//! Test utilities for saffron-core.
//!
//! Shared fixtures for unit tests: the normalization golden set and a small
//! recipe corpus. Only compiled when running tests.

use crate::recipe::{DisplayRecord, RecipeRecord};
use crate::search::types::RecipeId;

/// Golden normalization cases, shared by every call site of `light_normalize`.
pub const NORMALIZATION_GOLDEN: &[(&str, &str)] = &[
    ("Chocolate Chip Cookies", "chocolate chip cookies"),
    ("Mac & Cheese!", "mac and cheese"),
    ("peanut butter+jelly", "peanut butter and jelly"),
    ("sweet/sour sauce", "sweet and sour sauce"),
    ("Grandma's  Stir-Fry", "grandmas stir-fry"),
    ("  30-minute   meals\t", "30-minute meals"),
    ("Low-Fat (Healthy) Chicken", "low-fat healthy chicken"),
    ("", ""),
    ("!!!", ""),
];

/// Builds a normalized recipe record.
pub fn recipe(id: u64, name: &str, description: &str, tags: &[&str], ingredients: &[&str]) -> RecipeRecord {
    RecipeRecord {
        id: RecipeId::from_u64(id),
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ingredients: ingredients.iter().map(|i| i.to_string()).collect(),
    }
}

/// A small corpus covering desserts, breads and mains.
pub fn sample_corpus() -> Vec<RecipeRecord> {
    vec![
        recipe(
            42,
            "chocolate chip cookies",
            "classic chewy cookies",
            &["desserts", "cookies-and-brownies"],
            &["chocolate chips", "flour", "butter", "sugar"],
        ),
        recipe(
            7,
            "banana bread",
            "moist quick bread with ripe bananas",
            &["breads", "breakfast"],
            &["banana", "flour", "eggs"],
        ),
        recipe(
            19,
            "chicken curry",
            "mild weeknight curry",
            &["curries", "main-dish"],
            &["chicken", "coconut milk", "curry powder"],
        ),
        recipe(
            23,
            "tomato basil soup",
            "bright summer soup",
            &["soups-stews", "vegetables"],
            &["tomato", "basil", "onion"],
        ),
        recipe(
            31,
            "garlic butter shrimp",
            "fast skillet dinner",
            &["seafood", "main-dish"],
            &["shrimp", "garlic", "butter"],
        ),
    ]
}

/// Display records matching [`sample_corpus`], keyed the same way.
pub fn sample_display() -> Vec<(RecipeId, DisplayRecord)> {
    sample_corpus()
        .into_iter()
        .map(|r| {
            let display = DisplayRecord {
                name: r.name.clone(),
                description: r.description.clone(),
                tags: r.tags.clone(),
                ingredients: r.ingredients.clone(),
            };
            (r.id, display)
        })
        .collect()
}
