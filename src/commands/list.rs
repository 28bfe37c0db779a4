//! `provision list`: print the recipe catalog.
use crate::recipes::{InstallRecipe, catalog};

/// Print every recipe with the package managers it can install through.
pub fn run() {
    for line in lines(&catalog::all()) {
        println!("{line}");
    }
}

fn lines(recipes: &[InstallRecipe]) -> Vec<String> {
    let width = recipes.iter().map(|r| r.name.len()).max().unwrap_or(0);
    recipes
        .iter()
        .map(|r| {
            format!(
                "{:<width$}  {} [{}]",
                r.name,
                r.description,
                r.supported().join(", ")
            )
        })
        .collect()
}
