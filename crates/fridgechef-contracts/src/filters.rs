use indexmap::IndexSet;

use crate::errors::SessionError;
use crate::recipes::Recipe;

pub const DIETARY_OPTIONS: &[&str] = &[
    "Vegetarian",
    "Vegan",
    "Gluten-Free",
    "Keto",
    "Low-Carb",
    "Dairy-Free",
];

/// Active dietary filters, kept in the order they were switched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    active: IndexSet<&'static str>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for name in names {
            let option = canonical_option(name.as_ref())?;
            set.active.insert(option);
        }
        Ok(set)
    }

    /// Flips `name` on or off and reports whether it is now active.
    pub fn toggle(&mut self, name: &str) -> Result<bool, SessionError> {
        let option = canonical_option(name)?;
        if self.active.shift_remove(option) {
            return Ok(false);
        }
        self.active.insert(option);
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        canonical_option(name)
            .map(|option| self.active.contains(option))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.active.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }
}

fn canonical_option(name: &str) -> Result<&'static str, SessionError> {
    let trimmed = name.trim();
    DIETARY_OPTIONS
        .iter()
        .copied()
        .find(|option| option.eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| SessionError::UnknownFilter(trimmed.to_string()))
}

/// Local re-check of dietary filters against fetched recipes.
///
/// A recipe survives when every filter appears, case-insensitively, in its name or in
/// at least one ingredient name. This is a keyword heuristic and errs towards keeping
/// recipes; it says nothing about whether a dish really fits the diet.
pub fn filter_recipes<'a, S: AsRef<str>>(recipes: &'a [Recipe], filters: &[S]) -> Vec<&'a Recipe> {
    if filters.is_empty() {
        return recipes.iter().collect();
    }
    let needles: Vec<String> = filters
        .iter()
        .map(|filter| filter.as_ref().to_lowercase())
        .collect();
    recipes
        .iter()
        .filter(|recipe| needles.iter().all(|needle| mentions(recipe, needle)))
        .collect()
}

fn mentions(recipe: &Recipe, needle: &str) -> bool {
    recipe.recipe_name().to_lowercase().contains(needle)
        || recipe
            .ingredients()
            .iter()
            .any(|ingredient| ingredient.name().to_lowercase().contains(needle))
}
