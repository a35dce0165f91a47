mod validator;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use validator::{validate_response, ValidatedResponse};

/// Difficulty as reported by the model. Anything outside the three known levels is kept
/// verbatim in `Unrecognized` so callers can decide what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Unrecognized(String),
}

impl Difficulty {
    pub const KNOWN: [&'static str; 3] = ["Easy", "Medium", "Hard"];

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "easy" => Self::Easy,
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            _ => Self::Unrecognized(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    name: String,
    quantity: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> &str {
        &self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    recipe_name: String,
    difficulty: Difficulty,
    prep_time: String,
    calories: String,
    ingredients: Vec<Ingredient>,
    steps: Vec<String>,
    missing_ingredients: Vec<String>,
}

impl Recipe {
    pub fn builder(recipe_name: impl Into<String>) -> RecipeBuilder {
        RecipeBuilder {
            recipe: Recipe {
                recipe_name: recipe_name.into(),
                difficulty: Difficulty::Easy,
                prep_time: String::new(),
                calories: String::new(),
                ingredients: Vec::new(),
                steps: Vec::new(),
                missing_ingredients: Vec::new(),
            },
        }
    }

    pub fn recipe_name(&self) -> &str {
        &self.recipe_name
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn prep_time(&self) -> &str {
        &self.prep_time
    }

    pub fn calories(&self) -> &str {
        &self.calories
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn missing_ingredients(&self) -> &[String] {
        &self.missing_ingredients
    }
}

/// Assembles a [`Recipe`] in one go; the result cannot be changed afterwards.
#[derive(Debug, Clone)]
pub struct RecipeBuilder {
    recipe: Recipe,
}

impl RecipeBuilder {
    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.recipe.difficulty = difficulty;
        self
    }

    pub fn prep_time(mut self, prep_time: impl Into<String>) -> Self {
        self.recipe.prep_time = prep_time.into();
        self
    }

    pub fn calories(mut self, calories: impl Into<String>) -> Self {
        self.recipe.calories = calories.into();
        self
    }

    pub fn ingredient(mut self, name: impl Into<String>, quantity: impl Into<String>) -> Self {
        self.recipe.ingredients.push(Ingredient::new(name, quantity));
        self
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.recipe.steps.push(step.into());
        self
    }

    pub fn missing(mut self, item: impl Into<String>) -> Self {
        self.recipe.missing_ingredients.push(item.into());
        self
    }

    pub fn build(self) -> Recipe {
        self.recipe
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Difficulty, Recipe};

    #[test]
    fn difficulty_parses_case_insensitively_and_keeps_unknown_text() {
        assert_eq!(Difficulty::parse("easy"), Difficulty::Easy);
        assert_eq!(Difficulty::parse(" MEDIUM "), Difficulty::Medium);
        assert_eq!(Difficulty::parse("Hard"), Difficulty::Hard);
        assert_eq!(
            Difficulty::parse("Expert"),
            Difficulty::Unrecognized("Expert".to_string())
        );
        assert!(!Difficulty::parse("Expert").is_recognized());
    }

    #[test]
    fn recipe_uses_camel_case_wire_names() -> anyhow::Result<()> {
        let recipe = Recipe::builder("Omelette")
            .difficulty(Difficulty::Medium)
            .prep_time("10 minutes")
            .calories("320 kcal")
            .ingredient("eggs", "3")
            .step("Whisk the eggs.")
            .missing("chives")
            .build();
        let value = serde_json::to_value(&recipe)?;
        assert_eq!(
            value,
            json!({
                "recipeName": "Omelette",
                "difficulty": "Medium",
                "prepTime": "10 minutes",
                "calories": "320 kcal",
                "ingredients": [{"name": "eggs", "quantity": "3"}],
                "steps": ["Whisk the eggs."],
                "missingIngredients": ["chives"],
            })
        );
        let back: Recipe = serde_json::from_value(value)?;
        assert_eq!(back, recipe);
        Ok(())
    }
}
