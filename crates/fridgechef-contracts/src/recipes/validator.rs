use serde_json::Value;

use super::Recipe;
use crate::errors::RecipeError;

/// Outcome of checking the model's text against the recipe array contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedResponse {
    Recipes(Vec<Recipe>),
    /// Parsed fine but the top level was not an array. Reported, not raised.
    EmptyResult { reason: String },
}

impl ValidatedResponse {
    pub fn into_recipes(self) -> Vec<Recipe> {
        match self {
            Self::Recipes(recipes) => recipes,
            Self::EmptyResult { .. } => Vec::new(),
        }
    }
}

pub fn validate_response(raw: &str) -> Result<ValidatedResponse, RecipeError> {
    let body = strip_code_fence(raw.trim());
    let parsed: Value = serde_json::from_str(body)
        .map_err(|err| RecipeError::validation(format!("response is not JSON: {err}")))?;

    let Value::Array(items) = parsed else {
        return Ok(ValidatedResponse::EmptyResult {
            reason: format!("expected a JSON array, got {}", json_kind(&parsed)),
        });
    };

    let mut recipes = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let recipe: Recipe = serde_json::from_value(item)
            .map_err(|err| RecipeError::validation(format!("recipe {idx}: {err}")))?;
        check_recipe(idx, &recipe)?;
        recipes.push(recipe);
    }
    Ok(ValidatedResponse::Recipes(recipes))
}

// A bad difficulty fails the whole batch; we never show a partial list.
fn check_recipe(idx: usize, recipe: &Recipe) -> Result<(), RecipeError> {
    if recipe.recipe_name().trim().is_empty() {
        return Err(RecipeError::validation(format!(
            "recipe {idx}: recipeName is empty"
        )));
    }
    if !recipe.difficulty().is_recognized() {
        return Err(RecipeError::validation(format!(
            "recipe {idx}: difficulty '{}' is not one of Easy, Medium, Hard",
            recipe.difficulty()
        )));
    }
    for (ing_idx, ingredient) in recipe.ingredients().iter().enumerate() {
        if ingredient.name().trim().is_empty() || ingredient.quantity().trim().is_empty() {
            return Err(RecipeError::validation(format!(
                "recipe {idx}: ingredient {ing_idx} needs a name and a quantity"
            )));
        }
    }
    Ok(())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.trim_end().strip_suffix("```") else {
        return text;
    };
    // drop the language tag line, e.g. ```json
    match rest.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => rest.trim(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
