use std::fmt::Write as _;

use fridgechef_contracts::filters::{FilterSet, DIETARY_OPTIONS};
use fridgechef_contracts::image::ImagePayload;
use fridgechef_contracts::recipes::Recipe;
use fridgechef_contracts::session::{ActiveTab, Phase, Session};
use fridgechef_contracts::shopping::ShoppingList;

pub const NO_RECIPES: &str = "No recipes found. Try a different photo or adjust your filters.";
pub const EMPTY_SHOPPING_LIST: &str = "Your shopping list is empty.";
pub const UPLOAD_PROMPT: &str = "Snap a photo of your fridge and load it with /photo <path>.";

/// Whole screen for the session's current phase.
pub fn render_screen(session: &Session) -> String {
    match session.phase() {
        Phase::NoImage => format!("{}\n{UPLOAD_PROMPT}\n", render_filters(session.filters())),
        Phase::Cooking => match session.selected_recipe() {
            Some(recipe) => render_cooking(recipe, session.current_step(), session.is_speaking()),
            None => String::new(),
        },
        Phase::Loading | Phase::Error | Phase::ReadyBrowsing => {
            let mut out = String::from("== Suggested Recipes ==\n");
            out.push_str(&render_recipe_grid(
                &session.visible_recipes(),
                session.phase() == Phase::Loading,
                session.error(),
            ));
            out.push('\n');
            out.push_str(&render_tabs(
                session.active_tab(),
                session.shopping_list().len(),
            ));
            match session.active_tab() {
                ActiveTab::Recipes => {
                    if let Some(image) = session.image() {
                        out.push_str(&render_fridge_panel(image));
                    }
                }
                ActiveTab::Shopping => out.push_str(&render_shopping_list(session.shopping_list())),
            }
            out
        }
    }
}

pub fn render_filters(filters: &FilterSet) -> String {
    let mut out = String::from("Dietary Filters\n");
    for option in DIETARY_OPTIONS {
        let mark = if filters.contains(option) { 'x' } else { ' ' };
        let _ = writeln!(out, "  [{mark}] {option}");
    }
    out
}

pub fn render_recipe_grid(recipes: &[&Recipe], loading: bool, error: Option<&str>) -> String {
    if loading {
        return "Analyzing your photo...\n".to_string();
    }
    if let Some(message) = error {
        return format!("! {message}\n");
    }
    if recipes.is_empty() {
        return format!("{NO_RECIPES}\n");
    }
    recipes
        .iter()
        .enumerate()
        .map(|(idx, recipe)| render_recipe_card(idx + 1, recipe))
        .collect()
}

pub fn render_recipe_card(number: usize, recipe: &Recipe) -> String {
    let mut out = format!(
        "{number}. {}\n   {} | {} | {}\n",
        recipe.recipe_name(),
        recipe.difficulty(),
        recipe.prep_time(),
        recipe.calories()
    );
    let missing = recipe.missing_ingredients();
    if !missing.is_empty() {
        let _ = writeln!(out, "   missing: {}", missing.join(", "));
    }
    out
}

pub fn render_tabs(active: ActiveTab, shopping_count: usize) -> String {
    let (fridge, shopping) = match active {
        ActiveTab::Recipes => ("[Fridge]", format!(" Shopping List ({shopping_count}) ")),
        ActiveTab::Shopping => (" Fridge ", format!("[Shopping List ({shopping_count})]")),
    };
    format!("{fridge} {shopping}\n")
}

pub fn render_fridge_panel(image: &ImagePayload) -> String {
    format!(
        "Your Fridge: {} photo, {} bytes\n",
        image.mime_type(),
        image.decoded_len()
    )
}

pub fn render_shopping_list(list: &ShoppingList) -> String {
    if list.is_empty() {
        return format!("{EMPTY_SHOPPING_LIST}\n");
    }
    let mut out = String::from("Shopping List\n");
    for item in list.items() {
        let _ = writeln!(out, "  [ ] {item}");
    }
    out
}

pub fn render_cooking(recipe: &Recipe, step: Option<(usize, &str)>, speaking: bool) -> String {
    let mut out = format!("== {} ==\nIngredients\n", recipe.recipe_name());
    for ingredient in recipe.ingredients() {
        let _ = writeln!(out, "  * {} {}", ingredient.quantity(), ingredient.name());
    }
    let missing = recipe.missing_ingredients();
    if !missing.is_empty() {
        out.push_str("Missing Ingredients (/missing adds them to your list)\n");
        for item in missing {
            let _ = writeln!(out, "  - {item}");
        }
    }
    let total = recipe.steps().len();
    match step {
        Some((number, text)) => {
            let _ = writeln!(out, "\nSTEP {number} OF {total}\n{text}");
        }
        None => out.push_str("\nThis recipe has no steps.\n"),
    }
    let read = if speaking { "/read to pause" } else { "/read aloud" };
    let _ = writeln!(out, "\n/prev  /next  {read}  /done");
    out
}
