use std::fmt;

use serde::Serialize;

use crate::errors::{RecipeError, SessionError};
use crate::filters::{filter_recipes, FilterSet};
use crate::image::ImagePayload;
use crate::recipes::Recipe;
use crate::shopping::ShoppingList;
use crate::speech::Speaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoImage,
    Loading,
    Error,
    ReadyBrowsing,
    Cooking,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoImage => "waiting for a photo",
            Self::Loading => "loading recipes",
            Self::Error => "showing an error",
            Self::ReadyBrowsing => "browsing recipes",
            Self::Cooking => "cooking",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTab {
    #[default]
    Recipes,
    Shopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a fetch needs, captured at submission time.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub request_id: RequestId,
    pub image: ImagePayload,
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchApplied {
    Applied,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchStatus {
    Idle,
    Loading,
    Error(String),
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CookingState {
    recipe_index: usize,
    step: usize,
}

/// Session-wide UI state and the transitions between phases.
///
/// Shopping list and filters live for the whole session; image, recipes, selection
/// and error belong to the current photo and are dropped by [`Session::new_photo`].
pub struct Session {
    image: Option<ImagePayload>,
    status: FetchStatus,
    recipes: Vec<Recipe>,
    cooking: Option<CookingState>,
    active_tab: ActiveTab,
    filters: FilterSet,
    shopping_list: ShoppingList,
    last_request_id: u64,
    pending_request: Option<RequestId>,
    speaker: Box<dyn Speaker>,
}

impl Session {
    pub fn new(speaker: Box<dyn Speaker>) -> Self {
        Self {
            image: None,
            status: FetchStatus::Idle,
            recipes: Vec::new(),
            cooking: None,
            active_tab: ActiveTab::Recipes,
            filters: FilterSet::new(),
            shopping_list: ShoppingList::new(),
            last_request_id: 0,
            pending_request: None,
            speaker,
        }
    }

    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    pub fn phase(&self) -> Phase {
        if self.image.is_none() {
            return Phase::NoImage;
        }
        match self.status {
            FetchStatus::Loading => Phase::Loading,
            FetchStatus::Error(_) => Phase::Error,
            FetchStatus::Idle | FetchStatus::Ready => {
                if self.cooking.is_some() {
                    Phase::Cooking
                } else {
                    Phase::ReadyBrowsing
                }
            }
        }
    }

    /// Starts a fetch for `image`; any fetch still in flight becomes stale.
    pub fn submit_image(&mut self, image: ImagePayload) -> Result<FetchTicket, SessionError> {
        match self.phase() {
            Phase::Cooking => {
                return Err(SessionError::InvalidTransition {
                    action: "submit a photo",
                    phase: Phase::Cooking,
                })
            }
            Phase::ReadyBrowsing | Phase::Error => self.new_photo(),
            Phase::NoImage | Phase::Loading => {}
        }

        self.last_request_id += 1;
        let request_id = RequestId(self.last_request_id);
        self.pending_request = Some(request_id);
        self.image = Some(image.clone());
        self.recipes.clear();
        self.status = FetchStatus::Loading;

        Ok(FetchTicket {
            request_id,
            image,
            filters: self.filters.to_vec(),
        })
    }

    /// Applies a finished fetch if it is still the one we are waiting for.
    pub fn complete_fetch(
        &mut self,
        request_id: RequestId,
        result: Result<Vec<Recipe>, RecipeError>,
    ) -> FetchApplied {
        if self.pending_request != Some(request_id) || self.phase() != Phase::Loading {
            return FetchApplied::Stale;
        }
        self.pending_request = None;
        match result {
            Ok(recipes) => {
                self.recipes = recipes;
                self.status = FetchStatus::Ready;
            }
            Err(err) => {
                self.recipes.clear();
                self.status = FetchStatus::Error(err.user_message().to_string());
            }
        }
        FetchApplied::Applied
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.pending_request
    }

    /// Enters cooking mode for the `index`-th recipe currently on screen.
    pub fn select_recipe(&mut self, index: usize) -> Result<&Recipe, SessionError> {
        self.require(Phase::ReadyBrowsing, "select a recipe")?;
        let visible = self.visible_indices();
        let Some(&recipe_index) = visible.get(index) else {
            return Err(SessionError::NoSuchRecipe {
                index,
                available: visible.len(),
            });
        };
        self.cooking = Some(CookingState {
            recipe_index,
            step: 0,
        });
        Ok(&self.recipes[recipe_index])
    }

    pub fn exit_cooking(&mut self) -> Result<(), SessionError> {
        self.require(Phase::Cooking, "leave cooking mode")?;
        self.speaker.cancel();
        self.cooking = None;
        Ok(())
    }

    pub fn next_step(&mut self) -> Result<bool, SessionError> {
        self.move_step(1)
    }

    pub fn previous_step(&mut self) -> Result<bool, SessionError> {
        self.move_step(-1)
    }

    fn move_step(&mut self, delta: isize) -> Result<bool, SessionError> {
        self.require(Phase::Cooking, "change steps")?;
        self.speaker.cancel();
        let Some(cooking) = self.cooking else {
            return Ok(false);
        };
        let total = self.recipes[cooking.recipe_index].steps().len();
        let Some(target) = cooking.step.checked_add_signed(delta) else {
            return Ok(false);
        };
        if target >= total {
            return Ok(false);
        }
        self.cooking = Some(CookingState {
            step: target,
            ..cooking
        });
        Ok(true)
    }

    /// Reads the current step aloud, or stops reading if already speaking.
    /// Returns whether speech is running afterwards.
    pub fn toggle_read_aloud(&mut self) -> anyhow::Result<bool> {
        self.require(Phase::Cooking, "read aloud")?;
        if self.speaker.is_speaking() {
            self.speaker.cancel();
            return Ok(false);
        }
        let (step_number, text) = self.current_step().ok_or(SessionError::NoSteps)?;
        let narration = format!("Step {step_number}: {text}");
        self.speaker.speak(&narration)?;
        Ok(self.speaker.is_speaking())
    }

    /// Back to the upload prompt. Shopping list and filters survive.
    pub fn new_photo(&mut self) {
        if self.phase() == Phase::NoImage {
            return;
        }
        self.speaker.cancel();
        self.image = None;
        self.recipes.clear();
        self.cooking = None;
        self.status = FetchStatus::Idle;
        self.pending_request = None;
    }

    pub fn toggle_filter(&mut self, name: &str) -> Result<bool, SessionError> {
        if self.phase() == Phase::Cooking {
            return Err(SessionError::InvalidTransition {
                action: "change filters",
                phase: Phase::Cooking,
            });
        }
        self.filters.toggle(name)
    }

    /// Puts the selected recipe's missing ingredients on the shopping list and jumps
    /// to the shopping tab so the user sees what was added.
    pub fn add_missing_to_shopping_list(&mut self) -> Result<usize, SessionError> {
        self.require(Phase::Cooking, "add missing ingredients")?;
        let Some(recipe) = self.selected_recipe() else {
            return Ok(0);
        };
        let missing = recipe.missing_ingredients().to_vec();
        let added = self.shopping_list.add_items(missing);
        self.active_tab = ActiveTab::Shopping;
        Ok(added)
    }

    pub fn clear_shopping_list(&mut self) {
        self.shopping_list.clear();
    }

    pub fn set_active_tab(&mut self, tab: ActiveTab) {
        self.active_tab = tab;
    }

    pub fn visible_recipes(&self) -> Vec<&Recipe> {
        filter_recipes(&self.recipes, &self.filters.to_vec())
    }

    fn visible_indices(&self) -> Vec<usize> {
        let visible = self.visible_recipes();
        self.recipes
            .iter()
            .enumerate()
            .filter(|(_, recipe)| visible.iter().any(|shown| std::ptr::eq(*shown, *recipe)))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn selected_recipe(&self) -> Option<&Recipe> {
        self.cooking
            .map(|cooking| &self.recipes[cooking.recipe_index])
    }

    /// One-based step number and its text.
    pub fn current_step(&self) -> Option<(usize, &str)> {
        let cooking = self.cooking?;
        let text = self.recipes[cooking.recipe_index].steps().get(cooking.step)?;
        Some((cooking.step + 1, text.as_str()))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn shopping_list(&self) -> &ShoppingList {
        &self.shopping_list
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.active_tab
    }

    pub fn is_speaking(&self) -> bool {
        self.speaker.is_speaking()
    }

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), SessionError> {
        let current = self.phase();
        if current != phase {
            return Err(SessionError::InvalidTransition {
                action,
                phase: current,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{ActiveTab, FetchApplied, Phase, Session};
    use crate::errors::{RecipeError, SessionError, RETRY_MESSAGE};
    use crate::image::ImagePayload;
    use crate::recipes::{Difficulty, Recipe};
    use crate::speech::Speaker;

    #[derive(Default)]
    struct SpeechLog {
        spoken: Vec<String>,
        cancels: usize,
        speaking: bool,
    }

    #[derive(Clone, Default)]
    struct RecordingSpeaker(Rc<RefCell<SpeechLog>>);

    impl Speaker for RecordingSpeaker {
        fn speak(&mut self, text: &str) -> anyhow::Result<()> {
            let mut log = self.0.borrow_mut();
            log.spoken.push(text.to_string());
            log.speaking = true;
            Ok(())
        }

        fn cancel(&mut self) {
            let mut log = self.0.borrow_mut();
            log.cancels += 1;
            log.speaking = false;
        }

        fn is_speaking(&self) -> bool {
            self.0.borrow().speaking
        }
    }

    fn photo() -> ImagePayload {
        ImagePayload::from_data_url("data:image/jpeg;base64,/9j/4AAQSkZJRg==").unwrap()
    }

    fn recipes() -> Vec<Recipe> {
        vec![
            Recipe::builder("Vegan Chili")
                .difficulty(Difficulty::Medium)
                .ingredient("kidney beans", "1 can")
                .step("Fry the onions.")
                .step("Add beans and simmer.")
                .step("Season and serve.")
                .missing("cumin")
                .missing("chili flakes")
                .build(),
            Recipe::builder("Egg Fried Rice")
                .ingredient("rice", "2 cups")
                .ingredient("eggs", "2")
                .step("Scramble the eggs.")
                .missing("soy sauce")
                .build(),
            Recipe::builder("Tomato Soup")
                .ingredient("tomatoes", "6")
                .step("Roast the tomatoes.")
                .build(),
        ]
    }

    fn ready_session() -> (Session, RecordingSpeaker) {
        let speaker = RecordingSpeaker::default();
        let mut session = Session::new(Box::new(speaker.clone()));
        let ticket = session.submit_image(photo()).unwrap();
        assert_eq!(
            session.complete_fetch(ticket.request_id, Ok(recipes())),
            FetchApplied::Applied
        );
        (session, speaker)
    }

    #[test]
    fn upload_goes_through_loading_to_browsing() -> Result<(), SessionError> {
        let mut session = Session::new(Box::new(RecordingSpeaker::default()));
        assert_eq!(session.phase(), Phase::NoImage);
        session.toggle_filter("vegan")?;
        let ticket = session.submit_image(photo())?;
        assert_eq!(session.phase(), Phase::Loading);
        assert_eq!(ticket.filters, vec!["Vegan".to_string()]);
        assert!(session.recipes().is_empty());

        session.complete_fetch(ticket.request_id, Ok(recipes()));
        assert_eq!(session.phase(), Phase::ReadyBrowsing);
        assert_eq!(session.recipes().len(), 3);
        let visible = session.visible_recipes();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].recipe_name(), "Vegan Chili");
        Ok(())
    }

    #[test]
    fn fetch_error_keeps_image_and_empty_grid() {
        let mut session = Session::new(Box::new(RecordingSpeaker::default()));
        let ticket = session.submit_image(photo()).unwrap();
        session.complete_fetch(ticket.request_id, Err(RecipeError::fetch("dns failure")));
        assert_eq!(session.phase(), Phase::Error);
        assert_eq!(session.error(), Some(RETRY_MESSAGE));
        assert!(session.recipes().is_empty());
        assert!(session.image().is_some());
    }

    #[test]
    fn superseded_response_is_ignored() {
        let mut session = Session::new(Box::new(RecordingSpeaker::default()));
        let first = session.submit_image(photo()).unwrap();
        let second = session.submit_image(photo()).unwrap();
        assert!(second.request_id > first.request_id);

        assert_eq!(
            session.complete_fetch(first.request_id, Ok(recipes())),
            FetchApplied::Stale
        );
        assert_eq!(session.phase(), Phase::Loading);
        assert_eq!(
            session.complete_fetch(second.request_id, Ok(Vec::new())),
            FetchApplied::Applied
        );
        assert_eq!(session.phase(), Phase::ReadyBrowsing);
        assert!(session.recipes().is_empty());
    }

    #[test]
    fn response_after_new_photo_is_stale() {
        let mut session = Session::new(Box::new(RecordingSpeaker::default()));
        let ticket = session.submit_image(photo()).unwrap();
        session.new_photo();
        assert_eq!(
            session.complete_fetch(ticket.request_id, Ok(recipes())),
            FetchApplied::Stale
        );
        assert_eq!(session.phase(), Phase::NoImage);
    }

    #[test]
    fn cooking_round_trip_keeps_recipes_and_filters() -> Result<(), SessionError> {
        let (mut session, _) = ready_session();
        session.toggle_filter("Gluten-Free")?;
        session.toggle_filter("Gluten-Free")?;
        let before: Vec<Recipe> = session.visible_recipes().into_iter().cloned().collect();
        let filters_before = session.filters().clone();

        session.select_recipe(1)?;
        assert_eq!(session.phase(), Phase::Cooking);
        assert_eq!(
            session.toggle_filter("Vegan"),
            Err(SessionError::InvalidTransition {
                action: "change filters",
                phase: Phase::Cooking,
            })
        );
        session.exit_cooking()?;

        assert_eq!(session.phase(), Phase::ReadyBrowsing);
        let after: Vec<Recipe> = session.visible_recipes().into_iter().cloned().collect();
        assert_eq!(after, before);
        assert_eq!(session.filters(), &filters_before);
        Ok(())
    }

    #[test]
    fn selection_indexes_the_filtered_grid() -> Result<(), SessionError> {
        let (mut session, _) = ready_session();
        session.toggle_filter("eggs").unwrap_err();
        session.toggle_filter("Vegan")?;
        assert_eq!(
            session.select_recipe(1).unwrap_err(),
            SessionError::NoSuchRecipe {
                index: 1,
                available: 1,
            }
        );
        let chosen = session.select_recipe(0)?;
        assert_eq!(chosen.recipe_name(), "Vegan Chili");
        Ok(())
    }

    #[test]
    fn missing_ingredients_land_on_shopping_tab() -> Result<(), SessionError> {
        let (mut session, _) = ready_session();
        assert_eq!(session.active_tab(), ActiveTab::Recipes);
        session.select_recipe(0)?;
        assert_eq!(session.add_missing_to_shopping_list()?, 2);
        assert_eq!(session.add_missing_to_shopping_list()?, 0);
        assert_eq!(
            session.shopping_list().items().collect::<Vec<_>>(),
            vec!["cumin", "chili flakes"]
        );
        assert_eq!(session.active_tab(), ActiveTab::Shopping);
        Ok(())
    }

    #[test]
    fn new_photo_keeps_shopping_list_and_filters() -> Result<(), SessionError> {
        let (mut session, _) = ready_session();
        session.select_recipe(1)?;
        session.add_missing_to_shopping_list()?;
        session.exit_cooking()?;
        session.toggle_filter("Keto")?;

        session.new_photo();
        assert_eq!(session.phase(), Phase::NoImage);
        assert!(session.recipes().is_empty());
        assert!(session.selected_recipe().is_none());
        assert!(session.image().is_none());
        assert!(session.shopping_list().contains("soy sauce"));
        assert!(session.filters().contains("Keto"));
        Ok(())
    }

    #[test]
    fn step_navigation_is_bounded_and_cancels_speech() -> anyhow::Result<()> {
        let (mut session, speaker) = ready_session();
        session.select_recipe(0)?;
        assert_eq!(session.current_step(), Some((1, "Fry the onions.")));
        assert!(!session.previous_step()?);

        assert!(session.toggle_read_aloud()?);
        assert!(session.is_speaking());
        assert!(session.next_step()?);
        assert!(!session.is_speaking());
        assert!(session.next_step()?);
        assert!(!session.next_step()?);
        assert_eq!(session.current_step(), Some((3, "Season and serve.")));

        session.toggle_read_aloud()?;
        session.exit_cooking()?;
        assert!(!session.is_speaking());

        let log = speaker.0.borrow();
        assert_eq!(
            log.spoken,
            vec!["Step 1: Fry the onions.", "Step 3: Season and serve."]
        );
        assert_eq!(log.cancels, 5);
        Ok(())
    }

    #[test]
    fn read_aloud_toggles_off_when_speaking() -> anyhow::Result<()> {
        let (mut session, speaker) = ready_session();
        session.select_recipe(2)?;
        assert!(session.toggle_read_aloud()?);
        assert!(!session.toggle_read_aloud()?);
        assert_eq!(speaker.0.borrow().spoken.len(), 1);
        Ok(())
    }

    #[test]
    fn invalid_transitions_are_reported() {
        let mut session = Session::new(Box::new(RecordingSpeaker::default()));
        assert!(session.select_recipe(0).is_err());
        assert!(session.exit_cooking().is_err());
        assert!(session.add_missing_to_shopping_list().is_err());
        session.new_photo();
        assert_eq!(session.phase(), Phase::NoImage);
    }

    #[test]
    fn full_scenario_two_missing_items_switch_tab() -> Result<(), SessionError> {
        let (mut session, _) = ready_session();
        assert_eq!(session.recipes().len(), 3);
        session.select_recipe(0)?;
        session.add_missing_to_shopping_list()?;
        assert_eq!(session.shopping_list().len(), 2);
        assert_eq!(session.active_tab(), ActiveTab::Shopping);
        Ok(())
    }
}
