use std::path::Path;

use anyhow::Result;
use uuid::Uuid;

use crate::backend::{KvBackend, MemoryBackend, SqliteBackend};
use crate::models::{
    AppState, DEFAULT_TARGETS_KEY, DayTotals, MealEntry, MealTemplate, ShoppingItem, Targets,
    WeeklyPlan, WeightEntry, coerce_macro,
};
use crate::{planner, quotes, store, templates};

/// Facade over the persistent data layer: the single entry point UI surfaces
/// read and write through.
///
/// Owns one backend and the in-memory state snapshot loaded at construction.
/// Every mutation persists the snapshot before returning; a failed write
/// leaves the snapshot authoritative for the rest of the session.
pub struct Tracker {
    backend: Box<dyn KvBackend>,
    state: AppState,
    quote_corpus: Vec<String>,
}

impl Tracker {
    /// Build a tracker over any backend, loading (and migrating) whatever
    /// state it holds. The quote corpus is fixed for the session.
    #[must_use]
    pub fn new(backend: Box<dyn KvBackend>, quote_corpus: Vec<String>) -> Self {
        let state = store::load_state(backend.as_ref());
        Self {
            backend,
            state,
            quote_corpus,
        }
    }

    pub fn open(db_path: &Path, quote_corpus: Vec<String>) -> Result<Self> {
        Ok(Self::new(
            Box::new(SqliteBackend::open(db_path)?),
            quote_corpus,
        ))
    }

    #[must_use]
    pub fn new_in_memory(quote_corpus: Vec<String>) -> Self {
        Self::new(Box::new(MemoryBackend::new()), quote_corpus)
    }

    /// The current in-memory snapshot.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn persist(&self) {
        store::save_state(self.backend.as_ref(), &self.state);
    }

    // --- Targets ---

    pub fn set_targets(&mut self, date_iso: &str, calories: f64, protein: f64) {
        self.state.targets_by_date.insert(
            date_iso.to_string(),
            Targets {
                calories: coerce_macro(calories),
                protein: coerce_macro(protein),
            },
        );
        self.persist();
    }

    /// Fallback targets applied to dates without an entry of their own.
    pub fn set_default_targets(&mut self, calories: f64, protein: f64) {
        self.set_targets(DEFAULT_TARGETS_KEY, calories, protein);
    }

    #[must_use]
    pub fn targets_for(&self, date_iso: &str) -> Targets {
        self.state.targets_for(date_iso)
    }

    // --- Meal log ---

    /// Log a meal at the head of the list (newest-first). A meal with no
    /// name and zero macros is dropped; a named meal also refreshes the
    /// autocomplete template index.
    pub fn add_meal(
        &mut self,
        date_iso: &str,
        name: &str,
        calories: f64,
        protein: f64,
    ) -> Option<MealEntry> {
        let name = name.trim();
        let calories = coerce_macro(calories);
        let protein = coerce_macro(protein);
        if name.is_empty() && calories == 0.0 && protein == 0.0 {
            return None;
        }

        let entry = MealEntry {
            id: Uuid::new_v4().to_string(),
            date_iso: date_iso.to_string(),
            name: name.to_string(),
            calories,
            protein,
        };
        self.state.meals.insert(0, entry.clone());
        if !name.is_empty() {
            templates::upsert_template(self.backend.as_ref(), name, calories, protein);
        }
        self.persist();
        Some(entry)
    }

    pub fn delete_meal(&mut self, id: &str) -> bool {
        let before = self.state.meals.len();
        self.state.meals.retain(|m| m.id != id);
        let removed = self.state.meals.len() < before;
        if removed {
            self.persist();
        }
        removed
    }

    #[must_use]
    pub fn meals_for(&self, date_iso: &str) -> Vec<&MealEntry> {
        self.state
            .meals
            .iter()
            .filter(|m| m.date_iso == date_iso)
            .collect()
    }

    #[must_use]
    pub fn totals_for(&self, date_iso: &str) -> DayTotals {
        self.state.totals_for(date_iso)
    }

    // --- Weight log ---

    /// Record a weigh-in, rounded to 0.1 kg. Entries with an empty date or a
    /// non-finite or non-positive weight are dropped.
    pub fn add_weight(&mut self, date_iso: &str, weight_kg: f64) -> Option<WeightEntry> {
        if date_iso.is_empty() || !weight_kg.is_finite() || weight_kg <= 0.0 {
            return None;
        }
        let entry = WeightEntry {
            id: Uuid::new_v4().to_string(),
            date_iso: date_iso.to_string(),
            weight_kg: (weight_kg * 10.0).round() / 10.0,
        };
        self.state.weights.insert(0, entry.clone());
        self.persist();
        Some(entry)
    }

    /// Weigh-in history, newest date first.
    #[must_use]
    pub fn weights_sorted(&self) -> Vec<WeightEntry> {
        let mut sorted = self.state.weights.clone();
        sorted.sort_by(|a, b| b.date_iso.cmp(&a.date_iso));
        sorted
    }

    // --- Shopping list ---

    pub fn add_shopping_item(&mut self, text: &str) -> Option<ShoppingItem> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let item = ShoppingItem {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            done: false,
        };
        self.state.shopping.push(item.clone());
        self.persist();
        Some(item)
    }

    pub fn toggle_shopping_item(&mut self, id: &str) -> bool {
        let Some(item) = self.state.shopping.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        item.done = !item.done;
        self.persist();
        true
    }

    pub fn remove_shopping_item(&mut self, id: &str) -> bool {
        let before = self.state.shopping.len();
        self.state.shopping.retain(|i| i.id != id);
        let removed = self.state.shopping.len() < before;
        if removed {
            self.persist();
        }
        removed
    }

    // --- Weekly plans ---

    /// The plan for the week starting at `week_start_iso`, created (and
    /// persisted) on first access.
    pub fn plan_for_week(&mut self, week_start_iso: &str) -> WeeklyPlan {
        let existed = self
            .state
            .plans
            .iter()
            .any(|p| p.week_start_iso == week_start_iso);
        let plan = planner::get_or_create_plan(&mut self.state, week_start_iso).clone();
        if !existed {
            self.persist();
        }
        plan
    }

    pub fn set_plan_cell(
        &mut self,
        week_start_iso: &str,
        day: &str,
        slot: &str,
        text: &str,
    ) -> Result<()> {
        planner::set_cell_text(&mut self.state, week_start_iso, day, slot, text)?;
        self.persist();
        Ok(())
    }

    #[must_use]
    pub fn plan_cell(&self, week_start_iso: &str, day: &str, slot: &str) -> String {
        planner::cell_text(&self.state, week_start_iso, day, slot)
    }

    pub fn delete_plan(&mut self, week_start_iso: &str) -> bool {
        let removed = planner::delete_plan(&mut self.state, week_start_iso);
        if removed {
            self.persist();
        }
        removed
    }

    // --- Meal templates ---

    pub fn upsert_meal_template(&self, name: &str, calories: f64, protein: f64) {
        templates::upsert_template(self.backend.as_ref(), name, calories, protein);
    }

    #[must_use]
    pub fn search_meal_templates(&self, prefix: &str, limit: usize) -> Vec<MealTemplate> {
        templates::search_templates(self.backend.as_ref(), prefix, limit)
    }

    // --- Daily quote ---

    /// The quote for `today_iso` from the session corpus; stable within a
    /// calendar day, advancing one step per day transition.
    pub fn daily_quote(&self, today_iso: &str) -> String {
        quotes::daily_quote(self.backend.as_ref(), &self.quote_corpus, today_iso)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> Tracker {
        Tracker::new_in_memory(vec!["stay the course".to_string(), "eat well".to_string()])
    }

    #[test]
    fn test_add_meal_inserts_at_head() {
        let mut tracker = tracker();
        tracker.add_meal("2024-06-15", "Oatmeal", 150.0, 5.0).unwrap();
        tracker.add_meal("2024-06-15", "Chicken", 330.0, 62.0).unwrap();

        assert_eq!(tracker.state().meals[0].name, "Chicken");
        assert_eq!(tracker.state().meals[1].name, "Oatmeal");
    }

    #[test]
    fn test_add_meal_rejects_all_empty_entry() {
        let mut tracker = tracker();
        assert!(tracker.add_meal("2024-06-15", "  ", 0.0, 0.0).is_none());
        assert!(tracker.add_meal("2024-06-15", "", -5.0, f64::NAN).is_none());
        assert!(tracker.state().meals.is_empty());
    }

    #[test]
    fn test_add_meal_without_name_keeps_macros() {
        let mut tracker = tracker();
        let entry = tracker.add_meal("2024-06-15", "", 250.0, 10.0).unwrap();
        assert_eq!(entry.name, "");
        assert_eq!(entry.calories, 250.0);
        // No template is created for a nameless meal.
        assert!(tracker.search_meal_templates("a", 10).is_empty());
    }

    #[test]
    fn test_add_meal_refreshes_template_index() {
        let mut tracker = tracker();
        tracker
            .add_meal("2024-06-15", "Chicken Salad", 350.0, 30.0)
            .unwrap();
        tracker
            .add_meal("2024-06-16", "chicken salad", 360.0, 31.0)
            .unwrap();

        let results = tracker.search_meal_templates("chick", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uses, 2);
        assert_eq!(results[0].calories, 360.0);
    }

    #[test]
    fn test_delete_meal_by_id() {
        let mut tracker = tracker();
        let entry = tracker.add_meal("2024-06-15", "Oatmeal", 150.0, 5.0).unwrap();
        assert!(tracker.delete_meal(&entry.id));
        assert!(!tracker.delete_meal(&entry.id));
        assert!(tracker.state().meals.is_empty());
    }

    #[test]
    fn test_totals_and_targets() {
        let mut tracker = tracker();
        tracker.set_default_targets(2000.0, 150.0);
        tracker.set_targets("2024-06-15", 1800.0, 120.0);
        tracker.add_meal("2024-06-15", "Oatmeal", 150.0, 5.0).unwrap();
        tracker.add_meal("2024-06-15", "Chicken", 330.0, 62.0).unwrap();
        tracker.add_meal("2024-06-16", "Yogurt", 100.0, 17.0).unwrap();

        let totals = tracker.totals_for("2024-06-15");
        assert!((totals.calories - 480.0).abs() < f64::EPSILON);
        assert!((totals.protein - 67.0).abs() < f64::EPSILON);

        assert_eq!(tracker.targets_for("2024-06-15").calories, 1800.0);
        // Unknown dates fall back to the default sentinel.
        assert_eq!(tracker.targets_for("2024-06-16").calories, 2000.0);
    }

    #[test]
    fn test_set_targets_coerces_macros() {
        let mut tracker = tracker();
        tracker.set_targets("2024-06-15", -100.0, f64::INFINITY);
        let targets = tracker.targets_for("2024-06-15");
        assert_eq!(targets.calories, 0.0);
        assert_eq!(targets.protein, 0.0);
    }

    #[test]
    fn test_add_weight_rounds_and_validates() {
        let mut tracker = tracker();
        let entry = tracker.add_weight("2024-06-15", 72.46).unwrap();
        assert_eq!(entry.weight_kg, 72.5);

        assert!(tracker.add_weight("", 72.0).is_none());
        assert!(tracker.add_weight("2024-06-15", 0.0).is_none());
        assert!(tracker.add_weight("2024-06-15", -3.0).is_none());
        assert!(tracker.add_weight("2024-06-15", f64::NAN).is_none());
        assert_eq!(tracker.state().weights.len(), 1);
    }

    #[test]
    fn test_weights_sorted_newest_first() {
        let mut tracker = tracker();
        tracker.add_weight("2024-06-10", 73.0).unwrap();
        tracker.add_weight("2024-06-15", 72.5).unwrap();
        tracker.add_weight("2024-06-12", 72.8).unwrap();

        let sorted = tracker.weights_sorted();
        let dates: Vec<&str> = sorted.iter().map(|w| w.date_iso.as_str()).collect();
        assert_eq!(dates, vec!["2024-06-15", "2024-06-12", "2024-06-10"]);
    }

    #[test]
    fn test_shopping_list_lifecycle() {
        let mut tracker = tracker();
        assert!(tracker.add_shopping_item("   ").is_none());

        let item = tracker.add_shopping_item("Eggs").unwrap();
        assert!(!item.done);
        assert!(tracker.toggle_shopping_item(&item.id));
        assert!(tracker.state().shopping[0].done);
        assert!(tracker.toggle_shopping_item(&item.id));
        assert!(!tracker.state().shopping[0].done);

        assert!(!tracker.toggle_shopping_item("missing"));
        assert!(tracker.remove_shopping_item(&item.id));
        assert!(!tracker.remove_shopping_item(&item.id));
    }

    #[test]
    fn test_plan_round_trip_through_service() {
        let mut tracker = tracker();
        tracker
            .set_plan_cell("2024-06-16", "mon", "lunch", "Salad")
            .unwrap();
        assert_eq!(tracker.plan_cell("2024-06-16", "mon", "lunch"), "Salad");
        assert_eq!(tracker.plan_cell("2024-06-16", "tue", "dinner"), "");

        let plan = tracker.plan_for_week("2024-06-16");
        assert_eq!(plan.days["mon"]["lunch"], "Salad");
        assert_eq!(tracker.state().plans.len(), 1);

        assert!(tracker.delete_plan("2024-06-16"));
        assert!(tracker.state().plans.is_empty());
    }

    #[test]
    fn test_daily_quote_is_stable_within_a_day() {
        let tracker = tracker();
        let first = tracker.daily_quote("2024-06-15");
        let second = tracker.daily_quote("2024-06-15");
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.db");
        {
            let mut tracker = Tracker::open(&path, Vec::new()).unwrap();
            tracker.add_meal("2024-06-15", "Oatmeal", 150.0, 5.0).unwrap();
            tracker.set_targets("2024-06-15", 1800.0, 120.0);
        }

        let tracker = Tracker::open(&path, Vec::new()).unwrap();
        assert_eq!(tracker.state().meals.len(), 1);
        assert_eq!(tracker.state().meals[0].name, "Oatmeal");
        assert_eq!(tracker.targets_for("2024-06-15").protein, 120.0);

        // The template index lives under its own key and survives too.
        let results = tracker.search_meal_templates("oat", 10);
        assert_eq!(results.len(), 1);
    }
}
