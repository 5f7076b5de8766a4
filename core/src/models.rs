use std::collections::HashMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Key in `targetsByDate` holding the fallback targets used when a date has
/// no entry of its own.
pub const DEFAULT_TARGETS_KEY: &str = "__default__";

/// Day-of-week keys for a weekly plan, Sunday-first.
pub const DAY_KEYS: &[&str] = &["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Meal-slot keys inside one planned day.
pub const MEAL_SLOTS: &[&str] = &["breakfast", "lunch", "snack1", "snack2", "dinner"];

/// Daily calorie/protein targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
}

/// One logged meal. Newest entries sit at the head of `AppState::meals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "dateISO", default)]
    pub date_iso: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
}

/// Free-text meal plan for one week, keyed by the Sunday that starts it.
///
/// `days` maps a day key to a slot→text map. Missing days or slots read as
/// empty text, never as errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    #[serde(rename = "weekStartISO", default)]
    pub week_start_iso: String,
    #[serde(default)]
    pub days: HashMap<String, HashMap<String, String>>,
}

impl WeeklyPlan {
    /// An empty plan with all seven day buckets present.
    #[must_use]
    pub fn new(week_start_iso: &str) -> Self {
        let days = DAY_KEYS
            .iter()
            .map(|day| ((*day).to_string(), HashMap::new()))
            .collect();
        Self {
            week_start_iso: week_start_iso.to_string(),
            days,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "dateISO", default)]
    pub date_iso: String,
    #[serde(rename = "weightKg", default)]
    pub weight_kg: f64,
}

/// Root aggregate: everything the tracker persists under the primary state
/// key. One record per installation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(rename = "targetsByDate", default)]
    pub targets_by_date: HashMap<String, Targets>,
    #[serde(default)]
    pub meals: Vec<MealEntry>,
    #[serde(default)]
    pub plans: Vec<WeeklyPlan>,
    #[serde(default)]
    pub shopping: Vec<ShoppingItem>,
    #[serde(default)]
    pub weights: Vec<WeightEntry>,
}

/// Calorie/protein sums over one day's meals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTotals {
    pub calories: f64,
    pub protein: f64,
}

impl AppState {
    /// Targets for a date: the exact entry, then the `__default__` sentinel,
    /// then zeros.
    #[must_use]
    pub fn targets_for(&self, date_iso: &str) -> Targets {
        self.targets_by_date
            .get(date_iso)
            .or_else(|| self.targets_by_date.get(DEFAULT_TARGETS_KEY))
            .copied()
            .unwrap_or_default()
    }

    /// Sum calories and protein over the meals logged for `date_iso`.
    #[must_use]
    pub fn totals_for(&self, date_iso: &str) -> DayTotals {
        let mut totals = DayTotals::default();
        for meal in self.meals.iter().filter(|m| m.date_iso == date_iso) {
            totals.calories += coerce_macro(meal.calories);
            totals.protein += coerce_macro(meal.protein);
        }
        totals
    }
}

/// One autocomplete preset, persisted separately from `AppState`.
///
/// Identity is the trimmed, lowercased `name` (see [`template_key`]); the
/// stored `name` keeps whatever casing the user typed last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub uses: u64,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
}

/// Identity key for template dedup and prefix matching.
#[must_use]
pub fn template_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Coerce a user-supplied macro value: negative, NaN, and infinite inputs
/// all become 0.
#[must_use]
pub fn coerce_macro(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub fn validate_day_key(day: &str) -> Result<String> {
    let lower = day.to_lowercase();
    if DAY_KEYS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        bail!(
            "Invalid day key '{day}'. Must be one of: {}",
            DAY_KEYS.join(", ")
        )
    }
}

pub fn validate_meal_slot(slot: &str) -> Result<String> {
    let lower = slot.to_lowercase();
    if MEAL_SLOTS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        bail!(
            "Invalid meal slot '{slot}'. Must be one of: {}",
            MEAL_SLOTS.join(", ")
        )
    }
}
