use chrono::Local;
use serde_json::Value;

use crate::backend::KvBackend;
use crate::models::{MealTemplate, coerce_macro, template_key};

/// Backend key for the template collection, separate from the state record.
pub const TEMPLATES_KEY: &str = "nutriplan/v2/meal-templates";

/// Suggested result cap for autocomplete consumers.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Load the persisted template collection. Absent, unreadable, and corrupt
/// data all read as an empty collection; elements that do not decode are
/// dropped individually.
#[must_use]
pub fn load_templates(backend: &dyn KvBackend) -> Vec<MealTemplate> {
    match backend.get(TEMPLATES_KEY) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn save_templates(backend: &dyn KvBackend, templates: &[MealTemplate]) {
    if let Ok(json) = serde_json::to_string(templates) {
        let _ = backend.set(TEMPLATES_KEY, &json);
    }
}

/// Record one use of a named preset, creating or refreshing its template.
///
/// Identity is the trimmed, lowercased name; at most one template exists per
/// identity key. An existing template gets the new coerced macros, a usage
/// bump, a fresh `updatedAt`, and the latest display spelling of the name.
/// Empty and whitespace-only names are ignored.
pub fn upsert_template(backend: &dyn KvBackend, name: &str, calories: f64, protein: f64) {
    let now = Local::now().to_rfc3339();
    let mut templates = load_templates(backend);
    if upsert_into(&mut templates, name, calories, protein, &now) {
        save_templates(backend, &templates);
    }
}

/// Pure upsert against an already-loaded collection. Returns whether the
/// collection changed.
pub(crate) fn upsert_into(
    templates: &mut Vec<MealTemplate>,
    name: &str,
    calories: f64,
    protein: f64,
    updated_at: &str,
) -> bool {
    let display = name.trim();
    if display.is_empty() {
        return false;
    }
    let key = template_key(name);
    let calories = coerce_macro(calories);
    let protein = coerce_macro(protein);

    if let Some(existing) = templates.iter_mut().find(|t| template_key(&t.name) == key) {
        existing.name = display.to_string();
        existing.calories = calories;
        existing.protein = protein;
        existing.uses += 1;
        existing.updated_at = updated_at.to_string();
    } else {
        templates.push(MealTemplate {
            name: display.to_string(),
            calories,
            protein,
            uses: 1,
            updated_at: updated_at.to_string(),
        });
    }
    true
}

/// Prefix search over the template collection for autocomplete.
///
/// An empty or whitespace-only prefix yields nothing rather than the whole
/// collection. Matches are ordered by case-insensitive name, then newest
/// `updatedAt`, then highest `uses`; `limit` is floored to 1.
#[must_use]
pub fn search_templates(backend: &dyn KvBackend, prefix: &str, limit: usize) -> Vec<MealTemplate> {
    rank(&load_templates(backend), prefix, limit)
}

pub(crate) fn rank(templates: &[MealTemplate], prefix: &str, limit: usize) -> Vec<MealTemplate> {
    let needle = template_key(prefix);
    if needle.is_empty() {
        return Vec::new();
    }
    let limit = limit.max(1);

    let mut matches: Vec<MealTemplate> = templates
        .iter()
        .filter(|t| template_key(&t.name).starts_with(&needle))
        .cloned()
        .collect();
    matches.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| b.uses.cmp(&a.uses))
    });
    matches.truncate(limit);
    matches
}
