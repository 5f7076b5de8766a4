use anyhow::Result;

use crate::models::{AppState, WeeklyPlan, validate_day_key, validate_meal_slot};

/// Index of the plan for `week_start_iso`, appending an empty plan first if
/// none exists. Repeated calls never create a second plan for one week.
fn plan_index(state: &mut AppState, week_start_iso: &str) -> usize {
    match state
        .plans
        .iter()
        .position(|p| p.week_start_iso == week_start_iso)
    {
        Some(idx) => idx,
        None => {
            state.plans.push(WeeklyPlan::new(week_start_iso));
            state.plans.len() - 1
        }
    }
}

/// Look up the weekly plan keyed by `week_start_iso`, creating it (all seven
/// day buckets present, empty) when absent.
pub fn get_or_create_plan<'a>(state: &'a mut AppState, week_start_iso: &str) -> &'a WeeklyPlan {
    let idx = plan_index(state, week_start_iso);
    &state.plans[idx]
}

/// Replace exactly the `(day, slot)` text of one week's plan, resolving the
/// plan via get-or-create. Every other slot, day, and plan is untouched.
pub fn set_cell_text(
    state: &mut AppState,
    week_start_iso: &str,
    day: &str,
    slot: &str,
    text: &str,
) -> Result<()> {
    let day = validate_day_key(day)?;
    let slot = validate_meal_slot(slot)?;
    let idx = plan_index(state, week_start_iso);
    state.plans[idx]
        .days
        .entry(day)
        .or_default()
        .insert(slot, text.to_string());
    Ok(())
}

/// Read one cell. Missing plans, days, and slots all read as empty text.
#[must_use]
pub fn cell_text(state: &AppState, week_start_iso: &str, day: &str, slot: &str) -> String {
    state
        .plans
        .iter()
        .find(|p| p.week_start_iso == week_start_iso)
        .and_then(|p| p.days.get(day))
        .and_then(|d| d.get(slot))
        .cloned()
        .unwrap_or_default()
}

/// Remove the plan for `week_start_iso`. Returns whether a plan was removed.
pub fn delete_plan(state: &mut AppState, week_start_iso: &str) -> bool {
    let before = state.plans.len();
    state.plans.retain(|p| p.week_start_iso != week_start_iso);
    state.plans.len() < before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DAY_KEYS;

    #[test]
    fn test_get_or_create_creates_once() {
        let mut state = AppState::default();
        get_or_create_plan(&mut state, "2024-06-16");
        get_or_create_plan(&mut state, "2024-06-16");

        let matching = state
            .plans
            .iter()
            .filter(|p| p.week_start_iso == "2024-06-16")
            .count();
        assert_eq!(matching, 1);
    }

    #[test]
    fn test_get_or_create_returns_existing_untouched() {
        let mut state = AppState::default();
        set_cell_text(&mut state, "2024-06-16", "mon", "lunch", "Salad").unwrap();

        let plan = get_or_create_plan(&mut state, "2024-06-16");
        assert_eq!(plan.days["mon"]["lunch"], "Salad");
        assert_eq!(state.plans.len(), 1);
    }

    #[test]
    fn test_created_plan_has_seven_empty_days() {
        let mut state = AppState::default();
        let plan = get_or_create_plan(&mut state, "2024-06-16");
        assert_eq!(plan.days.len(), 7);
        for day in DAY_KEYS {
            assert!(plan.days[*day].is_empty());
        }
    }

    #[test]
    fn test_set_cell_text_replaces_existing_text() {
        let mut state = AppState::default();
        set_cell_text(&mut state, "2024-06-16", "tue", "dinner", "Pasta").unwrap();
        set_cell_text(&mut state, "2024-06-16", "tue", "dinner", "Soup").unwrap();
        assert_eq!(cell_text(&state, "2024-06-16", "tue", "dinner"), "Soup");
    }

    #[test]
    fn test_set_cell_text_normalizes_day_and_slot() {
        let mut state = AppState::default();
        set_cell_text(&mut state, "2024-06-16", "Mon", "BREAKFAST", "Eggs").unwrap();
        assert_eq!(cell_text(&state, "2024-06-16", "mon", "breakfast"), "Eggs");
    }

    #[test]
    fn test_set_cell_text_rejects_unknown_day_and_slot() {
        let mut state = AppState::default();
        assert!(set_cell_text(&mut state, "2024-06-16", "funday", "lunch", "x").is_err());
        assert!(set_cell_text(&mut state, "2024-06-16", "mon", "brunch", "x").is_err());
        // Validation happens before plan resolution, so neither failed
        // write created a plan as a side effect.
        assert!(state.plans.is_empty());
    }

    #[test]
    fn test_cell_isolation() {
        let mut state = AppState::default();
        set_cell_text(&mut state, "2024-06-16", "mon", "lunch", "Salad").unwrap();
        set_cell_text(&mut state, "2024-06-16", "fri", "dinner", "Fish").unwrap();
        set_cell_text(&mut state, "2024-06-23", "mon", "lunch", "Rice").unwrap();

        let before = serde_json::to_value(&state).unwrap();
        set_cell_text(&mut state, "2024-06-16", "mon", "lunch", "Stew").unwrap();
        let after = serde_json::to_value(&state).unwrap();

        let mut expected = before;
        expected["plans"][0]["days"]["mon"]["lunch"] = "Stew".into();
        assert_eq!(after, expected);
    }

    #[test]
    fn test_cell_text_missing_reads_empty() {
        let mut state = AppState::default();
        assert_eq!(cell_text(&state, "2024-06-16", "mon", "lunch"), "");

        get_or_create_plan(&mut state, "2024-06-16");
        assert_eq!(cell_text(&state, "2024-06-16", "mon", "lunch"), "");

        // A plan loaded from an old record may lack day buckets entirely.
        state.plans[0].days.remove("wed");
        assert_eq!(cell_text(&state, "2024-06-16", "wed", "snack1"), "");
    }

    #[test]
    fn test_cell_text_does_not_create_plans() {
        let state = AppState::default();
        cell_text(&state, "2024-06-16", "mon", "lunch");
        assert!(state.plans.is_empty());
    }

    #[test]
    fn test_delete_plan() {
        let mut state = AppState::default();
        get_or_create_plan(&mut state, "2024-06-16");
        get_or_create_plan(&mut state, "2024-06-23");

        assert!(delete_plan(&mut state, "2024-06-16"));
        assert_eq!(state.plans.len(), 1);
        assert_eq!(state.plans[0].week_start_iso, "2024-06-23");
        assert!(!delete_plan(&mut state, "2024-06-16"));
    }
}
