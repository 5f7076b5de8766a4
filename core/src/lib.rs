//! Core library for the nutriplan nutrition and weight tracker.
//!
//! This crate owns the persistent data layer behind the UI: a versioned
//! key-value state store with failure-tolerant load/save and total schema
//! migration, the weekly-plan repository, the meal-template autocomplete
//! index, and the daily-quote scheduler. Rendering and navigation belong to
//! the consuming UI layer, which reads and writes through [`Tracker`].
//!
//! All storage goes through the injected [`KvBackend`] trait; nothing here
//! performs I/O beyond it, and every failure path degrades to a safe default
//! instead of surfacing an error to the UI.

pub mod backend;
pub mod dates;
pub mod history_import;
pub mod models;
pub mod planner;
pub mod quotes;
pub mod service;
pub mod store;
pub mod templates;

pub use backend::{KvBackend, MemoryBackend, SqliteBackend};
pub use models::{
    AppState, DayTotals, MealEntry, MealTemplate, ShoppingItem, Targets, WeeklyPlan, WeightEntry,
};
pub use service::Tracker;
