use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::backend::KvBackend;

/// Backend key for the schedule cursor, separate from the state record.
pub const QUOTE_STATE_KEY: &str = "nutriplan/v2/quote-schedule";

/// Cursor over one shuffled traversal of the quote corpus.
///
/// `order` is a permutation of `0..N` for a corpus of size N; `idx` points at
/// the position shown today (`-1` before the first day); `lastDateISO` is the
/// calendar day the cursor last advanced on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteSchedule {
    #[serde(default)]
    pub order: Vec<usize>,
    #[serde(default)]
    pub idx: i64,
    #[serde(rename = "lastDateISO", default)]
    pub last_date_iso: String,
}

/// The quote for `today_iso`, advancing the shuffled cycle on day changes.
///
/// Day transitions are detected purely by string inequality of the supplied
/// date, so skipping several days still advances exactly one step. Within one
/// cycle every quote appears once before any repeat; an exhausted cycle draws
/// a fresh independent permutation (whose first quote may coincide with the
/// old cycle's last — accepted). Repeated calls on one day are pure reads and
/// return the same quote.
pub fn daily_quote(backend: &dyn KvBackend, corpus: &[String], today_iso: &str) -> String {
    daily_quote_with_rng(backend, corpus, today_iso, &mut rand::rng())
}

/// [`daily_quote`] with an injected random source, for deterministic tests.
#[allow(clippy::cast_possible_wrap)]
pub fn daily_quote_with_rng<R: Rng + ?Sized>(
    backend: &dyn KvBackend,
    corpus: &[String],
    today_iso: &str,
    rng: &mut R,
) -> String {
    let n = corpus.len();
    if n == 0 {
        return String::new();
    }

    // Stored state that is unreadable, malformed, or sized for a different
    // corpus counts as uninitialized.
    let mut schedule = match load_schedule(backend) {
        Some(s) if is_permutation(&s.order, n) => s,
        _ => QuoteSchedule {
            order: shuffled_order(n, rng),
            idx: -1,
            last_date_iso: String::new(),
        },
    };

    if schedule.last_date_iso != today_iso {
        if schedule.idx + 1 < n as i64 {
            schedule.idx += 1;
        } else {
            schedule.order = shuffled_order(n, rng);
            schedule.idx = 0;
        }
        schedule.last_date_iso = today_iso.to_string();
        save_schedule(backend, &schedule);
    }

    let cursor = schedule.idx.clamp(0, n as i64 - 1) as usize;
    corpus[schedule.order[cursor]].clone()
}

fn load_schedule(backend: &dyn KvBackend) -> Option<QuoteSchedule> {
    let raw = backend.get(QUOTE_STATE_KEY).ok()??;
    serde_json::from_str(&raw).ok()
}

fn save_schedule(backend: &dyn KvBackend, schedule: &QuoteSchedule) {
    if let Ok(json) = serde_json::to_string(schedule) {
        let _ = backend.set(QUOTE_STATE_KEY, &json);
    }
}

/// Uniformly random permutation of `0..n` (Fisher-Yates).
fn shuffled_order<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
}

fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &position in order {
        if position >= n || seen[position] {
            return false;
        }
        seen[position] = true;
    }
    true
}
