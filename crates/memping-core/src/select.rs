//! Prompt selection: which single prompt goes out on a given run.
//!
//! Prompts that have waited longer are proportionally more likely to be
//! picked. A prompt is *eligible* once it has waited at least
//! `max(min_gap_days, cooldown_days)` whole days (or if it was never sent).
//! When nothing is eligible the whole input becomes the pool, so a non-empty
//! input always yields a prompt.
//!
//! Selection is pure: the clock and the randomness source are passed in.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::prompt::Prompt;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tunables for [`select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
  /// Global minimum gap between two sends of the same prompt.
  pub min_gap_days:      u32,
  /// Weight given to a prompt that has never been sent.
  pub never_sent_weight: u64,
}

impl Default for SelectionConfig {
  fn default() -> Self {
    Self { min_gap_days: 7, never_sent_weight: 9999 }
  }
}

// ─── Randomness ──────────────────────────────────────────────────────────────

/// Source of the single uniform draw a selection needs.
pub trait Draw {
  /// Return a value in `[0, total)`. `total` is always at least `1.0`.
  fn draw(&mut self, total: f64) -> f64;
}

/// Adapts any [`rand::Rng`] into a [`Draw`].
#[derive(Debug, Clone)]
pub struct RngDraw<R>(pub R);

impl<R: Rng> Draw for RngDraw<R> {
  fn draw(&mut self, total: f64) -> f64 { self.0.gen_range(0.0..total) }
}

// ─── Staleness ───────────────────────────────────────────────────────────────

/// How long ago a prompt was last sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
  NeverSent,
  /// Whole days since the last send, rounded down. Negative if the stored
  /// timestamp lies in the future.
  Days(i64),
}

impl Staleness {
  pub fn of(prompt: &Prompt, now: DateTime<Utc>) -> Self {
    match prompt.last_sent_at {
      None => Self::NeverSent,
      Some(last) => {
        let millis = (now - last).num_milliseconds();
        Self::Days(millis.div_euclid(MILLIS_PER_DAY))
      }
    }
  }

  /// Relative selection weight; never below 1.
  pub fn weight(self, config: &SelectionConfig) -> u64 {
    match self {
      Self::NeverSent => config.never_sent_weight.max(1),
      Self::Days(d) => d.max(1) as u64,
    }
  }
}

/// `max(min_gap_days, cooldown_days)`.
pub fn effective_gap(prompt: &Prompt, config: &SelectionConfig) -> u32 {
  config.min_gap_days.max(prompt.cooldown_days)
}

pub fn is_eligible(prompt: &Prompt, config: &SelectionConfig, now: DateTime<Utc>) -> bool {
  match Staleness::of(prompt, now) {
    Staleness::NeverSent => true,
    Staleness::Days(d) => d >= i64::from(effective_gap(prompt, config)),
  }
}

// ─── Pool ────────────────────────────────────────────────────────────────────

/// A weighted member of the selection pool.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
  pub prompt: &'a Prompt,
  pub weight: u64,
}

/// The prompts a draw chooses between.
#[derive(Debug, Clone)]
pub struct Pool<'a> {
  pub members:  Vec<Candidate<'a>>,
  /// `true` when no prompt was eligible and the whole input was used.
  pub fallback: bool,
}

impl<'a> Pool<'a> {
  /// Build the eligible pool, falling back to every prompt if none is
  /// eligible. Input order is preserved.
  pub fn build(prompts: &'a [Prompt], config: &SelectionConfig, now: DateTime<Utc>) -> Self {
    let mut eligible = Vec::new();
    let mut all = Vec::with_capacity(prompts.len());

    for prompt in prompts {
      let candidate = Candidate {
        prompt,
        weight: Staleness::of(prompt, now).weight(config),
      };
      if is_eligible(prompt, config, now) {
        eligible.push(candidate);
      }
      all.push(candidate);
    }

    if eligible.is_empty() {
      Self { members: all, fallback: true }
    } else {
      Self { members: eligible, fallback: false }
    }
  }

  pub fn total_weight(&self) -> u64 {
    self
      .members
      .iter()
      .fold(0u64, |acc, c| acc.saturating_add(c.weight))
  }

  /// Weighted pick: subtract weights from the drawn value in order and stop
  /// at the first member that takes it to zero or below.
  pub fn choose(&self, draw: &mut impl Draw) -> Option<&'a Prompt> {
    let last = self.members.last()?;
    let mut remainder = draw.draw(self.total_weight() as f64);
    for candidate in &self.members {
      remainder -= candidate.weight as f64;
      if remainder <= 0.0 {
        return Some(candidate.prompt);
      }
    }
    // Only reachable through float rounding on huge totals.
    Some(last.prompt)
  }
}

/// The outcome of a non-empty [`select`] call.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
  pub prompt:    &'a Prompt,
  /// Whether the pick came from the fallback pool.
  pub fallback:  bool,
  pub pool_size: usize,
}

/// Pick the prompt to send next, or `None` if `prompts` is empty.
///
/// `prompts` is expected to hold active prompts only. `draw` is not consulted
/// for an empty input.
pub fn select<'a>(
  prompts: &'a [Prompt],
  config: &SelectionConfig,
  now: DateTime<Utc>,
  draw: &mut impl Draw,
) -> Option<Selection<'a>> {
  if prompts.is_empty() {
    return None;
  }
  let pool = Pool::build(prompts, config, now);
  let prompt = pool.choose(draw)?;
  Some(Selection {
    prompt,
    fallback: pool.fallback,
    pool_size: pool.members.len(),
  })
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use chrono::{Duration, TimeZone};
  use rand::{SeedableRng, rngs::StdRng};
  use uuid::Uuid;

  use super::*;
  use crate::prompt::PromptContent;

  /// A draw stub returning a fixed value and counting calls.
  struct Fixed {
    value: f64,
    calls: usize,
  }

  impl Fixed {
    fn new(value: f64) -> Self { Self { value, calls: 0 } }
  }

  impl Draw for Fixed {
    fn draw(&mut self, _total: f64) -> f64 {
      self.calls += 1;
      self.value
    }
  }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap() }

  fn prompt(text: &str, sent_days_ago: Option<i64>, cooldown_days: u32) -> Prompt {
    let last_sent_at = sent_days_ago.map(|d| now() - Duration::days(d));
    Prompt {
      prompt_id: Uuid::new_v4(),
      created_at: now() - Duration::days(365),
      content: PromptContent::Text { text: text.into() },
      tag: None,
      active: true,
      cooldown_days,
      times_sent: u32::from(last_sent_at.is_some()),
      last_sent_at,
    }
  }

  fn cfg() -> SelectionConfig { SelectionConfig::default() }

  #[test]
  fn empty_input_returns_none_without_drawing() {
    let mut draw = Fixed::new(0.0);
    assert!(select(&[], &cfg(), now(), &mut draw).is_none());
    assert_eq!(draw.calls, 0);
  }

  #[test]
  fn never_sent_is_always_eligible() {
    let p = prompt("a", None, 10_000);
    assert!(is_eligible(&p, &cfg(), now()));
    assert_eq!(Staleness::of(&p, now()), Staleness::NeverSent);
  }

  #[test]
  fn days_are_floored() {
    let mut p = prompt("a", None, 0);
    p.last_sent_at = Some(now() - Duration::hours(47));
    assert_eq!(Staleness::of(&p, now()), Staleness::Days(1));
    p.last_sent_at = Some(now() + Duration::hours(1));
    assert_eq!(Staleness::of(&p, now()), Staleness::Days(-1));
  }

  #[test]
  fn cooldown_extends_the_global_gap() {
    let p = prompt("a", Some(10), 14);
    assert_eq!(effective_gap(&p, &cfg()), 14);
    assert!(!is_eligible(&p, &cfg(), now()));

    let q = prompt("b", Some(10), 3);
    assert_eq!(effective_gap(&q, &cfg()), 7);
    assert!(is_eligible(&q, &cfg(), now()));
  }

  #[test]
  fn gap_boundary_is_inclusive() {
    assert!(is_eligible(&prompt("a", Some(7), 0), &cfg(), now()));
    assert!(!is_eligible(&prompt("a", Some(6), 0), &cfg(), now()));
  }

  #[test]
  fn weight_is_floored_and_monotonic() {
    let c = cfg();
    let mut previous = 0;
    for d in -3..40 {
      let w = Staleness::Days(d).weight(&c);
      assert!(w >= 1);
      assert!(w >= previous);
      previous = w;
    }
    assert_eq!(Staleness::Days(0).weight(&c), 1);
    assert_eq!(Staleness::Days(12).weight(&c), 12);
    assert_eq!(Staleness::NeverSent.weight(&c), 9999);

    let zero = SelectionConfig { never_sent_weight: 0, ..c };
    assert_eq!(Staleness::NeverSent.weight(&zero), 1);
  }

  #[test]
  fn never_sent_beats_recently_sent() {
    let prompts = vec![prompt("b", Some(3), 0), prompt("a", None, 0)];
    let mut rng = RngDraw(StdRng::seed_from_u64(7));
    for _ in 0..200 {
      let chosen = select(&prompts, &cfg(), now(), &mut rng).unwrap().prompt;
      assert_eq!(chosen.prompt_id, prompts[1].prompt_id);
    }
  }

  #[test]
  fn stale_prompt_beats_fresh_one() {
    let prompts = vec![prompt("a", Some(10), 0), prompt("b", Some(2), 0)];
    let pool = Pool::build(&prompts, &cfg(), now());
    assert!(!pool.fallback);
    assert_eq!(pool.members.len(), 1);

    let mut rng = RngDraw(StdRng::seed_from_u64(11));
    for _ in 0..200 {
      let chosen = select(&prompts, &cfg(), now(), &mut rng).unwrap().prompt;
      assert_eq!(chosen.prompt_id, prompts[0].prompt_id);
    }
  }

  #[test]
  fn sole_prompt_in_cooldown_is_still_selectable() {
    let prompts = vec![prompt("a", Some(1), 30)];
    let pool = Pool::build(&prompts, &cfg(), now());
    assert!(pool.fallback);
    let mut draw = Fixed::new(0.5);
    let chosen = select(&prompts, &cfg(), now(), &mut draw).unwrap();
    assert!(chosen.fallback);
    assert_eq!(chosen.prompt.prompt_id, prompts[0].prompt_id);
  }

  #[test]
  fn fallback_splits_evenly_between_equal_weights() {
    let prompts = vec![prompt("a", Some(1), 0), prompt("b", Some(1), 0)];
    let pool = Pool::build(&prompts, &cfg(), now());
    assert!(pool.fallback);
    assert_eq!(pool.total_weight(), 2);

    let mut rng = RngDraw(StdRng::seed_from_u64(42));
    let mut counts: HashMap<Uuid, u32> = HashMap::new();
    let runs = 20_000;
    for _ in 0..runs {
      let chosen = select(&prompts, &cfg(), now(), &mut rng).unwrap().prompt;
      *counts.entry(chosen.prompt_id).or_default() += 1;
    }
    let a = f64::from(counts[&prompts[0].prompt_id]) / f64::from(runs);
    assert!((a - 0.5).abs() < 0.02, "share of a: {a}");
  }

  #[test]
  fn fixed_draw_is_deterministic() {
    // Weights in order: 10, 20, 30.
    let prompts = vec![
      prompt("a", Some(10), 0),
      prompt("b", Some(20), 0),
      prompt("c", Some(30), 0),
    ];
    let pick = |value: f64| {
      select(&prompts, &cfg(), now(), &mut Fixed::new(value))
        .unwrap()
        .prompt
        .prompt_id
    };
    assert_eq!(pick(0.0), prompts[0].prompt_id);
    assert_eq!(pick(10.0), prompts[0].prompt_id);
    assert_eq!(pick(10.5), prompts[1].prompt_id);
    assert_eq!(pick(30.0), prompts[1].prompt_id);
    assert_eq!(pick(59.9), prompts[2].prompt_id);
    assert_eq!(pick(25.0), pick(25.0));
  }

  #[test]
  fn result_is_always_a_member_of_the_input() {
    let mut rng = RngDraw(StdRng::seed_from_u64(3));
    for n in 1..12i64 {
      let prompts: Vec<Prompt> = (0..n)
        .map(|i| prompt("p", if i % 3 == 0 { None } else { Some(i) }, (i % 4) as u32 * 5))
        .collect();
      for _ in 0..50 {
        let chosen = select(&prompts, &cfg(), now(), &mut rng).unwrap().prompt;
        assert!(prompts.iter().any(|p| p.prompt_id == chosen.prompt_id));
      }
    }
  }

  #[test]
  fn oversized_draw_falls_back_to_last_member() {
    let prompts = vec![prompt("a", Some(1), 0), prompt("b", Some(1), 0)];
    let chosen = select(&prompts, &cfg(), now(), &mut Fixed::new(1e9)).unwrap().prompt;
    assert_eq!(chosen.prompt_id, prompts[1].prompt_id);
  }
}
