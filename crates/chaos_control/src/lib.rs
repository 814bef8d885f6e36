mod actions;
mod crisis;

pub use actions::{
    ignore_breaking_news, press_response, tweet, ActionError, PressStyle, TweetOutcome,
    BREAKING_NEWS_SOURCE, HOT_WORDS, PRESS_SOURCE, TWEET_SOURCE,
};
pub use crisis::{
    affected_for_category, resolve_option, Crisis, CrisisGenerator, CrisisOption, Stance,
    DECISION_REASON, DECISION_SOURCE,
};

use chaos_core::{validate::clamp_bounded, GameContent, Snapshot};

pub trait DecisionSource {
    /// Index into `crisis.options`, or `None` to let the crisis pass.
    fn choose(
        &mut self,
        snapshot: &Snapshot,
        crisis: &Crisis,
        content: &GameContent,
    ) -> Option<usize>;
}

/// Picks crisis responses automatically:
/// 1. When energy is below `autopilot_low_energy_threshold`, only the
///    cheapest options are considered.
/// 2. Each candidate is scored by the weakest power center it would leave
///    behind, minus `autopilot_chaos_weight × projected chaos`.
/// 3. Highest score wins; ties go to the earlier option.
pub struct AutopilotController;

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Indices of the options worth considering at the current energy level.
fn affordable_options(snapshot: &Snapshot, crisis: &Crisis, content: &GameContent) -> Vec<usize> {
    let all: Vec<usize> = (0..crisis.options.len()).collect();
    if snapshot.energy >= content.constants.autopilot_low_energy_threshold {
        return all;
    }
    let cheapest = crisis
        .options
        .iter()
        .map(|option| option.energy_cost)
        .fold(f64::INFINITY, f64::min);
    all.into_iter()
        .filter(|&i| crisis.options[i].energy_cost <= cheapest)
        .collect()
}

/// Weakest power value after applying `choice`, minus the chaos penalty.
fn projected_score(snapshot: &Snapshot, crisis: &Crisis, choice: usize, content: &GameContent) -> f64 {
    let option = &crisis.options[choice];
    let weakest = snapshot
        .power
        .iter()
        .map(|(id, value)| {
            let delta = option.power.get(id).copied().unwrap_or(0.0);
            (value + delta).clamp(0.0, 100.0)
        })
        .fold(f64::INFINITY, f64::min);
    let weakest = if weakest.is_finite() { weakest } else { 0.0 };
    let chaos = clamp_bounded("chaos", snapshot.chaos + option.chaos).unwrap_or(100.0);
    weakest - content.constants.autopilot_chaos_weight * chaos
}

impl DecisionSource for AutopilotController {
    fn choose(
        &mut self,
        snapshot: &Snapshot,
        crisis: &Crisis,
        content: &GameContent,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for choice in affordable_options(snapshot, crisis, content) {
            let score = projected_score(snapshot, crisis, choice, content);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((choice, score));
            }
        }
        best.map(|(choice, _)| choice)
    }
}
