//! Shared test fixtures for chaos_core and downstream crates.
//!
//! `base_content()` mirrors the shipped content: eight power centers, the
//! standard cascade rules, category mapping and a few briefings.
//! `media_state()` and `media_public_state()` are the small stores most unit
//! tests start from.

use crate::{
    Briefing, CascadeCondition, CascadeRule, CategoryDef, Constants, GameContent, GameState,
    InitialState, NewsCategory, PowerCenterDef, PowerCenterId, PowerCenterSeed,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn pid(raw: &str) -> PowerCenterId {
    PowerCenterId(raw.to_string())
}

fn center(id: &str, name: &str, initial_value: f64) -> PowerCenterDef {
    PowerCenterDef {
        id: pid(id),
        name: name.to_string(),
        initial_value,
    }
}

fn cascade(trigger: &str, target: &str, factor: f64, condition: CascadeCondition) -> CascadeRule {
    CascadeRule {
        trigger: pid(trigger),
        target: pid(target),
        factor,
        condition,
    }
}

fn category(category: NewsCategory, affected: &[&str]) -> CategoryDef {
    CategoryDef {
        category,
        affected: affected.iter().map(|id| pid(id)).collect(),
    }
}

pub fn base_constants() -> Constants {
    Constants {
        starting_day: 1,
        starting_energy: 100.0,
        starting_chaos: 0.0,
        starting_score: 0.0,
        daily_energy_drain: 2.0,
        daily_score_gain: 10.0,
        drift_probability: 0.3,
        drift_span: 4.0,
        coalition_hostile_below: 30.0,
        coalition_allied_above: 70.0,
        coalition_min_members: 3,
        decision_score_per_chaos: 5.0,
        tweet_base_chaos: 5.0,
        tweet_hot_word_chaos: 10.0,
        tweet_score_per_chaos: 10.0,
        press_energy_cost: 5.0,
        press_score_gain: 20.0,
        ignored_news_chaos: 10.0,
        ignored_news_media_penalty: 10.0,
        autopilot_low_energy_threshold: 25.0,
        autopilot_chaos_weight: 0.2,
    }
}

pub fn base_content() -> GameContent {
    GameContent {
        content_version: "test".to_string(),
        power_centers: vec![
            center("congress", "Congress", 50.0),
            center("military", "Military", 60.0),
            center("intelligence", "Intelligence", 50.0),
            center("wallstreet", "Wall Street", 55.0),
            center("media", "Media", 40.0),
            center("public", "Public Opinion", 50.0),
            center("industry", "Industry", 55.0),
            center("science", "Scientific Community", 45.0),
        ],
        cascades: vec![
            cascade("wallstreet", "industry", 0.3, CascadeCondition::AbsAbove { threshold: 15.0 }),
            cascade("wallstreet", "public", -0.2, CascadeCondition::Below { threshold: -10.0 }),
            cascade("military", "intelligence", 0.2, CascadeCondition::AbsAbove { threshold: 10.0 }),
            cascade("media", "public", 0.4, CascadeCondition::AbsAbove { threshold: 10.0 }),
            cascade("congress", "public", 0.15, CascadeCondition::Below { threshold: -15.0 }),
            cascade("public", "congress", 0.25, CascadeCondition::AbsAbove { threshold: 20.0 }),
        ],
        categories: vec![
            category(NewsCategory::Foreign, &["military", "intelligence", "congress"]),
            category(NewsCategory::Economy, &["wallstreet", "industry", "public"]),
            category(NewsCategory::Scandal, &["media", "public", "congress"]),
            category(NewsCategory::Military, &["military", "intelligence", "congress"]),
            category(NewsCategory::Healthcare, &["science", "public", "industry"]),
            category(NewsCategory::Domestic, &["congress", "public", "media"]),
        ],
        briefings: vec![
            Briefing {
                headline: "Congress Debates Infrastructure Bill Worth $2 Trillion".to_string(),
                source: "Reuters".to_string(),
                category: NewsCategory::Domestic,
                affected: vec![pid("congress"), pid("public"), pid("industry")],
            },
            Briefing {
                headline: "Fed Considers Interest Rate Hike Amid Inflation".to_string(),
                source: "Bloomberg".to_string(),
                category: NewsCategory::Economy,
                affected: vec![],
            },
        ],
        constants: base_constants(),
    }
}

/// Store built from `content` with its starting constants.
pub fn base_state(content: &GameContent) -> GameState {
    let c = &content.constants;
    GameState::new(InitialState {
        day: c.starting_day,
        energy: c.starting_energy,
        chaos: c.starting_chaos,
        score: c.starting_score,
        power_centers: content
            .power_centers
            .iter()
            .map(|def| PowerCenterSeed::new(def.id.0.clone(), def.initial_value))
            .collect(),
    })
    .expect("fixture content builds a valid store")
}

/// Default store with a single `media = 40` center.
pub fn media_state() -> GameState {
    GameState::new(InitialState::with_power_centers(vec![PowerCenterSeed::new(
        "media", 40.0,
    )]))
    .expect("fixture store is valid")
}

/// Default store with `media = 40`, `public = 55`.
pub fn media_public_state() -> GameState {
    GameState::new(InitialState::with_power_centers(vec![
        PowerCenterSeed::new("media", 40.0),
        PowerCenterSeed::new("public", 55.0),
    ]))
    .expect("fixture store is valid")
}

/// Deterministic RNG seeded with 1234.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(1234)
}
