//! Crisis generation: turn a headline into four concrete response options.

use std::collections::BTreeMap;

use chaos_core::{
    Briefing, ChangeMeta, Constants, CrisisId, Effects, GameContent, NewsCategory, PowerCenterId,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DECISION_SOURCE: &str = "decision";
pub const DECISION_REASON: &str = "Your decision";

/// Centers touched when neither the briefing nor the category mapping names any.
const UNMAPPED_AFFECTED: [&str; 2] = ["public", "media"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Strong,
    Measured,
    Attack,
    Tweet,
}

impl Stance {
    pub const ALL: [Stance; 4] = [Stance::Strong, Stance::Measured, Stance::Attack, Stance::Tweet];

    pub fn label(self) -> &'static str {
        match self {
            Stance::Strong => "Take Strong Action",
            Stance::Measured => "Measured Response",
            Stance::Attack => "Attack Opponents",
            Stance::Tweet => "Twitter Response",
        }
    }

    pub fn chaos(self) -> f64 {
        match self {
            Stance::Strong => 15.0,
            Stance::Measured => -5.0,
            Stance::Attack => 25.0,
            Stance::Tweet => 20.0,
        }
    }

    pub fn energy_cost(self) -> f64 {
        match self {
            Stance::Strong => 20.0,
            Stance::Measured => 10.0,
            Stance::Attack => 15.0,
            Stance::Tweet => 5.0,
        }
    }

    /// Delta this stance applies to one affected center. Only the tweet
    /// storm consumes randomness.
    fn center_delta(self, id: &PowerCenterId, rng: &mut impl Rng) -> f64 {
        match self {
            Stance::Strong => match id.as_str() {
                "military" | "intelligence" => 10.0,
                "media" => -5.0,
                "public" => 15.0,
                _ => 5.0,
            },
            Stance::Measured => match id.as_str() {
                "congress" => 10.0,
                "media" => 8.0,
                "military" => -5.0,
                _ => 5.0,
            },
            Stance::Attack => match id.as_str() {
                "public" => 10.0,
                "media" => -15.0,
                "congress" => -10.0,
                _ => -5.0,
            },
            Stance::Tweet => match id.as_str() {
                "public" => 15.0,
                "media" => -10.0,
                _ => {
                    if rng.gen_bool(0.5) {
                        5.0
                    } else {
                        -5.0
                    }
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisOption {
    pub stance: Stance,
    pub label: String,
    pub power: BTreeMap<PowerCenterId, f64>,
    pub chaos: f64,
    pub energy_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crisis {
    pub id: CrisisId,
    pub title: String,
    pub description: String,
    pub category: NewsCategory,
    pub affected: Vec<PowerCenterId>,
    pub options: Vec<CrisisOption>,
}

/// Allocates crisis ids and builds crises. One per session.
#[derive(Debug, Default)]
pub struct CrisisGenerator {
    issued: u64,
}

impl CrisisGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    fn next_id(&mut self) -> CrisisId {
        self.issued += 1;
        CrisisId(format!("crisis_{:06}", self.issued))
    }

    /// Crisis for a headline. Affected centers come from the briefing, or
    /// from the content's category mapping when the briefing names none.
    pub fn from_briefing(
        &mut self,
        briefing: &Briefing,
        content: &GameContent,
        rng: &mut impl Rng,
    ) -> Crisis {
        let affected = if briefing.affected.is_empty() {
            affected_for_category(briefing.category, content)
        } else {
            briefing.affected.clone()
        };
        let description = format!(
            "{} reports this breaking development. Your response will impact: {}",
            briefing.source,
            center_names(&affected, content)
        );
        Crisis {
            id: self.next_id(),
            title: format!("URGENT: {}", briefing.headline),
            description,
            category: briefing.category,
            options: build_options(&affected, rng),
            affected,
        }
    }

    /// Fallback crisis when no headline is available.
    pub fn contextual(&mut self, rng: &mut impl Rng) -> Crisis {
        let affected = vec![
            PowerCenterId("congress".to_string()),
            PowerCenterId("public".to_string()),
        ];
        Crisis {
            id: self.next_id(),
            title: "Domestic Policy Challenge".to_string(),
            description: "Congress is demanding action on a critical issue.".to_string(),
            category: NewsCategory::Domestic,
            options: build_options(&affected, rng),
            affected,
        }
    }

    /// Picks a briefing uniformly; falls back to `contextual` when content
    /// carries none.
    pub fn random(&mut self, content: &GameContent, rng: &mut impl Rng) -> Crisis {
        match content.briefings.choose(rng) {
            Some(briefing) => self.from_briefing(briefing, content, rng),
            None => self.contextual(rng),
        }
    }
}

pub fn affected_for_category(category: NewsCategory, content: &GameContent) -> Vec<PowerCenterId> {
    content
        .categories
        .iter()
        .find(|def| def.category == category)
        .map(|def| def.affected.clone())
        .filter(|affected| !affected.is_empty())
        .unwrap_or_else(|| {
            UNMAPPED_AFFECTED
                .iter()
                .map(|id| PowerCenterId((*id).to_string()))
                .collect()
        })
}

fn center_names(ids: &[PowerCenterId], content: &GameContent) -> String {
    ids.iter()
        .filter_map(|id| content.power_centers.iter().find(|def| &def.id == id))
        .map(|def| def.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_options(affected: &[PowerCenterId], rng: &mut impl Rng) -> Vec<CrisisOption> {
    Stance::ALL
        .iter()
        .map(|&stance| CrisisOption {
            stance,
            label: stance.label().to_string(),
            power: affected
                .iter()
                .map(|id| (id.clone(), stance.center_delta(id, rng)))
                .collect(),
            chaos: stance.chaos(),
            energy_cost: stance.energy_cost(),
        })
        .collect()
}

/// Effect bundle for picking option `choice` of `crisis`, or `None` when
/// the crisis has no such option.
///
/// Chaos moves by the option's chaos, energy drops by its cost, and score
/// rises by `|chaos| × decision_score_per_chaos`.
pub fn resolve_option(
    crisis: &Crisis,
    choice: usize,
    constants: &Constants,
) -> Option<(Effects, ChangeMeta)> {
    let option = crisis.options.get(choice)?;
    let effects = Effects {
        chaos_delta: option.chaos,
        energy_delta: -option.energy_cost,
        score_delta: option.chaos.abs() * constants.decision_score_per_chaos,
        power: option
            .power
            .iter()
            .map(|(id, delta)| (id.0.clone(), *delta))
            .collect(),
    };
    let meta = ChangeMeta::from_source(DECISION_SOURCE).with_reason(DECISION_REASON);
    Some((effects, meta))
}
