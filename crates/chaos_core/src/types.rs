//! Type definitions for `chaos_core`.
//!
//! Snapshot, effect bundle, change metadata and content types shared by the
//! store, the turn engine and downstream crates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(PowerCenterId);
string_id!(CrisisId);

impl PowerCenterId {
    /// Trims and lowercases `raw`. Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let id = raw.trim().to_lowercase();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// Point-in-time copy of the whole simulation. Owned; editing it never
/// touches the store it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub day: u32,
    pub energy: f64,
    pub chaos: f64,
    pub score: f64,
    pub power: BTreeMap<PowerCenterId, f64>,
}

impl Snapshot {
    pub fn power_of(&self, id: &str) -> Option<f64> {
        let id = PowerCenterId::normalize(id)?;
        self.power.get(&id).copied()
    }
}

/// A `{id, value}` descriptor handed to the store at construction time.
/// The id is raw text; the store normalizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCenterSeed {
    pub id: String,
    pub value: f64,
}

impl PowerCenterSeed {
    pub fn new(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub day: u32,
    pub energy: f64,
    pub chaos: f64,
    pub score: f64,
    pub power_centers: Vec<PowerCenterSeed>,
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            day: 1,
            energy: 100.0,
            chaos: 0.0,
            score: 0.0,
            power_centers: Vec::new(),
        }
    }
}

impl InitialState {
    pub fn with_power_centers(power_centers: Vec<PowerCenterSeed>) -> Self {
        Self {
            power_centers,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Intro,
    #[default]
    Active,
    GameOver,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Intro => "INTRO",
            Phase::Active => "ACTIVE",
            Phase::GameOver => "GAME_OVER",
        })
    }
}

impl std::str::FromStr for Phase {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INTRO" => Ok(Phase::Intro),
            "ACTIVE" => Ok(Phase::Active),
            "GAME_OVER" => Ok(Phase::GameOver),
            _ => Err(StateError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Mutation inputs and records
// ---------------------------------------------------------------------------

/// Batch of relative deltas applied atomically by `GameState::apply_effects`.
///
/// Power keys are raw ids as produced by collaborators; they are normalized
/// and checked against the known set before anything is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Effects {
    pub chaos_delta: f64,
    pub energy_delta: f64,
    pub score_delta: f64,
    pub power: BTreeMap<String, f64>,
}

impl Effects {
    pub fn with_power(mut self, id: impl Into<String>, delta: f64) -> Self {
        *self.power.entry(id.into()).or_insert(0.0) += delta;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.chaos_delta == 0.0
            && self.energy_delta == 0.0
            && self.score_delta == 0.0
            && self.power.is_empty()
    }
}

/// One power center moving from `old_value` to `new_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerChange {
    pub id: PowerCenterId,
    pub old_value: f64,
    pub new_value: f64,
    pub change: f64,
    pub reason: String,
}

impl PowerChange {
    pub(crate) fn new(id: PowerCenterId, old_value: f64, new_value: f64, reason: String) -> Self {
        Self {
            id,
            old_value,
            new_value,
            change: new_value - old_value,
            reason,
        }
    }
}

/// Entry in the append-only power history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerChangeRecord {
    #[serde(flatten)]
    pub change: PowerChange,
    pub day: u32,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Day,
    Energy,
    Chaos,
    Score,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Day => "day",
            Field::Energy => "energy",
            Field::Chaos => "chaos",
            Field::Score => "score",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Field,
    Power,
    Effects,
    Transaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPhase {
    Commit,
    Rollback,
}

/// Metadata attached to a change notification.
///
/// Callers fill `source`, `reason` and `power_reasons`; the store fills
/// `kind`, `field`, `phase` and `power_changes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChangeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<TxPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub power_reasons: BTreeMap<PowerCenterId, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub power_changes: Vec<PowerChange>,
}

impl ChangeMeta {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Ids that normalize to nothing are ignored.
    #[must_use]
    pub fn with_power_reason(mut self, id: &str, reason: impl Into<String>) -> Self {
        if let Some(id) = PowerCenterId::normalize(id) {
            self.power_reasons.insert(id, reason.into());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn reason_for(&self, id: &PowerCenterId) -> String {
        self.power_reasons
            .get(id)
            .or(self.reason.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub power_centers: Vec<PowerCenterDef>,
    pub cascades: Vec<CascadeRule>,
    pub categories: Vec<CategoryDef>,
    pub briefings: Vec<Briefing>,
    pub constants: Constants,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerCenterDef {
    pub id: PowerCenterId,
    pub name: String,
    pub initial_value: f64,
}

/// A follow-up effect: a delta on `trigger` that satisfies `condition`
/// moves `target` by `delta × factor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeRule {
    pub trigger: PowerCenterId,
    pub target: PowerCenterId,
    pub factor: f64,
    pub condition: CascadeCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CascadeCondition {
    /// `|delta| > threshold`
    AbsAbove { threshold: f64 },
    /// `delta < threshold`
    Below { threshold: f64 },
}

impl CascadeCondition {
    pub fn holds(self, delta: f64) -> bool {
        match self {
            CascadeCondition::AbsAbove { threshold } => delta.abs() > threshold,
            CascadeCondition::Below { threshold } => delta < threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Foreign,
    Economy,
    Scandal,
    Military,
    Healthcare,
    Domestic,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 6] = [
        NewsCategory::Foreign,
        NewsCategory::Economy,
        NewsCategory::Scandal,
        NewsCategory::Military,
        NewsCategory::Healthcare,
        NewsCategory::Domestic,
    ];
}

impl std::fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NewsCategory::Foreign => "foreign",
            NewsCategory::Economy => "economy",
            NewsCategory::Scandal => "scandal",
            NewsCategory::Military => "military",
            NewsCategory::Healthcare => "healthcare",
            NewsCategory::Domestic => "domestic",
        })
    }
}

/// Power centers a crisis of this category touches when the briefing
/// doesn't name any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDef {
    pub category: NewsCategory,
    pub affected: Vec<PowerCenterId>,
}

/// Scripted headline used to seed a crisis when no live feed is wired in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Briefing {
    pub headline: String,
    pub source: String,
    pub category: NewsCategory,
    #[serde(default)]
    pub affected: Vec<PowerCenterId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub starting_day: u32,
    pub starting_energy: f64,
    pub starting_chaos: f64,
    pub starting_score: f64,
    pub daily_energy_drain: f64,
    pub daily_score_gain: f64,
    /// Chance per day that one random power center drifts.
    pub drift_probability: f64,
    /// Drift is uniform in `[-span/2, span/2)`.
    pub drift_span: f64,
    pub coalition_hostile_below: f64,
    pub coalition_allied_above: f64,
    pub coalition_min_members: usize,
    pub decision_score_per_chaos: f64,
    pub tweet_base_chaos: f64,
    pub tweet_hot_word_chaos: f64,
    pub tweet_score_per_chaos: f64,
    pub press_energy_cost: f64,
    pub press_score_gain: f64,
    pub ignored_news_chaos: f64,
    pub ignored_news_media_penalty: f64,
    pub autopilot_low_energy_threshold: f64,
    pub autopilot_chaos_weight: f64,
}
