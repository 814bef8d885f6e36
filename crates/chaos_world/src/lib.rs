//! Content loading and session setup shared by the CLI and tests.

use anyhow::{bail, Context, Result};
use chaos_control::{
    ignore_breaking_news, press_response, resolve_option, tweet, Crisis, CrisisGenerator,
    PressStyle, TweetOutcome,
};
use chaos_core::{
    advance_day, apply_decision, assess_coalition, session_uuid, Briefing, CascadeRule,
    CategoryDef, CoalitionStatus, Constants, DayReport, DecisionOutcome, GameContent, GameState,
    InitialState, PowerCenterDef, PowerCenterId, PowerCenterSeed, StateError,
};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

#[derive(Deserialize)]
struct PowerCentersFile {
    content_version: String,
    power_centers: Vec<PowerCenterDef>,
}

#[derive(Deserialize)]
struct CascadesFile {
    cascades: Vec<CascadeRule>,
}

#[derive(Deserialize)]
struct CategoriesFile {
    categories: Vec<CategoryDef>,
}

#[derive(Deserialize)]
struct BriefingsFile {
    briefings: Vec<Briefing>,
}

fn assert_known(known: &HashSet<&PowerCenterId>, id: &PowerCenterId, what: &str) {
    assert!(
        known.contains(id),
        "{what} references '{}', which is not a known power center",
        id.0,
    );
}

fn assert_unit_range(name: &str, value: f64) {
    assert!(
        (0.0..=100.0).contains(&value),
        "{name} must be within [0, 100], got {value}",
    );
}

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a cascade rule naming a power center that doesn't
/// exist, two centers sharing an id, or a probability outside `[0, 1]`.
pub fn validate_content(content: &GameContent) {
    let mut known: HashSet<&PowerCenterId> = HashSet::new();
    for center in &content.power_centers {
        assert!(
            PowerCenterId::normalize(&center.id.0).as_ref() == Some(&center.id),
            "power center id '{}' must be non-empty, trimmed and lowercase",
            center.id.0,
        );
        assert!(
            known.insert(&center.id),
            "power center '{}' is defined more than once",
            center.id.0,
        );
        assert_unit_range(&format!("power center '{}' initial_value", center.id.0), center.initial_value);
    }

    for rule in &content.cascades {
        assert_known(&known, &rule.trigger, "cascade trigger");
        assert_known(&known, &rule.target, "cascade target");
        assert!(
            rule.factor.is_finite(),
            "cascade {} -> {} has a non-finite factor",
            rule.trigger.0,
            rule.target.0,
        );
    }

    let mut seen_categories = HashSet::new();
    for def in &content.categories {
        assert!(
            seen_categories.insert(def.category),
            "category '{}' is mapped more than once",
            def.category,
        );
        for id in &def.affected {
            assert_known(&known, id, &format!("category '{}'", def.category));
        }
    }

    for briefing in &content.briefings {
        assert!(!briefing.headline.trim().is_empty(), "briefing has an empty headline");
        for id in &briefing.affected {
            assert_known(&known, id, &format!("briefing '{}'", briefing.headline));
        }
    }

    validate_constants(&content.constants);
}

fn validate_constants(c: &Constants) {
    assert!(c.starting_day >= 1, "starting_day must be >= 1");
    assert_unit_range("starting_energy", c.starting_energy);
    assert_unit_range("starting_chaos", c.starting_chaos);
    assert!(c.starting_score >= 0.0, "starting_score must be >= 0");
    assert!(
        (0.0..=1.0).contains(&c.drift_probability),
        "drift_probability must be within [0, 1], got {}",
        c.drift_probability,
    );
    assert!(c.drift_span >= 0.0, "drift_span must be >= 0");
    assert!(
        c.coalition_min_members >= 1,
        "coalition_min_members must be at least 1"
    );
    assert!(
        c.coalition_hostile_below < c.coalition_allied_above,
        "coalition_hostile_below must be below coalition_allied_above"
    );
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let raw = std::fs::read_to_string(dir.join(file)).with_context(|| format!("reading {file}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {file}"))
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    let centers: PowerCentersFile = read_json(dir, "power_centers.json")?;
    let cascades: CascadesFile = read_json(dir, "cascades.json")?;
    let categories: CategoriesFile = read_json(dir, "categories.json")?;
    let briefings: BriefingsFile = read_json(dir, "briefings.json")?;
    let content = GameContent {
        content_version: centers.content_version,
        power_centers: centers.power_centers,
        cascades: cascades.cascades,
        categories: categories.categories,
        briefings: briefings.briefings,
        constants,
    };
    validate_content(&content);
    tracing::debug!(
        version = %content.content_version,
        centers = content.power_centers.len(),
        briefings = content.briefings.len(),
        "content loaded"
    );
    Ok(content)
}

pub fn build_initial_state(content: &GameContent) -> Result<GameState, StateError> {
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
}

/// One playthrough: content, store, seeded RNG and the open crisis.
///
/// Everything random in a session draws from `rng`, so a seed replays the
/// whole game including the session id.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub content: GameContent,
    pub state: GameState,
    pub rng: ChaCha8Rng,
    pub crises: CrisisGenerator,
    pub current_crisis: Option<Crisis>,
}

impl Session {
    pub fn new(content: GameContent, seed: u64) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let id = session_uuid(&mut rng);
        let state = build_initial_state(&content).context("building initial state")?;
        tracing::info!(%id, seed, "session started");
        Ok(Self {
            id,
            seed,
            started_at: Utc::now(),
            content,
            state,
            rng,
            crises: CrisisGenerator::new(),
            current_crisis: None,
        })
    }

    /// Opens a new crisis from a random briefing, replacing any open one.
    pub fn next_crisis(&mut self) -> &Crisis {
        let crisis = self.crises.random(&self.content, &mut self.rng);
        tracing::debug!(id = %crisis.id, title = %crisis.title, "crisis opened");
        self.current_crisis.insert(crisis)
    }

    /// Resolves the open crisis with option `choice`. The crisis stays open
    /// if the decision is refused.
    pub fn decide(&mut self, choice: usize) -> Result<DecisionOutcome> {
        let Some(crisis) = self.current_crisis.as_ref() else {
            bail!("no open crisis");
        };
        let Some((effects, meta)) = resolve_option(crisis, choice, &self.content.constants) else {
            bail!(
                "crisis {} has no option {} (choose 0-{})",
                crisis.id,
                choice,
                crisis.options.len().saturating_sub(1)
            );
        };
        let outcome = apply_decision(&mut self.state, &effects, meta, &self.content)
            .with_context(|| format!("resolving {}", crisis.id))?;
        self.current_crisis = None;
        Ok(outcome)
    }

    pub fn send_tweet(&mut self, text: &str) -> Result<(TweetOutcome, DecisionOutcome)> {
        let Some(outcome) = tweet(text, &self.content.constants) else {
            bail!("tweet is empty");
        };
        let applied = apply_decision(
            &mut self.state,
            &outcome.effects,
            outcome.meta.clone(),
            &self.content,
        )
        .context("sending tweet")?;
        Ok((outcome, applied))
    }

    pub fn hold_press(&mut self, style: PressStyle) -> Result<DecisionOutcome> {
        let (effects, meta) = press_response(style, &self.content.constants, &mut self.rng);
        apply_decision(&mut self.state, &effects, meta, &self.content)
            .with_context(|| format!("press conference ({style})"))
    }

    pub fn ignore_news(&mut self) -> Result<DecisionOutcome> {
        let (effects, meta) = ignore_breaking_news(&self.content.constants);
        apply_decision(&mut self.state, &effects, meta, &self.content)
            .context("ignoring breaking news")
    }

    pub fn end_day(&mut self) -> Result<DayReport> {
        advance_day(&mut self.state, &self.content, &mut self.rng).context("advancing day")
    }

    pub fn coalition(&self) -> CoalitionStatus {
        assess_coalition(&self.state.snapshot(), &self.content.constants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_core::test_fixtures::base_content;
    use chaos_core::{CascadeCondition, NewsCategory};

    fn pid(raw: &str) -> PowerCenterId {
        PowerCenterId(raw.to_string())
    }

    #[test]
    fn test_valid_content_passes_validation() {
        validate_content(&base_content()); // should not panic
    }

    #[test]
    #[should_panic(expected = "is not a known power center")]
    fn test_cascade_unknown_target_panics() {
        let mut content = base_content();
        content.cascades.push(CascadeRule {
            trigger: pid("media"),
            target: pid("senate"),
            factor: 0.5,
            condition: CascadeCondition::AbsAbove { threshold: 5.0 },
        });
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "defined more than once")]
    fn test_duplicate_power_center_panics() {
        let mut content = base_content();
        let dup = content.power_centers[0].clone();
        content.power_centers.push(dup);
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "trimmed and lowercase")]
    fn test_unnormalized_power_center_id_panics() {
        let mut content = base_content();
        content.power_centers[0].id = pid("Congress");
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "mapped more than once")]
    fn test_duplicate_category_panics() {
        let mut content = base_content();
        content.categories.push(CategoryDef {
            category: NewsCategory::Foreign,
            affected: vec![pid("military")],
        });
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "drift_probability")]
    fn test_drift_probability_out_of_range_panics() {
        let mut content = base_content();
        content.constants.drift_probability = 1.5;
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "initial_value")]
    fn test_initial_value_out_of_range_panics() {
        let mut content = base_content();
        content.power_centers[0].initial_value = 120.0;
        validate_content(&content);
    }

    #[test]
    fn test_build_initial_state_uses_constants() {
        let content = base_content();
        let state = build_initial_state(&content).unwrap();
        assert_eq!(state.day(), 1);
        assert_eq!(state.known_power_centers().len(), 8);
        assert_eq!(state.power("military"), Some(60.0));
    }

    #[test]
    fn test_session_is_reproducible() {
        let a = Session::new(base_content(), 42).unwrap();
        let b = Session::new(base_content(), 42).unwrap();
        let c = Session::new(base_content(), 43).unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_decide_requires_open_crisis() {
        let mut session = Session::new(base_content(), 1).unwrap();
        let err = session.decide(0).unwrap_err();
        assert!(err.to_string().contains("no open crisis"));

        session.next_crisis();
        let err = session.decide(9).unwrap_err();
        assert!(err.to_string().contains("has no option 9"));
        assert!(session.current_crisis.is_some());

        session.decide(1).unwrap();
        assert!(session.current_crisis.is_none());
    }

    #[test]
    fn test_session_quick_actions() {
        let mut session = Session::new(base_content(), 5).unwrap();
        let (outcome, _) = session.send_tweet("Tremendous day").unwrap();
        assert!((outcome.chaos - 15.0).abs() < 1e-9);
        assert!(session.send_tweet("").is_err());

        session.hold_press(PressStyle::Answer).unwrap();
        session.ignore_news().unwrap();
        let report = session.end_day().unwrap();
        assert_eq!(report.day, 2);
        // 15 (tweet) - 5 (answer) + 10 (ignored)
        assert!((session.state.chaos() - 20.0).abs() < 1e-9);
    }
}
