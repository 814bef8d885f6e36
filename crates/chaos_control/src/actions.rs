//! Quick actions outside the crisis flow: tweets, press conferences and
//! ignored breaking news. Each produces an effect bundle; nothing here
//! touches the store.

use chaos_core::{ChangeMeta, Constants, Effects};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TWEET_SOURCE: &str = "tweet";
pub const PRESS_SOURCE: &str = "press_conference";
pub const BREAKING_NEWS_SOURCE: &str = "breaking_news";

pub const HOT_WORDS: [&str; 6] = ["fake", "disaster", "tremendous", "witch hunt", "enemy", "failing"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown press style {0:?} (expected attack, deflect, answer or joke)")]
    UnknownPressStyle(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TweetOutcome {
    /// Chaos the tweet stirs up; also drives the score gain.
    pub chaos: f64,
    pub hot_words: Vec<&'static str>,
    pub effects: Effects,
    pub meta: ChangeMeta,
}

/// Scores a tweet. Returns `None` for blank text.
pub fn tweet(text: &str, constants: &Constants) -> Option<TweetOutcome> {
    if text.trim().is_empty() {
        return None;
    }
    let lowered = text.to_lowercase();
    let hot_words: Vec<&'static str> = HOT_WORDS
        .iter()
        .copied()
        .filter(|word| lowered.contains(word))
        .collect();
    let chaos = constants.tweet_base_chaos + hot_words.len() as f64 * constants.tweet_hot_word_chaos;

    let mut effects = Effects {
        chaos_delta: chaos,
        score_delta: chaos * constants.tweet_score_per_chaos,
        ..Effects::default()
    };
    if lowered.contains("media") || lowered.contains("fake news") {
        effects = effects.with_power("media", -15.0);
    }
    if lowered.contains("congress") {
        effects = effects.with_power("congress", -10.0);
    }
    let public = if chaos > 15.0 { 10.0 } else { 5.0 };
    effects = effects.with_power("public", public);

    Some(TweetOutcome {
        chaos,
        hot_words,
        effects,
        meta: ChangeMeta::from_source(TWEET_SOURCE).with_reason("Your tweet"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressStyle {
    Attack,
    Deflect,
    Answer,
    Joke,
}

impl PressStyle {
    pub const ALL: [PressStyle; 4] = [
        PressStyle::Attack,
        PressStyle::Deflect,
        PressStyle::Answer,
        PressStyle::Joke,
    ];
}

impl std::fmt::Display for PressStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PressStyle::Attack => "attack",
            PressStyle::Deflect => "deflect",
            PressStyle::Answer => "answer",
            PressStyle::Joke => "joke",
        })
    }
}

impl std::str::FromStr for PressStyle {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "attack" => Ok(PressStyle::Attack),
            "deflect" => Ok(PressStyle::Deflect),
            "answer" => Ok(PressStyle::Answer),
            "joke" => Ok(PressStyle::Joke),
            _ => Err(ActionError::UnknownPressStyle(s.to_string())),
        }
    }
}

/// Effects of answering a press question in `style`. A joke lands or
/// flops with the media on a coin flip.
pub fn press_response(
    style: PressStyle,
    constants: &Constants,
    rng: &mut impl Rng,
) -> (Effects, ChangeMeta) {
    let (media, public, chaos) = match style {
        PressStyle::Attack => (-15.0, 10.0, 15.0),
        PressStyle::Deflect => (-5.0, 0.0, 5.0),
        PressStyle::Answer => (10.0, 5.0, -5.0),
        PressStyle::Joke => {
            let media = if rng.gen_bool(0.5) { 10.0 } else { -10.0 };
            (media, 5.0, 10.0)
        }
    };
    let mut effects = Effects {
        chaos_delta: chaos,
        energy_delta: -constants.press_energy_cost,
        score_delta: constants.press_score_gain,
        ..Effects::default()
    }
    .with_power("media", media);
    if public > 0.0 {
        effects = effects.with_power("public", public);
    }
    let meta = ChangeMeta::from_source(PRESS_SOURCE).with_reason("Press conference");
    (effects, meta)
}

/// Cost of letting a breaking story pass without a response.
pub fn ignore_breaking_news(constants: &Constants) -> (Effects, ChangeMeta) {
    let effects = Effects {
        chaos_delta: constants.ignored_news_chaos,
        ..Effects::default()
    }
    .with_power("media", -constants.ignored_news_media_penalty);
    let meta = ChangeMeta::from_source(BREAKING_NEWS_SOURCE).with_reason("Ignored breaking news");
    (effects, meta)
}
