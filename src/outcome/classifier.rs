use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

use super::types::AtBatOutcome;
use crate::game::models::{is_placeholder, PlayResult};

/// Outcome assigned when no signal in a play result can be mapped
pub const DEFAULT_OUTCOME: AtBatOutcome = AtBatOutcome::FieldOut;

/// Which part of the play result produced the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    EventType,
    Event,
    ResultType,
    Description,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: AtBatOutcome,
    pub source: ClassificationSource,
    /// Set when a signal was present but missing from its table, or when
    /// nothing matched and the default was used
    pub unmapped: Option<String>,
}

impl Classification {
    fn new(outcome: AtBatOutcome, source: ClassificationSource) -> Self {
        Self {
            outcome,
            source,
            unmapped: None,
        }
    }

    pub fn is_unmapped(&self) -> bool {
        self.unmapped.is_some()
    }
}

/// Classifies a play result, walking the signals from most to least reliable.
///
/// Never fails. A miss on one signal falls through to the next; if nothing
/// matches the result is [`DEFAULT_OUTCOME`].
pub fn classify_result(result: &PlayResult) -> Classification {
    let mut unmapped = None;

    if let Some(event_type) = non_empty(&result.event_type) {
        match outcome_for_event_type(event_type) {
            Some(outcome) => return Classification::new(outcome, ClassificationSource::EventType),
            None => unmapped = Some(format!("eventType:{event_type}")),
        }
    }

    if let Some(event) = non_empty(&result.event) {
        if let Some(outcome) = outcome_for_event(event) {
            return Classification {
                outcome,
                source: ClassificationSource::Event,
                unmapped,
            };
        }
        unmapped.get_or_insert_with(|| format!("event:{event}"));
    }

    if let Some(result_type) = non_empty(&result.result_type) {
        if let Some(outcome) = outcome_for_result_type(result_type) {
            return Classification {
                outcome,
                source: ClassificationSource::ResultType,
                unmapped,
            };
        }
    }

    if let Some(description) = non_empty(&result.description) {
        if let Some(outcome) = outcome_for_description(description) {
            return Classification {
                outcome,
                source: ClassificationSource::Description,
                unmapped,
            };
        }
    }

    Classification {
        outcome: DEFAULT_OUTCOME,
        source: ClassificationSource::Fallback,
        unmapped: Some(unmapped.unwrap_or_else(|| fallback_signal(result))),
    }
}

/// A usable signal: present, not blank, not the in-progress marker
fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !is_placeholder(v))
}

fn fallback_signal(result: &PlayResult) -> String {
    match non_empty(&result.result_type) {
        Some(result_type) => format!("type:{result_type}"),
        None => "empty".to_string(),
    }
}

/// Machine-readable codes. Canonical tags plus the aliases seen upstream.
fn outcome_for_event_type(event_type: &str) -> Option<AtBatOutcome> {
    let code = event_type.to_ascii_lowercase();
    if let Ok(outcome) = code.parse::<AtBatOutcome>() {
        return Some(outcome);
    }

    let outcome = match code.as_str() {
        "intentional_walk" => AtBatOutcome::IntentWalk,
        "catcher_interference" => AtBatOutcome::CatcherInterference,
        "sac_fly_dp" => AtBatOutcome::SacFlyDoublePlay,
        "sac_bunt_dp" => AtBatOutcome::SacBuntDoublePlay,
        "strikeout_dp" => AtBatOutcome::StrikeoutDoublePlay,
        "strikeout_tp" => AtBatOutcome::StrikeoutTriplePlay,
        "grounded_into_dp" => AtBatOutcome::GroundedIntoDoublePlay,
        "grounded_into_tp" => AtBatOutcome::GroundedIntoTriplePlay,
        "defensive_indifference" => AtBatOutcome::DefensiveIndifference,
        "fielders_choice_error" | "throwing_error" => AtBatOutcome::FieldError,
        _ => return None,
    };
    Some(outcome)
}

/// Human-readable `event` phrasing
fn outcome_for_event(event: &str) -> Option<AtBatOutcome> {
    let phrase = event.trim().to_ascii_lowercase();
    let outcome = match phrase.as_str() {
        "single" => AtBatOutcome::Single,
        "double" | "ground rule double" => AtBatOutcome::Double,
        "triple" => AtBatOutcome::Triple,
        "home run" | "homer" => AtBatOutcome::HomeRun,
        "walk" | "base on balls" => AtBatOutcome::Walk,
        "intent walk" | "intentional walk" => AtBatOutcome::IntentWalk,
        "hit by pitch" => AtBatOutcome::HitByPitch,
        "strikeout" | "strikeout - swinging" | "strikeout - looking" => AtBatOutcome::Strikeout,
        "strikeout double play" | "strikeout - dp" => AtBatOutcome::StrikeoutDoublePlay,
        "strikeout triple play" | "strikeout - tp" => AtBatOutcome::StrikeoutTriplePlay,
        "groundout" | "flyout" | "fly out" | "lineout" | "line out" | "pop out" | "pop up"
        | "bunt groundout" | "bunt pop out" | "bunt lineout" | "field out" => {
            AtBatOutcome::FieldOut
        }
        "forceout" | "force out" => AtBatOutcome::ForceOut,
        "fielders choice" | "fielder's choice" => AtBatOutcome::FieldersChoice,
        "fielders choice out" | "fielder's choice out" => AtBatOutcome::FieldersChoiceOut,
        "grounded into dp" | "grounded into double play" => AtBatOutcome::GroundedIntoDoublePlay,
        "grounded into tp" | "grounded into triple play" => AtBatOutcome::GroundedIntoTriplePlay,
        "double play" => AtBatOutcome::DoublePlay,
        "triple play" => AtBatOutcome::TriplePlay,
        "sac fly" | "sacrifice fly" => AtBatOutcome::SacFly,
        "sac bunt" | "sacrifice bunt" => AtBatOutcome::SacBunt,
        "sac fly double play" => AtBatOutcome::SacFlyDoublePlay,
        "sac bunt double play" => AtBatOutcome::SacBuntDoublePlay,
        "field error" | "fielding error" | "error" => AtBatOutcome::FieldError,
        "catcher interference" => AtBatOutcome::CatcherInterference,
        "batter interference" => AtBatOutcome::BatterInterference,
        "fan interference" => AtBatOutcome::FanInterference,
        "stolen base 2b" => AtBatOutcome::StolenBase2b,
        "stolen base 3b" => AtBatOutcome::StolenBase3b,
        "stolen base home" => AtBatOutcome::StolenBaseHome,
        "caught stealing 2b" => AtBatOutcome::CaughtStealing2b,
        "caught stealing 3b" => AtBatOutcome::CaughtStealing3b,
        "caught stealing home" => AtBatOutcome::CaughtStealingHome,
        "caught stealing double play" | "cs double play" => {
            AtBatOutcome::CaughtStealingDoublePlay
        }
        "pickoff 1b" => AtBatOutcome::Pickoff1b,
        "pickoff 2b" => AtBatOutcome::Pickoff2b,
        "pickoff 3b" => AtBatOutcome::Pickoff3b,
        "pickoff caught stealing 2b" => AtBatOutcome::PickoffCaughtStealing2b,
        "pickoff caught stealing 3b" => AtBatOutcome::PickoffCaughtStealing3b,
        "pickoff caught stealing home" => AtBatOutcome::PickoffCaughtStealingHome,
        "wild pitch" => AtBatOutcome::WildPitch,
        "passed ball" => AtBatOutcome::PassedBall,
        "balk" => AtBatOutcome::Balk,
        "defensive indiff" | "defensive indifference" => AtBatOutcome::DefensiveIndifference,
        "runner out" | "other out" => AtBatOutcome::OtherOut,
        "runner advance" | "other advance" => AtBatOutcome::OtherAdvance,
        "runner double play" => AtBatOutcome::RunnerDoublePlay,
        "pitching substitution" => AtBatOutcome::PitchingSubstitution,
        "offensive substitution" | "offensive sub" => AtBatOutcome::OffensiveSubstitution,
        "defensive substitution" | "defensive sub" => AtBatOutcome::DefensiveSubstitution,
        "defensive switch" => AtBatOutcome::DefensiveSwitch,
        "umpire substitution" => AtBatOutcome::UmpireSubstitution,
        "game advisory" => AtBatOutcome::GameAdvisory,
        "injury" => AtBatOutcome::Injury,
        "ejection" => AtBatOutcome::Ejection,
        "mound visit" => AtBatOutcome::MoundVisit,
        "batter timeout" => AtBatOutcome::BatterTimeout,
        "no pitch" => AtBatOutcome::NoPitch,
        _ => return None,
    };
    Some(outcome)
}

/// Generic result `type`. Upstream usually sends `atBat` here, which carries
/// no outcome information and is left unmapped on purpose.
fn outcome_for_result_type(result_type: &str) -> Option<AtBatOutcome> {
    let outcome = match result_type.trim().to_ascii_lowercase().as_str() {
        "home_run" | "homerun" => AtBatOutcome::HomeRun,
        "hit" => AtBatOutcome::Single,
        "walk" => AtBatOutcome::Walk,
        "strikeout" => AtBatOutcome::Strikeout,
        "hit_by_pitch" => AtBatOutcome::HitByPitch,
        "sacrifice" => AtBatOutcome::SacFly,
        "error" => AtBatOutcome::FieldError,
        "out" => AtBatOutcome::FieldOut,
        _ => return None,
    };
    Some(outcome)
}

/// Ordered free-text rules. Every needle of a rule must appear. Compound
/// phrasings come before the plain ones they contain.
const DESCRIPTION_RULES: &[(&[&str], AtBatOutcome)] = &[
    (&["strikes out", "triple play"], AtBatOutcome::StrikeoutTriplePlay),
    (&["strikes out", "double play"], AtBatOutcome::StrikeoutDoublePlay),
    (&["called out on strikes", "double play"], AtBatOutcome::StrikeoutDoublePlay),
    (&["sacrifice fly", "double play"], AtBatOutcome::SacFlyDoublePlay),
    (&["sacrifice bunt", "double play"], AtBatOutcome::SacBuntDoublePlay),
    (&["grounds into a triple play"], AtBatOutcome::GroundedIntoTriplePlay),
    (&["triple play"], AtBatOutcome::TriplePlay),
    (&["grounds into a double play"], AtBatOutcome::GroundedIntoDoublePlay),
    (&["double play"], AtBatOutcome::DoublePlay),
    (&["intentionally walks"], AtBatOutcome::IntentWalk),
    (&["grand slam"], AtBatOutcome::HomeRun),
    (&["homers"], AtBatOutcome::HomeRun),
    (&["home run"], AtBatOutcome::HomeRun),
    (&["triples"], AtBatOutcome::Triple),
    (&["ground-rule double"], AtBatOutcome::Double),
    (&["doubles"], AtBatOutcome::Double),
    (&["singles"], AtBatOutcome::Single),
    (&["hit by pitch"], AtBatOutcome::HitByPitch),
    (&["hit by a pitch"], AtBatOutcome::HitByPitch),
    (&["sacrifice fly"], AtBatOutcome::SacFly),
    (&["sacrifice bunt"], AtBatOutcome::SacBunt),
    (&["catcher interference"], AtBatOutcome::CatcherInterference),
    (&["fan interference"], AtBatOutcome::FanInterference),
    (&["batter interference"], AtBatOutcome::BatterInterference),
    (&["fielder's choice", "out at"], AtBatOutcome::FieldersChoiceOut),
    (&["fielder's choice"], AtBatOutcome::FieldersChoice),
    (&["force out"], AtBatOutcome::ForceOut),
    (&["forceout"], AtBatOutcome::ForceOut),
    (&["strikes out"], AtBatOutcome::Strikeout),
    (&["called out on strikes"], AtBatOutcome::Strikeout),
    (&["walks"], AtBatOutcome::Walk),
    (&["grounds out"], AtBatOutcome::FieldOut),
    (&["flies out"], AtBatOutcome::FieldOut),
    (&["lines out"], AtBatOutcome::FieldOut),
    (&["pops out"], AtBatOutcome::FieldOut),
    (&["fouls out"], AtBatOutcome::FieldOut),
    (&["error"], AtBatOutcome::FieldError),
];

fn outcome_for_description(description: &str) -> Option<AtBatOutcome> {
    let text = description.to_ascii_lowercase();
    DESCRIPTION_RULES
        .iter()
        .find(|(needles, _)| needles.iter().all(|needle| text.contains(needle)))
        .map(|(_, outcome)| *outcome)
}

/// Observability counter for play results that did not map cleanly
#[derive(Debug, Default)]
pub struct UnmappedEvents {
    total: AtomicU64,
    by_signal: Mutex<HashMap<String, u64>>,
}

impl UnmappedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, signal: &str) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let mut by_signal = self.by_signal.lock().unwrap();
        *by_signal.entry(signal.to_string()).or_default() += 1;
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.by_signal.lock().unwrap().clone()
    }
}

/// Classifier with an attached unmapped-event counter
#[derive(Debug, Default)]
pub struct OutcomeClassifier {
    unmapped: UnmappedEvents,
}

impl OutcomeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, result: &PlayResult) -> Classification {
        let classification = classify_result(result);
        self.record_unmapped(&classification);
        classification
    }

    /// Counts and logs the unmapped signal of a classification, if any
    pub fn record_unmapped(&self, classification: &Classification) {
        if let Some(signal) = &classification.unmapped {
            self.unmapped.record(signal);
            warn!(
                signal = %signal,
                outcome = %classification.outcome,
                source = ?classification.source,
                "Unmapped play event"
            );
        }
    }

    pub fn unmapped_events(&self) -> &UnmappedEvents {
        &self.unmapped
    }
}
