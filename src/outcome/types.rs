use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Canonical result of a plate appearance.
///
/// The string form returned by [`AtBatOutcome::as_str`] is stable: it is used
/// as the persisted value and as the wire tag, and matches the upstream
/// machine-readable `eventType` codes wherever one exists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
#[serde(try_from = "String", into = "String")]
pub enum AtBatOutcome {
    // Hits
    Single,
    Double,
    Triple,
    HomeRun,

    // Walks
    Walk,
    IntentWalk,
    HitByPitch,

    // Strikeouts
    Strikeout,
    StrikeoutDoublePlay,
    StrikeoutTriplePlay,

    // Field outs
    FieldOut,
    FieldersChoice,
    FieldersChoiceOut,
    ForceOut,
    GroundedIntoDoublePlay,
    GroundedIntoTriplePlay,
    DoublePlay,
    TriplePlay,

    // Sacrifices
    SacFly,
    SacBunt,
    SacFlyDoublePlay,
    SacBuntDoublePlay,

    // Errors and interference
    FieldError,
    CatcherInterference,
    BatterInterference,
    FanInterference,

    // Baserunning, never a plate appearance result
    StolenBase2b,
    StolenBase3b,
    StolenBaseHome,
    CaughtStealing2b,
    CaughtStealing3b,
    CaughtStealingHome,
    CaughtStealingDoublePlay,
    Pickoff1b,
    Pickoff2b,
    Pickoff3b,
    PickoffCaughtStealing2b,
    PickoffCaughtStealing3b,
    PickoffCaughtStealingHome,
    WildPitch,
    PassedBall,
    Balk,
    DefensiveIndifference,
    OtherAdvance,
    OtherOut,
    RunnerDoublePlay,
    BaserunningError,

    // Administrative
    PitchingSubstitution,
    OffensiveSubstitution,
    DefensiveSubstitution,
    DefensiveSwitch,
    UmpireSubstitution,
    GameAdvisory,
    Injury,
    Ejection,
    MoundVisit,
    BatterTimeout,
    NoPitch,
    TruncatedPlateAppearance,

    Unknown,
}

impl AtBatOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AtBatOutcome::Single => "single",
            AtBatOutcome::Double => "double",
            AtBatOutcome::Triple => "triple",
            AtBatOutcome::HomeRun => "home_run",
            AtBatOutcome::Walk => "walk",
            AtBatOutcome::IntentWalk => "intent_walk",
            AtBatOutcome::HitByPitch => "hit_by_pitch",
            AtBatOutcome::Strikeout => "strikeout",
            AtBatOutcome::StrikeoutDoublePlay => "strikeout_double_play",
            AtBatOutcome::StrikeoutTriplePlay => "strikeout_triple_play",
            AtBatOutcome::FieldOut => "field_out",
            AtBatOutcome::FieldersChoice => "fielders_choice",
            AtBatOutcome::FieldersChoiceOut => "fielders_choice_out",
            AtBatOutcome::ForceOut => "force_out",
            AtBatOutcome::GroundedIntoDoublePlay => "grounded_into_double_play",
            AtBatOutcome::GroundedIntoTriplePlay => "grounded_into_triple_play",
            AtBatOutcome::DoublePlay => "double_play",
            AtBatOutcome::TriplePlay => "triple_play",
            AtBatOutcome::SacFly => "sac_fly",
            AtBatOutcome::SacBunt => "sac_bunt",
            AtBatOutcome::SacFlyDoublePlay => "sac_fly_double_play",
            AtBatOutcome::SacBuntDoublePlay => "sac_bunt_double_play",
            AtBatOutcome::FieldError => "field_error",
            AtBatOutcome::CatcherInterference => "catcher_interf",
            AtBatOutcome::BatterInterference => "batter_interference",
            AtBatOutcome::FanInterference => "fan_interference",
            AtBatOutcome::StolenBase2b => "stolen_base_2b",
            AtBatOutcome::StolenBase3b => "stolen_base_3b",
            AtBatOutcome::StolenBaseHome => "stolen_base_home",
            AtBatOutcome::CaughtStealing2b => "caught_stealing_2b",
            AtBatOutcome::CaughtStealing3b => "caught_stealing_3b",
            AtBatOutcome::CaughtStealingHome => "caught_stealing_home",
            AtBatOutcome::CaughtStealingDoublePlay => "cs_double_play",
            AtBatOutcome::Pickoff1b => "pickoff_1b",
            AtBatOutcome::Pickoff2b => "pickoff_2b",
            AtBatOutcome::Pickoff3b => "pickoff_3b",
            AtBatOutcome::PickoffCaughtStealing2b => "pickoff_caught_stealing_2b",
            AtBatOutcome::PickoffCaughtStealing3b => "pickoff_caught_stealing_3b",
            AtBatOutcome::PickoffCaughtStealingHome => "pickoff_caught_stealing_home",
            AtBatOutcome::WildPitch => "wild_pitch",
            AtBatOutcome::PassedBall => "passed_ball",
            AtBatOutcome::Balk => "balk",
            AtBatOutcome::DefensiveIndifference => "defensive_indiff",
            AtBatOutcome::OtherAdvance => "other_advance",
            AtBatOutcome::OtherOut => "other_out",
            AtBatOutcome::RunnerDoublePlay => "runner_double_play",
            AtBatOutcome::BaserunningError => "error",
            AtBatOutcome::PitchingSubstitution => "pitching_substitution",
            AtBatOutcome::OffensiveSubstitution => "offensive_substitution",
            AtBatOutcome::DefensiveSubstitution => "defensive_substitution",
            AtBatOutcome::DefensiveSwitch => "defensive_switch",
            AtBatOutcome::UmpireSubstitution => "umpire_substitution",
            AtBatOutcome::GameAdvisory => "game_advisory",
            AtBatOutcome::Injury => "injury",
            AtBatOutcome::Ejection => "ejection",
            AtBatOutcome::MoundVisit => "mound_visit",
            AtBatOutcome::BatterTimeout => "batter_timeout",
            AtBatOutcome::NoPitch => "no_pitch",
            AtBatOutcome::TruncatedPlateAppearance => "truncated_pa",
            AtBatOutcome::Unknown => "unknown",
        }
    }

    pub fn category(&self) -> OutcomeCategory {
        use AtBatOutcome::*;

        match self {
            Single | Double | Triple | HomeRun => OutcomeCategory::Hit,
            Walk | IntentWalk => OutcomeCategory::Walk,
            HitByPitch => OutcomeCategory::HitByPitch,
            Strikeout | StrikeoutDoublePlay | StrikeoutTriplePlay => OutcomeCategory::Strikeout,
            FieldOut | FieldersChoice | FieldersChoiceOut | ForceOut | GroundedIntoDoublePlay
            | GroundedIntoTriplePlay | DoublePlay | TriplePlay => OutcomeCategory::Out,
            SacFly | SacBunt | SacFlyDoublePlay | SacBuntDoublePlay => OutcomeCategory::Sacrifice,
            FieldError | CatcherInterference | BatterInterference | FanInterference => {
                OutcomeCategory::Error
            }
            StolenBase2b | StolenBase3b | StolenBaseHome | CaughtStealing2b | CaughtStealing3b
            | CaughtStealingHome | CaughtStealingDoublePlay | Pickoff1b | Pickoff2b | Pickoff3b
            | PickoffCaughtStealing2b | PickoffCaughtStealing3b | PickoffCaughtStealingHome
            | WildPitch | PassedBall | Balk | DefensiveIndifference | OtherAdvance | OtherOut
            | RunnerDoublePlay | BaserunningError => OutcomeCategory::Baserunning,
            PitchingSubstitution | OffensiveSubstitution | DefensiveSubstitution
            | DefensiveSwitch | UmpireSubstitution | GameAdvisory | Injury | Ejection
            | MoundVisit | BatterTimeout | NoPitch | TruncatedPlateAppearance => {
                OutcomeCategory::Administrative
            }
            Unknown => OutcomeCategory::Unknown,
        }
    }

    /// Whether users may predict this outcome and be scored against it
    pub fn is_scorable(&self) -> bool {
        self.category().is_scorable()
    }
}

impl fmt::Display for AtBatOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtBatOutcome {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AtBatOutcome::iter()
            .find(|outcome| outcome.as_str() == s)
            .ok_or_else(|| UnknownValue(s.to_string()))
    }
}

impl TryFrom<String> for AtBatOutcome {
    type Error = UnknownValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AtBatOutcome> for String {
    fn from(outcome: AtBatOutcome) -> Self {
        outcome.as_str().to_string()
    }
}

/// Coarse grouping of outcomes used for partial credit
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
#[serde(try_from = "String", into = "String")]
pub enum OutcomeCategory {
    Hit,
    Out,
    Walk,
    Strikeout,
    Sacrifice,
    Error,
    HitByPitch,
    Baserunning,
    Administrative,
    Unknown,
}

impl OutcomeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeCategory::Hit => "hit",
            OutcomeCategory::Out => "out",
            OutcomeCategory::Walk => "walk",
            OutcomeCategory::Strikeout => "strikeout",
            OutcomeCategory::Sacrifice => "sacrifice",
            OutcomeCategory::Error => "error",
            OutcomeCategory::HitByPitch => "hit_by_pitch",
            OutcomeCategory::Baserunning => "baserunning",
            OutcomeCategory::Administrative => "administrative",
            OutcomeCategory::Unknown => "unknown",
        }
    }

    /// Baserunning, administrative and unknown plays are not plate appearance
    /// results and can never be predicted.
    pub fn is_scorable(&self) -> bool {
        !matches!(
            self,
            OutcomeCategory::Baserunning | OutcomeCategory::Administrative | OutcomeCategory::Unknown
        )
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeCategory {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutcomeCategory::iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownValue(s.to_string()))
    }
}

impl TryFrom<String> for OutcomeCategory {
    type Error = UnknownValue;

    // `Self::Error` would name the `Error` variant
    fn try_from(value: String) -> Result<Self, UnknownValue> {
        value.parse()
    }
}

impl From<OutcomeCategory> for String {
    fn from(category: OutcomeCategory) -> Self {
        category.as_str().to_string()
    }
}

/// A string that is not one of the canonical outcome or category tags
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value: {0}")]
pub struct UnknownValue(pub String);
