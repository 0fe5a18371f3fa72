use serde::{Deserialize, Serialize};

/// Value the upstream feed puts in `event`/`eventType` while an at-bat is still live
pub const IN_PROGRESS_PLACEHOLDER: &str = "in_progress";

/// Game object handed over by the upstream game-data collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_pk: u64,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub plays: Vec<Play>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Preview,
    Live,
    Final,
}

/// One plate appearance as reported upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub at_bat_index: u32,
    #[serde(default)]
    pub result: PlayResult,
    #[serde(default)]
    pub count: Count,
    #[serde(default)]
    pub matchup: Matchup,
    /// Upstream completion flag. Observed to be unreliable, so resolution keys
    /// off the result event instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
}

/// Loosely shaped result block; any of the fields may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResult {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub balls: u8,
    pub strikes: u8,
    #[serde(default)]
    pub outs: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batter_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitcher_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitcher_name: Option<String>,
}

impl PlayResult {
    /// The first real (non-placeholder) event signal, if any
    pub fn completed_event(&self) -> Option<&str> {
        [self.event_type.as_deref(), self.event.as_deref()]
            .into_iter()
            .flatten()
            .find(|value| !is_placeholder(value))
    }
}

impl Play {
    /// A play is complete once its result carries a real event
    pub fn is_completed(&self) -> bool {
        self.result.completed_event().is_some()
    }
}

impl GameSnapshot {
    pub fn is_live(&self) -> bool {
        self.status == GameStatus::Live
    }

    /// Completed plays in ascending at-bat order, one per index
    pub fn completed_plays(&self) -> Vec<&Play> {
        let mut plays: Vec<&Play> = self.plays.iter().filter(|p| p.is_completed()).collect();
        plays.sort_by_key(|p| p.at_bat_index);
        plays.dedup_by_key(|p| p.at_bat_index);
        plays
    }

    /// The at-bat currently in progress: the highest-index play without a result
    pub fn current_play(&self) -> Option<&Play> {
        self.plays
            .iter()
            .filter(|p| !p.is_completed())
            .max_by_key(|p| p.at_bat_index)
    }

    pub fn play(&self, at_bat_index: u32) -> Option<&Play> {
        self.plays.iter().find(|p| p.at_bat_index == at_bat_index)
    }
}

pub(crate) fn is_placeholder(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase().replace(' ', "_");
    normalized.is_empty() || normalized == IN_PROGRESS_PLACEHOLDER
}
