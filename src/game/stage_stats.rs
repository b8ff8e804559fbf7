use crate::game::scores::{JudgementCounters, Rank};
use serde::Serialize;

/// Results holder handed to the results scene once a run ends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageResult {
    pub counters: JudgementCounters,
    pub max_combo: u32,
    pub score: u32,
    pub max_score: u32,
    pub fever_score: u32,
    pub rainbow_score: u32,
    pub score_percent: f64,
    pub rank: Rank,
    pub full_combo: bool,
}

impl StageResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
