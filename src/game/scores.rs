use crate::game::context::RunContext;
use crate::game::judgment::Judgement;
use crate::game::stage_stats::StageResult;
use log::{debug, info, warn};
use serde::Serialize;

// --- Rank Definitions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Rank {
    S,
    A,
    B,
    F,
}

// Descending cutoffs; anything below the last one is an F.
const RANK_THRESHOLDS: [(Rank, f64); 3] = [(Rank::S, 1.0), (Rank::A, 0.9), (Rank::B, 0.7)];

pub fn rank_for_percent(percent: f64) -> Rank {
    RANK_THRESHOLDS
        .iter()
        .find(|(_, cutoff)| percent >= *cutoff)
        .map_or(Rank::F, |(rank, _)| *rank)
}

impl core::fmt::Display for Rank {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::S => write!(f, "S"),
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::F => write!(f, "F"),
        }
    }
}

/// Returned by `score_percentage` when no weighting configuration was supplied.
pub const SCORE_UNAVAILABLE: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub fever: f64,
    pub rainbow: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            fever: 0.5,
            rainbow: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JudgementCounters {
    pub miss: u32,
    pub bad: u32,
    pub nice: u32,
    pub perfect: u32,
}

impl JudgementCounters {
    #[inline(always)]
    pub const fn get(&self, judgement: Judgement) -> u32 {
        match judgement {
            Judgement::Miss => self.miss,
            Judgement::Bad => self.bad,
            Judgement::Nice => self.nice,
            Judgement::Perfect => self.perfect,
        }
    }

    #[inline(always)]
    pub const fn total(&self) -> u32 {
        self.miss + self.bad + self.nice + self.perfect
    }

    fn bump(&mut self, judgement: Judgement) {
        let slot = match judgement {
            Judgement::Miss => &mut self.miss,
            Judgement::Bad => &mut self.bad,
            Judgement::Nice => &mut self.nice,
            Judgement::Perfect => &mut self.perfect,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Receives score updates for the goal bar and the fever meter.
pub trait ScoreListener {
    /// Called only when the running score changed, with `curr_score / max_score`.
    fn on_progress(&mut self, fraction: f32);

    fn on_judgement(&mut self, _judgement: Judgement) {}
}

#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    counters: JudgementCounters,
    curr_combo: u32,
    curr_max_combo: u32,
    curr_score: u32,
    max_score: u32,
    fever_score: u32,
    rainbow_score: u32,
    max_rainbow_possible: u32,
    total_notes: u32,
    weights: Option<ScoreWeights>,
}

impl ScoreAccumulator {
    pub fn new(weights: Option<ScoreWeights>) -> Self {
        if weights.is_none() {
            warn!("No score weights configured; score percentage will be unavailable.");
        }
        Self {
            counters: JudgementCounters::default(),
            curr_combo: 0,
            curr_max_combo: 0,
            curr_score: 0,
            max_score: 0,
            fever_score: 0,
            rainbow_score: 0,
            max_rainbow_possible: 0,
            total_notes: 0,
            weights,
        }
    }

    pub fn initialize(&mut self, total_note_count: u32, rainbow_note_count: u32) {
        self.counters = JudgementCounters::default();
        self.curr_combo = 0;
        self.curr_max_combo = 0;
        self.curr_score = 0;
        self.fever_score = 0;
        self.rainbow_score = 0;
        self.total_notes = total_note_count;
        self.max_score = total_note_count.saturating_mul(Judgement::MAX_POINTS);
        self.max_rainbow_possible = rainbow_note_count;
        debug!(
            "Score initialized: {total_note_count} notes ({rainbow_note_count} rainbow), max score {}.",
            self.max_score
        );
    }

    /// Applies one note judgement. Returns `false` if the judgement was
    /// rejected because every note has already been judged.
    pub fn record_judgement(
        &mut self,
        ctx: &RunContext,
        judgement: Judgement,
        is_rainbow_note: bool,
        listener: Option<&mut dyn ScoreListener>,
    ) -> bool {
        if self.counters.total() >= self.total_notes {
            warn!(
                "Ignoring {judgement} judgement: all {} notes already judged.",
                self.total_notes
            );
            return false;
        }

        let points = judgement.points();
        let prev_score = self.curr_score;

        self.counters.bump(judgement);
        self.curr_score = self.curr_score.saturating_add(points);
        if is_rainbow_note {
            self.rainbow_score = self.rainbow_score.saturating_add(points);
        }
        if ctx.fever_active {
            self.fever_score = self.fever_score.saturating_add(points);
        }

        if judgement.breaks_combo() {
            self.curr_combo = 0;
        } else {
            self.curr_combo = self.curr_combo.saturating_add(1);
            if self.curr_combo > self.curr_max_combo {
                self.curr_max_combo = self.curr_combo;
            }
        }

        if let Some(listener) = listener {
            listener.on_judgement(judgement);
            if self.curr_score != prev_score {
                listener.on_progress(self.progress());
            }
        }
        true
    }

    /// Fraction of the base score earned so far, for the goal bar.
    pub fn progress(&self) -> f32 {
        if self.max_score == 0 {
            return 0.0;
        }
        self.curr_score as f32 / self.max_score as f32
    }

    pub fn score_percentage(&self) -> f64 {
        let Some(weights) = self.weights else {
            return SCORE_UNAVAILABLE;
        };
        let possible =
            self.max_score as f64 + self.max_rainbow_possible as f64 * weights.rainbow;
        if possible <= 0.0 {
            return 0.0;
        }
        let earned = self.curr_score as f64
            + self.fever_score as f64 * weights.fever
            + self.rainbow_score as f64 * weights.rainbow;
        earned / possible
    }

    pub fn rank(&self) -> Rank {
        rank_for_percent(self.score_percentage())
    }

    #[inline(always)]
    pub const fn counters(&self) -> JudgementCounters {
        self.counters
    }

    #[inline(always)]
    pub const fn combo(&self) -> u32 {
        self.curr_combo
    }

    #[inline(always)]
    pub const fn max_combo(&self) -> u32 {
        self.curr_max_combo
    }

    #[inline(always)]
    pub const fn score(&self) -> u32 {
        self.curr_score
    }

    #[inline(always)]
    pub const fn max_score(&self) -> u32 {
        self.max_score
    }

    #[inline(always)]
    pub const fn fever_score(&self) -> u32 {
        self.fever_score
    }

    #[inline(always)]
    pub const fn rainbow_score(&self) -> u32 {
        self.rainbow_score
    }

    #[inline(always)]
    pub const fn is_full_combo(&self) -> bool {
        self.counters.miss == 0
    }

    /// Snapshots the run into a results holder. Consuming `self` drops the
    /// gameplay state before the scene changes.
    pub fn finalize(self, full_combo: bool) -> StageResult {
        let percent = self.score_percentage();
        let result = StageResult {
            counters: self.counters,
            max_combo: self.curr_max_combo,
            score: self.curr_score,
            max_score: self.max_score,
            fever_score: self.fever_score,
            rainbow_score: self.rainbow_score,
            score_percent: percent,
            rank: rank_for_percent(percent),
            full_combo,
        };
        info!(
            "Run finalized: score {}/{}, {:.2}% rank {}, max combo {}.",
            result.score,
            result.max_score,
            percent * 100.0,
            result.rank,
            result.max_combo
        );
        result
    }
}
