use serde::Deserialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Judgement {
    Miss,
    Bad,
    Nice,
    Perfect,
}

impl Judgement {
    pub const ALL: [Self; 4] = [Self::Miss, Self::Bad, Self::Nice, Self::Perfect];

    pub const MAX_POINTS: u32 = 3;

    #[inline(always)]
    pub const fn points(self) -> u32 {
        match self {
            Self::Miss => 0,
            Self::Bad => 1,
            Self::Nice => 2,
            Self::Perfect => 3,
        }
    }

    #[inline(always)]
    pub const fn breaks_combo(self) -> bool {
        matches!(self, Self::Miss)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Miss => "miss",
            Self::Bad => "bad",
            Self::Nice => "nice",
            Self::Perfect => "perfect",
        }
    }
}

impl core::fmt::Display for Judgement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Timing windows, in seconds of absolute hit error. A press later than
// `press` is not a hit attempt at all and is left for the next note.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct JudgementThresholds {
    pub perfect: f32,
    pub great: f32,
    pub meh: f32,
    pub press: f32,
}

impl Default for JudgementThresholds {
    fn default() -> Self {
        Self {
            perfect: 0.050,
            great: 0.100,
            meh: 0.150,
            press: 0.250,
        }
    }
}

impl JudgementThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let windows = [self.perfect, self.great, self.meh, self.press];
        if windows.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(format!("judgement windows must be non-negative: {windows:?}"));
        }
        if windows.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(format!(
                "judgement windows must be ascending (perfect <= great <= meh <= press): {windows:?}"
            ));
        }
        Ok(())
    }
}

/// Classifies a press by its timing error against the nearest note.
/// Returns `None` when the press falls outside every window.
#[inline(always)]
pub fn judge_offset(thresholds: &JudgementThresholds, error_s: f32) -> Option<Judgement> {
    let err = error_s.abs();
    if !err.is_finite() {
        return None;
    }
    if err <= thresholds.perfect {
        Some(Judgement::Perfect)
    } else if err <= thresholds.great {
        Some(Judgement::Nice)
    } else if err <= thresholds.meh {
        Some(Judgement::Bad)
    } else if err <= thresholds.press {
        Some(Judgement::Miss)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{Judgement, JudgementThresholds, judge_offset};

    #[test]
    fn point_values_match_categories() {
        let points: Vec<u32> = Judgement::ALL.iter().map(|j| j.points()).collect();
        assert_eq!(points, vec![0, 1, 2, 3]);
        assert_eq!(Judgement::Perfect.points(), Judgement::MAX_POINTS);
    }

    #[test]
    fn offsets_classify_by_absolute_error() {
        let t = JudgementThresholds::default();
        assert_eq!(judge_offset(&t, 0.0), Some(Judgement::Perfect));
        assert_eq!(judge_offset(&t, -0.050), Some(Judgement::Perfect));
        assert_eq!(judge_offset(&t, 0.080), Some(Judgement::Nice));
        assert_eq!(judge_offset(&t, -0.120), Some(Judgement::Bad));
        assert_eq!(judge_offset(&t, 0.200), Some(Judgement::Miss));
        assert_eq!(judge_offset(&t, 0.300), None, "presses past the press window are ignored");
        assert_eq!(judge_offset(&t, f32::NAN), None);
    }

    #[test]
    fn thresholds_must_ascend() {
        assert!(JudgementThresholds::default().validate().is_ok());
        let bad = JudgementThresholds {
            perfect: 0.2,
            great: 0.1,
            meh: 0.3,
            press: 0.4,
        };
        assert!(bad.validate().is_err());
    }
}
