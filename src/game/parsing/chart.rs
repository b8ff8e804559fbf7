use crate::game::judgment::JudgementThresholds;
use log::info;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug)]
pub enum ChartError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl core::fmt::Display for ChartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read chart: {e}"),
            Self::Json(e) => write!(f, "malformed chart: {e}"),
            Self::Invalid(msg) => write!(f, "invalid chart: {msg}"),
        }
    }
}

impl std::error::Error for ChartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

const fn default_time_signature() -> [u32; 2] {
    [4, 4]
}

const fn default_result_delay() -> f32 {
    2.0
}

/// Per-level settings, read once when the level is set up.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TrackChart {
    #[serde(default)]
    pub title: String,
    pub bpm: f32,
    #[serde(default = "default_time_signature")]
    pub time_signature: [u32; 2],
    pub music_delay: f32,
    #[serde(default)]
    pub audio_offset: f32,
    #[serde(default)]
    pub start_offset: f32,
    #[serde(default = "default_result_delay")]
    pub result_delay: f32,
    pub track_length: f32,
    pub anchor_track: String,
    #[serde(default)]
    pub mix_tracks: Vec<String>,
    pub notes: u32,
    #[serde(default)]
    pub rainbow_notes: u32,
    #[serde(default)]
    pub judgement: JudgementThresholds,
}

impl TrackChart {
    fn validate(&self) -> Result<(), String> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(format!("bpm must be positive, got {}", self.bpm));
        }
        if self.time_signature.contains(&0) {
            return Err(format!(
                "time signature must be non-zero, got {}/{}",
                self.time_signature[0], self.time_signature[1]
            ));
        }
        let timings = [
            ("music_delay", self.music_delay),
            ("audio_offset", self.audio_offset),
            ("start_offset", self.start_offset),
            ("result_delay", self.result_delay),
            ("track_length", self.track_length),
        ];
        for (name, value) in timings {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        if self.anchor_track.trim().is_empty() {
            return Err("anchor_track must name a registered track".to_string());
        }
        if self.rainbow_notes > self.notes {
            return Err(format!(
                "rainbow_notes ({}) exceeds notes ({})",
                self.rainbow_notes, self.notes
            ));
        }
        self.judgement.validate()
    }

    #[inline(always)]
    pub fn seconds_per_beat(&self) -> f32 {
        60.0 / self.bpm
    }

    /// Beat position `seconds` after the anchor track started.
    #[inline(always)]
    pub fn beat_at(&self, seconds: f32) -> f32 {
        seconds / self.seconds_per_beat()
    }

    /// Zero-based measure index `seconds` after the anchor track started.
    pub fn measure_at(&self, seconds: f32) -> u32 {
        let beat = self.beat_at(seconds).max(0.0);
        (beat / self.time_signature[0] as f32).floor() as u32
    }
}

pub fn parse_chart(json: &str) -> Result<TrackChart, ChartError> {
    let chart: TrackChart = serde_json::from_str(json).map_err(ChartError::Json)?;
    chart.validate().map_err(ChartError::Invalid)?;
    Ok(chart)
}

pub fn load_chart(path: &Path) -> Result<TrackChart, ChartError> {
    let json = std::fs::read_to_string(path).map_err(ChartError::Io)?;
    let chart = parse_chart(&json)?;
    info!(
        "Loaded chart '{}' from '{}': {} notes at {} BPM.",
        chart.title,
        path.display(),
        chart.notes,
        chart.bpm
    );
    Ok(chart)
}

#[cfg(test)]
mod tests {
    use super::{ChartError, parse_chart};

    const CHART: &str = r#"{
        "title": "Opening Night",
        "bpm": 120,
        "time_signature": [3, 4],
        "music_delay": 3.0,
        "track_length": 90.0,
        "anchor_track": "bandplaying",
        "mix_tracks": ["guitar", "drums"],
        "notes": 200,
        "rainbow_notes": 12,
        "judgement": { "perfect": 0.04, "great": 0.08, "meh": 0.12, "press": 0.2 }
    }"#;

    #[test]
    fn parses_chart_with_defaults() {
        let chart = parse_chart(CHART).expect("chart should parse");
        assert_eq!(chart.title, "Opening Night");
        assert_eq!(chart.audio_offset, 0.0);
        assert_eq!(chart.result_delay, 2.0);
        assert_eq!(chart.mix_tracks, vec!["guitar", "drums"]);
        assert!((chart.judgement.great - 0.08).abs() <= f32::EPSILON);
    }

    #[test]
    fn beat_and_measure_follow_tempo() {
        let chart = parse_chart(CHART).expect("chart should parse");
        assert!((chart.seconds_per_beat() - 0.5).abs() <= 1e-6);
        assert!((chart.beat_at(2.0) - 4.0).abs() <= 1e-6);
        // Three beats per measure: beat 4 sits in the second measure.
        assert_eq!(chart.measure_at(2.0), 1);
        assert_eq!(chart.measure_at(-1.0), 0);
    }

    #[test]
    fn rejects_inconsistent_charts() {
        let too_many_rainbows = CHART.replace("\"rainbow_notes\": 12", "\"rainbow_notes\": 500");
        assert!(matches!(
            parse_chart(&too_many_rainbows),
            Err(ChartError::Invalid(_))
        ));

        let zero_bpm = CHART.replace("\"bpm\": 120", "\"bpm\": 0");
        assert!(matches!(parse_chart(&zero_bpm), Err(ChartError::Invalid(_))));

        let negative_delay = CHART.replace("\"music_delay\": 3.0", "\"music_delay\": -1.0");
        assert!(matches!(
            parse_chart(&negative_delay),
            Err(ChartError::Invalid(_))
        ));
    }

    #[test]
    fn missing_required_field_is_a_json_error() {
        let no_anchor = CHART.replace("\"anchor_track\": \"bandplaying\",", "");
        assert!(matches!(parse_chart(&no_anchor), Err(ChartError::Json(_))));
    }
}
