use log::{info, warn};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use smallvec::SmallVec;
use std::path::Path;

/// Batch token that switches the sequencer into the layered three-track mix.
pub const SPECIAL_CUE_TOKEN: &str = "special";
/// `kick:loop` plays `kick` on repeat.
pub const LOOP_DELIMITER: char = ':';
const LOOP_SUFFIX: &str = "loop";

#[derive(Debug)]
pub enum CutsceneError {
    Io(std::io::Error),
    Json(serde_json::Error),
    CameraPoint { cutscene: String, token: String },
    CueBatch { cutscene: String, token: String },
    TargetLevel { cutscene: String, level: i32 },
}

impl core::fmt::Display for CutsceneError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read cutscene file: {e}"),
            Self::Json(e) => write!(f, "malformed cutscene file: {e}"),
            Self::CameraPoint { cutscene, token } => write!(
                f,
                "cutscene '{cutscene}': camera point '{token}' is not an 'x,y,zoom' triple"
            ),
            Self::CueBatch { cutscene, token } => write!(
                f,
                "cutscene '{cutscene}': sfx batch '{token}' is not '<count> <name>...'"
            ),
            Self::TargetLevel { cutscene, level } => {
                write!(f, "cutscene '{cutscene}': level {level} is neither -1 nor a track number")
            }
        }
    }
}

impl std::error::Error for CutsceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraWaypoint {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cue {
    pub name: String,
    pub looping: bool,
}

impl Cue {
    fn from_token(token: &str) -> Self {
        match token.rsplit_once(LOOP_DELIMITER) {
            Some((name, suffix)) if suffix.eq_ignore_ascii_case(LOOP_SUFFIX) && !name.is_empty() => {
                Self {
                    name: name.to_string(),
                    looping: true,
                }
            }
            _ => Self {
                name: token.to_string(),
                looping: false,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CueBatch {
    /// Cues started together on one advance.
    Cues(SmallVec<[Cue; 4]>),
    LayeredMix,
}

/// One cutscene image and the steps the player clicks through on it.
/// The step lists are immutable once parsed; progress lives in the sequencer.
#[derive(Clone, Debug, PartialEq)]
pub struct CutsceneDefinition {
    pub name: String,
    pub background: String,
    pub has_next_image: bool,
    /// `None` means the story returns to level select.
    pub target_level: Option<u32>,
    pub camera: Vec<CameraWaypoint>,
    pub dialogue: Vec<String>,
    pub cues: Vec<CueBatch>,
}

#[derive(Deserialize)]
struct RawCutscene {
    name: String,
    texture: String,
    #[serde(rename = "hasNextImage")]
    has_next_image: bool,
    level: i32,
    #[serde(rename = "camera points")]
    camera_points: String,
    #[serde(default)]
    sfx: String,
    #[serde(default)]
    dialogue: Vec<String>,
}

fn parse_camera_points(cutscene: &str, raw: &str) -> Result<Vec<CameraWaypoint>, CutsceneError> {
    raw.split_whitespace()
        .map(|token| -> Result<CameraWaypoint, CutsceneError> {
            let bad = || CutsceneError::CameraPoint {
                cutscene: cutscene.to_string(),
                token: token.to_string(),
            };
            let fields: SmallVec<[f32; 3]> = token
                .split(',')
                .map(|f| f.trim().parse::<f32>())
                .collect::<Result<_, _>>()
                .map_err(|_| bad())?;
            match fields.as_slice() {
                &[x, y, zoom] if x.is_finite() && y.is_finite() && zoom.is_finite() => {
                    Ok(CameraWaypoint { x, y, zoom })
                }
                _ => Err(bad()),
            }
        })
        .collect()
}

fn parse_cue_batches(cutscene: &str, raw: &str) -> Result<Vec<CueBatch>, CutsceneError> {
    let mut batches = Vec::new();
    for token in raw.split(',').map(str::trim) {
        if token.is_empty() {
            continue;
        }
        if token.eq_ignore_ascii_case(SPECIAL_CUE_TOKEN) {
            batches.push(CueBatch::LayeredMix);
            continue;
        }
        let bad = || CutsceneError::CueBatch {
            cutscene: cutscene.to_string(),
            token: token.to_string(),
        };
        let mut parts = token.split_whitespace();
        let count = parts
            .next()
            .and_then(|c| c.parse::<usize>().ok())
            .ok_or_else(bad)?;
        let cues: SmallVec<[Cue; 4]> = parts.map(Cue::from_token).collect();
        if cues.len() != count {
            return Err(bad());
        }
        batches.push(CueBatch::Cues(cues));
    }
    Ok(batches)
}

fn definition_from_raw(raw: RawCutscene) -> Result<CutsceneDefinition, CutsceneError> {
    let target_level = match raw.level {
        -1 => None,
        n if n >= 0 => Some(n as u32),
        n => {
            return Err(CutsceneError::TargetLevel {
                cutscene: raw.name,
                level: n,
            });
        }
    };
    Ok(CutsceneDefinition {
        camera: parse_camera_points(&raw.name, &raw.camera_points)?,
        cues: parse_cue_batches(&raw.name, &raw.sfx)?,
        name: raw.name,
        background: raw.texture,
        has_next_image: raw.has_next_image,
        target_level,
        dialogue: raw.dialogue,
    })
}

/// Parses a whole cutscene file. Any malformed entry fails the entire file.
pub fn parse_cutscenes(json: &str) -> Result<Vec<CutsceneDefinition>, CutsceneError> {
    let raw: Vec<RawCutscene> = serde_json::from_str(json).map_err(CutsceneError::Json)?;
    let definitions = raw
        .into_iter()
        .map(definition_from_raw)
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = FxHashSet::default();
    for def in &definitions {
        if !seen.insert(def.name.as_str()) {
            warn!(
                "Duplicate cutscene name '{}'; lookups will use the first definition.",
                def.name
            );
        }
    }
    Ok(definitions)
}

pub fn load_cutscenes(path: &Path) -> Result<Vec<CutsceneDefinition>, CutsceneError> {
    let json = std::fs::read_to_string(path).map_err(CutsceneError::Io)?;
    let definitions = parse_cutscenes(&json)?;
    info!(
        "Loaded {} cutscene definitions from '{}'.",
        definitions.len(),
        path.display()
    );
    Ok(definitions)
}
