use crate::game::scores::ScoreWeights;
use log::{LevelFilter, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "bassnkick.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content);
        Ok(())
    }

    pub fn parse(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                current_section = line[1..line.len() - 1].trim().to_string();
                self.sections.entry(current_section.clone()).or_default();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                self.sections
                    .entry(current_section.clone())
                    .or_default()
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }

    pub fn has(&self, section: &str, key: &str) -> bool {
        self.sections.get(section).is_some_and(|s| s.contains_key(key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    pub master_volume: u8,
    pub music_volume: u8,
    pub sfx_volume: u8,
    /// `None` when the [Scoring] weights are present but unusable.
    pub score_weights: Option<ScoreWeights>,
    pub cutscene_file: PathBuf,
    pub profile_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            master_volume: 90,
            music_volume: 100,
            sfx_volume: 100,
            score_weights: Some(ScoreWeights::default()),
            cutscene_file: PathBuf::from("data/cutscenes.json"),
            profile_dir: PathBuf::from("save/profile"),
        }
    }
}

impl Config {
    /// Effective 0.0-1.0 gain for music tracks.
    pub fn music_gain(&self) -> f32 {
        f32::from(self.master_volume) / 100.0 * f32::from(self.music_volume) / 100.0
    }

    /// Effective 0.0-1.0 gain for cutscene cues.
    pub fn sfx_gain(&self) -> f32 {
        f32::from(self.master_volume) / 100.0 * f32::from(self.sfx_volume) / 100.0
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

const REQUIRED_KEYS: [(&str, &str); 8] = [
    ("Options", "LogLevel"),
    ("Options", "MasterVolume"),
    ("Options", "MusicVolume"),
    ("Options", "SFXVolume"),
    ("Scoring", "FeverWeight"),
    ("Scoring", "RainbowWeight"),
    ("Paths", "CutsceneFile"),
    ("Paths", "ProfileDir"),
];

// --- File I/O ---

fn parse_weight(conf: &SimpleIni, key: &str, default: f64) -> Option<f64> {
    let Some(raw) = conf.get("Scoring", key) else {
        return Some(default);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => {
            warn!("Invalid [Scoring] {key}='{raw}'; score weighting disabled.");
            None
        }
    }
}

pub fn from_ini(conf: &SimpleIni) -> Config {
    let default = Config::default();
    let default_weights = default.score_weights.unwrap_or_default();

    let fever = parse_weight(conf, "FeverWeight", default_weights.fever);
    let rainbow = parse_weight(conf, "RainbowWeight", default_weights.rainbow);

    Config {
        log_level: conf
            .get("Options", "LogLevel")
            .and_then(|v| LogLevel::from_str(&v).ok())
            .unwrap_or(default.log_level),
        master_volume: conf
            .get("Options", "MasterVolume")
            .and_then(|v| v.parse().ok())
            .map_or(default.master_volume, |v: u8| v.clamp(0, 100)),
        music_volume: conf
            .get("Options", "MusicVolume")
            .and_then(|v| v.parse().ok())
            .map_or(default.music_volume, |v: u8| v.clamp(0, 100)),
        sfx_volume: conf
            .get("Options", "SFXVolume")
            .and_then(|v| v.parse().ok())
            .map_or(default.sfx_volume, |v: u8| v.clamp(0, 100)),
        score_weights: match (fever, rainbow) {
            (Some(fever), Some(rainbow)) => Some(ScoreWeights { fever, rainbow }),
            _ => None,
        },
        cutscene_file: conf
            .get("Paths", "CutsceneFile")
            .filter(|v| !v.is_empty())
            .map_or(default.cutscene_file, PathBuf::from),
        profile_dir: conf
            .get("Paths", "ProfileDir")
            .filter(|v| !v.is_empty())
            .map_or(default.profile_dir, PathBuf::from),
    }
}

pub fn to_ini_string(cfg: &Config) -> String {
    let mut content = String::new();

    content.push_str("[Options]\n");
    content.push_str(&format!("LogLevel={}\n", cfg.log_level.as_str()));
    content.push_str(&format!("MasterVolume={}\n", cfg.master_volume));
    content.push_str(&format!("MusicVolume={}\n", cfg.music_volume));
    content.push_str(&format!("SFXVolume={}\n", cfg.sfx_volume));
    content.push('\n');

    // Unusable weights are written back as defaults so the next start recovers.
    let weights = cfg.score_weights.unwrap_or_default();
    content.push_str("[Scoring]\n");
    content.push_str(&format!("FeverWeight={}\n", weights.fever));
    content.push_str(&format!("RainbowWeight={}\n", weights.rainbow));
    content.push('\n');

    content.push_str("[Paths]\n");
    content.push_str(&format!("CutsceneFile={}\n", cfg.cutscene_file.display()));
    content.push_str(&format!("ProfileDir={}\n", cfg.profile_dir.display()));
    content.push('\n');

    content
}

/// Reads a config file, falling back to defaults for anything missing.
/// The file is (re)written when it is absent or lacks any known key.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        info!("'{}' not found, creating with default values.", path.display());
        if let Err(e) = std::fs::write(path, to_ini_string(&Config::default())) {
            warn!("Failed to create default config file: {e}");
        }
    }

    let mut conf = SimpleIni::new();
    match conf.load(path) {
        Ok(()) => {
            let cfg = from_ini(&conf);
            info!("Configuration loaded from '{}'.", path.display());
            let missing = REQUIRED_KEYS.iter().any(|(sec, key)| !conf.has(sec, key));
            if missing {
                if let Err(e) = std::fs::write(path, to_ini_string(&cfg)) {
                    warn!("Failed to save config file: {e}");
                } else {
                    info!("'{}' updated with default values for any missing fields.", path.display());
                }
            }
            cfg
        }
        Err(e) => {
            warn!("Failed to load '{}': {e}. Using default values.", path.display());
            Config::default()
        }
    }
}

pub fn load() {
    let cfg = load_from(Path::new(CONFIG_PATH));
    *CONFIG.lock().unwrap() = cfg;
}

pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}
