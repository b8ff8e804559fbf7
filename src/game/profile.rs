use crate::config::SimpleIni;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const PROFILE_FILE: &str = "profile.ini";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    /// Cleared the first time a story cutscene hands off to gameplay.
    pub first_time_player: bool,
    pub last_track: Option<u32>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            display_name: "Player".to_string(),
            first_time_player: true,
            last_track: None,
        }
    }
}

#[inline(always)]
fn parse_flag(raw: &str) -> Option<bool> {
    let v = raw.trim();
    if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

fn profile_from_ini(conf: &SimpleIni) -> Profile {
    let default = Profile::default();
    Profile {
        display_name: conf
            .get("userprofile", "DisplayName")
            .filter(|v| !v.is_empty())
            .unwrap_or(default.display_name),
        first_time_player: conf
            .get("userprofile", "FirstTimePlayer")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(default.first_time_player),
        last_track: conf
            .get("LastPlayed", "Track")
            .and_then(|v| v.parse::<u32>().ok()),
    }
}

fn profile_to_ini(profile: &Profile) -> String {
    let mut content = String::new();

    content.push_str("[userprofile]\n");
    content.push_str(&format!("DisplayName={}\n", profile.display_name));
    content.push_str(&format!(
        "FirstTimePlayer={}\n",
        i32::from(profile.first_time_player)
    ));
    content.push('\n');

    content.push_str("[LastPlayed]\n");
    match profile.last_track {
        Some(track) => content.push_str(&format!("Track={track}\n")),
        None => content.push_str("Track=\n"),
    }
    content.push('\n');

    content
}

/// The local player profile and where it lives on disk.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    profile: Profile,
}

impl ProfileStore {
    /// Loads `profile.ini` from `dir`, creating it with defaults if absent.
    /// Never fails: I/O problems are logged and the defaults are used.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(PROFILE_FILE);
        let mut store = Self {
            path,
            profile: Profile::default(),
        };

        if !store.path.exists() {
            info!(
                "Profile not found, creating defaults in '{}'.",
                dir.display()
            );
            if let Err(e) = fs::create_dir_all(dir) {
                warn!("Failed to create profile directory: {e}");
            }
            store.save();
            return store;
        }

        let mut conf = SimpleIni::new();
        match conf.load(&store.path) {
            Ok(()) => store.profile = profile_from_ini(&conf),
            Err(e) => warn!(
                "Failed to load '{}': {e}. Using default profile.",
                store.path.display()
            ),
        }
        store
    }

    /// A profile that is never written to disk.
    pub fn in_memory(profile: Profile) -> Self {
        Self {
            path: PathBuf::new(),
            profile,
        }
    }

    pub fn get(&self) -> &Profile {
        &self.profile
    }

    pub fn save(&self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        if let Err(e) = fs::write(&self.path, profile_to_ini(&self.profile)) {
            warn!("Failed to save {}: {}", self.path.display(), e);
        }
    }

    /// Reads the first-time flag and, if set, clears and persists it.
    /// Returns the value the flag had before the call.
    pub fn take_first_time_flag(&mut self) -> bool {
        if !self.profile.first_time_player {
            return false;
        }
        self.profile.first_time_player = false;
        self.save();
        info!("First-time player flag cleared for '{}'.", self.profile.display_name);
        true
    }

    pub fn update_last_track(&mut self, track: u32) {
        if self.profile.last_track == Some(track) {
            return;
        }
        self.profile.last_track = Some(track);
        self.save();
    }
}
