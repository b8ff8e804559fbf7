use log::{debug, warn};
use rustc_hash::FxHashMap;

/* ============================== Public API ============================== */

/// Playback state of one registered track, as reported by the host mixer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackStatus {
    pub position: f32,
    pub length: f32,
    pub playing: bool,
}

impl TrackStatus {
    #[inline(always)]
    pub fn reached_end(&self) -> bool {
        self.position >= self.length
    }
}

/// The host's audio surface. Every call addresses a track by its registered
/// name; decoding and mixing happen on the other side of this trait.
pub trait AudioBackend {
    fn play(&mut self, name: &str, looping: bool);
    fn stop(&mut self, name: &str);
    fn stop_all(&mut self);
    fn set_volume(&mut self, name: &str, volume: f32);
    fn seek(&mut self, name: &str, seconds: f32);
    /// Holds a track at its current position until `resume`.
    fn pause(&mut self, name: &str);
    fn resume(&mut self, name: &str);
    fn status(&self, name: &str) -> Option<TrackStatus>;
}

/// Names the host has pre-registered. Lookups that miss fall back to the
/// first registered entry instead of failing the call.
#[derive(Clone, Debug, Default)]
pub struct CueRegistry {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl CueRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for name in names {
            registry.register(name);
        }
        registry
    }

    pub fn register<S: Into<String>>(&mut self, name: S) {
        let name = name.into();
        if self.index.contains_key(&name) {
            return;
        }
        self.index.insert(name.clone(), self.names.len());
        self.names.push(name);
    }

    pub fn resolve<'a>(&'a self, name: &str) -> Option<&'a str> {
        let resolved = self.resolve_quiet(name)?;
        if resolved != name {
            warn!("Audio cue '{name}' is not registered; falling back to '{resolved}'.");
        }
        Some(resolved)
    }

    /// `resolve` without the warning, for lookups repeated every frame.
    pub fn resolve_quiet<'a>(&'a self, name: &str) -> Option<&'a str> {
        match self.index.get(name) {
            Some(&ix) => Some(self.names[ix].as_str()),
            None => self.names.first().map(String::as_str),
        }
    }
}

/* ============================ Headless mixer ============================ */

#[derive(Clone, Debug, PartialEq)]
pub enum AudioCall {
    Play { name: String, looping: bool },
    Stop(String),
    StopAll,
    Volume { name: String, volume: f32 },
    Seek { name: String, seconds: f32 },
    Pause(String),
    Resume(String),
}

#[derive(Clone, Copy, Debug)]
struct SimTrack {
    position: f32,
    length: f32,
    playing: bool,
    paused: bool,
    looping: bool,
    volume: f32,
}

/// An `AudioBackend` with no device behind it. Playback positions move only
/// when `advance` is called, which makes runs reproducible frame by frame.
#[derive(Debug, Default)]
pub struct SimulatedAudio {
    registry: CueRegistry,
    tracks: FxHashMap<String, SimTrack>,
    calls: Vec<AudioCall>,
}

impl SimulatedAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, name: &str, length: f32) -> Self {
        self.registry.register(name);
        self.tracks.insert(
            name.to_string(),
            SimTrack {
                position: 0.0,
                length: length.max(0.0),
                playing: false,
                paused: false,
                looping: false,
                volume: 1.0,
            },
        );
        self
    }

    pub fn advance(&mut self, delta_time: f32) {
        for track in self.tracks.values_mut() {
            if !track.playing || track.paused {
                continue;
            }
            track.position += delta_time;
            if track.position < track.length {
                continue;
            }
            if track.looping && track.length > 0.0 {
                track.position %= track.length;
            } else {
                track.position = track.length;
                track.playing = false;
            }
        }
    }

    pub fn calls(&self) -> &[AudioCall] {
        &self.calls
    }

    pub fn volume(&self, name: &str) -> Option<f32> {
        self.tracks.get(name).map(|t| t.volume)
    }

    pub fn is_playing(&self, name: &str) -> bool {
        self.tracks.get(name).is_some_and(|t| t.playing)
    }

    fn track_mut(&mut self, name: &str) -> Option<&mut SimTrack> {
        let resolved = self.registry.resolve(name)?.to_string();
        self.tracks.get_mut(&resolved)
    }
}

impl AudioBackend for SimulatedAudio {
    fn play(&mut self, name: &str, looping: bool) {
        self.calls.push(AudioCall::Play {
            name: name.to_string(),
            looping,
        });
        match self.track_mut(name) {
            Some(track) => {
                track.position = 0.0;
                track.playing = true;
                track.paused = false;
                track.looping = looping;
            }
            None => warn!("Cannot play '{name}': no tracks registered."),
        }
    }

    fn stop(&mut self, name: &str) {
        self.calls.push(AudioCall::Stop(name.to_string()));
        if let Some(track) = self.track_mut(name) {
            track.playing = false;
        }
    }

    fn stop_all(&mut self) {
        self.calls.push(AudioCall::StopAll);
        for track in self.tracks.values_mut() {
            track.playing = false;
        }
    }

    fn set_volume(&mut self, name: &str, volume: f32) {
        self.calls.push(AudioCall::Volume {
            name: name.to_string(),
            volume,
        });
        if let Some(track) = self.track_mut(name) {
            track.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn seek(&mut self, name: &str, seconds: f32) {
        self.calls.push(AudioCall::Seek {
            name: name.to_string(),
            seconds,
        });
        if let Some(track) = self.track_mut(name) {
            track.position = seconds.clamp(0.0, track.length);
            debug!("Seeked '{name}' to {:.3}s.", track.position);
        }
    }

    fn pause(&mut self, name: &str) {
        self.calls.push(AudioCall::Pause(name.to_string()));
        if let Some(track) = self.track_mut(name) {
            track.paused = true;
        }
    }

    fn resume(&mut self, name: &str) {
        self.calls.push(AudioCall::Resume(name.to_string()));
        if let Some(track) = self.track_mut(name) {
            track.paused = false;
        }
    }

    // Polled every frame, so a misnamed track falls back without logging;
    // `play` has already warned about it.
    fn status(&self, name: &str) -> Option<TrackStatus> {
        let resolved = self.registry.resolve_quiet(name)?;
        let track = self.tracks.get(resolved)?;
        Some(TrackStatus {
            position: track.position,
            length: track.length,
            playing: track.playing,
        })
    }
}
