use crate::core::audio::AudioBackend;
use crate::game::mix::{LAYERED_TRACKS, LayeredMix};
use crate::game::parsing::cutscene::{
    CameraWaypoint, Cue, CueBatch, CutsceneDefinition, load_cutscenes,
};
use crate::game::profile::ProfileStore;
use crate::screens::{Scene, SceneAction};
use log::{debug, error, info, warn};
use std::path::Path;

#[derive(Clone, Debug, PartialEq)]
pub enum CutsceneEffect {
    ShowImage(String),
    MoveCamera(CameraWaypoint),
    ShowDialogue(String),
    PlayCue(Cue),
    SetVolume { track: &'static str, volume: f32 },
    StopAudio,
    Navigate(SceneAction),
}

// Read positions into the current definition's step lists.
#[derive(Clone, Copy, Debug, Default)]
struct Cursor {
    definition: usize,
    camera: usize,
    dialogue: usize,
    cues: usize,
}

/// Steps through story cutscenes one "continue" press at a time.
pub struct CutsceneSequencer {
    definitions: Vec<CutsceneDefinition>,
    current: Option<Cursor>,
    mix: LayeredMix,
}

impl CutsceneSequencer {
    pub fn from_definitions(definitions: Vec<CutsceneDefinition>) -> Self {
        Self {
            definitions,
            current: None,
            mix: LayeredMix::default(),
        }
    }

    /// Reads the cutscene file. A malformed file leaves the sequencer with no
    /// cutscenes; every later `load` then reports nothing current.
    pub fn from_file(path: &Path) -> Self {
        let definitions = match load_cutscenes(path) {
            Ok(defs) => defs,
            Err(e) => {
                error!("Cutscenes unavailable: {e}");
                Vec::new()
            }
        };
        Self::from_definitions(definitions)
    }

    pub fn current(&self) -> Option<&CutsceneDefinition> {
        self.current
            .and_then(|cursor| self.definitions.get(cursor.definition))
    }

    /// Camera waypoints not yet shown in the current cutscene.
    pub fn remaining(&self) -> usize {
        match (self.current, self.current()) {
            (Some(cursor), Some(def)) => def.camera.len().saturating_sub(cursor.camera),
            _ => 0,
        }
    }

    /// Camera waypoints in the current cutscene.
    pub fn total(&self) -> usize {
        self.current().map_or(0, |def| def.camera.len())
    }

    #[inline(always)]
    pub const fn mix_step(&self) -> i8 {
        self.mix.step()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Makes the first definition named `name` current and applies its
    /// opening step. Reloading a cutscene starts it over.
    pub fn load(&mut self, name: &str) -> Vec<CutsceneEffect> {
        let Some(index) = self.definitions.iter().position(|d| d.name == name) else {
            warn!("No cutscene named '{name}'.");
            self.current = None;
            return Vec::new();
        };
        let mut effects = Vec::new();
        self.load_index(index, &mut effects);
        effects
    }

    fn load_index(&mut self, index: usize, effects: &mut Vec<CutsceneEffect>) {
        self.mix.reset();
        self.current = Some(Cursor {
            definition: index,
            ..Cursor::default()
        });
        let def = &self.definitions[index];
        info!("Cutscene '{}' loaded ({} steps).", def.name, def.camera.len());
        effects.push(CutsceneEffect::ShowImage(def.background.clone()));
        self.step(effects);
    }

    // Applies the next waypoint with its dialogue line and cue batch.
    fn step(&mut self, effects: &mut Vec<CutsceneEffect>) {
        let Some(cursor) = self.current.as_mut() else {
            return;
        };
        let def = &self.definitions[cursor.definition];

        if let Some(point) = def.camera.get(cursor.camera) {
            effects.push(CutsceneEffect::MoveCamera(*point));
            cursor.camera += 1;
        }
        if let Some(line) = def.dialogue.get(cursor.dialogue) {
            effects.push(CutsceneEffect::ShowDialogue(line.clone()));
            cursor.dialogue += 1;
        }

        if self.mix.is_active() {
            if let Some(volumes) = self.mix.advance() {
                push_volumes(effects, volumes);
            }
            debug!("Layered mix at step {}.", self.mix.step());
            return;
        }
        let Some(batch) = def.cues.get(cursor.cues) else {
            return;
        };
        cursor.cues += 1;
        match batch {
            CueBatch::Cues(cues) => {
                effects.extend(cues.iter().cloned().map(CutsceneEffect::PlayCue));
            }
            CueBatch::LayeredMix => {
                let volumes = self.mix.start();
                for track in LAYERED_TRACKS {
                    effects.push(CutsceneEffect::PlayCue(Cue {
                        name: track.to_string(),
                        looping: true,
                    }));
                }
                push_volumes(effects, volumes);
            }
        }
    }

    /// Handles one "continue" press.
    pub fn advance(&mut self, profile: &mut ProfileStore) -> Vec<CutsceneEffect> {
        let mut effects = Vec::new();
        let Some(cursor) = self.current else {
            warn!("Advance requested with no current cutscene.");
            return effects;
        };
        if self.remaining() > 0 {
            self.step(&mut effects);
            return effects;
        }

        effects.push(CutsceneEffect::StopAudio);
        self.mix.reset();

        let def = &self.definitions[cursor.definition];
        if def.has_next_image {
            let next = cursor.definition + 1;
            if next < self.definitions.len() {
                self.load_index(next, &mut effects);
                return effects;
            }
            warn!(
                "Cutscene '{}' expects a next image but is the last entry.",
                def.name
            );
        }

        let action = match def.target_level {
            None => SceneAction::NavigateNoFade(Scene::LevelSelect),
            Some(_) if profile.take_first_time_flag() => SceneAction::Navigate(Scene::Tutorial),
            Some(level) => SceneAction::Navigate(Scene::Track(level)),
        };
        info!("Cutscene '{}' finished; going to {:?}.", def.name, action);
        effects.push(CutsceneEffect::Navigate(action));
        self.current = None;
        effects
    }
}

fn push_volumes(effects: &mut Vec<CutsceneEffect>, volumes: [f32; 3]) {
    for (track, volume) in LAYERED_TRACKS.into_iter().zip(volumes) {
        effects.push(CutsceneEffect::SetVolume { track, volume });
    }
}

/// Forwards the audio effects to `audio`, ignoring the visual ones.
/// Every volume is scaled by `gain`.
pub fn apply_audio<A: AudioBackend + ?Sized>(effects: &[CutsceneEffect], audio: &mut A, gain: f32) {
    for effect in effects {
        match effect {
            CutsceneEffect::PlayCue(cue) => {
                audio.play(&cue.name, cue.looping);
                audio.set_volume(&cue.name, gain);
            }
            CutsceneEffect::SetVolume { track, volume } => audio.set_volume(track, volume * gain),
            CutsceneEffect::StopAudio => audio.stop_all(),
            _ => {}
        }
    }
}
