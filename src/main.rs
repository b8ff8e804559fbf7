use bassnkick::config::{self, Config};
use bassnkick::core::audio::SimulatedAudio;
use bassnkick::game::cutscene::{CutsceneEffect, CutsceneSequencer, apply_audio};
use bassnkick::game::judgment::Judgement;
use bassnkick::game::level::Level;
use bassnkick::game::mix::LAYERED_TRACKS;
use bassnkick::game::parsing::chart::load_chart;
use bassnkick::game::profile::ProfileStore;
use bassnkick::game::run::RunState;
use bassnkick::screens::{Scene, SceneAction};
use log::{info, warn};
use std::path::Path;

const FRAME_SECONDS: f32 = 1.0 / 60.0;
// Upper bound on "continue" presses replayed across one cutscene chain.
const MAX_CUTSCENE_STEPS: usize = 1024;
const FEVER_COMBO: u32 = 20;
const PATTERN: [Judgement; 8] = [
    Judgement::Perfect,
    Judgement::Perfect,
    Judgement::Nice,
    Judgement::Perfect,
    Judgement::Perfect,
    Judgement::Bad,
    Judgement::Perfect,
    Judgement::Nice,
];

fn play_cutscene(cfg: &Config, profile: &mut ProfileStore, name: &str) -> SceneAction {
    let mut sequencer = CutsceneSequencer::from_file(&cfg.cutscene_file);
    if sequencer.is_empty() {
        warn!("No cutscenes available; skipping '{name}'.");
        return SceneAction::None;
    }
    let mut audio = LAYERED_TRACKS
        .into_iter()
        .fold(SimulatedAudio::new(), |audio, track| audio.with_track(track, 60.0));
    let gain = cfg.sfx_gain();

    let mut effects = sequencer.load(name);
    for _ in 0..MAX_CUTSCENE_STEPS {
        if sequencer.current().is_none() {
            break;
        }
        apply_audio(&effects, &mut audio, gain);
        for effect in &effects {
            match effect {
                CutsceneEffect::ShowImage(image) => info!("[cutscene] image {image}"),
                CutsceneEffect::ShowDialogue(line) => info!("[cutscene] \"{line}\""),
                _ => {}
            }
        }
        audio.advance(FRAME_SECONDS);
        effects = sequencer.advance(profile);
    }
    apply_audio(&effects, &mut audio, gain);

    effects
        .iter()
        .find_map(|effect| match effect {
            CutsceneEffect::Navigate(action) => Some(*action),
            _ => None,
        })
        .unwrap_or(SceneAction::None)
}

fn play_track(cfg: &Config, chart_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let chart = load_chart(chart_path)?;
    let audio = std::iter::once(&chart.anchor_track)
        .chain(&chart.mix_tracks)
        .fold(SimulatedAudio::new(), |audio, track| {
            audio.with_track(track, chart.track_length)
        });
    let mut level = Level::new(&chart, cfg.score_weights, Some(audio))
        .with_music_volume(cfg.music_gain());

    // Spread the chart's notes evenly over the song.
    let song_frames = (chart.track_length / FRAME_SECONDS).max(1.0) as u32;
    let note_interval = (song_frames / chart.notes.max(1)).max(1);
    let frame_budget = ((chart.music_delay + chart.track_length + chart.result_delay) / FRAME_SECONDS)
        as u32
        + 600;

    let mut playing_frames = 0u32;
    let mut note = 0usize;
    for _ in 0..frame_budget {
        if let Some(audio) = level.audio_mut() {
            audio.advance(FRAME_SECONDS);
        }
        let action = level.update(FRAME_SECONDS);
        if action.scene() == Some(Scene::Results) {
            break;
        }
        if level.state() != RunState::Playing {
            continue;
        }
        playing_frames += 1;
        if playing_frames % note_interval == 0 && level.score().counters().total() < chart.notes {
            let rainbow = note % 7 == 6;
            level.judge(PATTERN[note % PATTERN.len()], rainbow);
            level.set_fever(level.score().combo() >= FEVER_COMBO);
            note += 1;
        }
    }
    if level.state() != RunState::Ended {
        warn!("Simulation stopped before the song ended ({:?}).", level.state());
    }

    let result = level.finish();
    info!("Stage result:\n{}", result.to_json()?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());
    let mut profile = ProfileStore::load(&cfg.profile_dir);

    let mut args = std::env::args().skip(1);
    let cutscene = args.next();
    let chart = args.next();

    if let Some(name) = cutscene.as_deref() {
        let action = play_cutscene(&cfg, &mut profile, name);
        info!("Cutscene '{name}' requested {action:?}.");
        if let Some(Scene::Track(track)) = action.scene() {
            profile.update_last_track(track);
        }
    }
    if let Some(path) = chart.as_deref() {
        play_track(&cfg, Path::new(path))?;
    }
    Ok(())
}
