use crate::core::audio::AudioBackend;
use crate::game::context::RunContext;
use crate::game::judgment::{Judgement, JudgementThresholds, judge_offset};
use crate::game::parsing::chart::TrackChart;
use crate::game::run::{RunEffect, RunInput, RunState, RunTimings, TrackRun};
use crate::game::scores::{ScoreAccumulator, ScoreListener, ScoreWeights};
use crate::game::stage_stats::StageResult;
use crate::screens::SceneAction;
use log::{debug, warn};

/// One attempt at a track: the run clock, the score, and the audio they drive.
pub struct Level<A: AudioBackend> {
    run: TrackRun,
    score: ScoreAccumulator,
    ctx: RunContext,
    audio: Option<A>,
    anchor_track: String,
    mix_tracks: Vec<String>,
    thresholds: JudgementThresholds,
    music_volume: f32,
    listener: Option<Box<dyn ScoreListener>>,
}

impl<A: AudioBackend> Level<A> {
    /// `audio` is optional; without it the run holds in its opening state.
    pub fn new(chart: &TrackChart, weights: Option<ScoreWeights>, audio: Option<A>) -> Self {
        if audio.is_none() {
            warn!("Level '{}' created without an audio backend.", chart.title);
        }
        let mut score = ScoreAccumulator::new(weights);
        score.initialize(chart.notes, chart.rainbow_notes);
        Self {
            run: TrackRun::new(RunTimings::from_chart(chart)),
            score,
            ctx: RunContext::new(),
            audio,
            anchor_track: chart.anchor_track.clone(),
            mix_tracks: chart.mix_tracks.clone(),
            thresholds: chart.judgement,
            music_volume: 1.0,
            listener: None,
        }
    }

    pub fn with_music_volume(mut self, volume: f32) -> Self {
        self.music_volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_listener(mut self, listener: Box<dyn ScoreListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    #[inline(always)]
    pub const fn state(&self) -> RunState {
        self.run.state()
    }

    #[inline(always)]
    pub const fn run(&self) -> &TrackRun {
        &self.run
    }

    #[inline(always)]
    pub const fn score(&self) -> &ScoreAccumulator {
        &self.score
    }

    #[inline(always)]
    pub const fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn audio(&self) -> Option<&A> {
        self.audio.as_ref()
    }

    pub fn audio_mut(&mut self) -> Option<&mut A> {
        self.audio.as_mut()
    }

    /// Freezes the run clock and holds the song's tracks where they are.
    pub fn set_paused(&mut self, paused: bool) {
        if self.ctx.paused == paused {
            return;
        }
        debug!("Level paused: {paused}.");
        self.ctx.paused = paused;
        let Some(audio) = self.audio.as_mut() else {
            return;
        };
        for track in std::iter::once(&self.anchor_track).chain(&self.mix_tracks) {
            if paused {
                audio.pause(track);
            } else {
                audio.resume(track);
            }
        }
    }

    pub fn set_fever(&mut self, active: bool) {
        self.ctx.fever_active = active;
    }

    pub fn update(&mut self, delta_time: f32) -> SceneAction {
        let anchor = self
            .audio
            .as_ref()
            .and_then(|audio| audio.status(&self.anchor_track));
        let input = RunInput {
            delta: delta_time,
            anchor,
            misses: self.score.counters().miss,
        };

        let mut action = SceneAction::None;
        for effect in self.run.tick(&self.ctx, input) {
            match effect {
                RunEffect::StartAnchor { seek_to } => self.start_anchor(seek_to),
                RunEffect::StartFullMix => self.start_full_mix(),
                RunEffect::FullCombo => self.ctx.full_combo = true,
                RunEffect::Navigate(next) => action = next,
            }
        }
        action
    }

    fn start_anchor(&mut self, seek_to: f32) {
        let Some(audio) = self.audio.as_mut() else {
            return;
        };
        audio.play(&self.anchor_track, false);
        audio.seek(&self.anchor_track, seek_to);
        audio.set_volume(&self.anchor_track, self.music_volume);
    }

    // Mix stems join wherever the anchor has got to so they stay in sync.
    fn start_full_mix(&mut self) {
        let Some(audio) = self.audio.as_mut() else {
            return;
        };
        let position = audio
            .status(&self.anchor_track)
            .map_or(0.0, |status| status.position);
        for track in &self.mix_tracks {
            audio.play(track, false);
            audio.seek(track, position);
            audio.set_volume(track, self.music_volume);
        }
    }

    /// Records a judgement from note-hit detection. Only accepted while the
    /// song is playing.
    pub fn judge(&mut self, judgement: Judgement, is_rainbow_note: bool) -> bool {
        if self.run.state() != RunState::Playing {
            debug!("Ignoring {judgement} outside of play ({:?}).", self.run.state());
            return false;
        }
        let listener = self
            .listener
            .as_mut()
            .map(|l| &mut **l as &mut dyn ScoreListener);
        self.score
            .record_judgement(&self.ctx, judgement, is_rainbow_note, listener)
    }

    /// Classifies a press by timing error and records it. Presses outside
    /// every window are ignored and return `None`.
    pub fn judge_press(&mut self, error_s: f32, is_rainbow_note: bool) -> Option<Judgement> {
        let judgement = judge_offset(&self.thresholds, error_s)?;
        self.judge(judgement, is_rainbow_note).then_some(judgement)
    }

    /// Ends the level and hands back its results.
    pub fn finish(mut self) -> StageResult {
        if let Some(audio) = self.audio.as_mut() {
            audio.stop_all();
        }
        self.score.finalize(self.ctx.full_combo)
    }
}

#[cfg(test)]
mod tests {
    use super::Level;
    use crate::core::audio::{AudioBackend, AudioCall, SimulatedAudio};
    use crate::game::judgment::Judgement;
    use crate::game::parsing::chart::{TrackChart, parse_chart};
    use crate::game::run::RunState;
    use crate::game::scores::{Rank, ScoreListener, ScoreWeights};
    use crate::screens::{Scene, SceneAction};
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f32 = 0.05;

    fn chart() -> TrackChart {
        parse_chart(
            r#"{
                "title": "Soundcheck",
                "bpm": 120,
                "music_delay": 1.0,
                "start_offset": 0.5,
                "track_length": 5.0,
                "anchor_track": "bandplaying",
                "mix_tracks": ["guitar", "drums"],
                "notes": 10,
                "rainbow_notes": 2
            }"#,
        )
        .expect("chart should parse")
    }

    fn audio() -> SimulatedAudio {
        SimulatedAudio::new()
            .with_track("bandplaying", 5.0)
            .with_track("guitar", 5.0)
            .with_track("drums", 5.0)
    }

    // Drives the level like a frame loop, judging one note per frame while
    // the song plays. Returns every navigation request seen.
    fn play_through(
        level: &mut Level<SimulatedAudio>,
        mut pick: impl FnMut(u32) -> Judgement,
    ) -> Vec<SceneAction> {
        let mut navigations = Vec::new();
        let mut judged = 0;
        for _ in 0..300 {
            if let Some(audio) = level.audio_mut() {
                audio.advance(DT);
            }
            let action = level.update(DT);
            if action != SceneAction::None {
                navigations.push(action);
            }
            if level.state() == RunState::Playing && judged < 10 {
                assert!(level.judge(pick(judged), judged < 2));
                judged += 1;
            }
        }
        navigations
    }

    #[test]
    fn clean_run_reaches_results_with_full_combo() {
        let mut level = Level::new(&chart(), Some(ScoreWeights::default()), Some(audio()));
        let navigations = play_through(&mut level, |_| Judgement::Perfect);

        assert_eq!(navigations, vec![SceneAction::Navigate(Scene::Results)]);
        assert_eq!(level.state(), RunState::Ended);
        assert!(level.context().full_combo);

        let result = level.finish();
        assert_eq!(result.score, 30);
        assert_eq!(result.rank, Rank::S);
        assert!(result.full_combo);
    }

    #[test]
    fn anchor_is_seeked_and_stems_follow_it() {
        let mut level = Level::new(&chart(), Some(ScoreWeights::default()), Some(audio()));
        for _ in 0..30 {
            if let Some(audio) = level.audio_mut() {
                audio.advance(DT);
            }
            level.update(DT);
        }
        assert_eq!(level.state(), RunState::Playing);

        let calls = level.audio().map(|a| a.calls().to_vec()).unwrap_or_default();
        assert!(calls.contains(&AudioCall::Seek {
            name: "bandplaying".to_string(),
            seconds: 0.5,
        }));
        assert!(calls.contains(&AudioCall::Seek {
            name: "drums".to_string(),
            seconds: 0.5,
        }));
        let audio = level.audio().expect("audio backend");
        assert!(audio.is_playing("guitar"));
    }

    #[test]
    fn a_single_miss_costs_the_full_combo() {
        let mut level = Level::new(&chart(), Some(ScoreWeights::default()), Some(audio()));
        play_through(&mut level, |n| if n == 4 { Judgement::Miss } else { Judgement::Perfect });
        assert!(!level.context().full_combo);
        let result = level.finish();
        assert!(!result.full_combo);
        assert_eq!(result.counters.miss, 1);
        assert_eq!(result.max_combo, 5);
    }

    #[test]
    fn missing_audio_keeps_the_level_waiting() {
        let mut level: Level<SimulatedAudio> =
            Level::new(&chart(), Some(ScoreWeights::default()), None);
        for _ in 0..200 {
            assert_eq!(level.update(DT), SceneAction::None);
        }
        assert_eq!(level.state(), RunState::PreTrack);
        assert!(!level.judge(Judgement::Perfect, false));
    }

    #[test]
    fn paused_level_does_not_advance() {
        let mut level = Level::new(&chart(), Some(ScoreWeights::default()), Some(audio()));
        level.set_paused(true);
        for _ in 0..100 {
            level.update(DT);
        }
        assert_eq!(level.state(), RunState::PreTrack);
        assert_eq!(level.run().elapsed(), 0.0);
    }

    #[test]
    fn pause_holds_the_song_in_place() {
        let mut level = Level::new(&chart(), Some(ScoreWeights::default()), Some(audio()));
        for _ in 0..40 {
            if let Some(audio) = level.audio_mut() {
                audio.advance(DT);
            }
            level.update(DT);
        }
        assert_eq!(level.state(), RunState::Playing);
        let position = |level: &Level<SimulatedAudio>| {
            level
                .audio()
                .and_then(|a| a.status("bandplaying"))
                .map(|s| s.position)
        };
        let before = position(&level);

        level.set_paused(true);
        for _ in 0..400 {
            if let Some(audio) = level.audio_mut() {
                audio.advance(DT);
            }
            level.update(DT);
        }
        assert_eq!(position(&level), before, "anchor must not move while paused");

        level.set_paused(false);
        if let Some(audio) = level.audio_mut() {
            audio.advance(DT);
        }
        level.update(DT);
        assert_eq!(level.state(), RunState::Playing, "song survives a long pause");
    }

    #[test]
    fn misnamed_anchor_falls_back_and_still_plays() {
        let mut chart = chart();
        chart.anchor_track = "band_typo".to_string();
        let mut level = Level::new(&chart, Some(ScoreWeights::default()), Some(audio()));
        for _ in 0..40 {
            if let Some(audio) = level.audio_mut() {
                audio.advance(DT);
            }
            level.update(DT);
        }
        assert_eq!(level.state(), RunState::Playing);
        assert!(level.run().elapsed() > 1.0);
        assert!(level.audio().is_some_and(|a| a.is_playing("bandplaying")));
    }

    #[test]
    fn presses_are_classified_by_timing_error() {
        let mut level = Level::new(&chart(), Some(ScoreWeights::default()), Some(audio()));
        while level.state() != RunState::Playing {
            level.update(DT);
        }
        assert_eq!(level.judge_press(0.01, false), Some(Judgement::Perfect));
        assert_eq!(level.judge_press(-0.12, false), Some(Judgement::Bad));
        assert_eq!(level.judge_press(0.9, false), None);
        assert_eq!(level.score().counters().total(), 2);
    }

    #[test]
    fn fever_points_and_listener_updates_flow_through() {
        struct Meter(Rc<RefCell<Vec<f32>>>);
        impl ScoreListener for Meter {
            fn on_progress(&mut self, fraction: f32) {
                self.0.borrow_mut().push(fraction);
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut level = Level::new(&chart(), Some(ScoreWeights::default()), Some(audio()))
            .with_listener(Box::new(Meter(Rc::clone(&seen))));
        while level.state() != RunState::Playing {
            level.update(DT);
        }
        level.set_fever(true);
        level.judge(Judgement::Nice, false);
        level.judge(Judgement::Miss, false);
        level.set_fever(false);
        level.judge(Judgement::Bad, false);

        assert_eq!(level.score().fever_score(), 2);
        assert_eq!(seen.borrow().len(), 2, "miss leaves the goal bar untouched");
    }
}
