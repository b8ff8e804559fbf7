use crate::core::audio::TrackStatus;
use crate::game::context::RunContext;
use crate::game::parsing::chart::TrackChart;
use crate::screens::{Scene, SceneAction};
use log::{debug, info, warn};
use smallvec::SmallVec;

// Absorbs float drift from summing frame deltas against a delay threshold.
const TIME_EPSILON: f32 = 1e-4;
const HEARTBEAT_SECONDS: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    PreTrack,
    PreAudio,
    Playing,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunTimings {
    pub music_delay: f32,
    pub audio_offset: f32,
    pub start_offset: f32,
    pub track_length: f32,
    pub result_delay: f32,
}

impl RunTimings {
    pub fn from_chart(chart: &TrackChart) -> Self {
        Self {
            music_delay: chart.music_delay,
            audio_offset: chart.audio_offset,
            start_offset: chart.start_offset,
            track_length: chart.track_length,
            result_delay: chart.result_delay,
        }
    }

    /// Run time at which the results scene is requested.
    #[inline(always)]
    pub fn results_at(&self) -> f32 {
        self.track_length + self.music_delay + self.result_delay
    }
}

/// Side effects requested by a tick. The run never touches audio or scenes
/// itself; the caller applies these in order.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEffect {
    StartAnchor { seek_to: f32 },
    StartFullMix,
    FullCombo,
    Navigate(SceneAction),
}

pub type RunEffects = SmallVec<[RunEffect; 2]>;

#[derive(Clone, Copy, Debug)]
pub struct RunInput {
    pub delta: f32,
    /// `None` when the audio collaborator is missing.
    pub anchor: Option<TrackStatus>,
    pub misses: u32,
}

#[inline(always)]
fn reached(timer: f32, threshold: f32) -> bool {
    timer + TIME_EPSILON >= threshold
}

#[derive(Clone, Debug)]
pub struct TrackRun {
    timings: RunTimings,
    state: RunState,
    elapsed: f32,
    state_elapsed: f32,
    results_requested: bool,
    audio_warned: bool,
    log_timer: f32,
}

impl TrackRun {
    pub fn new(timings: RunTimings) -> Self {
        Self {
            timings,
            state: RunState::PreTrack,
            elapsed: 0.0,
            state_elapsed: 0.0,
            results_requested: false,
            audio_warned: false,
            log_timer: 0.0,
        }
    }

    #[inline(always)]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Seconds since the run started, excluding paused frames.
    #[inline(always)]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds since the current state was entered.
    #[inline(always)]
    pub const fn state_elapsed(&self) -> f32 {
        self.state_elapsed
    }

    #[inline(always)]
    pub const fn timings(&self) -> &RunTimings {
        &self.timings
    }

    fn enter(&mut self, next: RunState) {
        info!(
            "Run state {:?} -> {:?} at {:.3}s.",
            self.state, next, self.elapsed
        );
        self.state = next;
        self.state_elapsed = 0.0;
    }

    // Anchor position estimated from the run clock, for when the mixer's
    // own position drifts or stalls.
    #[inline(always)]
    fn clock_position(&self) -> f32 {
        self.timings.start_offset + (self.elapsed - self.timings.music_delay)
    }

    pub fn tick(&mut self, ctx: &RunContext, input: RunInput) -> RunEffects {
        let mut effects = RunEffects::new();
        if ctx.paused {
            return effects;
        }
        if self.state != RunState::Ended && input.anchor.is_none() {
            if !self.audio_warned {
                warn!("Anchor track status unavailable; holding run in {:?}.", self.state);
                self.audio_warned = true;
            }
            return effects;
        }

        self.elapsed += input.delta;
        self.state_elapsed += input.delta;

        self.log_timer += input.delta;
        if self.log_timer >= HEARTBEAT_SECONDS {
            debug!(
                "Run {:?}: {:.2}s total, {:.2}s in state, misses {}.",
                self.state, self.elapsed, self.state_elapsed, input.misses
            );
            self.log_timer -= HEARTBEAT_SECONDS;
        }

        match self.state {
            RunState::PreTrack => {
                if reached(self.elapsed, self.timings.music_delay) {
                    effects.push(RunEffect::StartAnchor {
                        seek_to: self.timings.start_offset,
                    });
                    if self.timings.audio_offset > 0.0 {
                        self.enter(RunState::PreAudio);
                    } else {
                        effects.push(RunEffect::StartFullMix);
                        self.enter(RunState::Playing);
                    }
                }
            }
            RunState::PreAudio => {
                if reached(
                    self.elapsed,
                    self.timings.music_delay + self.timings.audio_offset,
                ) {
                    effects.push(RunEffect::StartFullMix);
                    self.enter(RunState::Playing);
                }
            }
            RunState::Playing => {
                let Some(anchor) = input.anchor else {
                    return effects;
                };
                // Whichever check fires first ends the song.
                let finished = anchor.reached_end()
                    || !anchor.playing
                    || self.clock_position() > self.timings.track_length;
                if finished {
                    self.enter(RunState::Ended);
                    if input.misses == 0 {
                        info!("Full combo!");
                        effects.push(RunEffect::FullCombo);
                    }
                }
            }
            RunState::Ended => {
                if !self.results_requested && reached(self.elapsed, self.timings.results_at()) {
                    self.results_requested = true;
                    effects.push(RunEffect::Navigate(SceneAction::Navigate(Scene::Results)));
                }
            }
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::{RunEffect, RunInput, RunState, RunTimings, TrackRun};
    use crate::core::audio::TrackStatus;
    use crate::game::context::RunContext;
    use crate::screens::{Scene, SceneAction};

    fn timings(music_delay: f32, audio_offset: f32) -> RunTimings {
        RunTimings {
            music_delay,
            audio_offset,
            start_offset: 0.0,
            track_length: 10.0,
            result_delay: 2.0,
        }
    }

    fn idle() -> Option<TrackStatus> {
        Some(TrackStatus {
            position: 0.0,
            length: 10.0,
            playing: false,
        })
    }

    fn playing_at(position: f32) -> Option<TrackStatus> {
        Some(TrackStatus {
            position,
            length: 10.0,
            playing: true,
        })
    }

    fn input(delta: f32, anchor: Option<TrackStatus>) -> RunInput {
        RunInput {
            delta,
            anchor,
            misses: 0,
        }
    }

    fn start_playing(run: &mut TrackRun, ctx: &RunContext) {
        for _ in 0..1000 {
            run.tick(ctx, input(0.1, idle()));
            if run.state() == RunState::Playing {
                return;
            }
        }
        panic!("run never reached Playing");
    }

    #[test]
    fn skips_pre_audio_without_offset() {
        let ctx = RunContext::new();
        let mut run = TrackRun::new(timings(3.0, 0.0));
        let mut transition_tick = None;
        for tick in 1..=40 {
            let effects = run.tick(&ctx, input(0.1, idle()));
            assert_ne!(run.state(), RunState::PreAudio, "PreAudio must be skipped");
            if run.state() == RunState::Playing {
                assert_eq!(
                    effects.as_slice(),
                    &[
                        RunEffect::StartAnchor { seek_to: 0.0 },
                        RunEffect::StartFullMix
                    ]
                );
                transition_tick = Some(tick);
                break;
            }
            assert!(effects.is_empty(), "no effects before the music delay");
        }
        assert_eq!(transition_tick, Some(30));
        assert_eq!(run.state_elapsed(), 0.0, "state timer resets on transition");
    }

    #[test]
    fn audio_offset_splits_anchor_and_full_mix() {
        let ctx = RunContext::new();
        let mut run = TrackRun::new(timings(1.0, 0.5));
        let mut seen = Vec::new();
        for _ in 0..20 {
            let effects = run.tick(&ctx, input(0.1, playing_at(0.0)));
            for e in effects {
                seen.push((run.state(), e));
            }
        }
        assert_eq!(
            seen,
            vec![
                (RunState::PreAudio, RunEffect::StartAnchor { seek_to: 0.0 }),
                (RunState::Playing, RunEffect::StartFullMix),
            ]
        );
    }

    #[test]
    fn playing_ends_when_anchor_reaches_length() {
        let ctx = RunContext::new();
        let mut run = TrackRun::new(timings(0.0, 0.0));
        start_playing(&mut run, &ctx);
        run.tick(&ctx, input(0.1, playing_at(5.0)));
        assert_eq!(run.state(), RunState::Playing);
        run.tick(&ctx, input(0.1, playing_at(10.0)));
        assert_eq!(run.state(), RunState::Ended);
    }

    #[test]
    fn playing_ends_when_anchor_stops() {
        let ctx = RunContext::new();
        let mut run = TrackRun::new(timings(0.0, 0.0));
        start_playing(&mut run, &ctx);
        run.tick(&ctx, input(0.1, idle()));
        assert_eq!(run.state(), RunState::Ended);
    }

    #[test]
    fn playing_ends_when_clock_passes_length() {
        let ctx = RunContext::new();
        let mut run = TrackRun::new(timings(0.0, 0.0));
        start_playing(&mut run, &ctx);
        // Mixer reports a frozen position; the run clock still ends the song.
        for _ in 0..200 {
            run.tick(&ctx, input(0.1, playing_at(1.0)));
            if run.state() == RunState::Ended {
                break;
            }
        }
        assert_eq!(run.state(), RunState::Ended);
        assert!(run.elapsed() > 10.0);
    }

    #[test]
    fn full_combo_fires_once_and_results_follow() {
        let ctx = RunContext::new();
        let mut run = TrackRun::new(timings(0.0, 0.0));
        start_playing(&mut run, &ctx);
        let effects = run.tick(&ctx, input(0.1, idle()));
        assert_eq!(effects.as_slice(), &[RunEffect::FullCombo]);

        let mut navigations = 0;
        for _ in 0..200 {
            for e in run.tick(&ctx, input(0.1, None)) {
                assert_eq!(
                    e,
                    RunEffect::Navigate(SceneAction::Navigate(Scene::Results))
                );
                navigations += 1;
            }
        }
        assert_eq!(navigations, 1, "results are requested exactly once");
        assert!(run.elapsed() >= run.timings().results_at() - 1e-3);
    }

    #[test]
    fn misses_suppress_full_combo() {
        let ctx = RunContext::new();
        let mut run = TrackRun::new(timings(0.0, 0.0));
        start_playing(&mut run, &ctx);
        let effects = run.tick(
            &ctx,
            RunInput {
                delta: 0.1,
                anchor: idle(),
                misses: 1,
            },
        );
        assert_eq!(run.state(), RunState::Ended);
        assert!(effects.is_empty());
    }

    #[test]
    fn pause_freezes_the_run() {
        let mut ctx = RunContext::new();
        ctx.paused = true;
        let mut run = TrackRun::new(timings(0.5, 0.0));
        for _ in 0..50 {
            assert!(run.tick(&ctx, input(0.1, idle())).is_empty());
        }
        assert_eq!(run.state(), RunState::PreTrack);
        assert_eq!(run.elapsed(), 0.0);
    }

    #[test]
    fn missing_audio_holds_state_without_advancing() {
        let ctx = RunContext::new();
        let mut run = TrackRun::new(timings(0.5, 0.0));
        for _ in 0..50 {
            assert!(run.tick(&ctx, input(0.1, None)).is_empty());
        }
        assert_eq!(run.state(), RunState::PreTrack);
        assert_eq!(run.elapsed(), 0.0);

        run.tick(&ctx, input(0.5, idle()));
        assert_eq!(run.state(), RunState::Playing, "run resumes once audio is back");
    }
}
