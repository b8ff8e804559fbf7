// Three stems of the same song, started together and crossfaded by volume.
pub const LAYERED_TRACKS: [&str; 3] = ["bandplaying", "guitar", "drums"];

// Volumes for LAYERED_TRACKS at each step: full band, guitar emphasis,
// drums emphasis, equal mix.
const STEP_VOLUMES: [[f32; 3]; 4] = [
    [1.0, 0.0, 0.0],
    [0.3, 1.0, 0.3],
    [0.3, 0.3, 1.0],
    [1.0, 1.0, 1.0],
];

const INACTIVE: i8 = -1;
const LAST_STEP: i8 = STEP_VOLUMES.len() as i8 - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayeredMix {
    step: i8,
}

impl Default for LayeredMix {
    fn default() -> Self {
        Self { step: INACTIVE }
    }
}

impl LayeredMix {
    /// -1 while inactive, otherwise 0..=3.
    #[inline(always)]
    pub const fn step(&self) -> i8 {
        self.step
    }

    #[inline(always)]
    pub const fn is_active(&self) -> bool {
        self.step != INACTIVE
    }

    pub fn start(&mut self) -> [f32; 3] {
        self.step = 0;
        STEP_VOLUMES[0]
    }

    /// Moves one step forward; the equal mix is held once reached.
    pub fn advance(&mut self) -> Option<[f32; 3]> {
        if !self.is_active() {
            return None;
        }
        self.step = (self.step + 1).min(LAST_STEP);
        Some(STEP_VOLUMES[self.step as usize])
    }

    pub fn reset(&mut self) {
        self.step = INACTIVE;
    }
}

#[cfg(test)]
mod tests {
    use super::LayeredMix;

    #[test]
    fn steps_through_emphasis_and_holds_equal_mix() {
        let mut mix = LayeredMix::default();
        assert_eq!(mix.step(), -1);
        assert_eq!(mix.advance(), None, "inactive mix must not advance");

        assert_eq!(mix.start(), [1.0, 0.0, 0.0]);
        assert_eq!(mix.advance(), Some([0.3, 1.0, 0.3]));
        assert_eq!(mix.advance(), Some([0.3, 0.3, 1.0]));
        assert_eq!(mix.advance(), Some([1.0, 1.0, 1.0]));
        assert_eq!(mix.step(), 3);
        assert_eq!(mix.advance(), Some([1.0, 1.0, 1.0]));
        assert_eq!(mix.step(), 3);

        mix.reset();
        assert!(!mix.is_active());
    }
}
