/// A fire-and-forget navigation request handed to the host's scene loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneAction {
    None,
    Navigate(Scene),
    /// Navigate immediately without running the host's transition animation.
    NavigateNoFade(Scene),
}

impl SceneAction {
    #[inline(always)]
    pub const fn scene(&self) -> Option<Scene> {
        match self {
            Self::None => None,
            Self::Navigate(scene) | Self::NavigateNoFade(scene) => Some(*scene),
        }
    }

    #[inline(always)]
    pub const fn with_transition(&self) -> bool {
        matches!(self, Self::Navigate(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    LevelSelect,
    Tutorial,
    Track(u32),
    Results,
}

impl Scene {
    /// Name of the scene as registered with the host.
    pub fn scene_name(&self) -> String {
        match self {
            Self::LevelSelect => "LevelSelect".to_string(),
            Self::Tutorial => "Tutorial".to_string(),
            Self::Track(n) => format!("Track{n}"),
            Self::Results => "Results".to_string(),
        }
    }
}

impl core::fmt::Display for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.scene_name())
    }
}
