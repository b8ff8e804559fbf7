/// Per-run flags read by several components within the same frame.
///
/// Each field has exactly one writer per frame; nothing here is locked, so the
/// contract is kept by construction rather than enforced at runtime:
/// - `paused`: written only by the frame driver (`Level::set_paused`).
/// - `fever_active`: written only by the fever meter's owner (`Level::set_fever`).
/// - `full_combo`: written only when the run applies its `FullCombo` effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunContext {
    pub paused: bool,
    pub fever_active: bool,
    pub full_combo: bool,
}

impl RunContext {
    pub const fn new() -> Self {
        Self {
            paused: false,
            fever_active: false,
            full_combo: false,
        }
    }
}
