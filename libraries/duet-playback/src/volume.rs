//! Session volume with logarithmic scaling
//!
//! The level is a 0-100 percentage mapped onto -60 dB..0 dB, so equal slider
//! steps sound like equal loudness steps. The resulting linear factor is what
//! a session hands to its render graph's gain node.

/// Lowest attenuation reachable above zero, in dB
const FLOOR_DB: f32 = -60.0;

/// Volume level plus mute flag for one session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    level: u8,
    muted: bool,
}

impl Volume {
    /// Create a volume at `level` (clamped to 100), unmuted
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(100),
            muted: false,
        }
    }

    /// Set the level (clamped to 100); the mute flag is untouched
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(100);
    }

    /// Current level (0-100)
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Silence output without forgetting the level
    pub fn mute(&mut self) {
        self.muted = true;
    }

    /// Restore output at the remembered level
    pub fn unmute(&mut self) {
        self.muted = false;
    }

    /// Flip the mute flag
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Whether output is muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Linear factor for the gain node
    ///
    /// `10^((level - 100) * 0.6 / 20)`; exactly 0.0 when muted or at level 0.
    pub fn gain(&self) -> f32 {
        if self.muted || self.level == 0 {
            return 0.0;
        }
        let db = (f32::from(self.level) - 100.0) * (-FLOOR_DB / 100.0);
        10.0_f32.powf(db / 20.0)
    }

    /// Effective attenuation in dB (floor when silent)
    pub fn to_db(&self) -> f32 {
        let gain = self.gain();
        if gain == 0.0 {
            FLOOR_DB
        } else {
            20.0 * gain.log10()
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(80)
    }
}
