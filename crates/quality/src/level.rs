use serde::{Deserialize, Serialize};

/// Named quality tier, totally ordered from cheapest to richest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Minimal,
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 5] = [
        Self::Minimal,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Ultra,
    ];

    /// Position from `Minimal` (0) to `Ultra` (4).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Level at `index`, clamped into the valid range.
    pub fn from_index_clamped(index: i64) -> Self {
        let i = index.clamp(0, Self::ALL.len() as i64 - 1) as usize;
        Self::ALL[i]
    }

    /// One step richer, saturating at `Ultra`.
    pub fn up(self) -> Self {
        Self::from_index_clamped(self.index() as i64 + 1)
    }

    /// One step cheaper, saturating at `Minimal`.
    pub fn down(self) -> Self {
        Self::from_index_clamped(self.index() as i64 - 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// Parse a lowercase level name as used in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Preset render settings for this level.
    pub fn settings(self) -> QualitySettings {
        match self {
            Self::Minimal => QualitySettings {
                particle_limit: 0,
                effects_enabled: false,
                texture_scale: 0.5,
                target_fps: 30,
            },
            Self::Low => QualitySettings {
                particle_limit: 25,
                effects_enabled: false,
                texture_scale: 0.75,
                target_fps: 30,
            },
            Self::Medium => QualitySettings {
                particle_limit: 50,
                effects_enabled: true,
                texture_scale: 1.0,
                target_fps: 45,
            },
            Self::High => QualitySettings {
                particle_limit: 100,
                effects_enabled: true,
                texture_scale: 1.0,
                target_fps: 60,
            },
            Self::Ultra => QualitySettings {
                particle_limit: 200,
                effects_enabled: true,
                texture_scale: 1.0,
                target_fps: 60,
            },
        }
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Rendering and simulation budget bundled with a quality level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    pub particle_limit: u32,
    pub effects_enabled: bool,
    pub texture_scale: f32,
    pub target_fps: u32,
}

/// Startup capability hint supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub cpu_cores: u32,
    pub memory_gb: f32,
    pub is_mobile: bool,
    pub pixel_ratio: f32,
}

impl DeviceProfile {
    /// Conservative initial level for this device.
    pub fn recommended_level(&self) -> QualityLevel {
        let mut points = 0i64;
        points += match self.cpu_cores {
            0..=2 => 0,
            3..=4 => 1,
            5..=8 => 2,
            _ => 3,
        };
        if self.memory_gb >= 8.0 {
            points += 2;
        } else if self.memory_gb >= 4.0 {
            points += 1;
        }
        if self.is_mobile {
            points -= 2;
        }
        // Dense displays cost fill rate.
        if self.pixel_ratio > 2.0 {
            points -= 1;
        }
        QualityLevel::from_index_clamped(points.clamp(0, 4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        for pair in QualityLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn from_index_clamps() {
        assert_eq!(QualityLevel::from_index_clamped(-7), QualityLevel::Minimal);
        assert_eq!(QualityLevel::from_index_clamped(2), QualityLevel::Medium);
        assert_eq!(QualityLevel::from_index_clamped(99), QualityLevel::Ultra);
    }

    #[test]
    fn up_and_down_saturate() {
        assert_eq!(QualityLevel::Ultra.up(), QualityLevel::Ultra);
        assert_eq!(QualityLevel::Minimal.down(), QualityLevel::Minimal);
        assert_eq!(QualityLevel::Medium.up(), QualityLevel::High);
    }

    #[test]
    fn settings_grow_with_level() {
        for pair in QualityLevel::ALL.windows(2) {
            let (a, b) = (pair[0].settings(), pair[1].settings());
            assert!(a.particle_limit <= b.particle_limit);
            assert!(a.texture_scale <= b.texture_scale);
        }
        assert!(!QualityLevel::Minimal.settings().effects_enabled);
    }

    #[test]
    fn names_round_trip() {
        for level in QualityLevel::ALL {
            assert_eq!(QualityLevel::from_name(level.name()), Some(level));
        }
        assert_eq!(QualityLevel::from_name(" ULTRA "), Some(QualityLevel::Ultra));
        assert_eq!(QualityLevel::from_name("extreme"), None);
    }

    #[test]
    fn device_recommendation() {
        let desktop = DeviceProfile {
            cpu_cores: 12,
            memory_gb: 16.0,
            is_mobile: false,
            pixel_ratio: 1.0,
        };
        assert_eq!(desktop.recommended_level(), QualityLevel::Ultra);

        let phone = DeviceProfile {
            cpu_cores: 4,
            memory_gb: 3.0,
            is_mobile: true,
            pixel_ratio: 3.0,
        };
        assert_eq!(phone.recommended_level(), QualityLevel::Minimal);
    }
}
