use frameguard_quality::QualityLevel;
use serde::{Deserialize, Serialize};

/// One distance tier in a [`LodTable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Tier applies from this distance (inclusive) up to the next tier.
    pub distance_threshold: f32,
    pub scale: f32,
    pub alpha: f32,
    pub visible: bool,
    pub simplified: bool,
    pub texture_quality: f32,
}

impl LodLevel {
    pub const fn new(distance_threshold: f32, scale: f32) -> Self {
        Self {
            distance_threshold,
            scale,
            alpha: 1.0,
            visible: true,
            simplified: false,
            texture_quality: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    #[error("LOD table has no levels")]
    Empty,
    #[error("LOD level {index} has invalid threshold {value}")]
    InvalidThreshold { index: usize, value: f32 },
    #[error("LOD level {index}: threshold {threshold} does not exceed previous {previous}")]
    NotIncreasing {
        index: usize,
        previous: f32,
        threshold: f32,
    },
    #[error("LOD level {index} has invalid scale {value}")]
    InvalidScale { index: usize, value: f32 },
    #[error("LOD level {index}: scale {scale} exceeds nearer level's {previous}")]
    ScaleIncreases { index: usize, previous: f32, scale: f32 },
}

/// Ordered distance tiers, strictly increasing by threshold with
/// non-increasing scale.
#[derive(Debug, Clone, PartialEq)]
pub struct LodTable {
    levels: Vec<LodLevel>,
}

impl LodTable {
    /// Validate and wrap `levels`. Thresholds must be non-negative and strictly
    /// increasing, and scales must never grow with distance.
    pub fn new(levels: Vec<LodLevel>) -> Result<Self, LodError> {
        if levels.is_empty() {
            return Err(LodError::Empty);
        }
        for (index, level) in levels.iter().enumerate() {
            if !level.distance_threshold.is_finite() || level.distance_threshold < 0.0 {
                return Err(LodError::InvalidThreshold {
                    index,
                    value: level.distance_threshold,
                });
            }
            if !level.scale.is_finite() || level.scale <= 0.0 {
                return Err(LodError::InvalidScale {
                    index,
                    value: level.scale,
                });
            }
        }
        for (index, pair) in levels.windows(2).enumerate() {
            let (near, far) = (pair[0], pair[1]);
            if far.distance_threshold <= near.distance_threshold {
                return Err(LodError::NotIncreasing {
                    index: index + 1,
                    previous: near.distance_threshold,
                    threshold: far.distance_threshold,
                });
            }
            if far.scale > near.scale {
                return Err(LodError::ScaleIncreases {
                    index: index + 1,
                    previous: near.scale,
                    scale: far.scale,
                });
            }
        }
        Ok(Self { levels })
    }

    /// Index of the farthest tier whose threshold is `<= distance`.
    ///
    /// Distances below the first threshold (or NaN) map to tier 0.
    pub fn select(&self, distance: f32) -> usize {
        let n = self.levels.partition_point(|l| l.distance_threshold <= distance);
        n.saturating_sub(1)
    }

    /// Tier at `index`, if the table has one.
    pub fn level(&self, index: usize) -> Option<&LodLevel> {
        self.levels.get(index)
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl Default for LodTable {
    fn default() -> Self {
        Self {
            levels: default_levels(),
        }
    }
}

/// Thresholds 0/150/300/500/700/1000 with scales 1.0 down to 0.3.
pub fn default_levels() -> Vec<LodLevel> {
    vec![
        LodLevel::new(0.0, 1.0),
        LodLevel::new(150.0, 0.9),
        LodLevel {
            texture_quality: 0.75,
            ..LodLevel::new(300.0, 0.75)
        },
        LodLevel {
            alpha: 0.9,
            simplified: true,
            texture_quality: 0.5,
            ..LodLevel::new(500.0, 0.6)
        },
        LodLevel {
            alpha: 0.8,
            simplified: true,
            texture_quality: 0.5,
            ..LodLevel::new(700.0, 0.45)
        },
        LodLevel {
            alpha: 0.7,
            visible: false,
            simplified: true,
            texture_quality: 0.25,
            ..LodLevel::new(1000.0, 0.3)
        },
    ]
}

/// Divisor applied to camera distance before tier lookup. Richer levels
/// keep detail further out.
pub fn lod_distance_bias(level: QualityLevel) -> f32 {
    match level {
        QualityLevel::Ultra => 1.5,
        QualityLevel::High => 1.2,
        QualityLevel::Medium => 1.0,
        QualityLevel::Low => 0.75,
        QualityLevel::Minimal => 0.5,
    }
}

/// Bias used while emergency mode is active, whatever the quality level.
pub const EMERGENCY_LOD_BIAS: f32 = 0.35;
