//! Configuration surface of the planning core.
//!
//! Only the options consumed by the core are defined here; user-facing
//! settings semantics (profiles, inheritance, per-object overrides) live in
//! the application around it. All structs serialize with serde so drivers
//! can load them from their own configuration files.

use serde::{Deserialize, Serialize};

use crate::{Coord, CoordF};

/// Which beading strategy family the wall generator uses to distribute bead
/// widths across the locally available wall thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeadingStrategyType {
    /// Distribute the width deviation evenly over all beads.
    #[default]
    Distributed,
    /// Put the entire width deviation in the centermost bead(s).
    CenterDeviation,
    /// Distribute the deviation over inner beads, keeping outer beads at
    /// their nominal width as much as possible.
    InwardDistributed,
}

/// Settings consumed by the variable-width wall generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSettings {
    /// Selects the beading strategy.
    pub beading_strategy_type: BeadingStrategyType,

    /// Enables thin-wall filling: regions too narrow for a full bead still
    /// receive a single narrowed bead.
    pub fill_outline_gaps: bool,

    /// Features narrower than this are dropped entirely (µm).
    pub min_feature_size: Coord,

    /// Minimum width a single bead may be narrowed to (µm).
    pub min_bead_width: Coord,
}

impl Default for WallSettings {
    fn default() -> Self {
        Self {
            beading_strategy_type: BeadingStrategyType::Distributed,
            fill_outline_gaps: true,
            min_feature_size: 100,
            min_bead_width: 200,
        }
    }
}

/// Thresholds for the path smoothing pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothSettings {
    /// Segments shorter than this are candidates for smoothing (µm).
    pub max_resolution: Coord,

    /// Angular deviation below which a corner is considered fluid and left
    /// alone (radians).
    pub fluid_angle: CoordF,
}

impl Default for SmoothSettings {
    fn default() -> Self {
        Self {
            max_resolution: 250,
            fluid_angle: 0.1,
        }
    }
}

/// A speed with its derivatives, as the machine planner consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedDerivatives {
    /// Speed (mm/s).
    pub speed: CoordF,
    /// Acceleration (mm/s²).
    pub acceleration: CoordF,
    /// Jerk (mm/s).
    pub jerk: CoordF,
}

impl SpeedDerivatives {
    /// Create a speed record.
    pub fn new(speed: CoordF, acceleration: CoordF, jerk: CoordF) -> Self {
        Self {
            speed,
            acceleration,
            jerk,
        }
    }
}

impl Default for SpeedDerivatives {
    fn default() -> Self {
        Self {
            speed: 120.0,
            acceleration: 3000.0,
            jerk: 20.0,
        }
    }
}

/// Retraction behaviour for one extruder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetractionConfig {
    /// Retraction distance (mm of filament).
    pub distance: CoordF,
    /// Retraction speed (mm/s).
    pub speed: CoordF,
    /// Prime (unretract) speed (mm/s).
    pub prime_speed: CoordF,
    /// Travel distance below which no retraction happens (µm).
    pub retract_before_travel: Coord,
}

impl Default for RetractionConfig {
    fn default() -> Self {
        Self {
            distance: 6.5,
            speed: 25.0,
            prime_speed: 25.0,
            retract_before_travel: 1500,
        }
    }
}

/// Fan-speed and layer-time settings carried per extruder plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FanSpeedLayerTimeSettings {
    /// Regular fan speed (fraction, 0..=1).
    pub fan_speed: CoordF,
    /// Fan speed used when the layer time falls below the threshold.
    pub fan_speed_max: CoordF,
    /// Minimum layer time before cooling kicks in (s).
    pub min_layer_time: CoordF,
    /// Layer time below which the fan ramps toward the maximum (s).
    pub min_layer_time_fan_speed_max: CoordF,
}

impl Default for FanSpeedLayerTimeSettings {
    fn default() -> Self {
        Self {
            fan_speed: 1.0,
            fan_speed_max: 1.0,
            min_layer_time: 5.0,
            min_layer_time_fan_speed_max: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_settings_roundtrip() {
        let settings = WallSettings {
            beading_strategy_type: BeadingStrategyType::InwardDistributed,
            fill_outline_gaps: false,
            min_feature_size: 150,
            min_bead_width: 250,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: WallSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
        assert!(json.contains("inward_distributed"));
    }

    #[test]
    fn test_defaults_are_sane() {
        let walls = WallSettings::default();
        assert!(walls.min_bead_width > 0);
        assert!(walls.min_feature_size > 0);

        let smooth = SmoothSettings::default();
        assert!(smooth.max_resolution > 0);
        assert!(smooth.fluid_angle > 0.0);
    }
}
