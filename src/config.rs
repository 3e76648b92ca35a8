use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Result};
use serde::Deserialize;

use crate::easing::Easing;
use crate::error::Error;
use crate::geometry::Viewport;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Display surface geometry and lane count.
    pub surface: SurfaceOptions,
    /// Slot worker count and pacing of the rotation.
    pub rotation: RotationOptions,
    /// Insertion band and resting size of wall elements.
    pub placement: PlacementOptions,
    /// Entrance/hold/exit timing and highlight emphasis.
    pub animation: AnimationOptions,
    /// Spatial reservation tunables.
    pub regions: RegionOptions,
    /// Media gallery backing the wall.
    pub source: SourceOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde
    /// defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.surface.validate()?;
        self.rotation.validate()?;
        self.placement.validate()?;
        self.animation.validate()?;
        self.regions.validate()?;
        self.source.validate()?;
        Ok(self)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.surface.width,
            height: self.surface.height,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            surface: SurfaceOptions::default(),
            rotation: RotationOptions::default(),
            placement: PlacementOptions::default(),
            animation: AnimationOptions::default(),
            regions: RegionOptions::default(),
            source: SourceOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SurfaceOptions {
    /// Viewport width in display units.
    pub width: f32,
    /// Viewport height in display units.
    pub height: f32,
    /// Number of horizontal lanes stacked top to bottom.
    pub lanes: usize,
}

impl SurfaceOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0.0 && self.height > 0.0,
            "surface dimensions must be positive"
        );
        ensure!(self.lanes >= 1, "surface.lanes must be at least 1");
        Ok(())
    }
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            lanes: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RotationOptions {
    /// Number of concurrent slot workers.
    pub workers: usize,
    /// Optional deterministic seed for item and lane selection.
    pub selection_seed: Option<u64>,
    /// Delay between consecutive fill insertions, also the placement
    /// retry pause.
    #[serde(with = "humantime_serde")]
    pub fill_pacing: Duration,
    /// How long a slot rests after a failed cycle.
    #[serde(with = "humantime_serde")]
    pub failure_pause: Duration,
}

impl RotationOptions {
    fn validate(&self) -> Result<()> {
        ensure!(self.workers >= 1, "rotation.workers must be at least 1");
        ensure!(
            !self.fill_pacing.is_zero(),
            "rotation.fill-pacing must be positive"
        );
        ensure!(
            !self.failure_pause.is_zero(),
            "rotation.failure-pause must be positive"
        );
        Ok(())
    }
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            workers: 3,
            selection_seed: None,
            fill_pacing: Duration::from_millis(150),
            failure_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PlacementOptions {
    /// Half-width of the insertion band around each lane's center, as a
    /// fraction of the viewport width. Values at or above 0.5 would let
    /// insertions land at the viewport edges and are rejected outright.
    pub insertion_band: f32,
    /// Resting element height as a percentage of the viewport height.
    pub item_height_percent: f32,
}

impl PlacementOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.insertion_band >= 0.0,
            "placement.insertion-band must not be negative"
        );
        if self.insertion_band >= 0.5 {
            return Err(Error::InsertionBandTooWide(self.insertion_band).into());
        }
        ensure!(
            self.item_height_percent > 0.0 && self.item_height_percent <= 100.0,
            "placement.item-height-percent must be within (0, 100]"
        );
        Ok(())
    }
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            insertion_band: 0.25,
            item_height_percent: 20.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AnimationOptions {
    /// Entrance tween duration, width 0 to target.
    #[serde(with = "humantime_serde")]
    pub entrance: Duration,
    /// Dwell at highlight scale.
    #[serde(with = "humantime_serde")]
    pub hold: Duration,
    /// Settle tween duration, highlight back to neutral.
    #[serde(with = "humantime_serde")]
    pub exit: Duration,
    /// Easing curve applied to every tween.
    pub easing: Easing,
    /// Scale factor of the highlighted element.
    pub highlight_scale: f32,
    /// Tick between tween frames.
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
}

impl AnimationOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.highlight_scale >= 1.0,
            "animation.highlight-scale must be at least 1.0"
        );
        ensure!(
            !self.frame_interval.is_zero(),
            "animation.frame-interval must be positive"
        );
        Ok(())
    }
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            entrance: Duration::from_secs(2),
            hold: Duration::from_secs(6),
            exit: Duration::from_secs(2),
            easing: Easing::default(),
            highlight_scale: 1.5,
            frame_interval: Duration::from_millis(16),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RegionOptions {
    /// Extra separation required between reserved regions, in display
    /// units on every side.
    pub buffer_margin: f32,
    /// Pause between reservation attempts while a region is contested.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl RegionOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.buffer_margin >= 0.0,
            "regions.buffer-margin must not be negative"
        );
        ensure!(
            !self.retry_delay.is_zero(),
            "regions.retry-delay must be positive"
        );
        Ok(())
    }
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            buffer_margin: 20.0,
            retry_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    /// Standing filesystem subscription; losing it is fatal.
    #[default]
    Watch,
    /// Periodic re-listing, additions only.
    Poll,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SourceOptions {
    /// Root directory to scan recursively for media.
    pub library_path: PathBuf,
    /// How the gallery announces changes.
    pub mode: SourceMode,
    /// Listing cadence in poll mode.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl SourceOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.poll_interval.is_zero(),
            "source.poll-interval must be positive"
        );
        Ok(())
    }
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            library_path: PathBuf::new(),
            mode: SourceMode::Watch,
            poll_interval: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        Configuration::default().validated().unwrap();
    }

    #[test]
    fn kebab_yaml_overrides_defaults() {
        let cfg: Configuration = serde_yaml::from_str(
            r#"
surface:
  width: 1200.0
  height: 300.0
  lanes: 1
rotation:
  workers: 1
  selection-seed: 7
  fill-pacing: 5ms
animation:
  entrance: 250ms
  hold: 1s
  easing: fast-out-slow-in
  highlight-scale: 1.25
source:
  library-path: /tmp/photos
  mode: poll
  poll-interval: 2s
"#,
        )
        .unwrap();
        let cfg = cfg.validated().unwrap();
        assert_eq!(cfg.surface.lanes, 1);
        assert_eq!(cfg.rotation.selection_seed, Some(7));
        assert_eq!(cfg.rotation.fill_pacing, Duration::from_millis(5));
        assert_eq!(cfg.animation.easing, Easing::FastOutSlowIn);
        assert_eq!(cfg.source.mode, SourceMode::Poll);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.regions.retry_delay, Duration::from_millis(50));
    }

    #[test]
    fn missing_config_file_surfaces_a_typed_io_error() {
        let err = Configuration::from_yaml_file("/nonexistent/wall.yaml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn zero_pacing_intervals_are_rejected() {
        let mut cfg = Configuration::default();
        cfg.rotation.fill_pacing = Duration::ZERO;
        let err = cfg.validated().unwrap_err();
        assert!(err.to_string().contains("rotation.fill-pacing"));

        let mut cfg = Configuration::default();
        cfg.rotation.failure_pause = Duration::ZERO;
        let err = cfg.validated().unwrap_err();
        assert!(err.to_string().contains("rotation.failure-pause"));
    }

    #[test]
    fn wide_insertion_band_is_rejected_not_clamped() {
        let mut cfg = Configuration::default();
        cfg.placement.insertion_band = 0.5;
        let err = cfg.validated().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InsertionBandTooWide(_))
        ));
    }
}
