//! Easing curves for entrance/exit animation timelines.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::{Instant, sleep};

/// Easing curve identifier, selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
    FastOutSlowIn,
}

impl Easing {
    /// Map a linear fraction in `[0, 1]` to eased progress.
    #[must_use]
    pub fn apply(self, fraction: f32) -> f32 {
        match self {
            Self::Linear => fraction.clamp(0.0, 1.0),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, fraction),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, fraction),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, fraction),
            Self::FastOutSlowIn => cubic_bezier(0.4, 0.0, 0.2, 1.0, fraction),
        }
    }
}

/// Evaluate a CSS-style cubic bezier curve at the given x fraction.
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, fraction: f32) -> f32 {
    if fraction <= 0.0 {
        return 0.0;
    }
    if fraction >= 1.0 {
        return 1.0;
    }

    let cx = 3.0 * x1;
    let bx = 3.0 * (x2 - x1) - cx;
    let ax = 1.0 - cx - bx;

    let cy = 3.0 * y1;
    let by = 3.0 * (y2 - y1) - cy;
    let ay = 1.0 - cy - by;

    let sample = |a: f32, b: f32, c: f32, t: f32| ((a * t + b) * t + c) * t;
    let derivative = |a: f32, b: f32, c: f32, t: f32| (3.0 * a * t + 2.0 * b) * t + c;

    // Solve for the parametric t matching the x fraction: Newton-Raphson
    // first, bisection when the derivative collapses.
    let mut t = fraction;
    let mut converged = false;
    for _ in 0..8 {
        let x = sample(ax, bx, cx, t) - fraction;
        if x.abs() < 1e-6 {
            converged = true;
            break;
        }
        let dx = derivative(ax, bx, cx, t);
        if dx.abs() < 1e-6 {
            break;
        }
        t = (t - x / dx).clamp(0.0, 1.0);
    }

    if !converged {
        let mut lo = 0.0_f32;
        let mut hi = 1.0_f32;
        t = fraction;
        for _ in 0..24 {
            let x = sample(ax, bx, cx, t);
            if (x - fraction).abs() < 1e-6 {
                break;
            }
            if x < fraction {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) / 2.0;
        }
    }

    sample(ay, by, cy, t).clamp(0.0, 1.0)
}

/// Drive `apply` from 0.0 to 1.0 over `duration`, stepping once per
/// `frame_interval`.
///
/// The last call always receives exactly `1.0`, so the end state is
/// committed even when the duration is not a whole number of frames.
pub async fn tween<F>(duration: Duration, frame_interval: Duration, easing: Easing, mut apply: F)
where
    F: FnMut(f32),
{
    if duration.is_zero() {
        apply(1.0);
        return;
    }
    let frame = frame_interval.max(Duration::from_millis(1));
    let start = Instant::now();
    loop {
        sleep(frame).await;
        let elapsed = start.elapsed();
        if elapsed >= duration {
            break;
        }
        let fraction = elapsed.as_secs_f32() / duration.as_secs_f32();
        apply(easing.apply(fraction));
    }
    apply(1.0);
}
