//! Classification of a window as monotonic movement or fluctuation

use crate::series::differences;
use serde::{Deserialize, Serialize};

/// Local behaviour of a window of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    /// Differences share one sign and at least one of them is non-zero
    #[serde(rename = "trend")]
    Monotonic,
    /// Anything else, including a flat window
    #[serde(rename = "fluctuating")]
    Fluctuating,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Monotonic => "trend",
            Trend::Fluctuating => "fluctuating",
        }
    }
}

/// Classify an ordered window.
///
/// A window is `Monotonic` when its consecutive differences are all
/// non-negative with at least one positive, or all non-positive with at
/// least one negative. Windows with fewer than two values are
/// `Fluctuating`.
pub fn classify(window: &[f64]) -> Trend {
    let diffs = differences(window);
    if diffs.is_empty() {
        return Trend::Fluctuating;
    }

    let rising = diffs.iter().all(|d| *d >= 0.0) && diffs.iter().any(|d| *d > 0.0);
    let falling = diffs.iter().all(|d| *d <= 0.0) && diffs.iter().any(|d| *d < 0.0);

    if rising || falling {
        Trend::Monotonic
    } else {
        Trend::Fluctuating
    }
}
