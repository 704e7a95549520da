//! Step-wise extrapolation over a fixed trailing window
//!
//! Each step classifies the most recent `W` values (where `W` is the
//! length of the seed series), then extends the series either along the
//! window's average slope or with the window's mean. The new value is
//! rounded to two decimals and pushed back into the window before the
//! next step is taken.

use crate::series::{differences, mean, round2};
use crate::trend::{classify, Trend};
use crate::{MathError, Result};
use std::collections::VecDeque;

/// Iterative forecaster over a sliding window
#[derive(Debug, Clone)]
pub struct Extrapolator {
    window_len: usize,
    window: VecDeque<f64>,
}

impl Extrapolator {
    /// Create an extrapolator seeded with a historical series.
    ///
    /// The window keeps the seed's length for every subsequent step.
    pub fn new(seed: &[f64]) -> Result<Self> {
        if seed.len() < 2 {
            return Err(MathError::InsufficientData(format!(
                "Need at least 2 values to extrapolate, got {}",
                seed.len()
            )));
        }
        if let Some(position) = seed.iter().position(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(format!(
                "Seed value at position {} is not finite",
                position
            )));
        }

        Ok(Self {
            window_len: seed.len(),
            window: seed.iter().copied().collect(),
        })
    }

    /// Size of the trailing window
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// The values the next step will be computed from
    pub fn window(&self) -> Vec<f64> {
        self.window.iter().copied().collect()
    }

    /// Classification of the current window
    pub fn trend(&self) -> Trend {
        classify(&self.window())
    }

    /// Produce the next value and slide the window forward.
    pub fn next_value(&mut self) -> Result<f64> {
        let window = self.window();
        let trend = classify(&window);

        let raw = match trend {
            Trend::Monotonic => {
                let slope = mean(&differences(&window)).ok_or_else(|| {
                    MathError::CalculationError("Window has no differences".to_string())
                })?;
                window[window.len() - 1] + slope
            }
            Trend::Fluctuating => mean(&window).ok_or_else(|| {
                MathError::CalculationError("Window is empty".to_string())
            })?,
        };

        let next = round2(raw);
        if !next.is_finite() {
            return Err(MathError::CalculationError(format!(
                "Extrapolated value is not finite (window {:?})",
                window
            )));
        }

        self.window.push_back(next);
        while self.window.len() > self.window_len {
            self.window.pop_front();
        }

        Ok(next)
    }

    /// Produce `steps` values in order.
    pub fn project(&mut self, steps: usize) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(steps);
        for _ in 0..steps {
            values.push(self.next_value()?);
        }
        Ok(values)
    }
}

/// Extrapolate `steps` values from `seed`.
///
/// Returns an empty vector when the seed has fewer than two values or
/// `steps` is zero. Fails only when a value cannot be represented.
pub fn extrapolate(seed: &[f64], steps: usize) -> Result<Vec<f64>> {
    if seed.len() < 2 || steps == 0 {
        return Ok(Vec::new());
    }
    Extrapolator::new(seed)?.project(steps)
}
