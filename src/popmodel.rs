//! Time-varying population size.
//!
//! A simulation is parameterised by an ordered sequence of epochs, each
//! either holding the effective population size constant or shrinking/
//! growing it exponentially from the epoch's start. The simulator integrates
//! the coalescence hazard analytically within an epoch rather than stepping
//! through time, and redraws fresh waiting times whenever an epoch boundary
//! is crossed before either candidate event would have fired.

use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PopulationModelKind {
    /// Effective size held at `param` from `start_time` onward.
    Constant,
    /// Effective size `param * exp(-alpha * (t - start_time))`, `alpha` given
    /// separately as the model's growth rate.
    Exponential { alpha: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationModel {
    pub start_time: f64,
    pub kind: PopulationModelKind,
    /// Size at `start_time` (for `Constant`, the size throughout the epoch).
    pub param: f64,
}

impl PopulationModel {
    pub fn constant(start_time: f64, size: f64) -> Self {
        Self {
            start_time,
            kind: PopulationModelKind::Constant,
            param: size,
        }
    }

    pub fn exponential(start_time: f64, size: f64, alpha: f64) -> Self {
        Self {
            start_time,
            kind: PopulationModelKind::Exponential { alpha },
            param: size,
        }
    }

    /// Effective size at `t`, which must be `>= start_time`.
    pub fn size_at(&self, t: f64) -> f64 {
        match self.kind {
            PopulationModelKind::Constant => self.param,
            PopulationModelKind::Exponential { alpha } => {
                self.param * (-alpha * (t - self.start_time)).exp()
            }
        }
    }

    /// Given elapsed time `s` since `start_time` and a standard (rate-1)
    /// exponential variate `e` representing the accumulated coalescent-scaled
    /// hazard `k*(k-1)/2` needs to reach, solve for the additional elapsed
    /// real time `dt` such that
    /// `integral_{s}^{s+dt} rate(s') / size(s') ds' == e`
    /// where `rate` is `k*(k-1)`.
    fn solve_hazard(&self, s: f64, rate: f64, e: f64) -> f64 {
        if rate <= 0.0 {
            return f64::INFINITY;
        }
        match self.kind {
            PopulationModelKind::Constant => {
                // integral of rate/(2*N) dt = e  =>  dt = 2*N*e/rate
                2.0 * self.param * e / rate
            }
            PopulationModelKind::Exponential { alpha } => {
                if alpha == 0.0 {
                    return 2.0 * self.param * e / rate;
                }
                let n0 = self.param * (-alpha * s).exp();
                let arg = 1.0 + e * 2.0 * n0 * alpha / rate;
                (arg.ln()) / alpha
            }
        }
    }
}

/// Validates that `models` is sorted by `start_time` and that every model is
/// well-formed (positive size, finite growth rate).
pub fn validate_models(models: &[PopulationModel]) -> Result<()> {
    if models.is_empty() {
        return Err(SimError::BadPopModel("at least one model is required".into()));
    }
    let mut prev = f64::NEG_INFINITY;
    for m in models {
        if m.param <= 0.0 {
            return Err(SimError::BadPopModel(format!(
                "population size must be positive, got {}",
                m.param
            )));
        }
        if m.start_time < prev {
            return Err(SimError::UnsortedPopModels);
        }
        prev = m.start_time;
    }
    Ok(())
}

/// The result of picking the next event under the active demographic model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextEvent {
    Coalescence(f64),
    Recombination(f64),
    /// The epoch ended before either candidate event fired; advance `t` to
    /// `boundary` and redraw against the next model.
    EpochBoundary(f64),
}

/// Determine which event happens next, starting from time `t` under
/// `models[model_index]`, given the instantaneous coalescence rate
/// `k*(k-1)` and recombination rate `rho*L`.
///
/// `e_c` and `e_r` are fresh standard-exponential draws supplied by the
/// caller (so the caller controls exactly when a redraw happens, per the
/// "no event fires at an epoch boundary" rule).
#[allow(clippy::too_many_arguments)]
pub fn next_event(
    models: &[PopulationModel],
    model_index: usize,
    t: f64,
    coalescence_rate: f64,
    recombination_rate: f64,
    e_c: f64,
    e_r: f64,
) -> NextEvent {
    let model = &models[model_index];
    let s = t - model.start_time;
    let dt_c = model.solve_hazard(s, coalescence_rate, e_c);
    let dt_r = if recombination_rate > 0.0 {
        e_r / recombination_rate
    } else {
        f64::INFINITY
    };
    let next_boundary = models
        .get(model_index + 1)
        .map(|m| m.start_time - t)
        .unwrap_or(f64::INFINITY);

    let dt = dt_c.min(dt_r);
    if dt >= next_boundary {
        return NextEvent::EpochBoundary(t + next_boundary);
    }
    if dt_c <= dt_r {
        NextEvent::Coalescence(t + dt_c)
    } else {
        NextEvent::Recombination(t + dt_r)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_unsorted_models() {
        let models = vec![
            PopulationModel::constant(1.0, 1.0),
            PopulationModel::constant(0.0, 1.0),
        ];
        assert_eq!(validate_models(&models), Err(SimError::UnsortedPopModels));
    }

    #[test]
    fn rejects_nonpositive_size() {
        let models = vec![PopulationModel::constant(0.0, 0.0)];
        assert!(validate_models(&models).is_err());
    }

    #[test]
    fn constant_model_inverts_exactly() {
        let model = PopulationModel::constant(0.0, 5.0);
        let rate = 6.0;
        let e = 1.3;
        let dt = model.solve_hazard(0.0, rate, e);
        // integral of rate/(2N) over [0,dt] should equal e again
        let recovered = rate / (2.0 * 5.0) * dt;
        assert!((recovered - e).abs() < 1e-9);
    }

    #[test]
    fn zero_rate_gives_infinite_wait() {
        let model = PopulationModel::constant(0.0, 5.0);
        assert_eq!(model.solve_hazard(0.0, 0.0, 1.0), f64::INFINITY);
    }

    #[test]
    fn epoch_boundary_preempts_event() {
        let models = vec![
            PopulationModel::constant(0.0, 1.0),
            PopulationModel::constant(0.01, 1.0),
        ];
        // Huge e_c forces a very late coalescence event, so the boundary at
        // t=0.01 should preempt it.
        let ev = next_event(&models, 0, 0.0, 2.0, 0.0, 1000.0, 0.0);
        assert_eq!(ev, NextEvent::EpochBoundary(0.01));
    }
}
