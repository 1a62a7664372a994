//! Threshold sweeps: run one config over a grid of policy thresholds.

use rayon::prelude::*;

use crate::config::SimulationConfig;
use crate::data_loader::LoadedData;
use crate::runner::{build_models, run_with_data, RunError, SimulationReport};
use probsim_core::policy::PolicyConfig;

/// Cartesian grid over the three policy thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdGrid {
    pub up_thresholds: Vec<f64>,
    pub down_thresholds: Vec<f64>,
    pub strong_thresholds: Vec<f64>,
}

impl Default for ThresholdGrid {
    /// Up/down: 0.55, 0.6, 0.65. Strong: 0.75, 0.8, 0.85.
    fn default() -> Self {
        Self {
            up_thresholds: vec![0.55, 0.6, 0.65],
            down_thresholds: vec![0.55, 0.6, 0.65],
            strong_thresholds: vec![0.75, 0.8, 0.85],
        }
    }
}

impl ThresholdGrid {
    /// Number of grid points, before invalid combinations are dropped.
    pub fn size(&self) -> usize {
        self.up_thresholds.len() * self.down_thresholds.len() * self.strong_thresholds.len()
    }

    /// Every valid policy in the grid. Sizing fractions come from `base`.
    pub fn policies(&self, base: &PolicyConfig) -> Vec<PolicyConfig> {
        let mut policies = Vec::new();
        for &up in &self.up_thresholds {
            for &down in &self.down_thresholds {
                for &strong in &self.strong_thresholds {
                    let policy = PolicyConfig {
                        up_threshold: up,
                        down_threshold: down,
                        strong_threshold: strong,
                        ..*base
                    };
                    // Skip invalid combinations (strong below a base band)
                    if policy.validate().is_ok() {
                        policies.push(policy);
                    }
                }
            }
        }
        policies
    }
}

/// Sweep executor. Runs in parallel unless told otherwise.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run `base` once per grid point. Data and models are shared; each run
    /// builds its own engine and portfolio.
    pub fn sweep(
        &self,
        grid: &ThresholdGrid,
        base: &SimulationConfig,
        data: &LoadedData,
    ) -> Result<SweepResults, RunError> {
        let models = build_models(base)?;
        let configs: Vec<SimulationConfig> = grid
            .policies(&base.policy)
            .into_iter()
            .map(|policy| SimulationConfig {
                policy,
                ..base.clone()
            })
            .collect();

        tracing::info!(runs = configs.len(), parallel = self.parallel, "sweep started");

        let reports = if self.parallel {
            configs
                .par_iter()
                .map(|config| run_with_data(config, data, &models))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|config| run_with_data(config, data, &models))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults::new(reports))
    }
}

/// Sweep reports, best final net value first.
#[derive(Debug)]
pub struct SweepResults {
    reports: Vec<SimulationReport>,
}

impl SweepResults {
    fn new(mut reports: Vec<SimulationReport>) -> Self {
        reports.sort_by(|a, b| {
            b.metrics
                .final_net_value
                .partial_cmp(&a.metrics.final_net_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { reports }
    }

    pub fn all(&self) -> &[SimulationReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn best(&self) -> Option<&SimulationReport> {
        self.reports.first()
    }

    pub fn top_n(&self, n: usize) -> &[SimulationReport] {
        &self.reports[..n.min(self.reports.len())]
    }
}
