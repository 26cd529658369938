//! Analyzer adapter
//!
//! The pipeline only knows the [`Analyzer`] trait: raw sample in, derived
//! fields or an error out. [`RuleAnalyzer`] is the threshold-based analyzer
//! the service runs with by default; other analyzers plug in through
//! [`crate::pipeline::IngestionPipeline::new`].

use rigstream_common::{DerivedFields, RawSample};
use serde::Deserialize;
use thiserror::Error;

/// Hydrostatic gradient of one ppg of mud, in psi per foot
const PSI_PER_FOOT_PER_PPG: f64 = 0.052;

/// Analyzer failure
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The analyzer could not evaluate this sample
    #[error("{0}")]
    Rejected(String),

    /// The analyzer produced a value the pipeline cannot persist
    #[error("analyzer produced non-finite {field}")]
    NonFinite { field: &'static str },
}

/// Turns a raw sample into derived fields
///
/// Implementations must be pure with respect to the sample: no I/O the
/// pipeline has to wait on, no state carried between calls. They run on a
/// blocking worker thread under a timeout.
pub trait Analyzer: Send + Sync + 'static {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn analyze(&self, sample: &RawSample) -> Result<DerivedFields, AnalysisError>;
}

/// Thresholds for [`RuleAnalyzer`] (`[analyzer]` section of the config file)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Scale factor of the rate-of-penetration estimate
    pub rop_coefficient: f64,
    /// Torque above which a slow-turning string is considered stuck
    pub max_torque: f64,
    /// Rotary speed below which high torque indicates sticking
    pub min_rpm: f64,
    /// Annular overbalance (psi) above which differential sticking is flagged
    pub max_overbalance: f64,
    /// Flow rate below which cuttings are not transported
    pub min_flow_rate: f64,
    /// Annular pressure below which losses to formation are suspected
    pub min_annular_pressure: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rop_coefficient: 0.5,
            max_torque: 25.0,
            min_rpm: 40.0,
            max_overbalance: 1000.0,
            min_flow_rate: 400.0,
            min_annular_pressure: 500.0,
        }
    }
}

/// Threshold rules over a single sample
#[derive(Debug, Clone, Default)]
pub struct RuleAnalyzer {
    config: AnalyzerConfig,
}

impl RuleAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    fn predicted_rop(&self, sample: &RawSample) -> f64 {
        if sample.mud_density <= 0.0 {
            return 0.0;
        }
        let rpm = sample.rpm.max(0.0);
        self.config.rop_coefficient * sample.wob * rpm.sqrt() / sample.mud_density
    }

    fn overbalance(sample: &RawSample) -> f64 {
        let hydrostatic = sample.mud_density * PSI_PER_FOOT_PER_PPG * sample.bit_depth;
        sample.annular_pressure - hydrostatic
    }
}

impl Analyzer for RuleAnalyzer {
    fn name(&self) -> &'static str {
        "rule"
    }

    fn analyze(&self, sample: &RawSample) -> Result<DerivedFields, AnalysisError> {
        let cfg = &self.config;

        let predicted_rop = self.predicted_rop(sample);
        if !predicted_rop.is_finite() {
            return Err(AnalysisError::NonFinite {
                field: "predicted_rop",
            });
        }

        Ok(DerivedFields {
            predicted_rop,
            mechanical_sticking: sample.torque > cfg.max_torque && sample.rpm < cfg.min_rpm,
            differential_sticking: Self::overbalance(sample) > cfg.max_overbalance,
            hole_cleaning: sample.flow_rate < cfg.min_flow_rate,
            mud_loss: sample.annular_pressure < cfg.min_annular_pressure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> RawSample {
        RawSample {
            bit_depth: 2450.0,
            wob: 18.0,
            rpm: 100.0,
            torque: 9.5,
            flow_rate: 650.0,
            mud_density: 10.0,
            annular_pressure: 1320.0,
        }
    }

    #[test]
    fn test_healthy_sample_raises_nothing() {
        let derived = RuleAnalyzer::default().analyze(&healthy()).unwrap();
        assert!(derived.active_alerts().is_empty());
        // 0.5 * 18 * sqrt(100) / 10
        assert!((derived.predicted_rop - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_mechanical_sticking_needs_torque_and_low_rpm() {
        let analyzer = RuleAnalyzer::default();

        let high_torque = RawSample { torque: 30.0, ..healthy() };
        assert!(!analyzer.analyze(&high_torque).unwrap().mechanical_sticking);

        let stuck = RawSample { torque: 30.0, rpm: 10.0, ..healthy() };
        assert!(analyzer.analyze(&stuck).unwrap().mechanical_sticking);
    }

    #[test]
    fn test_differential_sticking_on_overbalance() {
        // hydrostatic = 10 * 0.052 * 2450 = 1274 psi
        let overbalanced = RawSample { annular_pressure: 2400.0, ..healthy() };
        let derived = RuleAnalyzer::default().analyze(&overbalanced).unwrap();
        assert!(derived.differential_sticking);
    }

    #[test]
    fn test_hole_cleaning_and_mud_loss() {
        let sample = RawSample {
            flow_rate: 150.0,
            annular_pressure: 300.0,
            ..healthy()
        };
        let derived = RuleAnalyzer::default().analyze(&sample).unwrap();
        assert!(derived.hole_cleaning);
        assert!(derived.mud_loss);
        assert!(!derived.mechanical_sticking);
    }

    #[test]
    fn test_non_positive_density_gives_zero_rop() {
        let sample = RawSample { mud_density: 0.0, ..healthy() };
        let derived = RuleAnalyzer::default().analyze(&sample).unwrap();
        assert_eq!(derived.predicted_rop, 0.0);
    }

    #[test]
    fn test_overflowing_estimate_is_rejected() {
        let sample = RawSample { wob: f64::MAX, mud_density: 1e-300, ..healthy() };
        let result = RuleAnalyzer::default().analyze(&sample);
        assert!(matches!(
            result,
            Err(AnalysisError::NonFinite { field: "predicted_rop" })
        ));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let analyzer = RuleAnalyzer::new(AnalyzerConfig {
            min_flow_rate: 700.0,
            ..Default::default()
        });
        assert!(analyzer.analyze(&healthy()).unwrap().hole_cleaning);
    }
}
