//! Scoring policy: component weights and thresholds.

use crate::report::{Component, QualityTier};
use serde::{Deserialize, Serialize};

/// Lowest overall score rated [`QualityTier::Excellent`].
pub const EXCELLENT_THRESHOLD: f64 = 85.0;
/// Lowest overall score rated [`QualityTier::Good`].
pub const GOOD_THRESHOLD: f64 = 70.0;
/// Lowest overall score rated [`QualityTier::Moderate`].
pub const MODERATE_THRESHOLD: f64 = 50.0;

/// Ratio below which a partial shortfall is reported as major.
pub const DEFAULT_MAJOR_THRESHOLD: f64 = 0.8;

/// Error in a scoring policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("weight for {component} must be a finite, non-negative number, got {value}")]
    InvalidWeight { component: Component, value: f64 },
    #[error("component weights sum to zero")]
    ZeroWeights,
    #[error("major_threshold must be within 0..=1, got {0}")]
    InvalidThreshold(f64),
    #[error("tier thresholds must descend (excellent > good > moderate)")]
    TierOrder,
    #[error("invalid policy: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Relative weight of each component in the overall score.
///
/// Weights need not sum to one; the overall score divides by their total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub metadata: f64,
    pub structure: f64,
    pub mathematics: f64,
    pub references: f64,
    pub tables_figures: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            metadata: 0.25,
            structure: 0.15,
            mathematics: 0.20,
            references: 0.20,
            tables_figures: 0.20,
        }
    }
}

impl Weights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Metadata => self.metadata,
            Component::Structure => self.structure,
            Component::Mathematics => self.mathematics,
            Component::References => self.references,
            Component::TablesFigures => self.tables_figures,
        }
    }

    pub fn total(&self) -> f64 {
        Component::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Score boundaries of the quality tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub excellent: f64,
    pub good: f64,
    pub moderate: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            excellent: EXCELLENT_THRESHOLD,
            good: GOOD_THRESHOLD,
            moderate: MODERATE_THRESHOLD,
        }
    }
}

impl TierThresholds {
    pub fn tier(&self, overall: f64) -> QualityTier {
        if overall >= self.excellent {
            QualityTier::Excellent
        } else if overall >= self.good {
            QualityTier::Good
        } else if overall >= self.moderate {
            QualityTier::Moderate
        } else {
            QualityTier::Poor
        }
    }
}

/// Tier of an overall score under the default thresholds.
pub fn tier_for(overall: f64) -> QualityTier {
    TierThresholds::default().tier(overall)
}

/// How source and target documents are compared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub weights: Weights,
    /// Facets whose ratio falls below this are major issues, above it minor.
    pub major_threshold: f64,
    pub tiers: TierThresholds,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            major_threshold: DEFAULT_MAJOR_THRESHOLD,
            tiers: TierThresholds::default(),
        }
    }
}

impl ScoringPolicy {
    /// Parse a policy from TOML; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyError> {
        let policy: Self = toml::from_str(s)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for component in Component::ALL {
            let value = self.weights.get(component);
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::InvalidWeight { component, value });
            }
        }
        if self.weights.total() <= 0.0 {
            return Err(PolicyError::ZeroWeights);
        }
        if !(0.0..=1.0).contains(&self.major_threshold) {
            return Err(PolicyError::InvalidThreshold(self.major_threshold));
        }
        let tiers = &self.tiers;
        if !(tiers.excellent > tiers.good && tiers.good > tiers.moderate) {
            return Err(PolicyError::TierOrder);
        }
        Ok(())
    }
}
