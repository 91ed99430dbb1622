use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-item quality scores, in the row order of the comparison matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub quality_scores: Vec<f64>,
    /// Standard error of each score, when the estimator provides one.
    pub quality_scores_std: Option<Vec<f64>>,
}

impl QualityScores {
    pub(crate) fn new(scores: Array1<f64>, std: Option<Array1<f64>>) -> Self {
        debug_assert!(std.as_ref().is_none_or(|s| s.len() == scores.len()));
        Self {
            quality_scores: scores.to_vec(),
            quality_scores_std: std.map(|s| s.to_vec()),
        }
    }

    pub fn len(&self) -> usize {
        self.quality_scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quality_scores.is_empty()
    }
}

/// The scale each estimator reports its scores on. The Bradley-Terry variants differ:
/// one reports log-skills relative to the last item, the other log-probabilities that
/// exponentiate to a distribution over items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScoreScale {
    /// `gamma_i = ln(pi_i / pi_n)`; the last item scores exactly 0.
    LogSkillPinnedLast,
    /// `ln(p_i)` with `sum(p) = 1`.
    LogProbability,
    /// Mean of a unit-variance latent normal performance; shift-invariant, fitted from 0.
    LatentNormalMean,
}

impl ScoreScale {
    pub fn describe(self) -> &'static str {
        match self {
            Self::LogSkillPinnedLast => "log-skill relative to the last item",
            Self::LogProbability => "log of the normalized win probability",
            Self::LatentNormalMean => "latent normal mean",
        }
    }
}

impl fmt::Display for ScoreScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
