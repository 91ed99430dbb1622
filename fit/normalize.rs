use crate::model::FitError;
use ndarray::Array1;

/// Standardizes `scores` in place to zero mean and unit population standard deviation.
///
/// Returns the divisor applied, so parallel standard errors can be rescaled with it.
/// Scores with no spread are centered and left unscaled (divisor 1).
pub fn zscore(scores: &mut Array1<f64>) -> Result<f64, FitError> {
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(FitError::NonFiniteScores);
    }
    let Some(mean) = scores.mean() else {
        return Ok(1.0);
    };
    let spread = scores.std(0.0);

    let divisor = if spread > 0.0 {
        spread
    } else {
        log::warn!("Quality scores have zero spread; z-scoring only centers them.");
        1.0
    };
    scores.mapv_inplace(|s| (s - mean) / divisor);
    Ok(divisor)
}
