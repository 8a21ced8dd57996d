//! Top-1 selection over a probability vector

use snapclass_core::{ClassificationResult, Error, Result};

/// Pick the highest-probability label.
///
/// Ties go to the lowest index: the running maximum only moves on a strictly
/// greater value.
pub fn select<S: AsRef<str>>(labels: &[S], probabilities: &[f32]) -> Result<ClassificationResult> {
    if labels.len() != probabilities.len() {
        return Err(Error::shape_mismatch(format!(
            "{} labels but {} probabilities",
            labels.len(),
            probabilities.len()
        )));
    }
    if probabilities.is_empty() {
        return Err(Error::shape_mismatch("empty probability vector"));
    }

    let mut best = 0;
    for (idx, &p) in probabilities.iter().enumerate().skip(1) {
        if p > probabilities[best] {
            best = idx;
        }
    }

    Ok(ClassificationResult::from_probability(
        labels[best].as_ref(),
        probabilities[best],
    ))
}
