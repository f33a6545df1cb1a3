//! Podium scoring.
//!
//! Each predicted position earns [`EXACT_POINTS`] when it matches the result
//! at the same position, [`PRESENT_POINTS`] when the competitor finished on
//! the podium in another position, and nothing otherwise. A prediction is
//! therefore worth between 0 and [`MAX_POINTS`].

use super::Podium;

/// Points for a competitor in the exact position.
pub const EXACT_POINTS: u8 = 3;
/// Points for a competitor on the podium in another position.
pub const PRESENT_POINTS: u8 = 1;
/// Highest possible score for one prediction.
pub const MAX_POINTS: u8 = 9;

/// Scores `prediction` against `result`.
#[must_use]
pub fn score(prediction: &Podium, result: &Podium) -> u8 {
    prediction
        .picks()
        .iter()
        .zip(result.picks().iter())
        .map(|(predicted, actual)| {
            if predicted == actual {
                EXACT_POINTS
            } else if result.contains(predicted) {
                PRESENT_POINTS
            } else {
                0
            }
        })
        .sum()
}
