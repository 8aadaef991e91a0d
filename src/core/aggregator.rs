// src/core/aggregator.rs

//! Weighted aggregation of parsed probe scores.
//!
//! Four named weight profiles turn the per-probe scores into summary scores.
//! A fifth, adversarial score is derived from the `normal` aggregate.

use crate::core::error::{Result, ScanError};
use crate::core::models::{AggregateScores, MAX_SCORE, MIN_SCORE};
use rand::Rng;
use rand::seq::SliceRandom;
use strum::{Display, EnumIter, EnumString};

// --- Weight Vectors ---

// Positional: entry `i` weighs the probe registered at index `i`.
const NORMAL_WEIGHTS: [f64; 22] = [
    8.0, 10.0, 5.0, 5.0, 9.0, 9.0, 7.0, 5.0, 3.0, 4.0, 7.0, 5.0, 8.0, 10.0, 20.0, 7.0, 7.0, 7.0,
    5.0, 7.0, 5.0, 7.0,
];
const SECURITY_WEIGHTS: [f64; 22] = [
    10.0, 10.0, 2.0, 2.0, 10.0, 10.0, 9.0, 2.0, 2.0, 5.0, 9.0, 7.0, 10.0, 10.0, 10.0, 3.0, 3.0,
    3.0, 2.0, 8.0, 2.0, 5.0,
];
const PRIVACY_WEIGHTS: [f64; 22] = [
    0.0, 0.0, 10.0, 10.0, 0.0, 0.0, 0.0, 10.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 10.0,
    10.0, 10.0, 10.0, 10.0, 10.0,
];

// Returned when no probe line carried a parsable score.
pub const NO_SCORE: u8 = 0;

// Normal aggregates that make the adversarial score a coin toss.
const CONTESTED: [u8; 3] = [4, 5, 6];

// --- Profiles ---

/// The predefined weighting philosophies, parsed case-insensitively by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WeightProfileName {
    #[default]
    Normal,
    Privacy,
    Security,
    Random,
}

/// Resolves a user-supplied profile name.
///
/// Unknown names are a client error. Selecting a profile has no side effect;
/// callers carry the returned name along with their scan request.
pub fn select_profile(name: &str) -> Result<WeightProfileName> {
    name.trim()
        .parse::<WeightProfileName>()
        .map_err(|_| ScanError::UnknownProfile(name.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightProfile {
    pub name: WeightProfileName,
    pub weights: Vec<f64>,
}

impl WeightProfile {
    pub fn new(name: WeightProfileName, weights: Vec<f64>) -> Self {
        Self { name, weights }
    }
}

/// The full set of profiles used for one process.
///
/// The `random` vector is drawn once at construction, so every scan served by
/// the same set sees the same random weights.
#[derive(Debug, Clone)]
pub struct WeightProfiles {
    normal: WeightProfile,
    privacy: WeightProfile,
    security: WeightProfile,
    random: WeightProfile,
}

impl WeightProfiles {
    pub fn predefined<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let random = (0..NORMAL_WEIGHTS.len())
            .map(|_| rng.gen_range(1..=5) as f64)
            .collect();
        Self {
            normal: WeightProfile::new(WeightProfileName::Normal, NORMAL_WEIGHTS.to_vec()),
            privacy: WeightProfile::new(WeightProfileName::Privacy, PRIVACY_WEIGHTS.to_vec()),
            security: WeightProfile::new(WeightProfileName::Security, SECURITY_WEIGHTS.to_vec()),
            random: WeightProfile::new(WeightProfileName::Random, random),
        }
    }

    /// Every profile weighs every probe equally. Useful for registries of a
    /// different size than the built-in one.
    pub fn uniform(probe_count: usize) -> Self {
        let profile = |name| WeightProfile::new(name, vec![1.0; probe_count]);
        Self {
            normal: profile(WeightProfileName::Normal),
            privacy: profile(WeightProfileName::Privacy),
            security: profile(WeightProfileName::Security),
            random: profile(WeightProfileName::Random),
        }
    }

    pub fn get(&self, name: WeightProfileName) -> &WeightProfile {
        match name {
            WeightProfileName::Normal => &self.normal,
            WeightProfileName::Privacy => &self.privacy,
            WeightProfileName::Security => &self.security,
            WeightProfileName::Random => &self.random,
        }
    }
}

impl AggregateScores {
    /// The aggregate computed with the given profile.
    pub fn for_profile(&self, name: WeightProfileName) -> u8 {
        match name {
            WeightProfileName::Normal => self.normal,
            WeightProfileName::Privacy => self.privacy,
            WeightProfileName::Security => self.security,
            WeightProfileName::Random => self.random,
        }
    }
}

// --- Aggregation ---

/// Weighted, rounded and clamped mean of the parsed scores.
///
/// # Arguments
/// * `parsed` - One entry per probe, in registration order. `None` marks a
///   line without a score token; it is dropped together with its weight.
/// * `profile` - The weights to apply. `None` weighs every probe with 1.
///
/// # Returns
/// A score in [1,10], or `NO_SCORE` when nothing parsed or every surviving
/// probe carries zero weight. Fails when the weight vector and the score list
/// differ in length.
pub fn aggregate(parsed: &[Option<u8>], profile: Option<&WeightProfile>) -> Result<u8> {
    let uniform;
    let weights: &[f64] = match profile {
        Some(profile) => {
            if profile.weights.len() != parsed.len() {
                return Err(ScanError::WeightMismatch {
                    profile: profile.name.to_string(),
                    weights: profile.weights.len(),
                    scores: parsed.len(),
                });
            }
            &profile.weights
        }
        None => {
            uniform = vec![1.0; parsed.len()];
            &uniform
        }
    };

    let (weighted_sum, total_weight) = parsed
        .iter()
        .zip(weights)
        .filter_map(|(score, weight)| score.map(|score| (score as f64, *weight)))
        .fold((0.0, 0.0), |(sum, total), (score, weight)| {
            (sum + score * weight, total + weight)
        });

    if total_weight <= 0.0 {
        return Ok(NO_SCORE);
    }

    let mean = (weighted_sum / total_weight).round_ties_even();
    Ok(mean.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8)
}

/// Anti-correlated transform of the `normal` aggregate.
///
/// A contested score of 4, 5 or 6 flips a coin between 10 and 0; anything
/// else mirrors to `11 - normal`. Neither branch is clamped, so 0 and 11 are
/// both possible outputs.
pub fn adversarial<R: Rng + ?Sized>(normal: u8, rng: &mut R) -> u8 {
    if CONTESTED.contains(&normal) {
        [MAX_SCORE, 0].choose(rng).copied().unwrap_or(MAX_SCORE)
    } else {
        11u8.saturating_sub(normal)
    }
}

/// Computes all five summary scores for one scan.
pub fn score_all<R: Rng + ?Sized>(
    parsed: &[Option<u8>],
    profiles: &WeightProfiles,
    rng: &mut R,
) -> Result<AggregateScores> {
    let normal = aggregate(parsed, Some(profiles.get(WeightProfileName::Normal)))?;
    let privacy = aggregate(parsed, Some(profiles.get(WeightProfileName::Privacy)))?;
    let security = aggregate(parsed, Some(profiles.get(WeightProfileName::Security)))?;
    let random = aggregate(parsed, Some(profiles.get(WeightProfileName::Random)))?;

    Ok(AggregateScores {
        normal,
        privacy,
        security,
        random,
        adversarial: adversarial(normal, rng),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use strum::IntoEnumIterator;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn profile_names_parse_case_insensitively() {
        assert_eq!(select_profile("privacy").unwrap(), WeightProfileName::Privacy);
        assert_eq!(select_profile("SECURITY").unwrap(), WeightProfileName::Security);
        assert_eq!(select_profile(" Random ").unwrap(), WeightProfileName::Random);
        for name in WeightProfileName::iter() {
            assert_eq!(select_profile(&name.to_string()).unwrap(), name);
        }
    }

    #[test]
    fn unknown_profile_is_a_client_error() {
        let err = select_profile("paranoid").unwrap_err();
        assert!(matches!(err, ScanError::UnknownProfile(ref name) if name == "paranoid"));
        assert!(err.is_client_error());
    }

    #[test]
    fn uniform_weights_give_the_rounded_mean() {
        let parsed = [Some(2), Some(3), Some(8), Some(9)];
        assert_eq!(aggregate(&parsed, None).unwrap(), 6); // 5.5 -> 6
        let parsed = [Some(1), Some(2), Some(3), Some(4)];
        assert_eq!(aggregate(&parsed, None).unwrap(), 2); // 2.5 -> 2
        assert_eq!(aggregate(&[Some(7)], None).unwrap(), 7);
    }

    #[test]
    fn weights_shift_the_mean() {
        let profile = WeightProfile::new(WeightProfileName::Security, vec![3.0, 1.0]);
        assert_eq!(aggregate(&[Some(10), Some(2)], Some(&profile)).unwrap(), 8);
    }

    #[test]
    fn length_mismatch_is_fatal() {
        let profile = WeightProfile::new(WeightProfileName::Normal, vec![1.0, 1.0, 1.0]);
        let err = aggregate(&[Some(5), Some(5)], Some(&profile)).unwrap_err();
        assert!(matches!(
            err,
            ScanError::WeightMismatch { weights: 3, scores: 2, .. }
        ));
        assert!(!err.is_client_error());
    }

    #[test]
    fn parse_misses_are_dropped_with_their_weight() {
        let profile = WeightProfile::new(WeightProfileName::Normal, vec![100.0, 1.0, 1.0]);
        assert_eq!(aggregate(&[None, Some(4), Some(6)], Some(&profile)).unwrap(), 5);
    }

    #[test]
    fn nothing_parsed_yields_the_sentinel() {
        assert_eq!(aggregate(&[None, None], None).unwrap(), NO_SCORE);
        assert_eq!(aggregate(&[], None).unwrap(), NO_SCORE);
    }

    #[test]
    fn only_zero_weighted_survivors_yield_the_sentinel() {
        let profile = WeightProfile::new(WeightProfileName::Privacy, vec![0.0, 10.0]);
        assert_eq!(aggregate(&[Some(9), None], Some(&profile)).unwrap(), NO_SCORE);
    }

    #[test]
    fn adversarial_mirrors_uncontested_scores() {
        let mut rng = rng();
        for (normal, expected) in [(1, 10), (2, 9), (3, 8), (7, 4), (8, 3), (9, 2), (10, 1)] {
            assert_eq!(adversarial(normal, &mut rng), expected);
        }
    }

    #[test]
    fn adversarial_of_the_sentinel_is_eleven() {
        assert_eq!(adversarial(NO_SCORE, &mut rng()), 11);
    }

    #[test]
    fn adversarial_flips_a_coin_for_contested_scores() {
        let mut rng = rng();
        let mut seen = Vec::new();
        for _ in 0..64 {
            for normal in CONTESTED {
                let value = adversarial(normal, &mut rng);
                assert!(value == 0 || value == 10, "got {value}");
                seen.push(value);
            }
        }
        assert!(seen.contains(&0) && seen.contains(&10));
    }

    #[test]
    fn random_profile_draws_between_one_and_five() {
        let profiles = WeightProfiles::predefined(&mut rng());
        let random = profiles.get(WeightProfileName::Random);
        assert_eq!(random.weights.len(), 22);
        assert!(random.weights.iter().all(|w| (1.0..=5.0).contains(w)));
    }

    #[test]
    fn predefined_vectors_match_the_probe_count() {
        let profiles = WeightProfiles::predefined(&mut rng());
        for name in WeightProfileName::iter() {
            assert_eq!(profiles.get(name).weights.len(), 22, "{name}");
        }
    }

    #[test]
    fn perfect_scores_aggregate_to_ten_everywhere() {
        let parsed = vec![Some(10); 22];
        let scores = score_all(&parsed, &WeightProfiles::predefined(&mut rng()), &mut rng()).unwrap();
        assert_eq!(
            scores,
            AggregateScores { normal: 10, privacy: 10, security: 10, random: 10, adversarial: 1 }
        );
        assert_eq!(scores.for_profile(WeightProfileName::Privacy), 10);
    }
}
