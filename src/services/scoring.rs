use crate::models::{AudioFeatures, CatalogTrack, ScoredTrack};

/// Weight of similarity to the listener's own taste
pub const USER_WEIGHT: f64 = 0.6;
/// Weight of similarity to the requested mood
pub const MOOD_WEIGHT: f64 = 0.4;

/// A point in (energy, valence, danceability) space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioVector(pub [f64; 3]);

impl AudioVector {
    pub const NEUTRAL: AudioVector = AudioVector([0.5, 0.5, 0.5]);

    fn dot(&self, other: &AudioVector) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl From<&AudioFeatures> for AudioVector {
    fn from(f: &AudioFeatures) -> Self {
        AudioVector([f.energy, f.valence, f.danceability])
    }
}

/// Target point for a mood label. Labels are expected lower-case; unknown ones map to neutral.
pub fn mood_target(mood: &str) -> AudioVector {
    match mood {
        "happy" => AudioVector([0.8, 0.9, 0.8]),
        "sad" => AudioVector([0.2, 0.3, 0.3]),
        "energetic" => AudioVector([0.9, 0.6, 0.9]),
        "chill" => AudioVector([0.4, 0.5, 0.4]),
        "focus" => AudioVector([0.6, 0.4, 0.5]),
        "party" => AudioVector([0.9, 0.7, 0.95]),
        _ => AudioVector::NEUTRAL,
    }
}

/// Cosine of the angle between two vectors; 0.0 when either has zero length
pub fn cosine_similarity(a: &AudioVector, b: &AudioVector) -> f64 {
    let norm_a = a.norm();
    let norm_b = b.norm();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        a.dot(b) / (norm_a * norm_b)
    }
}

/// Element-wise mean of the given feature vectors, `None` for an empty slice
pub fn mean_vector(features: &[AudioFeatures]) -> Option<AudioVector> {
    if features.is_empty() {
        return None;
    }

    let mut sum = [0.0; 3];
    for f in features {
        let v = AudioVector::from(f);
        for (acc, x) in sum.iter_mut().zip(v.0) {
            *acc += x;
        }
    }

    let n = features.len() as f64;
    Some(AudioVector(sum.map(|s| s / n)))
}

/// Rounds to three decimals based on the exact binary value, so 0.0045 (stored just below
/// the half) becomes 0.004 rather than 0.005.
fn round3(x: f64) -> f64 {
    format!("{:.3}", x).parse().unwrap_or(x)
}

/// Blended similarity of a candidate to the user's taste and the mood target
pub fn score(user: &AudioVector, target: &AudioVector, candidate: &AudioVector) -> f64 {
    let blended = USER_WEIGHT * cosine_similarity(user, candidate)
        + MOOD_WEIGHT * cosine_similarity(target, candidate);
    round3(blended)
}

/// Scores every candidate that has features; featureless candidates are skipped, not zeroed.
///
/// `features` is positionally aligned with `candidates`.
pub fn score_candidates(
    candidates: Vec<CatalogTrack>,
    features: &[Option<AudioFeatures>],
    user: &AudioVector,
    target: &AudioVector,
) -> Vec<ScoredTrack> {
    candidates
        .into_iter()
        .zip(features.iter())
        .filter_map(|(track, f)| {
            let vector = AudioVector::from(f.as_ref()?);
            Some(ScoredTrack::new(track, score(user, target, &vector)))
        })
        .collect()
}

/// Orders by score descending and keeps the first `n`. Equal scores keep their input order.
pub fn rank(mut scored: Vec<ScoredTrack>, n: usize) -> Vec<ScoredTrack> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(n);
    scored
}
