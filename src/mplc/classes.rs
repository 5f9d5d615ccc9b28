//! Seven-class bucketing of probabilities for display.

use serde::Serialize;

use crate::tilemap::Tilemap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProbabilityClass {
    /// Exactly 0
    Never,
    /// (0, 20 %]
    VeryLow,
    /// (20, 40 %]
    Low,
    /// (40, 60 %]
    Medium,
    /// (60, 80 %]
    High,
    /// (80, 100 %)
    VeryHigh,
    /// Exactly 100 %
    Certain,
}

impl ProbabilityClass {
    pub fn all() -> &'static [Self] {
        &[
            Self::Never,
            Self::VeryLow,
            Self::Low,
            Self::Medium,
            Self::High,
            Self::VeryHigh,
            Self::Certain,
        ]
    }

    pub fn from_probability(p: f32) -> Self {
        if p <= 0.0 {
            Self::Never
        } else if p >= 1.0 {
            Self::Certain
        } else if p <= 0.2 {
            Self::VeryLow
        } else if p <= 0.4 {
            Self::Low
        } else if p <= 0.6 {
            Self::Medium
        } else if p <= 0.8 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    /// Class number, 0 to 6.
    pub fn index(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Never => "0%",
            Self::VeryLow => ">0-20%",
            Self::Low => ">20-40%",
            Self::Medium => ">40-60%",
            Self::High => ">60-80%",
            Self::VeryHigh => ">80-<100%",
            Self::Certain => "100%",
        }
    }
}

pub fn classify_map(probability: &Tilemap<f32>) -> Tilemap<ProbabilityClass> {
    probability.map(|&p| ProbabilityClass::from_probability(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_boundaries() {
        use ProbabilityClass::*;
        let cases = [
            (0.0, Never),
            (0.01, VeryLow),
            (0.2, VeryLow),
            (0.21, Low),
            (0.4, Low),
            (0.5, Medium),
            (0.6, Medium),
            (0.8, High),
            (0.81, VeryHigh),
            (0.999, VeryHigh),
            (1.0, Certain),
        ];
        for (p, expected) in cases {
            assert_eq!(ProbabilityClass::from_probability(p), expected, "p = {p}");
        }
    }

    #[test]
    fn test_indices_are_contiguous() {
        let indices: Vec<u8> = ProbabilityClass::all().iter().map(|c| c.index()).collect();
        assert_eq!(indices, (0..=6).collect::<Vec<u8>>());
    }
}
