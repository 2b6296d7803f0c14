use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Built-in scoring criteria and their weights
pub const DEFAULT_CRITERIA: [(&str, f64); 6] = [
    ("quality_gate", 0.20),
    ("content_information", 0.20),
    ("structure_presentation", 0.15),
    ("brand_connection", 0.15),
    ("tone_style", 0.15),
    ("completeness", 0.15),
];

/// Criterion weights normalized to sum to 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaWeights(BTreeMap<String, f64>);

impl Default for CriteriaWeights {
    fn default() -> Self {
        Self::normalize(
            DEFAULT_CRITERIA
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight)),
        )
        .unwrap_or_else(|| Self(BTreeMap::new()))
    }
}

impl CriteriaWeights {
    /// Weights used for a run: the caller's mapping replaces the defaults entirely
    pub fn resolve(custom: Option<&BTreeMap<String, f64>>) -> Self {
        match custom {
            Some(weights) if !weights.is_empty() => {
                Self::normalize(weights.iter().map(|(k, v)| (k.clone(), *v))).unwrap_or_else(
                    || {
                        warn!("Criterion weights do not sum to a positive total, using defaults");
                        Self::default()
                    },
                )
            }
            _ => Self::default(),
        }
    }

    /// Scale weights to sum to 1.0. `None` when the total is not positive.
    pub fn normalize<I>(weights: I) -> Option<Self>
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let weights: BTreeMap<String, f64> = weights
            .into_iter()
            .filter(|(_, w)| w.is_finite() && *w >= 0.0)
            .collect();
        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return None;
        }
        Some(Self(
            weights.into_iter().map(|(k, w)| (k, w / total)).collect(),
        ))
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, f64> {
        self.0
    }

    /// Human description of a criterion, for the scoring prompt
    pub fn describe(name: &str) -> &'static str {
        match name {
            "quality_gate" => "factual accuracy and no misleading or unsafe claims",
            "content_information" => "useful, specific and well-supported information",
            "structure_presentation" => "clear hook, logical sections, readable formatting",
            "brand_connection" => "natural tie-in to the brand or organisation",
            "tone_style" => "tone suited to the audience and the language",
            "completeness" => "covers the request fully, includes a call to action and hashtags",
            _ => "custom criterion",
        }
    }
}
