use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Invalid run configuration. Raised before any backend call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown language '{0}'. Expected one of: vietnamese, english")]
    UnknownLanguage(String),

    #[error("Unknown topic '{0}'. Expected one of: {expected}", expected = Topic::names().join(", "))]
    UnknownTopic(String),

    #[error("Unknown post type '{0}'. Expected one of: {expected}", expected = PostType::names().join(", "))]
    UnknownPostType(String),

    #[error("Request text is empty")]
    EmptyRequest,

    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    #[error("pass_threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("Criterion '{name}' has invalid weight {weight}; weights must be finite and non-negative")]
    InvalidWeight { name: String, weight: f64 },
}

/// Language the prompts and the post are written in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Vietnamese,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Vietnamese => "vietnamese",
            Language::English => "english",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vietnamese" | "vi" => Ok(Language::Vietnamese),
            "english" | "en" => Ok(Language::English),
            _ => Err(ValidationError::UnknownLanguage(s.to_string())),
        }
    }
}

/// Content domain chosen by the caller; selects the planning template family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    #[default]
    FoodNutrition,
    DiseaseWarning,
    TravelAdventure,
    BusinessEnterprise,
    LifestyleOffice,
    HolidayEvent,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::FoodNutrition,
        Topic::DiseaseWarning,
        Topic::TravelAdventure,
        Topic::BusinessEnterprise,
        Topic::LifestyleOffice,
        Topic::HolidayEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::FoodNutrition => "food_nutrition",
            Topic::DiseaseWarning => "disease_warning",
            Topic::TravelAdventure => "travel_adventure",
            Topic::BusinessEnterprise => "business_enterprise",
            Topic::LifestyleOffice => "lifestyle_office",
            Topic::HolidayEvent => "holiday_event",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }

    pub fn description(&self) -> &'static str {
        match self {
            Topic::FoodNutrition => "Educational posts about food and nutrition",
            Topic::DiseaseWarning => "Warning posts about diseases and health risks",
            Topic::TravelAdventure => "Posts about travel and adventure activities",
            Topic::BusinessEnterprise => "Business-focused posts for enterprises",
            Topic::LifestyleOffice => "Posts about office health and lifestyle",
            Topic::HolidayEvent => "Posts about holidays and special events",
        }
    }

    /// Generator/evaluator template family for this topic
    pub fn post_type(&self) -> PostType {
        match self {
            Topic::FoodNutrition => PostType::HealthNutrition,
            Topic::DiseaseWarning => PostType::DiseaseWarning,
            Topic::TravelAdventure => PostType::TravelAdventure,
            Topic::BusinessEnterprise => PostType::BusinessEnterprise,
            Topic::LifestyleOffice => PostType::LifestyleOffice,
            Topic::HolidayEvent => PostType::HolidayEvent,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| ValidationError::UnknownTopic(s.to_string()))
    }
}

/// Template family used by the generate and evaluate stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    HealthNutrition,
    DiseaseWarning,
    TravelAdventure,
    BusinessEnterprise,
    LifestyleOffice,
    HolidayEvent,
}

impl PostType {
    pub const ALL: [PostType; 6] = [
        PostType::HealthNutrition,
        PostType::DiseaseWarning,
        PostType::TravelAdventure,
        PostType::BusinessEnterprise,
        PostType::LifestyleOffice,
        PostType::HolidayEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::HealthNutrition => "health_nutrition",
            PostType::DiseaseWarning => "disease_warning",
            PostType::TravelAdventure => "travel_adventure",
            PostType::BusinessEnterprise => "business_enterprise",
            PostType::LifestyleOffice => "lifestyle_office",
            PostType::HolidayEvent => "holiday_event",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }

    pub fn description(&self) -> &'static str {
        match self {
            PostType::HealthNutrition => {
                "Educational posts about food and nutrition with specific data"
            }
            PostType::DiseaseWarning => "Warning posts about diseases and health risks",
            PostType::TravelAdventure => "Posts about travel and adventure activities",
            PostType::BusinessEnterprise => "Business-focused posts for enterprises",
            PostType::LifestyleOffice => "Posts about office health and lifestyle",
            PostType::HolidayEvent => "Posts about holidays and special events",
        }
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| ValidationError::UnknownPostType(s.to_string()))
    }
}

/// Immutable input for one run. Built through [`RunRequest::builder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    user_request: String,
    language: Language,
    topic: Topic,
    target_audience: Option<String>,
    hashtags: Vec<String>,
    criteria: Option<BTreeMap<String, f64>>,
    evaluation_focus: Option<String>,
    max_iterations: usize,
    pass_threshold: f64,
    enable_search: bool,
}

impl RunRequest {
    pub const DEFAULT_MAX_ITERATIONS: usize = 3;
    pub const DEFAULT_PASS_THRESHOLD: f64 = 0.75;

    pub fn builder(user_request: impl Into<String>) -> RunRequestBuilder {
        RunRequestBuilder::new(user_request)
    }

    pub fn user_request(&self) -> &str {
        &self.user_request
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn post_type(&self) -> PostType {
        self.topic.post_type()
    }

    pub fn target_audience(&self) -> Option<&str> {
        self.target_audience.as_deref()
    }

    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    /// Caller-supplied criterion weights, not yet normalized
    pub fn criteria(&self) -> Option<&BTreeMap<String, f64>> {
        self.criteria.as_ref()
    }

    pub fn evaluation_focus(&self) -> Option<&str> {
        self.evaluation_focus.as_deref()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn pass_threshold(&self) -> f64 {
        self.pass_threshold
    }

    pub fn enable_search(&self) -> bool {
        self.enable_search
    }
}

/// Builder that validates everything in [`build`](RunRequestBuilder::build)
#[derive(Debug, Clone)]
pub struct RunRequestBuilder {
    request: RunRequest,
}

impl RunRequestBuilder {
    fn new(user_request: impl Into<String>) -> Self {
        Self {
            request: RunRequest {
                user_request: user_request.into(),
                language: Language::default(),
                topic: Topic::default(),
                target_audience: None,
                hashtags: Vec::new(),
                criteria: None,
                evaluation_focus: None,
                max_iterations: RunRequest::DEFAULT_MAX_ITERATIONS,
                pass_threshold: RunRequest::DEFAULT_PASS_THRESHOLD,
                enable_search: true,
            },
        }
    }

    pub fn language(mut self, language: Language) -> Self {
        self.request.language = language;
        self
    }

    pub fn topic(mut self, topic: Topic) -> Self {
        self.request.topic = topic;
        self
    }

    pub fn target_audience(mut self, audience: impl Into<String>) -> Self {
        let audience = audience.into();
        self.request.target_audience = (!audience.trim().is_empty()).then_some(audience);
        self
    }

    pub fn hashtags<I, S>(mut self, hashtags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.hashtags = hashtags.into_iter().map(Into::into).collect();
        self
    }

    pub fn criteria(mut self, criteria: BTreeMap<String, f64>) -> Self {
        self.request.criteria = Some(criteria);
        self
    }

    pub fn evaluation_focus(mut self, focus: impl Into<String>) -> Self {
        let focus = focus.into();
        self.request.evaluation_focus = (!focus.trim().is_empty()).then_some(focus);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.request.max_iterations = max_iterations;
        self
    }

    pub fn pass_threshold(mut self, pass_threshold: f64) -> Self {
        self.request.pass_threshold = pass_threshold;
        self
    }

    pub fn enable_search(mut self, enable: bool) -> Self {
        self.request.enable_search = enable;
        self
    }

    pub fn build(self) -> Result<RunRequest, ValidationError> {
        let request = self.request;

        if request.user_request.trim().is_empty() {
            return Err(ValidationError::EmptyRequest);
        }
        if request.max_iterations == 0 {
            return Err(ValidationError::ZeroIterations);
        }
        if !(0.0..=1.0).contains(&request.pass_threshold) {
            return Err(ValidationError::ThresholdOutOfRange(request.pass_threshold));
        }
        if let Some(criteria) = &request.criteria {
            for (name, weight) in criteria {
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(ValidationError::InvalidWeight {
                        name: name.clone(),
                        weight: *weight,
                    });
                }
            }
        }

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = RunRequest::builder("Write a post").build().unwrap();
        assert_eq!(request.language(), Language::Vietnamese);
        assert_eq!(request.topic(), Topic::FoodNutrition);
        assert_eq!(request.post_type(), PostType::HealthNutrition);
        assert_eq!(request.max_iterations(), 3);
        assert!((request.pass_threshold() - 0.75).abs() < f64::EPSILON);
        assert!(request.enable_search());
        assert!(request.hashtags().is_empty());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert_eq!("vi".parse::<Language>().unwrap(), Language::Vietnamese);
        assert_eq!(
            "holiday-event".parse::<Topic>().unwrap(),
            Topic::HolidayEvent
        );
        assert_eq!(
            "business_enterprise".parse::<PostType>().unwrap(),
            PostType::BusinessEnterprise
        );
    }

    #[test]
    fn test_unknown_enum_values_are_rejected() {
        assert_eq!(
            "french".parse::<Language>(),
            Err(ValidationError::UnknownLanguage("french".into()))
        );
        assert!(matches!(
            "sports".parse::<Topic>(),
            Err(ValidationError::UnknownTopic(_))
        ));
        assert!(matches!(
            "food_nutrition".parse::<PostType>(),
            Err(ValidationError::UnknownPostType(_))
        ));
    }

    #[test]
    fn test_topic_maps_to_post_type() {
        assert_eq!(Topic::FoodNutrition.post_type(), PostType::HealthNutrition);
        for topic in Topic::ALL.into_iter().skip(1) {
            assert_eq!(topic.post_type().as_str(), topic.as_str());
        }
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert_eq!(
            RunRequest::builder("  ").build(),
            Err(ValidationError::EmptyRequest)
        );
        assert_eq!(
            RunRequest::builder("x").max_iterations(0).build(),
            Err(ValidationError::ZeroIterations)
        );
        assert_eq!(
            RunRequest::builder("x").pass_threshold(1.2).build(),
            Err(ValidationError::ThresholdOutOfRange(1.2))
        );

        let mut weights = BTreeMap::new();
        weights.insert("tone_style".to_string(), -1.0);
        assert!(matches!(
            RunRequest::builder("x").criteria(weights).build(),
            Err(ValidationError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_blank_optional_strings_are_dropped() {
        let request = RunRequest::builder("x")
            .target_audience("   ")
            .evaluation_focus("")
            .build()
            .unwrap();
        assert_eq!(request.target_audience(), None);
        assert_eq!(request.evaluation_focus(), None);
    }
}
