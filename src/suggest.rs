//! The style suggestion pipeline: preference form validation, the generation
//! service client, and the result lifecycle.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SuggestionServiceOptions;

pub const CAR_BRAND_OPTIONS: &[&str] = &["Luxury", "Sports", "Electric", "Classic", "Off-road"];
pub const COLOR_SCHEME_OPTIONS: &[&str] =
    &["Dark & Moody", "Bright & Vibrant", "Minimalist & Clean"];
pub const ANIMATION_STYLE_OPTIONS: &[&str] = &["Subtle & Smooth", "Bold & Dynamic", "Minimalistic"];

/// Minimum length of the free-form style description, in characters.
pub const MIN_DESCRIPTION_CHARS: usize = 20;

/// The single user-facing message every request failure collapses to.
pub const REQUEST_FAILED_MESSAGE: &str =
    "Failed to generate AI suggestions. Please try again later.";

/// User-selected style preferences. Field names follow the generation
/// service's wire contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferenceForm {
    pub preferred_car_brands: Vec<String>,
    pub preferred_color_schemes: Vec<String>,
    pub preferred_animation_styles: Vec<String>,
    pub user_description: String,
}

impl PreferenceForm {
    /// Field-level validation; collects every failing field.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.preferred_car_brands.is_empty() {
            errors.push(FieldError::new(FormField::CarBrands));
        }
        if self.preferred_color_schemes.is_empty() {
            errors.push(FieldError::new(FormField::ColorSchemes));
        }
        if self.preferred_animation_styles.is_empty() {
            errors.push(FieldError::new(FormField::AnimationStyles));
        }
        if self.user_description.chars().count() < MIN_DESCRIPTION_CHARS {
            errors.push(FieldError::new(FormField::Description));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    CarBrands,
    ColorSchemes,
    AnimationStyles,
    Description,
}

impl FormField {
    /// Wire/form name of the field.
    pub fn name(self) -> &'static str {
        match self {
            Self::CarBrands => "preferredCarBrands",
            Self::ColorSchemes => "preferredColorSchemes",
            Self::AnimationStyles => "preferredAnimationStyles",
            Self::Description => "userDescription",
        }
    }

    /// Inline message shown next to the field.
    pub fn message(self) -> &'static str {
        match self {
            Self::CarBrands => "You have to select at least one car brand.",
            Self::ColorSchemes => "You have to select at least one color scheme.",
            Self::AnimationStyles => "You have to select at least one animation style.",
            Self::Description => {
                "Please describe your desired style in at least 20 characters."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
}

impl FieldError {
    pub fn new(field: FormField) -> Self {
        Self { field }
    }

    pub fn message(&self) -> &'static str {
        self.field.message()
    }
}

/// Structured output of the generation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResult {
    pub reasoning: String,
    pub suggested_animations: Vec<String>,
    pub suggested_background_images: Vec<String>,
    pub suggested_interactive_elements: Vec<String>,
}

/// The generation service seam.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn generate(&self, form: &PreferenceForm) -> Result<SuggestionResult>;
}

/// HTTP client for the generation service.
pub struct HttpSuggestionProvider {
    client: Client,
    options: SuggestionServiceOptions,
}

impl HttpSuggestionProvider {
    pub fn new(options: SuggestionServiceOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent("carzona/0.1")
            .build()
            .context("building suggestion http client")?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl SuggestionProvider for HttpSuggestionProvider {
    async fn generate(&self, form: &PreferenceForm) -> Result<SuggestionResult> {
        let mut request = self.client.post(&self.options.url).json(form);
        if let Some(token) = &self.options.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.options.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.context("suggestion request failed")?;
        response
            .error_for_status()
            .context("suggestion service returned an error status")?
            .json::<SuggestionResult>()
            .await
            .context("suggestion service returned an invalid body")
    }
}

/// How a submission can fail. Callers never see raised errors; both arms are
/// data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// One or more fields failed validation; reported inline, never sent
    /// upstream.
    #[error("preference form failed validation")]
    Validation(Vec<FieldError>),

    /// The provider failed in some way; the cause is logged, the caller gets
    /// only the generic message.
    #[error("{}", REQUEST_FAILED_MESSAGE)]
    Request,
}

/// Owns the form, the loading flag, and the last result of one suggestion
/// session.
pub struct SuggestionPipeline {
    provider: Box<dyn SuggestionProvider>,
    form: PreferenceForm,
    result: Option<SuggestionResult>,
    loading: bool,
}

impl SuggestionPipeline {
    pub fn new(provider: Box<dyn SuggestionProvider>) -> Self {
        Self {
            provider,
            form: PreferenceForm::default(),
            result: None,
            loading: false,
        }
    }

    /// The most recently submitted form; inputs stay intact after a
    /// successful generation for reference.
    pub fn form(&self) -> &PreferenceForm {
        &self.form
    }

    pub fn result(&self) -> Option<&SuggestionResult> {
        self.result.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Validate and submit the form, issuing at most one provider call.
    pub async fn submit(
        &mut self,
        form: PreferenceForm,
    ) -> Result<SuggestionResult, SubmitError> {
        form.validate().map_err(SubmitError::Validation)?;

        let request_id = request_id();
        self.loading = true;
        self.result = None;
        self.form = form;

        debug!(request_id = %request_id, "requesting style suggestions");
        let outcome = self.provider.generate(&self.form).await;
        self.loading = false;

        match outcome {
            Ok(result) => {
                self.result = Some(result.clone());
                Ok(result)
            }
            Err(err) => {
                warn!(request_id = %request_id, error = ?err, "style suggestion request failed");
                Err(SubmitError::Request)
            }
        }
    }

    /// Clear the stored result and form back to their defaults. Idempotent.
    pub fn reset(&mut self) {
        self.form = PreferenceForm::default();
        self.result = None;
    }
}

fn request_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("style-{}", suffix.to_lowercase())
}
