//! Resolution request domain model.
//!
//! A request names a test, a plan, or both, each living inside a remote
//! git repository, plus the output format the caller wants back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ref sentinel meaning "the repository's default branch".
///
/// Passed through to the fetcher untouched.
pub const DEFAULT_REF: &str = "default";

/// Output format requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Content type used when the payload is returned over HTTP.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::Yaml => "application/yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a format string is not one of `html`, `json`, `yaml`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported format '{0}', expected one of: html, json, yaml")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Identifies one test or plan inside a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub url: String,
    pub name: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Directory of the metadata tree inside the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Locator {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            git_ref: DEFAULT_REF.to_string(),
            path: None,
        }
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = git_ref.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// What a request asks the pipeline to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Test(&'a Locator),
    Plan(&'a Locator),
    TestAndPlan { test: &'a Locator, plan: &'a Locator },
}

/// A validated request. At least one locator is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<Locator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Locator>,
    pub format: OutputFormat,
}

impl ResolutionRequest {
    pub fn for_test(locator: Locator, format: OutputFormat) -> Self {
        Self {
            test: Some(locator),
            plan: None,
            format,
        }
    }

    pub fn for_plan(locator: Locator, format: OutputFormat) -> Self {
        Self {
            test: None,
            plan: Some(locator),
            format,
        }
    }

    pub fn for_test_and_plan(test: Locator, plan: Locator, format: OutputFormat) -> Self {
        Self {
            test: Some(test),
            plan: Some(plan),
            format,
        }
    }

    /// Returns `None` only for a request built by hand with no locator.
    pub fn target(&self) -> Option<Target<'_>> {
        match (&self.test, &self.plan) {
            (Some(test), None) => Some(Target::Test(test)),
            (None, Some(plan)) => Some(Target::Plan(plan)),
            (Some(test), Some(plan)) => Some(Target::TestAndPlan { test, plan }),
            (None, None) => None,
        }
    }
}

/// Why a set of raw parameters could not become a [`ResolutionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing arguments: {0}")]
    MissingArguments(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(#[from] UnknownFormat),
}

/// Raw, unvalidated request parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    #[serde(rename = "test-url", default)]
    pub test_url: Option<String>,
    #[serde(rename = "test-name", default)]
    pub test_name: Option<String>,
    #[serde(rename = "test-ref", default = "default_ref")]
    pub test_ref: String,
    #[serde(rename = "test-path", default)]
    pub test_path: Option<String>,
    #[serde(rename = "plan-url", default)]
    pub plan_url: Option<String>,
    #[serde(rename = "plan-name", default)]
    pub plan_name: Option<String>,
    #[serde(rename = "plan-ref", default = "default_ref")]
    pub plan_ref: String,
    #[serde(rename = "plan-path", default)]
    pub plan_path: Option<String>,
    #[serde(rename = "format", default = "default_format")]
    pub format: String,
}

fn default_ref() -> String {
    DEFAULT_REF.to_string()
}

fn default_format() -> String {
    OutputFormat::Json.as_str().to_string()
}

impl RequestParams {
    /// Parameters with every locator field unset and the documented defaults.
    pub fn empty() -> Self {
        Self {
            test_ref: default_ref(),
            plan_ref: default_ref(),
            format: default_format(),
            ..Default::default()
        }
    }

    /// Validate the parameters and build a request.
    ///
    /// Locator pairs are checked first, then presence, then the format,
    /// so a malformed locator is reported even if the format is also bad.
    pub fn validate(self) -> Result<ResolutionRequest, RequestError> {
        let test = locator_from_parts(
            "test",
            self.test_url,
            self.test_name,
            self.test_ref,
            self.test_path,
        )?;
        let plan = locator_from_parts(
            "plan",
            self.plan_url,
            self.plan_name,
            self.plan_ref,
            self.plan_path,
        )?;

        if test.is_none() && plan.is_none() {
            return Err(RequestError::MissingArguments(
                "provide test-url and test-name, plan-url and plan-name, or both".to_string(),
            ));
        }

        let format = self.format.parse::<OutputFormat>()?;

        Ok(ResolutionRequest { test, plan, format })
    }
}

fn locator_from_parts(
    kind: &str,
    url: Option<String>,
    name: Option<String>,
    git_ref: String,
    path: Option<String>,
) -> Result<Option<Locator>, RequestError> {
    match (url, name) {
        (Some(url), Some(name)) => Ok(Some(Locator {
            url,
            name,
            git_ref,
            path,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(RequestError::InvalidArguments(format!(
            "{kind}-url is set but {kind}-name is missing"
        ))),
        (None, Some(_)) => Err(RequestError::InvalidArguments(format!(
            "{kind}-name is set but {kind}-url is missing"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_params(url: &str, name: &str) -> RequestParams {
        RequestParams {
            test_url: Some(url.to_string()),
            test_name: Some(name.to_string()),
            ..RequestParams::empty()
        }
    }

    #[test]
    fn test_defaults_from_empty_query() {
        let params: RequestParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.test_ref, DEFAULT_REF);
        assert_eq!(params.plan_ref, DEFAULT_REF);
        assert_eq!(params.format, "json");
        assert_eq!(params, RequestParams::empty());
    }

    #[test]
    fn test_valid_test_request() {
        let request = test_params("https://example.com/repo", "/tests/smoke")
            .validate()
            .unwrap();

        let test = request.test.as_ref().unwrap();
        assert_eq!(test.url, "https://example.com/repo");
        assert_eq!(test.name, "/tests/smoke");
        assert_eq!(test.git_ref, "default");
        assert!(request.plan.is_none());
        assert_eq!(request.format, OutputFormat::Json);
        assert!(matches!(request.target(), Some(Target::Test(_))));
    }

    #[test]
    fn test_test_and_plan_target() {
        let params = RequestParams {
            plan_url: Some("https://example.com/repo".to_string()),
            plan_name: Some("/plans/basic".to_string()),
            format: "yaml".to_string(),
            ..test_params("https://example.com/repo", "/tests/smoke")
        };
        let request = params.validate().unwrap();
        assert_eq!(request.format, OutputFormat::Yaml);
        assert!(matches!(
            request.target(),
            Some(Target::TestAndPlan { .. })
        ));
    }

    #[test]
    fn test_missing_arguments() {
        let err = RequestParams::empty().validate().unwrap_err();
        assert!(matches!(err, RequestError::MissingArguments(_)));
    }

    #[test]
    fn test_partial_test_locator_is_invalid() {
        let params = RequestParams {
            test_url: Some("https://example.com/repo".to_string()),
            ..RequestParams::empty()
        };
        assert!(matches!(
            params.validate(),
            Err(RequestError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_partial_plan_locator_is_invalid_even_with_valid_test() {
        let params = RequestParams {
            plan_name: Some("/plans/basic".to_string()),
            ..test_params("https://example.com/repo", "/tests/smoke")
        };
        assert!(matches!(
            params.validate(),
            Err(RequestError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let params = RequestParams {
            format: "xml".to_string(),
            ..test_params("https://example.com/repo", "/tests/smoke")
        };
        match params.validate() {
            Err(RequestError::InvalidFormat(UnknownFormat(f))) => assert_eq!(f, "xml"),
            other => panic!("Expected InvalidFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_format_is_case_sensitive() {
        assert!("HTML".parse::<OutputFormat>().is_err());
        assert_eq!("html".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
    }

    #[test]
    fn test_empty_name_is_a_valid_key() {
        let request = test_params("https://example.com/repo", "").validate().unwrap();
        assert_eq!(request.test.unwrap().name, "");
    }

    #[test]
    fn test_request_serializes_ref_field() {
        let request = ResolutionRequest::for_test(
            Locator::new("u", "/t").with_ref("main"),
            OutputFormat::Html,
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["test"]["ref"], "main");
        assert_eq!(value["format"], "html");
        let back: ResolutionRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, request);
    }

    proptest! {
        #[test]
        fn prop_half_locator_always_invalid(
            value in ".*",
            use_url in any::<bool>(),
            plan_side in any::<bool>(),
        ) {
            let mut params = RequestParams::empty();
            match (plan_side, use_url) {
                (false, true) => params.test_url = Some(value),
                (false, false) => params.test_name = Some(value),
                (true, true) => params.plan_url = Some(value),
                (true, false) => params.plan_name = Some(value),
            }
            prop_assert!(matches!(params.validate(), Err(RequestError::InvalidArguments(_))));
        }
    }
}
