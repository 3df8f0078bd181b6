//! Output renderers for resolved tests and plans.

pub mod document;
pub mod html;
pub mod json;
pub mod yaml;

pub use document::{FmfId, PlanDocument, TestDocument, TestPlanDocument};
pub use html::HtmlRenderer;
pub use json::JsonRenderer;
pub use yaml::YamlRenderer;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::RenderError;
use crate::domain::models::OutputFormat;
use crate::domain::ports::Renderer;

/// Maps each output format to the renderer that produces it.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<OutputFormat, Arc<dyn Renderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the HTML, JSON and YAML renderers.
    pub fn with_defaults(refresh_secs: u64) -> Result<Self, RenderError> {
        let mut registry = Self::new();
        registry.register(Arc::new(HtmlRenderer::new(refresh_secs)?));
        registry.register(Arc::new(JsonRenderer));
        registry.register(Arc::new(YamlRenderer));
        Ok(registry)
    }

    /// Add a renderer, replacing any previous one for the same format.
    pub fn register(&mut self, renderer: Arc<dyn Renderer>) {
        self.renderers.insert(renderer.format(), renderer);
    }

    pub fn get(&self, format: OutputFormat) -> Result<Arc<dyn Renderer>, RenderError> {
        self.renderers
            .get(&format)
            .cloned()
            .ok_or(RenderError::Unsupported(format))
    }
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("formats", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::document::fixtures::*;
    use super::*;

    #[test]
    fn test_default_registry_covers_all_formats() {
        let registry = RendererRegistry::with_defaults(5).unwrap();
        for format in [OutputFormat::Html, OutputFormat::Json, OutputFormat::Yaml] {
            assert_eq!(registry.get(format).unwrap().format(), format);
        }
    }

    #[test]
    fn test_empty_registry_reports_unsupported() {
        let registry = RendererRegistry::new();
        assert!(matches!(
            registry.get(OutputFormat::Yaml),
            Err(RenderError::Unsupported(OutputFormat::Yaml))
        ));
    }

    #[test]
    fn test_json_and_yaml_agree() {
        let test = resolved_test();
        let plan = resolved_plan();

        let json: serde_json::Value =
            serde_json::from_str(&JsonRenderer.render_test_plan(&test, &plan).unwrap()).unwrap();
        let yaml: serde_json::Value =
            serde_yaml::from_str(&YamlRenderer.render_test_plan(&test, &plan).unwrap()).unwrap();

        assert_eq!(json, yaml);
        assert_eq!(json["test"]["fmf-id"]["ref"], "main");
        assert_eq!(json["plan"]["name"], "/plans/basic");
    }

    #[test]
    fn test_single_documents_agree() {
        let test = resolved_test();
        let json: serde_json::Value =
            serde_json::from_str(&JsonRenderer.render_test(&test).unwrap()).unwrap();
        let yaml: serde_json::Value =
            serde_yaml::from_str(&YamlRenderer.render_test(&test).unwrap()).unwrap();
        assert_eq!(json, yaml);
        assert_eq!(json["tag"], serde_json::json!(["core", "smoke"]));
    }
}
