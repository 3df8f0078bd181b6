use super::document::{PlanDocument, TestDocument, TestPlanDocument};
use crate::domain::errors::RenderError;
use crate::domain::models::{OutputFormat, ResolvedEntity};
use crate::domain::ports::Renderer;

/// Pretty-printed JSON output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render_test(&self, test: &ResolvedEntity) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(&TestDocument::from(test))?)
    }

    fn render_plan(&self, plan: &ResolvedEntity) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(&PlanDocument::from(plan))?)
    }

    fn render_test_plan(
        &self,
        test: &ResolvedEntity,
        plan: &ResolvedEntity,
    ) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(&TestPlanDocument::new(test, plan))?)
    }
}
