use super::document::{PlanDocument, TestDocument, TestPlanDocument};
use crate::domain::errors::RenderError;
use crate::domain::models::{OutputFormat, ResolvedEntity};
use crate::domain::ports::Renderer;

/// YAML output.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlRenderer;

impl Renderer for YamlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Yaml
    }

    fn render_test(&self, test: &ResolvedEntity) -> Result<String, RenderError> {
        Ok(serde_yaml::to_string(&TestDocument::from(test))?)
    }

    fn render_plan(&self, plan: &ResolvedEntity) -> Result<String, RenderError> {
        Ok(serde_yaml::to_string(&PlanDocument::from(plan))?)
    }

    fn render_test_plan(
        &self,
        test: &ResolvedEntity,
        plan: &ResolvedEntity,
    ) -> Result<String, RenderError> {
        Ok(serde_yaml::to_string(&TestPlanDocument::new(test, plan))?)
    }
}
