//! Renderer ports.

use crate::domain::errors::RenderError;
use crate::domain::models::{Job, OutputFormat, ResolvedEntity};

/// Renders resolved entities in one output format.
///
/// One method per entity kind; the combined view is its own document, not
/// a concatenation of the two single views.
pub trait Renderer: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn render_test(&self, test: &ResolvedEntity) -> Result<String, RenderError>;

    fn render_plan(&self, plan: &ResolvedEntity) -> Result<String, RenderError>;

    fn render_test_plan(
        &self,
        test: &ResolvedEntity,
        plan: &ResolvedEntity,
    ) -> Result<String, RenderError>;
}

/// Renders the HTML page a polling client keeps reloading.
pub trait StatusPageRenderer: Send + Sync {
    fn render_status_page(&self, job: &Job, callback_url: &str) -> Result<String, RenderError>;
}
