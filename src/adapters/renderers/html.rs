use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{json, Value};

use super::document::{PlanDocument, TestDocument};
use crate::domain::errors::RenderError;
use crate::domain::models::{Job, JobState, OutputFormat, ResolvedEntity};
use crate::domain::ports::{Renderer, StatusPageRenderer};

const TEST_TEMPLATE: &str = "test";
const PLAN_TEMPLATE: &str = "plan";
const TESTPLAN_TEMPLATE: &str = "testplan";
const STATUS_TEMPLATE: &str = "status";

const TEMPLATES: [(&str, &str); 4] = [
    (TEST_TEMPLATE, include_str!("../../../templates/test.html.hbs")),
    (PLAN_TEMPLATE, include_str!("../../../templates/plan.html.hbs")),
    (TESTPLAN_TEMPLATE, include_str!("../../../templates/testplan.html.hbs")),
    (STATUS_TEMPLATE, include_str!("../../../templates/status.html.hbs")),
];

const PARTIALS: [(&str, &str); 2] = [
    ("test_body", include_str!("../../../templates/test_body.html.hbs")),
    ("plan_body", include_str!("../../../templates/plan_body.html.hbs")),
];

/// HTML pages for entities and for job status polling.
pub struct HtmlRenderer {
    handlebars: Handlebars<'static>,
    refresh_secs: u64,
}

impl HtmlRenderer {
    /// Compile the bundled templates. `refresh_secs` is the status page
    /// reload period while a job is still running.
    pub fn new(refresh_secs: u64) -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();
        for (name, source) in PARTIALS {
            handlebars
                .register_partial(name, source)
                .map_err(|e| RenderError::Template(e.to_string()))?;
        }
        for (name, source) in TEMPLATES {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| RenderError::Template(e.to_string()))?;
        }

        Ok(Self {
            handlebars,
            refresh_secs,
        })
    }

    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        Ok(self.handlebars.render(template, data)?)
    }
}

impl std::fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlRenderer")
            .field("refresh_secs", &self.refresh_secs)
            .finish_non_exhaustive()
    }
}

/// Template view of a document: the `fmf-id` block is also exposed as
/// `fmf_id`, which handlebars paths can address.
fn view<T: Serialize>(doc: &T) -> Result<Value, RenderError> {
    let mut value = serde_json::to_value(doc)?;
    if let Value::Object(map) = &mut value {
        if let Some(fmf_id) = map.get("fmf-id").cloned() {
            map.insert("fmf_id".to_string(), fmf_id);
        }
    }
    Ok(value)
}

impl Renderer for HtmlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn render_test(&self, test: &ResolvedEntity) -> Result<String, RenderError> {
        let data = json!({ "test": view(&TestDocument::from(test))? });
        self.render(TEST_TEMPLATE, &data)
    }

    fn render_plan(&self, plan: &ResolvedEntity) -> Result<String, RenderError> {
        let data = json!({ "plan": view(&PlanDocument::from(plan))? });
        self.render(PLAN_TEMPLATE, &data)
    }

    fn render_test_plan(
        &self,
        test: &ResolvedEntity,
        plan: &ResolvedEntity,
    ) -> Result<String, RenderError> {
        let data = json!({
            "test": view(&TestDocument::from(test))?,
            "plan": view(&PlanDocument::from(plan))?,
        });
        self.render(TESTPLAN_TEMPLATE, &data)
    }
}

impl StatusPageRenderer for HtmlRenderer {
    fn render_status_page(&self, job: &Job, callback_url: &str) -> Result<String, RenderError> {
        // A finished HTML job is shown as the page itself.
        if job.state == JobState::Success && job.request.format == OutputFormat::Html {
            if let Some(payload) = &job.result {
                return Ok(payload.clone());
            }
        }

        let data = json!({
            "id": job.id.to_string(),
            "status": job.state.as_str(),
            "callback_url": callback_url,
            "refresh": !job.state.is_terminal(),
            "refresh_secs": self.refresh_secs,
            "not_found": job.is_not_found(),
            "failure": (job.state == JobState::Failure).then(|| job.result.clone()).flatten(),
            "payload": (job.state == JobState::Success).then(|| job.result.clone()).flatten(),
        });
        self.render(STATUS_TEMPLATE, &data)
    }
}
