//! Format-independent documents built from resolved entities.
//!
//! Every renderer serializes these same structs, so JSON, YAML and HTML
//! always agree on content.

use serde::Serialize;

use crate::domain::models::ResolvedEntity;

/// Where an entity came from, enough to fetch it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FmfId {
    pub url: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub path: Option<String>,
    pub name: String,
}

impl FmfId {
    fn of(resolved: &ResolvedEntity) -> Self {
        Self {
            url: resolved.locator.url.clone(),
            git_ref: resolved.locator.git_ref.clone(),
            path: resolved.locator.path.clone(),
            name: resolved.entity.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestDocument {
    pub name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub contact: Vec<String>,
    pub component: Vec<String>,
    pub tag: Vec<String>,
    pub tier: Option<String>,
    pub id: Option<String>,
    pub test: Option<String>,
    pub framework: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "fmf-id")]
    pub fmf_id: FmfId,
}

impl From<&ResolvedEntity> for TestDocument {
    fn from(resolved: &ResolvedEntity) -> Self {
        let entity = &resolved.entity;
        Self {
            name: entity.name.clone(),
            summary: entity.string_field("summary"),
            description: entity.string_field("description"),
            contact: entity.string_list_field("contact"),
            component: entity.string_list_field("component"),
            tag: entity.string_list_field("tag"),
            tier: entity.string_field("tier"),
            id: entity.string_field("id"),
            test: entity.string_field("test"),
            framework: entity.string_field("framework"),
            duration: entity.string_field("duration"),
            fmf_id: FmfId::of(resolved),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDocument {
    pub name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tag: Vec<String>,
    pub id: Option<String>,
    #[serde(rename = "fmf-id")]
    pub fmf_id: FmfId,
}

impl From<&ResolvedEntity> for PlanDocument {
    fn from(resolved: &ResolvedEntity) -> Self {
        let entity = &resolved.entity;
        Self {
            name: entity.name.clone(),
            summary: entity.string_field("summary"),
            description: entity.string_field("description"),
            tag: entity.string_list_field("tag"),
            id: entity.string_field("id"),
            fmf_id: FmfId::of(resolved),
        }
    }
}

/// Combined view of a test and the plan it runs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestPlanDocument {
    pub test: TestDocument,
    pub plan: PlanDocument,
}

impl TestPlanDocument {
    pub fn new(test: &ResolvedEntity, plan: &ResolvedEntity) -> Self {
        Self {
            test: test.into(),
            plan: plan.into(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    use crate::domain::models::{Entity, EntityKind, Locator, ResolvedEntity};

    pub fn resolved_test() -> ResolvedEntity {
        let serde_json::Value::Object(metadata) = json!({
            "summary": "Smoke test",
            "contact": "Jane Doe <jane@example.com>",
            "tag": ["core", "smoke"],
            "tier": 1,
            "test": "./run.sh",
            "framework": "shell",
        }) else {
            unreachable!()
        };
        ResolvedEntity {
            entity: Entity::new(EntityKind::Test, "/tests/smoke").with_metadata(metadata),
            locator: Locator::new("https://example.com/repo", "/tests/smoke").with_ref("main"),
        }
    }

    pub fn resolved_plan() -> ResolvedEntity {
        let serde_json::Value::Object(metadata) = json!({
            "summary": "Basic plan",
            "execute": {"how": "tmt"},
        }) else {
            unreachable!()
        };
        ResolvedEntity {
            entity: Entity::new(EntityKind::Plan, "/plans/basic").with_metadata(metadata),
            locator: Locator::new("https://example.com/repo", "/plans/basic").with_path("/meta"),
        }
    }
}
