//! Resolution pipeline: fetch, locate, render.
//!
//! Each locator is fetched into its own private snapshot, the snapshot's
//! tree is scanned for the first entity with the exact requested name, and
//! the result is rendered in the requested format.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::adapters::renderers::RendererRegistry;
use crate::domain::errors::{ResolutionError, TreeError};
use crate::domain::models::{
    find_first, Entity, EntityKind, Locator, ResolutionRequest, ResolvedEntity, Target,
};
use crate::domain::ports::{RepositoryFetcher, TreeLoader};

/// Outcome of a resolution that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Rendered payload in the requested format
    Rendered(String),
    /// A requested entity does not exist in its tree
    NotFound,
}

impl Resolution {
    pub fn into_payload(self) -> Option<String> {
        match self {
            Self::Rendered(payload) => Some(payload),
            Self::NotFound => None,
        }
    }
}

pub struct ResolutionPipeline {
    fetcher: Arc<dyn RepositoryFetcher>,
    trees: Arc<dyn TreeLoader>,
    renderers: RendererRegistry,
}

impl ResolutionPipeline {
    pub fn new(
        fetcher: Arc<dyn RepositoryFetcher>,
        trees: Arc<dyn TreeLoader>,
        renderers: RendererRegistry,
    ) -> Self {
        Self {
            fetcher,
            trees,
            renderers,
        }
    }

    /// Resolve a validated request.
    ///
    /// With both a test and a plan, both are fetched before anything is
    /// rendered; a fetch failure on either side fails the whole request.
    #[instrument(skip(self, request), fields(format = %request.format))]
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<Resolution, ResolutionError> {
        let target = request.target().ok_or_else(|| {
            ResolutionError::Internal("request names neither a test nor a plan".to_string())
        })?;
        let renderer = self.renderers.get(request.format)?;

        let rendered = match target {
            Target::Test(locator) => match self.locate(locator, EntityKind::Test).await? {
                Some(test) => renderer.render_test(&test)?,
                None => return Ok(Resolution::NotFound),
            },
            Target::Plan(locator) => match self.locate(locator, EntityKind::Plan).await? {
                Some(plan) => renderer.render_plan(&plan)?,
                None => return Ok(Resolution::NotFound),
            },
            Target::TestAndPlan { test, plan } => {
                let test = self.locate(test, EntityKind::Test).await?;
                let plan = self.locate(plan, EntityKind::Plan).await?;
                match (test, plan) {
                    (Some(test), Some(plan)) => renderer.render_test_plan(&test, &plan)?,
                    _ => return Ok(Resolution::NotFound),
                }
            }
        };

        info!(bytes = rendered.len(), "Resolution rendered");
        Ok(Resolution::Rendered(rendered))
    }

    /// Fetch the locator's repository and find the first entity of `kind`
    /// named exactly `locator.name`.
    #[instrument(skip(self), fields(url = %locator.url, name = %locator.name, git_ref = %locator.git_ref))]
    async fn locate(
        &self,
        locator: &Locator,
        kind: EntityKind,
    ) -> Result<Option<ResolvedEntity>, ResolutionError> {
        let snapshot = self.fetcher.fetch(&locator.url, &locator.git_ref).await?;

        let trees = Arc::clone(&self.trees);
        let root: PathBuf = snapshot.root().to_path_buf();
        let path = locator.path.clone();
        let name = locator.name.clone();

        let found = tokio::task::spawn_blocking(move || -> Result<Option<Entity>, TreeError> {
            let tree = trees.load(&root, path.as_deref())?;
            let entities = match kind {
                EntityKind::Test => tree.tests(),
                EntityKind::Plan => tree.plans(),
            };
            Ok(find_first(entities, &name).cloned())
        })
        .await??;

        // The snapshot directory must outlive the tree scan.
        drop(snapshot);

        match found {
            Some(entity) => {
                debug!(kind = kind.as_str(), "Entity found");
                Ok(Some(ResolvedEntity {
                    entity,
                    locator: locator.clone(),
                }))
            }
            None => {
                warn!(kind = kind.as_str(), "Entity not found");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for ResolutionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionPipeline")
            .field("renderers", &self.renderers)
            .finish_non_exhaustive()
    }
}
