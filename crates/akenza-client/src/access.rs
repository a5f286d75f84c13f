//! Resolution of the organization and workspaces an API key may query.
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    api::Api,
    error::Error,
    types::{Organization, Page, WorkspaceAccess},
};

/// The visibility boundary granted to an API key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessScope {
    /// The organization the key belongs to.
    pub organization_id: String,
    /// Whether the key may read assets in every workspace.
    pub all: bool,
    /// The exhaustive set of readable workspaces when `all` is false; empty otherwise.
    pub workspace_ids: Vec<String>,
}

impl AccessScope {
    fn new(organization_id: String, access: WorkspaceAccess) -> Self {
        Self {
            organization_id,
            all: access.all,
            workspace_ids: if access.all { Vec::new() } else { access.ids },
        }
    }
}

type Resolution = Shared<BoxFuture<'static, Result<AccessScope, Error>>>;

enum Slot {
    Empty,
    Pending {
        generation: u64,
        resolution: Resolution,
    },
    Resolved(AccessScope),
}

struct State {
    slot: Slot,
    generation: u64,
}

/// Resolves the [`AccessScope`] of a data source instance exactly once.
///
/// Concurrent callers share a single in-flight resolution. A successful result is
/// kept for the lifetime of the resolver; a failure is reported to every caller
/// that was waiting on it and then forgotten, so the next call starts over.
pub struct AccessResolver {
    api: Api,
    state: Mutex<State>,
}

impl std::fmt::Debug for AccessResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessResolver")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl AccessResolver {
    pub(crate) fn new(api: Api) -> Self {
        Self {
            api,
            state: Mutex::new(State {
                slot: Slot::Empty,
                generation: 0,
            }),
        }
    }

    /// Return the access scope, resolving it first if needed.
    pub async fn resolve(&self) -> Result<AccessScope, Error> {
        let (generation, resolution) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            match &state.slot {
                Slot::Resolved(scope) => return Ok(scope.clone()),
                Slot::Pending {
                    generation,
                    resolution,
                } => (*generation, resolution.clone()),
                Slot::Empty => {
                    state.generation += 1;
                    let generation = state.generation;
                    let api = self.api.clone();
                    let resolution = async move { fetch_scope(&api).await }.boxed().shared();
                    debug!(generation, "Starting access scope resolution");
                    state.slot = Slot::Pending {
                        generation,
                        resolution: resolution.clone(),
                    };
                    (generation, resolution)
                }
            }
        };

        let result = resolution.await;

        let mut state = self.state.lock().await;
        let is_current = matches!(
            &state.slot,
            Slot::Pending { generation: g, .. } if *g == generation
        );
        if is_current {
            state.slot = match &result {
                Ok(scope) => Slot::Resolved(scope.clone()),
                Err(_) => Slot::Empty,
            };
        }
        result
    }
}

async fn fetch_scope(api: &Api) -> Result<AccessScope, Error> {
    let organization = fetch_organization(api).await?;
    let access: WorkspaceAccess = api
        .send(
            api.get("/v3/workspace-access")
                .with_query("organizationId", organization.id.as_str())
                .with_query("scope", "ASSET")
                .with_query("verb", "READ"),
        )
        .await?;
    let scope = AccessScope::new(organization.id, access);
    info!(
        organization_id = %scope.organization_id,
        all = scope.all,
        workspaces = scope.workspace_ids.len(),
        "Resolved API key access scope",
    );
    Ok(scope)
}

/// Fetch the organization of the API key: the only entry of a size-1 listing.
pub(crate) async fn fetch_organization(api: &Api) -> Result<Organization, Error> {
    let page: Page<Organization> = api.send(organizations_request(api)).await?;
    page.content
        .into_iter()
        .next()
        .ok_or_else(|| Error::unknown("API key is not associated with any organization"))
}

pub(crate) fn organizations_request(api: &Api) -> crate::transport::ApiRequest {
    api.get("/v3/organizations")
        .with_query("size", "1")
        .with_query("minimal", "true")
}
