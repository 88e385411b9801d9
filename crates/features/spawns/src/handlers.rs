//! HTTP surface of the slice.

use crate::Spawns;
use crate::error::SpawnError;
use crate::model::{BagEntry, BagView, NearbyBranch, SpawnInstance};
use crate::service::NearbyQuery;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::Utc;
use fauna_derive::{api_handler, api_model};
use fauna_domain::constants::{BAG_TAG, BRANCHES_TAG};
use fauna_kernel::prelude::{ApiError, ApiJson, ApiResult, ApiState, FieldIssue, Success};
use serde_json::Value;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

impl From<SpawnError> for ApiError {
    fn from(err: SpawnError) -> Self {
        match err {
            SpawnError::Validation { field, message } => Self::validation(field, message),
            SpawnError::NotFound { message } => Self::NotFound { message },
            SpawnError::Conflict { message } => Self::Conflict { message },
            err @ SpawnError::Storage { .. } => {
                Self::Internal { message: "Storage failure".into(), context: Some(err.to_string().into()) }
            }
            err => Self::Internal { message: "Internal error".into(), context: Some(err.to_string().into()) },
        }
    }
}

/// Point to search around. Coordinates may be numbers or numeric strings.
#[api_model]
pub struct NearbyRequest {
    #[serde(default, alias = "lat")]
    #[schema(value_type = Option<f64>, example = 19.4326)]
    pub latitude: Option<Value>,
    #[serde(default, alias = "long")]
    #[schema(value_type = Option<f64>, example = -99.1332)]
    pub longitude: Option<Value>,
    /// Metres, defaults to the configured radius.
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub max_distance: Option<Value>,
}

impl NearbyRequest {
    fn into_query(self) -> Result<NearbyQuery, ApiError> {
        let mut issues = Vec::new();
        let mut read = |value: Option<Value>, field: &'static str| {
            number(value, field).unwrap_or_else(|issue| {
                issues.push(issue);
                None
            })
        };
        let query = NearbyQuery {
            latitude: read(self.latitude, "latitude"),
            longitude: read(self.longitude, "longitude"),
            max_distance: read(self.max_distance, "maxDistance"),
        };

        if issues.is_empty() { Ok(query) } else { Err(ApiError::Validation { issues }) }
    }
}

fn number(value: Option<Value>, field: &'static str) -> Result<Option<f64>, FieldIssue> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed.map(Some).ok_or_else(|| FieldIssue::new(field, "must be a number"))
}

#[api_model]
pub struct ClaimRequest {
    #[serde(default)]
    pub player: String,
    #[serde(default, alias = "animalBranch")]
    pub spawn_instance_id: String,
}

#[api_model]
pub struct BagRequest {
    #[serde(default)]
    pub player: String,
}

#[api_handler(
    post,
    path = "/api/branches/nearby",
    request_body = NearbyRequest,
    responses(
        (status = OK, description = "Branches ordered by distance", body = Vec<NearbyBranch>),
        (status = BAD_REQUEST, description = "Missing or invalid coordinates", body = Vec<FieldIssue>),
    ),
    tag = BRANCHES_TAG,
)]
pub async fn nearby_handler(
    State(spawns): State<Spawns>,
    ApiJson(request): ApiJson<NearbyRequest>,
) -> ApiResult<Vec<NearbyBranch>> {
    let query = request.into_query()?;
    Ok(Success(spawns.service.nearby(query).await?))
}

#[api_handler(
    get,
    path = "/api/branches/{id}/spawns",
    params(("id" = String, Path, description = "Branch id")),
    responses(
        (status = OK, description = "Active spawns, topped up to capacity", body = Vec<SpawnInstance>),
        (status = NOT_FOUND, description = "Unknown branch", body = Vec<FieldIssue>),
        (status = CONFLICT, description = "Branch busy", body = Vec<FieldIssue>),
    ),
    tag = BRANCHES_TAG,
)]
pub async fn active_spawns_handler(
    State(spawns): State<Spawns>,
    Path(id): Path<String>,
) -> ApiResult<Vec<SpawnInstance>> {
    Ok(Success(spawns.service.active_spawns(&id, Utc::now()).await?))
}

#[api_handler(
    post,
    path = "/api/bag/claim",
    request_body = ClaimRequest,
    responses(
        (status = OK, description = "Spawn moved into the bag", body = BagEntry),
        (status = BAD_REQUEST, description = "Empty player or spawn id", body = Vec<FieldIssue>),
        (status = NOT_FOUND, description = "Unknown spawn", body = Vec<FieldIssue>),
        (status = CONFLICT, description = "Spawn expired or already claimed", body = Vec<FieldIssue>),
    ),
    tag = BAG_TAG,
)]
pub async fn claim_handler(
    State(spawns): State<Spawns>,
    ApiJson(request): ApiJson<ClaimRequest>,
) -> ApiResult<BagEntry> {
    let entry = spawns.service.claim(&request.player, &request.spawn_instance_id, Utc::now()).await?;
    Ok(Success(entry))
}

#[api_handler(
    post,
    path = "/api/bag",
    request_body = BagRequest,
    responses(
        (status = OK, description = "Bag entries, newest first", body = Vec<BagView>),
        (status = BAD_REQUEST, description = "Empty player id", body = Vec<FieldIssue>),
    ),
    tag = BAG_TAG,
)]
pub async fn list_bag_handler(
    State(spawns): State<Spawns>,
    ApiJson(request): ApiJson<BagRequest>,
) -> ApiResult<Vec<BagView>> {
    Ok(Success(spawns.service.list_bag(&request.player).await?))
}

#[api_handler(
    post,
    path = "/api/bag/{id}/release",
    params(("id" = String, Path, description = "Bag entry id")),
    responses(
        (status = OK, description = "Entry marked delivered", body = BagEntry),
        (status = NOT_FOUND, description = "Unknown bag entry", body = Vec<FieldIssue>),
    ),
    tag = BAG_TAG,
)]
pub async fn release_handler(State(spawns): State<Spawns>, Path(id): Path<String>) -> ApiResult<BagEntry> {
    Ok(Success(spawns.service.release(&id, Utc::now()).await?))
}

/// Routes of the slice, bound to its state.
///
/// Older clients still call the legacy paths; those stay out of the API docs.
pub fn router(spawns: Spawns) -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(nearby_handler))
        .routes(routes!(active_spawns_handler))
        .routes(routes!(claim_handler))
        .routes(routes!(list_bag_handler))
        .routes(routes!(release_handler))
        .route("/api/branches-nearby", post(nearby_handler))
        .route("/api/branches/{id}/animals", get(active_spawns_handler))
        .route("/api/bag/add-animal", post(claim_handler))
        .route("/api/animal-release/{id}", post(release_handler))
        .with_state(spawns)
}
