use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use clap::Parser;
use labwork_api::{
    ApiError, CreateCoordinatesRequest, CreateDisciplineRequest, CreateLabWorkRequest,
    CreateLocationRequest, CreatePersonRequest, CreateRequest, DecreaseDifficultyRequest,
    LabWorkApi, UpdateCoordinatesRequest, UpdateDisciplineRequest, UpdateLabWorkRequest,
    UpdateLocationRequest, UpdatePersonRequest, UpdateRequest, API_CONTRACT_VERSION,
};
use labwork_core::{Coordinates, Discipline, DomainError, Id, LabWork, Location, Person, Project};
use labwork_store_sqlite::SqlEntity;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const SERVICE_CONTRACT_VERSION: &str = "service.v1";

#[derive(Debug, Clone)]
struct ServiceState {
    api: LabWorkApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    #[serde(skip)]
    status: StatusCode,
    service_contract_version: &'static str,
    kind: &'static str,
    error: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MigrateRequest {
    dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum View {
    #[default]
    Shallow,
    Full,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct ViewQuery {
    #[serde(default)]
    view: View,
}

#[derive(Debug, Parser)]
#[command(name = "labwork-service")]
#[command(about = "Local HTTP service for the LabWork registry")]
struct Args {
    #[arg(long, default_value = "./labwork.sqlite3")]
    db: PathBuf,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
    /// Fallback filter when `LABWORK_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// An entity kind served under `/v1/{COLLECTION}`.
trait Resource: Project + SqlEntity + Send + 'static {
    const COLLECTION: &'static str;
    type Create: CreateRequest<Entity = Self> + DeserializeOwned + Send + 'static;
    type Update: UpdateRequest<Entity = Self> + DeserializeOwned + Send + 'static;
}

impl Resource for Coordinates {
    const COLLECTION: &'static str = "coordinates";
    type Create = CreateCoordinatesRequest;
    type Update = UpdateCoordinatesRequest;
}

impl Resource for Location {
    const COLLECTION: &'static str = "locations";
    type Create = CreateLocationRequest;
    type Update = UpdateLocationRequest;
}

impl Resource for Discipline {
    const COLLECTION: &'static str = "disciplines";
    type Create = CreateDisciplineRequest;
    type Update = UpdateDisciplineRequest;
}

impl Resource for Person {
    const COLLECTION: &'static str = "persons";
    type Create = CreatePersonRequest;
    type Update = UpdatePersonRequest;
}

impl Resource for LabWork {
    const COLLECTION: &'static str = "labworks";
    type Create = CreateLabWorkRequest;
    type Update = UpdateLabWorkRequest;
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        let (status, kind) = match &err {
            ApiError::Domain(domain) => (status_for(domain), domain.kind()),
            ApiError::Open(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(kind, error = %err, "request rejected");
        }
        ServiceError {
            status,
            service_contract_version: SERVICE_CONTRACT_VERSION,
            kind,
            error: err.to_string(),
        }
    }
}

fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::InvalidArgument(_) | DomainError::IntegrityViolation(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

fn resource_routes<E: Resource>(router: Router<ServiceState>) -> Router<ServiceState> {
    let collection = format!("/v1/{}", E::COLLECTION);
    let member = format!("{collection}/:id");
    router
        .route(&collection, get(list_resource::<E>).post(create_resource::<E>))
        .route(
            &member,
            get(get_resource::<E>).put(update_resource::<E>).delete(delete_resource::<E>),
        )
}

fn app(state: ServiceState) -> Router {
    let router = Router::new()
        .route("/v1/health", get(health))
        .route("/v1/db/schema-version", get(db_schema_version))
        .route("/v1/db/migrate", post(db_migrate))
        .route("/v1/db/integrity", get(db_integrity))
        .route("/v1/aggregates/minimal-point-sum", get(minimal_point_sum))
        .route("/v1/aggregates/author-count/:author_id", get(author_count))
        .route("/v1/bulk/minimal-point/:value", delete(bulk_delete_by_minimal_point))
        .route("/v1/labworks/:id/decrease-difficulty", post(decrease_difficulty))
        .route("/v1/disciplines/:id/assign-top-hardest", post(assign_top_hardest));
    let router = resource_routes::<Coordinates>(router);
    let router = resource_routes::<Location>(router);
    let router = resource_routes::<Discipline>(router);
    let router = resource_routes::<Person>(router);
    let router = resource_routes::<LabWork>(router);
    router.with_state(state)
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("LABWORK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let state = ServiceState { api: LabWorkApi::new(args.db.clone()) };
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(bind = %args.bind, db = %args.db.display(), "labwork service listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health() -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok" }))
}

async fn db_schema_version(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<labwork_store_sqlite::SchemaStatus>>, ServiceError> {
    let status = state.api.schema_status()?;
    Ok(Json(envelope(status)))
}

async fn db_migrate(
    State(state): State<ServiceState>,
    Json(request): Json<MigrateRequest>,
) -> Result<Json<ServiceEnvelope<labwork_api::MigrateResult>>, ServiceError> {
    let result = state.api.migrate(request.dry_run)?;
    Ok(Json(envelope(result)))
}

async fn db_integrity(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<labwork_store_sqlite::IntegrityReport>>, ServiceError> {
    let report = state.api.integrity_check()?;
    Ok(Json(envelope(report)))
}

async fn list_resource<E: Resource>(
    State(state): State<ServiceState>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, ServiceError> {
    let response = match query.view {
        View::Shallow => Json(envelope(state.api.list::<E>()?)).into_response(),
        View::Full => Json(envelope(state.api.list_full::<E>()?)).into_response(),
    };
    Ok(response)
}

async fn get_resource<E: Resource>(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, ServiceError> {
    let id = Id::<E>::new(id);
    let response = match query.view {
        View::Shallow => Json(envelope(state.api.get(id)?)).into_response(),
        View::Full => Json(envelope(state.api.get_full(id)?)).into_response(),
    };
    Ok(response)
}

async fn create_resource<E: Resource>(
    State(state): State<ServiceState>,
    Json(request): Json<E::Create>,
) -> Result<Response, ServiceError> {
    let created = state.api.create(request)?;
    Ok((StatusCode::CREATED, Json(envelope(created))).into_response())
}

async fn update_resource<E: Resource>(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
    Json(request): Json<E::Update>,
) -> Result<Response, ServiceError> {
    let updated = state.api.update(Id::<E>::new(id), request)?;
    Ok(Json(envelope(updated)).into_response())
}

async fn delete_resource<E: Resource>(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.api.delete(Id::<E>::new(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn minimal_point_sum(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<labwork_core::SumResult>>, ServiceError> {
    let result = state.api.sum_minimal_point()?;
    Ok(Json(envelope(result)))
}

async fn author_count(
    State(state): State<ServiceState>,
    Path(author_id): Path<i64>,
) -> Result<Json<ServiceEnvelope<labwork_core::CountResult>>, ServiceError> {
    let result = state.api.count_by_author_id_greater_than(author_id)?;
    Ok(Json(envelope(result)))
}

async fn bulk_delete_by_minimal_point(
    State(state): State<ServiceState>,
    Path(value): Path<i64>,
) -> Result<Json<ServiceEnvelope<labwork_core::DeleteResult>>, ServiceError> {
    let result = state.api.delete_by_minimal_point(value)?;
    Ok(Json(envelope(result)))
}

async fn decrease_difficulty(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
    Json(request): Json<DecreaseDifficultyRequest>,
) -> Result<Json<ServiceEnvelope<labwork_core::LabWorkView>>, ServiceError> {
    let view = state.api.decrease_difficulty(Id::new(id), request.steps)?;
    Ok(Json(envelope(view)))
}

async fn assign_top_hardest(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<ServiceEnvelope<Vec<labwork_core::LabWorkView>>>, ServiceError> {
    let assigned = state.api.assign_top_hardest(Id::new(id))?;
    Ok(Json(envelope(assigned)))
}
