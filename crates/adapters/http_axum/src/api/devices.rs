//! JSON handlers for devices.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use fluxhub_app::registry::DeviceRegistry;
use fluxhub_domain::device::StatusReport;
use fluxhub_domain::error::FluxHubError;
use fluxhub_domain::id::DeviceId;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating a device. The id is generated when omitted.
#[derive(Debug, Default, Deserialize)]
pub struct CreateDeviceRequest {
    #[serde(default)]
    pub id: Option<String>,
}

/// Response body for a created device.
#[derive(Debug, Serialize)]
pub struct CreatedDevice {
    pub id: DeviceId,
}

/// Request body for setting the flux capacitance.
#[derive(Debug, Deserialize)]
pub struct FluxCapacitanceRequest {
    pub farads: i32,
}

/// Request body for setting the gravitational integrity.
#[derive(Debug, Deserialize)]
pub struct GravitationalIntegrityRequest {
    pub units: f64,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<DeviceId>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the endpoints returning one device report.
pub enum ReportResponse {
    Ok(Json<StatusReport>),
}

impl IntoResponse for ReportResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the status-of-all endpoint.
pub enum StatusAllResponse {
    Ok(Json<Vec<StatusReport>>),
}

impl IntoResponse for StatusAllResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<CreatedDevice>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the remove endpoint.
pub enum RemoveResponse {
    NoContent,
}

impl IntoResponse for RemoveResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

fn parse_id(raw: &str) -> Result<DeviceId, ApiError> {
    raw.parse::<DeviceId>()
        .map_err(|err| ApiError::from(FluxHubError::from(err)))
}

/// `GET /api/devices`
pub async fn list<R>(State(state): State<AppState<R>>) -> ListResponse
where
    R: DeviceRegistry + 'static,
{
    ListResponse::Ok(Json(state.device_service.list_devices().await))
}

/// `POST /api/devices`
pub async fn create<R>(
    State(state): State<AppState<R>>,
    body: Option<Json<CreateDeviceRequest>>,
) -> Result<CreateResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let id = req.id.as_deref().map(parse_id).transpose()?;
    let id = state.device_service.create_device(id).await?;
    Ok(CreateResponse::Created(Json(CreatedDevice { id })))
}

/// `DELETE /api/devices/{id}`
pub async fn remove<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<RemoveResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let id = parse_id(&id)?;
    state.device_service.remove_device(&id).await?;
    Ok(RemoveResponse::NoContent)
}

/// `GET /api/devices/{id}`
pub async fn status<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<ReportResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let id = parse_id(&id)?;
    let report = state.device_service.status(&id).await?;
    Ok(ReportResponse::Ok(Json(report)))
}

/// `GET /api/status`
pub async fn status_all<R>(
    State(state): State<AppState<R>>,
) -> Result<StatusAllResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let reports = state.device_service.status_all().await?;
    Ok(StatusAllResponse::Ok(Json(reports)))
}

/// `POST /api/devices/{id}/start`
pub async fn start<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<ReportResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let id = parse_id(&id)?;
    let report = state.device_service.start(&id).await?;
    Ok(ReportResponse::Ok(Json(report)))
}

/// `POST /api/devices/{id}/stop`
pub async fn stop<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<ReportResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let id = parse_id(&id)?;
    let report = state.device_service.stop(&id).await?;
    Ok(ReportResponse::Ok(Json(report)))
}

/// `POST /api/devices/{id}/pause`
pub async fn pause<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<ReportResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let id = parse_id(&id)?;
    let report = state.device_service.pause(&id).await?;
    Ok(ReportResponse::Ok(Json(report)))
}

/// `POST /api/devices/{id}/resume`
pub async fn resume<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<ReportResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let id = parse_id(&id)?;
    let report = state.device_service.resume(&id).await?;
    Ok(ReportResponse::Ok(Json(report)))
}

/// `PUT /api/devices/{id}/flux-capacitance`
pub async fn set_flux_capacitance<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    Json(req): Json<FluxCapacitanceRequest>,
) -> Result<ReportResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let id = parse_id(&id)?;
    let report = state
        .device_service
        .set_flux_capacitance(&id, req.farads)
        .await?;
    Ok(ReportResponse::Ok(Json(report)))
}

/// `PUT /api/devices/{id}/gravitational-integrity`
pub async fn set_gravitational_integrity<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    Json(req): Json<GravitationalIntegrityRequest>,
) -> Result<ReportResponse, ApiError>
where
    R: DeviceRegistry + 'static,
{
    let id = parse_id(&id)?;
    let report = state
        .device_service
        .set_gravitational_integrity(&id, req.units)
        .await?;
    Ok(ReportResponse::Ok(Json(report)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fluxhub_app::registry::{Registry, RegistryOptions};
    use fluxhub_app::services::device_service::DeviceService;
    use fluxhub_app::state_store::NoopStateStore;
    use fluxhub_domain::registry::RegistryPolicy;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::state::AppState;

    fn app(policy: RegistryPolicy) -> Router {
        let registry = Registry::new(policy, Arc::new(NoopStateStore), RegistryOptions::default());
        crate::router::build(AppState::new(DeviceService::new(registry)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn should_create_and_drive_device() {
        let app = app(RegistryPolicy::Eager);

        let (status, body) = call(&app, "POST", "/api/devices", Some(json!({"id": "dev-1"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"id": "dev-1"}));

        let (status, body) = call(&app, "POST", "/api/devices/dev-1/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert_eq!(body["flux_capacitance"], 1);

        let (status, body) = call(
            &app,
            "PUT",
            "/api/devices/dev-1/flux-capacitance",
            Some(json!({"farads": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flux_capacitance"], 42);

        let (status, body) = call(
            &app,
            "PUT",
            "/api/devices/dev-1/gravitational-integrity",
            Some(json!({"units": 0.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gravitational_integrity"], 0.5);

        let (status, body) = call(&app, "GET", "/api/devices/dev-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "dev-1");
        assert!(body["uptime_ms"].is_u64());
    }

    #[tokio::test]
    async fn should_generate_id_when_body_is_empty() {
        let app = app(RegistryPolicy::Eager);

        let (status, body) = call(&app, "POST", "/api/devices", None).await;

        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();
        let (_, list) = call(&app, "GET", "/api/devices", None).await;
        assert_eq!(list, json!([id]));
    }

    #[tokio::test]
    async fn should_return_conflict_on_illegal_transition() {
        let app = app(RegistryPolicy::Eager);
        call(&app, "POST", "/api/devices", Some(json!({"id": "dev-1"}))).await;

        let (status, body) = call(&app, "POST", "/api/devices/dev-1/pause", None).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "cannot pause device: not running");
    }

    #[tokio::test]
    async fn should_return_conflict_on_duplicate_id() {
        let app = app(RegistryPolicy::Eager);
        call(&app, "POST", "/api/devices", Some(json!({"id": "dev-1"}))).await;

        let (status, _) = call(&app, "POST", "/api/devices", Some(json!({"id": "dev-1"}))).await;

        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn should_return_bad_request_on_blank_id() {
        let app = app(RegistryPolicy::Eager);

        let (status, body) = call(&app, "POST", "/api/devices", Some(json!({"id": "  "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "device id must not be empty");
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_device() {
        let app = app(RegistryPolicy::Eager);

        let (status, _) = call(&app, "GET", "/api/devices/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "DELETE", "/api/devices/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_remove_device() {
        let app = app(RegistryPolicy::Eager);
        call(&app, "POST", "/api/devices", Some(json!({"id": "dev-1"}))).await;

        let (status, _) = call(&app, "DELETE", "/api/devices/dev-1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, "GET", "/api/devices/dev-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_report_status_of_all_devices() {
        let app = app(RegistryPolicy::Eager);
        call(&app, "POST", "/api/devices", Some(json!({"id": "b"}))).await;
        call(&app, "POST", "/api/devices", Some(json!({"id": "a"}))).await;
        call(&app, "POST", "/api/devices/a/start", None).await;

        let (status, body) = call(&app, "GET", "/api/status", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "a");
        assert_eq!(body[0]["status"], "running");
        assert_eq!(body[1]["id"], "b");
        assert_eq!(body[1]["status"], "stopped");
    }

    #[tokio::test]
    async fn should_activate_on_demand_and_reject_create() {
        let app = app(RegistryPolicy::OnDemand);

        let (status, body) = call(&app, "GET", "/api/devices/anything", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "stopped");
        assert_eq!(body["uptime_ms"], 0);

        let (status, _) = call(&app, "POST", "/api/devices", Some(json!({"id": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }
}
