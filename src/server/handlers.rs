use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

use crate::leads::{Contact, Lead, LeadError, LeadStatus, NewLead};
use crate::location::{builtin_locality_list, lookup_uncached, LocalityInfo, LocationError, LocationResolver, ResolvedAddress};
use crate::pricing::{Catalog, QuoteRequest};
use crate::quote::{QuoteError, QuoteOutput};
use crate::zone::{Coordinates, Polygon, ZoneError, ZoneResolution, ZoneTier};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

impl From<ZoneError> for ApiError {
    fn from(e: ZoneError) -> Self {
        api_error(StatusCode::BAD_REQUEST, e.to_string())
    }
}

impl From<QuoteError> for ApiError {
    fn from(e: QuoteError) -> Self {
        match e {
            QuoteError::Zone(z) => z.into(),
            QuoteError::Pricing(p) => api_error(StatusCode::UNPROCESSABLE_ENTITY, p.to_string()),
        }
    }
}

impl From<LeadError> for ApiError {
    fn from(e: LeadError) -> Self {
        match e {
            LeadError::NotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
            LeadError::InvalidContact(_) => api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            LeadError::Io { .. } | LeadError::Parse { .. } => {
                tracing::error!(error = %e, "lead store failure");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "lead store unavailable")
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        api_error(e.status(), e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        api_error(e.status(), e.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        api_error(e.status(), e.body_text())
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, ApiError> {
    m.lock()
        .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "state lock poisoned"))
}

// ─── Site location ───────────────────────────────────────────────

/// Geocode on the blocking pool. The resolver lock covers only the cache
/// lookup and the cache write, never the network round trip.
async fn geocode(state: &Arc<AppState>, address: String) -> Result<Result<ResolvedAddress, LocationError>, ApiError> {
    let offline = {
        let resolver = lock(&state.resolver)?;
        if let Some(hit) = resolver.cached(&address) {
            return Ok(Ok(hit));
        }
        resolver.is_offline()
    };

    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || -> Result<Result<ResolvedAddress, LocationError>, ApiError> {
        let result = lookup_uncached(&address, offline);
        if let Ok(loc) = &result {
            lock(&state.resolver)?.remember(&address, loc);
        }
        Ok(result)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("geocoder task failed: {}", e)))?
}

/// Coordinates win over an address. An address that cannot be geocoded
/// leaves the site unlocated, which prices it in the review tier.
async fn locate_site(
    state: &Arc<AppState>,
    lat: Option<f64>,
    lon: Option<f64>,
    address: Option<&str>,
) -> Result<Option<ResolvedAddress>, ApiError> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            let c = Coordinates::checked(lat, lon)?;
            return Ok(Some(LocationResolver::from_manual(c)));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(api_error(StatusCode::BAD_REQUEST, "Provide both 'lat' and 'lon'"));
        }
        (None, None) => {}
    }

    let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };
    match geocode(state, address.to_string()).await? {
        Ok(loc) => Ok(Some(loc)),
        Err(e) => {
            tracing::warn!(address, error = %e, "site address not geocoded, quoting as review");
            Ok(None)
        }
    }
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timezone": state.tz.name(),
        "now": chrono::Utc::now().with_timezone(&state.tz).to_rfc3339(),
    }))
}

// ─── GET /api/catalog ────────────────────────────────────────────

pub async fn catalog(State(state): State<Arc<AppState>>) -> Json<Catalog> {
    Json(state.quoter.catalog().clone())
}

// ─── GET /api/zones ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct ZonesResponse {
    priority: Option<Polygon>,
    standard: Option<Polygon>,
    extended: Option<Polygon>,
}

pub async fn zones(State(state): State<Arc<AppState>>) -> Json<ZonesResponse> {
    let area = state.quoter.area();
    Json(ZonesResponse {
        priority: area.polygon(ZoneTier::Priority).cloned(),
        standard: area.polygon(ZoneTier::Standard).cloned(),
        extended: area.polygon(ZoneTier::Extended).cloned(),
    })
}

pub async fn localities() -> Json<Vec<LocalityInfo>> {
    Json(builtin_locality_list())
}

// ─── GET /api/zone ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ZoneQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub async fn zone(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ZoneQuery>, QueryRejection>,
) -> Result<Json<ZoneResolution>, ApiError> {
    let Query(params) = params?;
    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Provide 'lat' and 'lon' parameters"));
    };
    let resolution = state.quoter.resolve_zone(Some(Coordinates::new(lat, lon)))?;
    Ok(Json(resolution))
}

// ─── GET /api/geocode ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GeocodeQuery {
    pub address: Option<String>,
}

#[derive(Serialize)]
pub struct GeocodeResponse {
    pub location: ResolvedAddress,
    pub zone: ZoneResolution,
}

pub async fn geocode_address(
    State(state): State<Arc<AppState>>,
    params: Result<Query<GeocodeQuery>, QueryRejection>,
) -> Result<Json<GeocodeResponse>, ApiError> {
    let Query(params) = params?;
    let address = params.address.unwrap_or_default();
    let location = match geocode(&state, address).await? {
        Ok(loc) => loc,
        Err(e @ LocationError::NoInput) => return Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ LocationError::NotFound(_)) => return Err(api_error(StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => return Err(api_error(StatusCode::BAD_GATEWAY, e.to_string())),
    };
    let zone = state.quoter.resolve_zone(Some(location.coordinates))?;
    Ok(Json(GeocodeResponse { location, zone }))
}

// ─── POST /api/quote ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct QuoteBody {
    #[serde(flatten)]
    pub request: QuoteRequest,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub quote: QuoteOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ResolvedAddress>,
}

pub async fn quote(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QuoteBody>, JsonRejection>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let Json(body) = body?;
    let start = Instant::now();
    let location = locate_site(&state, body.lat, body.lon, body.address.as_deref()).await?;
    let quote = state.quoter.quote(&body.request, location.as_ref().map(|l| l.coordinates))?;

    tracing::info!(
        pack = %body.request.pack_id,
        zone = %quote.zone.tier,
        total = quote.breakdown.total,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "quote computed"
    );
    Ok(Json(QuoteResponse { quote, location }))
}

// ─── /api/leads ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LeadBody {
    pub contact: Contact,
    pub quote: QuoteRequest,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LeadBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let Json(body) = body?;
    let location = locate_site(&state, body.lat, body.lon, body.address.as_deref()).await?;
    let coordinates = location.as_ref().map(|l| l.coordinates);
    let quote = state.quoter.quote(&body.quote, coordinates)?;

    let lead = lock(&state.leads)?.create(NewLead {
        contact: body.contact,
        address: body.address,
        coordinates,
        quote,
        notes: body.notes,
    })?;
    Ok((StatusCode::CREATED, Json(lead)))
}

#[derive(Deserialize)]
pub struct LeadListQuery {
    pub status: Option<String>,
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LeadListQuery>, QueryRejection>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let Query(params) = params?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<LeadStatus>)
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let leads = lock(&state.leads)?;
    Ok(Json(leads.list(status).into_iter().cloned().collect()))
}

pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Lead>, ApiError> {
    let Path(id) = id?;
    let leads = lock(&state.leads)?;
    leads
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| LeadError::NotFound(id).into())
}

#[derive(Deserialize)]
pub struct LeadPatch {
    pub status: LeadStatus,
}

pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    patch: Result<Json<LeadPatch>, JsonRejection>,
) -> Result<Json<Lead>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = patch?;
    let lead = lock(&state.leads)?.set_status(id, patch.status)?;
    Ok(Json(lead))
}
