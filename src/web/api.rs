//! Defines the Axum routes mapping HTTP onto the device networks.
//!
//! `POST /node/{id}?state=on` sets parameters on a Z-Wave node, `GET /node/{id}`
//! returns its tracked parameters form-encoded. `/enocean/{id}` does the same
//! for EnOcean devices, with the id in hex.

use crate::network::NetworkHandle;
use crate::parameters::Parameters;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::Response,
    routing::get,
};

pub const SERVER_NAME: &str = "mesh-gateway";

/// Request channels of the configured networks.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub zwave: Option<NetworkHandle>,
    pub enocean: Option<NetworkHandle>,
}

/// Creates the Axum router with all the API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/node/{id}", get(get_zwave).post(set_zwave))
        .route("/enocean/{id}", get(get_enocean).post(set_enocean))
        .layer(middleware::map_response(server_header))
        .with_state(state)
}

async fn server_header(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
    response
}

fn enocean_id(text: &str) -> Result<u32, StatusCode> {
    u32::from_str_radix(text, 16).map_err(|_| StatusCode::BAD_REQUEST)
}

async fn set_node(
    network: Option<&NetworkHandle>,
    id: u32,
    parameters: Parameters,
) -> Result<StatusCode, StatusCode> {
    let network = network.ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    match network.set(id, parameters).await {
        Ok(true) => Ok(StatusCode::OK),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn get_node(network: Option<&NetworkHandle>, id: u32) -> Result<Form<Parameters>, StatusCode> {
    let network = network.ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    match network.get(id).await {
        Ok(Some(parameters)) => Ok(Form(parameters)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn set_zwave(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Query(parameters): Query<Parameters>,
) -> Result<StatusCode, StatusCode> {
    set_node(state.zwave.as_ref(), id, parameters).await
}

async fn get_zwave(State(state): State<AppState>, Path(id): Path<u32>) -> Result<Form<Parameters>, StatusCode> {
    get_node(state.zwave.as_ref(), id).await
}

async fn set_enocean(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(parameters): Query<Parameters>,
) -> Result<StatusCode, StatusCode> {
    set_node(state.enocean.as_ref(), enocean_id(&id)?, parameters).await
}

async fn get_enocean(State(state): State<AppState>, Path(id): Path<String>) -> Result<Form<Parameters>, StatusCode> {
    get_node(state.enocean.as_ref(), enocean_id(&id)?).await
}
