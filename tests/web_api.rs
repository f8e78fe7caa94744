use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use mesh_gateway::link::LinkError;
use mesh_gateway::network::{Network, NetworkHandle};
use mesh_gateway::parameters::Parameters;
use mesh_gateway::web::api::{AppState, SERVER_NAME, create_router};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tower::util::ServiceExt;

/// Network with one known node (2) that records every set.
#[derive(Default)]
struct StubNetwork {
    sets: Arc<Mutex<Vec<(u32, Parameters)>>>,
}

impl Network for StubNetwork {
    fn transport(&self) -> &'static str {
        "stub"
    }

    fn set(&mut self, node: u32, parameters: &Parameters) -> bool {
        self.sets.lock().unwrap().push((node, parameters.clone()));
        node == 2
    }

    fn get(&self, node: u32, parameters: &mut Parameters) -> bool {
        parameters.insert("node.name", node.to_string());
        if node != 2 {
            return false;
        }
        parameters.set_state("state", true);
        true
    }

    fn receive(&mut self, _bytes: &[u8]) {}

    fn on_timeout(&mut self) {}

    fn deadline(&self) -> Option<Instant> {
        None
    }

    fn take_output(&mut self) -> Vec<u8> {
        Vec::new()
    }

    fn on_transport_error(&mut self, _error: &LinkError) {}

    fn close(&mut self) {}
}

fn spawn_stub() -> (NetworkHandle, Arc<Mutex<Vec<(u32, Parameters)>>>) {
    let mut network = StubNetwork::default();
    let sets = network.sets.clone();
    let (handle, mut requests) = NetworkHandle::channel(4);
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            request.apply(&mut network);
        }
    });
    (handle, sets)
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_get_known_node_returns_form_body() {
    let (handle, _) = spawn_stub();
    let app = create_router(AppState { zwave: Some(handle), enocean: None });

    let response = app.oneshot(request("GET", "/node/2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::SERVER], SERVER_NAME);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"node.name=2&state=on");
}

#[tokio::test]
async fn test_get_unknown_node_is_not_found() {
    let (handle, _) = spawn_stub();
    let app = create_router(AppState { zwave: Some(handle), enocean: None });

    let response = app.oneshot(request("GET", "/node/7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::SERVER], SERVER_NAME);
}

#[tokio::test]
async fn test_post_passes_query_parameters() {
    let (handle, sets) = spawn_stub();
    let app = create_router(AppState { zwave: Some(handle), enocean: None });

    let response = app
        .clone()
        .oneshot(request("POST", "/node/2?state=off&dim=40"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(request("POST", "/node/9?state=on")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let sets = sets.lock().unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].0, 2);
    assert_eq!(sets[0].1.get("state"), Some("off"));
    assert_eq!(sets[0].1.get_percentage("dim"), Some(40));
}

#[tokio::test]
async fn test_enocean_id_is_hex() {
    let (handle, sets) = spawn_stub();
    let app = create_router(AppState { zwave: None, enocean: Some(handle) });

    let response = app.clone().oneshot(request("GET", "/enocean/2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(request("GET", "/enocean/zz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.oneshot(request("POST", "/enocean/1a?state=on")).await.unwrap();
    assert_eq!(sets.lock().unwrap()[0].0, 0x1a);
}

#[tokio::test]
async fn test_missing_network_is_unavailable() {
    let app = create_router(AppState::default());
    let response = app.clone().oneshot(request("GET", "/node/2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let response = app.oneshot(request("POST", "/enocean/01?state=on")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_stopped_network_is_unavailable() {
    let (handle, requests) = NetworkHandle::channel(1);
    drop(requests);
    let app = create_router(AppState { zwave: Some(handle), enocean: None });
    let response = app.oneshot(request("GET", "/node/2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_non_numeric_node_id_is_rejected() {
    let app = create_router(AppState::default());
    let response = app.oneshot(request("GET", "/node/abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
