//! Integration tests for the cluster client
//!
//! Runs the client against an in-process axum server that mimics the
//! cluster's `_cat` and reroute endpoints.
//! Run with: cargo test --test client_test -p shardmend-client

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shardmend_client::{ClientError, ClusterClient, RerouteCommand};

type Captured = Arc<Mutex<Vec<Value>>>;

/// Serve `app` on an ephemeral port and return its `host:port`
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr.to_string()
}

fn client_for(endpoint: &str) -> ClusterClient {
    ClusterClient::new(endpoint, Duration::from_secs(5)).unwrap()
}

async fn cat_nodes(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(params.get("format").map(String::as_str), Some("json"));
    assert_eq!(params.get("h").map(String::as_str), Some("ip,node.role,name"));

    Json(json!([
        {"ip": "10.0.0.1", "node.role": "m", "name": "master-0"},
        {"ip": "10.0.0.2", "node.role": "di", "name": "data-0"}
    ]))
}

async fn cat_shards() -> Json<Value> {
    Json(json!([
        {
            "index": "logs", "shard": "0", "prirep": "p", "state": "STARTED",
            "docs": "120", "store": "1.2mb", "ip": "10.0.0.2", "node": "data-0",
            "unassigned.reason": null
        },
        {
            "index": "logs", "shard": "0", "prirep": "r", "state": "UNASSIGNED",
            "docs": null, "store": null, "ip": null, "node": null,
            "unassigned.reason": "NODE_LEFT"
        }
    ]))
}

async fn reroute_ack(State(captured): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
    captured.lock().unwrap().push(body);
    Json(json!({"acknowledged": true, "state": {}}))
}

async fn reroute_nack() -> Json<Value> {
    Json(json!({"acknowledged": false}))
}

#[tokio::test]
async fn test_cat_nodes() {
    let endpoint = spawn_server(Router::new().route("/_cat/nodes", get(cat_nodes))).await;

    let nodes = client_for(&endpoint).cat_nodes().await.unwrap();

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].name, "master-0");
    assert_eq!(nodes[0].node_role, "m");
    assert_eq!(nodes[1].ip.as_deref(), Some("10.0.0.2"));
}

#[tokio::test]
async fn test_cat_shards() {
    let endpoint = spawn_server(Router::new().route("/_cat/shards", get(cat_shards))).await;

    let shards = client_for(&endpoint).cat_shards().await.unwrap();

    assert_eq!(shards.len(), 2);
    assert_eq!(shards[0].node.as_deref(), Some("data-0"));
    assert_eq!(shards[1].node, None);
    assert_eq!(shards[1].unassigned_reason.as_deref(), Some("NODE_LEFT"));
}

#[tokio::test]
async fn test_reroute_sends_allocate_empty_primary() {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/_cluster/reroute", post(reroute_ack))
        .with_state(captured.clone());
    let endpoint = spawn_server(app).await;

    client_for(&endpoint)
        .reroute(&RerouteCommand::allocate_empty_primary("logs", 4, "data-2"))
        .await
        .unwrap();

    let bodies = captured.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "commands": [{
                "allocate_empty_primary": {
                    "index": "logs",
                    "shard": 4,
                    "node": "data-2",
                    "accept_data_loss": true
                }
            }]
        })
    );
}

#[tokio::test]
async fn test_reroute_not_acknowledged() {
    let endpoint = spawn_server(Router::new().route("/_cluster/reroute", post(reroute_nack))).await;

    let result = client_for(&endpoint)
        .reroute(&RerouteCommand::allocate_empty_primary("logs", 0, "data-0"))
        .await;

    assert!(matches!(result, Err(ClientError::NotAcknowledged)));
}

#[tokio::test]
async fn test_non_success_status() {
    let app = Router::new().route(
        "/_cat/nodes",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "cluster unavailable") }),
    );
    let endpoint = spawn_server(app).await;

    let result = client_for(&endpoint).cat_nodes().await;

    match result {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "cluster unavailable");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body() {
    let app = Router::new().route("/_cat/shards", get(|| async { "not json" }));
    let endpoint = spawn_server(app).await;

    let result = client_for(&endpoint).cat_shards().await;

    assert!(matches!(result, Err(ClientError::Decode(_))));
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = client_for(&endpoint).cat_nodes().await;

    assert!(matches!(result, Err(ClientError::Http(_))));
}
