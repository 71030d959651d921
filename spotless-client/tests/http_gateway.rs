//! HttpGateway against a stub of the hosted REST dialect

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use shared::Table;
use spotless_client::{ClientConfig, ClientError, Gateway, HttpGateway, SelectQuery};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Seen {
    method: &'static str,
    table: String,
    query: Option<String>,
    apikey: Option<String>,
    bearer: Option<String>,
    prefer: Option<String>,
    body: Option<Value>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn seen(method: &'static str, table: String, query: Option<String>, headers: &HeaderMap, body: Option<Value>) -> Seen {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Seen {
        method,
        table,
        query,
        apikey: header("apikey"),
        bearer: header("authorization"),
        prefer: header("prefer"),
        body,
    }
}

async fn list(
    State(log): State<Log>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    log.lock().push(seen("GET", table.clone(), query, &headers, None));
    match table.as_str() {
        "orders" => Ok(Json(json!([{"id": "o-1"}, {"id": "o-2"}]))),
        "profiles" => Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "JWT expired"})))),
        "stores" => Err((StatusCode::FORBIDDEN, Json(json!({"message": "permission denied for table stores"})))),
        _ => Ok(Json(json!([]))),
    }
}

async fn create(
    State(log): State<Log>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    log.lock().push(seen("POST", table.clone(), query, &headers, Some(body)));
    if table == "customers" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"code": "23505", "message": "duplicate key value violates unique constraint"})),
        );
    }
    (StatusCode::CREATED, Json(Value::Null))
}

async fn patch(
    State(log): State<Log>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    log.lock().push(seen("PATCH", table, query, &headers, Some(body)));
    StatusCode::NO_CONTENT
}

async fn remove(
    State(log): State<Log>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> (StatusCode, String) {
    log.lock().push(seen("DELETE", table, query, &headers, None));
    (StatusCode::SERVICE_UNAVAILABLE, "upstream down".to_string())
}

async fn stub() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/rest/v1/{table}", get(list).post(create).patch(patch).delete(remove))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (url, log)
}

#[tokio::test]
async fn test_select_sends_order_and_credentials() {
    let (url, log) = stub().await;
    let gateway = HttpGateway::new(&ClientConfig::new(format!("{url}/"), "anon-key")).unwrap();

    let rows = gateway
        .select(Table::Orders, &SelectQuery::for_table(Table::Orders))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let request = log.lock()[0].clone();
    assert_eq!(request.table, "orders");
    assert_eq!(request.query.as_deref(), Some("select=*&order=created_at.desc"));
    assert_eq!(request.apikey.as_deref(), Some("anon-key"));
    assert_eq!(request.bearer.as_deref(), Some("Bearer anon-key"));
}

#[tokio::test]
async fn test_writes_use_row_filters_and_prefer_headers() {
    let (url, log) = stub().await;
    let gateway = HttpGateway::new(
        &ClientConfig::new(url, "anon-key").with_access_token("session-jwt"),
    )
    .unwrap();

    gateway
        .insert(Table::Orders, vec![json!({"id": "o-9"})])
        .await
        .unwrap();
    gateway
        .update(Table::Orders, "o-9", json!({"status": "READY"}))
        .await
        .unwrap();
    gateway
        .upsert(Table::KanbanColumns, vec![json!({"id": "k1", "position": 0})])
        .await
        .unwrap();

    let log = log.lock().clone();
    assert_eq!(log[0].method, "POST");
    assert_eq!(log[0].prefer.as_deref(), Some("return=minimal"));
    assert_eq!(log[0].bearer.as_deref(), Some("Bearer session-jwt"));
    assert_eq!(log[0].body, Some(json!([{"id": "o-9"}])));

    assert_eq!(log[1].method, "PATCH");
    assert_eq!(log[1].query.as_deref(), Some("id=eq.o-9"));
    assert_eq!(log[1].body, Some(json!({"status": "READY"})));

    assert_eq!(log[2].table, "kanban_columns");
    assert_eq!(
        log[2].prefer.as_deref(),
        Some("resolution=merge-duplicates,return=minimal")
    );
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let (url, _log) = stub().await;
    let gateway = HttpGateway::new(&ClientConfig::new(url, "anon-key")).unwrap();

    let err = gateway.select(Table::Profiles, &SelectQuery::all()).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));

    let err = gateway.select(Table::Stores, &SelectQuery::all()).await.unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(ref m) if m.contains("permission denied")));

    let err = gateway
        .insert(Table::Customers, vec![json!({"id": "c-1"})])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(ref m) if m.starts_with("duplicate key")));

    let err = gateway.delete(Table::Orders, "o-1").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Gateway { status: 503, ref message } if message == "upstream down"
    ));
}

#[tokio::test]
async fn test_unreachable_gateway_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let gateway = HttpGateway::new(&ClientConfig::new(url, "anon-key")).unwrap();
    let err = gateway.select(Table::Orders, &SelectQuery::all()).await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
}
