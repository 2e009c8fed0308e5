use super::*;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct RegistryState {
    updates: Arc<Mutex<Vec<(i64, Value)>>>,
    registrations: Arc<Mutex<Vec<Value>>>,
    deletes: Arc<Mutex<Vec<i64>>>,
}

fn ana() -> Value {
    json!({ "id": 1, "nombre": "Ana", "correo": "ana@example.com", "telefono": "555" })
}

async fn list_users() -> Json<Value> {
    Json(json!([
        ana(),
        { "id": 2, "nombre": "Bo", "correo": "bo@example.com", "telefono": "556" }
    ]))
}

async fn get_user(Path(id): Path<i64>) -> AxumResponse {
    match id {
        1 => Json(ana()).into_response(),
        3 => Json(json!({ "id": 3, "nombre": "missing fields" })).into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Usuario no encontrado" })),
        )
            .into_response(),
    }
}

async fn update_user(
    State(state): State<RegistryState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> AxumResponse {
    if id == 404 {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "gone" }))).into_response();
    }
    state.updates.lock().await.push((id, body));
    StatusCode::OK.into_response()
}

async fn delete_user(State(state): State<RegistryState>, Path(id): Path<i64>) -> AxumResponse {
    state.deletes.lock().await.push(id);
    match id {
        5 => (
            StatusCode::CONFLICT,
            Json(json!({ "code": "foreign_key_constraint", "message": "violates fk_orders_user" })),
        )
            .into_response(),
        6 => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => Json(json!({ "message": "deleted" })).into_response(),
    }
}

async fn create_user(State(state): State<RegistryState>, Json(body): Json<Value>) -> AxumResponse {
    state.registrations.lock().await.push(body.clone());
    match body["correo"].as_str() {
        Some("taken@example.com") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "El correo ya existe" })),
        )
            .into_response(),
        Some("bare@example.com") => StatusCode::OK.into_response(),
        Some("partial@example.com") => Json(json!({
            "usuario": { "id": 7, "nombre": "N", "correo": "n@x" }
        }))
        .into_response(),
        Some("text@example.com") => (StatusCode::CREATED, "usuario creado").into_response(),
        _ => (
            StatusCode::CREATED,
            Json(json!({ "usuario": {
                "id": 10,
                "nombre": body["nombre"],
                "correo": body["correo"],
                "telefono": body["telefono"]
            }})),
        )
            .into_response(),
    }
}

async fn login(body: Bytes) -> AxumResponse {
    let body: Value = serde_json::from_slice(&body).unwrap_or_default();
    match (body["correo"].as_str(), body["password"].as_str()) {
        (Some("a@example.com"), Some("secret")) => {
            Json(json!({ "usuario": { "id": 1, "nombre": "A" } })).into_response()
        }
        (Some("odd@example.com"), _) => {
            Json(json!({ "usuario": { "nombre": "no id" } })).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "bad creds" })),
        )
            .into_response(),
    }
}

async fn spawn_registry() -> anyhow::Result<(String, RegistryState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = RegistryState::default();
    let app = Router::new()
        .route("/usuarios", get(list_users))
        .route(
            "/usuarios/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/crear_usuario", post(create_user))
        .route("/login", post(login))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

async fn client() -> (HttpRegistryClient, RegistryState) {
    let (url, state) = spawn_registry().await.expect("spawn registry");
    (HttpRegistryClient::new(&url).expect("client"), state)
}

#[test]
fn rejects_invalid_base_url() {
    assert!(HttpRegistryClient::new("not a url").is_err());
}

#[test]
fn trims_trailing_slash_from_base_url() {
    let client = HttpRegistryClient::new("http://127.0.0.1:9/").expect("client");
    assert_eq!(client.base_url(), "http://127.0.0.1:9");
}

#[tokio::test]
async fn list_parses_records() {
    let (client, _) = client().await;
    let records = client.list().await.expect("list");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, UserId(1));
    assert_eq!(records[1].email, "bo@example.com");
}

#[tokio::test]
async fn get_maps_not_found_to_registry_error() {
    let (client, _) = client().await;

    assert_eq!(client.get(UserId(1)).await.expect("get").name, "Ana");

    let err = client.get(UserId(77)).await.expect_err("missing record");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.server_message(), Some("Usuario no encontrado"));
}

#[tokio::test]
async fn get_fails_closed_on_shape_mismatch() {
    let (client, _) = client().await;
    let err = client.get(UserId(3)).await.expect_err("malformed record");
    assert!(matches!(err, RegistryClientError::MalformedResponse(_)));
}

#[tokio::test]
async fn update_sends_all_fields() {
    let (client, state) = client().await;
    let payload = RecordUpdate {
        name: "Ana".into(),
        email: "ana@example.com".into(),
        phone: "555".into(),
    };

    client.update(UserId(1), &payload).await.expect("update");

    let updates = state.updates.lock().await;
    assert_eq!(
        updates.as_slice(),
        &[(1, json!({ "nombre": "Ana", "correo": "ana@example.com", "telefono": "555" }))]
    );
}

#[tokio::test]
async fn update_surfaces_server_message() {
    let (client, _) = client().await;
    let payload = RecordUpdate {
        name: "x".into(),
        email: "x".into(),
        phone: "x".into(),
    };
    let err = client
        .update(UserId(404), &payload)
        .await
        .expect_err("update rejected");
    assert_eq!(err.server_message(), Some("gone"));
}

#[tokio::test]
async fn delete_distinguishes_dependency_failures() {
    let (client, state) = client().await;

    client.delete(UserId(2)).await.expect("delete");

    let blocked = client.delete(UserId(5)).await.expect_err("blocked");
    assert!(blocked.is_foreign_key_constraint());
    assert_eq!(blocked.status(), Some(409));

    let opaque = client.delete(UserId(6)).await.expect_err("server error");
    assert!(!opaque.is_foreign_key_constraint());
    assert_eq!(opaque.status(), Some(500));
    assert_eq!(opaque.server_message(), None);

    assert_eq!(state.deletes.lock().await.as_slice(), &[2, 5, 6]);
}

#[tokio::test]
async fn create_accepts_record_or_bare_success() {
    let (client, state) = client().await;
    let mut registration = Registration {
        name: "Cy".into(),
        email: "cy@example.com".into(),
        phone: "557".into(),
        password: "pw".into(),
    };

    let created = client.create(&registration).await.expect("create");
    assert_eq!(created.created_id(), Some(UserId(10)));

    registration.email = "bare@example.com".into();
    let bare = client.create(&registration).await.expect("bare create");
    assert!(bare.usuario.is_none());

    registration.email = "partial@example.com".into();
    let partial = client.create(&registration).await.expect("partial record");
    assert_eq!(partial.created_id(), Some(UserId(7)));

    registration.email = "text@example.com".into();
    let text = client.create(&registration).await.expect("plain text body");
    assert_eq!(text.created_id(), None);

    registration.email = "taken@example.com".into();
    let err = client.create(&registration).await.expect_err("duplicate");
    assert_eq!(err.server_message(), Some("El correo ya existe"));

    let registrations = state.registrations.lock().await;
    assert_eq!(registrations[0]["password"], json!("pw"));
    assert_eq!(registrations.len(), 5);
}

#[tokio::test]
async fn login_returns_session_or_registry_error() {
    let (client, _) = client().await;

    let ok = client
        .login(&Credentials {
            email: "a@example.com".into(),
            password: "secret".into(),
        })
        .await
        .expect("login");
    assert_eq!(ok.usuario.id, UserId(1));

    let err = client
        .login(&Credentials {
            email: "a@example.com".into(),
            password: "wrong".into(),
        })
        .await
        .expect_err("bad password");
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.server_message(), Some("bad creds"));

    let malformed = client
        .login(&Credentials {
            email: "odd@example.com".into(),
            password: "x".into(),
        })
        .await
        .expect_err("session without id");
    assert!(matches!(malformed, RegistryClientError::MalformedResponse(_)));
}

#[tokio::test]
async fn unreachable_registry_is_a_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = HttpRegistryClient::new(&format!("http://{addr}")).expect("client");
    let err = client.list().await.expect_err("nothing listening");
    assert!(err.is_network(), "unexpected error: {err:?}");
}
