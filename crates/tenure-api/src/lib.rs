//! JSON REST API for the Tenure ownership registry.
//!
//! Exposes an axum [`Router`] backed by a [`Registry`] over any
//! [`RegistryStore`]. Authentication, TLS and transport concerns are the
//! caller's responsibility; the caller's identity arrives in the `x-actor`
//! header (see [`provenance`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(tenure_api::api_router(registry.clone()))
//! ```

pub mod audit;
pub mod error;
pub mod owners;
pub mod provenance;
pub mod transfers;
pub mod units;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use serde_json::{Value, json};
use tenure_core::{Registry, store::RegistryStore};

pub use error::ApiError;

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// Build a fully-materialised API router for `registry`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(registry: Arc<Registry<S>>) -> Router<()>
where
  S: RegistryStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Units
    .route("/units", get(units::list::<S>).post(units::create::<S>))
    .route("/units/{id}", get(units::get_one::<S>))
    .route("/units/{id}/retire", post(units::retire::<S>))
    .route("/units/{id}/owners", get(units::owners::<S>))
    .route("/units/{id}/history", get(units::history::<S>))
    .route("/units/{id}/transfers/pending", get(units::pending::<S>))
    // Owners
    .route("/owners", get(owners::lookup::<S>).post(owners::create::<S>))
    .route("/owners/{id}", get(owners::get_one::<S>))
    .route("/owners/{id}/portfolio", get(owners::portfolio::<S>))
    // Transfers
    .route("/transfers", post(transfers::initiate::<S>))
    .route("/transfers/{id}", get(transfers::get_one::<S>))
    .route("/transfers/{id}/documents", post(transfers::attach_document::<S>))
    .route("/transfers/{id}/finalize", post(transfers::finalize::<S>))
    .route("/transfers/{id}/cancel", post(transfers::cancel::<S>))
    .route("/transfers/{id}/rebase", post(transfers::rebase::<S>))
    .route(
      "/documents/{id}/verification",
      post(transfers::verify_document::<S>),
    )
    // Audit
    .route("/audit", get(audit::trail::<S>))
    .route("/audit/verify", get(audit::verify::<S>))
    .with_state(registry)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use tenure_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(Registry::new(Arc::new(store))))
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(provenance::ACTOR_HEADER, "clerk-7")
      .header(provenance::FORWARDED_FOR_HEADER, "203.0.113.9");
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = app
      .clone()
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn create_unit(app: &Router) -> String {
    let (status, unit) = send(
      app,
      "POST",
      "/units",
      Some(json!({
        "unique_key":    "DXB-MH-1201",
        "building_name": "Marina Heights",
        "unit_number":   "1201",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    unit["unit_id"].as_str().unwrap().to_owned()
  }

  async fn create_owner(app: &Router, name: &str, emirates_id: &str) -> String {
    let (status, owner) = send(
      app,
      "POST",
      "/owners",
      Some(json!({
        "full_name":   name,
        "owner_type":  "individual",
        "emirates_id": emirates_id,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{owner}");
    owner["owner_id"].as_str().unwrap().to_owned()
  }

  async fn initiate(app: &Router, unit: &str, date: &str, changes: Value) -> String {
    let (status, transfer) = send(
      app,
      "POST",
      "/transfers",
      Some(json!({
        "unit_id":       unit,
        "transfer_type": "purchase",
        "transfer_date": date,
        "changes":       changes,
        "amount":        1_850_000.0,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{transfer}");
    assert_eq!(transfer["amount"]["currency"], "AED");
    transfer["transfer_id"].as_str().unwrap().to_owned()
  }

  #[tokio::test]
  async fn health_is_ok() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
  }

  #[tokio::test]
  async fn unknown_unit_is_404() {
    let app = app().await;
    let uri = format!("/units/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
  }

  #[tokio::test]
  async fn malformed_emirates_id_is_refused() {
    let app = app().await;
    let (status, body) = send(
      &app,
      "POST",
      "/owners",
      Some(json!({
        "full_name":   "Aisha Rahman",
        "owner_type":  "individual",
        "emirates_id": "785-1985-1234567-1",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
    assert!(body["error"].as_str().unwrap().contains("784-XXXX-XXXXXXX-X"));
  }

  #[tokio::test]
  async fn unparseable_body_is_a_json_error() {
    let app = app().await;
    let resp = app
      .clone()
      .oneshot(
        Request::builder()
          .method("POST")
          .uri("/units")
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from("{\"unique_key\":"))
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["kind"], "invalid_input");
  }

  #[tokio::test]
  async fn owner_lookup_by_emirates_id() {
    let app = app().await;
    let id = create_owner(&app, "Aisha Rahman", "784-1985-1234567-1").await;

    let (status, owner) =
      send(&app, "GET", "/owners?emirates_id=784-1985-1234567-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owner["owner_id"], id.as_str());

    let (status, _) =
      send(&app, "GET", "/owners?emirates_id=784-1985-7654321-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn registration_then_sale_over_http() {
    let app = app().await;
    let unit = create_unit(&app).await;
    let a = create_owner(&app, "Aisha Rahman", "784-1985-1234567-1").await;
    let b = create_owner(&app, "Bilal Haddad", "784-1990-7654321-2").await;

    let first = initiate(&app, &unit, "2020-01-01", json!([
      { "owner_id": a, "percentage": 100.0 },
    ]))
    .await;
    let (status, t) =
      send(&app, "POST", &format!("/transfers/{first}/finalize"), None).await;
    assert_eq!(status, StatusCode::OK, "{t}");
    assert_eq!(t["status"], "committed");

    let sale = initiate(&app, &unit, "2024-01-10", json!([
      { "owner_id": a, "percentage": 0.0 },
      { "owner_id": b, "percentage": 100.0 },
    ]))
    .await;
    let (status, doc) = send(
      &app,
      "POST",
      &format!("/transfers/{sale}/documents"),
      Some(json!({
        "document_type": "title_deed",
        "document_name": "Title deed",
        "file_path":     "deeds/1201.pdf",
        "upload_date":   null,
        "uploaded_by":   null,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{doc}");
    let (status, _) =
      send(&app, "POST", &format!("/transfers/{sale}/finalize"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, owners) = send(&app, "GET", &format!("/units/{unit}/owners"), None).await;
    let owners = owners.as_array().unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0]["owner"]["owner_id"], b.as_str());

    let (_, history) = send(&app, "GET", &format!("/units/{unit}/history"), None).await;
    assert_eq!(history.as_array().unwrap().len(), 2);

    let (status, trail) = send(
      &app,
      "GET",
      &format!("/audit?table=ownership_transfers&record_id={sale}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let trail = trail.as_array().unwrap();
    assert!(trail.iter().all(|e| e["changed_by"] == "clerk-7"));
    assert!(trail.iter().all(|e| e["ip_address"] == "203.0.113.9"));

    let (status, report) = send(&app, "GET", "/audit/verify", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["violations"], json!([]));
  }

  #[tokio::test]
  async fn shortfall_is_422_with_the_violation() {
    let app = app().await;
    let unit = create_unit(&app).await;
    let a = create_owner(&app, "Aisha Rahman", "784-1985-1234567-1").await;

    let t = initiate(&app, &unit, "2020-01-01", json!([
      { "owner_id": a, "percentage": 90.0 },
    ]))
    .await;
    let (status, body) =
      send(&app, "POST", &format!("/transfers/{t}/finalize"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["violation"]["kind"], "percentage_sum_mismatch");

    let (_, details) = send(&app, "GET", &format!("/transfers/{t}"), None).await;
    assert_eq!(details["status"], "rejected");
  }

  #[tokio::test]
  async fn second_cancel_is_a_conflict() {
    let app = app().await;
    let unit = create_unit(&app).await;
    let a = create_owner(&app, "Aisha Rahman", "784-1985-1234567-1").await;
    let t = initiate(&app, &unit, "2020-01-01", json!([
      { "owner_id": a, "percentage": 100.0 },
    ]))
    .await;

    let uri = format!("/transfers/{t}/cancel");
    let (status, _) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transfer_state");
  }
}
