//! Request handlers
//!
//! Each handler decodes a record, hands it to the domain's reconciler and
//! encodes the outcome. A declaration that was stored but could not be
//! applied answers `202 Accepted` with `{"record": .., "apply_error": ..}`.

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tracing::debug;

use tentacool_core::records::{AddressRecord, DhcpState, DnsConfig, GatewayRecord};
use tentacool_core::traits::{InterfaceAddress, InterfaceInfo};
use tentacool_core::{ApplyStatus, Reconciled};

use crate::AppState;
use crate::error::ApiResult;

/// Response for an accepted mutation
struct Outcome<R> {
    reconciled: Reconciled<R>,
    status: StatusCode,
}

impl<R> Outcome<R> {
    fn ok(reconciled: Reconciled<R>) -> Self {
        Self {
            reconciled,
            status: StatusCode::OK,
        }
    }

    fn created(reconciled: Reconciled<R>) -> Self {
        Self {
            reconciled,
            status: StatusCode::CREATED,
        }
    }
}

#[derive(Serialize)]
struct Degraded<R> {
    record: R,
    apply_error: String,
}

impl<R: Serialize> IntoResponse for Outcome<R> {
    fn into_response(self) -> Response {
        match self.reconciled.status {
            ApplyStatus::Applied => (self.status, Json(self.reconciled.record)).into_response(),
            ApplyStatus::ApplyFailed(reason) => (
                StatusCode::ACCEPTED,
                Json(Degraded {
                    record: self.reconciled.record,
                    apply_error: reason,
                }),
            )
                .into_response(),
        }
    }
}

/// Routes of every domain
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addresses", get(list_addresses).post(create_address))
        .route(
            "/addresses/:id",
            get(get_address).put(update_address).delete(delete_address),
        )
        .route("/dhcp", get(get_dhcp).post(set_dhcp))
        .route("/dns", get(get_dns).post(set_dns))
        .route("/routes", get(list_routes))
        .route("/routes/gateway", get(get_gateway).post(set_gateway))
        .route("/interfaces", get(list_interfaces))
        .route("/interfaces/:iface", get(interface_addresses))
}

async fn list_addresses(State(state): State<AppState>) -> ApiResult<Json<Vec<AddressRecord>>> {
    Ok(Json(state.reconcilers.address.list().await?))
}

async fn create_address(
    State(state): State<AppState>,
    payload: Result<Json<AddressRecord>, JsonRejection>,
) -> ApiResult<Outcome<AddressRecord>> {
    let Json(record) = payload?;
    let reconciled = state.reconcilers.address.create(record).await?;
    debug!("Created address {}", reconciled.record.id);
    Ok(Outcome::created(reconciled))
}

async fn get_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AddressRecord>> {
    Ok(Json(state.reconcilers.address.get(&id).await?))
}

async fn update_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AddressRecord>, JsonRejection>,
) -> ApiResult<Outcome<AddressRecord>> {
    let Json(record) = payload?;
    let reconciled = state.reconcilers.address.update(&id, record).await?;
    Ok(Outcome::ok(reconciled))
}

async fn delete_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AddressRecord>> {
    Ok(Json(state.reconcilers.address.delete(&id).await?))
}

async fn get_dhcp(State(state): State<AppState>) -> ApiResult<Json<DhcpState>> {
    Ok(Json(state.reconcilers.dhcp.get().await?))
}

async fn set_dhcp(
    State(state): State<AppState>,
    payload: Result<Json<DhcpState>, JsonRejection>,
) -> ApiResult<Outcome<DhcpState>> {
    let Json(dhcp) = payload?;
    Ok(Outcome::ok(state.reconcilers.dhcp.set(dhcp).await?))
}

async fn get_dns(State(state): State<AppState>) -> ApiResult<Json<DnsConfig>> {
    Ok(Json(state.reconcilers.dns.get().await?))
}

async fn set_dns(
    State(state): State<AppState>,
    payload: Result<Json<DnsConfig>, JsonRejection>,
) -> ApiResult<Outcome<DnsConfig>> {
    let Json(dns) = payload?;
    Ok(Outcome::ok(state.reconcilers.dns.set(dns).await?))
}

async fn get_gateway(State(state): State<AppState>) -> ApiResult<Json<GatewayRecord>> {
    Ok(Json(state.reconcilers.gateway.get().await?))
}

async fn set_gateway(
    State(state): State<AppState>,
    payload: Result<Json<GatewayRecord>, JsonRejection>,
) -> ApiResult<Outcome<GatewayRecord>> {
    let Json(gateway) = payload?;
    Ok(Outcome::ok(state.reconcilers.gateway.set(gateway).await?))
}

async fn list_interfaces(State(state): State<AppState>) -> ApiResult<Json<Vec<InterfaceInfo>>> {
    Ok(Json(state.inspector.interfaces().await?))
}

async fn interface_addresses(
    State(state): State<AppState>,
    Path(iface): Path<String>,
) -> ApiResult<Json<Vec<InterfaceAddress>>> {
    Ok(Json(state.inspector.interface_addresses(&iface).await?))
}

async fn list_routes(State(state): State<AppState>) -> ApiResult<Json<Vec<serde_json::Value>>> {
    Ok(Json(state.inspector.routes().await?))
}
