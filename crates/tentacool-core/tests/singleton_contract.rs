//! Contract Test: Singleton Domains (DHCP, DNS, Gateway)
//!
//! Constraints verified:
//! - Get reports the documented default when nothing was declared
//! - Set removes a differing previous declaration before applying
//! - Re-setting an equal declaration re-applies without removing
//! - A started set runs to completion when its caller goes away

mod common;

use common::*;
use std::time::Duration;
use tentacool_core::records::{DhcpState, DnsConfig, GatewayRecord};
use tentacool_core::{ApplyStatus, Error};

#[tokio::test]
async fn dhcp_defaults_to_inactive_on_default_interface() {
    let (reconcilers, fakes, _store) = reconcilers();

    let state = reconcilers.dhcp.get().await.unwrap();

    assert_eq!(state, DhcpState::inactive("eth0"));
    assert!(fakes.dhcp.calls().is_empty());
}

#[tokio::test]
async fn dhcp_set_fills_default_interface() {
    let (reconcilers, fakes, _store) = reconcilers();

    let outcome = reconcilers
        .dhcp
        .set(DhcpState::new(true, ""))
        .await
        .unwrap();

    assert_eq!(outcome.record, DhcpState::new(true, "eth0"));
    assert_eq!(fakes.dhcp.calls(), vec![Call::Apply(DhcpState::new(true, "eth0"))]);
    assert_eq!(reconcilers.dhcp.get().await.unwrap(), DhcpState::new(true, "eth0"));
}

#[tokio::test]
async fn dhcp_interface_move_stops_old_client_first() {
    let (reconcilers, fakes, _store) = reconcilers();

    reconcilers.dhcp.set(DhcpState::new(true, "eth0")).await.unwrap();
    reconcilers.dhcp.set(DhcpState::new(true, "eth1")).await.unwrap();

    assert_eq!(
        fakes.dhcp.calls(),
        vec![
            Call::Apply(DhcpState::new(true, "eth0")),
            Call::Remove(DhcpState::new(true, "eth0")),
            Call::Apply(DhcpState::new(true, "eth1")),
        ]
    );
}

#[tokio::test]
async fn dns_get_falls_back_to_live_configuration() {
    let (reconcilers, fakes, _store) = reconcilers();

    assert_eq!(reconcilers.dns.get().await.unwrap(), DnsConfig::default());

    let live = DnsConfig::new(vec!["192.168.1.1".into()], vec!["lan".into()]);
    fakes.dns.set_live(live.clone());
    assert_eq!(reconcilers.dns.get().await.unwrap(), live);

    let declared = DnsConfig::new(vec!["1.1.1.1".into()], vec![]);
    reconcilers.dns.set(declared.clone()).await.unwrap();
    assert_eq!(reconcilers.dns.get().await.unwrap(), declared);
}

#[tokio::test]
async fn dns_rejects_bad_nameserver() {
    let (reconcilers, fakes, _store) = reconcilers();

    let err = reconcilers
        .dns
        .set(DnsConfig::new(vec!["not-an-ip".into()], vec![]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(fakes.dns.calls().is_empty());
}

#[tokio::test]
async fn gateway_is_not_found_until_set() {
    let (reconcilers, fakes, _store) = reconcilers();

    let err = reconcilers.gateway.get().await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let first = GatewayRecord::new("192.168.1.1", "eth0");
    reconcilers.gateway.set(first.clone()).await.unwrap();
    assert_eq!(reconcilers.gateway.get().await.unwrap(), first);

    let second = GatewayRecord::new("192.168.1.254", "eth0");
    reconcilers.gateway.set(second.clone()).await.unwrap();

    assert_eq!(
        fakes.gateway.calls(),
        vec![
            Call::Apply(first.clone()),
            Call::Remove(first),
            Call::Apply(second),
        ]
    );
}

#[tokio::test]
async fn equal_reset_reapplies_without_remove() {
    let (reconcilers, fakes, _store) = reconcilers();
    let gateway = GatewayRecord::new("10.0.0.1", "");

    reconcilers.gateway.set(gateway.clone()).await.unwrap();
    let outcome = reconcilers.gateway.set(gateway.clone()).await.unwrap();

    assert_eq!(outcome.status, ApplyStatus::Applied);
    assert_eq!(fakes.gateway.remove_count(), 0);
    assert_eq!(fakes.gateway.apply_count(), 2);
}

#[tokio::test]
async fn failed_set_keeps_previous_declaration() {
    let (reconcilers, fakes, _store) = reconcilers();

    let first = DnsConfig::new(vec!["1.1.1.1".into()], vec![]);
    reconcilers.dns.set(first.clone()).await.unwrap();

    fakes.dns.fail_every_apply(true);
    let err = reconcilers
        .dns
        .set(DnsConfig::new(vec!["8.8.8.8".into()], vec![]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SystemApply { .. }));
    assert_eq!(reconcilers.dns.get().await.unwrap(), first);
}

#[tokio::test(start_paused = true)]
async fn dropped_caller_does_not_cut_set_short() {
    let (reconcilers, fakes, _store) = reconcilers();

    let first = GatewayRecord::new("192.168.1.1", "eth0");
    reconcilers.gateway.set(first.clone()).await.unwrap();
    fakes.gateway.clear();
    fakes.gateway.set_delay(Duration::from_secs(5));

    let next = GatewayRecord::new("192.168.1.254", "eth0");
    let dropped = tokio::time::timeout(
        Duration::from_secs(1),
        reconcilers.gateway.set(next.clone()),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(
        fakes.gateway.calls(),
        vec![Call::Remove(first), Call::Apply(next.clone())]
    );
    assert_eq!(reconcilers.gateway.get().await.unwrap(), next);
}
