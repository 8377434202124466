//! Integration tests for the broker session manager: reconnect backoff,
//! the reconnect watchdog, controller-info announcements and link events.

use core::net::Ipv4Addr;

use crate::mock_hw::{BrokerCall, MockBroker, MockPlatform};

use sensornode::app::events::PublishEvent;
use sensornode::config::NodeConfig;
use sensornode::error::Error;
use sensornode::session::link::LinkEvents;
use sensornode::session::{SessionManager, SessionState};

const IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 40);

fn manager(link: &LinkEvents) -> SessionManager<'_> {
    SessionManager::new(link, &NodeConfig::default(), 0x00AB_CDEF, 0)
}

// ── Handshake & announcement ──────────────────────────────────

#[test]
fn handshake_subscribes_and_announces_controller_info() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(true);
    let mut platform = MockPlatform::default();

    link.link_up(2_500, IP);
    s.tick(2_600, &mut broker, &mut platform).unwrap();

    assert_eq!(s.state(), SessionState::Connected);
    assert_eq!(s.ip(), Some(IP));
    assert_eq!(broker.calls[0], BrokerCall::Connect("sensornode-abcdef".to_owned()));
    assert_eq!(broker.calls[1], BrokerCall::Subscribe("sensornode/in".to_owned()));
    assert_eq!(
        broker.payloads(),
        vec![
            r#"{"chipId":11259375,"freeHeap":42000,"ip":"192.168.1.40","ssid":""}"#.to_owned(),
            r#"{"chipId":11259375,"ip":"192.168.1.40","sw":"sensornode"}"#.to_owned(),
            r#"{"chipId":11259375,"wifiOfflinePeriode":2600,"resetReason":"Software/System restart"}"#
                .to_owned(),
        ]
    );
}

#[test]
fn reconnect_reports_the_outage_length() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(true);
    let mut platform = MockPlatform::default();

    link.link_up(0, IP);
    s.tick(0, &mut broker, &mut platform).unwrap();
    assert_eq!(s.last_offline_ms(), 0);

    link.link_down(1_000);
    s.tick(1_200, &mut broker, &mut platform).unwrap();
    assert_eq!(s.state(), SessionState::Connecting);

    // Still offline: no handshake attempted.
    s.tick(3_000, &mut broker, &mut platform).unwrap();
    assert_eq!(broker.connects(), 1);

    link.link_up(3_900, IP);
    s.tick(4_000, &mut broker, &mut platform).unwrap();
    assert!(s.is_connected());
    assert_eq!(s.last_offline_ms(), 3_000);
    assert!(
        broker
            .payloads()
            .last()
            .is_some_and(|p| p.contains(r#""wifiOfflinePeriode":3000"#))
    );
}

#[test]
fn lost_broker_session_triggers_reconnect_with_announcement() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(true);
    let mut platform = MockPlatform::default();

    link.link_up(0, IP);
    s.tick(0, &mut broker, &mut platform).unwrap();

    broker.connected = false;
    s.tick(500, &mut broker, &mut platform).unwrap();
    // Dropped at 500 and reconnected on the same tick.
    assert!(s.is_connected());
    assert_eq!(broker.connects(), 2);
    assert_eq!(broker.payloads().len(), 6);
}

// ── Backoff & watchdog ────────────────────────────────────────

#[test]
fn failed_handshakes_are_spaced_by_the_backoff() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(false);
    let mut platform = MockPlatform::default();

    link.link_up(0, IP);
    for now in (0..=20_000).step_by(250) {
        s.tick(now, &mut broker, &mut platform).unwrap();
    }
    // 0, 5000, 10000, 15000, 20000
    assert_eq!(broker.connects(), 5);
    assert_eq!(s.attempts(), 5);
    assert_eq!(s.state(), SessionState::Connecting);
}

#[test]
fn watchdog_requests_exactly_one_restart() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(false);
    let mut platform = MockPlatform::default();

    link.link_up(0, IP);
    let mut exhausted_at = None;
    for now in (0..=90_000).step_by(100) {
        match s.tick(now, &mut broker, &mut platform) {
            Ok(()) => {}
            Err(Error::ReconnectExhausted) => {
                exhausted_at.get_or_insert(now);
            }
            Err(e) => panic!("unexpected error {e}"),
        }
    }

    assert_eq!(exhausted_at, Some(60_100));
    assert_eq!(platform.restarts, 1);
    assert_eq!(s.state(), SessionState::RestartRequested);
    // 0, 5000, ..., 60000 and nothing after the watchdog fired.
    assert_eq!(broker.connects(), 13);
}

#[test]
fn link_loss_while_reconnecting_keeps_the_watchdog_running() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(false);
    let mut platform = MockPlatform::default();

    link.link_up(0, IP);
    s.tick(0, &mut broker, &mut platform).unwrap();
    link.link_down(30_000);
    s.tick(30_000, &mut broker, &mut platform).unwrap();
    assert_eq!(s.state(), SessionState::Connecting);

    s.tick(60_000, &mut broker, &mut platform).unwrap();
    assert_eq!(
        s.tick(60_100, &mut broker, &mut platform),
        Err(Error::ReconnectExhausted)
    );
    assert_eq!(platform.restarts, 1);
    assert_eq!(broker.connects(), 1);
}

#[test]
fn flapping_link_cannot_hold_off_the_watchdog() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(false);
    let mut platform = MockPlatform::default();

    let mut exhausted_at = None;
    for now in (0..=600_000u64).step_by(500) {
        match now % 40_000 {
            0 => {
                link.link_up(now, IP);
            }
            39_000 => {
                link.link_down(now);
            }
            _ => {}
        }
        if s.tick(now, &mut broker, &mut platform) == Err(Error::ReconnectExhausted) {
            exhausted_at.get_or_insert(now);
        }
    }

    assert_eq!(exhausted_at, Some(60_500));
    assert_eq!(platform.restarts, 1);
    assert_eq!(s.state(), SessionState::RestartRequested);
}

#[test]
fn link_that_never_comes_up_still_restarts() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(true);
    let mut platform = MockPlatform::default();

    for now in (0..=60_000).step_by(1_000) {
        s.tick(now, &mut broker, &mut platform).unwrap();
    }
    assert_eq!(s.state(), SessionState::Connecting);
    assert_eq!(
        s.tick(61_000, &mut broker, &mut platform),
        Err(Error::ReconnectExhausted)
    );
    assert_eq!(platform.restarts, 1);
    assert!(broker.calls.is_empty());
}

#[test]
fn burst_of_link_events_still_ends_on_the_latest_state() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(true);
    let mut platform = MockPlatform::default();

    for i in 0..10u64 {
        link.link_down(i * 10);
    }
    link.link_up(200, IP);
    s.tick(250, &mut broker, &mut platform).unwrap();

    assert!(s.link_up());
    assert!(s.is_connected());
}

// ── Publishing ────────────────────────────────────────────────

#[test]
fn publish_while_disconnected_never_reaches_the_transport() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(true);

    for now in [0, 10, 20] {
        let r = s.publish(now, &mut broker, &PublishEvent::level("motion", true));
        assert_eq!(r, Err(Error::TransportUnavailable));
    }
    assert!(broker.calls.is_empty());
}

#[test]
fn failed_publish_drops_the_session() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(true);
    let mut platform = MockPlatform::default();

    link.link_up(0, IP);
    s.tick(0, &mut broker, &mut platform).unwrap();

    broker.drop_session();
    let r = s.publish(700, &mut broker, &PublishEvent::number("light", 12.5));
    assert_eq!(r, Err(Error::TransportUnavailable));
    assert_eq!(s.state(), SessionState::Disconnected);

    // Offline period counts from the failed publish.
    broker.reachable = true;
    s.tick(1_700, &mut broker, &mut platform).unwrap();
    assert_eq!(s.last_offline_ms(), 1_000);
}

// ── Inbound ───────────────────────────────────────────────────

#[test]
fn inbound_messages_are_delivered_while_connected() {
    let link = LinkEvents::new();
    let mut s = manager(&link);
    let mut broker = MockBroker::new(true);
    let mut platform = MockPlatform::default();

    link.link_up(0, IP);
    s.tick(0, &mut broker, &mut platform).unwrap();

    broker
        .inbound
        .push(("sensornode/in".to_owned(), b"hello".to_vec()));
    broker
        .inbound
        .push(("sensornode/in".to_owned(), b"again".to_vec()));
    s.tick(10, &mut broker, &mut platform).unwrap();

    assert_eq!(s.inbound_count(), 2);
    assert!(broker.inbound.is_empty());
}
