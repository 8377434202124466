//! Integration tests for the Node event loop: sampling, edge reports,
//! the periodic light publish and the deep-sleep hook.

use crate::mock_hw::{BrokerCall, MockBroker, MockPlatform, MockSensors};

use sensornode::app::service::{Node, Ports};
use sensornode::config::NodeConfig;
use sensornode::pins;
use sensornode::sensors::Level;
use sensornode::session::SessionState;
use sensornode::session::link::LinkEvents;

const CHIP: u32 = 0x00AB_CDEF;

type Io = Ports<MockSensors, MockBroker, MockPlatform>;

fn io(reachable: bool) -> Io {
    Ports {
        sensors: MockSensors::new(),
        transport: MockBroker::new(reachable),
        platform: MockPlatform::default(),
    }
}

fn online_node(link: &LinkEvents, config: NodeConfig) -> Node<'_> {
    link.link_up(0, core::net::Ipv4Addr::new(192, 168, 1, 40));
    Node::new(config, CHIP, link, 0).unwrap()
}

// ── Edge reports ──────────────────────────────────────────────

#[test]
fn motion_low_high_low_reports_rise_then_fall_with_session() {
    let link = LinkEvents::new();
    let mut node = online_node(&link, NodeConfig::default());
    let mut io = io(true);

    for (now, high) in [(1000, false), (1010, true), (1020, false)] {
        io.sensors.set_digital(pins::MOTION_GPIO, high);
        node.tick(now, &mut io).unwrap();
    }

    assert_eq!(
        io.transport.sensor_payloads(),
        vec![
            r#"{"chipId":11259375,"motion":1}"#.to_owned(),
            r#"{"chipId":11259375,"motion":0,"motionSessionLength":10}"#.to_owned(),
        ]
    );
}

#[test]
fn reports_go_to_the_out_topic() {
    let link = LinkEvents::new();
    let mut node = online_node(&link, NodeConfig::default());
    let mut io = io(true);

    io.sensors.set_digital(pins::SWITCH_WOMEN_GPIO, true);
    node.tick(5, &mut io).unwrap();

    let last = io.transport.calls.last().cloned();
    assert_eq!(
        last,
        Some(BrokerCall::Publish {
            topic: "sensornode/out".to_owned(),
            payload: r#"{"chipId":11259375,"switchWomen":1}"#.to_owned(),
        })
    );
    assert_eq!(node.level("switchWomen"), Some(Level::High));
    assert_eq!(node.level("switch"), Some(Level::Low));
}

#[test]
fn channels_report_independently_in_one_tick() {
    let link = LinkEvents::new();
    let mut node = online_node(&link, NodeConfig::default());
    let mut io = io(true);

    io.sensors.set_digital(pins::MOTION_GPIO, true);
    io.sensors.set_digital(pins::SWITCH_GPIO, true);
    let report = node.tick(100, &mut io).unwrap();

    assert_eq!(report.transitions, 2);
    assert_eq!(report.published, 2);
    assert_eq!(io.transport.sensor_payloads().len(), 2);
}

#[test]
fn edges_while_offline_are_dropped_not_queued() {
    let link = LinkEvents::new();
    let mut node = Node::new(NodeConfig::default(), CHIP, &link, 0).unwrap();
    let mut io = io(true);

    io.sensors.set_digital(pins::MOTION_GPIO, true);
    let report = node.tick(10, &mut io).unwrap();
    assert_eq!(report.transitions, 1);
    assert_eq!(report.dropped, 1);
    assert!(io.transport.calls.is_empty());

    // Link comes up later: nothing from the outage is replayed.
    link.link_up(20, core::net::Ipv4Addr::new(10, 0, 0, 5));
    node.tick(30, &mut io).unwrap();
    assert_eq!(node.session_state(), SessionState::Connected);
    assert!(io.transport.sensor_payloads().is_empty());
}

#[test]
fn failed_digital_read_changes_nothing() {
    let link = LinkEvents::new();
    let mut node = online_node(&link, NodeConfig::default());
    let mut io = io(true);

    io.sensors.set_digital(pins::MOTION_GPIO, true);
    io.sensors.broken.push(pins::MOTION_GPIO);
    let report = node.tick(10, &mut io).unwrap();
    assert_eq!(report.transitions, 0);
    assert_eq!(node.level("motion"), Some(Level::Low));
}

// ── Light sampling & periodic publish ─────────────────────────

#[test]
fn light_sampling_is_rate_gated() {
    let link = LinkEvents::new();
    let mut node = online_node(&link, NodeConfig::default());
    let mut io = io(true);
    io.sensors.set_analog(pins::LIGHT_ADC_GPIO, 300.0);

    // 10 ms ticks for one second: at most one read per 51 ms.
    for now in (0..=1000).step_by(10) {
        node.tick(now, &mut io).unwrap();
    }
    let reads = io.sensors.analog_reads.len();
    assert!(reads <= 1000 / 51 + 1, "{} reads", reads);
    assert!(reads >= 15, "{} reads", reads);
}

#[test]
fn periodic_light_average_after_interval() {
    let link = LinkEvents::new();
    let mut node = online_node(&link, NodeConfig::default());
    let mut io = io(true);
    io.sensors.set_analog(pins::LIGHT_ADC_GPIO, 512.0);

    let mut periodic_at = Vec::new();
    for now in (0..=61_000).step_by(100) {
        let r = node.tick(now, &mut io).unwrap();
        if r.periodic {
            periodic_at.push(now);
        }
    }

    assert_eq!(periodic_at, vec![30_100, 60_200]);
    let light: Vec<String> = io
        .transport
        .sensor_payloads()
        .into_iter()
        .filter(|p| p.contains("light"))
        .collect();
    assert_eq!(light.len(), 2);
    assert_eq!(light[0], r#"{"chipId":11259375,"light":512.0}"#);
}

#[test]
fn no_light_samples_skips_the_publish() {
    let link = LinkEvents::new();
    let mut node = online_node(&link, NodeConfig::default());
    let mut io = io(true);
    io.sensors.broken.push(pins::LIGHT_ADC_GPIO);

    node.tick(0, &mut io).unwrap();
    let r = node.tick(30_001, &mut io).unwrap();
    assert!(r.periodic);
    assert_eq!(r.published, 0);
    assert!(io.transport.sensor_payloads().is_empty());
}

// ── Deep-sleep hook ───────────────────────────────────────────

#[test]
fn deep_sleep_is_off_by_default() {
    let link = LinkEvents::new();
    let mut node = online_node(&link, NodeConfig::default());
    let mut io = io(true);
    io.sensors.set_analog(pins::LIGHT_ADC_GPIO, 10.0);

    node.tick(100, &mut io).unwrap();
    node.tick(30_200, &mut io).unwrap();
    assert!(io.platform.sleeps.is_empty());
}

#[test]
fn deep_sleep_follows_the_periodic_publish() {
    let link = LinkEvents::new();
    let config = NodeConfig {
        deep_sleep_secs: Some(600),
        ..NodeConfig::default()
    };
    let mut node = online_node(&link, config);
    let mut io = io(true);
    io.sensors.set_analog(pins::LIGHT_ADC_GPIO, 10.0);

    let r = node.tick(100, &mut io).unwrap();
    assert!(!r.slept);
    let r = node.tick(30_200, &mut io).unwrap();
    assert!(r.slept);
    assert_eq!(io.platform.sleeps, vec![600]);
    assert!(
        io.transport
            .payloads()
            .last()
            .is_some_and(|p| p.contains("light"))
    );
}
