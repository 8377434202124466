//! JSON wire encoding for outbound messages.
//!
//! Every message is a flat object led by `chipId`.  Sensor reports add the
//! channel key and, on a fall, `<key>SessionLength`:
//!
//! ```text
//! {"chipId":15322318,"motion":1}
//! {"chipId":15322318,"motion":0,"motionSessionLength":10250}
//! {"chipId":15322318,"light":512.3}
//! ```

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use super::events::{ControllerInfo, PublishEvent, Value};
use crate::error::{Error, Result};

struct Envelope<'a> {
    chip_id: u32,
    event: &'a PublishEvent<'a>,
}

impl Serialize for Envelope<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let len = if self.event.session_ms.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("chipId", &self.chip_id)?;
        match self.event.value {
            Value::Level(high) => map.serialize_entry(self.event.key, &u8::from(high))?,
            Value::Number(v) => map.serialize_entry(self.event.key, &round_one_decimal(v))?,
        }
        if let Some(ms) = self.event.session_ms {
            let session_key = format!("{}SessionLength", self.event.key);
            map.serialize_entry(&session_key, &ms)?;
        }
        map.end()
    }
}

/// Analog values are reported with one decimal place.
fn round_one_decimal(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

pub fn encode_event(chip_id: u32, event: &PublishEvent<'_>) -> Result<Vec<u8>> {
    serde_json::to_vec(&Envelope { chip_id, event }).map_err(|_| Error::Encoding)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkReport<'a> {
    chip_id: u32,
    free_heap: u32,
    ip: &'a str,
    ssid: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SoftwareReport<'a> {
    chip_id: u32,
    ip: &'a str,
    sw: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OfflineReport<'a> {
    chip_id: u32,
    wifi_offline_periode: u64,
    reset_reason: &'a str,
}

/// The three controller-info messages, in announcement order.
pub fn encode_controller_info(info: &ControllerInfo<'_>) -> Result<[Vec<u8>; 3]> {
    let ip = info.ip.map(|ip| ip.to_string()).unwrap_or_default();

    let network = serde_json::to_vec(&NetworkReport {
        chip_id: info.chip_id,
        free_heap: info.free_heap,
        ip: &ip,
        ssid: info.ssid,
    });
    let software = serde_json::to_vec(&SoftwareReport {
        chip_id: info.chip_id,
        ip: &ip,
        sw: info.software,
    });
    let offline = serde_json::to_vec(&OfflineReport {
        chip_id: info.chip_id,
        wifi_offline_periode: info.offline_ms,
        reset_reason: info.reset_reason.as_str(),
    });

    match (network, software, offline) {
        (Ok(n), Ok(s), Ok(o)) => Ok([n, s, o]),
        _ => Err(Error::Encoding),
    }
}
