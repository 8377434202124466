//! WiFi station-mode adapter.
//!
//! Validates credentials, brings the station up and turns the driver's
//! link notifications into [`NetworkEvent`](crate::session::link::NetworkEvent)s
//! on the shared [`LinkEvents`] queue.  It never talks to the broker
//! session directly.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via
//!   `esp_idf_svc::wifi`, with raw event-loop handlers for
//!   `STA_DISCONNECTED` / `STA_GOT_IP`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reassociation
//!
//! After a drop the driver is asked to reassociate straight from the
//! event handler.  Whether the broker session follows is decided by the
//! session manager on its next tick.

use log::info;

use crate::error::{ConnectivityError, Error, Result};
use crate::session::link::LinkEvents;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> core::result::Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(ConnectivityError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> core::result::Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Event handler (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod events {
    use core::ffi::c_void;
    use core::net::Ipv4Addr;

    use esp_idf_svc::sys::*;

    use crate::session::link::LinkEvents;

    fn now_ms() -> u64 {
        // SAFETY: RTC counter read; safe from the event task.
        (unsafe { esp_timer_get_time() } / 1_000) as u64
    }

    /// Runs on the default event-loop task.  Only enqueues.
    pub unsafe extern "C" fn on_event(
        arg: *mut c_void,
        base: esp_event_base_t,
        id: i32,
        data: *mut c_void,
    ) {
        // SAFETY: `arg` is the `&'static LinkEvents` registered in `start`.
        let link = unsafe { &*(arg as *const LinkEvents) };

        if base == unsafe { WIFI_EVENT } && id == wifi_event_t_WIFI_EVENT_STA_DISCONNECTED as i32 {
            link.link_down(now_ms());
            // SAFETY: driver call documented as callable from event handlers.
            unsafe { esp_wifi_connect() };
        } else if base == unsafe { IP_EVENT } && id == ip_event_t_IP_EVENT_STA_GOT_IP as i32 {
            // SAFETY: STA_GOT_IP always carries an `ip_event_got_ip_t`.
            let got_ip = unsafe { &*(data as *const ip_event_got_ip_t) };
            // lwIP keeps the address in network byte order.
            let ip = Ipv4Addr::from(got_ip.ip_info.ip.addr.to_le_bytes());
            link.link_up(now_ms(), ip);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    started: bool,
    #[cfg(target_os = "espidf")]
    wifi: Option<esp_idf_svc::wifi::EspWifi<'static>>,
}

impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            started: false,
            #[cfg(target_os = "espidf")]
            wifi: None,
        }
    }

    pub fn ssid(&self) -> &str {
        self.ssid.as_str()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn set_credentials(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> core::result::Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    fn check_startable(&self) -> Result<()> {
        if self.ssid.is_empty() {
            return Err(Error::from(ConnectivityError::NoCredentials));
        }
        if self.started {
            return Err(Error::from(ConnectivityError::AlreadyConnected));
        }
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    /// Start the station.  Link changes are reported on `link` from now on.
    #[cfg(target_os = "espidf")]
    pub fn start(
        &mut self,
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
        link: &'static LinkEvents,
    ) -> Result<()> {
        use esp_idf_svc::sys::*;
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};
        use log::warn;

        self.check_startable()?;
        let failed = |e: EspError| -> Error {
            warn!("WiFi: driver error {:?}", e);
            ConnectivityError::ConnectionFailed.into()
        };

        let mut wifi = EspWifi::new(modem, sysloop, Some(nvs)).map_err(failed)?;

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| Error::from(ConnectivityError::InvalidSsid))?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| Error::from(ConnectivityError::InvalidPassword))?,
            auth_method,
            ..Default::default()
        }))
        .map_err(failed)?;

        // SAFETY: `link` is 'static; the handlers stay registered for the
        // life of the process.
        unsafe {
            let arg = link as *const LinkEvents as *mut core::ffi::c_void;
            esp!(esp_event_handler_register(
                WIFI_EVENT,
                wifi_event_t_WIFI_EVENT_STA_DISCONNECTED as i32,
                Some(events::on_event),
                arg,
            ))
            .map_err(failed)?;
            esp!(esp_event_handler_register(
                IP_EVENT,
                ip_event_t_IP_EVENT_STA_GOT_IP as i32,
                Some(events::on_event),
                arg,
            ))
            .map_err(failed)?;
        }

        wifi.start().map_err(failed)?;
        wifi.connect().map_err(failed)?;
        info!("WiFi: connecting to '{}'", self.ssid);

        self.wifi = Some(wifi);
        self.started = true;
        Ok(())
    }

    /// Simulation: the station associates at once and reports a fixed IP.
    #[cfg(not(target_os = "espidf"))]
    pub fn start(&mut self, link: &LinkEvents, now_ms: u64) -> Result<()> {
        self.check_startable()?;
        self.started = true;
        info!("WiFi(sim): connected to '{}'", self.ssid);
        link.link_up(now_ms, core::net::Ipv4Addr::new(192, 168, 4, 2));
        Ok(())
    }

    /// Simulation: the access point goes away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop(&self, link: &LinkEvents, now_ms: u64) {
        if self.started {
            info!("WiFi(sim): link lost");
            link.link_down(now_ms);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
