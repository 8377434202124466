//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements        | Connects to               |
//! |-------------|-------------------|---------------------------|
//! | `hardware`  | SensorPort        | ESP32 ADC, GPIO           |
//! | `mqtt`      | SessionTransport  | ESP-IDF MQTT client       |
//! | `platform`  | PlatformPort      | Restart, sleep, heap      |
//! | `time`      | -                 | ESP32 system timer        |
//! | `wifi`      | -                 | ESP-IDF WiFi STA → LinkEvents |
//! | `device_id` | -                 | Factory MAC (eFuse)       |

pub mod device_id;
pub mod hardware;
pub mod mqtt;
pub mod platform;
pub mod time;
pub mod wifi;
