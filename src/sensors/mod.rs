//! Sensor sampling and debounce engine.
//!
//! Pure logic over injected read functions.  Nothing here touches a
//! register; the [`SensorPort`](crate::app::ports::SensorPort) supplies raw
//! readings and the [`Node`](crate::app::service::Node) owns every channel.

pub mod analog;
pub mod binary;

pub use analog::AnalogChannel;
pub use binary::{BinaryChannel, Level, Transition};
