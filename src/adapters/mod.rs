//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements    | Connects to                        |
//! |-------------|---------------|------------------------------------|
//! | `device_id` | -             | eFuse MAC, hardware RNG            |
//! | `hardware`  | ActuatorPort  | DFPlayer + display, buzzer, speaker|
//! | `log_sink`  | EventSink     | Serial log output                  |
//! | `mqtt`      | PublishPort   | ESP-IDF MQTT client                |
//! | `nvs`       | ConfigPort    | NVS / in-memory store              |
//! | `time`      | ClockPort     | ESP32 system timer, SNTP wall time |
//! | `wifi`      | LinkPort      | ESP-IDF WiFi STA                   |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
