//! mqttListener Firmware: Main Entry Point
//!
//! Hexagonal architecture around a single blocking dispatch loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Actuator          LogEventSink   NvsAdapter   SystemClock     │
//! │  (MP3/buzzer/spk)  (EventSink)    (ConfigPort) (ClockPort)     │
//! │  WifiLink          MqttSession                                 │
//! │  (LinkPort)        (PublishPort, inbound events)               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ListenerService (pure logic)                │    │
//! │  │  TopicMatcher · RepeatGuard · CommandProcessor         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EVENT_CHANNEL ◀── mqtt-rx thread, console thread              │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Delay;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::UART1;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;

use mqttlistener::VARIANT;
use mqttlistener::adapters::device_id;
use mqttlistener::adapters::log_sink::LogEventSink;
use mqttlistener::adapters::mqtt::MqttSession;
use mqttlistener::adapters::nvs::NvsAdapter;
use mqttlistener::adapters::time::SystemClock;
use mqttlistener::adapters::wifi::WifiLink;
use mqttlistener::app::events::RestartReason;
use mqttlistener::app::ports::{ActuatorPort, ClockPort};
use mqttlistener::app::service::ListenerService;
use mqttlistener::error::Error;
use mqttlistener::events::{self, Event, push_event};
use mqttlistener::pins;
use mqttlistener::settings::SettingsStore;

/// Retained RSSI report period.
const RSSI_INTERVAL_MS: u64 = 60_000;
/// Sleep between queue polls when idle.
const LOOP_IDLE_MS: u64 = 10;
/// Lets the log drain before the chip resets.
const RESTART_FLUSH_MS: u64 = 1_000;

// ── Actuator construction (one per variant) ───────────────────

#[cfg(not(any(feature = "buzzer", feature = "speaker")))]
fn build_actuator(uart: UART1) -> Result<impl ActuatorPort> {
    use esp_idf_svc::hal::gpio::AnyIOPin;
    use esp_idf_svc::hal::uart::{UartDriver, config::Config};
    use esp_idf_svc::hal::units::Hertz;
    use mqttlistener::adapters::hardware::Mp3DisplayActuator;
    use mqttlistener::drivers::dfplayer::DfPlayer;
    use mqttlistener::drivers::display::LogDisplay;

    let config = Config::default().baudrate(Hertz(pins::DFPLAYER_BAUD));
    // SAFETY: the pins come from the board map and nothing else claims them.
    let (tx, rx) = unsafe {
        (
            AnyIOPin::new(pins::DFPLAYER_TX_GPIO),
            AnyIOPin::new(pins::DFPLAYER_RX_GPIO),
        )
    };
    let serial = UartDriver::new(
        uart,
        tx,
        rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &config,
    )?;
    Ok(Mp3DisplayActuator::new(
        DfPlayer::new(serial, Delay::new_default()),
        LogDisplay::new(),
    ))
}

#[cfg(any(feature = "buzzer", feature = "speaker"))]
fn tone_output() -> Result<
    mqttlistener::drivers::tone_out::ToneOutput<
        esp_idf_svc::hal::gpio::PinDriver<
            'static,
            esp_idf_svc::hal::gpio::AnyOutputPin,
            esp_idf_svc::hal::gpio::Output,
        >,
        Delay,
    >,
> {
    use esp_idf_svc::hal::gpio::{AnyOutputPin, PinDriver};
    use mqttlistener::drivers::tone_out::ToneOutput;

    // SAFETY: the pin comes from the board map and nothing else claims it.
    let pin = unsafe { AnyOutputPin::new(pins::TONE_GPIO) };
    Ok(ToneOutput::new(PinDriver::output(pin)?, Delay::new_default()))
}

#[cfg(feature = "buzzer")]
fn build_actuator(_uart: UART1) -> Result<impl ActuatorPort> {
    Ok(mqttlistener::adapters::hardware::BuzzerActuator::new(
        tone_output()?,
    ))
}

#[cfg(all(feature = "speaker", not(feature = "buzzer")))]
fn build_actuator(_uart: UART1) -> Result<impl ActuatorPort> {
    Ok(mqttlistener::adapters::hardware::SpeakerActuator::new(
        tone_output()?,
    ))
}

// ── Helpers ───────────────────────────────────────────────────

fn restart(reason: RestartReason) -> ! {
    warn!("Restarting ({:?})", reason);
    std::thread::sleep(Duration::from_millis(RESTART_FLUSH_MS));
    // SAFETY: plain SoC reset.
    unsafe { esp_idf_sys::esp_restart() }
}

/// Feed typed console lines into the event queue.
fn spawn_console_reader() -> Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(4 * 1024)
        .spawn(|| {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                match stdin.lock().read_line(&mut line) {
                    Ok(n) if n > 0 && line.ends_with('\n') => {
                        push_event(Event::console_line(&line));
                        line.clear();
                    }
                    _ => std::thread::sleep(Duration::from_millis(50)),
                }
            }
        })?;
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  mqttListener v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!("Variant: {:?}", VARIANT);

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Load settings ──────────────────────────────────────
    let nvs = NvsAdapter::new().map_err(Error::from)?;
    let settings = SettingsStore::load(nvs, device_id::random_seed());

    let clock = SystemClock::new();
    let mut sink = LogEventSink::new();
    let mut app = ListenerService::new(settings, VARIANT.profile(), clock.uptime_ms());

    // ── 3. Actuator ───────────────────────────────────────────
    let mut hw = build_actuator(peripherals.uart1)?;
    if let Err(reason) = app.start(&mut hw, &mut Delay::new_default(), &mut sink) {
        restart(reason);
    }

    // ── 4. Console ────────────────────────────────────────────
    spawn_console_reader()?;

    // ── 5. Network (only with complete settings) ──────────────
    let mut wifi = WifiLink::new(peripherals.modem, sys_loop, nvs_partition).map_err(Error::from)?;
    let mut mqtt: Option<MqttSession> = None;
    let mut _sntp: Option<EspSntp<'static>> = None;

    if app.is_configured() {
        let cfg = app.settings().config().clone();
        if let Err(e) = wifi.connect(&cfg.ssid, &cfg.wifi_password) {
            warn!("WiFi unavailable: {}", e);
            restart(RestartReason::WifiUnavailable);
        }
        match EspSntp::new_default() {
            Ok(sntp) => _sntp = Some(sntp),
            Err(e) => warn!("SNTP start failed: {}", e),
        }
        mqtt = Some(MqttSession::start(&cfg).map_err(Error::from)?);
    } else {
        warn!("Settings incomplete; waiting for console configuration");
    }

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    let mut last_rssi_ms = clock.uptime_ms();
    let mut clock_reported = false;

    loop {
        while let Some(event) = events::next_event() {
            let restart_reason = match event {
                Event::MessageReceived { topic, payload } => match mqtt.as_mut() {
                    Some(session) => app.handle_message(
                        &topic, &payload, &mut hw, session, &clock, &wifi, &mut sink,
                    ),
                    None => None,
                },
                Event::ConsoleLine(line) => app.on_console_line(&line, &mut hw, &wifi, &mut sink),
                Event::BrokerConnected => {
                    info!("Broker session up");
                    None
                }
                Event::BrokerDisconnected => {
                    if !wifi.is_connected() {
                        warn!("WiFi link lost");
                    }
                    None
                }
            };
            if let Some(reason) = restart_reason {
                restart(reason);
            }
        }

        if !clock_reported && clock.is_synced() {
            info!("Wall clock set, epoch {}", clock.epoch_secs());
            clock_reported = true;
        }

        if let Some(session) = mqtt.as_mut() {
            let now = clock.uptime_ms();
            if now.saturating_sub(last_rssi_ms) >= RSSI_INTERVAL_MS {
                app.publish_rssi(&wifi, session);
                last_rssi_ms = now;
            }
        }

        std::thread::sleep(Duration::from_millis(LOOP_IDLE_MS));
    }
}
