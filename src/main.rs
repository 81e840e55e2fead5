use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::{Duration, Instant};

use log::{LevelFilter, info, warn};
use vesc_serial_protocol::{
    Clock, Decode, Encode, Frame, PacketId, SerialChannel, TelemetrySnapshot, VescUart, buffer,
};

/// Drives a simulated controller the way firmware on the host would: set a
/// duty cycle, then poll telemetry.
fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .init();

    let mut uart = VescUart::new(SimulatedVesc::new(), SystemClock::new());
    for _ in 0..3 {
        if let Err(e) = uart.set_duty(-0.1) {
            warn!("set duty failed: {e}");
        }
        match uart.request_telemetry() {
            Ok(values) => println!("{values}"),
            Err(e) => warn!("telemetry request failed: {e}"),
        }
    }
}

struct SystemClock(Instant);

impl SystemClock {
    fn new() -> SystemClock {
        SystemClock(Instant::now())
    }
}

impl Clock for SystemClock {
    fn now_millis(&mut self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }

    fn pause(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Answers `GetValues` with a reply that reflects the last duty command.
struct SimulatedVesc {
    rx: VecDeque<u8>,
    duty: f32,
    tachometer: i32,
}

impl SimulatedVesc {
    fn new() -> SimulatedVesc {
        SimulatedVesc {
            rx: VecDeque::new(),
            duty: 0.0,
            tachometer: 0,
        }
    }

    fn handle(&mut self, payload: &[u8]) {
        let Some((&id, rest)) = payload.split_first() else {
            return;
        };
        let mut ind = 0;
        match PacketId::try_from(id) {
            Ok(PacketId::SetDuty) => {
                if let Ok(duty) = buffer::get_f32(rest, 100_000.0, &mut ind) {
                    self.duty = duty;
                }
            }
            Ok(PacketId::GetValues) => self.reply(),
            Ok(other) => info!("device ignoring {other:?}"),
            Err(e) => warn!("device got {e}"),
        }
    }

    fn reply(&mut self) {
        let rpm = (self.duty * 20_000.0) as i32;
        self.tachometer += rpm / 10;
        let values = TelemetrySnapshot {
            temp_fet: 31.2,
            temp_motor: 27.8,
            avg_motor_current: self.duty.abs() * 20.0,
            avg_input_current: self.duty.abs() * 8.0,
            duty_cycle_now: self.duty,
            rpm,
            input_voltage: 36.4,
            amp_hours: 0.0125,
            amp_hours_charged: 0.0,
            tachometer: self.tachometer,
            tachometer_abs: self.tachometer.abs(),
        };
        // Real firmware sends more fields after the ones decoded here
        let mut payload = [0; 64];
        if values.encode(&mut payload).is_err() {
            return;
        }
        let Ok(frame) = Frame::new(&payload) else {
            return;
        };
        let mut buf = [0; 128];
        if let Ok(n) = frame.encode(&mut buf) {
            self.rx.extend(&buf[..n]);
        }
    }
}

impl SerialChannel for SimulatedVesc {
    type Error = Infallible;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        match Frame::decode(data) {
            Ok(frame) => self.handle(frame.payload),
            Err(e) => warn!("device dropped frame: {e}"),
        }
        Ok(data.len())
    }

    fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.rx.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (slot, b) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}
