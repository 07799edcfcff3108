//! Drives an oven connection from tokio timers and prints what comes back

use anyhow::{bail, Context, Result};
use chrono::Local;
use ovencomm_core::config::OvenConfig;
use ovencomm_core::protocol::{Command, EventReceiver, OvenConnection, OvenEvent, Transport};
use ovencomm_core::values::Reading;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::Action;

/// Commands issued on every monitor poll
const MONITOR_READS: [Command; 4] = [
    Command::GetTemp,
    Command::GetSetTemp,
    Command::GetOutput,
    Command::GetPowerStatus,
];

/// An open link plus the event stream it reports on
pub(crate) struct Session<T: Transport> {
    conn: OvenConnection<T>,
    events: EventReceiver,
    tick: Duration,
    raw: bool,
}

impl<T: Transport> Session<T> {
    /// Open the configured port over `transport`
    pub(crate) fn open(transport: T, config: &OvenConfig, raw: bool) -> Result<Self> {
        let (mut conn, events) = OvenConnection::new(transport, config.connection_settings());
        conn.open(&config.port)
            .with_context(|| format!("failed to open {}", config.port.port_name))?;

        Ok(Self {
            conn,
            events,
            tick: config.dispatch_interval(),
            raw,
        })
    }

    /// Perform `action`, stopping early on Ctrl-C, then close the link
    pub(crate) async fn run(mut self, action: Action) -> Result<()> {
        let result = tokio::select! {
            result = self.execute(action) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                Ok(())
            }
        };
        self.conn.close();
        result
    }

    async fn execute(&mut self, action: Action) -> Result<()> {
        let command = match action {
            Action::Monitor { interval_ms, count } => {
                return self
                    .monitor(Duration::from_millis(interval_ms.max(1)), count)
                    .await;
            }
            Action::SetTemp(celsius) => {
                self.conn.set_temperature(celsius);
                Command::SetTemp
            }
            Action::Power(on) => {
                self.conn.set_power_status(on);
                Command::SetPowerStatus
            }
            Action::ReadTemp => self.issue(Command::GetTemp),
            Action::ReadSetTemp => self.issue(Command::GetSetTemp),
            Action::ReadOutput => self.issue(Command::GetOutput),
            Action::SensorStatus => self.issue(Command::GetSensorStatus),
            Action::PowerStatus => self.issue(Command::GetPowerStatus),
        };
        self.await_reply(command).await
    }

    /// Queue a read request
    fn issue(&mut self, command: Command) -> Command {
        match command {
            Command::GetTemp => self.conn.read_temperature(),
            Command::GetSetTemp => self.conn.read_set_temperature(),
            Command::GetOutput => self.conn.read_output(),
            Command::GetSensorStatus => self.conn.read_sensor_status(),
            Command::GetPowerStatus => self.conn.read_power_status(),
            other => self.conn.request(other, 0),
        }
        command
    }

    /// Service the link until `command` completes or fails
    async fn await_reply(&mut self, command: Command) -> Result<()> {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.conn.service(Instant::now().into_std());

            while let Ok(event) = self.events.try_recv() {
                match event {
                    OvenEvent::Value { value, command: answered } if answered == command => {
                        println!("{}", describe(answered, value));
                        return Ok(());
                    }
                    OvenEvent::Error { error, command: failed } if failed == command => {
                        bail!("{} failed: {}", command.name(), error);
                    }
                    OvenEvent::Disconnected { reason } => bail!("link lost: {}", reason),
                    other => self.report(other),
                }
            }
        }
    }

    /// Poll the oven every `every` until `count` polls have completed
    async fn monitor(&mut self, every: Duration, count: Option<u64>) -> Result<()> {
        let mut poll = interval(every);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0u64;

        loop {
            let more = count.map_or(true, |n| polls < n);
            tokio::select! {
                _ = poll.tick(), if more => {
                    if self.conn.pending() > 0 {
                        debug!("previous poll still pending, skipping");
                    } else {
                        for command in MONITOR_READS {
                            self.issue(command);
                        }
                        polls += 1;
                    }
                }
                _ = ticker.tick() => {
                    self.conn.service(Instant::now().into_std());
                    while let Ok(event) = self.events.try_recv() {
                        if let OvenEvent::Disconnected { reason } = event {
                            bail!("link lost: {}", reason);
                        }
                        self.report(event);
                    }
                    if !more && self.conn.pending() == 0 {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn report(&self, event: OvenEvent) {
        match event {
            OvenEvent::Value { value, command } => {
                println!("[{}] {}", timestamp(), describe(command, value));
            }
            OvenEvent::RawFrame(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                if self.raw {
                    println!("[{}] rx {}", timestamp(), text);
                } else {
                    debug!("rx {}", text);
                }
            }
            OvenEvent::Error { error, command } => warn!("{}: {}", command, error),
            OvenEvent::Disconnected { reason } => warn!("disconnected: {}", reason),
        }
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

/// Render a response value for display
fn describe(command: Command, value: u16) -> String {
    match Reading::from_response(command, value) {
        Some(reading) => format!("{}: {}", command.name(), reading),
        None => format!("{}: {}", command.name(), value),
    }
}
