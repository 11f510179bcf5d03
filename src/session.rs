use std::{
    fmt, thread,
    time::{Duration, Instant},
};

use crate::{
    ack::{AckOutcome, AckWaiter},
    buffer::SentenceBuffer,
    config::SessionConfig,
    error::GpsError,
    nmea::{Altitude, Fix, Position, SentenceCache, Velocity},
    transport::Transport,
    ubx::{
        CfgCfg, CfgGnss, CfgItfm, CfgMsg, CfgNav5, CfgNavx5, CfgPrtUart, CfgRate, CfgRst,
        CommandPacket, SaveDevice, UbxCommand, NMEA_VTG,
    },
};

/// Highest output rate the receiver supports, Hz
pub const MAX_RATE_HZ: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bounded retry with a fixed pause between attempts
pub struct RetryPolicy {
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Pause between two attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Call `attempt` until it yields ACK or NAK, or the attempts run out.
    ///
    /// `attempt` receives the 1-based attempt number. Only
    /// [`AckOutcome::Unknown`] is retried; a NAK is final. At least one
    /// attempt is made even when `max_attempts` is 0.
    pub fn run<F>(&self, mut attempt: F) -> Result<AckOutcome, GpsError>
    where
        F: FnMut(u32) -> Result<AckOutcome, GpsError>,
    {
        let attempts = self.attempts();
        let mut outcome = AckOutcome::Unknown;
        for n in 1..=attempts {
            outcome = attempt(n)?;
            if outcome != AckOutcome::Unknown {
                break;
            }
            if n < attempts {
                log::warn!("No reply on attempt {n}/{attempts}, retrying");
                thread::sleep(self.backoff);
            }
        }
        Ok(outcome)
    }

    /// Attempts [`run`](Self::run) makes before giving up
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Steps of [`ReceiverSession::module_setup`], in execution order
pub enum SetupStep {
    /// Turn off the redundant VTG sentence
    DisableVtg,
    /// Dynamic model, fix mode, elevation mask
    Navigation,
    /// Satellite count limits, AssistNow Autonomous
    SatelliteConstraints,
    /// Constellation mix
    Constellations,
    /// Jamming detection
    Interference,
    /// Save to non-volatile storage
    Persist,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStep::DisableVtg => "disable VTG",
            SetupStep::Navigation => "navigation mode",
            SetupStep::SatelliteConstraints => "satellite constraints",
            SetupStep::Constellations => "constellations",
            SetupStep::Interference => "interference detection",
            SetupStep::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Settings applied by [`ReceiverSession::module_setup`]
pub struct ModuleSetup {
    /// UBX-CFG-NAV5
    pub navigation: CfgNav5,
    /// UBX-CFG-NAVX5
    pub constraints: CfgNavx5,
    /// UBX-CFG-GNSS
    pub constellations: CfgGnss,
    /// UBX-CFG-ITFM
    pub interference: CfgItfm,
    /// Storage for UBX-CFG-CFG; receivers without flash need [`SaveDevice::Bbr`]
    pub save_device: SaveDevice,
}

impl Default for ModuleSetup {
    fn default() -> Self {
        Self {
            navigation: CfgNav5::default(),
            constraints: CfgNavx5::default(),
            constellations: CfgGnss::default(),
            interference: CfgItfm::default(),
            save_device: SaveDevice::Flash,
        }
    }
}

impl ModuleSetup {
    /// Packets in execution order
    pub fn steps(&self) -> Vec<(SetupStep, CommandPacket)> {
        vec![
            (SetupStep::DisableVtg, CfgMsg::disable_nmea(NMEA_VTG).to_packet()),
            (SetupStep::Navigation, self.navigation.to_packet()),
            (SetupStep::SatelliteConstraints, self.constraints.to_packet()),
            (SetupStep::Constellations, self.constellations.to_packet()),
            (SetupStep::Interference, self.interference.to_packet()),
            (SetupStep::Persist, CfgCfg::save_all(self.save_device).to_packet()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Result of a setup sequence
pub struct SetupOutcome {
    /// Steps the receiver acknowledged
    pub completed: Vec<SetupStep>,
    /// Step that stopped the sequence and how it ended
    pub failed: Option<(SetupStep, AckOutcome)>,
}

impl SetupOutcome {
    /// Every step was acknowledged
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

/// One receiver on one transport.
///
/// Owns the sentence buffer and cache; exposes reads and configuration.
pub struct ReceiverSession<T: Transport> {
    transport: T,
    buffer: SentenceBuffer,
    cache: SentenceCache,
    config: SessionConfig,
    waiter: AckWaiter,
    retry: RetryPolicy,
}

impl<T: Transport> ReceiverSession<T> {
    /// Session with default settings
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Session with explicit settings
    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            buffer: SentenceBuffer::new(config.buffer_capacity),
            cache: SentenceCache::default(),
            waiter: AckWaiter::new(config.ack_timeout(), config.poll_interval()),
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                backoff: config.backoff(),
            },
            config,
        }
    }

    /// Active settings
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Latest sentence of each kind
    pub fn cache(&self) -> &SentenceCache {
        &self.cache
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutable
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Refresh the cache with `sentences_per_update` valid records.
    ///
    /// Stops early when the read deadline passes. Returns how many records
    /// were cached; bad records are skipped and not counted.
    pub fn update(&mut self) -> Result<usize, GpsError> {
        let start = Instant::now();
        let mut decoded = 0;
        while decoded < self.config.sentences_per_update {
            if let Some(record) = self.buffer.extract_next() {
                match self.cache.decode(&record) {
                    Ok(kind) => {
                        decoded += 1;
                        log::trace!("Cached {}", String::from_utf8_lossy(&kind));
                    }
                    Err(e) => log::debug!("Discarding record: {e}"),
                }
                continue;
            }
            if start.elapsed() >= self.config.read_timeout() {
                log::warn!(
                    "Read deadline passed with {decoded}/{} sentences",
                    self.config.sentences_per_update
                );
                break;
            }
            let data = self.transport.read_available()?;
            if data.is_empty() {
                thread::sleep(self.config.poll_interval());
            } else {
                self.buffer.append(&data);
            }
        }
        Ok(decoded)
    }

    /// Refresh, then read the position
    pub fn position(&mut self) -> Result<Position, GpsError> {
        self.update()?;
        Ok(self.cache.position(&self.config.error_model))
    }

    /// Read speed and course, refreshing first if asked
    pub fn velocity(&mut self, refresh: bool) -> Result<Velocity, GpsError> {
        if refresh {
            self.update()?;
        }
        Ok(self.cache.velocity())
    }

    /// Read altitude, refreshing first if asked
    pub fn altitude(&mut self, refresh: bool) -> Result<Altitude, GpsError> {
        if refresh {
            self.update()?;
        }
        Ok(self.cache.altitude(&self.config.error_model))
    }

    /// Refresh once, then merge position, velocity and altitude
    pub fn fix(&mut self) -> Result<Fix, GpsError> {
        let pos = self.position()?;
        let vel = self.velocity(false)?;
        let alt = self.altitude(false)?;
        Ok(Fix::combine(pos, vel, alt, &self.config.error_model))
    }

    /// Send a command and wait for its ACK/NAK, retrying on silence
    pub fn send_command(&mut self, packet: &CommandPacket) -> Result<AckOutcome, GpsError> {
        let bytes = packet.to_bytes();
        let transport = &mut self.transport;
        let waiter = &self.waiter;
        let (class, id) = (packet.class(), packet.id());
        let outcome = self.retry.run(|attempt| {
            log::debug!("Sending {class:02X}-{id:02X}, attempt {attempt}");
            transport.write(&bytes)?;
            waiter.wait(&mut *transport, class, id)
        })?;
        match outcome {
            AckOutcome::Acknowledged => log::debug!("{class:02X}-{id:02X} acknowledged"),
            AckOutcome::NegativeAcknowledged => log::warn!("{class:02X}-{id:02X} rejected"),
            AckOutcome::Unknown => log::warn!(
                "{class:02X}-{id:02X} unanswered after {} attempts",
                self.retry.attempts()
            ),
        }
        Ok(outcome)
    }

    /// Typed variant of [`send_command`](Self::send_command)
    pub fn configure<C: UbxCommand>(&mut self, command: &C) -> Result<AckOutcome, GpsError> {
        self.send_command(&command.to_packet())
    }

    /// Set the navigation output rate.
    ///
    /// `rate_hz` must be in (0, 10]; the interval is truncated to whole ms.
    pub fn set_rate(
        &mut self,
        rate_hz: f64,
        measurements_per_solution: u16,
    ) -> Result<AckOutcome, GpsError> {
        if !(rate_hz > 0.0 && rate_hz <= MAX_RATE_HZ) {
            return Err(GpsError::InvalidRate(rate_hz));
        }
        self.configure(&CfgRate::from_hz(rate_hz, measurements_per_solution))
    }

    /// Switch the receiver UART and the local transport to `baud_rate`
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<AckOutcome, GpsError> {
        let outcome = self.configure(&CfgPrtUart { baud_rate })?;
        if outcome.is_ack() {
            self.transport.reopen(baud_rate)?;
            self.buffer.clear();
        }
        Ok(outcome)
    }

    /// Stop GNSS processing. Reset commands are never acknowledged.
    pub fn gnss_stop(&mut self) -> Result<(), GpsError> {
        self.transport.write(&CfgRst::gnss_stop().to_packet().to_bytes())
    }

    /// Resume GNSS processing after [`gnss_stop`](Self::gnss_stop)
    pub fn gnss_start(&mut self) -> Result<(), GpsError> {
        self.transport.write(&CfgRst::gnss_start().to_packet().to_bytes())
    }

    /// Run the full configuration sequence, stopping at the first step
    /// that is not acknowledged.
    pub fn module_setup(&mut self, setup: &ModuleSetup) -> Result<SetupOutcome, GpsError> {
        let mut result = SetupOutcome::default();
        for (step, packet) in setup.steps() {
            let outcome = self.send_command(&packet)?;
            if !outcome.is_ack() {
                log::error!("Module setup stopped at {step}: {outcome:?}");
                result.failed = Some((step, outcome));
                return Ok(result);
            }
            log::info!("Module setup: {step} done");
            result.completed.push(step);
        }
        Ok(result)
    }
}
