//! Transport seam.
//!
//! The protocol layer never touches HID. A [`FrameTransport`] moves one
//! ASCII-hex frame at a time, and [`drive`] runs the engine's queues against
//! it in strict send/receive alternation.

use crate::engine::{Lpu237, StepOutcome};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Device disconnected")]
    Disconnected,

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("No response available")]
    NoResponse,
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Half-duplex frame transport.
pub trait FrameTransport {
    fn send(&mut self, wire: &str) -> TransportResult<()>;

    fn receive(&mut self) -> TransportResult<String>;
}

/// Counts from one [`drive`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriveSummary {
    pub sent: usize,
    pub applied: usize,
    pub rejected: usize,
}

/// Sends every queued transaction and feeds each response back through the
/// engine. On a transport error the engine's queues are cleared before the
/// error is returned.
pub fn drive<T: FrameTransport + ?Sized>(
    device: &mut Lpu237,
    transport: &mut T,
) -> TransportResult<DriveSummary> {
    let mut summary = DriveSummary::default();
    while let Some(wire) = device.get_tx_transaction() {
        let exchange = transport.send(&wire).and_then(|()| transport.receive());
        let response = match exchange {
            Ok(response) => response,
            Err(e) => {
                warn!("transport failed after {} frames: {}", summary.sent, e);
                device.clear_transaction();
                return Err(e);
            }
        };
        summary.sent += 1;
        device.set_rx_transaction(&response);
        match device.set_from_rx() {
            StepOutcome::Applied(_) => summary.applied += 1,
            StepOutcome::Rejected(_) => summary.rejected += 1,
            StepOutcome::Incomplete => {}
        }
    }
    Ok(summary)
}

pub mod mock {
    //! In-memory transports for tests and offline tooling.

    use super::{FrameTransport, TransportError, TransportResult};
    use crate::memory::{RECORD_BASE, RECORD_SIZE, UID_SIZE};
    use crate::record::SystemRecord;
    use crate::request::{AccessKind, CMD_CONFIG, Command, parse_config_request};
    use crate::wire::{self, RESULT_ERROR, RESULT_GOOD, RESULT_NEGATIVE_GOOD};
    use std::collections::VecDeque;
    use tracing::debug;

    /// Device-side model of an LPU237 backed by a system record image.
    #[derive(Debug, Clone)]
    pub struct SimulatedLpu237 {
        image: Vec<u8>,
        uid: [u8; UID_SIZE],
        is_standard: bool,
        ibutton_only: bool,
        supports_mmd1000: bool,
        config_mode: bool,
        opos: bool,
        bootloader: bool,
        applies: usize,
        connected: bool,
        outbox: VecDeque<String>,
    }

    impl SimulatedLpu237 {
        pub fn new(record: &SystemRecord) -> Self {
            let mut uid = [0u8; UID_SIZE];
            for (slot, value) in uid.iter_mut().zip(1u8..) {
                *slot = value;
            }
            Self {
                image: record.to_bytes(),
                uid,
                is_standard: true,
                ibutton_only: false,
                supports_mmd1000: false,
                config_mode: false,
                opos: false,
                bootloader: false,
                applies: 0,
                connected: true,
                outbox: VecDeque::new(),
            }
        }

        pub fn with_uid(mut self, uid: [u8; UID_SIZE]) -> Self {
            self.uid = uid;
            self
        }

        /// Sets the answers to the `'D'`, `'W'` and `'N'` probes.
        pub fn with_probes(mut self, is_standard: bool, ibutton_only: bool, mmd1000: bool) -> Self {
            self.is_standard = is_standard;
            self.ibutton_only = ibutton_only;
            self.supports_mmd1000 = mmd1000;
            self
        }

        pub fn image(&self) -> &[u8] {
            &self.image
        }

        pub fn record(&self) -> crate::error::ProtocolResult<SystemRecord> {
            SystemRecord::from_bytes(&self.image)
        }

        pub fn in_config_mode(&self) -> bool {
            self.config_mode
        }

        pub fn in_opos(&self) -> bool {
            self.opos
        }

        pub fn in_bootloader(&self) -> bool {
            self.bootloader
        }

        /// Number of accepted apply commands.
        pub fn apply_count(&self) -> usize {
            self.applies
        }

        pub fn disconnect(&mut self) {
            self.connected = false;
        }

        fn reply(result: u8, payload: &[u8]) -> String {
            wire::encode_response(result, payload)
                .unwrap_or_else(|_| wire::encode_response(RESULT_ERROR, &[]).unwrap_or_default())
        }

        fn probe(answer: bool) -> String {
            Self::reply(
                if answer {
                    RESULT_GOOD
                } else {
                    RESULT_NEGATIVE_GOOD
                },
                &[],
            )
        }

        /// Executes one request frame and returns the response frame.
        pub fn handle(&mut self, request: &str) -> String {
            let error = Self::reply(RESULT_ERROR, &[]);
            let good = Self::reply(RESULT_GOOD, &[]);
            let Some(raw) = wire::parse_request(request) else {
                return error;
            };
            if raw.command == CMD_CONFIG {
                return self.access(request);
            }
            let Some(command) = Command::from_byte(raw.command) else {
                return error;
            };
            match command {
                Command::EnterConfig => {
                    self.config_mode = true;
                    good
                }
                Command::LeaveConfig => {
                    self.config_mode = false;
                    good
                }
                Command::EnterOpos => {
                    self.opos = true;
                    good
                }
                Command::LeaveOpos => {
                    self.opos = false;
                    good
                }
                Command::Apply if self.config_mode => {
                    self.applies += 1;
                    good
                }
                Command::GotoBootloader if self.config_mode => {
                    self.bootloader = true;
                    good
                }
                Command::Apply | Command::GotoBootloader => error,
                Command::GetUid => Self::reply(RESULT_GOOD, &self.uid),
                Command::GetIsStandard => Self::probe(self.is_standard),
                Command::GetIsIButtonOnly => Self::probe(self.ibutton_only),
                Command::GetSupportsMmd1000 => Self::probe(self.supports_mmd1000),
            }
        }

        fn access(&mut self, request: &str) -> String {
            let error = Self::reply(RESULT_ERROR, &[]);
            if !self.config_mode {
                return error;
            }
            let Some(access) = parse_config_request(request) else {
                return error;
            };
            let (Some(start), Ok(len)) = (
                access.offset.checked_sub(RECORD_BASE),
                usize::try_from(access.size),
            ) else {
                return error;
            };
            let Ok(start) = usize::try_from(start) else {
                return error;
            };
            let end = start.saturating_add(len);
            if end > RECORD_SIZE {
                return error;
            }
            match access.kind {
                AccessKind::Get => match self.image.get(start..end) {
                    Some(data) => Self::reply(RESULT_GOOD, data),
                    None => error,
                },
                AccessKind::Set => match self.image.get_mut(start..end) {
                    Some(slot) => {
                        slot.copy_from_slice(&access.data);
                        debug!("simulator wrote {} bytes at {}", len, access.offset);
                        Self::reply(RESULT_GOOD, &[])
                    }
                    None => error,
                },
            }
        }
    }

    impl FrameTransport for SimulatedLpu237 {
        fn send(&mut self, wire: &str) -> TransportResult<()> {
            if !self.connected {
                return Err(TransportError::Disconnected);
            }
            let response = self.handle(wire);
            self.outbox.push_back(response);
            Ok(())
        }

        fn receive(&mut self) -> TransportResult<String> {
            if !self.connected {
                return Err(TransportError::Disconnected);
            }
            self.outbox.pop_front().ok_or(TransportError::NoResponse)
        }
    }

    /// Replays canned responses and records every frame sent.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedTransport {
        responses: VecDeque<String>,
        sent: Vec<String>,
    }

    impl ScriptedTransport {
        pub fn new<I, S>(responses: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                responses: responses.into_iter().map(Into::into).collect(),
                sent: Vec::new(),
            }
        }

        pub fn sent(&self) -> &[String] {
            &self.sent
        }

        pub fn remaining(&self) -> usize {
            self.responses.len()
        }
    }

    impl FrameTransport for ScriptedTransport {
        fn send(&mut self, wire: &str) -> TransportResult<()> {
            self.sent.push(wire.to_owned());
            Ok(())
        }

        fn receive(&mut self) -> TransportResult<String> {
            self.responses.pop_front().ok_or(TransportError::NoResponse)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{ScriptedTransport, SimulatedLpu237};
    use super::*;
    use crate::engine::EngineState;
    use crate::record::SystemRecord;
    use crate::types::Interface;

    #[test]
    fn test_drive_scripted_bootloader() {
        let mut device = Lpu237::new();
        device.generate_run_bootloader();
        let mut transport = ScriptedTransport::new(["52ff00", "52ff00"]);
        let summary = drive(&mut device, &mut transport).expect("two responses");
        assert_eq!(
            summary,
            DriveSummary {
                sent: 2,
                applied: 2,
                rejected: 0
            }
        );
        assert_eq!(transport.sent(), ["580000", "470000"]);
    }

    #[test]
    fn test_drive_clears_on_missing_response() {
        let mut device = Lpu237::new();
        device.generate_get_system_information().expect("fixed");
        let mut transport = ScriptedTransport::new(["52ff00"]);
        let err = drive(&mut device, &mut transport).expect_err("script runs dry");
        assert_eq!(err, TransportError::NoResponse);
        assert_eq!(device.state(), EngineState::Idle);
        assert_eq!(device.pending_tx(), 0);
    }

    #[test]
    fn test_simulator_requires_config_mode() {
        let mut sim = SimulatedLpu237::new(&SystemRecord::factory_default());
        assert_eq!(sim.handle("41c9081c00000004000000"), "520000");
        assert_eq!(sim.handle("420000"), "520000");
        assert_eq!(sim.handle("580000"), "52ff00");
        assert_eq!(sim.handle("41c9081c00000004000000"), "52ff0405140000");
        assert_eq!(sim.handle("420000"), "52ff00");
        assert_eq!(sim.apply_count(), 1);
    }

    #[test]
    fn test_simulator_probe_answers() {
        let mut sim =
            SimulatedLpu237::new(&SystemRecord::factory_default()).with_probes(false, true, false);
        assert_eq!(sim.handle("440000"), "528000");
        assert_eq!(sim.handle("570000"), "52ff00");
        assert_eq!(sim.handle("4e0000"), "528000");
    }

    #[test]
    fn test_drive_against_simulator_writes_image() {
        let mut sim = SimulatedLpu237::new(&SystemRecord::factory_default());
        let mut device = Lpu237::new();
        device.config_mut().set_interface(Interface::Rs232);
        device.generate_set_parameters().expect("encodes");
        let summary = drive(&mut device, &mut sim).expect("simulator answers");
        assert_eq!(summary.rejected, 0);
        assert_eq!(sim.image()[42], 10);
        assert!(!sim.in_config_mode());
        assert!(device.config().dirty().is_empty());
    }

    #[test]
    fn test_disconnected_simulator() {
        let mut sim = SimulatedLpu237::new(&SystemRecord::factory_default());
        sim.disconnect();
        let mut device = Lpu237::new();
        device.generate_enable_read(true);
        assert_eq!(
            drive(&mut device, &mut sim),
            Err(TransportError::Disconnected)
        );
    }
}
