//! Transaction engine.
//!
//! Three FIFOs drive a session: request types and outgoing wire strings are
//! filled together by the sequence generators, incoming responses are
//! appended by the transport. [`Lpu237::set_from_rx`] pairs the oldest
//! request with the oldest response. There are no sequence numbers on the
//! wire, so the transport must deliver responses in send order.

use crate::chunked::RecordAssembler;
use crate::config::DeviceConfig;
use crate::error::ProtocolResult;
use crate::field::Field;
use crate::memory::UID_SIZE;
use crate::record::SystemRecord;
use crate::request::{Command, Request};
use crate::sequence::{self, Sequence};
use crate::types::DeviceFunction;
use crate::wire::Response;
use std::collections::VecDeque;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No request waiting for a response.
    Idle,
    /// At least one request type is queued.
    Pending,
}

/// Result of one [`Lpu237::set_from_rx`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The response decoded and the model was updated.
    Applied(Request),
    /// The response was consumed but did not decode for its request.
    Rejected(Request),
    /// Either queue was empty; nothing was consumed.
    Incomplete,
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    request: Request,
    commit: bool,
}

/// Bookkeeping for queued set sequences.
#[derive(Debug, Default, Clone, Copy)]
struct Commit {
    remaining: usize,
    rejected: bool,
}

/// One LPU237 session: configuration model plus transaction queues.
#[derive(Debug, Default)]
pub struct Lpu237 {
    config: DeviceConfig,
    request_types: VecDeque<Pending>,
    tx_wire: VecDeque<String>,
    rx_wire: VecDeque<String>,
    commit: Commit,
    assembler: RecordAssembler,
    record: Option<SystemRecord>,
}

impl Lpu237 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session from an already known model.
    pub fn with_config(config: DeviceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Mutable access for the setters. Changes are recorded by the model's
    /// change tracker.
    pub fn config_mut(&mut self) -> &mut DeviceConfig {
        &mut self.config
    }

    pub fn into_config(self) -> DeviceConfig {
        self.config
    }

    /// The last system record read in full.
    pub fn record(&self) -> Option<&SystemRecord> {
        self.record.as_ref()
    }

    pub fn state(&self) -> EngineState {
        if self.request_types.is_empty() {
            EngineState::Idle
        } else {
            EngineState::Pending
        }
    }

    pub fn pending_requests(&self) -> usize {
        self.request_types.len()
    }

    pub fn pending_tx(&self) -> usize {
        self.tx_wire.len()
    }

    pub fn pending_rx(&self) -> usize {
        self.rx_wire.len()
    }

    // ── queue interface ─────────────────────────────────────────────────

    /// Next wire string to send, oldest first.
    pub fn get_tx_transaction(&mut self) -> Option<String> {
        let wire = self.tx_wire.pop_front()?;
        trace!("tx {}", wire);
        Some(wire)
    }

    /// Appends one raw response as received from the transport.
    pub fn set_rx_transaction(&mut self, response: &str) {
        trace!("rx {}", response);
        self.rx_wire.push_back(response.trim().to_owned());
    }

    /// Drops every queued request, outgoing and incoming frame.
    pub fn clear_transaction(&mut self) {
        if !self.request_types.is_empty() || !self.rx_wire.is_empty() {
            debug!(
                "clearing {} queued requests and {} responses",
                self.request_types.len(),
                self.rx_wire.len()
            );
        }
        self.request_types.clear();
        self.tx_wire.clear();
        self.rx_wire.clear();
        self.commit = Commit::default();
        self.assembler.reset();
    }

    /// Consumes one (request, response) pair and applies it to the model.
    ///
    /// A response that fails to decode is still consumed.
    pub fn set_from_rx(&mut self) -> StepOutcome {
        if self.request_types.is_empty() || self.rx_wire.is_empty() {
            return StepOutcome::Incomplete;
        }
        let (Some(pending), Some(raw)) = (self.request_types.pop_front(), self.rx_wire.pop_front())
        else {
            return StepOutcome::Incomplete;
        };

        let applied = match Response::parse(&raw) {
            Some(response) => self.dispatch(pending.request, &response),
            None => {
                warn!("{}: malformed response {:?}", pending.request, raw);
                false
            }
        };
        if !applied {
            warn!("{}: response rejected", pending.request);
        } else {
            debug!("{}: applied", pending.request);
        }
        if pending.commit {
            self.track_commit(applied);
        }

        if applied {
            StepOutcome::Applied(pending.request)
        } else {
            StepOutcome::Rejected(pending.request)
        }
    }

    fn dispatch(&mut self, request: Request, response: &Response) -> bool {
        match request {
            Request::Command(Command::GetUid) => match response.hex(UID_SIZE) {
                Some(uid) => {
                    self.config.uid = uid;
                    true
                }
                None => false,
            },
            Request::Command(Command::GetIsStandard) => {
                self.config.function = if response.is_strictly_good() {
                    DeviceFunction::MsrAndIButton
                } else {
                    DeviceFunction::MsrOnly
                };
                true
            }
            Request::Command(Command::GetIsIButtonOnly) => {
                if response.is_strictly_good() {
                    self.config.function = DeviceFunction::IButtonOnly;
                }
                true
            }
            Request::Command(Command::GetSupportsMmd1000) => {
                self.config.supports_mmd1000 = response.is_strictly_good();
                true
            }
            Request::Command(_) | Request::Set(_) | Request::SetRecordChunk(_) => {
                response.is_success()
            }
            Request::Get(field) => {
                let loaded = self.config.load_field(field, response);
                if loaded && field == Field::Version {
                    let features = self.config.features();
                    debug!(
                        "firmware {}: bootloader {:?}, keymap table removed {}",
                        self.config.version(),
                        features.bootloader,
                        features.keymap_table_removed
                    );
                }
                loaded
            }
            Request::GetRecordChunk(chunk) => {
                let Some(data) = response.bytes(chunk.len()) else {
                    self.assembler.reset();
                    return false;
                };
                match self.assembler.push(chunk, data) {
                    Ok(Some(record)) => {
                        record.apply_to(&mut self.config);
                        self.record = Some(record);
                        true
                    }
                    Ok(None) => true,
                    Err(e) => {
                        warn!("record transfer failed: {}", e);
                        false
                    }
                }
            }
        }
    }

    fn track_commit(&mut self, applied: bool) {
        self.commit.remaining = self.commit.remaining.saturating_sub(1);
        self.commit.rejected |= !applied;
        if self.commit.remaining > 0 {
            return;
        }
        if self.commit.rejected {
            warn!(
                "set sequence incomplete; keeping {} dirty fields",
                self.config.dirty.len()
            );
        } else {
            info!("committed {} fields", self.config.dirty.len());
            self.config.dirty.clear();
        }
        self.commit = Commit::default();
    }

    fn enqueue(&mut self, sequence: Sequence) {
        let commit = sequence.is_commit();
        let entries = sequence.into_entries();
        if commit {
            self.commit.remaining = self.commit.remaining.saturating_add(entries.len());
        }
        for (request, wire) in entries {
            self.request_types.push_back(Pending { request, commit });
            self.tx_wire.push_back(wire);
        }
    }

    fn enqueue_result(&mut self, name: &str, built: ProtocolResult<Sequence>) -> ProtocolResult<usize> {
        match built {
            Ok(sequence) => {
                let count = sequence.len();
                self.enqueue(sequence);
                debug!("{}: queued {} transactions", name, count);
                Ok(count)
            }
            Err(e) => {
                warn!("{}: sequence aborted: {}", name, e);
                Err(e)
            }
        }
    }

    // ── sequence generators ─────────────────────────────────────────────

    /// Queues the identity reads. Returns the number of queued transactions.
    pub fn generate_get_system_information(&mut self) -> ProtocolResult<usize> {
        self.enqueue_result("get system information", sequence::system_information())
    }

    /// Queues every parameter read the current firmware supports.
    pub fn generate_get_parameters(&mut self) -> ProtocolResult<usize> {
        let built = sequence::get_parameters(self.config.features());
        self.enqueue_result("get parameters", built)
    }

    /// Queues writes for the dirty fields. Nothing is queued when the model
    /// is clean.
    pub fn generate_set_parameters(&mut self) -> ProtocolResult<usize> {
        let built = sequence::set_parameters(&self.config);
        self.enqueue_result("set parameters", built)
    }

    pub fn generate_enable_read(&mut self, enable: bool) -> usize {
        let sequence = sequence::enable_read(enable);
        let count = sequence.len();
        self.enqueue(sequence);
        count
    }

    pub fn generate_run_bootloader(&mut self) -> usize {
        let sequence = sequence::run_bootloader();
        let count = sequence.len();
        self.enqueue(sequence);
        count
    }

    /// Queues a chunked read of the whole system record.
    pub fn generate_get_record(&mut self) -> ProtocolResult<usize> {
        self.assembler.reset();
        self.enqueue_result("get record", sequence::get_record())
    }

    /// Queues a chunked write of `record`.
    pub fn generate_set_record(&mut self, record: &SystemRecord) -> ProtocolResult<usize> {
        self.enqueue_result("set record", sequence::set_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Interface, Track};
    use crate::version::Version;

    const OK: &str = "52ff00";
    const FAIL: &str = "520000";

    #[test]
    fn test_idle_until_generated() {
        let mut device = Lpu237::new();
        assert_eq!(device.state(), EngineState::Idle);
        assert_eq!(device.set_from_rx(), StepOutcome::Incomplete);
        let queued = device.generate_get_system_information().expect("fixed");
        assert_eq!(queued, 7);
        assert_eq!(device.state(), EngineState::Pending);
        assert_eq!(device.pending_tx(), 7);
        assert_eq!(device.get_tx_transaction().as_deref(), Some("580000"));
    }

    #[test]
    fn test_missing_response_is_incomplete() {
        let mut device = Lpu237::new();
        device.generate_enable_read(true);
        assert_eq!(device.set_from_rx(), StepOutcome::Incomplete);
        assert_eq!(device.pending_requests(), 1);
    }

    #[test]
    fn test_system_information_decodes() {
        let mut device = Lpu237::new();
        device.generate_get_system_information().expect("fixed");
        let name = format!("52ff10{}{}", hex::encode("LPU237"), "00".repeat(10));
        for response in [OK, "52ff0405140000", "52ff0404000000", OK, "528000", name.as_str(), OK] {
            device.set_rx_transaction(response);
            assert!(device.set_from_rx().is_applied());
        }
        let config = device.config();
        assert_eq!(config.version(), Version::new(5, 20, 0, 0));
        assert_eq!(config.structure_version(), Version::new(4, 0, 0, 0));
        assert_eq!(config.name(), "LPU237");
        assert_eq!(config.function(), DeviceFunction::MsrAndIButton);
        assert!(config.features().hid_bootloader());
        assert_eq!(device.state(), EngineState::Idle);
    }

    #[test]
    fn test_negative_good_fails_strict_probe() {
        let mut device = Lpu237::new();
        device.generate_get_system_information().expect("fixed");
        for response in [OK, "52ff0405140000", "52ff0404000000", "528000", FAIL] {
            device.set_rx_transaction(response);
            device.set_from_rx();
        }
        assert_eq!(device.config().function(), DeviceFunction::MsrOnly);
    }

    #[test]
    fn test_rejected_response_is_consumed() {
        let mut device = Lpu237::new();
        device.generate_get_system_information().expect("fixed");
        device.set_rx_transaction(OK);
        device.set_from_rx();
        device.set_rx_transaction("52ff03010106");
        assert_eq!(
            device.set_from_rx(),
            StepOutcome::Rejected(Request::Get(Field::Version))
        );
        assert_eq!(device.pending_requests(), 5);
        assert_eq!(device.pending_rx(), 0);
        assert!(device.config().version().is_zero());
    }

    #[test]
    fn test_commit_clears_tracker() {
        let mut device = Lpu237::new();
        device.config_mut().set_interface(Interface::UsbHid);
        device.config_mut().set_track_enabled(Track::Iso1, true);
        assert_eq!(device.generate_set_parameters().expect("encodes"), 5);
        for _ in 0..5 {
            device.set_rx_transaction(OK);
            device.set_from_rx();
        }
        assert!(device.config().dirty().is_empty());
    }

    #[test]
    fn test_failed_write_keeps_tracker() {
        let mut device = Lpu237::new();
        device.config_mut().set_interface(Interface::UsbHid);
        device.generate_set_parameters().expect("encodes");
        for response in [OK, FAIL, OK, OK] {
            device.set_rx_transaction(response);
            device.set_from_rx();
        }
        assert!(device.config().dirty().contains(Field::Interface));
        assert_eq!(device.state(), EngineState::Idle);
    }

    #[test]
    fn test_clean_model_enqueues_nothing() {
        let mut device = Lpu237::new();
        assert_eq!(device.generate_set_parameters().expect("encodes"), 0);
        assert_eq!(device.state(), EngineState::Idle);
    }

    #[test]
    fn test_clear_transaction_recovers_stall() {
        let mut device = Lpu237::new();
        device.config_mut().set_interface(Interface::UsbHid);
        device.generate_set_parameters().expect("encodes");
        device.set_rx_transaction(OK);
        device.clear_transaction();
        assert_eq!(device.state(), EngineState::Idle);
        assert_eq!(device.pending_tx(), 0);
        assert_eq!(device.pending_rx(), 0);
        assert!(device.config().dirty().contains(Field::Interface));
    }

    #[test]
    fn test_uid_stored_as_hex() {
        let mut device = Lpu237::new();
        device.generate_get_parameters().expect("encodes");
        device.set_rx_transaction(OK);
        device.set_from_rx();
        let uid: Vec<u8> = (0u8..16).collect();
        device.set_rx_transaction(&format!("52ff10{}", hex::encode(&uid)));
        assert!(device.set_from_rx().is_applied());
        assert_eq!(device.config().uid(), "000102030405060708090a0b0c0d0e0f");
    }
}
