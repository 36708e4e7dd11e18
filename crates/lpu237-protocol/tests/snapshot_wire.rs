//! Snapshot tests for LPU237 wire strings.
//!
//! Any change to these snapshots is a change to what goes over USB.

use insta::assert_snapshot;
use lpu237_protocol::sequence::{self, Sequence};
use lpu237_protocol::transport::mock::SimulatedLpu237;
use lpu237_protocol::{DeviceConfig, Interface, SystemRecord};

fn joined(sequence: &Sequence) -> String {
    sequence.wires().collect::<Vec<_>>().join(" ")
}

#[test]
fn test_snapshot_system_information() {
    let seq = sequence::system_information().expect("fixed sequence");
    assert_snapshot!(joined(&seq), @"580000 41c9081c00000004000000 41c9080800000004000000 440000 570000 41c9080c00000010000000 590000");
}

#[test]
fn test_snapshot_single_field_set() {
    let mut config = DeviceConfig::new();
    config.set_interface(Interface::Rs232);
    let seq = sequence::set_parameters(&config).expect("interface encodes");
    assert_snapshot!(joined(&seq), @"580000 41c8092a000000010000000a 420000 590000");
}

#[test]
fn test_snapshot_record_read() {
    let seq = sequence::get_record().expect("fixed sequence");
    assert_snapshot!(joined(&seq), @"580000 41c90800000000d9000000 41c908d9000000d9000000 41c908b2010000d9000000 41c9088b020000d9000000 41c9086403000055000000 590000");
}

#[test]
fn test_snapshot_run_bootloader() {
    assert_snapshot!(joined(&sequence::run_bootloader()), @"580000 470000");
}

#[test]
fn test_snapshot_simulated_uid() {
    let mut sim = SimulatedLpu237::new(&SystemRecord::factory_default());
    assert_snapshot!(sim.handle("550000"), @"52ff100102030405060708090a0b0c0d0e0f10");
}
