mod common;
use common::*;

use solar_bridge::protocol::telemetry::TelemetrySnapshot;

fn register_fixture() -> Vec<u16> {
    let mut regs = vec![0u16; 40];
    regs[4] = 523; // 52.3 V
    regs[5] = 87;
    regs[7] = 1200;
    regs[8] = 800;
    regs[9] = 50;
    regs[10] = 530;
    regs[16] = 1500; // inverter out
    regs[17] = 200; // inverter in
    regs[24] = 350;
    regs[26] = 100; // grid out
    regs[27] = 60; // grid in
    regs[33] = 124;
    regs[34] = 118;
    regs[37] = 20345;
    regs
}

#[test]
fn decodes_named_fields_with_scaling() {
    let frame = Factory::frame(194, &register_fixture());
    let snapshot = TelemetrySnapshot::decode(&frame).unwrap();

    assert_eq!(snapshot.v_bat, 523.0 / 10.0);
    assert_eq!(snapshot.soc, 87);
    assert_eq!(snapshot.p_pv_1, 1200);
    assert_eq!(snapshot.p_pv_2, 800);
    assert_eq!(snapshot.register_9, 50);
    assert_eq!(snapshot.v_charge, 530);
    assert_eq!(snapshot.p_backup, 350);
    assert_eq!(snapshot.p_to_user, 60);
    assert_eq!(snapshot.e_chg_day, 124.0 / 10.0);
    assert_eq!(snapshot.e_dischg_day, 118.0 / 10.0);
    assert_eq!(snapshot.e_to_user_all, 20345.0 / 10.0);

    assert_eq!(snapshot.registers, register_fixture());
}

#[test]
fn derives_pv_flow_and_consumption() {
    let frame = Factory::frame(194, &register_fixture());
    let snapshot = TelemetrySnapshot::decode(&frame).unwrap();

    assert_eq!(snapshot.p_pv, 1200 + 800 + 50);
    assert_eq!(snapshot.p_load, 1260); // (1500 - 200) + (60 - 100)
}

#[test]
fn consumption_floors_at_zero() {
    let mut regs = register_fixture();
    regs[16] = 0;
    regs[17] = 500;
    regs[26] = 100;
    regs[27] = 0;

    let frame = Factory::frame(194, &regs);
    let snapshot = TelemetrySnapshot::decode(&frame).unwrap();

    assert_eq!(snapshot.p_load, 0);
}

#[test]
fn rejects_frames_with_other_functions() {
    assert!(TelemetrySnapshot::decode(&Factory::frame(193, &register_fixture())).is_none());
    assert!(TelemetrySnapshot::decode(&Factory::frame(195, &register_fixture())).is_none());
    assert!(TelemetrySnapshot::decode(&Factory::frame(0, &register_fixture())).is_none());
}

#[test]
fn truncated_frame_reads_missing_registers_as_zero() {
    // twenty registers only; indexes 24, 26, 27, 33, 34 and 37 are absent
    let regs: Vec<u16> = (1..=20).collect();
    let frame = Factory::frame(194, &regs);
    let snapshot = TelemetrySnapshot::decode(&frame).unwrap();

    assert_eq!(snapshot.p_to_user, 0);
    assert_eq!(snapshot.p_backup, 0);
    assert_eq!(snapshot.e_to_user_all, 0.0);

    // the walk stops at the first unavailable index
    assert_eq!(snapshot.registers, regs);

    // derived values fall back to zero for the missing registers
    assert_eq!(snapshot.p_pv, 8 + 9 + 10);
    assert_eq!(snapshot.p_load, 0); // (17 - 18) + (0 - 0), floored
}

#[test]
fn minimal_frame_decodes_with_no_registers() {
    let frame = Factory::frame(194, &[]);
    let snapshot = TelemetrySnapshot::decode(&frame).unwrap();

    assert!(snapshot.registers.is_empty());
    assert_eq!(snapshot.v_bat, 0.0);
    assert_eq!(snapshot.p_pv, 0);
    assert_eq!(snapshot.p_load, 0);
}

#[test]
fn register_walk_is_capped() {
    let regs = vec![1u16; 200];
    let frame = Factory::frame(194, &regs);
    let snapshot = TelemetrySnapshot::decode(&frame).unwrap();

    assert_eq!(snapshot.registers.len(), 128);
}
