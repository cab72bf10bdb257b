mod common;

use std::str::FromStr;

use solar_bridge::protocol::packet::{
    crc16, ReadInputs, Serial, TcpFrameFactory, TcpFunction, TransferData,
};
use solar_bridge::utils::Utils;

#[test]
fn crc16_matches_reference_vectors() {
    assert_eq!(crc16(b"123456789"), 0x4b37);
    assert_eq!(crc16(&[0u8; 8]), 0x0b40);
}

#[test]
fn read_inputs_command_layout() {
    let command = ReadInputs {
        inverter: Serial::EMPTY,
        register: 0,
        count: 40,
    };
    let bytes = command.bytes();

    assert_eq!(bytes.len(), 18);
    assert_eq!(bytes[0], 0);
    assert_eq!(bytes[1], 4);
    assert_eq!(&bytes[2..12], &[0u8; 10]);
    assert_eq!(Utils::u16ify(&bytes, 12), 0);
    assert_eq!(Utils::u16ify(&bytes, 14), 40);
}

#[test]
fn read_inputs_command_crc_roundtrip() {
    let command = ReadInputs {
        inverter: Serial::from_str("CT12345678").unwrap(),
        register: 120,
        count: 16,
    };
    let bytes = command.bytes();

    assert_eq!(bytes.len(), 18);
    assert_eq!(Utils::u16ify(&bytes, 16), crc16(&bytes[0..16]));
}

#[test]
fn transfer_data_wraps_command_verbatim() {
    let command = ReadInputs {
        inverter: Serial::EMPTY,
        register: 0,
        count: 40,
    };
    let envelope = TransferData {
        datalog: Serial::BROADCAST,
        command: command.clone(),
    };
    let bytes = envelope.bytes();

    assert_eq!(bytes.len(), 30);
    assert_eq!(&bytes[0..10], &[0xff; 10]);
    assert_eq!(Utils::u16ify(&bytes, 10), 18);
    assert_eq!(&bytes[12..], &command.bytes()[..]);
}

#[test]
fn poll_request_layout() {
    let bytes = TcpFrameFactory::read_inputs(
        1,
        Serial::BROADCAST,
        ReadInputs {
            inverter: Serial::EMPTY,
            register: 0,
            count: 40,
        },
    );

    assert_eq!(bytes.len(), 38);
    assert_eq!(
        &bytes[0..8],
        &[0xa1, 0x1a, 0x01, 0x00, 0x20, 0x00, 0x01, 0xc2]
    );
    // declared length covers everything after it, unit id and function included
    assert_eq!(Utils::u16ify(&bytes, 4) as usize, bytes.len() - 6);

    // the embedded command carries its own trailing CRC
    let command = &bytes[20..38];
    assert_eq!(command[0..2], [0, 4]);
    assert_eq!(Utils::u16ify(command, 16), crc16(&command[0..16]));
    assert_eq!(&command[16..18], &[0xa4, 0xf3]);
}

#[test]
fn frame_length_quirk_is_preserved() {
    let frame = TcpFrameFactory::build(2, TcpFunction::Heartbeat, &[0]);

    assert_eq!(frame.len(), 9);
    // one payload byte plus the unit id and function bytes
    assert_eq!(Utils::u16ify(&frame, 4), 3);
}
