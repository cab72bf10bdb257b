use crate::prelude::*;

use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Serialize, Serializer};

/// Every frame on the wire opens with these two bytes.
pub const MAGIC: [u8; 2] = [161, 26];

// registers sit at fixed offsets from the start of the frame
const FIRST_REGISTER_OFFSET: usize = 35;

// Serial {{{
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Serial([u8; 10]);

impl Serial {
    /// Datalog placeholder accepted by any datalogger.
    pub const BROADCAST: Serial = Serial([0xff; 10]);

    /// Blank inverter serial; the datalogger routes to its attached unit.
    pub const EMPTY: Serial = Serial([0; 10]);

    pub fn new(input: &[u8]) -> Result<Self> {
        Ok(Self(input.try_into()?))
    }

    pub fn data(&self) -> [u8; 10] {
        self.0
    }
}

impl From<[u8; 10]> for Serial {
    fn from(bytes: [u8; 10]) -> Self {
        Self(bytes)
    }
}

impl std::str::FromStr for Serial {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 10 {
            return Err(anyhow!("serial {} must be exactly 10 characters", s));
        }

        let mut r: [u8; 10] = Default::default();
        r.copy_from_slice(s.as_bytes());
        Ok(Self(r))
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the well-known serials aren't printable
        if self.0.iter().all(|b| b.is_ascii_graphic()) {
            write!(f, "{}", String::from_utf8_lossy(&self.0))
        } else {
            for b in &self.0 {
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }
}

impl std::fmt::Debug for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Serialize for Serial {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
// }}}

// TcpFunction {{{
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TcpFunction {
    Heartbeat = 193,
    TranslatedData = 194,
    ReadParam = 195,
    WriteParam = 196,
}
// }}}

// DeviceFunction {{{
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DeviceFunction {
    ReadInput = 4,
}
// }}}

pub fn crc16(data: &[u8]) -> u16 {
    crc16::State::<crc16::MODBUS>::calculate(data)
}

fn checksum(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}

// ReadInputs {{{
/// Modbus read-input-registers command for the inverter behind the
/// datalogger.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadInputs {
    pub inverter: Serial,
    pub register: u16,
    pub count: u16,
}

impl ReadInputs {
    pub fn bytes(&self) -> Vec<u8> {
        let mut data = vec![0; 16];

        // data[0] (address) is 0 when the client is asking
        data[1] = u8::from(DeviceFunction::ReadInput);
        data[2..12].copy_from_slice(&self.inverter.data());
        data[12..14].copy_from_slice(&self.register.to_le_bytes());
        data[14..16].copy_from_slice(&self.count.to_le_bytes());

        // trailing CRC covers everything before it
        data.extend_from_slice(&checksum(&data));

        data
    }
}
// }}}

// TransferData {{{
/// Vendor envelope carrying a raw Modbus command plus the datalog serial.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferData {
    pub datalog: Serial,
    pub command: ReadInputs,
}

impl TransferData {
    pub fn bytes(&self) -> Vec<u8> {
        let command = self.command.bytes();

        let mut data = vec![0; 12];
        data[0..10].copy_from_slice(&self.datalog.data());
        data[10..12].copy_from_slice(&(command.len() as u16).to_le_bytes());
        data.extend_from_slice(&command);

        data
    }
}
// }}}

pub struct TcpFrameFactory;
impl TcpFrameFactory {
    pub fn build(protocol: u16, tcp_function: TcpFunction, payload: &[u8]) -> Vec<u8> {
        let frame_length = (8 + payload.len()) as u16;

        let mut r = vec![0; frame_length as usize];

        r[0..2].copy_from_slice(&MAGIC);
        r[2..4].copy_from_slice(&protocol.to_le_bytes());
        // the declared length counts the unit id and function bytes too
        r[4..6].copy_from_slice(&(frame_length - 6).to_le_bytes());
        r[6] = 1; // unit id, always 1 on this protocol
        r[7] = tcp_function.into();
        r[8..].copy_from_slice(payload);

        r
    }

    /// The periodic poll request: a read-input-registers command in its
    /// transfer-data envelope, framed for the wire.
    pub fn read_inputs(protocol: u16, datalog: Serial, command: ReadInputs) -> Vec<u8> {
        let envelope = TransferData { datalog, command };
        Self::build(protocol, TcpFunction::TranslatedData, &envelope.bytes())
    }
}

// Frame {{{
/// One complete length-delimited frame as received off the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame(Bytes);

impl Frame {
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    pub fn protocol(&self) -> u16 {
        Utils::u16ify(&self.0, 2)
    }

    pub fn tcp_function(&self) -> Option<TcpFunction> {
        // a minimal frame carries no function byte at all
        self.0.get(7).and_then(|b| TcpFunction::try_from(*b).ok())
    }

    /// Register `index` as transported, or 0 if the frame is too short to
    /// carry it.
    pub fn register(&self, index: usize) -> u16 {
        self.register_checked(index).unwrap_or(0)
    }

    pub(crate) fn register_checked(&self, index: usize) -> Option<u16> {
        let offset = index * 2 + FIRST_REGISTER_OFFSET;
        if offset + 1 >= self.0.len() {
            return None;
        }
        Some(Utils::u16ify(&self.0, offset))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
// }}}
