use serde::Serialize;

use crate::protocol::packet::{Frame, TcpFunction};

/// Upper bound on the register walk; no known register map comes close.
const MAX_REGISTERS: usize = 128;

// TelemetrySnapshot {{{
/// Decoded values from one read-input-registers response.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub v_bat: f64,         // battery voltage (V)
    pub soc: u16,           // battery charge (%)
    pub p_pv_1: u16,        // PV string 1 power (W)
    pub p_pv_2: u16,        // PV string 2 power (W)
    pub register_9: u16,    // counts towards p_pv; not sure of a better name for this one..
    pub v_charge: u16,      // battery charge/discharge voltage, as transported
    pub p_backup: u16,      // backup load power (W)
    pub p_to_user: u16,     // power imported from grid (W)
    pub e_chg_day: f64,     // battery charge energy today (kWh)
    pub e_dischg_day: f64,  // battery discharge energy today (kWh)
    pub e_to_user_all: f64, // total energy imported from grid (kWh)

    pub p_pv: u32,   // combined power of the three PV registers
    pub p_load: u32, // local consumption, floored at zero

    /// Every register the frame carried, in transport order.
    pub registers: Vec<u16>,
}

impl TelemetrySnapshot {
    /// Decode a frame into a snapshot. Frames that are not translated-data
    /// responses decode to `None`; the caller drops them.
    pub fn decode(frame: &Frame) -> Option<Self> {
        if frame.tcp_function() != Some(TcpFunction::TranslatedData) {
            return None;
        }

        let registers: Vec<u16> = (0..MAX_REGISTERS)
            .map_while(|index| frame.register_checked(index))
            .collect();

        let reg = |index: usize| frame.register(index);

        let p_pv = u32::from(reg(7)) + u32::from(reg(8)) + u32::from(reg(9));

        // (inverter out - inverter in) + (grid in - grid out), floored at zero
        let p_load = (i32::from(reg(16)) - i32::from(reg(17)) + i32::from(reg(27))
            - i32::from(reg(26)))
        .max(0) as u32;

        Some(Self {
            v_bat: f64::from(reg(4)) / 10.0,
            soc: reg(5),
            p_pv_1: reg(7),
            p_pv_2: reg(8),
            register_9: reg(9),
            v_charge: reg(10),
            p_backup: reg(24),
            p_to_user: reg(27),
            e_chg_day: f64::from(reg(33)) / 10.0,
            e_dischg_day: f64::from(reg(34)) / 10.0,
            e_to_user_all: f64::from(reg(37)) / 10.0,
            p_pv,
            p_load,
            registers,
        })
    }
}
// }}}
