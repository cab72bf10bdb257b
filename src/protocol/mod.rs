pub mod inverter;
pub mod packet;
pub mod packet_decoder;
pub mod telemetry;
