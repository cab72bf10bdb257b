pub struct Utils;

impl Utils {
    /// u16 from two little-endian bytes at `offset`. Callers check bounds.
    pub fn u16ify(input: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([input[offset], input[offset + 1]])
    }
}
