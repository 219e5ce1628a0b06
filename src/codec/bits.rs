//! Big-endian bit packing for BUFR data sections.

#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `width` bits of `value`, most significant bit first
    pub fn write(&mut self, value: u64, width: u32) {
        for i in (0..width).rev() {
            let bit = (value >> i) & 1;
            let byte_index = self.bit_len / 8;
            if byte_index == self.bytes.len() {
                self.bytes.push(0);
            }
            if bit == 1 {
                self.bytes[byte_index] |= 0x80 >> (self.bit_len % 8);
            }
            self.bit_len += 1;
        }
    }

    /// Append whole octets
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write(*byte as u64, 8);
        }
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Finish, zero-padding the final octet
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Largest value representable in `width` bits
pub fn all_ones(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
