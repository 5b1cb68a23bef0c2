//! Driver configuration: timing and baud defaults.

/// Timing and baud configuration for one port. Defaults match the DMX512
/// standard: 250 kbit/s, a 176 µs `BREAK`, a 12 µs `MAB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub baud_rate: u32,
    pub break_len_us: u32,
    pub mab_len_us: u32,
    /// UART interrupt sources enabled at install time.
    pub interrupt_alloc_flags: crate::hal::InterruptMask,
}

impl DriverConfig {
    pub const fn new(baud_rate: u32, break_len_us: u32, mab_len_us: u32) -> Self {
        Self {
            baud_rate,
            break_len_us,
            mab_len_us,
            interrupt_alloc_flags: crate::hal::InterruptMask::from_bits_truncate(
                crate::hal::InterruptMask::RX_FIFO_FULL.bits()
                    | crate::hal::InterruptMask::RX_TIMEOUT.bits()
                    | crate::hal::InterruptMask::RX_OVERFLOW.bits()
                    | crate::hal::InterruptMask::RX_LINE_ERROR.bits()
                    | crate::hal::InterruptMask::RX_BREAK.bits()
                    | crate::hal::InterruptMask::BUS_CLASH.bits(),
            ),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new(250_000, 176, 12)
    }
}
