//! HAL shim: the narrow vocabulary the Framer consumes.
//!
//! This is the only layer permitted to touch peripheral registers in a real
//! firmware integration; every other module in this crate goes through
//! `UartHal`. The trait is deliberately narrow — bulk FIFO transfer rather
//! than byte-at-a-time I/O, since DMX framing moves 512-slot bursts — so that
//! a concrete implementation stays small and auditable.
//!
//! Methods documented as "ISR-safe" are called from `Framer::on_uart_interrupt`
//! / `Framer::on_timer_fire` and must not block, allocate, or take a lock
//! that task context could be holding.

use bitflags::bitflags;

bitflags! {
    /// UART interrupt sources the Framer arms/disarms/acknowledges.
    pub struct InterruptMask: u16 {
        /// RX FIFO has reached its configured fill threshold.
        const RX_FIFO_FULL   = 0b0000_0001;
        /// RX timeout: data sat in the FIFO without reaching the threshold.
        const RX_TIMEOUT     = 0b0000_0010;
        /// RX FIFO overflowed; a byte was dropped by hardware.
        const RX_OVERFLOW    = 0b0000_0100;
        /// Framing, parity, or RS-485 line error flagged on a received byte.
        const RX_LINE_ERROR  = 0b0000_1000;
        /// A break condition was detected on the line.
        const RX_BREAK       = 0b0001_0000;
        /// RS-485 bus clash (two drivers asserted the line simultaneously).
        const BUS_CLASH      = 0b0010_0000;
        /// TX FIFO has room for more data.
        const TX_DATA        = 0b0100_0000;
        /// TX FIFO and shift register have both fully drained.
        const TX_DONE        = 0b1000_0000;
    }
}

/// RS-485 transceiver direction. A named enum rather than a bare `bool`,
/// since a third state (neither RX nor TX armed) is never valid here and a
/// boolean would invite a mixup between "is TX" and "is RX".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// Narrow UART register vocabulary. All methods are cheap register pokes;
/// none may block or allocate.
pub trait UartHal {
    /// Snapshot of currently pending (and masked-in) interrupt sources.
    fn interrupt_status(&self) -> InterruptMask;

    /// Enable the given interrupt sources (OR'd into the current mask).
    fn enable_interrupt(&mut self, mask: InterruptMask);

    /// Disable the given interrupt sources.
    fn disable_interrupt(&mut self, mask: InterruptMask);

    /// Acknowledge (clear) the given pending interrupt sources.
    fn clear_interrupt(&mut self, mask: InterruptMask);

    /// Drain up to `buf.len()` bytes from the RX FIFO. Returns the number of
    /// bytes actually read.
    fn read_rxfifo(&mut self, buf: &mut [u8]) -> usize;

    /// Push up to `buf.len()` bytes into the TX FIFO. Returns the number of
    /// bytes actually accepted (the FIFO may be shallower than `buf`).
    fn write_txfifo(&mut self, buf: &[u8]) -> usize;

    /// Discard any bytes currently queued in the RX FIFO.
    fn rxfifo_reset(&mut self);

    /// Discard any bytes currently queued in the TX FIFO.
    fn txfifo_reset(&mut self);

    /// Drive the RS-485 direction-select signal.
    fn set_direction(&mut self, direction: Direction);

    /// Invert (or restore) the idle/space polarity of the TX line, used to
    /// generate the BREAK condition without a dedicated break generator.
    fn invert_tx_signal(&mut self, inverted: bool);

    /// Reprogram the baud rate divisor.
    fn set_baud(&mut self, baud: u32);

    /// Set the RX idle-timeout threshold, in UART bit-times.
    fn set_rx_timeout_threshold(&mut self, bit_times: u8);

    /// Set the RX FIFO fill level that triggers `RX_FIFO_FULL`.
    fn set_rxfifo_full_threshold(&mut self, bytes: u16);

    /// Set the TX FIFO drain level that triggers `TX_DATA`.
    fn set_txfifo_empty_threshold(&mut self, bytes: u16);
}

/// Abstract monotonic microsecond clock plus the minimal one-shot timer
/// arming the Framer's break/MAB/watchdog state machine needs. Concrete
/// implementations wrap a hardware timer/counter peripheral.
pub trait Timer {
    /// Monotonic microsecond timestamp; wraps per `u64::MAX`, which at 1 µs
    /// resolution is well beyond any device's operating lifetime.
    fn now_us(&self) -> u64;

    /// Arm a one-shot timer to fire after `delay_us` microseconds. A second
    /// call before the first fires reprograms the same single timer
    /// (the Framer never needs more than one in flight per port).
    fn arm_after_us(&mut self, delay_us: u32);

    /// Cancel a previously armed timer, if any. No-op if already fired or unarmed.
    fn cancel(&mut self);
}

/// Namespaced key for a persisted `NON_VOLATILE` parameter, `<sub_device>:<pid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NvsKey {
    pub sub_device: u16,
    pub pid: u16,
}

/// Abstract non-volatile storage for `NON_VOLATILE` parameters. Loaded at
/// install, written through on every successful SET.
pub trait Nvs {
    /// Load a persisted value into `buf`, returning the number of bytes
    /// written, or `None` if the key has never been stored.
    fn load(&mut self, key: NvsKey, buf: &mut [u8]) -> Option<usize>;

    /// Persist `bytes` under `key`. Returns `false` on a storage failure
    /// (full, write error, ...); the in-RAM value is not updated by the
    /// caller unless this returns `true`, preserving write-through semantics.
    fn store(&mut self, key: NvsKey, bytes: &[u8]) -> bool;
}
