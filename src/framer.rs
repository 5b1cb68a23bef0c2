//! The Framer: ISR-resident BREAK/MAB/data state machine for both directions
//! of a DMX512/RDM half-duplex link.
//!
//! `on_uart_interrupt`/`on_timer_fire` are the only two entry points callable
//! from interrupt context: no allocation, no blocking, no logging on these
//! two paths. Everything else (`send`, `take_frame`) runs in task context and
//! talks to the ISR side only through [`crate::sync::IrqSafeCell`] and
//! [`crate::sync::Notify`].

use crate::hal::{Direction, InterruptMask, Timer, UartHal};
use crate::rdm::header::RDM_START_CODE;
use crate::sync::{IrqSafeCell, Notify};

/// `1 (start code) + 512 (slots)`, the fixed DMX512 frame length.
pub const FRAME_BUFFER_LEN: usize = 513;

/// Event the Framer posts to task context after an RX interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// The RX FIFO overran before being drained; the in-progress frame is
    /// discarded and bytes are dropped until the next `BREAK`.
    Overflow,
    /// A framing/parity/line error was flagged on a received byte; same
    /// discard-until-next-break handling as `Overflow`.
    ImproperSlot,
    /// A `BREAK` condition started; the frame buffer has been reset.
    BreakStart,
    /// A fixed-length (non-RDM) frame filled the 513-byte buffer or was
    /// closed out by an RX idle timeout; `start_code` is `data[0]`.
    FrameComplete { start_code: u8 },
    /// An RDM packet (start code `0xCC`) was closed out by an RX idle
    /// timeout. Variable length, unlike DMX's fixed 513 bytes.
    RdmReady,
    /// Two drivers asserted the RS-485 line simultaneously.
    BusClash,
}

/// Transmit-side phase, driven by `on_timer_fire` and the `TX_DATA`/
/// `TX_DONE` interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Idle,
    Break,
    Mab,
    Data,
    Done,
}

/// Fixed-capacity receive buffer. No heap allocation; `head <= data.len()`
/// always. `size` latches the length of the last completed frame
/// independently of `head`, so a frame that completed because the *next*
/// `BREAK` arrived can still be read out after `head` has been reset for the
/// frame now filling.
struct FrameBuffer {
    data: [u8; FRAME_BUFFER_LEN],
    head: usize,
    size: usize,
}

impl FrameBuffer {
    const fn new() -> Self {
        Self {
            data: [0; FRAME_BUFFER_LEN],
            head: 0,
            size: 0,
        }
    }

    fn clear(&mut self) {
        self.head = 0;
    }

    /// Appends one byte. Returns `false` (silently, no panic) if the buffer
    /// is already full, enforcing "capacity is never exceeded" by saturating
    /// rather than indexing out of bounds.
    fn push(&mut self, byte: u8) -> bool {
        if self.head >= self.data.len() {
            return false;
        }
        self.data[self.head] = byte;
        self.head += 1;
        true
    }

    fn is_full(&self) -> bool {
        self.head >= self.data.len()
    }

    fn as_slice(&self) -> &[u8] {
        &self.data[..self.head]
    }

    /// Freezes `size <- head`, capturing the current fill level as the
    /// completed frame's length before the buffer is reused.
    fn latch_size(&mut self) {
        self.size = self.head;
    }

    fn copy_out(&self, out: &mut [u8]) -> usize {
        let n = self.size.min(out.len());
        out[..n].copy_from_slice(&self.data[..n]);
        n
    }
}

#[derive(Clone, Copy)]
struct RxFlags {
    /// A frame reception is in progress: a `BREAK` has started it and it has
    /// not yet been resolved (completed, overflowed, or line-errored).
    is_busy: bool,
    drop_until_break: bool,
}

struct TxState {
    phase: TxPhase,
    buffer: [u8; FRAME_BUFFER_LEN],
    len: usize,
    pos: usize,
}

impl TxState {
    const fn new() -> Self {
        Self {
            phase: TxPhase::Idle,
            buffer: [0; FRAME_BUFFER_LEN],
            len: 0,
            pos: 0,
        }
    }
}

/// BREAK/MAB timing and RX idle threshold, carried into the Framer so ISR
/// context never reaches into a `DriverConfig` behind a lock it doesn't own.
#[derive(Debug, Clone, Copy)]
pub struct FramerTiming {
    pub break_len_us: u32,
    pub mab_len_us: u32,
}

/// The Framer itself: RX buffer, TX state, and shared flags, each guarded by
/// its own short critical section.
pub struct Framer {
    rx: IrqSafeCell<FrameBuffer>,
    rx_flags: IrqSafeCell<RxFlags>,
    tx: IrqSafeCell<TxState>,
    pub rx_events: Notify<RxEvent>,
    pub tx_done: Notify<()>,
    timing: FramerTiming,
}

impl Framer {
    pub const fn new(timing: FramerTiming) -> Self {
        Self {
            rx: IrqSafeCell::new(FrameBuffer::new()),
            rx_flags: IrqSafeCell::new(RxFlags {
                is_busy: false,
                drop_until_break: false,
            }),
            tx: IrqSafeCell::new(TxState::new()),
            rx_events: Notify::new(),
            tx_done: Notify::new(),
            timing,
        }
    }

    /// Copies the most recently completed RX frame out of the internal
    /// buffer. Called from task context after observing `RxEvent::FrameComplete`
    /// or `RxEvent::RdmReady`.
    pub fn take_frame(&self, out: &mut [u8]) -> usize {
        self.rx.with_ref(|rx| rx.copy_out(out))
    }

    /// Begins transmitting `data` (an RDM packet or a 513-byte DMX frame):
    /// drives the line low to assert `BREAK`, arming the timer for
    /// `timing.break_len_us`. The rest of the state machine runs from
    /// `on_timer_fire`/`on_uart_interrupt`.
    pub fn send<H: UartHal, T: Timer>(&self, hal: &mut H, timer: &mut T, data: &[u8]) -> bool {
        if data.len() > FRAME_BUFFER_LEN {
            return false;
        }
        let started = self.tx.with(|tx| {
            if tx.phase != TxPhase::Idle {
                return false;
            }
            tx.buffer[..data.len()].copy_from_slice(data);
            tx.len = data.len();
            tx.pos = 0;
            tx.phase = TxPhase::Break;
            true
        });
        if !started {
            return false;
        }
        hal.set_direction(Direction::Tx);
        hal.invert_tx_signal(true);
        timer.arm_after_us(self.timing.break_len_us);
        true
    }

    pub fn is_tx_busy(&self) -> bool {
        self.tx.with_ref(|tx| tx.phase != TxPhase::Idle)
    }

    /// ISR entry point for the one-shot timer driving BREAK → MAB → data.
    pub fn on_timer_fire<H: UartHal, T: Timer>(&self, hal: &mut H, timer: &mut T) {
        let next = self.tx.with(|tx| match tx.phase {
            TxPhase::Break => {
                tx.phase = TxPhase::Mab;
                Some((TxPhase::Mab, self.timing.mab_len_us))
            }
            TxPhase::Mab => {
                tx.phase = TxPhase::Data;
                None
            }
            _ => None,
        });

        match next {
            Some((_, delay_us)) => {
                hal.invert_tx_signal(false);
                timer.arm_after_us(delay_us);
            }
            None if self.tx.with_ref(|tx| tx.phase == TxPhase::Data) && self.tx.with_ref(|tx| tx.pos == 0) => {
                hal.enable_interrupt(InterruptMask::TX_DATA);
                self.pump_tx(hal);
            }
            None => {}
        }
    }

    fn pump_tx<H: UartHal>(&self, hal: &mut H) {
        let done = self.tx.with(|tx| {
            if tx.pos >= tx.len {
                return true;
            }
            let written = hal.write_txfifo(&tx.buffer[tx.pos..tx.len]);
            tx.pos += written;
            tx.pos >= tx.len
        });
        if done {
            hal.disable_interrupt(InterruptMask::TX_DATA);
            hal.enable_interrupt(InterruptMask::TX_DONE);
        }
    }

    fn finish_tx<H: UartHal>(&self, hal: &mut H) {
        hal.disable_interrupt(InterruptMask::TX_DONE);
        hal.set_direction(Direction::Rx);
        self.tx.with(|tx| tx.phase = TxPhase::Idle);
        self.tx_done.notify(());
    }

    /// ISR entry point for every UART interrupt source. Drains the RX FIFO,
    /// advances the RX frame state machine, and feeds/finishes TX.
    pub fn on_uart_interrupt<H: UartHal>(&self, hal: &mut H) {
        let status = hal.interrupt_status();

        if status.contains(InterruptMask::RX_BREAK) {
            hal.clear_interrupt(InterruptMask::RX_BREAK);
            // If a frame was already in progress, this BREAK is what ends it
            // (rather than RX_FIFO_FULL/RX_TIMEOUT): resolve it and notify
            // the waiter before the buffer is reused for the new frame.
            if self.rx_flags.with_ref(|f| f.is_busy) {
                self.complete_frame();
            }
            self.rx.with(|rx| rx.clear());
            self.rx_flags.with(|f| {
                f.is_busy = true;
                f.drop_until_break = false;
            });
            self.rx_events.notify(RxEvent::BreakStart);
        }

        if status.contains(InterruptMask::RX_OVERFLOW) {
            hal.clear_interrupt(InterruptMask::RX_OVERFLOW);
            hal.rxfifo_reset();
            self.rx.with(|rx| rx.clear());
            self.rx_flags.with(|f| {
                f.is_busy = false;
                f.drop_until_break = true;
            });
            self.rx_events.notify(RxEvent::Overflow);
        }

        if status.contains(InterruptMask::RX_LINE_ERROR) {
            hal.clear_interrupt(InterruptMask::RX_LINE_ERROR);
            self.rx_flags.with(|f| {
                f.is_busy = false;
                f.drop_until_break = true;
            });
            self.rx_events.notify(RxEvent::ImproperSlot);
        }

        if status.contains(InterruptMask::BUS_CLASH) {
            hal.clear_interrupt(InterruptMask::BUS_CLASH);
            self.rx_events.notify(RxEvent::BusClash);
        }

        if status.intersects(InterruptMask::RX_FIFO_FULL | InterruptMask::RX_TIMEOUT) {
            hal.clear_interrupt(InterruptMask::RX_FIFO_FULL | InterruptMask::RX_TIMEOUT);
            self.drain_rx(hal, status);
        }

        if status.contains(InterruptMask::TX_DATA) {
            self.pump_tx(hal);
        }

        if status.contains(InterruptMask::TX_DONE) {
            hal.clear_interrupt(InterruptMask::TX_DONE);
            self.finish_tx(hal);
        }
    }

    fn drain_rx<H: UartHal>(&self, hal: &mut H, status: InterruptMask) {
        if self.rx_flags.with_ref(|f| f.drop_until_break) {
            let mut scratch = [0u8; 64];
            while hal.read_rxfifo(&mut scratch) > 0 {}
            return;
        }

        let mut scratch = [0u8; 64];
        loop {
            let n = hal.read_rxfifo(&mut scratch);
            if n == 0 {
                break;
            }
            let overrun = self.rx.with(|rx| {
                for &b in &scratch[..n] {
                    if !rx.push(b) {
                        return true;
                    }
                }
                false
            });
            if overrun {
                self.rx_flags.with(|f| {
                    f.is_busy = false;
                    f.drop_until_break = true;
                });
                self.rx_events.notify(RxEvent::Overflow);
                return;
            }
        }

        let buffer_full = self.rx.with_ref(FrameBuffer::is_full);
        if buffer_full || status.contains(InterruptMask::RX_TIMEOUT) {
            self.complete_frame();
        }
    }

    /// Resolves the frame currently in the RX buffer: latches its length,
    /// clears `is_busy`, and notifies the waiter with whichever event fits
    /// (RDM, a validly-started DMX frame, or an invalid start code). Called
    /// either when the buffer fills/times out, or when the next `BREAK`
    /// arrives while a frame was still in progress.
    fn complete_frame(&self) {
        let (start_code, non_empty) = self.rx.with(|rx| {
            rx.latch_size();
            let bytes = rx.as_slice();
            (bytes.first().copied().unwrap_or(0), !bytes.is_empty())
        });
        self.rx_flags.with(|f| f.is_busy = false);
        if !non_empty {
            return;
        }
        if start_code == RDM_START_CODE {
            self.rx_events.notify(RxEvent::RdmReady);
        } else if start_code_is_valid(start_code) {
            self.rx_events.notify(RxEvent::FrameComplete { start_code });
        } else {
            self.rx_events.notify(RxEvent::ImproperSlot);
        }
    }
}

/// True if `code` falls outside every reserved alternate-start-code range
/// (`[0x92, 0xA9]`, `[0xAB, 0xCD]`, `[0xF0, 0xF7]`). The DMX null start code
/// (`0x00`) and RDM's `0xCC` both pass trivially; this only gates the
/// remaining alternate-start-code space this crate does not interpret.
pub fn start_code_is_valid(code: u8) -> bool {
    !matches!(code, 0x92..=0xA9 | 0xAB..=0xCD | 0xF0..=0xF7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct MockHal {
        rx_fifo: VecDeque<u8>,
        tx_fifo: Vec<u8>,
        status: InterruptMask,
        enabled: InterruptMask,
        direction: Direction,
        inverted: bool,
    }

    impl MockHal {
        fn new() -> Self {
            Self {
                rx_fifo: VecDeque::new(),
                tx_fifo: Vec::new(),
                status: InterruptMask::empty(),
                enabled: InterruptMask::empty(),
                direction: Direction::Rx,
                inverted: false,
            }
        }
    }

    impl UartHal for MockHal {
        fn interrupt_status(&self) -> InterruptMask {
            self.status
        }
        fn enable_interrupt(&mut self, mask: InterruptMask) {
            self.enabled.insert(mask);
        }
        fn disable_interrupt(&mut self, mask: InterruptMask) {
            self.enabled.remove(mask);
        }
        fn clear_interrupt(&mut self, mask: InterruptMask) {
            self.status.remove(mask);
        }
        fn read_rxfifo(&mut self, buf: &mut [u8]) -> usize {
            let mut n = 0;
            while n < buf.len() {
                match self.rx_fifo.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            n
        }
        fn write_txfifo(&mut self, buf: &[u8]) -> usize {
            self.tx_fifo.extend_from_slice(buf);
            buf.len()
        }
        fn rxfifo_reset(&mut self) {
            self.rx_fifo.clear();
        }
        fn txfifo_reset(&mut self) {
            self.tx_fifo.clear();
        }
        fn set_direction(&mut self, direction: Direction) {
            self.direction = direction;
        }
        fn invert_tx_signal(&mut self, inverted: bool) {
            self.inverted = inverted;
        }
        fn set_baud(&mut self, _baud: u32) {}
        fn set_rx_timeout_threshold(&mut self, _bit_times: u8) {}
        fn set_rxfifo_full_threshold(&mut self, _bytes: u16) {}
        fn set_txfifo_empty_threshold(&mut self, _bytes: u16) {}
    }

    struct MockTimer {
        now: RefCell<u64>,
    }

    impl MockTimer {
        fn new() -> Self {
            Self { now: RefCell::new(0) }
        }
    }

    impl Timer for MockTimer {
        fn now_us(&self) -> u64 {
            *self.now.borrow()
        }
        fn arm_after_us(&mut self, delay_us: u32) {
            *self.now.borrow_mut() += delay_us as u64;
        }
        fn cancel(&mut self) {}
    }

    fn timing() -> FramerTiming {
        FramerTiming {
            break_len_us: 176,
            mab_len_us: 12,
        }
    }

    #[test]
    fn break_resets_the_rx_buffer() {
        let framer = Framer::new(timing());
        let mut hal = MockHal::new();
        hal.rx_fifo.extend([1, 2, 3]);
        hal.status.insert(InterruptMask::RX_FIFO_FULL);
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.rx_events.poll(), None); // no timeout/full yet, buffer just grew

        hal.status.insert(InterruptMask::RX_BREAK);
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.rx_events.poll(), Some(RxEvent::BreakStart));

        let mut out = [0u8; 8];
        assert_eq!(framer.take_frame(&mut out), 0);
    }

    #[test]
    fn overflow_drops_bytes_until_next_break() {
        let framer = Framer::new(timing());
        let mut hal = MockHal::new();
        hal.status.insert(InterruptMask::RX_OVERFLOW);
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.rx_events.poll(), Some(RxEvent::Overflow));

        hal.status = InterruptMask::RX_FIFO_FULL;
        hal.rx_fifo.extend([9, 9, 9]);
        framer.on_uart_interrupt(&mut hal);
        let mut out = [0u8; 8];
        assert_eq!(framer.take_frame(&mut out), 0);

        hal.status = InterruptMask::RX_BREAK;
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.rx_events.poll(), Some(RxEvent::BreakStart));
    }

    #[test]
    fn rdm_start_code_closed_by_timeout_is_rdm_ready() {
        let framer = Framer::new(timing());
        let mut hal = MockHal::new();
        hal.status.insert(InterruptMask::RX_BREAK);
        framer.on_uart_interrupt(&mut hal);
        framer.rx_events.poll();

        hal.status = InterruptMask::RX_TIMEOUT;
        hal.rx_fifo.extend([RDM_START_CODE, 0x01, 0x02]);
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.rx_events.poll(), Some(RxEvent::RdmReady));

        let mut out = [0u8; 8];
        let n = framer.take_frame(&mut out);
        assert_eq!(&out[..n], &[RDM_START_CODE, 0x01, 0x02]);
    }

    #[test]
    fn dmx_frame_completes_when_buffer_fills() {
        let framer = Framer::new(timing());
        let mut hal = MockHal::new();
        hal.status.insert(InterruptMask::RX_BREAK);
        framer.on_uart_interrupt(&mut hal);
        framer.rx_events.poll();

        hal.status = InterruptMask::RX_FIFO_FULL;
        hal.rx_fifo.extend(core::iter::once(0u8).chain(core::iter::repeat(0x42).take(512)));
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.rx_events.poll(), Some(RxEvent::FrameComplete { start_code: 0 }));
    }

    #[test]
    fn break_arriving_mid_frame_completes_and_notifies_instead_of_discarding() {
        let framer = Framer::new(timing());
        let mut hal = MockHal::new();
        hal.status.insert(InterruptMask::RX_BREAK);
        framer.on_uart_interrupt(&mut hal);
        framer.rx_events.poll();

        // Data arrives but neither RX_FIFO_FULL nor RX_TIMEOUT fires before
        // the next BREAK — the frame never gets a chance to complete through
        // the usual path.
        hal.status = InterruptMask::RX_FIFO_FULL;
        hal.rx_fifo.extend([RDM_START_CODE, 0xAA, 0xBB]);
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.rx_events.poll(), None);

        hal.status = InterruptMask::RX_BREAK;
        hal.rx_fifo.clear();
        framer.on_uart_interrupt(&mut hal);
        // The in-progress frame is resolved first, then BreakStart for the
        // new one; Notify is single-slot, so only the last of the two
        // survives to be polled, but the frame data itself must still be
        // retrievable via take_frame.
        let mut out = [0u8; 8];
        let n = framer.take_frame(&mut out);
        assert_eq!(&out[..n], &[RDM_START_CODE, 0xAA, 0xBB]);
    }

    #[test]
    fn alternate_start_code_is_rejected_as_improper_slot() {
        let framer = Framer::new(timing());
        let mut hal = MockHal::new();
        hal.status.insert(InterruptMask::RX_BREAK);
        framer.on_uart_interrupt(&mut hal);
        framer.rx_events.poll();

        hal.status = InterruptMask::RX_TIMEOUT;
        hal.rx_fifo.extend([0x92, 0x01]);
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.rx_events.poll(), Some(RxEvent::ImproperSlot));
    }

    #[test]
    fn start_code_validity_matches_the_reserved_ranges() {
        for code in [0x92u8, 0xA9, 0xAB, 0xCD, 0xF0, 0xF7] {
            assert!(!start_code_is_valid(code), "{code:#04x} should be rejected");
        }
        for code in [0x00u8, 0x91, 0xAA, 0xCE, 0xCC] {
            assert!(start_code_is_valid(code), "{code:#04x} should be accepted");
        }
    }

    #[test]
    fn send_drives_break_then_mab_then_data_then_done() {
        let framer = Framer::new(timing());
        let mut hal = MockHal::new();
        let mut timer = MockTimer::new();

        assert!(framer.send(&mut hal, &mut timer, &[0x00, 0xFF, 0xFF]));
        assert!(hal.inverted);
        assert!(framer.is_tx_busy());

        framer.on_timer_fire(&mut hal, &mut timer); // Break -> Mab
        assert!(!hal.inverted);

        framer.on_timer_fire(&mut hal, &mut timer); // Mab -> Data, pushes into tx fifo
        assert_eq!(hal.tx_fifo, vec![0x00, 0xFF, 0xFF]);

        hal.status = InterruptMask::TX_DONE;
        framer.on_uart_interrupt(&mut hal);
        assert_eq!(framer.tx_done.poll(), Some(()));
        assert!(!framer.is_tx_busy());
        assert_eq!(hal.direction, Direction::Rx);
    }

    #[test]
    fn send_rejects_oversized_frames() {
        let framer = Framer::new(timing());
        let mut hal = MockHal::new();
        let mut timer = MockTimer::new();
        let oversized = [0u8; FRAME_BUFFER_LEN + 1];
        assert!(!framer.send(&mut hal, &mut timer, &oversized));
    }
}
