//! Top-level `Driver`: wires the Framer, parameter store, and responder
//! runtime behind a blocking public API.
//!
//! A generic owner of the HAL bindings plus a fixed-capacity parameter
//! registry, with `install`/`uninstall` as the only fallible lifecycle
//! operations.

use log::{debug, info, warn};

use crate::config::DriverConfig;
use crate::error::{DriverError, InstallError, Result};
use crate::framer::{Framer, FramerTiming, RxEvent};
use crate::hal::{Nvs, Timer, UartHal};
use crate::rdm::header::{self, RDM_HEADER_LEN};
use crate::responder::{self, DeviceState};
use crate::store::ParameterStore;
use crate::uid::Uid;

/// Identifies one RS-485 UART port. A small, fixed port table rather than an
/// open-ended handle space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortId(pub u8);

/// Maximum number of ports a single firmware image is expected to drive —
/// DMX/RDM hardware almost always exposes one or two RS-485 transceivers.
pub const MAX_PORTS: usize = 2;

/// A frame handed back to the caller by [`Driver::receive`]: either a
/// completed RDM exchange (request was dispatched and, if applicable, a
/// response already sent) or a raw DMX frame for the caller to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivedFrame {
    Dmx { start_code: u8, len: usize },
    Rdm { len: usize },
}

/// A single RS-485 port's link-layer engine: Framer + parameter store +
/// responder, parameterized over the firmware's concrete HAL bindings.
pub struct Driver<H: UartHal, T: Timer, N: Nvs> {
    hal: H,
    timer: T,
    nvs: Option<N>,
    framer: Framer,
    store: ParameterStore,
    device: DeviceState,
    config: DriverConfig,
    installed: bool,
    rx_buf: [u8; crate::framer::FRAME_BUFFER_LEN],
}

impl<H: UartHal, T: Timer, N: Nvs> Driver<H, T, N> {
    /// Builds an uninstalled driver with `Uid::from(0)` as a placeholder
    /// identity. Call [`Self::set_uid`] with the real UID before the first
    /// transmit; `install` does not require it.
    pub fn new(hal: H, timer: T, nvs: Option<N>, config: DriverConfig) -> Self {
        Self {
            hal,
            timer,
            nvs,
            framer: Framer::new(FramerTiming {
                break_len_us: config.break_len_us,
                mab_len_us: config.mab_len_us,
            }),
            store: ParameterStore::new(),
            device: DeviceState::new(Uid::from(0)),
            config,
            installed: false,
            rx_buf: [0; crate::framer::FRAME_BUFFER_LEN],
        }
    }

    /// Registers the mandatory built-in PIDs and arms the UART for
    /// interrupt-driven reception. Fails only on double-install or if the
    /// fixed parameter table is smaller than the mandatory PID set needs
    /// (this crate's `MAX_PARAMETERS` is generous enough that the latter
    /// should never trigger in practice).
    pub fn install(&mut self) -> core::result::Result<(), InstallError> {
        if self.installed {
            return Err(InstallError::AlreadyInstalled);
        }
        if !responder::register_builtins(&mut self.store) {
            return Err(InstallError::OutOfMemory);
        }

        self.hal.set_baud(self.config.baud_rate);
        self.hal.set_rx_timeout_threshold(20);
        self.hal.set_rxfifo_full_threshold(crate::framer::FRAME_BUFFER_LEN as u16);
        self.hal.set_txfifo_empty_threshold(8);
        self.hal.enable_interrupt(self.config.interrupt_alloc_flags);

        self.installed = true;
        info!("dmx-rdm-link: port installed, uid={:?}", self.device.uid);
        Ok(())
    }

    pub fn uninstall(&mut self) {
        self.hal.disable_interrupt(self.config.interrupt_alloc_flags);
        self.installed = false;
        info!("dmx-rdm-link: port uninstalled");
    }

    pub const fn is_installed(&self) -> bool {
        self.installed
    }

    pub const fn uid(&self) -> Uid {
        self.device.uid
    }

    pub fn set_uid(&mut self, uid: Uid) {
        self.device.uid = uid;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.device.muted = muted;
    }

    pub const fn is_muted(&self) -> bool {
        self.device.muted
    }

    /// Direct access to the parameter store, for registering
    /// device-specific PIDs beyond the mandatory built-ins.
    pub fn parameters(&mut self) -> &mut ParameterStore {
        &mut self.store
    }

    /// ISR entry point; forward every UART interrupt here unchanged.
    pub fn on_uart_interrupt(&mut self) {
        self.framer.on_uart_interrupt(&mut self.hal);
    }

    /// ISR entry point; forward the break/MAB/data timer's fire event here.
    pub fn on_timer_fire(&mut self) {
        self.framer.on_timer_fire(&mut self.hal, &mut self.timer);
    }

    /// Blocks (by polling, see [`crate::sync::Notify::wait`]) until a frame
    /// completes or `timeout_us` elapses. An RDM frame is dispatched and, if
    /// a response was due, transmitted before this call returns; DMX frames
    /// are handed back to the caller unparsed.
    pub fn receive(&mut self, timeout_us: u32) -> Result<ReceivedFrame> {
        if !self.installed {
            return Err(DriverError::NotInstalled);
        }

        loop {
            let event = self
                .framer
                .rx_events
                .wait(timeout_us, &self.timer)
                .ok_or(DriverError::Timeout)?;

            match event {
                RxEvent::Overflow => {
                    warn!("dmx-rdm-link: RX overflow");
                    return Err(DriverError::Overflow);
                }
                RxEvent::ImproperSlot => {
                    warn!("dmx-rdm-link: improper slot (framing/parity error)");
                    return Err(DriverError::ImproperSlot);
                }
                // Neither carries a frame by itself; keep waiting out the
                // same timeout budget for the frame they precede.
                RxEvent::BusClash | RxEvent::BreakStart => continue,
                RxEvent::FrameComplete { start_code } => {
                    let len = self.framer.take_frame(&mut self.rx_buf);
                    debug!("dmx-rdm-link: DMX frame, start_code={start_code:#04x}, len={len}");
                    return Ok(ReceivedFrame::Dmx { start_code, len });
                }
                RxEvent::RdmReady => {
                    let len = self.framer.take_frame(&mut self.rx_buf);
                    match self.handle_rdm_frame(len) {
                        Some(frame) => return Ok(frame),
                        // Malformed header or bad checksum: the RDM layer
                        // discards the frame before dispatch and keeps
                        // waiting out the same timeout budget.
                        None => continue,
                    }
                }
            }
        }
    }

    fn handle_rdm_frame(&mut self, len: usize) -> Option<ReceivedFrame> {
        let Some(parsed) = header::parse(&self.rx_buf[..len]) else {
            debug!("dmx-rdm-link: malformed RDM frame dropped");
            return None;
        };
        if !parsed.checksum_ok {
            debug!("dmx-rdm-link: RDM checksum mismatch, frame dropped");
            return None;
        }

        let header_copy = parsed.header;
        let pdl_start = RDM_HEADER_LEN;
        let pdl_end = pdl_start + header_copy.pdl as usize;
        let mut pdl_bytes = [0u8; crate::store::MAX_PARAMETER_VALUE];
        let pdl_len = pdl_end - pdl_start;
        pdl_bytes[..pdl_len].copy_from_slice(&self.rx_buf[pdl_start..pdl_end]);

        let mut response = [0u8; crate::store::MAX_PARAMETER_VALUE + RDM_HEADER_LEN + 2];
        let reply_len = responder::dispatch(
            &mut self.device,
            &mut self.store,
            self.nvs.as_mut().map(|n| n as &mut dyn Nvs),
            &header_copy,
            &pdl_bytes[..pdl_len],
            &mut response,
        );

        if let Some(reply_len) = reply_len {
            self.framer.send(&mut self.hal, &mut self.timer, &response[..reply_len]);
        }

        Some(ReceivedFrame::Rdm { len })
    }

    /// Blocks until a prior [`Self::send_dmx`]/RDM transmit completes, or
    /// `timeout_us` elapses.
    pub fn send_and_wait(&mut self, timeout_us: u32) -> Result<()> {
        if !self.installed {
            return Err(DriverError::NotInstalled);
        }
        self.framer
            .tx_done
            .wait(timeout_us, &self.timer)
            .map(|_| ())
            .ok_or(DriverError::Timeout)
    }

    /// Transmits a raw 513-byte (or shorter, alternate-start-code) DMX frame.
    pub fn send_dmx(&mut self, frame: &[u8]) -> Result<()> {
        if !self.installed {
            return Err(DriverError::NotInstalled);
        }
        if self.framer.send(&mut self.hal, &mut self.timer, frame) {
            Ok(())
        } else {
            Err(DriverError::InvalidArg)
        }
    }
}
