//! `dmx-rdm-link`: an interrupt-driven DMX512/RDM link-layer engine for a
//! single RS-485 UART port.
//!
//! Consumers supply concrete [`hal::UartHal`], [`hal::Timer`], and
//! [`hal::Nvs`] implementations and wire [`driver::Driver::on_uart_interrupt`]
//! / [`driver::Driver::on_timer_fire`] to their interrupt vectors. Everything
//! else — BREAK/MAB framing, the RDM wire codec, the parameter store, and
//! the responder runtime that answers `GET`/`SET`/discovery requests — is
//! `no_std` and allocation-free.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod driver;
pub mod error;
pub mod framer;
pub mod hal;
pub mod rdm;
pub mod responder;
pub mod store;
pub mod sync;
pub mod uid;

pub use config::DriverConfig;
pub use driver::{Driver, PortId, ReceivedFrame, MAX_PORTS};
pub use error::{DriverError, InstallError, NackReason, Result};
pub use hal::{Direction, InterruptMask, Nvs, NvsKey, Timer, UartHal};
pub use uid::Uid;

static_assertions::const_assert!(rdm::header::RDM_MAX_PDL == 231);
static_assertions::const_assert!(framer::FRAME_BUFFER_LEN == 513);
