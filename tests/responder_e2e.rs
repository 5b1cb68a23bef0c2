//! End-to-end scenarios driving a `Driver` through the same
//! interrupt/timer entry points real firmware would call, using a mock
//! `UartHal`/`Timer`/`Nvs` triple.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use dmx_rdm_link::error::NackReason;
use dmx_rdm_link::rdm::disc;
use dmx_rdm_link::rdm::header::{self, RdmHeader};
use dmx_rdm_link::rdm::pid::{self, pids, CommandClass};
use dmx_rdm_link::{Direction, Driver, DriverConfig, DriverError, InterruptMask, Nvs, NvsKey, ReceivedFrame, Timer, Uid, UartHal};

struct HalInner {
    rx_fifo: VecDeque<u8>,
    tx_fifo: Vec<u8>,
    status: InterruptMask,
    direction: Direction,
}

#[derive(Clone)]
struct MockHal(Rc<RefCell<HalInner>>);

impl MockHal {
    fn new() -> Self {
        Self(Rc::new(RefCell::new(HalInner {
            rx_fifo: VecDeque::new(),
            tx_fifo: Vec::new(),
            status: InterruptMask::empty(),
            direction: Direction::Rx,
        })))
    }

    fn set_status(&self, mask: InterruptMask) {
        self.0.borrow_mut().status = mask;
    }

    fn push_rx(&self, bytes: &[u8]) {
        self.0.borrow_mut().rx_fifo.extend(bytes.iter().copied());
    }

    fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.0.borrow_mut().tx_fifo)
    }
}

impl UartHal for MockHal {
    fn interrupt_status(&self) -> InterruptMask {
        self.0.borrow().status
    }
    fn enable_interrupt(&mut self, _mask: InterruptMask) {}
    fn disable_interrupt(&mut self, _mask: InterruptMask) {}
    fn clear_interrupt(&mut self, mask: InterruptMask) {
        self.0.borrow_mut().status.remove(mask);
    }
    fn read_rxfifo(&mut self, buf: &mut [u8]) -> usize {
        let mut inner = self.0.borrow_mut();
        let mut n = 0;
        while n < buf.len() {
            match inner.rx_fifo.pop_front() {
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
        self.0.borrow_mut().tx_fifo.extend_from_slice(buf);
        buf.len()
    }
    fn rxfifo_reset(&mut self) {
        self.0.borrow_mut().rx_fifo.clear();
    }
    fn txfifo_reset(&mut self) {
        self.0.borrow_mut().tx_fifo.clear();
    }
    fn set_direction(&mut self, direction: Direction) {
        self.0.borrow_mut().direction = direction;
    }
    fn invert_tx_signal(&mut self, _inverted: bool) {}
    fn set_baud(&mut self, _baud: u32) {}
    fn set_rx_timeout_threshold(&mut self, _bit_times: u8) {}
    fn set_rxfifo_full_threshold(&mut self, _bytes: u16) {}
    fn set_txfifo_empty_threshold(&mut self, _bytes: u16) {}
}

struct MockTimer(RefCell<u64>);

impl MockTimer {
    fn new() -> Self {
        Self(RefCell::new(0))
    }
}

impl Timer for MockTimer {
    fn now_us(&self) -> u64 {
        *self.0.borrow()
    }
    fn arm_after_us(&mut self, delay_us: u32) {
        *self.0.borrow_mut() += delay_us as u64;
    }
    fn cancel(&mut self) {}
}

struct NoNvs;
impl Nvs for NoNvs {
    fn load(&mut self, _key: NvsKey, _buf: &mut [u8]) -> Option<usize> {
        None
    }
    fn store(&mut self, _key: NvsKey, _bytes: &[u8]) -> bool {
        true
    }
}

fn new_driver(uid: Uid) -> (Driver<MockHal, MockTimer, NoNvs>, MockHal) {
    let hal = MockHal::new();
    let mut driver = Driver::new(hal.clone(), MockTimer::new(), None::<NoNvs>, DriverConfig::default());
    driver.install().unwrap();
    driver.set_uid(uid);
    (driver, hal)
}

fn build_rdm_request(destination: Uid, source: Uid, pid: u16, cc: CommandClass, pdl_bytes: &[u8]) -> Vec<u8> {
    let header = RdmHeader {
        message_len: 0,
        destination,
        source,
        transaction_number: 1,
        port_or_response_type: 0,
        message_count: 0,
        sub_device: pid::ROOT_SUB_DEVICE,
        command_class: cc.as_u8(),
        pid,
        pdl: pdl_bytes.len() as u8,
    };
    let mut buf = vec![0u8; 64 + pdl_bytes.len()];
    let len = header::format(&header, pdl_bytes, &mut buf).unwrap();
    buf.truncate(len);
    buf
}

/// Feeds `frame` into the driver's RX path the way a real UART ISR sequence
/// would: a `BREAK`, then the bytes, closed out by an RX idle timeout.
fn deliver_frame(driver: &mut Driver<MockHal, MockTimer, NoNvs>, hal: &MockHal, frame: &[u8]) {
    hal.set_status(InterruptMask::RX_BREAK);
    driver.on_uart_interrupt();

    hal.push_rx(frame);
    hal.set_status(InterruptMask::RX_TIMEOUT);
    driver.on_uart_interrupt();
}

/// Drives a transmit already started by `dispatch` to completion: the
/// break/MAB timer fires twice (the second pumps the whole frame into the
/// mock TX FIFO in one shot), then `TX_DONE` retires it.
fn pump_transmit(driver: &mut Driver<MockHal, MockTimer, NoNvs>, hal: &MockHal) {
    driver.on_timer_fire(); // Break -> Mab
    driver.on_timer_fire(); // Mab -> Data, pumps the whole frame into the FIFO

    hal.set_status(InterruptMask::TX_DONE);
    driver.on_uart_interrupt();
}

const CONTROLLER: Uid = Uid::new(0x4144, 0xFFFF);

#[test]
fn get_device_info_round_trips_through_the_wire() {
    let device_uid = Uid::new(0x4144, 1);
    let (mut driver, hal) = new_driver(device_uid);

    let request = build_rdm_request(device_uid, CONTROLLER, pids::DEVICE_INFO, CommandClass::GetCommand, &[]);
    deliver_frame(&mut driver, &hal, &request);

    let outcome = driver.receive(1_000).unwrap();
    assert!(matches!(outcome, ReceivedFrame::Rdm { .. }));

    pump_transmit(&mut driver, &hal);
    let response = hal.take_tx();
    let parsed = header::parse(&response).unwrap();
    assert!(parsed.checksum_ok);
    assert_eq!(parsed.header.command_class, CommandClass::GetCommandResponse.as_u8());
    assert_eq!(parsed.header.destination, CONTROLLER);
    assert_eq!(parsed.pdl_bytes.len(), 19); // DEVICE_INFO_FORMAT "wwwdwbbwwb"
}

#[test]
fn set_device_label_then_get_returns_it() {
    let device_uid = Uid::new(0x4144, 2);
    let (mut driver, hal) = new_driver(device_uid);

    let set_request = build_rdm_request(device_uid, CONTROLLER, pids::DEVICE_LABEL, CommandClass::SetCommand, b"Hello");
    deliver_frame(&mut driver, &hal, &set_request);
    driver.receive(1_000).unwrap();
    pump_transmit(&mut driver, &hal);
    let set_response = hal.take_tx();
    let parsed = header::parse(&set_response).unwrap();
    assert_eq!(parsed.header.command_class, CommandClass::SetCommandResponse.as_u8());

    let get_request = build_rdm_request(device_uid, CONTROLLER, pids::DEVICE_LABEL, CommandClass::GetCommand, &[]);
    deliver_frame(&mut driver, &hal, &get_request);
    driver.receive(1_000).unwrap();
    pump_transmit(&mut driver, &hal);
    let get_response = hal.take_tx();
    let parsed = header::parse(&get_response).unwrap();
    assert_eq!(parsed.pdl_bytes, b"Hello");
}

#[test]
fn disc_unique_branch_covering_the_device_gets_a_reply() {
    let device_uid = Uid::new(0x4144, 3);
    let (mut driver, hal) = new_driver(device_uid);

    let lower = Uid::new(0, 0);
    let upper = Uid::new(0xFFFF, 0xFFFF_FFFE);
    let mut pdl_bytes = [0u8; 12];
    pdl_bytes[0..6].copy_from_slice(&lower.to_be_bytes());
    pdl_bytes[6..12].copy_from_slice(&upper.to_be_bytes());

    let request = build_rdm_request(Uid::BROADCAST, CONTROLLER, pids::DISC_UNIQUE_BRANCH, CommandClass::DiscoveryCommand, &pdl_bytes);
    deliver_frame(&mut driver, &hal, &request);
    driver.receive(1_000).unwrap();

    pump_transmit(&mut driver, &hal);
    let response = hal.take_tx();
    let (decoded, checksum_ok) = disc::decode(&response).unwrap();
    assert!(checksum_ok);
    assert_eq!(decoded, device_uid);
}

#[test]
fn rx_overflow_surfaces_as_an_error_from_receive() {
    let device_uid = Uid::new(0x4144, 4);
    let (mut driver, hal) = new_driver(device_uid);

    hal.set_status(InterruptMask::RX_OVERFLOW);
    driver.on_uart_interrupt();

    let err = driver.receive(1_000).unwrap_err();
    assert_eq!(err, DriverError::Overflow);
    assert!(hal.take_tx().is_empty());
}

#[test]
fn unknown_pid_nacks_over_the_wire() {
    let device_uid = Uid::new(0x4144, 5);
    let (mut driver, hal) = new_driver(device_uid);

    let request = build_rdm_request(device_uid, CONTROLLER, 0x9999, CommandClass::GetCommand, &[]);
    deliver_frame(&mut driver, &hal, &request);
    driver.receive(1_000).unwrap();

    pump_transmit(&mut driver, &hal);
    let response = hal.take_tx();
    let parsed = header::parse(&response).unwrap();
    assert_eq!(parsed.header.port_or_response_type, 0x02); // ResponseType::NackReason
    let reason = u16::from_be_bytes([parsed.pdl_bytes[0], parsed.pdl_bytes[1]]);
    assert_eq!(reason, NackReason::UnknownPid.as_u16());
}

#[test]
fn corrupt_checksum_is_silently_dropped() {
    let device_uid = Uid::new(0x4144, 6);
    let (mut driver, hal) = new_driver(device_uid);

    let mut corrupt = build_rdm_request(device_uid, CONTROLLER, pids::DEVICE_INFO, CommandClass::GetCommand, &[]);
    *corrupt.last_mut().unwrap() ^= 0xFF;
    deliver_frame(&mut driver, &hal, &corrupt);

    // A well-formed frame follows before the task side ever gets to call
    // receive(). If the corrupt checksum surfaced as an error it would be
    // returned here instead of silently giving way to the valid frame.
    let valid = build_rdm_request(device_uid, CONTROLLER, pids::DEVICE_INFO, CommandClass::GetCommand, &[]);
    deliver_frame(&mut driver, &hal, &valid);

    let outcome = driver.receive(1_000).unwrap();
    assert!(matches!(outcome, ReceivedFrame::Rdm { .. }));

    pump_transmit(&mut driver, &hal);
    let response = hal.take_tx();
    let parsed = header::parse(&response).unwrap();
    assert!(parsed.checksum_ok);
    assert_eq!(parsed.header.command_class, CommandClass::GetCommandResponse.as_u8());
}
