//! Standard RDM packet: the 24-byte header, checksum, and PDL payload.
//!
//! Checksum failures surface through [`ParsedPacket::checksum_ok`], never as
//! a parse error — the RDM layer discards them before dispatch.

use crate::uid::Uid;

pub const RDM_START_CODE: u8 = 0xCC;
pub const RDM_SUB_START_CODE: u8 = 0x01;
pub const RDM_HEADER_LEN: usize = 24;
pub const RDM_CHECKSUM_LEN: usize = 2;
pub const RDM_MAX_PDL: usize = 231;

/// The fixed 24-byte prefix shared by every standard RDM packet, decoded
/// into native types (`sub_device`/`pid` byte-swapped from wire order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdmHeader {
    pub message_len: u8,
    pub destination: Uid,
    pub source: Uid,
    pub transaction_number: u8,
    pub port_or_response_type: u8,
    pub message_count: u8,
    pub sub_device: u16,
    pub command_class: u8,
    pub pid: u16,
    pub pdl: u8,
}

/// Outcome of parsing a candidate RDM frame out of a byte buffer.
#[derive(Debug, Clone, Copy)]
pub struct ParsedPacket<'a> {
    pub header: RdmHeader,
    pub pdl_bytes: &'a [u8],
    pub checksum_ok: bool,
}

/// Additive checksum over `bytes`: an 8-bit-wrapping sum widened to 16 bits
/// (RDM's checksum is a 16-bit sum of the raw bytes, not reduced modulo
/// 256).
pub fn additive_checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Parses a standard RDM packet out of `buf` (the framer's byte buffer,
/// starting at the start code). Returns `None` if the buffer is too short or
/// structurally invalid (bad start code, bad sub-start code, message_len out
/// of the declared bounds) — those are not recoverable "partial frame"
/// situations, unlike a bad checksum which parses fine but is flagged.
pub fn parse(buf: &[u8]) -> Option<ParsedPacket<'_>> {
    if buf.len() < RDM_HEADER_LEN + RDM_CHECKSUM_LEN {
        return None;
    }
    if buf[0] != RDM_START_CODE || buf[1] != RDM_SUB_START_CODE {
        return None;
    }
    let message_len = buf[2];
    if (message_len as usize) < RDM_HEADER_LEN || (message_len as usize) > buf.len() {
        return None;
    }
    let message_len_usize = message_len as usize;
    if buf.len() < message_len_usize + RDM_CHECKSUM_LEN {
        return None;
    }

    let destination = Uid::from_be_bytes(buf[3..9].try_into().unwrap());
    let source = Uid::from_be_bytes(buf[9..15].try_into().unwrap());
    let transaction_number = buf[15];
    let port_or_response_type = buf[16];
    let message_count = buf[17];
    let sub_device = u16::from_be_bytes([buf[18], buf[19]]);
    let command_class = buf[20];
    let pid = u16::from_be_bytes([buf[21], buf[22]]);
    let pdl = buf[23];

    let pdl_end = RDM_HEADER_LEN + pdl as usize;
    if pdl_end > message_len_usize {
        return None;
    }
    let pdl_bytes = &buf[RDM_HEADER_LEN..pdl_end];

    let computed = additive_checksum(&buf[0..message_len_usize]);
    let on_wire = u16::from_be_bytes([buf[message_len_usize], buf[message_len_usize + 1]]);
    let checksum_ok = computed == on_wire;

    Some(ParsedPacket {
        header: RdmHeader {
            message_len,
            destination,
            source,
            transaction_number,
            port_or_response_type,
            message_count,
            sub_device,
            command_class,
            pid,
            pdl,
        },
        pdl_bytes,
        checksum_ok,
    })
}

/// Formats a standard RDM packet into `out`, returning the total length
/// written (header + pdl + checksum). `pdl_bytes.len()` must be `<= 231`;
/// callers validate this before calling (responders clamp to the
/// destination buffer's capacity rather than panicking).
pub fn format(header: &RdmHeader, pdl_bytes: &[u8], out: &mut [u8]) -> Option<usize> {
    let total_len = RDM_HEADER_LEN + pdl_bytes.len() + RDM_CHECKSUM_LEN;
    if pdl_bytes.len() > RDM_MAX_PDL || out.len() < total_len {
        return None;
    }

    out[0] = RDM_START_CODE;
    out[1] = RDM_SUB_START_CODE;
    out[2] = (RDM_HEADER_LEN + pdl_bytes.len()) as u8;
    out[3..9].copy_from_slice(&header.destination.to_be_bytes());
    out[9..15].copy_from_slice(&header.source.to_be_bytes());
    out[15] = header.transaction_number;
    out[16] = header.port_or_response_type;
    out[17] = header.message_count;
    out[18..20].copy_from_slice(&header.sub_device.to_be_bytes());
    out[20] = header.command_class;
    out[21..23].copy_from_slice(&header.pid.to_be_bytes());
    out[23] = pdl_bytes.len() as u8;
    let message_len = RDM_HEADER_LEN + pdl_bytes.len();
    out[RDM_HEADER_LEN..message_len].copy_from_slice(pdl_bytes);

    let checksum = additive_checksum(&out[0..message_len]);
    out[message_len..message_len + 2].copy_from_slice(&checksum.to_be_bytes());

    Some(total_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> RdmHeader {
        RdmHeader {
            message_len: 0,
            destination: Uid::new(0x4144, 0x0000_0001),
            source: Uid::new(0x4144, 0x0000_0002),
            transaction_number: 7,
            port_or_response_type: 0,
            message_count: 0,
            sub_device: 0,
            command_class: crate::rdm::pid::CommandClass::GetCommand.as_u8(),
            pid: crate::rdm::pid::pids::DEVICE_INFO,
            pdl: 0,
        }
    }

    #[test]
    fn round_trips_header_with_empty_pdl() {
        let header = sample_header();
        let mut buf = [0u8; 64];
        let len = format(&header, &[], &mut buf).unwrap();
        assert_eq!(len, RDM_HEADER_LEN + RDM_CHECKSUM_LEN);

        let parsed = parse(&buf[..len]).unwrap();
        assert!(parsed.checksum_ok);
        assert_eq!(parsed.header.destination, header.destination);
        assert_eq!(parsed.header.source, header.source);
        assert_eq!(parsed.header.pid, header.pid);
        assert!(parsed.pdl_bytes.is_empty());
    }

    #[test]
    fn round_trips_header_with_pdl_payload() {
        let header = sample_header();
        let payload = [0x01u8, 0x02, 0x03, 0x04, 0x05];
        let mut buf = [0u8; 64];
        let len = format(&header, &payload, &mut buf).unwrap();

        let parsed = parse(&buf[..len]).unwrap();
        assert!(parsed.checksum_ok);
        assert_eq!(parsed.pdl_bytes, &payload);
    }

    #[test]
    fn corrupt_checksum_is_flagged_not_rejected() {
        let header = sample_header();
        let mut buf = [0u8; 64];
        let len = format(&header, &[], &mut buf).unwrap();
        buf[len - 1] ^= 0xFF;

        let parsed = parse(&buf[..len]).unwrap();
        assert!(!parsed.checksum_ok);
    }

    #[test]
    fn message_len_24_with_zero_pdl_parses() {
        let header = sample_header();
        let mut buf = [0u8; 64];
        let len = format(&header, &[], &mut buf).unwrap();
        assert_eq!(buf[2] as usize, RDM_HEADER_LEN);
        assert!(parse(&buf[..len]).is_some());
    }

    #[test]
    fn rejects_truncated_buffer() {
        let header = sample_header();
        let mut buf = [0u8; 64];
        let len = format(&header, &[], &mut buf).unwrap();
        assert!(parse(&buf[..len - 1]).is_none());
    }

    #[test]
    fn rejects_bad_start_code() {
        let header = sample_header();
        let mut buf = [0u8; 64];
        let len = format(&header, &[], &mut buf).unwrap();
        buf[0] = 0x00;
        assert!(parse(&buf[..len]).is_none());
    }
}
