//! RDM wire codec: standard packet header/checksum, the non-standard
//! `DISC_UNIQUE_BRANCH` encoding, the PDL format DSL, and PID/command-class
//! constants.

pub mod disc;
pub mod header;
pub mod pdl;
pub mod pid;

pub use header::{additive_checksum, parse, RdmHeader, RDM_HEADER_LEN, RDM_MAX_PDL};
pub use pid::{AllowedCommandClass, CommandClass, ResponseType};
