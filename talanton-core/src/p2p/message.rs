//! Wire frame header and message taxonomy (§4.8): 24-byte header (magic,
//! command, length, checksum) plus the named message types peers
//! exchange. Encoding is little-endian throughout, matching the rest
//! of the wire formats in this crate.

use shared::Hash256;

use crate::error::{Result, TalantonError};

pub const HEADER_SIZE: usize = 24;
pub const COMMAND_SIZE: usize = 12;

pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;
pub const MAX_INV_ENTRIES: usize = 50_000;
pub const MAX_ADDR_ENTRIES: usize = 1_000;
pub const ORPHAN_POOL_CAPACITY: usize = 100;
pub const ORPHAN_TX_EXPIRY_SECS: u64 = 20 * 60;
pub const PING_INTERVAL_SECS: u64 = 120;
pub const PEER_SILENCE_TIMEOUT_SECS: u64 = 20 * 60;

/// The wire message taxonomy (§4.8): handshake, liveness, inventory,
/// block/header sync, transaction relay, and rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Version,
    Verack,
    Ping,
    Pong,
    Addr,
    GetAddr,
    Inv,
    GetData,
    NotFound,
    GetHeaders,
    Headers,
    GetBlocks,
    Block,
    Tx,
    Mempool,
    Reject,
}

impl Command {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Command::Version => "version",
            Command::Verack => "verack",
            Command::Ping => "ping",
            Command::Pong => "pong",
            Command::Addr => "addr",
            Command::GetAddr => "getaddr",
            Command::Inv => "inv",
            Command::GetData => "getdata",
            Command::NotFound => "notfound",
            Command::GetHeaders => "getheaders",
            Command::Headers => "headers",
            Command::GetBlocks => "getblocks",
            Command::Block => "block",
            Command::Tx => "tx",
            Command::Mempool => "mempool",
            Command::Reject => "reject",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "version" => Ok(Command::Version),
            "verack" => Ok(Command::Verack),
            "ping" => Ok(Command::Ping),
            "pong" => Ok(Command::Pong),
            "addr" => Ok(Command::Addr),
            "getaddr" => Ok(Command::GetAddr),
            "inv" => Ok(Command::Inv),
            "getdata" => Ok(Command::GetData),
            "notfound" => Ok(Command::NotFound),
            "getheaders" => Ok(Command::GetHeaders),
            "headers" => Ok(Command::Headers),
            "getblocks" => Ok(Command::GetBlocks),
            "block" => Ok(Command::Block),
            "tx" => Ok(Command::Tx),
            "mempool" => Ok(Command::Mempool),
            "reject" => Ok(Command::Reject),
            other => Err(TalantonError::InvalidBlockStructure(format!("unknown command: {other}"))),
        }
    }

    /// Encodes to the fixed 12-byte, zero-padded wire form. The command
    /// name must fit in 11 bytes; the 12th byte is always zero (§4.8).
    fn to_bytes(self) -> [u8; COMMAND_SIZE] {
        let mut out = [0u8; COMMAND_SIZE];
        let name = self.as_str().as_bytes();
        out[..name.len()].copy_from_slice(name);
        out
    }

    fn from_bytes(bytes: &[u8; COMMAND_SIZE]) -> Result<Self> {
        if bytes[COMMAND_SIZE - 1] != 0 {
            return Err(TalantonError::InvalidBlockStructure(
                "command field final byte must be zero".to_string(),
            ));
        }
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(COMMAND_SIZE);
        let name = std::str::from_utf8(&bytes[..end])
            .map_err(|_| TalantonError::InvalidBlockStructure("command is not valid utf-8".to_string()))?;
        Self::parse(name)
    }
}

/// The 24-byte frame header preceding every message payload (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub magic: [u8; 4],
    pub command: Command,
    pub length: u32,
    pub checksum: [u8; 4],
}

impl MessageHeader {
    #[must_use]
    pub fn checksum_of(payload: &[u8]) -> [u8; 4] {
        let digest = Hash256::sha256d(payload);
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest.as_bytes()[0..4]);
        out
    }

    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic);
        out[4..16].copy_from_slice(&self.command.to_bytes());
        out[16..20].copy_from_slice(&self.length.to_le_bytes());
        out[20..24].copy_from_slice(&self.checksum);
        out
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(TalantonError::Truncated);
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        let mut command_bytes = [0u8; COMMAND_SIZE];
        command_bytes.copy_from_slice(&buf[4..16]);
        let command = Command::from_bytes(&command_bytes)?;
        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&buf[16..20]);
        let length = u32::from_le_bytes(length_bytes);
        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(&buf[20..24]);
        Ok(Self {
            magic,
            command,
            length,
            checksum,
        })
    }
}

/// Parses `decode_header` and returns the matching `MessageHeader`,
/// enforcing the network magic.
pub fn decode_header(buf: &[u8], expected_magic: [u8; 4]) -> Result<MessageHeader> {
    let header = MessageHeader::deserialize(buf)?;
    if header.magic != expected_magic {
        return Err(TalantonError::BadMagic);
    }
    Ok(header)
}

/// Encodes a full wire frame: header followed by payload, enforcing
/// the 32 MiB payload cap (§4.8).
pub fn encode_frame(magic: [u8; 4], command: Command, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(TalantonError::OversizePayload);
    }
    let header = MessageHeader {
        magic,
        command,
        length: u32::try_from(payload.len()).map_err(|_| TalantonError::OversizePayload)?,
        checksum: MessageHeader::checksum_of(payload),
    };
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.serialize());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Validates a received payload against its header: length match,
/// checksum match, and the size cap (§4.8, §7 Network errors).
pub fn validate_payload(header: &MessageHeader, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_SIZE || header.length as usize > MAX_PAYLOAD_SIZE {
        return Err(TalantonError::OversizePayload);
    }
    if header.length as usize != payload.len() {
        return Err(TalantonError::Truncated);
    }
    if header.checksum != MessageHeader::checksum_of(payload) {
        return Err(TalantonError::ChecksumMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: [u8; 4] = [0xfa, 0xbf, 0xb5, 0xda];

    #[test]
    fn header_round_trips_through_wire_format() {
        let payload = b"hello".to_vec();
        let frame = encode_frame(MAGIC, Command::Ping, &payload).unwrap();
        let header = decode_header(&frame[..HEADER_SIZE], MAGIC).unwrap();
        assert_eq!(header.command, Command::Ping);
        assert_eq!(header.length as usize, payload.len());
        validate_payload(&header, &frame[HEADER_SIZE..]).unwrap();
    }

    #[test]
    fn rejects_wrong_magic() {
        let frame = encode_frame(MAGIC, Command::Verack, &[]).unwrap();
        let other_magic = [0x00, 0x00, 0x00, 0x00];
        assert!(matches!(decode_header(&frame, other_magic), Err(TalantonError::BadMagic)));
    }

    #[test]
    fn rejects_checksum_mismatch() {
        let mut frame = encode_frame(MAGIC, Command::Tx, b"payload").unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let header = decode_header(&frame[..HEADER_SIZE], MAGIC).unwrap();
        assert!(matches!(
            validate_payload(&header, &frame[HEADER_SIZE..]),
            Err(TalantonError::ChecksumMismatch)
        ));
    }

    #[test]
    fn rejects_oversize_payload() {
        let huge = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            encode_frame(MAGIC, Command::Block, &huge),
            Err(TalantonError::OversizePayload)
        ));
    }

    #[test]
    fn command_round_trips_through_fixed_width_encoding() {
        for command in [Command::Version, Command::GetHeaders, Command::NotFound] {
            let bytes = command.to_bytes();
            assert_eq!(bytes[COMMAND_SIZE - 1], 0);
            assert_eq!(Command::from_bytes(&bytes).unwrap(), command);
        }
    }
}
