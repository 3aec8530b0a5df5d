//! P2P wire framing, message taxonomy, and session state machine
//! (§4.8). Transport sockets, DNS seeding, and the peer address
//! database are out of scope; this module covers everything needed to
//! frame, validate, and sequence messages once bytes are already in
//! hand.

pub mod message;
pub mod session;

pub use message::{
    decode_header, encode_frame, validate_payload, Command, MessageHeader, HEADER_SIZE, MAX_ADDR_ENTRIES,
    MAX_INV_ENTRIES, MAX_PAYLOAD_SIZE, ORPHAN_POOL_CAPACITY, ORPHAN_TX_EXPIRY_SECS, PEER_SILENCE_TIMEOUT_SECS,
    PING_INTERVAL_SECS,
};
pub use session::{Effect, Event, PeerScore, Session, SessionState, BAN_THRESHOLD};
