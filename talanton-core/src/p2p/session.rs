//! Per-peer session state machine (§4.8). Modeled as a pure
//! transition function over `(state, event) -> (state, effects)`
//! rather than callback-driven dispatch, so the FSM can be tested
//! without a socket and the runtime simply executes whatever effects
//! come back (Design Notes §9: "Callback-driven session FSM").

use super::message::Command;

/// Peer connection lifecycle (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Handshake,
    Connected,
    Disconnected,
}

/// Inputs the runtime feeds into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SocketReady,
    ReceivedVersion,
    ReceivedVerack,
    ReceivedPreVerackOther(Command),
    MalformedFrame,
    SizeCapViolation,
    PingTimeout,
    SilenceTimeout,
    StopRequested,
    TerminalError,
}

/// Outputs the state machine asks the runtime to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendVersion,
    SendVerack,
    SendPing,
    Disconnect,
    ScoreDown(i32),
    Ban,
}

/// Score penalty applied for a malformed frame (§4.8).
pub const MALFORMED_FRAME_PENALTY: i32 = 10;
/// Score penalty applied for exceeding a size cap (§4.8).
pub const SIZE_CAP_PENALTY: i32 = 20;
/// A peer's score rising to or above this is banned, and the ban
/// persists (§4.8).
pub const BAN_THRESHOLD: i32 = 100;

/// Tracks a single peer's misbehavior score. Score accumulates
/// (higher is worse); crossing `BAN_THRESHOLD` bans the peer
/// permanently — a subsequent score reset does not lift a ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerScore {
    score: i32,
    banned: bool,
}

impl Default for PeerScore {
    fn default() -> Self {
        Self { score: 0, banned: false }
    }
}

impl PeerScore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_banned(&self) -> bool {
        self.banned
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.score
    }

    /// Applies a penalty and returns whether this crossed the ban
    /// threshold for the first time.
    pub fn penalize(&mut self, amount: i32) -> bool {
        self.score += amount;
        if !self.banned && self.score >= BAN_THRESHOLD {
            self.banned = true;
            return true;
        }
        false
    }
}

/// A single peer's connection-level state, driven by `transition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
}

impl Session {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Connecting,
        }
    }

    /// Applies `event` to the current state, returning the effects the
    /// runtime should execute, and updates `self.state` in place.
    pub fn apply(&mut self, event: &Event) -> Vec<Effect> {
        let (next, effects) = transition(self.state, event);
        self.state = next;
        effects
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// The pure transition function: `CONNECTING -> HANDSHAKE` on socket
/// ready, `HANDSHAKE -> CONNECTED` only on verack, any terminal
/// condition moves to `DISCONNECTED` from any state (§4.8).
#[must_use]
pub fn transition(state: SessionState, event: &Event) -> (SessionState, Vec<Effect>) {
    match event {
        Event::StopRequested | Event::TerminalError | Event::SilenceTimeout => {
            (SessionState::Disconnected, vec![Effect::Disconnect])
        }
        Event::MalformedFrame => (state, vec![Effect::ScoreDown(MALFORMED_FRAME_PENALTY)]),
        Event::SizeCapViolation => (state, vec![Effect::ScoreDown(SIZE_CAP_PENALTY)]),
        Event::PingTimeout => (state, vec![Effect::SendPing]),
        _ => match (state, event) {
            (SessionState::Connecting, Event::SocketReady) => (SessionState::Handshake, vec![Effect::SendVersion]),
            (SessionState::Handshake, Event::ReceivedVersion) => (SessionState::Handshake, vec![Effect::SendVerack]),
            (SessionState::Handshake, Event::ReceivedVerack) => (SessionState::Connected, vec![]),
            (SessionState::Handshake, Event::ReceivedPreVerackOther(_)) => (SessionState::Handshake, vec![]),
            (SessionState::Connected, _) => (SessionState::Connected, vec![]),
            (other, _) => (other, vec![]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_completes_only_on_verack() {
        let mut session = Session::new();
        assert_eq!(session.apply(&Event::SocketReady), vec![Effect::SendVersion]);
        assert_eq!(session.state, SessionState::Handshake);

        assert_eq!(session.apply(&Event::ReceivedVersion), vec![Effect::SendVerack]);
        assert_eq!(session.state, SessionState::Handshake);

        assert_eq!(session.apply(&Event::ReceivedVerack), vec![]);
        assert_eq!(session.state, SessionState::Connected);
    }

    #[test]
    fn pre_verack_traffic_other_than_version_is_ignored() {
        let mut session = Session::new();
        session.apply(&Event::SocketReady);
        let effects = session.apply(&Event::ReceivedPreVerackOther(Command::Tx));
        assert!(effects.is_empty());
        assert_eq!(session.state, SessionState::Handshake);
    }

    #[test]
    fn terminal_error_disconnects_from_any_state() {
        for start in [SessionState::Connecting, SessionState::Handshake, SessionState::Connected] {
            let (next, effects) = transition(start, &Event::TerminalError);
            assert_eq!(next, SessionState::Disconnected);
            assert_eq!(effects, vec![Effect::Disconnect]);
        }
    }

    #[test]
    fn peer_score_bans_once_threshold_crossed() {
        let mut score = PeerScore::new();
        assert!(!score.penalize(MALFORMED_FRAME_PENALTY * 5));
        assert!(!score.is_banned());
        assert!(score.penalize(MALFORMED_FRAME_PENALTY * 5));
        assert!(score.is_banned());
    }

    #[test]
    fn malformed_frame_scores_down_without_changing_state() {
        let mut session = Session::new();
        session.apply(&Event::SocketReady);
        let effects = session.apply(&Event::MalformedFrame);
        assert_eq!(effects, vec![Effect::ScoreDown(MALFORMED_FRAME_PENALTY)]);
        assert_eq!(session.state, SessionState::Handshake);
    }
}
