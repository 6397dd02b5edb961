//! Card presence detection
//!
//! A card is present when a backend is connected and answers keep-alives.
//! An unconnected slot gets a chance to pick up a queued backend on every
//! poll.

use log::{debug, info, warn};

use crate::net::{self, ControlCode, FrameError, Link, Message};
use crate::session::{Session, Slot, SlotId};

/// Outcome of a presence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub fn is_present(self) -> bool {
        self == Self::Present
    }
}

/// Ping the backend behind a connected slot
///
/// Any failure, including a negative acknowledgment, disconnects the slot.
pub fn probe<L: Link>(slot: &mut Slot<L>) -> Presence {
    match keep_alive(slot) {
        Ok(true) => Presence::Present,
        Ok(false) => {
            warn!("Backend rejected keep-alive, dropping it");
            slot.disconnect();
            Presence::Absent
        }
        Err(e) => {
            warn!("Keep-alive failed: {}", e);
            slot.disconnect();
            Presence::Absent
        }
    }
}

/// Returns `Ok(false)` on a negative acknowledgment
fn keep_alive<L: Link>(slot: &mut Slot<L>) -> Result<bool, FrameError> {
    let Some((link, state)) = slot.split() else {
        return Ok(false);
    };

    let request = Message::control(state.contact, ControlCode::KeepAlive);
    let reply = net::exchange(link, &request)?;
    if reply.ctrl == ControlCode::Failure {
        return Ok(false);
    }
    state.contact = reply.contact;
    Ok(true)
}

/// Presence check for `id` within a live session
///
/// A connected slot is probed. An unconnected slot tries a non-blocking
/// accept and reports present only if a backend was attached by this call.
pub fn poll(session: &mut Session, id: SlotId) -> Presence {
    if session.slot(id).is_connected() {
        return probe(session.slot_mut(id));
    }

    match session.accept(id) {
        Ok(true) => {
            info!("Card inserted in slot {}", id);
            Presence::Present
        }
        Ok(false) => Presence::Absent,
        Err(e) => {
            debug!("No card in slot {}: {}", id, e);
            Presence::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Atr;
    use crate::net::mock::ScriptedLink;
    use crate::net::ContactState;

    fn ready_slot() -> Slot<ScriptedLink> {
        let mut slot = Slot::default();
        slot.attach(ScriptedLink::new());
        let (_, state) = slot.split().unwrap();
        state.contact = ContactState::READY;
        state.atr = Atr::new(&[0x3B, 0x00]).unwrap();
        state.expected_len = 5;
        slot
    }

    fn ack(contact: ContactState, ctrl: ControlCode) -> Message {
        Message {
            contact,
            ctrl,
            expected_len: 99,
            buf: Vec::new(),
        }
    }

    #[test]
    fn test_keep_alive_success() {
        let mut slot = ready_slot();
        let contact = ContactState::from_bits(ContactState::VCC | ContactState::VALID_VCC);
        slot.split().unwrap().0.push_reply(&ack(contact, ControlCode::Success));

        assert_eq!(probe(&mut slot), Presence::Present);
        assert!(slot.is_connected());
        assert_eq!(slot.state().contact, contact);
        // expected_len only changes on data exchanges
        assert_eq!(slot.state().expected_len, 5);

        let sent = slot.split().unwrap().0.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ctrl, ControlCode::KeepAlive);
        assert_eq!(sent[0].contact, ContactState::READY);
        assert!(sent[0].buf.is_empty());
    }

    #[test]
    fn test_keep_alive_nack_disconnects() {
        let mut slot = ready_slot();
        slot.split()
            .unwrap()
            .0
            .push_reply(&ack(ContactState::READY, ControlCode::Failure));

        assert_eq!(probe(&mut slot), Presence::Absent);
        assert!(!slot.is_connected());
        assert!(slot.state().atr.is_empty());
    }

    #[test]
    fn test_keep_alive_io_failure_disconnects() {
        let mut slot = ready_slot();
        assert_eq!(probe(&mut slot), Presence::Absent);
        assert!(!slot.is_connected());
        assert!(slot.state().contact.is_empty());
    }

    #[test]
    fn test_probe_unconnected_slot() {
        let mut slot: Slot<ScriptedLink> = Slot::default();
        assert_eq!(probe(&mut slot), Presence::Absent);
    }

    #[test]
    fn test_poll_accepts_then_probes() {
        use crate::config::Config;
        use std::io::{Read, Write};
        use std::net::{IpAddr, Ipv4Addr, TcpStream};

        let config = Config {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..Config::default()
        };
        let mut session = Session::bind(&config).unwrap();
        let id = SlotId::new(1).unwrap();
        assert_eq!(poll(&mut session, id), Presence::Absent);

        let mut backend = TcpStream::connect(session.local_addr().unwrap()).unwrap();
        assert_eq!(poll(&mut session, id), Presence::Present);

        // Answer the next keep-alive with a success frame
        let reply = ack(ContactState::READY, ControlCode::Success).encode().unwrap();
        backend.write_all(&reply).unwrap();
        assert_eq!(poll(&mut session, id), Presence::Present);

        let mut request = [0u8; 16];
        backend.read_exact(&mut request).unwrap();
        assert_eq!(u32::from_le_bytes([request[8], request[9], request[10], request[11]]), 3);

        // Backend goes away: the next poll disconnects the slot
        drop(backend);
        assert_eq!(poll(&mut session, id), Presence::Absent);
        assert!(!session.slot(id).is_connected());
    }
}
