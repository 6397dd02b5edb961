//! Per-slot connection state

use std::fmt;
use std::io;
use std::net::TcpStream;

use log::{info, warn};

use crate::card::Atr;
use crate::net::{ContactState, Link};

/// Number of slots, and of concurrent backend connections
pub const MAX_SLOTS: usize = 64;

/// A slot number known to be below [`MAX_SLOTS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    /// The master slot; closing it tears the whole session down
    pub const MASTER: Self = Self(0);

    pub fn new(index: usize) -> Option<Self> {
        (index < MAX_SLOTS).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn is_master(self) -> bool {
        self == Self::MASTER
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the reader remembers about the card behind a slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotState {
    /// Contact state last exchanged with the backend
    pub contact: ContactState,
    /// ATR from the last successful power-up, empty if none
    pub atr: Atr,
    /// Bytes the backend last said it needs next
    pub expected_len: u32,
}

/// One card slot: an optional backend connection plus cached card state
#[derive(Debug)]
pub struct Slot<L = TcpStream> {
    link: Option<L>,
    state: SlotState,
}

impl<L> Default for Slot<L> {
    fn default() -> Self {
        Self {
            link: None,
            state: SlotState::default(),
        }
    }
}

impl<L: Link> Slot<L> {
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    /// Borrow the connection and the card state together
    pub fn split(&mut self) -> Option<(&mut L, &mut SlotState)> {
        let state = &mut self.state;
        self.link.as_mut().map(|link| (link, state))
    }

    /// Take ownership of a freshly accepted connection
    pub fn attach(&mut self, link: L) {
        self.state = SlotState::default();
        self.link = Some(link);
    }

    /// Drop the connection and forget everything about the card
    ///
    /// Always releases the stream and zeroes the state. A failed shutdown is
    /// logged and handed back to the caller, never propagated.
    pub fn disconnect(&mut self) -> Option<io::Error> {
        self.state = SlotState::default();
        let mut link = self.link.take()?;
        let failure = match link.shutdown() {
            Ok(()) => None,
            Err(e) => {
                warn!("Call to shutdown() failed: {}", e);
                Some(e)
            }
        };
        drop(link);
        info!("Client disconnected");
        failure
    }
}

/// Fixed-capacity table of slots indexed by [`SlotId`]
#[derive(Debug)]
pub struct SlotTable<L = TcpStream> {
    slots: Vec<Slot<L>>,
}

impl<L: Link> SlotTable<L> {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_SLOTS).map(|_| Slot::default()).collect(),
        }
    }

    pub fn get(&self, id: SlotId) -> &Slot<L> {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: SlotId) -> &mut Slot<L> {
        &mut self.slots[id.index()]
    }

    /// Disconnect every slot, collecting shutdown failures
    pub fn disconnect_all(&mut self) -> Vec<(SlotId, io::Error)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.disconnect().map(|e| (SlotId(index), e)))
            .collect()
    }
}

impl<L: Link> Default for SlotTable<L> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::mock::ScriptedLink;

    fn populated_slot() -> Slot<ScriptedLink> {
        let mut slot = Slot::default();
        slot.attach(ScriptedLink::new());
        let (_, state) = slot.split().unwrap();
        state.contact = ContactState::READY;
        state.atr = Atr::new(&[0x3B, 0x00]).unwrap();
        state.expected_len = 5;
        slot
    }

    #[test]
    fn test_slot_id_bounds() {
        assert_eq!(SlotId::new(0), Some(SlotId::MASTER));
        assert!(SlotId::new(MAX_SLOTS - 1).is_some());
        assert!(SlotId::new(MAX_SLOTS).is_none());
        assert!(!SlotId::new(3).unwrap().is_master());
    }

    #[test]
    fn test_disconnect_zeroes_state() {
        let mut slot = populated_slot();
        assert!(slot.disconnect().is_none());
        assert!(!slot.is_connected());
        assert_eq!(*slot.state(), SlotState::default());
        assert_eq!(slot.state().atr.len(), 0);
        assert!(slot.state().contact.is_empty());
    }

    #[test]
    fn test_disconnect_survives_shutdown_failure() {
        let mut slot = Slot::default();
        let mut link = ScriptedLink::new();
        link.fail_shutdown();
        slot.attach(link);
        assert!(slot.disconnect().is_some());
        assert!(!slot.is_connected());
    }

    #[test]
    fn test_disconnect_unconnected_slot() {
        let mut slot: Slot<ScriptedLink> = Slot::default();
        assert!(slot.disconnect().is_none());
        assert_eq!(*slot.state(), SlotState::default());
    }

    #[test]
    fn test_table_disconnect_all() {
        let mut table: SlotTable<ScriptedLink> = SlotTable::new();
        for index in [0, 7, MAX_SLOTS - 1] {
            let id = SlotId::new(index).unwrap();
            let mut link = ScriptedLink::new();
            if index == 7 {
                link.fail_shutdown();
            }
            table.get_mut(id).attach(link);
        }
        let failures = table.disconnect_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, SlotId::new(7).unwrap());
        assert!((0..MAX_SLOTS).all(|i| !table.get(SlotId::new(i).unwrap()).is_connected()));
    }
}
