//! Card power control
//!
//! Powering up is a cold reset on the backend. The ATR it returns is cached
//! on the slot so later power-up requests can be answered without another
//! reset.

use log::{debug, info};
use thiserror::Error;

use crate::card::{Atr, AtrError};
use crate::net::{self, ContactState, ControlCode, FrameError, Link, Message};
use crate::session::Slot;

/// IFD power action codes
pub const IFD_POWER_UP: u64 = 500;
pub const IFD_POWER_DOWN: u64 = 501;
pub const IFD_RESET: u64 = 502;

/// Power actions the host can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Up,
    Down,
    Reset,
}

impl TryFrom<u64> for PowerAction {
    type Error = PowerError;

    fn try_from(action: u64) -> Result<Self, Self::Error> {
        match action {
            IFD_POWER_UP => Ok(Self::Up),
            IFD_POWER_DOWN => Ok(Self::Down),
            IFD_RESET => Ok(Self::Reset),
            other => Err(PowerError::Unsupported(other)),
        }
    }
}

/// Errors from power control
#[derive(Debug, Error)]
pub enum PowerError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Atr(#[from] AtrError),

    #[error("slot has no backend connection")]
    NotConnected,

    #[error("backend refused the reset")]
    Refused,

    #[error("ATR of {needed} bytes does not fit in {available} bytes")]
    InsufficientBuffer { needed: usize, available: usize },

    #[error("unsupported power action {0}")]
    Unsupported(u64),
}

/// Cold-reset the card and cache its ATR
///
/// The slot is only updated once a valid ATR is in hand, so a failed reset
/// leaves the previous state untouched.
pub fn power_up_or_reset<L: Link>(slot: &mut Slot<L>) -> Result<(), PowerError> {
    let (link, state) = slot.split().ok_or(PowerError::NotConnected)?;

    let request = Message::control(ContactState::EMPTY, ControlCode::ResetColdPpsN);
    let reply = net::exchange(link, &request)?;
    if reply.ctrl == ControlCode::Failure {
        return Err(PowerError::Refused);
    }
    let atr = Atr::new(&reply.buf)?;

    state.contact = ContactState::READY;
    state.atr = atr;
    state.expected_len = reply.expected_len;
    info!("Card reset, ATR: {}", hex::encode_upper(atr.as_bytes()));
    Ok(())
}

/// Carry out a power action
///
/// Returns the ATR to hand back to the host, or `None` for power-down.
/// `capacity` is the size of the host's ATR buffer.
pub fn power_action<L: Link>(
    slot: &mut Slot<L>,
    action: PowerAction,
    capacity: usize,
) -> Result<Option<Atr>, PowerError> {
    match action {
        PowerAction::Down => {
            debug!("Power down is a no-op for the backend");
            Ok(None)
        }
        PowerAction::Reset => {
            power_up_or_reset(slot)?;
            deliver_atr(slot, capacity).map(Some)
        }
        PowerAction::Up => {
            if slot.state().atr.is_empty() {
                power_up_or_reset(slot)?;
            } else {
                debug!("Reusing cached ATR");
            }
            deliver_atr(slot, capacity).map(Some)
        }
    }
}

fn deliver_atr<L: Link>(slot: &Slot<L>, capacity: usize) -> Result<Atr, PowerError> {
    let atr = slot.state().atr;
    if atr.len() > capacity {
        return Err(PowerError::InsufficientBuffer {
            needed: atr.len(),
            available: capacity,
        });
    }
    Ok(atr)
}
