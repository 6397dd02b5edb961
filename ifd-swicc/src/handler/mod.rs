//! Host-facing handler
//!
//! [`Handler`] has one safe method per IFD handler entry point. Each takes
//! plain values and slices, resolves the Lun first and then works on the
//! session. The C exports in the crate root only translate pointers and
//! results around these methods.

mod capability;
mod codes;
mod lun;

pub use capability::Capability;
pub use codes::*;
pub use lun::resolve;

use std::net::SocketAddr;

use log::{debug, info};

use crate::config::Config;
use crate::error::IfdError;
use crate::power::{self, PowerAction};
use crate::presence::{self, Presence};
use crate::session::{Session, SessionManager, SlotId};
use crate::transfer;

/// Driver state behind the exported entry points
#[derive(Debug)]
pub struct Handler {
    sessions: SessionManager,
}

impl Handler {
    pub fn new(config: Config) -> Self {
        Self {
            sessions: SessionManager::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        self.sessions.config()
    }

    /// Address the backend should connect to, once a channel is open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.sessions.session()?.local_addr().ok()
    }

    /// Open the channel for `lun`, creating the listener on first use
    pub fn create_channel_by_name(&mut self, lun: u64, device: &str) -> Result<(), IfdError> {
        let id = resolve(lun)?;
        debug!("Opening slot {} for device {:?}", id, device);

        if !device.starts_with(self.config().device_prefix.as_str()) {
            return Err(IfdError::UnknownDevice(device.to_string()));
        }
        self.sessions.open(id)?;
        info!("Channel open on slot {}", id);
        Ok(())
    }

    /// Legacy channel creation, superseded by [`Handler::create_channel_by_name`]
    pub fn create_channel(&mut self, lun: u64, channel: u64) -> Result<(), IfdError> {
        let id = resolve(lun)?;
        debug!("Refusing legacy channel {} for slot {}", channel, id);
        Err(IfdError::NotSupported)
    }

    /// Close the channel for `lun`; slot 0 closes everything
    pub fn close_channel(&mut self, lun: u64) -> Result<(), IfdError> {
        let id = resolve(lun)?;
        self.sessions.close(id);
        info!("Channel closed on slot {}", id);
        Ok(())
    }

    /// Write the value of capability `tag` into `out`, returning its length
    pub fn get_capabilities(&mut self, lun: u64, tag: u64, out: &mut [u8]) -> Result<usize, IfdError> {
        let (session, id) = self.session(lun)?;
        let capability = Capability::try_from(tag)?;

        match capability.fixed_value() {
            Some(value) => capability::write_value(&[value], out),
            None => {
                let atr = session.slot(id).state().atr;
                capability::write_value(atr.as_bytes(), out)
            }
        }
    }

    /// Every known capability is read-only
    pub fn set_capabilities(&mut self, lun: u64, tag: u64, _value: &[u8]) -> Result<(), IfdError> {
        self.session(lun)?;
        Capability::try_from(tag)?;
        Err(IfdError::ReadOnlyTag(tag))
    }

    /// Accept T=0 (or the default protocol) without any PTS negotiation
    pub fn set_protocol_parameters(
        &mut self,
        lun: u64,
        protocol: u64,
        flags: u8,
        pts: [u8; 3],
    ) -> Result<(), IfdError> {
        let (_, id) = self.session(lun)?;
        debug!(
            "Slot {}: protocol 0x{:08X}, flags 0x{:02X}, PTS {}",
            id,
            protocol,
            flags,
            hex::encode_upper(pts)
        );

        if protocol != SCARD_PROTOCOL_T0 && protocol != SCARD_PROTOCOL_DEFAULT {
            return Err(IfdError::ProtocolNotSupported(protocol));
        }
        if flags != 0 {
            return Err(IfdError::PtsNotSupported(flags));
        }
        Ok(())
    }

    /// Power up, power down or reset the card, writing any ATR into `atr_out`
    pub fn power_icc(&mut self, lun: u64, action: u64, atr_out: &mut [u8]) -> Result<usize, IfdError> {
        let (session, id) = self.session(lun)?;
        let action = PowerAction::try_from(action)?;
        debug!("Slot {}: power action {:?}", id, action);

        match power::power_action(session.slot_mut(id), action, atr_out.len())? {
            Some(atr) => capability::write_value(atr.as_bytes(), atr_out),
            None => Ok(0),
        }
    }

    /// Send a command APDU and write the response TPDU into `rx`
    pub fn transmit_to_icc(
        &mut self,
        lun: u64,
        protocol: u64,
        tx: &[u8],
        rx: &mut [u8],
    ) -> Result<usize, IfdError> {
        let (session, id) = self.session(lun)?;
        if protocol == SCARD_PROTOCOL_T1 {
            return Err(IfdError::ProtocolNotSupported(protocol));
        }
        debug!("Slot {}: C-APDU {}", id, hex::encode_upper(tx));

        let tpdu = transfer::transmit(session.slot_mut(id), tx, rx.len())?;
        let response = tpdu.to_bytes();
        debug!("Slot {}: R-TPDU {}", id, hex::encode_upper(&response));
        capability::write_value(&response, rx)
    }

    /// Check for a card, picking up a waiting backend if the slot is empty
    pub fn icc_presence(&mut self, lun: u64) -> Result<Presence, IfdError> {
        let id = resolve(lun)?;
        Ok(match self.sessions.session_mut() {
            Some(session) => presence::poll(session, id),
            None => Presence::Absent,
        })
    }

    /// Vendor control commands are not implemented
    pub fn control(&mut self, lun: u64, control_code: u64) -> Result<usize, IfdError> {
        let id = resolve(lun)?;
        debug!("Slot {}: ignoring control code 0x{:08X}", id, control_code);
        Err(IfdError::NotSupported)
    }

    fn session(&mut self, lun: u64) -> Result<(&mut Session, SlotId), IfdError> {
        let id = resolve(lun)?;
        let session = self.sessions.session_mut().ok_or(IfdError::NoSession)?;
        Ok((session, id))
    }
}
