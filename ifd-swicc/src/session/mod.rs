//! Listening endpoint and per-slot backend connections
//!
//! A [`Session`] exists from the first channel opened until slot 0 is closed.
//! The listener never blocks: each slot picks up a queued backend connection
//! when presence is polled. Established connections are blocking, optionally
//! bounded by the configured timeout.

mod slot;

pub use slot::{Slot, SlotId, SlotState, SlotTable, MAX_SLOTS};

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::Config;
use crate::error::IfdError;

/// The listening socket and the slot table
#[derive(Debug)]
pub struct Session {
    listener: TcpListener,
    slots: SlotTable<TcpStream>,
    io_timeout: Option<Duration>,
}

impl Session {
    /// Create the non-blocking listener with an empty slot table
    pub fn bind(config: &Config) -> io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr())?;
        listener.set_nonblocking(true)?;
        info!("Listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            slots: SlotTable::new(),
            io_timeout: config.io_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn slot(&self, id: SlotId) -> &Slot<TcpStream> {
        self.slots.get(id)
    }

    pub fn slot_mut(&mut self, id: SlotId) -> &mut Slot<TcpStream> {
        self.slots.get_mut(id)
    }

    /// Accept a queued backend connection into `id` without blocking
    ///
    /// Returns `Ok(true)` if a client was attached, `Ok(false)` if none was
    /// queued.
    pub fn accept(&mut self, id: SlotId) -> io::Result<bool> {
        if self.slots.get(id).is_connected() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("slot {} already has a client", id),
            ));
        }

        match self.listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(self.io_timeout)?;
                stream.set_write_timeout(self.io_timeout)?;
                stream.set_nodelay(true)?;
                info!("Client {} connected to slot {}", peer, id);
                self.slots.get_mut(id).attach(stream);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!("Tried accepting connections but no client was queued");
                Ok(false)
            }
            Err(e) if is_client_side(&e) => {
                warn!("Failed to accept a client connection because of client-side problems: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("Failed to accept a client connection: {}", e);
                Err(e)
            }
        }
    }

    /// Disconnect one slot, keeping the listener
    pub fn disconnect(&mut self, id: SlotId) {
        self.slots.get_mut(id).disconnect();
    }

    /// Close every connection and the listener
    ///
    /// Every slot is released even if some shutdowns fail; the failures are
    /// returned for reporting only.
    pub fn teardown(mut self) -> Vec<(SlotId, io::Error)> {
        let failures = self.slots.disconnect_all();
        for (id, e) in &failures {
            warn!("Failed to shut down client socket of slot {}: {}", id, e);
        }
        drop(self.listener);
        info!("Listening socket closed");
        failures
    }
}

/// Owns the configuration and the session, if any
#[derive(Debug)]
pub struct SessionManager {
    config: Config,
    session: Option<Session>,
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Open a channel on `id`
    ///
    /// The listener and slot table are created by the first call. Opening a
    /// slot that already has a live connection fails.
    pub fn open(&mut self, id: SlotId) -> Result<&mut Session, IfdError> {
        let session = match self.session.take() {
            Some(session) => {
                if session.slot(id).is_connected() {
                    self.session = Some(session);
                    return Err(IfdError::SlotBusy(id));
                }
                session
            }
            None => Session::bind(&self.config).map_err(IfdError::Listen)?,
        };
        Ok(self.session.insert(session))
    }

    /// Close the channel on `id`
    ///
    /// Slot 0 is the master channel: closing it tears the whole session
    /// down. Any other slot only loses its own connection. Teardown is
    /// best-effort and always succeeds.
    pub fn close(&mut self, id: SlotId) {
        if id.is_master() {
            if let Some(session) = self.session.take() {
                session.teardown();
            }
        } else if let Some(session) = self.session.as_mut() {
            session.disconnect(id);
        }
    }
}

/// Accept failures caused by the peer rather than the listener
fn is_client_side(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted | io::ErrorKind::PermissionDenied
    ) || e.raw_os_error() == Some(libc::EPROTO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback() -> Config {
        Config {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..Config::default()
        }
    }

    fn slot(index: usize) -> SlotId {
        SlotId::new(index).unwrap()
    }

    #[test]
    fn test_client_side_accept_errors() {
        assert!(is_client_side(&io::Error::from_raw_os_error(libc::EPROTO)));
        assert!(is_client_side(&io::Error::from_raw_os_error(libc::ECONNABORTED)));
        assert!(is_client_side(&io::Error::from_raw_os_error(libc::EPERM)));
        assert!(!is_client_side(&io::Error::from_raw_os_error(libc::EMFILE)));
        assert!(!is_client_side(&io::Error::from(io::ErrorKind::WouldBlock)));
    }

    #[test]
    fn test_accept_without_client() {
        let mut session = Session::bind(&loopback()).unwrap();
        assert!(!session.accept(slot(0)).unwrap());
        assert!(!session.slot(slot(0)).is_connected());
    }

    #[test]
    fn test_accept_queued_client() {
        let mut session = Session::bind(&loopback()).unwrap();
        let _client = TcpStream::connect(session.local_addr().unwrap()).unwrap();
        assert!(session.accept(slot(2)).unwrap());
        assert!(session.slot(slot(2)).is_connected());
        assert!(session.accept(slot(2)).is_err());
    }

    #[test]
    fn test_open_is_idempotent_for_listener() {
        let mut manager = SessionManager::new(loopback());
        let addr = manager.open(slot(0)).unwrap().local_addr().unwrap();
        let again = manager.open(slot(1)).unwrap().local_addr().unwrap();
        assert_eq!(addr, again);
    }

    #[test]
    fn test_open_busy_slot_fails() {
        let mut manager = SessionManager::new(loopback());
        let session = manager.open(slot(0)).unwrap();
        let _client = TcpStream::connect(session.local_addr().unwrap()).unwrap();
        assert!(session.accept(slot(1)).unwrap());

        assert!(matches!(manager.open(slot(1)), Err(IfdError::SlotBusy(_))));
        assert!(manager.is_open());
        assert!(manager.session().unwrap().slot(slot(1)).is_connected());
    }

    #[test]
    fn test_close_non_master_keeps_session() {
        let mut manager = SessionManager::new(loopback());
        let session = manager.open(slot(0)).unwrap();
        let _client = TcpStream::connect(session.local_addr().unwrap()).unwrap();
        assert!(session.accept(slot(3)).unwrap());

        manager.close(slot(3));
        assert!(manager.is_open());
        assert!(!manager.session().unwrap().slot(slot(3)).is_connected());
    }

    #[test]
    fn test_close_master_tears_down() {
        let mut manager = SessionManager::new(loopback());
        let session = manager.open(slot(0)).unwrap();
        let _client = TcpStream::connect(session.local_addr().unwrap()).unwrap();
        assert!(session.accept(slot(5)).unwrap());

        manager.close(SlotId::MASTER);
        assert!(!manager.is_open());
        // Closing again is harmless
        manager.close(SlotId::MASTER);
        manager.close(slot(5));
    }
}
