//! IFD Handler for the swICC simulated smart card
//!
//! This is a PC/SC IFD (Interface Device) handler for pcscd. Instead of
//! driving hardware it listens on a TCP port and lets a swICC card simulator
//! connect to each slot. Card resets, presence checks and T=0 command
//! transfers are forwarded to the simulator as framed messages.
//!
//! The reader supports:
//! - up to 64 slots, one simulator connection each
//! - T=0 only, no PPS negotiation
//! - cold reset with ATR caching

// Allow raw pointer dereference in extern "C" functions - required for PC/SC IFD API
#![allow(clippy::not_unsafe_ptr_arg_deref)]
// Allow uppercase acronyms for Windows API type names (DWORD, LPSTR, etc.)
#![allow(clippy::upper_case_acronyms)]

pub mod apdu;
pub mod card;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod net;
pub mod power;
pub mod presence;
pub mod session;
pub mod transfer;

use log::{debug, error};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::ffi::{c_char, c_uchar, c_ulong, CStr};
use std::slice;

use config::Config;
use error::IfdError;
use handler::{Handler, ResponseCode, SCARD_PROTOCOL_T0};
use presence::Presence;

// PC/SC lite types
type DWORD = c_ulong;
type PDWORD = *mut DWORD;
type PUCHAR = *mut c_uchar;
type LPSTR = *const c_char;
type RESPONSECODE = c_ulong;
type UCHAR = c_uchar;

// SCARD_IO_HEADER structure
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SCARD_IO_HEADER {
    pub protocol: DWORD,
    pub length: DWORD,
}

// Global state
static HANDLER: OnceCell<Mutex<Handler>> = OnceCell::new();

fn get_handler() -> &'static Mutex<Handler> {
    HANDLER.get_or_init(|| {
        let config = Config::from_env();
        logging::init(config.log_level);
        debug!("Driver configuration: {:?}", config);
        Mutex::new(Handler::new(config))
    })
}

fn respond(entry: &str, result: Result<(), IfdError>) -> RESPONSECODE {
    let code = match result {
        Ok(()) => ResponseCode::Success,
        Err(e) => {
            error!("{}: {}", entry, e);
            e.response_code()
        }
    };
    RESPONSECODE::from(code.code())
}

/// Borrow a host input buffer; a null pointer reads as empty
unsafe fn input<'a>(data: *const c_uchar, len: DWORD) -> &'a [u8] {
    if data.is_null() || len == 0 {
        &[]
    } else {
        slice::from_raw_parts(data, len as usize)
    }
}

/// Borrow a host output buffer; a null pointer has no room at all
unsafe fn output<'a>(data: PUCHAR, len: DWORD) -> &'a mut [u8] {
    if data.is_null() || len == 0 {
        &mut []
    } else {
        slice::from_raw_parts_mut(data, len as usize)
    }
}

// ============================================================================
// IFD Handler API Implementation
// ============================================================================

/// Create a communication channel to the reader
#[no_mangle]
pub extern "C" fn IFDHCreateChannelByName(lun: DWORD, device_name: LPSTR) -> RESPONSECODE {
    let name = if device_name.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(device_name) }
            .to_string_lossy()
            .to_string()
    };
    debug!("IFDHCreateChannelByName: LUN=0x{:04X}, device={}", lun, name);

    let result = get_handler()
        .lock()
        .create_channel_by_name(u64::from(lun), &name);
    respond("IFDHCreateChannelByName", result)
}

/// Create a communication channel (legacy)
#[no_mangle]
pub extern "C" fn IFDHCreateChannel(lun: DWORD, channel: DWORD) -> RESPONSECODE {
    debug!("IFDHCreateChannel: LUN=0x{:04X}, channel={}", lun, channel);
    let result = get_handler()
        .lock()
        .create_channel(u64::from(lun), u64::from(channel));
    respond("IFDHCreateChannel", result)
}

/// Close the communication channel
#[no_mangle]
pub extern "C" fn IFDHCloseChannel(lun: DWORD) -> RESPONSECODE {
    debug!("IFDHCloseChannel: LUN=0x{:04X}", lun);
    let result = get_handler().lock().close_channel(u64::from(lun));
    respond("IFDHCloseChannel", result)
}

/// Get reader capabilities
#[no_mangle]
pub extern "C" fn IFDHGetCapabilities(
    lun: DWORD,
    tag: DWORD,
    length: PDWORD,
    value: PUCHAR,
) -> RESPONSECODE {
    debug!("IFDHGetCapabilities: LUN=0x{:04X}, tag=0x{:04X}", lun, tag);

    if length.is_null() {
        return respond("IFDHGetCapabilities", Err(IfdError::NullPointer("length")));
    }

    let out = unsafe { output(value, *length) };
    let result = get_handler()
        .lock()
        .get_capabilities(u64::from(lun), u64::from(tag), out)
        .map(|written| unsafe { *length = written as DWORD });
    respond("IFDHGetCapabilities", result)
}

/// Set reader capabilities
#[no_mangle]
pub extern "C" fn IFDHSetCapabilities(
    lun: DWORD,
    tag: DWORD,
    length: DWORD,
    value: PUCHAR,
) -> RESPONSECODE {
    debug!("IFDHSetCapabilities: LUN=0x{:04X}, tag=0x{:04X}", lun, tag);
    let value = unsafe { input(value, length) };
    let result = get_handler()
        .lock()
        .set_capabilities(u64::from(lun), u64::from(tag), value);
    respond("IFDHSetCapabilities", result)
}

/// Set protocol parameters
#[no_mangle]
pub extern "C" fn IFDHSetProtocolParameters(
    lun: DWORD,
    protocol: DWORD,
    flags: UCHAR,
    pts1: UCHAR,
    pts2: UCHAR,
    pts3: UCHAR,
) -> RESPONSECODE {
    debug!(
        "IFDHSetProtocolParameters: LUN=0x{:04X}, protocol={}",
        lun, protocol
    );
    let result = get_handler().lock().set_protocol_parameters(
        u64::from(lun),
        u64::from(protocol),
        flags,
        [pts1, pts2, pts3],
    );
    respond("IFDHSetProtocolParameters", result)
}

/// Power the ICC (Integrated Circuit Card)
#[no_mangle]
pub extern "C" fn IFDHPowerICC(
    lun: DWORD,
    action: DWORD,
    atr: PUCHAR,
    atr_length: PDWORD,
) -> RESPONSECODE {
    debug!("IFDHPowerICC: LUN=0x{:04X}, action={}", lun, action);

    let capacity = if atr_length.is_null() { 0 } else { unsafe { *atr_length } };
    let out = unsafe { output(atr, capacity) };
    let result = get_handler()
        .lock()
        .power_icc(u64::from(lun), u64::from(action), out)
        .map(|written| {
            if !atr_length.is_null() {
                unsafe { *atr_length = written as DWORD };
            }
        });
    respond("IFDHPowerICC", result)
}

/// Transmit data to the ICC
#[no_mangle]
pub extern "C" fn IFDHTransmitToICC(
    lun: DWORD,
    send_pci: SCARD_IO_HEADER,
    tx_buffer: PUCHAR,
    tx_length: DWORD,
    rx_buffer: PUCHAR,
    rx_length: PDWORD,
    recv_pci: *mut SCARD_IO_HEADER,
) -> RESPONSECODE {
    debug!(
        "IFDHTransmitToICC: LUN=0x{:04X}, protocol={}, tx_len={}",
        lun, send_pci.protocol, tx_length
    );

    if tx_buffer.is_null() || rx_buffer.is_null() || rx_length.is_null() {
        return respond("IFDHTransmitToICC", Err(IfdError::NullPointer("buffer")));
    }

    let tx = unsafe { input(tx_buffer, tx_length) };
    let rx = unsafe { output(rx_buffer, *rx_length) };
    let result = get_handler()
        .lock()
        .transmit_to_icc(u64::from(lun), u64::from(send_pci.protocol), tx, rx);

    let written = result.as_ref().map_or(0, |n| *n);
    unsafe {
        *rx_length = written as DWORD;
        if !recv_pci.is_null() {
            (*recv_pci).protocol = SCARD_PROTOCOL_T0 as DWORD;
        }
    }
    respond("IFDHTransmitToICC", result.map(|_| ()))
}

/// Check if ICC is present
#[no_mangle]
pub extern "C" fn IFDHICCPresence(lun: DWORD) -> RESPONSECODE {
    let code = match get_handler().lock().icc_presence(u64::from(lun)) {
        Ok(Presence::Present) => ResponseCode::IccPresent,
        Ok(Presence::Absent) => ResponseCode::IccNotPresent,
        Err(e) => {
            error!("IFDHICCPresence: {}", e);
            e.response_code()
        }
    };
    RESPONSECODE::from(code.code())
}

/// Control the reader
#[no_mangle]
pub extern "C" fn IFDHControl(
    lun: DWORD,
    control_code: DWORD,
    _tx_buffer: PUCHAR,
    _tx_length: DWORD,
    _rx_buffer: PUCHAR,
    _rx_length: DWORD,
    bytes_returned: PDWORD,
) -> RESPONSECODE {
    debug!("IFDHControl: LUN=0x{:04X}, code=0x{:08X}", lun, control_code);
    if !bytes_returned.is_null() {
        unsafe { *bytes_returned = 0 };
    }
    let result = get_handler()
        .lock()
        .control(u64::from(lun), u64::from(control_code))
        .map(|_| ());
    respond("IFDHControl", result)
}
