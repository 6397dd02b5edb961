//! Card-side data cached by the reader

pub mod atr;

pub use atr::{Atr, AtrError, MAX_ATR_SIZE};
