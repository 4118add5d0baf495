//! Enumeration of depth-sensing cameras.
//!
//! The enumeration surface is a capability interface ([`Backend`] / [`Device`]): [`usb`]
//! implements it by probing USB video-class descriptors and control requests, [`mock`]
//! implements it in memory for tests. [`report`] turns either into the aligned text listing
//! printed by the `dsense-enumerate` binary.

#[macro_use]
mod util;
pub mod device;
mod error;
pub mod mock;
pub mod option;
mod probe;
pub mod report;
pub mod stream;
mod topo;
pub mod usb;

pub use device::{Backend, Device, Info, Subdevice};
pub use error::{Call, Error};
pub use option::{Opt, OptRange};
pub use stream::{Format, Stream, StreamProfile};

pub type Result<T> = std::result::Result<T, Error>;

/// Queries the depth cameras currently connected over USB.
pub fn list() -> Result<Vec<usb::UsbDevice>> {
    usb::UsbBackend::new()?.query_devices()
}
