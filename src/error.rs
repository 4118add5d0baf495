use std::{fmt, io};

use crate::{
    device::{Info, Subdevice},
    option::Opt,
};

pub struct Error {
    call: Option<Call>,
    kind: ErrorKind,
}

impl Error {
    /// Creates an error reported by a backend implementation.
    pub fn new(call: Call, message: impl Into<String>) -> Self {
        Self {
            call: Some(call),
            kind: ErrorKind::Other(message.into().into()),
        }
    }

    pub(crate) fn with_call(kind: impl Into<ErrorKind>, call: Call) -> Self {
        Self {
            call: Some(call),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(call) = &self.call {
            write!(f, "error calling {}: ", call)?;
        }

        match &self.kind {
            ErrorKind::Usb(e) => write!(f, "{}", e),
            ErrorKind::Io(e) => write!(f, "{}", e),
            ErrorKind::Other(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Usb(rusb::Error),
    Io(io::Error),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ErrorKind {
    fn from(v: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(v)
    }
}

impl From<String> for ErrorKind {
    fn from(s: String) -> Self {
        Self::Other(s.into())
    }
}

impl From<&'_ str> for ErrorKind {
    fn from(s: &str) -> Self {
        Self::Other(s.into())
    }
}

impl From<rusb::Error> for ErrorKind {
    fn from(e: rusb::Error) -> Self {
        Self::Usb(e)
    }
}

impl From<io::Error> for ErrorKind {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Identifies the enumeration call a failure surfaced from, including its arguments.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum Call {
    QueryDevices,
    OpenDevice,
    AccessDescriptors,
    DeviceInfo(Info),
    OptionRange(Subdevice, Opt),
    StreamProfiles(Subdevice),
    WriteReport,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::QueryDevices => write!(f, "query_devices()"),
            Call::OpenDevice => write!(f, "open_device()"),
            Call::AccessDescriptors => write!(f, "access_descriptors()"),
            Call::DeviceInfo(field) => write!(f, "device_info({})", field),
            Call::OptionRange(sub, opt) => write!(f, "option_range({}, {})", sub, opt),
            Call::StreamProfiles(sub) => write!(f, "stream_profiles({})", sub),
            Call::WriteReport => write!(f, "write_report()"),
        }
    }
}

pub(crate) trait ResultExt<T, E> {
    fn calling(self, call: Call) -> Result<T, Error>;
}

impl<T, E: Into<ErrorKind>> ResultExt<T, E> for Result<T, E> {
    fn calling(self, call: Call) -> Result<T, Error> {
        self.map_err(|e| Error::with_call(e, call))
    }
}

pub(crate) fn err<T>(err: impl Into<ErrorKind>, call: Call) -> Result<T, Error> {
    Err(Error::with_call(err, call))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_failed_call_and_arguments() {
        let e = Error::new(
            Call::OptionRange(Subdevice::Depth, Opt::Brightness),
            "control request rejected",
        );
        assert_eq!(
            e.to_string(),
            "error calling option_range(depth, brightness): control request rejected"
        );
    }

    #[test]
    fn display_names_info_field() {
        let e = Error::new(Call::DeviceInfo(Info::SerialNumber), "no such field");
        assert_eq!(
            e.to_string(),
            "error calling device_info(serial_number): no such field"
        );
    }
}
