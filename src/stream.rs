//! Stream profiles: the concrete resolution / rate / format combinations a subdevice can
//! produce.

use std::fmt;

use uuid::Uuid;

/// The data stream a profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Stream {
    Depth,
    Color,
    Infrared,
    Infrared2,
    Fisheye,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Stream::Depth => "depth",
            Stream::Color => "color",
            Stream::Infrared => "infrared",
            Stream::Infrared2 => "infrared2",
            Stream::Fisheye => "fisheye",
        })
    }
}

/// A pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Format {
    Z16,
    Disparity16,
    Yuyv,
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    Y8,
    Y16,
    Raw8,
    Raw10,
}

impl Format {
    /// Maps a video-class format GUID to a pixel format.
    ///
    /// Video-class format GUIDs carry a FourCC in their first field; the depth formats reuse
    /// that convention with vendor codes.
    pub(crate) fn from_guid(guid: &Uuid) -> Option<Self> {
        let (fourcc, ..) = guid.as_fields();
        match &fourcc.to_le_bytes() {
            b"YUY2" => Some(Format::Yuyv),
            b"Z16 " | b"INVZ" => Some(Format::Z16),
            b"DISP" => Some(Format::Disparity16),
            b"Y8  " | b"GREY" | b"INVI" => Some(Format::Y8),
            b"Y16 " | b"INIR" => Some(Format::Y16),
            b"RW10" => Some(Format::Raw10),
            b"RAW8" | b"RW8 " => Some(Format::Raw8),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Format::Z16 => "Z16",
            Format::Disparity16 => "DISPARITY16",
            Format::Yuyv => "YUYV",
            Format::Rgb8 => "RGB8",
            Format::Bgr8 => "BGR8",
            Format::Rgba8 => "RGBA8",
            Format::Bgra8 => "BGRA8",
            Format::Y8 => "Y8",
            Format::Y16 => "Y16",
            Format::Raw8 => "RAW8",
            Format::Raw10 => "RAW10",
        })
    }
}

/// A concrete stream configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProfile {
    pub stream: Stream,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: Format,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guid(fourcc: &[u8; 4]) -> Uuid {
        Uuid::from_fields(
            u32::from_le_bytes(*fourcc),
            0x0000,
            0x0010,
            &[0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71],
        )
        .unwrap()
    }

    #[test]
    fn maps_known_fourccs() {
        assert_eq!(Format::from_guid(&guid(b"YUY2")), Some(Format::Yuyv));
        assert_eq!(Format::from_guid(&guid(b"INVZ")), Some(Format::Z16));
        assert_eq!(Format::from_guid(&guid(b"GREY")), Some(Format::Y8));
        assert_eq!(Format::from_guid(&guid(b"RW10")), Some(Format::Raw10));
    }

    #[test]
    fn rejects_unknown_fourccs() {
        assert_eq!(Format::from_guid(&guid(b"MJPG")), None);
    }
}
