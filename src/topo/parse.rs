use std::{io, time::Duration};

use byteorder::{ReadBytesExt, LE};
use rusb::InterfaceDescriptor;

use crate::{
    error::{Call, ResultExt},
    stream::Format,
    util::{io_err_res, split_descriptors, BytesExt},
    Result,
};

use super::*;

/// The value of `bDescriptorType` of all descriptors we're interested in.
const VIDEO_INTERFACE_DESC_TYPE: u8 = 36;

const CONTROL_DESC_SUBTYPE_HEADER: u8 = 0x01;
const CONTROL_DESC_SUBTYPE_INPUT_TERM: u8 = 0x02;
const CONTROL_DESC_SUBTYPE_OUTPUT_TERMINAL: u8 = 0x03;
const CONTROL_DESC_SUBTYPE_SELECTOR_UNIT: u8 = 0x04;
const CONTROL_DESC_SUBTYPE_PROCESSING_UNIT: u8 = 0x05;
const CONTROL_DESC_SUBTYPE_EXTENSION_UNIT: u8 = 0x06;

const STREAM_DESC_SUBTYPE_INPUT_HEADER: u8 = 0x01;
const STREAM_DESC_SUBTYPE_FORMAT_UNCOMPRESSED: u8 = 0x04;
const STREAM_DESC_SUBTYPE_FRAME_UNCOMPRESSED: u8 = 0x05;
const STREAM_DESC_SUBTYPE_FORMAT_FRAME_BASED: u8 = 0x10;
const STREAM_DESC_SUBTYPE_FRAME_FRAME_BASED: u8 = 0x11;

const INPUT_TERMINAL_TYPE_CAMERA: u16 = 0x0201;

pub(crate) fn parse_control_desc(desc: &InterfaceDescriptor<'_>) -> Result<Topology> {
    let mut parser = ControlDescParser {
        units: Vec::new(),
        inputs: Vec::new(),
        outputs: Vec::new(),
    };
    for (ty, data) in split_descriptors(desc.extra()) {
        if ty == VIDEO_INTERFACE_DESC_TYPE {
            parser
                .parse_descriptor(&data[2..])
                .calling(Call::AccessDescriptors)?;
        } else {
            log::debug!("skipping descriptor of type {}", ty);
        }
    }

    Ok(Topology {
        units: parser.units,
        inputs: parser.inputs,
        outputs: parser.outputs,
    })
}

struct ControlDescParser {
    units: Vec<UnitDesc>,
    inputs: Vec<InputTerminalDesc>,
    outputs: Vec<OutputTerminalDesc>,
}

impl ControlDescParser {
    fn parse_descriptor(&mut self, raw: &[u8]) -> io::Result<()> {
        match self.parse_descriptor_impl(raw) {
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::warn!("control descriptor too short, padding with zero bytes");
                log::debug!("descriptor data: {:02x?}", raw);

                let mut buf = vec![0; raw.len() + 100];
                buf[..raw.len()].copy_from_slice(raw);

                self.parse_descriptor_impl(&buf)
            }
            res => res,
        }
    }

    fn parse_descriptor_impl(&mut self, mut raw: &[u8]) -> io::Result<()> {
        let subtype = raw.read_u8()?;
        match subtype {
            CONTROL_DESC_SUBTYPE_HEADER => {
                // Version, total length, clock and the streaming interface list; none of it is
                // needed to answer capability queries.
                Ok(())
            }
            CONTROL_DESC_SUBTYPE_INPUT_TERM => {
                let id = raw.read_u8()?;
                let term_type = raw.read_u16::<LE>()?;
                let _assoc = raw.read_u8()?;
                let _string = raw.read_u8()?;

                let kind = if term_type == INPUT_TERMINAL_TYPE_CAMERA {
                    let _objective_focal_length_min = raw.read_u16::<LE>()?;
                    let _objective_focal_length_max = raw.read_u16::<LE>()?;
                    let _ocular_focal_length = raw.read_u16::<LE>()?;
                    InputTerminalKind::Camera(CameraTerminalDesc {
                        id,
                        controls: CameraControls::from_bits_truncate(
                            raw.read_length_prefixed_bitmask()?,
                        ),
                    })
                } else {
                    InputTerminalKind::Other
                };

                self.inputs.push(InputTerminalDesc { id, kind });
                Ok(())
            }
            CONTROL_DESC_SUBTYPE_OUTPUT_TERMINAL => {
                let id = raw.read_u8()?;
                let _term_type = raw.read_u16::<LE>()?;
                let _assoc = raw.read_u8()?;
                let source = raw.read_u8()?;

                self.outputs.push(OutputTerminalDesc { id, source });
                Ok(())
            }
            CONTROL_DESC_SUBTYPE_SELECTOR_UNIT => {
                let id = raw.read_u8()?;
                let inputs = {
                    let num = raw.read_u8()?;
                    (0..num)
                        .map(|_| raw.read_u8())
                        .collect::<io::Result<Vec<_>>>()?
                };

                self.units
                    .push(UnitDesc::Selector(SelectorUnitDesc { id, inputs }));
                Ok(())
            }
            CONTROL_DESC_SUBTYPE_PROCESSING_UNIT => {
                // Some firmware ships this descriptor one byte short of its declared layout;
                // the zero-padding fallback in `parse_descriptor` handles that.
                let id = raw.read_u8()?;
                let source = raw.read_u8()?;
                let _max_multiplier = raw.read_u16::<LE>()?;
                let controls =
                    ProcessingUnitControls::from_bits_truncate(raw.read_length_prefixed_bitmask()?);

                self.units.push(UnitDesc::Processing(ProcessingUnitDesc {
                    id,
                    source,
                    controls,
                }));
                Ok(())
            }
            CONTROL_DESC_SUBTYPE_EXTENSION_UNIT => {
                let id = raw.read_u8()?;
                let code = raw.read_guid()?;
                let _num_controls = raw.read_u8()?;
                let inputs = {
                    let num = raw.read_u8()?;
                    (0..num)
                        .map(|_| raw.read_u8())
                        .collect::<io::Result<Vec<_>>>()?
                };
                log::debug!("extension unit {} ({})", id, code);

                self.units
                    .push(UnitDesc::Extension(ExtensionUnitDesc { id, inputs }));
                Ok(())
            }
            _ => {
                log::warn!("ignoring control descriptor of unknown subtype {}", subtype);
                Ok(())
            }
        }
    }
}

pub(crate) fn parse_streaming_desc(desc: &InterfaceDescriptor<'_>) -> Result<StreamingDesc> {
    let mut parser = StreamingDescParser {
        terminal_link: None,
        formats: Vec::new(),
    };

    for (ty, data) in split_descriptors(desc.extra()) {
        if ty == VIDEO_INTERFACE_DESC_TYPE {
            parser
                .parse_descriptor(&data[2..])
                .calling(Call::AccessDescriptors)?;
        } else {
            log::debug!("skipping descriptor of type {}", ty);
        }
    }

    let terminal_link = match parser.terminal_link {
        Some(link) => link,
        None => {
            return crate::error::err(
                "missing input header in video streaming interface",
                Call::AccessDescriptors,
            )
        }
    };

    Ok(StreamingDesc {
        interface_number: desc.interface_number(),
        terminal_link,
        formats: parser.formats,
    })
}

struct StreamingDescParser {
    terminal_link: Option<u8>,
    formats: Vec<FormatDesc>,
}

impl StreamingDescParser {
    fn parse_descriptor(&mut self, raw: &[u8]) -> io::Result<()> {
        match self.parse_descriptor_impl(raw) {
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::warn!("streaming descriptor too short, padding with zero bytes");
                log::debug!("descriptor data: {:02x?}", raw);

                let mut buf = vec![0; raw.len() + 100];
                buf[..raw.len()].copy_from_slice(raw);

                self.parse_descriptor_impl(&buf)
            }
            res => res,
        }
    }

    fn parse_descriptor_impl(&mut self, mut raw: &[u8]) -> io::Result<()> {
        let subtype = raw.read_u8()?;
        match subtype {
            STREAM_DESC_SUBTYPE_INPUT_HEADER => {
                if self.terminal_link.is_some() {
                    return io_err_res("duplicate input header descriptor");
                }

                let _num_formats = raw.read_u8()?;
                let _total_length = raw.read_u16::<LE>()?;
                let _endpoint_address = raw.read_u8()?;
                let _info = raw.read_u8()?;
                self.terminal_link = Some(raw.read_u8()?);
                Ok(())
            }
            STREAM_DESC_SUBTYPE_FORMAT_UNCOMPRESSED | STREAM_DESC_SUBTYPE_FORMAT_FRAME_BASED => {
                let _index = raw.read_u8()?;
                let _num_frame_descriptors = raw.read_u8()?;
                let guid = raw.read_guid()?;

                let format = Format::from_guid(&guid);
                if format.is_none() {
                    log::debug!("format GUID {} has no known pixel format", guid);
                }
                self.formats.push(FormatDesc {
                    format,
                    frames: Vec::new(),
                });
                Ok(())
            }
            STREAM_DESC_SUBTYPE_FRAME_UNCOMPRESSED => {
                let _index = raw.read_u8()?;
                let _capabilities = raw.read_u8()?;
                let width = raw.read_u16::<LE>()?;
                let height = raw.read_u16::<LE>()?;
                let _min_bit_rate = raw.read_u32::<LE>()?;
                let _max_bit_rate = raw.read_u32::<LE>()?;
                let _max_frame_buffer_size = raw.read_u32::<LE>()?;
                let _default_interval = raw.read_time_100ns()?;
                let intervals = Self::parse_intervals(&mut raw)?;

                self.push_frame(FrameDesc {
                    width,
                    height,
                    intervals,
                });
                Ok(())
            }
            STREAM_DESC_SUBTYPE_FRAME_FRAME_BASED => {
                // Same as the uncompressed layout except the frame buffer size is replaced by a
                // `dwBytesPerLine` field *after* the interval type.
                let _index = raw.read_u8()?;
                let _capabilities = raw.read_u8()?;
                let width = raw.read_u16::<LE>()?;
                let height = raw.read_u16::<LE>()?;
                let _min_bit_rate = raw.read_u32::<LE>()?;
                let _max_bit_rate = raw.read_u32::<LE>()?;
                let _default_interval = raw.read_time_100ns()?;
                let interval_type = raw.read_u8()?;
                let _bytes_per_line = raw.read_u32::<LE>()?;
                let intervals = Self::parse_intervals_of_type(&mut raw, interval_type)?;

                self.push_frame(FrameDesc {
                    width,
                    height,
                    intervals,
                });
                Ok(())
            }
            _ => {
                log::debug!("ignoring streaming descriptor of subtype {}", subtype);
                Ok(())
            }
        }
    }

    fn parse_intervals(raw: &mut &[u8]) -> io::Result<Vec<Duration>> {
        let ty = raw.read_u8()?;
        Self::parse_intervals_of_type(raw, ty)
    }

    fn parse_intervals_of_type(raw: &mut &[u8], ty: u8) -> io::Result<Vec<Duration>> {
        match ty {
            0 => {
                // Continuous range; only its endpoints name concrete rates.
                let min = raw.read_time_100ns()?;
                let max = raw.read_time_100ns()?;
                let _step = raw.read_time_100ns()?;
                Ok(vec![min, max])
            }
            n => (0..n)
                .map(|_| raw.read_time_100ns())
                .collect::<io::Result<Vec<_>>>(),
        }
    }

    fn push_frame(&mut self, frame: FrameDesc) {
        match self.formats.last_mut() {
            Some(format) => format.frames.push(frame),
            None => log::warn!("frame descriptor appears before any format descriptor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YUY2_GUID: [u8; 16] = [
        0x59, 0x55, 0x59, 0x32, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B,
        0x71,
    ];
    const INVZ_GUID: [u8; 16] = [
        0x49, 0x4E, 0x56, 0x5A, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B,
        0x71,
    ];

    fn control_parser() -> ControlDescParser {
        ControlDescParser {
            units: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn streaming_parser() -> StreamingDescParser {
        StreamingDescParser {
            terminal_link: None,
            formats: Vec::new(),
        }
    }

    #[test]
    fn parses_processing_unit_controls() {
        let mut parser = control_parser();
        parser
            .parse_descriptor(&[0x05, 3, 2, 0x00, 0x00, 0x02, 0x5F, 0x01])
            .unwrap();

        match &parser.units[0] {
            UnitDesc::Processing(pu) => {
                assert_eq!(pu.id, 3);
                assert_eq!(pu.source, 2);
                assert!(pu.controls.contains(ProcessingUnitControls::BRIGHTNESS));
                assert!(pu
                    .controls
                    .contains(ProcessingUnitControls::BACKLIGHT_COMPENSATION));
                assert!(!pu.controls.contains(ProcessingUnitControls::GAIN));
            }
            other => panic!("expected processing unit, got {:?}", other),
        }
    }

    #[test]
    fn zero_pads_short_processing_unit() {
        let mut parser = control_parser();
        parser
            .parse_descriptor(&[0x05, 3, 2, 0x00, 0x00, 0x03, 0x5F])
            .unwrap();

        match &parser.units[0] {
            UnitDesc::Processing(pu) => {
                assert_eq!(pu.controls.bits(), 0x5F);
            }
            other => panic!("expected processing unit, got {:?}", other),
        }
    }

    #[test]
    fn parses_camera_terminal() {
        let mut parser = control_parser();
        parser
            .parse_descriptor(&[
                0x02, 1, 0x01, 0x02, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0x03, 0x0A, 0x00, 0x00,
            ])
            .unwrap();

        match &parser.inputs[0].kind {
            InputTerminalKind::Camera(cam) => {
                assert_eq!(cam.id, 1);
                assert!(cam.controls.contains(CameraControls::AUTO_EXPOSURE_MODE));
                assert!(cam.controls.contains(CameraControls::EXPOSURE_TIME_ABS));
                assert!(!cam.controls.contains(CameraControls::FOCUS_ABS));
            }
            other => panic!("expected camera terminal, got {:?}", other),
        }
    }

    #[test]
    fn non_camera_terminal_is_other() {
        let mut parser = control_parser();
        parser.parse_descriptor(&[0x02, 2, 0x01, 0x01, 0, 0]).unwrap();

        assert_eq!(parser.inputs[0].id, 2);
        assert!(matches!(parser.inputs[0].kind, InputTerminalKind::Other));
    }

    #[test]
    fn parses_output_terminal_and_selector() {
        let mut parser = control_parser();
        parser
            .parse_descriptor(&[0x03, 4, 0x01, 0x01, 0, 3, 0])
            .unwrap();
        parser.parse_descriptor(&[0x04, 2, 0x01, 1, 0]).unwrap();

        assert_eq!(parser.outputs[0].id, 4);
        assert_eq!(parser.outputs[0].source, 3);
        match &parser.units[0] {
            UnitDesc::Selector(sel) => {
                assert_eq!(sel.id, 2);
                assert_eq!(sel.inputs, vec![1]);
            }
            other => panic!("expected selector unit, got {:?}", other),
        }
    }

    #[test]
    fn parses_input_header_and_uncompressed_frames() {
        let mut parser = streaming_parser();
        parser
            .parse_descriptor(&[0x01, 1, 0x28, 0x00, 0x81, 0x00, 4])
            .unwrap();

        let mut format = vec![0x04, 1, 2];
        format.extend_from_slice(&YUY2_GUID);
        format.extend_from_slice(&[16, 1, 0, 0, 0, 0]);
        parser.parse_descriptor(&format).unwrap();

        let mut frame = vec![0x05, 1, 0, 0x80, 0x02, 0xE0, 0x01];
        frame.extend_from_slice(&0u32.to_le_bytes()); // min bit rate
        frame.extend_from_slice(&0u32.to_le_bytes()); // max bit rate
        frame.extend_from_slice(&0u32.to_le_bytes()); // max frame buffer size
        frame.extend_from_slice(&333_333u32.to_le_bytes()); // default interval
        frame.push(2); // two discrete intervals
        frame.extend_from_slice(&333_333u32.to_le_bytes());
        frame.extend_from_slice(&666_666u32.to_le_bytes());
        parser.parse_descriptor(&frame).unwrap();

        assert_eq!(parser.terminal_link, Some(4));
        assert_eq!(parser.formats.len(), 1);
        assert_eq!(parser.formats[0].format, Some(Format::Yuyv));
        let frame = &parser.formats[0].frames[0];
        assert_eq!((frame.width, frame.height), (640, 480));
        assert_eq!(
            frame.intervals,
            vec![
                Duration::from_nanos(333_333 * 100),
                Duration::from_nanos(666_666 * 100)
            ]
        );
    }

    #[test]
    fn parses_frame_based_format() {
        let mut parser = streaming_parser();

        let mut format = vec![0x10, 1, 1];
        format.extend_from_slice(&INVZ_GUID);
        format.extend_from_slice(&[16, 1, 0, 0, 0, 0, 0]);
        parser.parse_descriptor(&format).unwrap();

        let mut frame = vec![0x11, 1, 0, 0x80, 0x02, 0xE0, 0x01];
        frame.extend_from_slice(&0u32.to_le_bytes()); // min bit rate
        frame.extend_from_slice(&0u32.to_le_bytes()); // max bit rate
        frame.extend_from_slice(&166_666u32.to_le_bytes()); // default interval
        frame.push(1); // one discrete interval
        frame.extend_from_slice(&1280u32.to_le_bytes()); // bytes per line
        frame.extend_from_slice(&166_666u32.to_le_bytes());
        parser.parse_descriptor(&frame).unwrap();

        assert_eq!(parser.formats[0].format, Some(Format::Z16));
        let frame = &parser.formats[0].frames[0];
        assert_eq!((frame.width, frame.height), (640, 480));
        assert_eq!(frame.intervals, vec![Duration::from_nanos(166_666 * 100)]);
    }

    #[test]
    fn continuous_intervals_keep_endpoints() {
        let mut raw: &[u8] = &[
            0x15, 0x16, 0x05, 0x00, // min
            0x2A, 0x2C, 0x0A, 0x00, // max
            0x01, 0x00, 0x00, 0x00, // step
        ];
        let intervals = StreamingDescParser::parse_intervals_of_type(&mut raw, 0).unwrap();
        assert_eq!(
            intervals,
            vec![
                Duration::from_nanos(333_333 * 100),
                Duration::from_nanos(666_666 * 100)
            ]
        );
    }
}
