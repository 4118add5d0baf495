//! Text report rendering.
//!
//! Turns the answers of a [`Backend`] into the aligned listing printed by the
//! `dsense-enumerate` binary. Writing into a generic [`io::Write`] keeps the output
//! observable by tests.

use std::io::Write;

use crate::{
    device::{Backend, Device, Info, Subdevice},
    error::{Call, ResultExt},
    option::Opt,
    Result,
};

/// Output selection for [`render`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// One summary line per device instead of the full listing.
    pub compact: bool,
    /// Include the option table of each subdevice.
    pub show_options: bool,
    /// Include the stream mode table of each subdevice.
    pub show_modes: bool,
}

/// Queries `backend` for the connected devices and writes the report.
///
/// An empty device list is not an error; a notice is printed and the run succeeds. Any error
/// reported by the backend aborts the report immediately.
pub fn render<W: Write, B: Backend>(out: &mut W, backend: &B, opts: ReportOptions) -> Result<()> {
    let devices = backend.query_devices()?;
    if devices.is_empty() {
        writeln!(out, "No device detected. Is it plugged in?").calling(Call::WriteReport)?;
        return Ok(());
    }

    if opts.compact {
        writeln!(
            out,
            "{:<30}{:<20}{:<20}",
            "Device Name", "Serial Number", "Firmware Version"
        )
        .calling(Call::WriteReport)?;

        for dev in &devices {
            writeln!(
                out,
                "{:<30}{:<20}{:<20}",
                dev.info(Info::Name)?,
                dev.info(Info::SerialNumber)?,
                dev.info(Info::FirmwareVersion)?
            )
            .calling(Call::WriteReport)?;
        }
        return Ok(());
    }

    for dev in &devices {
        writeln!(out, " Camera info: ").calling(Call::WriteReport)?;
        for field in Info::ALL {
            if dev.supports_info(field) {
                writeln!(out, "    {:<20}: \t{}", field, dev.info(field)?)
                    .calling(Call::WriteReport)?;
            }
        }
        writeln!(out).calling(Call::WriteReport)?;

        for sub in Subdevice::ALL {
            if !dev.supports_subdevice(sub) {
                continue;
            }
            writeln!(out, " Subdevice {}", sub).calling(Call::WriteReport)?;

            if opts.show_options {
                render_options(out, dev, sub)?;
            }
            if opts.show_modes {
                render_modes(out, dev, sub)?;
            }
        }

        writeln!(out).calling(Call::WriteReport)?;
    }

    Ok(())
}

fn render_options<W: Write, D: Device>(out: &mut W, dev: &D, sub: Subdevice) -> Result<()> {
    writeln!(
        out,
        "{:>55}{:>10}{:>10}{:>6}{:>10}",
        " Supported options:", "min", " max", " step", " default"
    )
    .calling(Call::WriteReport)?;

    for opt in Opt::ALL {
        if dev.supports_option(sub, opt) {
            let range = dev.option_range(sub, opt)?;
            writeln!(
                out,
                "    {:<50} : {:<5}... {:<12}{:<6}{:<10}",
                opt, range.min, range.max, range.step, range.def
            )
            .calling(Call::WriteReport)?;
        }
    }

    writeln!(out).calling(Call::WriteReport)?;
    Ok(())
}

fn render_modes<W: Write, D: Device>(out: &mut W, dev: &D, sub: Subdevice) -> Result<()> {
    writeln!(
        out,
        "{:>55}{:>10}{:>10}{:>6}{:>10}",
        " Supported modes:", "stream", " resolution", " fps", " format"
    )
    .calling(Call::WriteReport)?;

    for profile in dev.stream_profiles(sub)? {
        writeln!(
            out,
            "    {}\t  {}\tx {}\t@ {}Hz\t{}",
            profile.stream, profile.width, profile.height, profile.fps, profile.format
        )
        .calling(Call::WriteReport)?;
    }

    writeln!(out).calling(Call::WriteReport)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        mock::{MockBackend, MockDevice},
        option::OptRange,
        stream::{Format, Stream, StreamProfile},
    };

    fn render_to_string<B: Backend>(backend: &B, opts: ReportOptions) -> String {
        let mut buf = Vec::new();
        render(&mut buf, backend, opts).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn sr300() -> MockDevice {
        MockDevice::new("Intel RealSense SR300", "0123456789", "3.10.10")
            .with_option(
                Subdevice::Color,
                Opt::Brightness,
                OptRange {
                    min: -64.0,
                    max: 64.0,
                    step: 1.0,
                    def: 0.0,
                },
            )
            .with_profile(
                Subdevice::Depth,
                StreamProfile {
                    stream: Stream::Depth,
                    width: 640,
                    height: 480,
                    fps: 30,
                    format: Format::Z16,
                },
            )
    }

    #[test]
    fn empty_list_prints_notice_for_all_flag_combinations() {
        let backend = MockBackend::new();
        for compact in [false, true] {
            for show_options in [false, true] {
                for show_modes in [false, true] {
                    let opts = ReportOptions {
                        compact,
                        show_options,
                        show_modes,
                    };
                    assert_eq!(
                        render_to_string(&backend, opts),
                        "No device detected. Is it plugged in?\n"
                    );
                }
            }
        }
    }

    #[test]
    fn compact_mode_prints_aligned_columns() {
        let backend = MockBackend::new()
            .device(MockDevice::new("F200", "1234", "1.0"))
            .device(MockDevice::new("Intel RealSense SR300", "0123456789", "3.10.10"));
        let out = render_to_string(
            &backend,
            ReportOptions {
                compact: true,
                ..Default::default()
            },
        );

        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Device Name                   Serial Number       Firmware Version    "
        );
        assert_eq!(
            lines[1],
            "F200                          1234                1.0                 "
        );
        assert_eq!(
            lines[2],
            "Intel RealSense SR300         0123456789          3.10.10             "
        );
    }

    #[test]
    fn compact_mode_ignores_option_and_mode_flags() {
        let backend = MockBackend::new().device(sr300());
        let plain = render_to_string(
            &backend,
            ReportOptions {
                compact: true,
                ..Default::default()
            },
        );
        let with_flags = render_to_string(
            &backend,
            ReportOptions {
                compact: true,
                show_options: true,
                show_modes: true,
            },
        );
        assert_eq!(plain, with_flags);
    }

    #[test]
    fn full_mode_lists_supported_info_fields() {
        let backend = MockBackend::new().device(sr300());
        let out = render_to_string(&backend, ReportOptions::default());

        assert!(out.starts_with(" Camera info: \n"));
        assert!(out.contains("    name                : \tIntel RealSense SR300\n"));
        assert!(out.contains("    serial_number       : \t0123456789\n"));
        assert!(out.contains("    firmware_version    : \t3.10.10\n"));
        // Fields the device does not report are omitted.
        assert!(!out.contains("physical_port"));
        assert!(!out.contains("product_id"));
    }

    #[test]
    fn full_mode_lists_only_supported_subdevices() {
        let backend = MockBackend::new().device(sr300());
        let out = render_to_string(&backend, ReportOptions::default());

        assert!(out.contains(" Subdevice depth\n"));
        assert!(out.contains(" Subdevice color\n"));
        assert!(!out.contains(" Subdevice infrared"));
        assert!(!out.contains(" Subdevice fisheye"));
        // Neither flag is set, so neither table appears.
        assert!(!out.contains("Supported options:"));
        assert!(!out.contains("Supported modes:"));
    }

    #[test]
    fn option_table_lists_exactly_the_supported_options() {
        let backend = MockBackend::new().device(sr300());
        let out = render_to_string(
            &backend,
            ReportOptions {
                show_options: true,
                ..Default::default()
            },
        );

        assert!(out.contains(
            "                                     Supported options:       min       max  step   default\n"
        ));
        assert!(out.contains(
            "    brightness                                         : -64  ... 64          1     0         \n"
        ));
        // Options the device does not support never show up.
        assert!(!out.contains("gain"));
        assert!(!out.contains("laser_power"));
        assert!(!out.contains("Supported modes:"));
    }

    #[test]
    fn mode_table_matches_profiles_verbatim() {
        let backend = MockBackend::new().device(sr300());
        let out = render_to_string(
            &backend,
            ReportOptions {
                show_modes: true,
                ..Default::default()
            },
        );

        assert!(out.contains(
            "                                       Supported modes:    stream resolution   fps    format\n"
        ));
        assert!(out.contains("    depth\t  640\tx 480\t@ 30Hz\tZ16\n"));
        assert!(!out.contains("Supported options:"));
    }

    struct FailingBackend;

    impl Backend for FailingBackend {
        type Device = MockDevice;

        fn query_devices(&self) -> Result<Vec<MockDevice>> {
            Err(Error::new(Call::QueryDevices, "simulated backend failure"))
        }
    }

    #[test]
    fn backend_errors_abort_the_report() {
        let mut buf = Vec::new();
        let err = render(&mut buf, &FailingBackend, ReportOptions::default()).unwrap_err();
        assert!(err.to_string().contains("query_devices()"));
        assert!(buf.is_empty());
    }

    #[test]
    fn info_read_errors_propagate_with_the_failing_call() {
        // Scripted without a serial number, which compact mode reads unconditionally.
        let device = MockDevice::default().with_info(Info::Name, "Cam").with_info(
            Info::FirmwareVersion,
            "1.0",
        );
        let backend = MockBackend::new().device(device);

        let mut buf = Vec::new();
        let err = render(
            &mut buf,
            &backend,
            ReportOptions {
                compact: true,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("device_info(serial_number)"));
    }
}
