use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::options::{Parity, SerialOptions};
use crate::traits::SerialStream;

/// Serial port opener backed by termios.
pub struct SerialPort;

impl SerialPort {
    /// Open the device in `opts.port_name` and apply the line settings.
    ///
    /// The device is opened without becoming the controlling terminal and
    /// switched to raw mode, so bytes arrive exactly as the decoder sends them.
    pub fn open(opts: &SerialOptions) -> Result<SerialStream> {
        opts.validate()?;
        let speed = baud_to_speed(opts.baud_rate)?;
        let path = opts.port_name.clone();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        configure(file.as_raw_fd(), opts, speed).map_err(|source| TransportError::Configure {
            path: path.clone(),
            source,
        })?;

        info!(?path, baud_rate = opts.baud_rate, "opened serial port");

        Ok(SerialStream::from_file(file, path))
    }

    /// Transport name for diagnostics.
    pub fn transport_name() -> &'static str {
        "serial"
    }
}

fn configure(fd: RawFd, opts: &SerialOptions, speed: libc::speed_t) -> io::Result<()> {
    // SAFETY: `termios` is a plain C struct for which all-zero bytes is a valid value;
    // it is fully overwritten by `tcgetattr` below before any field is read.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by the caller and `tio` is a valid,
    // writable `termios`.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `tio` is a valid, initialized `termios`.
    unsafe { libc::cfmakeraw(&mut tio) };

    tio.c_cflag &= !(libc::CSIZE | libc::CSTOPB | libc::PARENB | libc::PARODD);
    tio.c_cflag |= libc::CREAD | libc::CLOCAL | char_size(opts.data_bits);
    if opts.stop_bits == 2 {
        tio.c_cflag |= libc::CSTOPB;
    }
    match opts.parity {
        Parity::None => {}
        Parity::Odd => tio.c_cflag |= libc::PARENB | libc::PARODD,
        Parity::Even => tio.c_cflag |= libc::PARENB,
    }

    tio.c_cc[libc::VMIN] = opts.minimum_read_size;
    tio.c_cc[libc::VTIME] = opts.vtime();

    // SAFETY: `tio` is a valid, initialized `termios` and `speed` comes from the
    // platform's own `B*` constants.
    let rc = unsafe {
        libc::cfsetispeed(&mut tio, speed) | libc::cfsetospeed(&mut tio, speed)
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `fd` is open and `tio` is a valid `termios` for it.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(io::Error::last_os_error());
    }

    debug!(
        vmin = opts.minimum_read_size,
        vtime = opts.vtime(),
        "applied termios settings"
    );
    Ok(())
}

fn char_size(data_bits: u8) -> libc::tcflag_t {
    match data_bits {
        5 => libc::CS5,
        6 => libc::CS6,
        7 => libc::CS7,
        _ => libc::CS8,
    }
}

fn baud_to_speed(baud_rate: u32) -> Result<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}
