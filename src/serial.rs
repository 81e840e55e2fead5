//! Byte channel and clock the protocol runs on, plus adapters for the
//! `embedded-hal-nb` and `embedded-io` serial traits.
//!
//! Port setup (baud rate, pins, driver lifecycle) belongs to whoever builds
//! the underlying peripheral.

use core::fmt;

use embedded_hal_nb::serial;
use heapless::Deque;

/// Received bytes staged by the adapters between polls
pub const RX_STAGING_SIZE: usize = 512;

/// Half-duplex byte channel to the motor controller.
pub trait SerialChannel {
    type Error: fmt::Debug;

    /// Queues `data` for transmission, returning how many bytes were taken.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Number of received bytes that can be read without blocking.
    fn available(&mut self) -> Result<usize, Self::Error>;

    /// Copies up to `buf.len()` already received bytes into `buf`.
    /// Never waits for more data to arrive.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Monotonic millisecond time source.
pub trait Clock {
    fn now_millis(&mut self) -> u64;

    /// Gives up the CPU for roughly `ms` milliseconds.
    fn pause(&mut self, ms: u32);
}

fn drain_into(staged: &mut Deque<u8, RX_STAGING_SIZE>, buf: &mut [u8]) -> usize {
    let mut n = 0;
    while n < buf.len() {
        match staged.pop_front() {
            Some(b) => {
                buf[n] = b;
                n += 1;
            }
            None => break,
        }
    }
    n
}

#[derive(Debug)]
pub enum NbSerialError<WriteError, ReadError> {
    Write(WriteError),
    Read(ReadError),
}

impl<Ew: fmt::Debug, Er: fmt::Debug> fmt::Display for NbSerialError<Ew, Er> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NbSerialError::Write(e) => write!(f, "serial write failed: {e:?}"),
            NbSerialError::Read(e) => write!(f, "serial read failed: {e:?}"),
        }
    }
}

/// Channel over a pair of word-at-a-time `embedded-hal-nb` serial halves.
#[derive(Debug)]
pub struct NbSerial<Tx: serial::Write, Rx: serial::Read> {
    tx: Tx,
    rx: Rx,
    staged: Deque<u8, RX_STAGING_SIZE>,
}

impl<Tx: serial::Write, Rx: serial::Read> NbSerial<Tx, Rx> {
    pub fn new(tx: Tx, rx: Rx) -> NbSerial<Tx, Rx> {
        NbSerial {
            tx,
            rx,
            staged: Deque::new(),
        }
    }

    pub fn split(self) -> (Tx, Rx) {
        (self.tx, self.rx)
    }

    /// Pull as much as we can from rx into the staging queue
    fn buffer(&mut self) -> Result<(), Rx::Error> {
        while !self.staged.is_full() {
            match self.rx.read() {
                Ok(c) => {
                    let _ = self.staged.push_back(c);
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<Tx: serial::Write, Rx: serial::Read> SerialChannel for NbSerial<Tx, Rx> {
    type Error = NbSerialError<Tx::Error, Rx::Error>;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        for b in data {
            nb::block!(self.tx.write(*b)).map_err(NbSerialError::Write)?;
        }
        nb::block!(self.tx.flush()).map_err(NbSerialError::Write)?;
        Ok(data.len())
    }

    fn available(&mut self) -> Result<usize, Self::Error> {
        self.buffer().map_err(NbSerialError::Read)?;
        Ok(self.staged.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.staged.len() < buf.len() {
            self.buffer().map_err(NbSerialError::Read)?;
        }
        Ok(drain_into(&mut self.staged, buf))
    }
}

/// Channel over a buffered `embedded-io` port.
#[derive(Debug)]
pub struct IoSerial<T> {
    port: T,
    staged: Deque<u8, RX_STAGING_SIZE>,
}

impl<T> IoSerial<T>
where
    T: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write,
{
    pub fn new(port: T) -> IoSerial<T> {
        IoSerial {
            port,
            staged: Deque::new(),
        }
    }

    pub fn into_inner(self) -> T {
        self.port
    }

    fn buffer(&mut self) -> Result<(), T::Error> {
        let mut chunk = [0; 64];
        while !self.staged.is_full() && self.port.read_ready()? {
            let room = (RX_STAGING_SIZE - self.staged.len()).min(chunk.len());
            let n = self.port.read(&mut chunk[..room])?;
            if n == 0 {
                break;
            }
            for b in &chunk[..n] {
                let _ = self.staged.push_back(*b);
            }
        }
        Ok(())
    }
}

impl<T> SerialChannel for IoSerial<T>
where
    T: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write,
{
    type Error = T::Error;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(data.len())
    }

    fn available(&mut self) -> Result<usize, Self::Error> {
        self.buffer()?;
        Ok(self.staged.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.staged.len() < buf.len() {
            self.buffer()?;
        }
        Ok(drain_into(&mut self.staged, buf))
    }
}
