//! RAM event log
//!
//! Entries are kept in a fixed ring until the main loop drains them to the
//! console. A full ring overwrites its oldest entry.

use ufmt::{uDisplay, uWrite, uwrite, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogType {
    System = 0,
    Motion = 1,
    Fault = 2,
    Debug = 3,
}

impl uDisplay for LogType {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(match self {
            LogType::System => "SYS",
            LogType::Motion => "MOT",
            LogType::Fault => "ERR",
            LogType::Debug => "DBG",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Scheduler quanta since start-up.
    pub timestamp: u32,
    pub log_type: LogType,
    pub code: u8,
    pub value: i32,
}

impl LogEntry {
    const EMPTY: LogEntry = LogEntry {
        timestamp: 0,
        log_type: LogType::System,
        code: 0,
        value: 0,
    };
}

impl uDisplay for LogEntry {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        uwrite!(f, "[{}] {} {} {}", self.timestamp, self.log_type, self.code, self.value)
    }
}

pub struct Logger<const N: usize> {
    buffer: [LogEntry; N],
    head: usize,
    len: usize,
    dropped: u16,
}

impl<const N: usize> Logger<N> {
    pub const fn new() -> Self {
        Self {
            buffer: [LogEntry::EMPTY; N],
            head: 0,
            len: 0,
            dropped: 0,
        }
    }

    pub fn log_system(&mut self, timestamp: u32, code: u8, value: i32) {
        self.log_entry(timestamp, LogType::System, code, value);
    }

    pub fn log_motion(&mut self, timestamp: u32, code: u8, value: i32) {
        self.log_entry(timestamp, LogType::Motion, code, value);
    }

    pub fn log_fault(&mut self, timestamp: u32, code: u8, value: i32) {
        self.log_entry(timestamp, LogType::Fault, code, value);
    }

    /// Only recorded in `debug` builds.
    #[allow(unused_variables)]
    pub fn log_debug(&mut self, timestamp: u32, code: u8, value: i32) {
        #[cfg(feature = "debug")]
        self.log_entry(timestamp, LogType::Debug, code, value);
    }

    fn log_entry(&mut self, timestamp: u32, log_type: LogType, code: u8, value: i32) {
        if N == 0 {
            self.dropped = self.dropped.saturating_add(1);
            return;
        }

        let entry = LogEntry {
            timestamp,
            log_type,
            code,
            value,
        };

        let tail = (self.head + self.len) % N;
        self.buffer[tail] = entry;
        if self.len == N {
            self.head = (self.head + 1) % N;
            self.dropped = self.dropped.saturating_add(1);
        } else {
            self.len += 1;
        }
    }

    /// Oldest pending entry.
    pub fn pop(&mut self) -> Option<LogEntry> {
        if self.len == 0 {
            return None;
        }
        let entry = self.buffer[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(entry)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.len
    }

    /// Entries lost to overwriting since the last drain.
    #[cfg(test)]
    fn dropped(&self) -> u16 {
        self.dropped
    }

    /// Write every pending entry as one line, oldest first. Returns the
    /// number of entries written.
    pub fn drain<W: uWrite + ?Sized>(&mut self, out: &mut W) -> Result<usize, W::Error> {
        if self.dropped > 0 {
            uwrite!(out, "[-] SYS dropped {}\r\n", self.dropped)?;
            self.dropped = 0;
        }

        let mut written = 0;
        while let Some(entry) = self.pop() {
            uwrite!(out, "{}\r\n", entry)?;
            written += 1;
        }
        Ok(written)
    }
}

impl<const N: usize> Default for Logger<N> {
    fn default() -> Self {
        Self::new()
    }
}
