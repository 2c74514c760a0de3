use embedded_hal::serial;

/// Text console on a spare USART, target of the log drain.
pub struct SerialConsole<S> {
    serial: S,
}

impl<S, E> SerialConsole<S>
where
    S: serial::Write<u8, Error = E>,
{
    pub fn new(serial: S) -> Self {
        Self { serial }
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), E> {
        nb::block!(self.serial.write(byte))
    }

    pub fn write_line(&mut self, s: &str) -> Result<(), E> {
        ufmt::uWrite::write_str(self, s)?;
        ufmt::uWrite::write_str(self, "\r\n")
    }

    pub fn flush(&mut self) -> Result<(), E> {
        nb::block!(self.serial.flush())
    }
}

impl<S, E> ufmt::uWrite for SerialConsole<S>
where
    S: serial::Write<u8, Error = E>,
{
    type Error = E;

    fn write_str(&mut self, s: &str) -> Result<(), E> {
        for byte in s.bytes() {
            self.write_byte(byte)?;
        }
        Ok(())
    }
}
