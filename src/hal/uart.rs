use avr_device::atmega128a::{USART0, USART1};
use avr_device::interrupt::Mutex;
use core::cell::RefCell;
use core::marker::PhantomData;
use embedded_hal::serial;

use crate::config::CPU_FREQ_HZ;

// UCSRnA flags
const RXC: u8 = 1 << 7;
const UDRE: u8 = 1 << 5;
const FE: u8 = 1 << 4;
const DOR: u8 = 1 << 3;
const UPE: u8 = 1 << 2;

// UCSRnB enables
const RXCIE: u8 = 1 << 7;
const RXEN: u8 = 1 << 4;
const TXEN: u8 = 1 << 3;

// 8N1
const UCSZ_8BIT: u8 = 0b11 << 1;

// Buffer size must be power of 2 for efficient masking
const BUFFER_SIZE: usize = 32;
const BUFFER_MASK: usize = BUFFER_SIZE - 1;

const fn ubrr(baud: u32) -> u16 {
    (CPU_FREQ_HZ / (16 * baud) - 1) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    Framing,
    Overrun,
    Parity,
}

fn status_error(status: u8) -> Option<UartError> {
    if status & FE != 0 {
        Some(UartError::Framing)
    } else if status & DOR != 0 {
        Some(UartError::Overrun)
    } else if status & UPE != 0 {
        Some(UartError::Parity)
    } else {
        None
    }
}

/// Receive ring filled by the RX interrupt. A full ring drops the byte and
/// latches an overrun for the next read.
struct RxBuffer {
    data: [u8; BUFFER_SIZE],
    write_idx: usize,
    read_idx: usize,
    error: Option<UartError>,
}

impl RxBuffer {
    const fn new() -> Self {
        Self {
            data: [0; BUFFER_SIZE],
            write_idx: 0,
            read_idx: 0,
            error: None,
        }
    }

    fn push(&mut self, byte: u8) {
        let next_write = (self.write_idx + 1) & BUFFER_MASK;
        if next_write == self.read_idx {
            self.error = Some(UartError::Overrun);
            return;
        }
        self.data[self.write_idx] = byte;
        self.write_idx = next_write;
    }

    fn pop(&mut self) -> Option<u8> {
        if self.read_idx == self.write_idx {
            return None;
        }
        let byte = self.data[self.read_idx];
        self.read_idx = (self.read_idx + 1) & BUFFER_MASK;
        Some(byte)
    }
}

static RX0: Mutex<RefCell<RxBuffer>> = Mutex::new(RefCell::new(RxBuffer::new()));

pub struct Uart<USART> {
    _usart: PhantomData<USART>,
}

macro_rules! impl_uart {
    ($USART:ident, $udr:ident, $ucsra:ident, $ucsrb:ident, $ucsrc:ident, $ubrrh:ident, $ubrrl:ident, $enable:expr) => {
        impl Uart<$USART> {
            pub fn new(baud: u32) -> Self {
                let divisor = ubrr(baud);
                unsafe {
                    let p = $USART::ptr();
                    (*p).$ubrrh.write(|w| w.bits((divisor >> 8) as u8));
                    (*p).$ubrrl.write(|w| w.bits(divisor as u8));
                    (*p).$ucsrc.write(|w| w.bits(UCSZ_8BIT));
                    (*p).$ucsrb.write(|w| w.bits($enable));
                }
                Self {
                    _usart: PhantomData,
                }
            }
        }

        impl serial::Write<u8> for Uart<$USART> {
            type Error = UartError;

            fn write(&mut self, byte: u8) -> nb::Result<(), UartError> {
                unsafe {
                    let p = $USART::ptr();
                    if (*p).$ucsra.read().bits() & UDRE == 0 {
                        return Err(nb::Error::WouldBlock);
                    }
                    (*p).$udr.write(|w| w.bits(byte));
                }
                Ok(())
            }

            fn flush(&mut self) -> nb::Result<(), UartError> {
                let status = unsafe { (*$USART::ptr()).$ucsra.read().bits() };
                if status & UDRE == 0 {
                    Err(nb::Error::WouldBlock)
                } else {
                    Ok(())
                }
            }
        }
    };
}

impl_uart!(USART0, udr0, ucsr0a, ucsr0b, ucsr0c, ubrr0h, ubrr0l, RXEN | TXEN | RXCIE);
impl_uart!(USART1, udr1, ucsr1a, ucsr1b, ucsr1c, ubrr1h, ubrr1l, RXEN | TXEN);

/// Interrupt driven; reading briefly masks interrupts.
impl serial::Read<u8> for Uart<USART0> {
    type Error = UartError;

    fn read(&mut self) -> nb::Result<u8, UartError> {
        avr_device::interrupt::free(|cs| {
            let mut rx = RX0.borrow(cs).borrow_mut();
            if let Some(err) = rx.error.take() {
                return Err(nb::Error::Other(err));
            }
            rx.pop().ok_or(nb::Error::WouldBlock)
        })
    }
}

/// Polled.
impl serial::Read<u8> for Uart<USART1> {
    type Error = UartError;

    fn read(&mut self) -> nb::Result<u8, UartError> {
        unsafe {
            let p = USART1::ptr();
            let status = (*p).ucsr1a.read().bits();
            if status & RXC == 0 {
                return Err(nb::Error::WouldBlock);
            }
            // error flags are only valid before UDR is read
            let byte = (*p).udr1.read().bits();
            match status_error(status) {
                Some(err) => Err(nb::Error::Other(err)),
                None => Ok(byte),
            }
        }
    }
}

#[avr_device::interrupt(atmega128a)]
fn USART0_RX() {
    let (status, byte) = unsafe {
        let p = USART0::ptr();
        ((*p).ucsr0a.read().bits(), (*p).udr0.read().bits())
    };
    avr_device::interrupt::free(|cs| {
        let mut rx = RX0.borrow(cs).borrow_mut();
        match status_error(status) {
            Some(err) => rx.error = Some(err),
            None => rx.push(byte),
        }
    });
}

/// Command link to the ground segment.
pub type Usart0 = Uart<USART0>;
/// Text console.
pub type Usart1 = Uart<USART1>;
