//! ATmega128A peripherals behind the embedded-hal traits

pub mod gpio;
pub mod timer;
pub mod uart;
pub mod watchdog;

pub use gpio::{board, Input, Output, Pin};
pub use timer::{Delay, TickTimer};
pub use uart::{Uart, UartError, Usart0, Usart1};
pub use watchdog::{Watchdog, WatchdogTimeout};
