pub mod picomotor;
pub mod serial_console;

pub use picomotor::{AxisDriver, PicomotorBank, PicomotorChannel};
pub use serial_console::SerialConsole;
