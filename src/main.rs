#![cfg_attr(target_arch = "avr", no_std, no_main, feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use mirrorbox_firmware::application::Application;
    use mirrorbox_firmware::config::{
        DEFAULT_MAX_TICKS, HEARTBEAT_PERIOD, HEARTBEAT_TASK_ID, TICK_QUANTUM_OVERFLOWS, UART_BAUD,
    };
    use mirrorbox_firmware::diagnostics::FaultCode;
    use mirrorbox_firmware::drivers::{PicomotorBank, PicomotorChannel, SerialConsole};
    use mirrorbox_firmware::hal::{board, Delay, TickTimer, Usart0, Usart1, Watchdog, WatchdogTimeout};
    use mirrorbox_firmware::os::TickDivider;
    use mirrorbox_firmware::positioning::init_estimation;
    use mirrorbox_firmware::protocol::{ProtocolError, Transport};
    use mirrorbox_firmware::registers::Registers;
    use mirrorbox_firmware::rtos::{Priority, Scheduler, TaskAction};

    static SCHEDULER: Scheduler = Scheduler::new();
    static CLOCK: TickDivider = TickDivider::new(TICK_QUANTUM_OVERFLOWS);

    #[avr_device::interrupt(atmega128a)]
    fn TIMER0_OVF() {
        if CLOCK.overflow() {
            SCHEDULER.tick();
        }
    }

    #[avr_device::entry]
    fn main() -> ! {
        let mut watchdog = Watchdog::enable(WatchdogTimeout::Ms2100);

        let pins = match board::take() {
            Some(pins) => pins,
            None => loop {},
        };
        let mut power = pins.power;

        let mut registers = Registers::new();
        if let Err(err) = init_estimation(&mut registers, DEFAULT_MAX_TICKS, &mut power) {
            registers.record_fault(&err);
        }

        let p0 = pins.p0;
        let p1 = pins.p1;
        let p2 = pins.p2;
        let motors = PicomotorBank::new(
            PicomotorChannel::new(p0.enc_a, p0.enc_b, p0.step, p0.dir),
            PicomotorChannel::new(p1.enc_a, p1.enc_b, p1.step, p1.dir),
            PicomotorChannel::new(p2.enc_a, p2.enc_b, p2.step, p2.dir),
            Delay::new(),
        );

        let mut app = Application::new(registers, motors, &CLOCK);
        let startup_faults = app.registers().fault_count();
        if startup_faults > 0 {
            let code = app.registers().last_fault();
            app.logger().log_fault(0, code, startup_faults as i32);
        }
        let mut link = Transport::new(Usart0::new(UART_BAUD));
        let mut console = SerialConsole::new(Usart1::new(UART_BAUD));

        if let Err(err) = SCHEDULER.add_task(
            HEARTBEAT_TASK_ID,
            TaskAction::Heartbeat,
            HEARTBEAT_PERIOD,
            0,
            Priority::Normal,
        ) {
            app.logger().log_fault(0, err.code(), HEARTBEAT_TASK_ID as i32);
        }

        let mut timer = TickTimer::new();
        timer.start();

        // SAFETY: all shared state is in place before the tick interrupt runs
        unsafe { avr_device::interrupt::enable() };

        let _ = console.write_line("Mirror box firmware v0.1.0");

        let mut rx_errors = 0u16;

        loop {
            let report = SCHEDULER.dispatch(&mut link, &mut app);
            if report.feedback_errors > 0 {
                app.logger().log_fault(
                    CLOCK.uptime(),
                    ProtocolError::Transport.code(),
                    report.feedback_errors as i32,
                );
            }

            let seen = link.rx_errors();
            if seen != rx_errors {
                app.logger().log_fault(
                    CLOCK.uptime(),
                    ProtocolError::Transport.code(),
                    seen.wrapping_sub(rx_errors) as i32,
                );
                rx_errors = seen;
            }

            // console errors have nowhere else to go
            let _ = app.logger().drain(&mut console);
            let _ = console.flush();

            watchdog.feed();
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
