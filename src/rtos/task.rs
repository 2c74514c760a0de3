use portable_atomic::{AtomicI32, AtomicU16, AtomicU8, Ordering};

use crate::diagnostics::FaultCode;
use crate::positioning::Axis;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskStatus {
    Runnable = 0,
    Running = 1,
    Stopped = 2,
    Error = 3,
}

impl TaskStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskStatus::Runnable,
            1 => TaskStatus::Running,
            2 => TaskStatus::Stopped,
            _ => TaskStatus::Error,
        }
    }
}

/// Dispatch policy of a slot.
///
/// `High` runs on every dispatch pass regardless of its delay and always
/// repeats. `Low` waits for its delay, runs once and stops.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Priority {
    Normal = 0,
    High = 1,
    Low = 2,
}

impl Priority {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Priority::High,
            2 => Priority::Low,
            _ => Priority::Normal,
        }
    }
}

/// Body a task slot runs when dispatched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskAction {
    Heartbeat,
    SetLocation(Axis),
    Calibrate(Axis),
    MoveIntervals(Axis),
    ReportLocation(Axis),
}

impl TaskAction {
    /// Compact form stored in a task slot.
    pub fn code(self) -> u8 {
        match self {
            TaskAction::Heartbeat => 0x01,
            TaskAction::SetLocation(axis) => 0x10 | axis.index() as u8,
            TaskAction::Calibrate(axis) => 0x20 | axis.index() as u8,
            TaskAction::MoveIntervals(axis) => 0x30 | axis.index() as u8,
            TaskAction::ReportLocation(axis) => 0x40 | axis.index() as u8,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        if code == 0x01 {
            return Some(TaskAction::Heartbeat);
        }
        let axis = Axis::from_index(code & 0x0F)?;
        match code & 0xF0 {
            0x10 => Some(TaskAction::SetLocation(axis)),
            0x20 => Some(TaskAction::Calibrate(axis)),
            0x30 => Some(TaskAction::MoveIntervals(axis)),
            0x40 => Some(TaskAction::ReportLocation(axis)),
            _ => None,
        }
    }

    /// Body bound to a task id for remotely added tasks.
    ///
    /// | id    | body                 |
    /// |-------|----------------------|
    /// | 1     | heartbeat            |
    /// | 10-12 | set location, axis   |
    /// | 20-22 | calibrate, axis      |
    /// | 30-32 | move intervals, axis |
    /// | 40-42 | report location      |
    pub fn for_task_id(id: u8) -> Option<Self> {
        let axis = || Axis::from_index(id % 10);
        match id {
            1 => Some(TaskAction::Heartbeat),
            10..=19 => axis().map(TaskAction::SetLocation),
            20..=29 => axis().map(TaskAction::Calibrate),
            30..=39 => axis().map(TaskAction::MoveIntervals),
            40..=49 => axis().map(TaskAction::ReportLocation),
            _ => None,
        }
    }
}

/// Outcome of one task body run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskReport {
    /// Keep the slot runnable for the next period.
    pub repeat: bool,
    /// Reported to the ground segment.
    pub value: i32,
}

impl TaskReport {
    pub fn repeat(value: i32) -> Self {
        Self { repeat: true, value }
    }

    pub fn done(value: i32) -> Self {
        Self {
            repeat: false,
            value,
        }
    }
}

/// Executes task bodies on behalf of the scheduler.
pub trait TaskHandler {
    type Error: FaultCode;

    fn execute(&mut self, task_id: u8, action: TaskAction, payload: i32)
        -> Result<TaskReport, Self::Error>;

    /// Called after a remote command was applied to the task table.
    fn command_applied(&mut self, _action_code: u8, _task_id: u8, _value: i32) {}
}

/// One slot of the task table.
///
/// Every field is written by the main loop and read by the tick interrupt,
/// so each is an atomic. `status` is stored last when a slot is filled and
/// is the only field the interrupt writes besides `delay`.
pub struct TaskControlBlock {
    id: AtomicU8,
    action: AtomicU8,
    priority: AtomicU8,
    status: AtomicU8,
    delay: AtomicU16,
    period: AtomicU16,
    payload: AtomicI32,
}

impl TaskControlBlock {
    pub const fn new() -> Self {
        Self {
            id: AtomicU8::new(0),
            action: AtomicU8::new(0),
            priority: AtomicU8::new(Priority::Normal as u8),
            status: AtomicU8::new(TaskStatus::Stopped as u8),
            delay: AtomicU16::new(0),
            period: AtomicU16::new(0),
            payload: AtomicI32::new(0),
        }
    }

    pub fn id(&self) -> u8 {
        self.id.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn priority(&self) -> Priority {
        Priority::from_u8(self.priority.load(Ordering::Relaxed))
    }

    /// `None` when the stored code is not a known body.
    pub fn action(&self) -> Option<TaskAction> {
        TaskAction::from_code(self.action.load(Ordering::Relaxed))
    }

    pub fn delay(&self) -> u16 {
        self.delay.load(Ordering::Relaxed)
    }

    pub fn period(&self) -> u16 {
        self.period.load(Ordering::Relaxed)
    }

    pub fn payload(&self) -> i32 {
        self.payload.load(Ordering::Relaxed)
    }

    pub(super) fn fill(&self, id: u8, action: TaskAction, period: u16, payload: i32, priority: Priority) {
        self.id.store(id, Ordering::Relaxed);
        self.action.store(action.code(), Ordering::Relaxed);
        self.priority.store(priority as u8, Ordering::Relaxed);
        self.period.store(period, Ordering::Relaxed);
        self.delay.store(period, Ordering::Relaxed);
        self.payload.store(payload, Ordering::Relaxed);
        self.status.store(TaskStatus::Runnable as u8, Ordering::Release);
    }

    pub(super) fn stop(&self) {
        self.status.store(TaskStatus::Stopped as u8, Ordering::Release);
    }

    pub(super) fn is_due(&self) -> bool {
        self.status() == TaskStatus::Runnable
            && (self.priority() == Priority::High || self.delay() == 0)
    }

    /// Claim a runnable slot for execution.
    pub(super) fn begin(&self) -> bool {
        self.status
            .compare_exchange(
                TaskStatus::Runnable as u8,
                TaskStatus::Running as u8,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Re-arm the delay and leave the running state. A slot stopped while
    /// its body ran stays stopped.
    pub(super) fn finish(&self, next: TaskStatus) {
        self.delay.store(self.period(), Ordering::Relaxed);
        let _ = self.status.compare_exchange(
            TaskStatus::Running as u8,
            next as u8,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }

    /// Count one quantum off the delay of a runnable slot.
    pub(super) fn tick(&self) {
        if self.status() == TaskStatus::Runnable {
            let _ = self
                .delay
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |delay| delay.checked_sub(1));
        }
    }

    #[cfg(test)]
    pub(super) fn corrupt(&self, code: u8) {
        self.action.store(code, Ordering::Relaxed);
    }
}

impl Default for TaskControlBlock {
    fn default() -> Self {
        Self::new()
    }
}
