//! Task table, tick accounting and dispatch loop
//!
//! The timer interrupt calls [`Scheduler::tick`] once per quantum; the main
//! loop calls [`Scheduler::dispatch`] as often as it can. Task bodies only
//! ever run from `dispatch`.

use super::task::{Priority, TaskAction, TaskControlBlock, TaskHandler, TaskStatus};
use crate::config::MAX_TASKS;
use crate::diagnostics::FaultCode;
use crate::protocol::{decode_command, ActionCode, CommandChannel, CommandFrame, Feedback, TASK_REPORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// Task id 0 marks an empty slot.
    InvalidId,
    AlreadyActive,
    TableFull,
    UnknownTask,
    /// No body is bound to the task id.
    UnknownAction,
    /// Slot held an undecodable body and was parked in the error state.
    CorruptSlot,
}

impl FaultCode for SchedulerError {
    fn code(&self) -> u8 {
        match self {
            SchedulerError::InvalidId => 101,
            SchedulerError::AlreadyActive => 102,
            SchedulerError::TableFull => 103,
            SchedulerError::UnknownTask => 104,
            SchedulerError::UnknownAction => 105,
            SchedulerError::CorruptSlot => 106,
        }
    }
}

/// What one dispatch pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub commands: u8,
    pub executed: u8,
    pub failed: u8,
    pub feedback_errors: u8,
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: TaskControlBlock = TaskControlBlock::new();

pub struct Scheduler {
    slots: [TaskControlBlock; MAX_TASKS],
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            slots: [EMPTY_SLOT; MAX_TASKS],
        }
    }

    /// Fill the first stopped slot. Returns the slot index.
    ///
    /// An id that already owns a live slot is rejected and the table is left
    /// unchanged.
    pub fn add_task(
        &self,
        id: u8,
        action: TaskAction,
        period: u16,
        payload: i32,
        priority: Priority,
    ) -> Result<usize, SchedulerError> {
        if id == 0 {
            return Err(SchedulerError::InvalidId);
        }
        if self
            .slots
            .iter()
            .any(|slot| slot.id() == id && slot.status() != TaskStatus::Stopped)
        {
            return Err(SchedulerError::AlreadyActive);
        }

        let (index, slot) = self
            .slots
            .iter()
            .enumerate()
            .find(|(_, slot)| slot.status() == TaskStatus::Stopped)
            .ok_or(SchedulerError::TableFull)?;

        slot.fill(id, action, period, payload, priority);
        Ok(index)
    }

    /// Stop the first slot carrying `id`, whatever its state.
    pub fn delete_task(&self, id: u8) -> Result<(), SchedulerError> {
        if id == 0 {
            return Err(SchedulerError::InvalidId);
        }
        let slot = self
            .slots
            .iter()
            .find(|slot| slot.id() == id)
            .ok_or(SchedulerError::UnknownTask)?;
        slot.stop();
        Ok(())
    }

    /// Status of the first slot carrying `id`, `Error` when there is none.
    pub fn task_status(&self, id: u8) -> TaskStatus {
        if id == 0 {
            return TaskStatus::Error;
        }
        self.slots
            .iter()
            .find(|slot| slot.id() == id)
            .map_or(TaskStatus::Error, |slot| slot.status())
    }

    /// Interrupt side: one quantum elapsed.
    #[inline]
    pub fn tick(&self) {
        for slot in self.slots.iter() {
            slot.tick();
        }
    }

    #[cfg(test)]
    fn slot(&self, index: usize) -> Option<&TaskControlBlock> {
        self.slots.get(index)
    }

    /// Apply a decoded remote command to the table.
    pub fn apply_command(&self, frame: &CommandFrame) -> Feedback {
        let result = match frame.action {
            ActionCode::Add | ActionCode::AddHigh | ActionCode::AddLow => {
                let priority = match frame.action {
                    ActionCode::AddHigh => Priority::High,
                    ActionCode::AddLow => Priority::Low,
                    _ => Priority::Normal,
                };
                TaskAction::for_task_id(frame.task_id)
                    .ok_or(SchedulerError::UnknownAction)
                    .and_then(|action| {
                        self.add_task(frame.task_id, action, frame.period, frame.payload, priority)
                    })
                    .map(|_| TaskStatus::Runnable)
            }
            ActionCode::Delete => self.delete_task(frame.task_id).map(|_| TaskStatus::Stopped),
            ActionCode::Status => Ok(self.task_status(frame.task_id)),
        };

        match result {
            Ok(status) => Feedback {
                task_id: frame.task_id,
                action_code: frame.action as u8,
                period: frame.period,
                value: status as i32,
            },
            Err(err) => Feedback::fault(frame.task_id, frame.period, err.code()),
        }
    }

    /// Main loop side: serve at most one pending command, then run every due
    /// slot once in table order.
    pub fn dispatch<C, H>(&self, channel: &mut C, handler: &mut H) -> DispatchReport
    where
        C: CommandChannel + ?Sized,
        H: TaskHandler + ?Sized,
    {
        let mut report = DispatchReport::default();

        if let Some(raw) = channel.poll_command() {
            report.commands += 1;
            let feedback = match decode_command(&raw) {
                Ok(frame) => {
                    let feedback = self.apply_command(&frame);
                    handler.command_applied(feedback.action_code, feedback.task_id, feedback.value);
                    feedback
                }
                Err(err) => Feedback::fault(0, 0, err.code()),
            };
            if channel.send_feedback(&feedback).is_err() {
                report.feedback_errors += 1;
            }
        }

        for slot in self.slots.iter() {
            if !slot.is_due() || !slot.begin() {
                continue;
            }

            let id = slot.id();
            let period = slot.period();

            let feedback = match slot.action() {
                Some(action) => {
                    report.executed += 1;
                    match handler.execute(id, action, slot.payload()) {
                        Ok(outcome) => {
                            let next = match slot.priority() {
                                Priority::High => TaskStatus::Runnable,
                                Priority::Low => TaskStatus::Stopped,
                                Priority::Normal if outcome.repeat => TaskStatus::Runnable,
                                Priority::Normal => TaskStatus::Stopped,
                            };
                            slot.finish(next);
                            Feedback {
                                task_id: id,
                                action_code: TASK_REPORT,
                                period,
                                value: outcome.value,
                            }
                        }
                        Err(err) => {
                            report.failed += 1;
                            slot.finish(TaskStatus::Stopped);
                            Feedback::fault(id, period, err.code())
                        }
                    }
                }
                None => {
                    report.failed += 1;
                    slot.finish(TaskStatus::Error);
                    Feedback::fault(id, period, SchedulerError::CorruptSlot.code())
                }
            };

            if channel.send_feedback(&feedback).is_err() {
                report.feedback_errors += 1;
            }
        }

        report
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positioning::Axis;
    use crate::rtos::TaskReport;
    use crate::protocol::{encode_command, ProtocolError, RawCommand};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Link {
        inbox: VecDeque<RawCommand>,
        sent: Vec<Feedback>,
        broken: bool,
    }

    impl CommandChannel for Link {
        fn poll_command(&mut self) -> Option<RawCommand> {
            self.inbox.pop_front()
        }

        fn send_feedback(&mut self, feedback: &Feedback) -> crate::protocol::Result<()> {
            if self.broken {
                return Err(ProtocolError::Transport);
            }
            self.sent.push(*feedback);
            Ok(())
        }
    }

    #[derive(Debug, PartialEq)]
    struct Failed;

    impl FaultCode for Failed {
        fn code(&self) -> u8 {
            250
        }
    }

    #[derive(Default)]
    struct Recorder {
        runs: Vec<(u8, TaskAction, i32)>,
        repeat: bool,
        fail: bool,
        commands: Vec<(u8, u8, i32)>,
    }

    impl TaskHandler for Recorder {
        type Error = Failed;

        fn execute(&mut self, task_id: u8, action: TaskAction, payload: i32) -> Result<TaskReport, Failed> {
            self.runs.push((task_id, action, payload));
            if self.fail {
                return Err(Failed);
            }
            Ok(TaskReport {
                repeat: self.repeat,
                value: payload + 1,
            })
        }

        fn command_applied(&mut self, action_code: u8, task_id: u8, value: i32) {
            self.commands.push((action_code, task_id, value));
        }
    }

    fn repeating() -> Recorder {
        Recorder {
            repeat: true,
            ..Default::default()
        }
    }

    #[test]
    fn periodic_task_runs_once_per_period() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();
        let mut handler = repeating();

        scheduler
            .add_task(151, TaskAction::Heartbeat, 10, 0, Priority::Normal)
            .unwrap();

        for _ in 0..9 {
            scheduler.tick();
        }
        scheduler.dispatch(&mut link, &mut handler);
        assert!(handler.runs.is_empty());

        scheduler.tick();
        let report = scheduler.dispatch(&mut link, &mut handler);
        assert_eq!(report.executed, 1);
        assert_eq!(handler.runs, [(151, TaskAction::Heartbeat, 0)]);

        let slot = scheduler.slot(0).unwrap();
        assert_eq!(slot.delay(), 10);
        assert_eq!(slot.status(), TaskStatus::Runnable);

        // no second run without further ticks
        scheduler.dispatch(&mut link, &mut handler);
        assert_eq!(handler.runs.len(), 1);
        assert_eq!(link.sent[0].action_code, TASK_REPORT);
        assert_eq!(link.sent[0].value, 1);
    }

    #[test]
    fn one_shot_task_stops_itself() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();
        let mut handler = Recorder::default();

        scheduler
            .add_task(12, TaskAction::SetLocation(Axis::P2), 0, 500, Priority::Normal)
            .unwrap();
        scheduler.dispatch(&mut link, &mut handler);
        scheduler.dispatch(&mut link, &mut handler);

        assert_eq!(handler.runs, [(12, TaskAction::SetLocation(Axis::P2), 500)]);
        assert_eq!(scheduler.task_status(12), TaskStatus::Stopped);
    }

    #[test]
    fn duplicate_add_leaves_table_unchanged() {
        let scheduler = Scheduler::new();
        scheduler
            .add_task(7, TaskAction::Heartbeat, 5, 1, Priority::Normal)
            .unwrap();
        assert_eq!(
            scheduler.add_task(7, TaskAction::Heartbeat, 9, 2, Priority::High),
            Err(SchedulerError::AlreadyActive)
        );

        let slot = scheduler.slot(0).unwrap();
        assert_eq!(slot.period(), 5);
        assert_eq!(slot.payload(), 1);
        assert_eq!(scheduler.slots.iter().filter(|s| s.id() == 7).count(), 1);
    }

    #[test]
    fn deleted_slot_is_recycled() {
        let scheduler = Scheduler::new();
        scheduler.add_task(1, TaskAction::Heartbeat, 5, 0, Priority::Normal).unwrap();
        scheduler.add_task(2, TaskAction::Heartbeat, 5, 0, Priority::Normal).unwrap();
        scheduler.delete_task(1).unwrap();

        assert_eq!(scheduler.task_status(1), TaskStatus::Stopped);
        assert_eq!(
            scheduler.add_task(3, TaskAction::Heartbeat, 5, 0, Priority::Normal),
            Ok(0)
        );
        // a stopped id can be added again
        assert_eq!(
            scheduler.add_task(1, TaskAction::Heartbeat, 5, 0, Priority::Normal),
            Ok(2)
        );
    }

    #[test]
    fn table_full_and_invalid_ids() {
        let scheduler = Scheduler::new();
        for id in 1..=MAX_TASKS as u8 {
            scheduler.add_task(id, TaskAction::Heartbeat, 1, 0, Priority::Normal).unwrap();
        }
        assert_eq!(
            scheduler.add_task(200, TaskAction::Heartbeat, 1, 0, Priority::Normal),
            Err(SchedulerError::TableFull)
        );
        assert_eq!(
            scheduler.add_task(0, TaskAction::Heartbeat, 1, 0, Priority::Normal),
            Err(SchedulerError::InvalidId)
        );
        assert_eq!(scheduler.delete_task(99), Err(SchedulerError::UnknownTask));
        assert_eq!(scheduler.task_status(99), TaskStatus::Error);
        assert_eq!(scheduler.task_status(0), TaskStatus::Error);
    }

    #[test]
    fn high_priority_ignores_delay_and_repeats() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();
        let mut handler = Recorder::default();

        scheduler.add_task(40, TaskAction::ReportLocation(Axis::P0), 50, 0, Priority::High).unwrap();
        for _ in 0..3 {
            scheduler.dispatch(&mut link, &mut handler);
        }
        assert_eq!(handler.runs.len(), 3);
        assert_eq!(scheduler.task_status(40), TaskStatus::Runnable);
    }

    #[test]
    fn low_priority_runs_once_after_delay() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();
        let mut handler = repeating();

        scheduler.add_task(20, TaskAction::Calibrate(Axis::P0), 2, 100, Priority::Low).unwrap();
        scheduler.dispatch(&mut link, &mut handler);
        assert!(handler.runs.is_empty());

        scheduler.tick();
        scheduler.tick();
        scheduler.dispatch(&mut link, &mut handler);
        scheduler.tick();
        scheduler.tick();
        scheduler.dispatch(&mut link, &mut handler);

        assert_eq!(handler.runs.len(), 1);
        assert_eq!(scheduler.task_status(20), TaskStatus::Stopped);
    }

    #[test]
    fn failing_body_stops_slot_and_reports_fault() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();
        let mut handler = Recorder {
            repeat: true,
            fail: true,
            ..Default::default()
        };

        scheduler.add_task(30, TaskAction::MoveIntervals(Axis::P0), 0, 3, Priority::High).unwrap();
        let report = scheduler.dispatch(&mut link, &mut handler);

        assert_eq!(report.failed, 1);
        assert_eq!(scheduler.task_status(30), TaskStatus::Stopped);
        assert_eq!(link.sent, [Feedback::fault(30, 0, 250)]);
    }

    #[test]
    fn corrupt_slot_is_parked_in_error() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();
        let mut handler = repeating();

        scheduler.add_task(9, TaskAction::Heartbeat, 0, 0, Priority::Normal).unwrap();
        scheduler.slot(0).unwrap().corrupt(0x7F);
        scheduler.dispatch(&mut link, &mut handler);

        assert!(handler.runs.is_empty());
        assert_eq!(scheduler.task_status(9), TaskStatus::Error);
        assert_eq!(link.sent[0].value, SchedulerError::CorruptSlot.code() as i32);

        // error slots are neither reused nor duplicated until deleted
        assert_eq!(
            scheduler.add_task(9, TaskAction::Heartbeat, 0, 0, Priority::Normal),
            Err(SchedulerError::AlreadyActive)
        );
        scheduler.delete_task(9).unwrap();
        assert_eq!(
            scheduler.add_task(9, TaskAction::Heartbeat, 0, 0, Priority::Normal),
            Ok(0)
        );
    }

    struct SelfDeleting<'a> {
        scheduler: &'a Scheduler,
        delay_seen_by_tick: Option<u16>,
    }

    impl TaskHandler for SelfDeleting<'_> {
        type Error = Failed;

        fn execute(&mut self, task_id: u8, _: TaskAction, _: i32) -> Result<TaskReport, Failed> {
            // interrupt fires while the body runs
            self.scheduler.tick();
            self.delay_seen_by_tick = self.scheduler.slot(0).map(|s| s.delay());
            self.scheduler.delete_task(task_id).map_err(|_| Failed)?;
            Ok(TaskReport::repeat(0))
        }
    }

    #[test]
    fn delete_while_running_is_not_undone() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();

        scheduler.add_task(5, TaskAction::Heartbeat, 4, 0, Priority::High).unwrap();

        let mut handler = SelfDeleting {
            scheduler: &scheduler,
            delay_seen_by_tick: None,
        };
        scheduler.dispatch(&mut link, &mut handler);

        // running slots are not ticked
        assert_eq!(handler.delay_seen_by_tick, Some(4));
        assert_eq!(scheduler.task_status(5), TaskStatus::Stopped);
    }

    #[test]
    fn remote_commands_manage_the_table() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();
        let mut handler = repeating();

        link.inbox.push_back(encode_command(ActionCode::Add, 1, 10, 0));
        link.inbox.push_back(encode_command(ActionCode::Status, 1, 0, 0));
        link.inbox.push_back(encode_command(ActionCode::Add, 1, 10, 0));
        link.inbox.push_back(encode_command(ActionCode::AddLow, 151, 0, 0));
        link.inbox.push_back(encode_command(ActionCode::Delete, 1, 0, 0));

        for _ in 0..5 {
            let report = scheduler.dispatch(&mut link, &mut handler);
            assert_eq!(report.commands, 1);
        }

        assert_eq!(link.sent[0].action_code, ActionCode::Add as u8);
        assert_eq!(link.sent[0].value, TaskStatus::Runnable as i32);
        assert_eq!(link.sent[1].value, TaskStatus::Runnable as i32);
        assert_eq!(link.sent[2], Feedback::fault(1, 10, 102));
        assert_eq!(link.sent[3], Feedback::fault(151, 0, 105));
        assert_eq!(link.sent[4].value, TaskStatus::Stopped as i32);
        assert_eq!(handler.commands.len(), 5);
        assert!(handler.runs.is_empty());
    }

    #[test]
    fn malformed_command_gets_fault_feedback() {
        let scheduler = Scheduler::new();
        let mut link = Link::default();
        let mut handler = repeating();

        let mut bytes = [0u8; crate::protocol::COMMAND_FRAME_LEN];
        bytes.copy_from_slice(encode_command(ActionCode::Add, 1, 10, 0).as_bytes());
        bytes[11] ^= 0xFF;
        link.inbox.push_back(RawCommand::new(bytes));

        scheduler.dispatch(&mut link, &mut handler);
        assert_eq!(link.sent, [Feedback::fault(0, 0, 52)]);
        assert_eq!(scheduler.task_status(1), TaskStatus::Error);
    }

    #[test]
    fn feedback_errors_are_counted() {
        let scheduler = Scheduler::new();
        let mut link = Link {
            broken: true,
            ..Default::default()
        };
        let mut handler = repeating();

        scheduler.add_task(1, TaskAction::Heartbeat, 0, 0, Priority::Normal).unwrap();
        let report = scheduler.dispatch(&mut link, &mut handler);
        assert_eq!(report.executed, 1);
        assert_eq!(report.feedback_errors, 1);
        assert_eq!(scheduler.task_status(1), TaskStatus::Runnable);
    }
}
