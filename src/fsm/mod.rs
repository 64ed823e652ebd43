//! Commissioning lifecycle tracker: a function-pointer phase table.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                   │
//! │  ┌───────────────┬──────────┬─────────┬─────────────────────┐ │
//! │  │ Phase         │ on_enter │ on_exit │ on_update           │ │
//! │  ├───────────────┼──────────┼─────────┼─────────────────────┤ │
//! │  │ NotStarted    │ -        │ -       │ fn(ctx)->Option<>   │ │
//! │  │ Waiting       │ fn(ctx)  │ -       │ fn(ctx)->Option<>   │ │
//! │  │ JustCompleted │ fn(ctx)  │ -       │ fn(ctx)->Option<>   │ │
//! │  │ Done          │ fn(ctx)  │ -       │ fn(ctx)->Option<>   │ │
//! │  └───────────────┴──────────┴─────────┴─────────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never talks to the Matter stack itself. Before each tick the
//! caller fills [`CommissioningContext::commissioned`] and `now_ms`; after
//! the tick it drains the [`PhaseActions`](context::PhaseActions) the
//! handlers raised and carries them out.

pub mod context;
pub mod states;

use context::CommissioningContext;
use log::info;

/// Commissioning phases. Forward-only apart from `Done → NotStarted`
/// when the device loses its fabrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommissioningPhase {
    NotStarted = 0,
    Waiting = 1,
    JustCompleted = 2,
    Done = 3,
}

impl CommissioningPhase {
    pub const COUNT: usize = 4;

    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::NotStarted,
            1 => Self::Waiting,
            2 => Self::JustCompleted,
            3 => Self::Done,
            _ => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::NotStarted
            }
        }
    }
}

pub type PhaseActionFn = fn(&mut CommissioningContext);

/// Returns `Some(next)` to leave the phase.
pub type PhaseUpdateFn = fn(&mut CommissioningContext) -> Option<CommissioningPhase>;

/// One row of the phase table.
pub struct PhaseDescriptor {
    pub id: CommissioningPhase,
    pub name: &'static str,
    pub on_enter: Option<PhaseActionFn>,
    pub on_exit: Option<PhaseActionFn>,
    pub on_update: PhaseUpdateFn,
}

pub struct CommissioningFsm {
    table: [PhaseDescriptor; CommissioningPhase::COUNT],
    current: usize,
    tick_count: u64,
}

impl CommissioningFsm {
    pub fn new(
        table: [PhaseDescriptor; CommissioningPhase::COUNT],
        initial: CommissioningPhase,
    ) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
        }
    }

    /// Run `on_enter` for the initial phase. Call once before `tick`.
    pub fn start(&mut self, ctx: &mut CommissioningContext) {
        info!(
            "commissioning: starting in {}",
            self.table[self.current].name
        );
        ctx.entered_at_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Run the current phase's update and follow at most one transition.
    /// Returns the `(from, to)` pair when the phase changed.
    pub fn tick(
        &mut self,
        ctx: &mut CommissioningContext,
    ) -> Option<(CommissioningPhase, CommissioningPhase)> {
        self.tick_count = self.tick_count.wrapping_add(1);
        let from = self.phase();
        let next = (self.table[self.current].on_update)(ctx)?;
        if next == from {
            return None;
        }
        self.transition(next, ctx);
        Some((from, next))
    }

    /// Jump to `next` regardless of what the current phase wants.
    pub fn force_transition(&mut self, next: CommissioningPhase, ctx: &mut CommissioningContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn phase(&self) -> CommissioningPhase {
        CommissioningPhase::from_index(self.current)
    }

    pub fn phase_name(&self) -> &'static str {
        self.table[self.current].name
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn transition(&mut self, next: CommissioningPhase, ctx: &mut CommissioningContext) {
        let next_idx = next as usize;
        info!(
            "commissioning: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }
        self.current = next_idx;
        ctx.entered_at_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
