//! Phase handlers and table builder.
//!
//! ```text
//!  NotStarted ──[commissioned]──────────────────────────────▶ Done
//!      │                                                        ▲ │
//!  [not commissioned]                                  [synced] │ │
//!      ▼                                                        │ │
//!   Waiting ──[commissioned]──▶ JustCompleted ──────────────────┘ │
//!      ▲                                                          │
//!      └──── NotStarted ◀──────────[fabrics removed]──────────────┘
//! ```

use super::context::CommissioningContext;
use super::{CommissioningPhase, PhaseDescriptor};
use log::info;

pub fn build_phase_table() -> [PhaseDescriptor; CommissioningPhase::COUNT] {
    [
        PhaseDescriptor {
            id: CommissioningPhase::NotStarted,
            name: "NotStarted",
            on_enter: None,
            on_exit: None,
            on_update: not_started_update,
        },
        PhaseDescriptor {
            id: CommissioningPhase::Waiting,
            name: "Waiting",
            on_enter: Some(waiting_enter),
            on_exit: None,
            on_update: waiting_update,
        },
        PhaseDescriptor {
            id: CommissioningPhase::JustCompleted,
            name: "JustCompleted",
            on_enter: Some(just_completed_enter),
            on_exit: None,
            on_update: just_completed_update,
        },
        PhaseDescriptor {
            id: CommissioningPhase::Done,
            name: "Done",
            on_enter: Some(done_enter),
            on_exit: None,
            on_update: done_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  NOT STARTED
// ═══════════════════════════════════════════════════════════════════════════

fn not_started_update(ctx: &mut CommissioningContext) -> Option<CommissioningPhase> {
    if ctx.commissioned {
        Some(CommissioningPhase::Done)
    } else {
        Some(CommissioningPhase::Waiting)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING for a controller to commission us
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_enter(ctx: &mut CommissioningContext) {
    ctx.last_reminder_ms = ctx.now_ms;
    ctx.request(|a| a.announce_pairing = true);
}

fn waiting_update(ctx: &mut CommissioningContext) -> Option<CommissioningPhase> {
    if ctx.commissioned {
        info!(
            "WAITING: commissioned after {} ms",
            ctx.ms_in_phase()
        );
        return Some(CommissioningPhase::JustCompleted);
    }

    if ctx.now_ms.wrapping_sub(ctx.last_reminder_ms) >= ctx.reminder_interval_ms {
        ctx.last_reminder_ms = ctx.now_ms;
        ctx.request(|a| a.remind = true);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  JUST COMPLETED: one-time state sync before normal operation
// ═══════════════════════════════════════════════════════════════════════════

fn just_completed_enter(ctx: &mut CommissioningContext) {
    ctx.reset_sync();
}

fn just_completed_update(ctx: &mut CommissioningContext) -> Option<CommissioningPhase> {
    if ctx.is_synced() {
        Some(CommissioningPhase::Done)
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DONE
// ═══════════════════════════════════════════════════════════════════════════

fn done_enter(_ctx: &mut CommissioningContext) {
    info!("DONE: fan control active");
}

fn done_update(ctx: &mut CommissioningContext) -> Option<CommissioningPhase> {
    if ctx.commissioned {
        None
    } else {
        info!("DONE: no fabrics left, restarting commissioning");
        Some(CommissioningPhase::NotStarted)
    }
}
