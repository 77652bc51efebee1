//! Reactive agent kernel for the Herald simulation.
//!
//! A kernel couples a finite state machine to a priority event queue and a
//! small goal set. Each dequeued event fires at most one transition: the
//! first registered rule whose source state matches and whose guard holds.
//! Guard failures are contained and treated as "no match".
//!
//! # Modules
//!
//! - [`agent`] -- [`ReactiveAgent`] and the [`Domain`] extension point
//! - [`error`] -- [`GuardError`] and [`KernelError`]
//! - [`kernel`] -- [`Kernel`] bookkeeping: state, queue, goals, history
//! - [`machine`] -- The transition engine ([`process_events`], [`react`])
//! - [`queue`] -- Stable priority [`EventQueue`]
//! - [`rule`] -- [`TransitionRule`] and [`TransitionTable`]
//! - [`trace`] -- Per-agent [`TraceSink`]

pub mod agent;
pub mod error;
pub mod kernel;
pub mod machine;
pub mod queue;
pub mod rule;
pub mod trace;

pub use agent::{Domain, ReactiveAgent};
pub use error::{GuardError, KernelError};
pub use kernel::{AgentState, Kernel, KernelOptions, StateRecord};
pub use machine::{Fired, Reactive, process_events, quiet_step, react};
pub use queue::EventQueue;
pub use rule::{Action, Guard, TransitionRule, TransitionTable};
pub use trace::TraceSink;
