//! Disaster-response configurations of the Herald agent kernel.
//!
//! Each agent here is an ordinary kernel agent with a [`Domain`] payload,
//! a rule table, and (for communicating agents) message handlers. They are
//! examples of the specialization pattern, not part of the kernel.
//!
//! # Modules
//!
//! - [`coordinator`] -- Dispatches field agents and tracks their missions
//! - [`field`] -- Travels, investigates, and reports over messages
//! - [`geo`] -- Grid [`Position`] and one-cell-per-tick movement
//! - [`medical`] -- Kernel-only medical team that treats and evacuates casualties
//! - [`rescue`] -- Kernel-only rescue team driven by sensor events
//! - [`sensors`] -- Sensor readings, thresholds, and a seeded [`SensorNetwork`]
//!
//! [`Domain`]: herald_kernel::Domain

pub mod coordinator;
pub mod field;
pub mod geo;
pub mod medical;
pub mod rescue;
pub mod sensors;

pub use coordinator::{
    Coordinator, CoordinatorAgent, CoordinatorState, DisasterReport, Discovery, MissionRecord,
    assess_situation, coordinator_agent, dispatch_field_agents, register_field_agent,
    request_status_update,
};
pub use field::{FieldAgent, FieldState, FieldUnit, Mission, field_agent, set_coordinator};
pub use geo::{BASE, Position};
pub use medical::{
    MedicalAgent, MedicalMission, MedicalState, MedicalTeam, medical_agent,
    medical_mission_from_event,
};
pub use rescue::{RescueAgent, RescueMission, RescueState, RescueTeam, mission_from_event, rescue_agent};
pub use sensors::{Reading, SensorNetwork, SensorReport, Severity};
