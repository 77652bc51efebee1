//! Multi-agent runs through the cooperative stepper.

#![allow(clippy::unwrap_used)]

use core::fmt;

use herald_acl::CommunicatingAgent;
use herald_core::{NoOpCallback, Simulation, SimulationEndReason, SimulationSection, run_simulation};
use herald_kernel::{Domain, TransitionRule};
use herald_types::{AgentId, Event, Performative};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Post {
    Idle,
    Responding,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Responding => "RESPONDING",
        })
    }
}

#[derive(Debug, Default)]
struct Station;

impl Domain for Station {
    type State = Post;
}

fn station(id: &str) -> CommunicatingAgent<Station> {
    CommunicatingAgent::new(id, id, Post::Idle, Station)
}

#[tokio::test]
async fn request_refuse_exchange_settles() {
    let mut caller = station("COORD-001");
    let request_id = caller
        .send(
            Performative::Request,
            "FIELD-001",
            json!({"action": "investigate_location", "parameters": {"location": [25, 30]}}),
        )
        .unwrap();

    let mut sim = Simulation::new();
    sim.add_participant(Box::new(caller)).unwrap();
    sim.add_participant(Box::new(station("FIELD-001"))).unwrap();

    let limits = SimulationSection::default();
    let result = run_simulation(&mut sim, &limits, &mut NoOpCallback).await.unwrap();

    assert_eq!(result.end_reason, SimulationEndReason::Quiescent);
    let log = sim.message_log();
    assert_eq!(log.len(), 2);
    let refuse = log.by_performative(Performative::Refuse);
    assert_eq!(refuse.len(), 1);
    assert_eq!(refuse.first().unwrap().in_reply_to(), Some(request_id));
    let request = log.messages().first().unwrap();
    assert_eq!(refuse.first().unwrap().conversation_id(), request.conversation_id());
}

#[test]
fn priority_decides_which_event_moves_the_agent() {
    let mut responder = station("RESCUE-001");
    responder.register_transition(TransitionRule::on_event(
        Post::Idle,
        Post::Responding,
        &["BUILDING_COLLAPSE"],
    ));

    let mut sim = Simulation::new();
    sim.add_participant(Box::new(responder)).unwrap();
    let id = AgentId::from("RESCUE-001");
    sim.inject_event(&id, Event::new("FIRE_DETECTED", 4)).unwrap();
    sim.inject_event(&id, Event::new("BUILDING_COLLAPSE", 5)).unwrap();

    let summary = sim.run_tick();
    assert_eq!(summary.state_of("RESCUE-001"), Some("RESPONDING"));
    assert_eq!(summary.transitions, 1);
    assert!(!sim.participant(&id).unwrap().has_pending_work());
}
