//! End-to-end conversations between communicating agents over the router.

#![allow(clippy::unwrap_used)]

use core::fmt;

use herald_acl::{
    CommunicatingAgent, HandlerError, Message, MessageLogger, MessageParser, MessageRouter,
    Participant,
};
use herald_kernel::{Domain, TransitionRule};
use herald_types::{Event, Performative};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Idle,
    Traveling,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Traveling => "TRAVELING",
        })
    }
}

#[derive(Debug, Default)]
struct Unit {
    target: Option<(i64, i64)>,
}

impl Domain for Unit {
    type State = Field;
}

fn unit(id: &str) -> CommunicatingAgent<Unit> {
    CommunicatingAgent::new(id, id, Field::Idle, Unit::default())
}

fn tick(agents: &mut [Box<dyn Participant>], router: &mut MessageRouter, log: &mut MessageLogger) {
    let report = router.route(agents);
    log.log_all(report.into_messages());
    for agent in agents.iter_mut() {
        agent.step();
    }
}

#[test]
fn default_request_is_refused_in_the_same_conversation() {
    let mut coordinator = unit("COORD-001");
    let request_id = coordinator
        .send(
            Performative::Request,
            "FIELD-001",
            json!({"action": "investigate_location", "parameters": {"location": [25, 30]}}),
        )
        .unwrap();
    let conversation = coordinator.sent_messages().first().unwrap().conversation_id();

    let mut agents: Vec<Box<dyn Participant>> = vec![Box::new(coordinator), Box::new(unit("FIELD-001"))];
    let mut router = MessageRouter::new();
    let mut log = MessageLogger::new();

    tick(&mut agents, &mut router, &mut log);
    tick(&mut agents, &mut router, &mut log);

    let thread = log.conversation(conversation);
    assert_eq!(thread.len(), 2);
    let reply = thread.get(1).unwrap();
    assert_eq!(reply.performative(), Performative::Refuse);
    assert_eq!(reply.in_reply_to(), Some(request_id));
    assert_eq!(reply.conversation_id(), conversation);
    assert_eq!(reply.receiver().as_str(), "COORD-001");
}

#[test]
fn accepted_request_moves_the_receiver() {
    let mut field = unit("FIELD-001");
    field.register_transition(
        TransitionRule::on_event(Field::Idle, Field::Traveling, &["MISSION_ASSIGNED"]).named("accept mission"),
    );
    field.register_message_handler(Performative::Request, |agent, msg| {
        if MessageParser::extract_action(msg).as_deref() != Some("investigate_location") {
            return Err(HandlerError::failed("unknown action"));
        }
        let location = msg
            .content()
            .pointer("/parameters/location")
            .and_then(Value::as_array)
            .and_then(|loc| Some((loc.first()?.as_i64()?, loc.get(1)?.as_i64()?)))
            .ok_or_else(|| HandlerError::failed("missing location"))?;
        agent.domain_mut().target = Some(location);
        agent.receive_event(Event::new("MISSION_ASSIGNED", 3));
        agent.reply(msg, Performative::Agree, json!({"action": "investigate_location"}))?;
        Ok(())
    });

    let mut coordinator = unit("COORD-001");
    coordinator
        .send(
            Performative::Request,
            "FIELD-001",
            json!({"action": "investigate_location", "parameters": {"location": [25, 30]}}),
        )
        .unwrap();
    coordinator
        .send(Performative::Request, "FIELD-001", json!({"action": "dance"}))
        .unwrap();

    let mut agents: Vec<Box<dyn Participant>> = vec![Box::new(coordinator), Box::new(field)];
    let mut router = MessageRouter::new();
    let mut log = MessageLogger::new();
    tick(&mut agents, &mut router, &mut log);
    tick(&mut agents, &mut router, &mut log);

    assert_eq!(agents.get(1).unwrap().state_label(), "TRAVELING");
    assert_eq!(log.by_performative(Performative::Agree).len(), 1);
    let not_understood = log.by_performative(Performative::NotUnderstood);
    assert_eq!(not_understood.len(), 1);
    assert_eq!(
        not_understood.first().unwrap().content().get("reason").unwrap(),
        &json!("unknown action")
    );
}

#[test]
fn unhandled_performatives_never_bounce_forever() {
    let mut a = unit("A");
    let mut b = unit("B");
    a.unregister_message_handler(Performative::NotUnderstood);
    b.unregister_message_handler(Performative::NotUnderstood);
    a.send(Performative::Propose, "B", json!({"plan": "split up"})).unwrap();

    let mut agents: Vec<Box<dyn Participant>> = vec![Box::new(a), Box::new(b)];
    let mut router = MessageRouter::new();
    let mut log = MessageLogger::new();
    for _ in 0..5 {
        tick(&mut agents, &mut router, &mut log);
    }

    assert_eq!(log.len(), 2);
    let kinds: Vec<_> = log.messages().iter().map(Message::performative).collect();
    assert_eq!(kinds, vec![Performative::Propose, Performative::NotUnderstood]);
    assert!(agents.iter().all(|agent| !agent.has_pending_work()));
}

#[test]
fn wire_form_survives_a_full_exchange() {
    let mut coordinator = unit("COORD-001");
    coordinator
        .send(Performative::QueryRef, "FIELD-001", json!({"query": "status"}))
        .unwrap();
    let mut agents: Vec<Box<dyn Participant>> = vec![Box::new(coordinator), Box::new(unit("FIELD-001"))];
    let mut router = MessageRouter::new();
    let mut log = MessageLogger::new();
    tick(&mut agents, &mut router, &mut log);
    tick(&mut agents, &mut router, &mut log);

    for message in log.messages() {
        let decoded = Message::from_json(&message.to_json().unwrap()).unwrap();
        assert_eq!(&decoded, message);
    }
}
