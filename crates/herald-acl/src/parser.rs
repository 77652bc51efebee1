//! Performative-aware reading of message content.

use herald_types::Performative;
use serde_json::{Map, Value};

use crate::message::Message;

/// Content interpreted according to the message's performative.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedContent {
    /// `inform`: a piece of information. `fact` is the `fact` field of an
    /// object content, or the whole content otherwise.
    Information {
        /// The full content.
        information: Value,
        /// The asserted fact, if one is identifiable.
        fact: Option<Value>,
    },
    /// `request`: an action with parameters.
    Action {
        /// Action name. Non-object content is rendered as the name.
        action: String,
        /// Action parameters, empty when absent.
        parameters: Map<String, Value>,
    },
    /// `query-if` / `query-ref`: the query expression.
    Query(Value),
    /// `confirm` / `disconfirm`: the proposition being judged.
    Proposition(Value),
    /// `agree` / `refuse`: the action being answered.
    ActionReference(Value),
    /// Every other performative: content as-is.
    Raw(Value),
}

/// Stateless content interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageParser;

impl MessageParser {
    /// Interpret the content of `message`.
    pub fn parse(message: &Message) -> ParsedContent {
        let content = message.content();
        match message.performative() {
            Performative::Inform => ParsedContent::Information {
                information: content.clone(),
                fact: match content {
                    Value::Object(map) => map.get("fact").cloned(),
                    other => Some(other.clone()),
                },
            },
            Performative::Request => {
                let parameters = content
                    .get("parameters")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                ParsedContent::Action {
                    action: Self::extract_action(message).unwrap_or_default(),
                    parameters,
                }
            }
            Performative::QueryIf | Performative::QueryRef => ParsedContent::Query(content.clone()),
            Performative::Confirm | Performative::Disconfirm => {
                ParsedContent::Proposition(content.clone())
            }
            Performative::Agree | Performative::Refuse => {
                ParsedContent::ActionReference(content.clone())
            }
            _ => ParsedContent::Raw(content.clone()),
        }
    }

    /// Action name of a `request`; `None` for any other performative.
    pub fn extract_action(message: &Message) -> Option<String> {
        if message.performative() != Performative::Request {
            return None;
        }
        Some(match message.content() {
            Value::Object(map) => match map.get("action") {
                Some(Value::String(name)) => name.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            },
            Value::String(name) => name.clone(),
            other => other.to_string(),
        })
    }

    /// Content of an `inform`; `None` for any other performative.
    pub fn extract_information(message: &Message) -> Option<&Value> {
        (message.performative() == Performative::Inform).then(|| message.content())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_yields_action_and_parameters() {
        let msg = Message::new(
            Performative::Request,
            "COORD-001",
            "FIELD-001",
            json!({"action": "investigate_location", "parameters": {"location": [25, 30]}}),
        );
        let expected = json!({"location": [25, 30]}).as_object().cloned().unwrap();
        assert_eq!(
            MessageParser::parse(&msg),
            ParsedContent::Action {
                action: String::from("investigate_location"),
                parameters: expected,
            }
        );
    }

    #[test]
    fn request_without_parameters_gets_an_empty_map() {
        let msg = Message::new(Performative::Request, "A", "B", json!({"action": "return_to_base"}));
        assert_eq!(
            MessageParser::parse(&msg),
            ParsedContent::Action {
                action: String::from("return_to_base"),
                parameters: Map::new(),
            }
        );
    }

    #[test]
    fn inform_picks_out_the_fact() {
        let msg = Message::new(Performative::Inform, "A", "B", json!({"fact": "road blocked", "x": 1}));
        assert_eq!(
            MessageParser::parse(&msg),
            ParsedContent::Information {
                information: json!({"fact": "road blocked", "x": 1}),
                fact: Some(json!("road blocked")),
            }
        );
        assert_eq!(MessageParser::extract_information(&msg), Some(msg.content()));
    }

    #[test]
    fn scalar_inform_is_its_own_fact() {
        let msg = Message::new(Performative::Inform, "A", "B", json!("all clear"));
        assert!(matches!(
            MessageParser::parse(&msg),
            ParsedContent::Information { fact: Some(Value::String(fact)), .. } if fact == "all clear"
        ));
    }

    #[test]
    fn other_performatives_map_to_their_shapes() {
        let query = Message::new(Performative::QueryRef, "A", "B", json!({"q": "status"}));
        assert!(matches!(MessageParser::parse(&query), ParsedContent::Query(_)));

        let confirm = Message::new(Performative::Disconfirm, "A", "B", json!({"p": true}));
        assert!(matches!(MessageParser::parse(&confirm), ParsedContent::Proposition(_)));

        let refuse = Message::new(Performative::Refuse, "A", "B", json!({"action": "fly"}));
        assert!(matches!(MessageParser::parse(&refuse), ParsedContent::ActionReference(_)));

        let cfp = Message::new(Performative::Cfp, "A", "B", json!({"task": "t"}));
        assert_eq!(MessageParser::parse(&cfp), ParsedContent::Raw(json!({"task": "t"})));
    }

    #[test]
    fn extractors_ignore_other_performatives() {
        let msg = Message::new(Performative::Agree, "A", "B", json!({"action": "go"}));
        assert!(MessageParser::extract_action(&msg).is_none());
        assert!(MessageParser::extract_information(&msg).is_none());
    }
}
