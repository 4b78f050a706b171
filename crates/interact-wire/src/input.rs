//! Input event decoding (`giveInput` / `onInput`)

use interact_core::{
    ButtonAction, ControlId, InputKind, InteractiveError, InteractiveResult, ParticipantId,
    TransactionId,
};
use serde::Deserialize;
use serde_json::Value;

use crate::methods::keys;
use crate::schema::decode;

/// `giveInput` params
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InputRecord {
    #[serde(rename = "participantID")]
    pub participant: ParticipantId,
    #[serde(rename = "transactionID", default)]
    pub transaction: Option<TransactionId>,
    pub input: Value,
}

/// Input decoded from the wire, not yet resolved against the control cache
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedInput {
    pub participant: ParticipantId,
    pub transaction: Option<TransactionId>,
    pub control: ControlId,
    pub kind: InputKind,
    pub raw: Value,
}

fn coordinate(input: &Value, key: &str) -> Option<f32> {
    input.get(key).and_then(Value::as_f64).map(|v| v as f32)
}

/// Classify the `input` object by its `event` name
pub fn input_kind(input: &Value) -> InteractiveResult<InputKind> {
    let event = input
        .get(keys::EVENT)
        .and_then(Value::as_str)
        .ok_or_else(|| InteractiveError::UnrecognizedDataFormat("input without event".into()))?;

    let kind = match event {
        "mousedown" | "mouseup" => InputKind::Click {
            action: if event == "mousedown" {
                ButtonAction::Down
            } else {
                ButtonAction::Up
            },
            x: coordinate(input, "x"),
            y: coordinate(input, "y"),
        },
        "keydown" => InputKind::Key {
            action: ButtonAction::Down,
        },
        "keyup" => InputKind::Key {
            action: ButtonAction::Up,
        },
        "move" => InputKind::Move {
            x: coordinate(input, "x").unwrap_or(0.0),
            y: coordinate(input, "y").unwrap_or(0.0),
        },
        other => InputKind::Custom {
            event: other.to_string(),
        },
    };
    Ok(kind)
}

/// Decode `giveInput` params
pub fn decode_input(params: Value) -> InteractiveResult<DecodedInput> {
    let record: InputRecord = decode(params)?;
    let control = record
        .input
        .get(keys::CONTROL_ID)
        .and_then(Value::as_str)
        .map(ControlId::from)
        .ok_or_else(|| InteractiveError::UnrecognizedDataFormat("input without controlID".into()))?;
    let kind = input_kind(&record.input)?;

    Ok(DecodedInput {
        participant: record.participant,
        transaction: record.transaction.filter(|t| !t.is_empty()),
        control,
        kind,
        raw: record.input,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use interact_core::ErrorCode;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_decode_click() {
        let input = decode_input(json!({
            "participantID": "p1",
            "transactionID": "tx1",
            "input": {"controlID": "fire", "event": "mousedown", "x": 0.5, "y": 0.25}
        }))
        .unwrap();
        assert_eq!(input.control.as_str(), "fire");
        assert_eq!(input.transaction, Some(TransactionId::from("tx1")));
        assert_eq!(
            input.kind,
            InputKind::Click {
                action: ButtonAction::Down,
                x: Some(0.5),
                y: Some(0.25)
            }
        );
    }

    #[test]
    fn test_decode_kinds() {
        assert_eq!(
            input_kind(&json!({"event": "keyup"})).unwrap(),
            InputKind::Key { action: ButtonAction::Up }
        );
        assert_eq!(
            input_kind(&json!({"event": "move", "x": -1.0, "y": 1.0})).unwrap(),
            InputKind::Move { x: -1.0, y: 1.0 }
        );
        assert_eq!(
            input_kind(&json!({"event": "submit", "value": "hi"})).unwrap(),
            InputKind::Custom { event: "submit".into() }
        );
    }

    #[test]
    fn test_empty_transaction_is_none() {
        let input = decode_input(json!({
            "participantID": "p1",
            "transactionID": "",
            "input": {"controlID": "fire", "event": "mouseup"}
        }))
        .unwrap();
        assert!(input.transaction.is_none());
    }

    #[test]
    fn test_missing_control_id() {
        let err = decode_input(json!({"participantID": "p1", "input": {"event": "mouseup"}})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnrecognizedDataFormat);
    }

    const KNOWN_EVENTS: [&str; 5] = ["mousedown", "mouseup", "keydown", "keyup", "move"];

    proptest! {
        #[test]
        fn prop_unknown_events_kept_verbatim(event in "\\PC{0,24}") {
            prop_assume!(!KNOWN_EVENTS.contains(&event.as_str()));
            let kind = input_kind(&json!({"event": event.clone(), "x": 1.0}));
            prop_assert_eq!(kind, Ok(InputKind::Custom { event }));
        }

        #[test]
        fn prop_decode_keeps_participant_and_control(
            participant in "[a-z0-9]{1,12}",
            control in "[A-Za-z_]{1,12}",
            pressed in any::<bool>(),
        ) {
            let event = if pressed { "mousedown" } else { "mouseup" };
            let input = decode_input(json!({
                "participantID": participant.clone(),
                "input": {"controlID": control.clone(), "event": event},
            }))
            .unwrap();
            prop_assert_eq!(input.participant.as_str(), participant.as_str());
            prop_assert_eq!(input.control.as_str(), control.as_str());
            let expected = if pressed { ButtonAction::Down } else { ButtonAction::Up };
            let is_expected_click = matches!(input.kind, InputKind::Click { action, .. } if action == expected);
            prop_assert!(is_expected_click);
        }
    }
}
