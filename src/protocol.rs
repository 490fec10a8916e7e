use serde_json::{json, Value};

use crate::types::{Direction, GameConfig, GameSummary, InputCommand, Snapshot, WorldInit};

#[derive(Debug, PartialEq)]
pub enum ClientMessage {
    Input { dir: Direction },
    Restart,
    Quit,
    Ping { t: f64 },
}

impl ClientMessage {
    /// Commands the engine consumes directly; session-level messages map to `None`.
    pub fn to_command(&self) -> Option<InputCommand> {
        match self {
            ClientMessage::Input { dir } => Some(InputCommand::Turn(*dir)),
            ClientMessage::Quit => Some(InputCommand::Quit),
            ClientMessage::Restart | ClientMessage::Ping { .. } => None,
        }
    }
}

pub fn parse_client_message(raw: &str) -> Option<ClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ClientMessage::Input { dir })
        }
        "restart" => Some(ClientMessage::Restart),
        "quit" => Some(ClientMessage::Quit),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ClientMessage::Ping { t })
        }
        _ => None,
    }
}

pub fn game_init_message(
    session_id: &str,
    world: &WorldInit,
    config: &GameConfig,
    controller: bool,
) -> Value {
    json!({
        "type": "game_init",
        "sessionId": session_id,
        "world": world,
        "config": config,
        "controller": controller,
    })
}

pub fn state_message(snapshot: &Snapshot) -> Value {
    json!({
        "type": "state",
        "snapshot": snapshot,
    })
}

pub fn game_over_message(summary: &GameSummary) -> Value {
    json!({
        "type": "game_over",
        "summary": summary,
    })
}

pub fn pong_message(t: f64) -> Value {
    json!({
        "type": "pong",
        "t": t,
    })
}

pub fn error_message(message: &str) -> Value {
    json!({
        "type": "error",
        "message": message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GameEngine;

    #[test]
    fn parse_input_message() {
        let parsed = parse_client_message(r#"{"type":"input","dir":"left"}"#);
        assert_eq!(
            parsed,
            Some(ClientMessage::Input {
                dir: Direction::Left
            })
        );
        assert_eq!(
            parsed.and_then(|message| message.to_command()),
            Some(InputCommand::Turn(Direction::Left))
        );
    }

    #[test]
    fn parse_input_rejects_missing_or_invalid_direction() {
        assert!(parse_client_message(r#"{"type":"input"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","dir":"none"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","dir":3}"#).is_none());
    }

    #[test]
    fn parse_session_messages() {
        assert_eq!(
            parse_client_message(r#"{"type":"restart"}"#),
            Some(ClientMessage::Restart)
        );
        let quit = parse_client_message(r#"{"type":"quit"}"#).expect("quit parses");
        assert_eq!(quit.to_command(), Some(InputCommand::Quit));
        assert_eq!(ClientMessage::Restart.to_command(), None);
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        assert_eq!(
            parse_client_message(r#"{"type":"ping","t":12.5}"#),
            Some(ClientMessage::Ping { t: 12.5 })
        );
        assert!(parse_client_message(r#"{"type":"ping","t":"x"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"ping"}"#).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_client_message("not json").is_none());
        assert!(parse_client_message("[1,2]").is_none());
        assert!(parse_client_message(r#"{"type":"hello"}"#).is_none());
    }

    #[test]
    fn server_messages_carry_type_tags() {
        let mut engine = GameEngine::classic(4);
        engine.step(16);
        let init = game_init_message("s-1", &engine.get_world_init(), &engine.config, true);
        assert_eq!(init["type"], "game_init");
        assert_eq!(init["world"]["tiles"].as_array().map(Vec::len), Some(24));
        assert_eq!(init["config"]["tickRate"], 60);

        let state = state_message(&engine.build_snapshot(true));
        assert_eq!(state["type"], "state");
        assert_eq!(state["snapshot"]["entities"][0]["kind"]["kind"], "player");
        assert_eq!(state["snapshot"]["entities"][1]["kind"]["name"], "blinky");
        assert_eq!(state["snapshot"]["events"][0]["type"], "ghost_released");

        let over = game_over_message(&engine.build_summary());
        assert_eq!(over["summary"]["status"], "running");
        assert_eq!(pong_message(3.0)["t"], 3.0);
        assert_eq!(error_message("bad")["message"], "bad");
    }
}
