use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use maze_chase::engine::GameEngine;
use maze_chase::log::{default_session_id, emit_log, now_ms};
use maze_chase::protocol::{
    error_message, game_init_message, game_over_message, parse_client_message, pong_message,
    state_message, ClientMessage,
};
use maze_chase::types::{GameConfig, GameEvent, InputCommand};
use maze_chase::world::classic_world;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Listen port; falls back to $PORT, then 8080.
    #[arg(long)]
    port: Option<u16>,
    /// Seed of the first session; falls back to $GAME_SEED, then a random seed.
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    tick_rate: Option<u32>,
    #[arg(long)]
    pursuit: Option<f32>,
}

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    controller_id: Option<String>,
    config: GameConfig,
    fixed_seed: Option<u32>,
    game: Option<GameEngine>,
    session_id: String,
    seed: u32,
    clock: TickClock,
}

/// Turns tick instants into whole-millisecond steps, carrying the sub-ms rest
/// so the engine clock keeps pace with real time.
#[derive(Clone, Copy, Debug, Default)]
struct TickClock {
    last: Option<Instant>,
    carry_us: u64,
}

impl TickClock {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn advance(&mut self, now: Instant) -> u64 {
        let Some(last) = self.last.replace(now) else {
            return 0;
        };
        let total_us = self.carry_us + now.duration_since(last).as_micros() as u64;
        self.carry_us = total_us % 1_000;
        total_us / 1_000
    }
}

impl ServerState {
    fn new(config: GameConfig, fixed_seed: Option<u32>) -> Self {
        Self {
            clients: HashMap::new(),
            controller_id: None,
            config,
            fixed_seed,
            game: None,
            session_id: String::new(),
            seed: 0,
            clock: TickClock::default(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let port = cli
        .port
        .or_else(|| {
            std::env::var("PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
        })
        .unwrap_or(8080);
    let fixed_seed = cli.seed.or_else(|| {
        std::env::var("GAME_SEED")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
    });

    let mut config = GameConfig::default();
    if let Some(tick_rate) = cli.tick_rate {
        config.tick_rate = tick_rate;
    }
    if let Some(pursuit) = cli.pursuit {
        config.pursuit_probability = pursuit;
    }
    let config = config.sanitized();
    let tick_rate = config.tick_rate;

    let state = Arc::new(Mutex::new(ServerState::new(config, fixed_seed)));
    start_tick_loop(state.clone(), tick_rate);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        println!(
            "[server] static file root: {}",
            static_dir.to_string_lossy()
        );
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        eprintln!("[server] static file root not found. set STATIC_DIR to serve a renderer.");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    println!("[server] listening on :{port} at {tick_rate} ticks/s");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("static"), PathBuf::from("dist/client")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(client_id.clone(), ClientContext { tx: tx.clone() });
        if guard.controller_id.is_none() {
            guard.controller_id = Some(client_id.clone());
        }
        if guard.game.is_none() {
            start_session(&mut guard);
        } else {
            send_game_init(&mut guard, &client_id);
        }
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        disconnect_client_internal(&mut guard, &client_id);
    }
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    if let ClientMessage::Ping { t } = message {
        send_to_client(
            &mut guard,
            client_id,
            &pong_message(t),
            QueuePolicy::DisconnectOnFull,
        );
        return;
    }

    if guard.controller_id.as_deref() != Some(client_id) {
        send_to_client(
            &mut guard,
            client_id,
            &error_message("only the controlling client can steer"),
            QueuePolicy::DisconnectOnFull,
        );
        return;
    }

    match message {
        ClientMessage::Restart => {
            if let Some(game) = guard.game.as_ref() {
                let summary = game.build_summary();
                let session_id = guard.session_id.clone();
                emit_log(
                    "info",
                    "session_abandoned",
                    &session_id,
                    Some(guard.seed),
                    Some(summary.ticks),
                    json!({ "score": summary.score }),
                );
            }
            start_session(&mut guard);
        }
        other => {
            let Some(command) = other.to_command() else {
                return;
            };
            if let Some(game) = guard.game.as_mut() {
                game.receive_input(command);
            } else if command != InputCommand::Quit {
                send_to_client(
                    &mut guard,
                    client_id,
                    &error_message("no running session, send restart"),
                    QueuePolicy::DisconnectOnFull,
                );
            }
        }
    }
}

fn start_session(state: &mut ServerState) {
    let seed = match state.fixed_seed {
        Some(seed) if state.game.is_none() && state.session_id.is_empty() => seed,
        Some(_) => state.seed.wrapping_add(1),
        None => rand::rng().random::<u32>(),
    };
    state.seed = seed;
    state.session_id = default_session_id("session", seed, now_ms());
    state.game = Some(GameEngine::new(classic_world(), state.config.clone(), seed));
    state.clock.reset();

    emit_log(
        "info",
        "session_started",
        &state.session_id,
        Some(seed),
        Some(0),
        json!({
            "config": state.config,
            "clients": state.clients.len(),
        }),
    );

    let client_ids: Vec<String> = state.clients.keys().cloned().collect();
    for client_id in client_ids {
        send_game_init(state, &client_id);
    }
}

fn send_game_init(state: &mut ServerState, client_id: &str) {
    let Some(game) = state.game.as_ref() else {
        return;
    };
    let controller = state.controller_id.as_deref() == Some(client_id);
    let message = game_init_message(
        &state.session_id,
        &game.get_world_init(),
        &state.config,
        controller,
    );
    send_to_client(state, client_id, &message, QueuePolicy::DisconnectOnFull);
}

fn disconnect_client_internal(state: &mut ServerState, client_id: &str) {
    let Some(client) = state.clients.remove(client_id) else {
        return;
    };
    let _ = client.tx.try_send(OutboundMessage::Close {
        code: 1000,
        reason: "disconnected".to_string(),
    });

    if state.controller_id.as_deref() != Some(client_id) {
        return;
    }
    state.controller_id = choose_next_controller(state);
    if let Some(next) = state.controller_id.clone() {
        send_game_init(state, &next);
    }
}

/// Oldest remaining connection takes over the player.
fn choose_next_controller(state: &ServerState) -> Option<String> {
    state
        .clients
        .keys()
        .min_by_key(|client_id| client_order_key(client_id))
        .cloned()
}

fn start_tick_loop(state: SharedState, tick_rate: u32) {
    tokio::spawn(async move {
        let period = Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut ServerState) {
    let dt_ms = state.clock.advance(Instant::now());

    let session_id = state.session_id.clone();
    let seed = state.seed;
    let (snapshot, summary) = {
        let Some(game) = state.game.as_mut() else {
            return;
        };
        game.step(dt_ms);
        let snapshot = game.build_snapshot(true);
        let summary = game.is_ended().then(|| game.build_summary());
        (snapshot, summary)
    };

    for event in &snapshot.events {
        log_game_event(&session_id, seed, snapshot.tick, event);
    }
    broadcast(state, &state_message(&snapshot), QueuePolicy::DropOnFull);

    if let Some(summary) = summary {
        emit_log(
            "info",
            "session_finished",
            &session_id,
            Some(seed),
            Some(summary.ticks),
            json!({
                "status": summary.status,
                "score": summary.score,
                "durationMs": summary.duration_ms,
                "pickupsLeft": summary.pickups_left,
            }),
        );
        broadcast(
            state,
            &game_over_message(&summary),
            QueuePolicy::DisconnectOnFull,
        );
        state.game = None;
    }
}

fn log_game_event(session_id: &str, seed: u32, tick: u64, event: &GameEvent) {
    let name = match event {
        GameEvent::PowerModeStarted { .. } => "power_mode_started",
        GameEvent::PowerModeEnded => "power_mode_ended",
        GameEvent::GhostEaten { .. } => "ghost_eaten",
        GameEvent::PlayerDied { .. } => "player_died",
        GameEvent::Won => "session_won",
        GameEvent::Lost => "session_lost",
        GameEvent::Quit => "session_quit",
        GameEvent::PickupEaten { .. }
        | GameEvent::GhostReleased { .. }
        | GameEvent::GhostRevived { .. } => return,
    };
    let details = serde_json::to_value(event).unwrap_or(Value::Null);
    emit_log("info", name, session_id, Some(seed), Some(tick), details);
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client_internal(state, client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        disconnect_client_internal(state, &client_id);
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &error_message(message),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

fn client_order_key(client_id: &str) -> u64 {
    client_id
        .rsplit('_')
        .next()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_chase::types::Tile;
    use maze_chase::world::World;

    fn state_with_clients(ids: &[&str]) -> (ServerState, Vec<mpsc::Receiver<OutboundMessage>>) {
        let mut state = ServerState::new(GameConfig::default(), Some(11));
        let mut receivers = Vec::new();
        for id in ids {
            let (tx, rx) = mpsc::channel(64);
            state
                .clients
                .insert((*id).to_string(), ClientContext { tx });
            receivers.push(rx);
        }
        (state, receivers)
    }

    fn drain_types(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<String> {
        let mut types = Vec::new();
        while let Ok(OutboundMessage::Text(payload)) = rx.try_recv() {
            let value: Value = serde_json::from_str(&payload).expect("server sends json");
            types.push(value["type"].as_str().unwrap_or_default().to_string());
        }
        types
    }

    #[test]
    fn tick_clock_keeps_pace_with_sixty_hertz() {
        let period = Duration::from_micros(1_000_000 / 60);
        let start = Instant::now();
        let mut clock = TickClock::default();
        let world = World::from_layout(
            &["#####", "#   #", "#####", "# . #", "#####"],
            Tile::new(1, 1),
            Tile::new(3, 1),
        )
        .expect("sealed layout");
        let mut engine = GameEngine::new(world, GameConfig::default(), 3);
        let mut released = 0;

        assert_eq!(clock.advance(start), 0);
        for n in 1..=301u32 {
            engine.step(clock.advance(start + period * n));
            released += engine
                .build_snapshot(true)
                .events
                .iter()
                .filter(|event| matches!(event, GameEvent::GhostReleased { .. }))
                .count();
        }

        let real_ms = (period * 301).as_millis() as u64;
        assert_eq!(engine.elapsed_ms(), real_ms);
        assert_eq!(released, 2);
    }

    #[test]
    fn client_order_key_uses_numeric_suffix() {
        assert_eq!(client_order_key("client_12"), 12);
        assert_eq!(client_order_key("client_x"), u64::MAX);
    }

    #[test]
    fn first_session_uses_fixed_seed_and_restart_advances_it() {
        let (mut state, _receivers) = state_with_clients(&["client_1"]);
        start_session(&mut state);
        assert_eq!(state.seed, 11);
        start_session(&mut state);
        assert_eq!(state.seed, 12);
        assert!(state.session_id.starts_with("session-12-"));
    }

    #[test]
    fn controller_passes_to_oldest_remaining_client() {
        let (mut state, mut receivers) = state_with_clients(&["client_3", "client_7", "client_5"]);
        state.controller_id = Some("client_3".to_string());
        start_session(&mut state);
        disconnect_client_internal(&mut state, "client_3");
        assert_eq!(state.controller_id.as_deref(), Some("client_5"));
        assert_eq!(drain_types(&mut receivers[2]), vec!["game_init", "game_init"]);
        assert_eq!(drain_types(&mut receivers[1]), vec!["game_init"]);
    }

    #[test]
    fn tick_broadcasts_state_and_game_over_after_quit() {
        let (mut state, mut receivers) = state_with_clients(&["client_1"]);
        state.controller_id = Some("client_1".to_string());
        start_session(&mut state);
        tick_game(&mut state);
        if let Some(game) = state.game.as_mut() {
            game.receive_input(InputCommand::Quit);
        }
        tick_game(&mut state);
        assert!(state.game.is_none());
        assert_eq!(
            drain_types(&mut receivers[0]),
            vec!["game_init", "state", "state", "game_over"]
        );
    }
}
