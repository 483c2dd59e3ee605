mod game;
mod input;
mod lobby;
mod network;
mod rendering;

use clap::Parser;
use game::{MatchState, Screen};
use input::InputManager;
use lobby::{LobbyAction, LobbyState};
use log::{info, warn};
use macroquad::prelude::*;
use network::SyncClient;
use rendering::Renderer;
use shared::{WORLD_HEIGHT, WORLD_WIDTH};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the relay server
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3000/ws")]
    server: String,
}

/// State the network handlers and the frame loop both touch.
struct App {
    screen: Screen,
    lobby: LobbyState,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Pong Netplay".to_string(),
        window_width: WORLD_WIDTH as i32,
        window_height: WORLD_HEIGHT as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Server: {}", args.server);
    info!("Controls: W/S to move, C create, R refresh, Enter join, Esc leave");

    // macroquad owns the frame loop, so tokio runs on its own runtime and
    // the connection tasks are spawned into it.
    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return;
        }
    };
    let _guard = runtime.enter();

    let app = Rc::new(RefCell::new(App {
        screen: Screen::Lobby,
        lobby: LobbyState::new(),
    }));

    let mut client = SyncClient::new();
    wire_handlers(&mut client, &app);

    connect(&mut client, &runtime, &args.server, &mut app.borrow_mut().lobby);

    let mut input_manager = InputManager::new();
    let mut renderer = Renderer::new();

    loop {
        let frame_input = input_manager.update();
        client.poll();

        let mut app_ref = app.borrow_mut();
        let app = &mut *app_ref;
        match &mut app.screen {
            Screen::Lobby => {
                match app.lobby.handle_input(&frame_input) {
                    Some(LobbyAction::CreateRoom) => {
                        if let Err(e) = client.create_room(WORLD_HEIGHT / 2.0) {
                            warn!("Create room failed: {}", e);
                        }
                    }
                    Some(LobbyAction::JoinRoom(room_id)) => {
                        if let Err(e) = client.join_room(&room_id, WORLD_HEIGHT / 2.0) {
                            warn!("Join room failed: {}", e);
                        }
                    }
                    Some(LobbyAction::RefreshList) => {
                        if !client.is_connected() {
                            connect(&mut client, &runtime, &args.server, &mut app.lobby);
                        }
                        if let Err(e) = client.list_rooms() {
                            warn!("Room list request failed: {}", e);
                        }
                    }
                    None => {}
                }

                renderer.render_lobby(&app.lobby, client.is_connected());
            }
            Screen::Match(state) => {
                let mut leave = frame_input.back || state.countdown_expired();

                if !client.is_connected() {
                    app.lobby.set_status("connection to server lost");
                    leave = true;
                }

                if leave {
                    // One connection carries one match: leaving means a
                    // fresh connection and a fresh side assignment.
                    client.disconnect();
                    app.screen = Screen::Lobby;
                    connect(&mut client, &runtime, &args.server, &mut app.lobby);
                } else {
                    let dt = get_frame_time();

                    if state.move_paddle(frame_input.paddle_direction, dt) {
                        if let Err(e) = client.send_paddle(state.local_paddle_y()) {
                            warn!("Paddle update failed: {}", e);
                        }
                    }

                    if let Some(snapshot) = state.advance(dt) {
                        if let Err(e) = client.send_ball(snapshot) {
                            warn!("Ball snapshot failed: {}", e);
                        }
                    }

                    renderer.render_match(state, client.room_id());
                }
            }
        }

        next_frame().await;
    }
}

/// Registers every network handler against the shared app state. Handlers
/// run only from `poll()` on the frame loop.
fn wire_handlers(client: &mut SyncClient, app: &Rc<RefCell<App>>) {
    let slot = Rc::clone(app);
    client.on_room_created(move |room_id| {
        info!("Created room {}", room_id);
        let mut app = slot.borrow_mut();
        app.lobby.clear_status();
        app.screen = Screen::Match(MatchState::new(true));
    });

    let slot = Rc::clone(app);
    client.on_room_joined(move |room_id| {
        info!("Joined room {}", room_id);
        let mut app = slot.borrow_mut();
        app.lobby.clear_status();
        app.screen = Screen::Match(MatchState::new(false));
    });

    let slot = Rc::clone(app);
    client.on_room_list(move |rooms| {
        slot.borrow_mut().lobby.set_rooms(rooms);
    });

    let slot = Rc::clone(app);
    client.on_roster_update(move |roster| {
        if let Screen::Match(state) = &mut slot.borrow_mut().screen {
            state.apply_roster(roster);
        }
    });

    let slot = Rc::clone(app);
    client.on_match_started(move |started| {
        if let Screen::Match(state) = &mut slot.borrow_mut().screen {
            state.set_started(started);
        }
    });

    let slot = Rc::clone(app);
    client.on_ball_sync(move |ball| {
        if let Screen::Match(state) = &mut slot.borrow_mut().screen {
            state.adopt_snapshot(ball);
        }
    });

    let slot = Rc::clone(app);
    client.on_peer_left(move || {
        info!("Peer left the match");
        if let Screen::Match(state) = &mut slot.borrow_mut().screen {
            state.peer_left();
        }
    });

    let slot = Rc::clone(app);
    client.on_error(move |kind, message| {
        warn!("Server rejected request ({:?}): {}", kind, message);
        slot.borrow_mut().lobby.set_status(message);
    });
}

/// Connects and requests the initial room list; failures land on the
/// lobby status line so the player can retry with R.
fn connect(client: &mut SyncClient, runtime: &Runtime, url: &str, lobby: &mut LobbyState) {
    match runtime.block_on(client.connect(url)) {
        Ok(()) => {
            info!("Connected to {}", url);
            if let Err(e) = client.list_rooms() {
                warn!("Room list request failed: {}", e);
            }
        }
        Err(e) => {
            warn!("Connection to {} failed: {}", url, e);
            lobby.set_status(format!("cannot reach server ({}) - press R to retry", e));
        }
    }
}
