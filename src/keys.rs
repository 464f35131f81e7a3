use crate::app::App;
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use esports_api::ListName;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    let mut guard = app.lock().await;

    match (guard.state.show_detail, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Manual refresh, same cooldown and cancellation as the timer
        (_, Char('r'), _) => {
            drop(guard);
            let _ = network_requests
                .send(NetworkRequest::Refresh { manual: true })
                .await;
        }

        // Detail popup
        (true, KeyCode::Esc | KeyCode::Enter, _) => guard.close_detail(),
        (false, KeyCode::Enter, _) => guard.open_detail(),

        // List navigation
        (_, KeyCode::Tab | KeyCode::BackTab, _) => guard.switch_focus(),
        (_, Char('h') | KeyCode::Left, _) => guard.focus(ListName::Live),
        (_, Char('l') | KeyCode::Right, _) => guard.focus(ListName::Upcoming),
        (_, Char('j') | KeyCode::Down, _) => guard.select_next(),
        (_, Char('k') | KeyCode::Up, _) => guard.select_prev(),

        // Global
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }
}
