//! Terminal frontend.
//!
//! Reads commands from standard input and prints what the backend pushes:
//! the notification bell and panel, permission prompts, native alerts and
//! work entries.

use anyhow::Context;
use kbs_bridge::notification::NotificationDescriptor;
use kbs_bridge::permission::PermissionState;
use kbs_bridge::{MessageFromBackend, MessageToBackend};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::commands::Command;
use crate::panel::Panel;

pub mod commands;
pub mod formatting;
pub mod panel;

#[derive(Clone)]
pub struct BackendBridge {
    pub to_backend: mpsc::Sender<MessageToBackend>,
}

impl BackendBridge {
    pub async fn send(&self, message: MessageToBackend) -> anyhow::Result<()> {
        self.to_backend
            .send(message)
            .await
            .context("backend is no longer running")
    }

    pub async fn request_config(&self) -> anyhow::Result<()> {
        self.send(MessageToBackend::ConfigurationRequest).await
    }

    pub async fn request_notifications(&self) -> anyhow::Result<()> {
        self.send(MessageToBackend::NotificationsRequest).await
    }

    pub async fn request_permission_state(&self) -> anyhow::Result<()> {
        self.send(MessageToBackend::PermissionStateRequest).await
    }
}

/// What to do for a typed command.
#[derive(Debug, PartialEq)]
pub enum Action {
    Send(MessageToBackend),
    Print(String),
    Quit,
}

/// Resolves a command against the current panel state.
pub fn action_for(command: Command, panel: &mut Panel) -> Action {
    let message = match command {
        Command::List => return Action::Print(panel.render()),
        Command::Help => return Action::Print(commands::HELP.to_string()),
        Command::Quit => return Action::Quit,
        Command::Read(id) => MessageToBackend::MarkAsRead(id),
        Command::Clear(id) => MessageToBackend::ClearNotification(id),
        Command::ClearAll => MessageToBackend::ClearAllNotifications,
        Command::Add {
            notification_type,
            title,
            message,
        } => MessageToBackend::AddNotification(NotificationDescriptor::new(
            notification_type,
            title,
            message,
        )),
        Command::Enable => {
            // a denied permission cannot be prompted for again
            if panel.permission == PermissionState::Denied {
                return Action::Print(
                    "Push notifications are blocked. Allow them in the system settings first."
                        .to_string(),
                );
            }
            MessageToBackend::RequestPermission
        }
        Command::Answer(decision) => {
            if !panel.prompt_pending {
                return Action::Print("No permission prompt is waiting for an answer".to_string());
            }
            panel.prompt_pending = false;
            MessageToBackend::PermissionDecision(decision)
        }
        Command::Reset(permission) => MessageToBackend::PermissionReset(permission),
        Command::Click(tag) => MessageToBackend::NativeNotificationClicked(tag),
        Command::Entries(filter) => MessageToBackend::WorkEntriesRequest(filter),
        Command::Delete(id) => MessageToBackend::DeleteWorkEntry(id),
        Command::Save(entry) => MessageToBackend::SaveWorkEntry(entry),
        Command::Config => MessageToBackend::ConfigurationRequest,
    };
    Action::Send(message)
}

async fn run_console(
    mut rx: mpsc::Receiver<MessageFromBackend>,
    bridge: BackendBridge,
) -> anyhow::Result<()> {
    let mut panel = Panel::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    bridge.request_config().await?;
    bridge.request_notifications().await?;
    bridge.request_permission_state().await?;
    println!("Type `help` for the list of commands");

    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else {
                    log::warn!("Backend closed the bridge");
                    break;
                };
                log::debug!("Got a message from backend: {message:?}");
                if let Some(text) = panel.handle(message) {
                    println!("{text}");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(command)) => match action_for(command, &mut panel) {
                        Action::Send(message) => bridge.send(message).await?,
                        Action::Print(text) => println!("{text}"),
                        Action::Quit => break,
                    },
                    Ok(None) => {}
                    Err(error) => println!("{error:#}"),
                }
            }
        }
    }

    Ok(())
}

/// Runs the console until the user quits, input ends or the backend stops.
pub fn run(
    rx: mpsc::Receiver<MessageFromBackend>,
    tx: mpsc::Sender<MessageToBackend>,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build console runtime")?;

    let bridge = BackendBridge { to_backend: tx };
    let result = runtime.block_on(run_console(rx, bridge));
    // a pending stdin read would otherwise keep the runtime alive
    runtime.shutdown_background();
    result
}
