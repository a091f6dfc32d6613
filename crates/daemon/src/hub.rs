// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Update Fan-Out Hub: a registry of outward WebSocket subscribers, indexed
//! by `task_id` and `session_id`. One central task owns every mutation to
//! the subscriber maps, so `Register`/`Unregister`/`Subscribe`/`Unsubscribe`/
//! `Broadcast` never race each other. Each client's send side is a bounded
//! channel; a slow or wedged client gets dropped rather than allowed to
//! stall a broadcast meant for everyone else.

use kandev_core::{BroadcastScope, TaskId, TaskSessionId};
use kandev_wire::Envelope;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::warn;

/// Per-client outbound channel capacity. A client this far behind is
/// considered unable to keep up; its connection is torn down rather than
/// have a broadcast block on it.
pub const CLIENT_CHANNEL_CAPACITY: usize = 256;

pub type ClientId = String;

enum HubCommand {
    Register { client_id: ClientId, sender: mpsc::Sender<Envelope> },
    Unregister { client_id: ClientId },
    Subscribe { client_id: ClientId, scope: BroadcastScope },
    Unsubscribe { client_id: ClientId, scope: BroadcastScope },
    Broadcast { scope: BroadcastScope, envelope: Envelope },
}

/// Handle to the hub's central task. Cheap to clone; every clone shares the
/// same command channel.
#[derive(Clone)]
pub struct Hub {
    cmd_tx: mpsc::Sender<HubCommand>,
}

impl Hub {
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(1024);
        tokio::spawn(run(cmd_rx));
        Self { cmd_tx }
    }

    /// Registers a new client, returning its id and the receiving half of
    /// its outbound channel to be driven by the connection's write loop.
    pub async fn register(&self) -> (ClientId, mpsc::Receiver<Envelope>) {
        let client_id = nanoid::nanoid!();
        let (sender, receiver) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
        let _ = self.cmd_tx.send(HubCommand::Register { client_id: client_id.clone(), sender }).await;
        (client_id, receiver)
    }

    pub async fn unregister(&self, client_id: ClientId) {
        let _ = self.cmd_tx.send(HubCommand::Unregister { client_id }).await;
    }

    pub async fn subscribe_task(&self, client_id: ClientId, task_id: TaskId) {
        let _ = self.cmd_tx.send(HubCommand::Subscribe { client_id, scope: BroadcastScope::Task(task_id) }).await;
    }

    pub async fn subscribe_session(&self, client_id: ClientId, session_id: TaskSessionId) {
        let _ = self
            .cmd_tx
            .send(HubCommand::Subscribe { client_id, scope: BroadcastScope::Session(session_id) })
            .await;
    }

    pub async fn unsubscribe_task(&self, client_id: ClientId, task_id: TaskId) {
        let _ = self.cmd_tx.send(HubCommand::Unsubscribe { client_id, scope: BroadcastScope::Task(task_id) }).await;
    }

    pub async fn unsubscribe_session(&self, client_id: ClientId, session_id: TaskSessionId) {
        let _ = self
            .cmd_tx
            .send(HubCommand::Unsubscribe { client_id, scope: BroadcastScope::Session(session_id) })
            .await;
    }

    pub async fn broadcast(&self, scope: BroadcastScope, envelope: Envelope) {
        let _ = self.cmd_tx.send(HubCommand::Broadcast { scope, envelope }).await;
    }
}

#[derive(Default)]
struct Registry {
    clients: HashMap<ClientId, mpsc::Sender<Envelope>>,
    by_task: HashMap<TaskId, HashSet<ClientId>>,
    by_session: HashMap<TaskSessionId, HashSet<ClientId>>,
}

impl Registry {
    fn register(&mut self, client_id: ClientId, sender: mpsc::Sender<Envelope>) {
        self.clients.insert(client_id, sender);
    }

    fn unregister(&mut self, client_id: &ClientId) {
        self.clients.remove(client_id);
        for members in self.by_task.values_mut() {
            members.remove(client_id);
        }
        for members in self.by_session.values_mut() {
            members.remove(client_id);
        }
    }

    fn subscribe(&mut self, client_id: ClientId, scope: BroadcastScope) {
        match scope {
            BroadcastScope::Task(id) => {
                self.by_task.entry(id).or_default().insert(client_id);
            }
            BroadcastScope::Session(id) => {
                self.by_session.entry(id).or_default().insert(client_id);
            }
        }
    }

    fn unsubscribe(&mut self, client_id: &ClientId, scope: BroadcastScope) {
        match scope {
            BroadcastScope::Task(id) => {
                if let Some(members) = self.by_task.get_mut(&id) {
                    members.remove(client_id);
                }
            }
            BroadcastScope::Session(id) => {
                if let Some(members) = self.by_session.get_mut(&id) {
                    members.remove(client_id);
                }
            }
        }
    }

    fn subscribers(&self, scope: &BroadcastScope) -> Vec<ClientId> {
        match scope {
            BroadcastScope::Task(id) => self.by_task.get(id).map(|s| s.iter().cloned().collect()).unwrap_or_default(),
            BroadcastScope::Session(id) => {
                self.by_session.get(id).map(|s| s.iter().cloned().collect()).unwrap_or_default()
            }
        }
    }
}

async fn run(mut cmd_rx: mpsc::Receiver<HubCommand>) {
    let mut registry = Registry::default();

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            HubCommand::Register { client_id, sender } => registry.register(client_id, sender),
            HubCommand::Unregister { client_id } => registry.unregister(&client_id),
            HubCommand::Subscribe { client_id, scope } => registry.subscribe(client_id, scope),
            HubCommand::Unsubscribe { client_id, scope } => registry.unsubscribe(&client_id, scope),
            HubCommand::Broadcast { scope, envelope } => {
                let mut dead = Vec::new();
                for client_id in registry.subscribers(&scope) {
                    let Some(sender) = registry.clients.get(&client_id) else { continue };
                    if sender.try_send(envelope.clone()).is_err() {
                        warn!(client_id = %client_id, "dropping slow update subscriber");
                        dead.push(client_id);
                    }
                }
                for client_id in dead {
                    registry.unregister(&client_id);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
