//! Actor implementation for the lifecycle manager.

use tokio::sync::mpsc;

use super::commands::LifecycleCommand;
use super::handle::LifecycleHandle;
use super::manager::LifecycleManager;
use crate::config::SwarmcastConfig;
use crate::engine::SwarmEngine;

/// Spawns the lifecycle manager actor and returns its handle.
///
/// The actor owns the streaming engine and all stream/timer state, and
/// processes commands sequentially. Teardown timer tasks feed back into the
/// same channel, so timer fires are ordered with every other operation.
pub fn spawn_lifecycle_manager<E>(config: SwarmcastConfig, engine: E) -> LifecycleHandle
where
    E: SwarmEngine,
{
    let (sender, receiver) = mpsc::channel(100);
    let manager = LifecycleManager::new(config, engine, sender.clone());

    tokio::spawn(async move {
        run_actor_loop(manager, receiver).await;
    });

    LifecycleHandle::new(sender)
}

/// Runs the main actor message processing loop.
///
/// Commands are processed one by one in arrival order, which is the whole
/// concurrency story: a timer fire and a stream open for the same identifier
/// can never mutate state simultaneously.
async fn run_actor_loop<E>(
    mut manager: LifecycleManager<E>,
    mut receiver: mpsc::Receiver<LifecycleCommand>,
) where
    E: SwarmEngine,
{
    tracing::debug!("Lifecycle manager actor started");

    while let Some(command) = receiver.recv().await {
        if !handle_command(&mut manager, command).await {
            break;
        }
    }

    tracing::debug!("Lifecycle manager actor stopped");
}

/// Handles a single command for the lifecycle manager.
/// Returns true to continue processing, false to shutdown.
async fn handle_command<E>(manager: &mut LifecycleManager<E>, command: LifecycleCommand) -> bool
where
    E: SwarmEngine,
{
    match command {
        LifecycleCommand::StreamOpened {
            info_hash,
            name,
            responder,
        } => {
            let count = manager.stream_opened(info_hash, &name);
            let _ = responder.send(count);
        }

        LifecycleCommand::StreamClosed {
            info_hash,
            name,
            responder,
        } => {
            let count = manager.stream_closed(info_hash, &name);
            let _ = responder.send(count);
        }

        LifecycleCommand::GraceElapsed { info_hash, epoch } => {
            manager.grace_elapsed(info_hash, epoch).await;
        }

        LifecycleCommand::Admit { source, responder } => {
            let result = manager.admit(source).await;
            let _ = responder.send(result);
        }

        LifecycleCommand::Reconcile { responder } => {
            let report = manager.reconcile().await;
            let _ = responder.send(report);
        }

        LifecycleCommand::Stats { responder } => {
            let stats = manager.stats().await;
            let _ = responder.send(stats);
        }

        LifecycleCommand::OpenStreams {
            info_hash,
            responder,
        } => {
            let _ = responder.send(manager.open_streams(info_hash));
        }

        LifecycleCommand::Shutdown { responder } => {
            tracing::debug!("Lifecycle manager actor shutting down");
            let _ = responder.send(());
            return false; // Signal to break out of the loop
        }
    }
    true // Continue processing
}
