//! Command dispatcher: drains the queue and applies commands in order.

use std::sync::Arc;

use metrics::counter;
use remora_core::metrics::{COMMANDS_APPLIED_TOTAL, COMMANDS_FAILED_TOTAL};
use remora_core::{Command, CommandQueue};
use tracing::{debug, warn};

use crate::errors::SurfaceError;
use crate::surface::RenderSurface;

/// Result of one dispatch tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Commands applied successfully.
    pub applied: usize,
    /// Commands dropped after failing.
    pub failed: usize,
}

impl DispatchReport {
    /// Commands drained this tick.
    pub fn total(&self) -> usize {
        self.applied + self.failed
    }
}

/// Applies queued commands to a surface.
pub struct Dispatcher {
    queue: Arc<CommandQueue>,
}

impl Dispatcher {
    /// A dispatcher consuming `queue`.
    pub fn new(queue: Arc<CommandQueue>) -> Self {
        Self { queue }
    }

    /// Drain the queue and apply each command in order.
    ///
    /// A failing command is logged and dropped; the rest of the batch still
    /// runs. Anything enqueued after the drain waits for the next tick.
    pub async fn tick(&self, surface: &mut dyn RenderSurface) -> DispatchReport {
        let batch = self.queue.drain();
        let mut report = DispatchReport::default();
        for command in &batch {
            let kind = command.kind();
            match apply(surface, command).await {
                Ok(()) => {
                    report.applied += 1;
                    counter!(COMMANDS_APPLIED_TOTAL, "kind" => kind).increment(1);
                    debug!(kind, "command applied");
                }
                Err(error) => {
                    report.failed += 1;
                    counter!(COMMANDS_FAILED_TOTAL, "kind" => kind).increment(1);
                    warn!(kind, %error, "command failed, dropping");
                }
            }
        }
        report
    }
}

/// Apply a single command to a surface.
pub async fn apply(surface: &mut dyn RenderSurface, command: &Command) -> Result<(), SurfaceError> {
    match command {
        Command::Navigate { url } => surface.navigate(url).await,
        Command::Click { x, y } => surface.click(*x, *y).await,
        Command::Scroll { direction, amount } => surface.scroll(direction.signed(*amount)).await,
        Command::KeyInput { key, modifiers } => {
            let target = surface
                .focused_element()
                .await?
                .ok_or(SurfaceError::NoFocusedElement)?;
            surface
                .key_input(&target, key, modifiers.with_key(key))
                .await
        }
        Command::SwitchTab { direction } => surface.switch_tab(*direction).await,
        Command::NewTab => surface.new_tab().await,
        Command::Back => surface.back().await,
        Command::Forward => surface.forward().await,
        Command::Reload => surface.reload().await,
        Command::Home => surface.home().await,
    }
}

#[cfg(test)]
mod tests {
    use remora_core::{Modifiers, ScrollDirection, TabDirection};

    use super::*;
    use crate::testing::{RecordingSurface, SurfaceCall};

    fn dispatcher(capacity: usize) -> (Dispatcher, Arc<CommandQueue>) {
        let queue = Arc::new(CommandQueue::new(capacity));
        (Dispatcher::new(Arc::clone(&queue)), queue)
    }

    #[tokio::test]
    async fn applies_in_enqueue_order() {
        let (dispatcher, queue) = dispatcher(16);
        let mut surface = RecordingSurface::new();
        let _ = queue.enqueue(Command::Navigate { url: "http://a".into() }).unwrap();
        let _ = queue.enqueue(Command::Click { x: 10, y: 20 }).unwrap();
        let _ = queue
            .enqueue(Command::Scroll {
                direction: ScrollDirection::Down,
                amount: 50,
            })
            .unwrap();

        let report = dispatcher.tick(&mut surface).await;
        assert_eq!(report, DispatchReport { applied: 3, failed: 0 });
        assert_eq!(
            surface.log().calls(),
            vec![
                SurfaceCall::Navigate("http://a".into()),
                SurfaceCall::Click(10, 20),
                SurfaceCall::Scroll(50),
            ]
        );
    }

    #[tokio::test]
    async fn order_holds_across_ticks() {
        let (dispatcher, queue) = dispatcher(16);
        let mut surface = RecordingSurface::new();
        let _ = queue.enqueue(Command::Navigate { url: "http://a".into() }).unwrap();
        let _ = dispatcher.tick(&mut surface).await;
        let _ = queue.enqueue(Command::Click { x: 10, y: 20 }).unwrap();
        let _ = queue
            .enqueue(Command::Scroll {
                direction: ScrollDirection::Up,
                amount: 5,
            })
            .unwrap();
        let _ = dispatcher.tick(&mut surface).await;
        assert_eq!(
            surface.log().calls(),
            vec![
                SurfaceCall::Navigate("http://a".into()),
                SurfaceCall::Click(10, 20),
                SurfaceCall::Scroll(-5),
            ]
        );
    }

    #[tokio::test]
    async fn empty_queue_is_noop() {
        let (dispatcher, _queue) = dispatcher(4);
        let mut surface = RecordingSurface::new();
        assert_eq!(dispatcher.tick(&mut surface).await.total(), 0);
        assert!(surface.log().calls().is_empty());
    }

    #[tokio::test]
    async fn key_without_focus_fails_and_siblings_continue() {
        let (dispatcher, queue) = dispatcher(8);
        let mut surface = RecordingSurface::new();
        surface.set_focus(None);
        let _ = queue
            .enqueue(Command::KeyInput {
                key: "a".into(),
                modifiers: Modifiers::default(),
            })
            .unwrap();
        let _ = queue.enqueue(Command::Reload).unwrap();

        let report = dispatcher.tick(&mut surface).await;
        assert_eq!(report, DispatchReport { applied: 1, failed: 1 });
        assert_eq!(surface.log().calls(), vec![SurfaceCall::Reload]);
    }

    #[tokio::test]
    async fn failing_command_does_not_abort_batch() {
        let (dispatcher, queue) = dispatcher(8);
        let mut surface = RecordingSurface::new();
        surface.fail_on("back");
        let _ = queue.enqueue(Command::Back).unwrap();
        let _ = queue.enqueue(Command::Forward).unwrap();
        let _ = queue.enqueue(Command::Home).unwrap();
        let report = dispatcher.tick(&mut surface).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.applied, 2);
        // the recording surface only logs calls that succeed
        assert_eq!(
            surface.log().calls(),
            vec![SurfaceCall::Forward, SurfaceCall::Home]
        );
    }

    #[tokio::test]
    async fn failure_is_logged_and_next_tick_still_applies() {
        let (logs, _guard) = remora_logging::capture_logs();
        let (dispatcher, queue) = dispatcher(8);
        let mut surface = RecordingSurface::new();
        surface.fail_on("reload");
        let _ = queue.enqueue(Command::Reload).unwrap();
        let _ = dispatcher.tick(&mut surface).await;

        let failed: Vec<_> = logs
            .events()
            .into_iter()
            .filter(|e| e.level == tracing::Level::WARN)
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].message.contains("command failed"));
        assert_eq!(failed[0].field("kind"), Some("reload"));
        assert!(failed[0].field("error").is_some_and(|e| e.contains("reload rejected")));

        let _ = queue.enqueue(Command::Back).unwrap();
        let report = dispatcher.tick(&mut surface).await;
        assert_eq!(report, DispatchReport { applied: 1, failed: 0 });
        assert_eq!(surface.log().calls(), vec![SurfaceCall::Back]);
        assert_eq!(logs.count_problems(), 1);
    }

    #[tokio::test]
    async fn key_input_targets_focused_element() {
        let mut surface = RecordingSurface::new();
        apply(
            &mut surface,
            &Command::KeyInput {
                key: "Shift".into(),
                modifiers: Modifiers::default(),
            },
        )
        .await
        .unwrap();
        let calls = surface.log().calls();
        assert_eq!(calls.len(), 1);
        let SurfaceCall::Key { target, key, modifiers } = &calls[0] else {
            panic!("expected key call, got {calls:?}");
        };
        assert_eq!(target, "input-1");
        assert_eq!(key, "Shift");
        assert!(modifiers.shift);
    }

    #[tokio::test]
    async fn tab_commands_map_to_surface() {
        let mut surface = RecordingSurface::new();
        for command in [
            Command::SwitchTab {
                direction: TabDirection::Prev,
            },
            Command::NewTab,
        ] {
            apply(&mut surface, &command).await.unwrap();
        }
        assert_eq!(
            surface.log().calls(),
            vec![SurfaceCall::SwitchTab(TabDirection::Prev), SurfaceCall::NewTab]
        );
    }
}
