// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Off-thread diagram rendering.
//!
//! A [`DiagramWorker`] owns a [`DiagramEngine`] on a dedicated thread. The host sends
//! [`HostMessage`]s and receives [`WorkerMessage`]s; nothing else is shared. Draw requests that
//! arrive while the worker is busy are coalesced, so only the most recent one is rendered.

use crate::{
    draw::Scene,
    errors::WorkerError,
    layout::{DiagramEngine, ScreenSize, ViewId},
    model::{ConjectureViolation, LogData},
    style::{Style, TextMeasure},
};
use serde::Serialize;
use std::{any::Any, thread::JoinHandle};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Everything the worker needs to start laying out diagrams.
#[derive(Clone, Debug)]
pub struct InitRequest {
    /// The parsed log.
    pub data: LogData,
    /// Conjecture violations to mark.
    pub conjectures: Vec<ConjectureViolation>,
    /// The initial style.
    pub style: Style,
    /// The screen the diagrams are shown on.
    pub screen: ScreenSize,
}

/// A message from the host to the worker.
#[derive(Clone, Debug)]
pub enum HostMessage {
    /// Loads a log, replacing any earlier one.
    Init(Box<InitRequest>),

    /// The font or theme changed. Every cached layout is dropped.
    SettingsChanged {
        /// The new style.
        style: Style,
    },

    /// Renders a view.
    Draw {
        /// The view to render.
        view: ViewId,
        /// The first time to show, for execution and CPU views.
        start_time: u64,
    },
}

/// A message from the worker to the host.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerMessage {
    /// A view was rendered.
    Rendered {
        /// The view.
        view: ViewId,
        /// The laid out view.
        scene: Scene,
        /// Canvas width in pixels.
        width: f64,
        /// Canvas height in pixels.
        height: f64,
        /// If the view was cut short, the time of the last timestamp drawn.
        exceed_time: Option<u64>,
    },
}

/// Handle to a diagram worker thread.
///
/// [`finish`](Self::finish) should be called before the handle is dropped to observe panics.
#[derive(Debug)]
pub struct DiagramWorker {
    // Invariant: sender is always Some until finish is called.
    sender: Option<UnboundedSender<HostMessage>>,
    receiver: UnboundedReceiver<WorkerMessage>,
    handle: JoinHandle<()>,
}

impl DiagramWorker {
    /// Starts a worker thread. `make_measure` is called each time a log is loaded.
    pub fn spawn<F>(make_measure: F) -> Result<Self, WorkerError>
    where
        F: Fn() -> Box<dyn TextMeasure> + Send + 'static,
    {
        let (sender, requests) = mpsc::unbounded_channel();
        let (responses, receiver) = mpsc::unbounded_channel();
        let handle = std::thread::Builder::new()
            .name("vdm-diagram-worker".to_owned())
            .spawn(move || run(make_measure, requests, responses))
            .map_err(WorkerError::Spawn)?;

        Ok(Self {
            sender: Some(sender),
            receiver,
            handle,
        })
    }

    /// Sends a message to the worker.
    pub fn send(&self, message: HostMessage) -> Result<(), WorkerError> {
        self.sender
            .as_ref()
            .ok_or(WorkerError::Closed)?
            .send(message)
            .map_err(|_| WorkerError::Closed)
    }

    /// Waits for the next message from the worker.
    ///
    /// Returns `None` once the worker has exited.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.receiver.recv().await
    }

    /// Blocks until the next message from the worker arrives. Must not be called from within an
    /// async runtime.
    pub fn blocking_recv(&mut self) -> Option<WorkerMessage> {
        self.receiver.blocking_recv()
    }

    /// Stops the worker and waits for its thread to exit.
    pub fn finish(mut self) -> Result<(), WorkerError> {
        // Dropping the sender ends the worker's receive loop.
        std::mem::drop(self.sender.take());

        self.handle.join().map_err(|panic_payload| WorkerError::Panic {
            message: panic_payload_to_string(panic_payload),
        })
    }
}

fn panic_payload_to_string(payload: Box<dyn Any + Send + 'static>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(unknown panic payload)".to_owned()
    }
}

fn run<F>(
    make_measure: F,
    mut requests: UnboundedReceiver<HostMessage>,
    responses: UnboundedSender<WorkerMessage>,
) where
    F: Fn() -> Box<dyn TextMeasure>,
{
    let mut engine: Option<DiagramEngine> = None;

    while let Some(first) = requests.blocking_recv() {
        // Everything queued so far is handled in order, except that only the last draw survives.
        let mut pending_draw = None;
        let mut next = Some(first);
        while let Some(message) = next {
            match message {
                HostMessage::Init(init) => {
                    let InitRequest {
                        data,
                        conjectures,
                        style,
                        screen,
                    } = *init;
                    debug!(
                        "diagram worker loaded {} events on {} CPUs",
                        data.execution_events.len(),
                        data.cpu_decls.len()
                    );
                    engine = Some(DiagramEngine::new(
                        data,
                        conjectures,
                        style,
                        make_measure(),
                        screen,
                    ));
                }
                HostMessage::SettingsChanged { style } => match &mut engine {
                    Some(engine) => engine.update_style(style),
                    None => warn!("ignoring settings change received before a log was loaded"),
                },
                HostMessage::Draw { view, start_time } => {
                    if let Some((skipped, _)) = pending_draw.replace((view, start_time)) {
                        debug!("draw request for {skipped} superseded by {view}");
                    }
                }
            }

            next = requests.try_recv().ok();
        }

        let Some((view, start_time)) = pending_draw else {
            continue;
        };
        let Some(engine) = &mut engine else {
            warn!("ignoring draw request for {view} received before a log was loaded");
            continue;
        };
        let result = engine.render(view, start_time);
        let message = WorkerMessage::Rendered {
            view: result.view,
            width: result.scene.width,
            height: result.scene.height,
            scene: result.scene,
            exceed_time: result.exceed_time,
        };
        if responses.send(message).is_err() {
            // The host has gone away.
            break;
        }
    }
}
