/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines progress reporting messages, sinks, and helper functions for long-running processes.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Progress reporting primitives for the coarsening engine.

use std::fmt::Debug;
use std::sync::{Arc, mpsc};
use std::thread;

use crate::selection::SelectionReport;

/// Progress events emitted during point selection and interpolation.
#[derive(Debug, Clone)]
pub enum ProgressMsg {
    /// Event indicating a completed greedy point selection.
    Selection(SelectionReport),

    /// Event indicating the outcome of a live reselection check.
    ReselectionCheck {
        error: f64,
        error_max: f64,
        tol: f64,
        reselection: bool,
    },

    /// Arbitrary informational message.
    Message { message: String },
}

/// Sink that consumes progress messages.
pub trait ProgressSink: Send + Sync + Debug {
    fn emit(&self, msg: ProgressMsg);
}

/// Progress sink that forwards messages over a channel.
#[derive(Debug)]
pub struct ClosureSink {
    tx: mpsc::SyncSender<ProgressMsg>,
}

impl ProgressSink for ClosureSink {
    #[inline]
    fn emit(&self, msg: ProgressMsg) {
        let _ = self.tx.try_send(msg);
    }
}

/// Spawns a listener thread that runs a handler closure for each progress message.
pub fn closure_sink<F>(
    buffer: usize,
    mut handler: F,
) -> (Arc<dyn ProgressSink>, thread::JoinHandle<()>)
where
    F: FnMut(ProgressMsg) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<ProgressMsg>(buffer.max(1));
    let sink: Arc<dyn ProgressSink> = Arc::new(ClosureSink { tx });

    let handle = thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            handler(msg);
        }
    });

    (sink, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_sink_delivers_messages_in_order() {
        let (sink, handle) = closure_sink(16, |msg| {
            if let ProgressMsg::Message { message } = msg {
                assert!(message.starts_with("step"));
            }
        });

        for step in 0..4 {
            sink.emit(ProgressMsg::Message {
                message: format!("step {step}"),
            });
        }

        drop(sink);
        handle.join().unwrap();
    }
}
