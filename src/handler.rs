// Copyright (c) Microsoft Corporation. All rights reserved.

//! Output handler and progress callbacks.
//!
//! An [`OutputHandler`] sees every unit of streamed command output before it
//! is buffered in the [`CommandResult`](crate::CommandResult) and decides
//! whether it is kept, dropped, or whether the command is cancelled.
//! A [`Progress`] receives progress events of long-running commands.

use crate::message::Message;
use crate::result::Record;
use crate::types::ProgressEvent;

/// What to do with a unit of output after an [`OutputHandler`] saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerResult {
    /// The handler consumed the output; it is not buffered.
    Handled,
    /// Buffer the output in the command result as usual.
    #[default]
    Report,
    /// Stop the command. Nothing further is buffered or handed to the handler.
    Cancel,
}

/// Intercepts streamed command output.
///
/// Every method defaults to [`HandlerResult::Report`], so implementors only
/// override what they care about. Returning [`HandlerResult::Handled`] from
/// [`output_message`](Self::output_message) also keeps the message out of the
/// result's error and warning lists.
pub trait OutputHandler: Send {
    fn output_stat(&mut self, _record: &Record) -> HandlerResult {
        HandlerResult::Report
    }

    fn output_info(&mut self, _level: i32, _text: &str) -> HandlerResult {
        HandlerResult::Report
    }

    fn output_text(&mut self, _text: &str) -> HandlerResult {
        HandlerResult::Report
    }

    fn output_binary(&mut self, _data: &[u8]) -> HandlerResult {
        HandlerResult::Report
    }

    fn output_message(&mut self, _message: &Message) -> HandlerResult {
        HandlerResult::Report
    }
}

/// Receives progress notifications for long-running commands (sync, submit).
///
/// All methods default to doing nothing.
pub trait Progress: Send {
    /// A new progress indicator of the given kind starts.
    fn init(&mut self, _kind: i32) {}

    fn set_description(&mut self, _description: &str, _units: i32) {}

    fn set_total(&mut self, _total: i64) {}

    fn update(&mut self, _position: i64) {}

    fn done(&mut self, _failed: bool) {}
}

/// Forwards one progress event to the matching [`Progress`] method.
pub(crate) fn deliver_progress(progress: &mut dyn Progress, event: &ProgressEvent) {
    match event {
        ProgressEvent::Init { kind } => progress.init(*kind),
        ProgressEvent::Description { description, units } => {
            progress.set_description(description, *units)
        }
        ProgressEvent::Total { total } => progress.set_total(*total),
        ProgressEvent::Update { position } => progress.update(*position),
        ProgressEvent::Done { failed } => progress.done(*failed),
    }
}
