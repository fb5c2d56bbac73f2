/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;
use std::sync::OnceLock;

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde_json::{Value, json};

use crate::shell::desktop::runtime::registries::LOADER_CHANNELS;

static GLOBAL_DIAGNOSTICS_TX: OnceLock<Sender<DiagnosticEvent>> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static TEST_DIAGNOSTICS_TX: std::cell::RefCell<Option<Sender<DiagnosticEvent>>> =
        const { std::cell::RefCell::new(None) };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    MessageSent {
        channel_id: &'static str,
        byte_len: usize,
    },
    MessageReceived {
        channel_id: &'static str,
        latency_us: u64,
    },
}

impl DiagnosticEvent {
    pub fn channel_id(&self) -> &'static str {
        match self {
            Self::MessageSent { channel_id, .. } | Self::MessageReceived { channel_id, .. } => {
                *channel_id
            }
        }
    }
}

/// Route events from every thread to `sender`. Only the first call wins.
pub fn install_global_sender(sender: Sender<DiagnosticEvent>) {
    let _ = GLOBAL_DIAGNOSTICS_TX.set(sender.clone());

    #[cfg(test)]
    {
        TEST_DIAGNOSTICS_TX.with(|slot| {
            *slot.borrow_mut() = Some(sender);
        });
    }
}

#[cfg(feature = "diagnostics")]
pub fn emit_event(event: DiagnosticEvent) {
    #[cfg(test)]
    {
        let mut event = Some(event);
        TEST_DIAGNOSTICS_TX.with(|slot| {
            if let Some(tx) = slot.borrow().as_ref()
                && let Some(payload) = event.take()
            {
                let _ = tx.send(payload);
            }
        });
        if let Some(payload) = event
            && let Some(tx) = GLOBAL_DIAGNOSTICS_TX.get()
        {
            let _ = tx.send(payload);
        }
    }

    #[cfg(not(test))]
    {
        if let Some(tx) = GLOBAL_DIAGNOSTICS_TX.get() {
            let _ = tx.send(event);
        }
    }
}

#[cfg(not(feature = "diagnostics"))]
pub fn emit_event(_event: DiagnosticEvent) {}

/// Shorthand for a zero-payload `MessageSent`.
pub fn emit_signal(channel_id: &'static str) {
    emit_event(DiagnosticEvent::MessageSent {
        channel_id,
        byte_len: 0,
    });
}

/// Aggregated view of drained events.
pub struct DiagnosticsState {
    receiver: Receiver<DiagnosticEvent>,
    message_counts: HashMap<&'static str, u64>,
    message_bytes_sent: HashMap<&'static str, u64>,
    message_latency_us: HashMap<&'static str, u64>,
}

impl DiagnosticsState {
    /// Create the state and install its channel as the global sink.
    pub fn install() -> Self {
        let (tx, rx) = unbounded();
        install_global_sender(tx);
        Self::with_receiver(rx)
    }

    pub fn with_receiver(receiver: Receiver<DiagnosticEvent>) -> Self {
        Self {
            receiver,
            message_counts: HashMap::new(),
            message_bytes_sent: HashMap::new(),
            message_latency_us: HashMap::new(),
        }
    }

    pub fn tick_drain(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            self.aggregate_event(&event);
        }
    }

    fn aggregate_event(&mut self, event: &DiagnosticEvent) {
        *self.message_counts.entry(event.channel_id()).or_insert(0) += 1;
        match event {
            DiagnosticEvent::MessageSent {
                channel_id,
                byte_len,
            } => {
                *self.message_bytes_sent.entry(*channel_id).or_insert(0) += *byte_len as u64;
            }
            DiagnosticEvent::MessageReceived {
                channel_id,
                latency_us,
            } => {
                *self.message_latency_us.entry(*channel_id).or_insert(0) += *latency_us;
            }
        }
    }

    pub fn channel_count(&self, channel: &'static str) -> u64 {
        self.message_counts.get(channel).copied().unwrap_or(0)
    }

    pub fn snapshot_json(&self) -> Value {
        let mut channels: Vec<&'static str> = LOADER_CHANNELS
            .iter()
            .copied()
            .filter(|channel| self.message_counts.contains_key(channel))
            .collect();
        for channel in self.message_counts.keys() {
            if !channels.contains(channel) {
                channels.push(*channel);
            }
        }

        let entries: Vec<Value> = channels
            .into_iter()
            .map(|channel| {
                json!({
                    "channel": channel,
                    "count": self.channel_count(channel),
                    "bytes_sent": self.message_bytes_sent.get(channel).copied().unwrap_or(0),
                    "latency_us": self.message_latency_us.get(channel).copied().unwrap_or(0),
                })
            })
            .collect();
        json!({ "channels": entries })
    }
}
