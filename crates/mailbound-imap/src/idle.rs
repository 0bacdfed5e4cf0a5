//! IDLE push channel (RFC 2177).
//!
//! [`Session::idle`] leaves a long-lived IDLE command open and turns every
//! unsolicited untagged response into an [`IdleEvent`] on a single-consumer
//! stream, lossless and in arrival order. The command queue stays held for
//! the whole IDLE, so no other command can interleave; [`IdleSession::done`]
//! (or dropping the session, or any other engine operation) writes the
//! untagged `DONE` and releases the queue once the server acknowledges.

use std::sync::Arc;

use tokio::sync::{Notify, mpsc, watch};
use tokio::time::timeout;

use crate::command::Command;
use crate::connection::Outbound;
use crate::parser::{FetchItem, Response, UntaggedResponse};
use crate::queue::QueueGuard;
use crate::session::{Core, Session};
use crate::types::{Capability, Flags, ResponseCode, SeqNum};
use crate::{Error, Result};

/// Event received while IDLE is active.
#[derive(Debug, Clone, PartialEq)]
pub enum IdleEvent {
    /// Message count changed (EXISTS).
    Exists(u32),
    /// Recent count changed (RECENT).
    Recent(u32),
    /// A message was removed (EXPUNGE).
    Expunge(SeqNum),
    /// Message data changed (unsolicited FETCH).
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Fetch data items.
        items: Vec<FetchItem>,
    },
    /// A flags-only FETCH: another client changed flags.
    FlagsChanged {
        /// Message sequence number.
        seq: SeqNum,
        /// The updated flags.
        flags: Flags,
    },
    /// The server raised an ALERT that must be shown to the user.
    Alert(String),
    /// The capability set changed.
    Capability(Vec<Capability>),
    /// The server is closing the connection. Terminal: the stream ends
    /// after this event.
    Bye(Option<String>),
}

/// Shared handle for terminating an IDLE.
///
/// Cloned into the session's idle slot so that `done()` calls coalesce:
/// however many callers request termination, one DONE frame is written
/// and all of them await the same completion.
#[derive(Clone, Debug)]
pub(crate) struct IdleControl {
    done: Arc<Notify>,
    completion: watch::Receiver<bool>,
}

impl IdleControl {
    /// Requests termination and waits until the drive task has released
    /// the connection. Idempotent and re-entrant.
    pub(crate) async fn finish(&self) {
        self.done.notify_one();
        let mut completion = self.completion.clone();
        while !*completion.borrow_and_update() {
            if completion.changed().await.is_err() {
                break;
            }
        }
    }
}

/// An active IDLE: the event stream plus its termination handle.
///
/// The stream is single-consumer. Dropping it requests termination; the
/// engine then behaves as if [`Self::done`] had been called.
#[derive(Debug)]
pub struct IdleSession {
    events: mpsc::UnboundedReceiver<IdleEvent>,
    control: IdleControl,
}

impl IdleSession {
    /// Waits for the next server event.
    ///
    /// Returns `None` when IDLE has ended: after DONE completes, or when
    /// the connection is lost (any buffered events are still delivered
    /// first; a server BYE arrives as a terminal [`IdleEvent::Bye`]).
    pub async fn next_event(&mut self) -> Option<IdleEvent> {
        self.events.recv().await
    }

    /// Ends the IDLE by sending DONE and waits for the server's tagged
    /// acknowledgement.
    ///
    /// Concurrent and repeated calls coalesce onto the same completion;
    /// only one DONE frame is ever written.
    pub async fn done(&self) {
        self.control.finish().await;
    }
}

impl Drop for IdleSession {
    fn drop(&mut self) {
        // Request shutdown; the drive task completes in the background
        // and releases the command queue.
        self.control.done.notify_one();
    }
}

impl Session {
    /// Enters IDLE and returns the event stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandNotSupported`] without the IDLE
    /// capability, [`Error::Command`] when the server rejects IDLE, or
    /// [`Error::Timeout`] when no continuation arrives in time.
    pub async fn idle(&self) -> Result<IdleSession> {
        // Coalesce with any IDLE already active.
        self.finish_idle().await;

        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;

        if !core.capability_check(&self.config, &Capability::Idle).await? {
            return Err(Error::CommandNotSupported("IDLE".to_string()));
        }

        let tag = core.next_tag();
        tracing::debug!(label = %self.config.log_outbound, line = %Command::Idle.redacted(&tag), "send");

        let deadline = self.config.command_timeout;
        let wire = Command::Idle.serialize(&tag);

        // Untagged data may arrive between IDLE and the continuation;
        // it belongs to the stream.
        let mut early = Vec::new();
        let accepted = timeout(deadline, async {
            let channel = core
                .channel
                .as_mut()
                .ok_or_else(|| Error::ConnectionLost("not connected".to_string()))?;
            channel.write_frame(&Outbound::Tagged(wire)).await?;

            loop {
                let frame = channel.read_response().await?;
                match Response::parse(&frame)? {
                    Response::Continuation { .. } => return Ok(()),
                    Response::Untagged(payload) => early.push(payload),
                    Response::Tagged {
                        tag: resp_tag, text, ..
                    } if resp_tag.as_str() == tag => {
                        return Err(Error::Command(format!("IDLE rejected: {text}")));
                    }
                    Response::Tagged { tag: stale, .. } => {
                        tracing::warn!(tag = %stale, "dropping stale tagged response");
                    }
                }
            }
        })
        .await;

        match accepted {
            Err(_) => return Err(Error::Timeout(deadline)),
            Ok(Err(e)) => {
                if matches!(e, Error::Io(_)) {
                    core.drop_channel();
                    return Err(Error::ConnectionLost(e.to_string()));
                }
                return Err(e);
            }
            Ok(Ok(())) => {}
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        for payload in early {
            if let Some(event) = translate_event(payload) {
                let _ = event_tx.send(event);
            }
        }

        let done = Arc::new(Notify::new());
        let (completion_tx, completion_rx) = watch::channel(false);
        let control = IdleControl {
            done: Arc::clone(&done),
            completion: completion_rx,
        };

        if let Ok(mut slot) = self.idle_slot.lock() {
            *slot = Some(control.clone());
        }

        tokio::spawn(drive_idle(
            core,
            tag,
            event_tx,
            done,
            completion_tx,
            Arc::clone(&self.idle_slot),
        ));

        Ok(IdleSession {
            events: event_rx,
            control,
        })
    }

    /// Ends an active IDLE (no-op when none is active). Equivalent to
    /// [`IdleSession::done`] but callable without the stream handle.
    ///
    /// # Errors
    ///
    /// Currently infallible; DONE write errors are swallowed because the
    /// server may already be closing.
    pub async fn done(&self) -> Result<()> {
        self.finish_idle().await;
        Ok(())
    }
}

/// Owns the connection for the duration of one IDLE: translates inbound
/// frames to events, writes DONE exactly once when requested, and
/// releases the command queue when the tagged completion (or connection
/// loss) arrives.
async fn drive_idle(
    mut core: QueueGuard<Core>,
    tag: String,
    events: mpsc::UnboundedSender<IdleEvent>,
    done: Arc<Notify>,
    completion: watch::Sender<bool>,
    slot: Arc<std::sync::Mutex<Option<IdleControl>>>,
) {
    let mut done_sent = false;
    let mut connection_lost = false;

    'drive: loop {
        let mut write_done = false;

        {
            let Some(channel) = core.channel.as_mut() else {
                connection_lost = true;
                break;
            };

            tokio::select! {
                () = done.notified(), if !done_sent => {
                    write_done = true;
                }
                frame = channel.read_response() => {
                    match frame {
                        Err(e) => {
                            tracing::debug!(error = %e, "connection ended during IDLE");
                            connection_lost = true;
                            break 'drive;
                        }
                        Ok(frame) => match Response::parse(&frame) {
                            Ok(Response::Untagged(payload)) => {
                                if let Some(event) = translate_event(payload) {
                                    // Lossless, in arrival order; an
                                    // unbounded channel is bounded in
                                    // practice by the connection's pace.
                                    let _ = events.send(event);
                                }
                            }
                            Ok(Response::Tagged { tag: resp_tag, .. })
                                if resp_tag.as_str() == tag =>
                            {
                                break 'drive;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::warn!(error = %e, "dropping unparseable frame during IDLE");
                            }
                        },
                    }
                }
            }
        }

        if write_done {
            done_sent = true;
            if let Some(channel) = core.channel.as_mut()
                && let Err(e) = channel.write_frame(&Outbound::IdleDone).await
            {
                // The server may already be closing; the tagged response
                // or connection loss still ends the loop.
                tracing::debug!(error = %e, "DONE write failed");
            }
        }
    }

    if connection_lost {
        core.drop_channel();
    }

    if let Ok(mut slot) = slot.lock() {
        *slot = None;
    }
    let _ = completion.send(true);
    // Dropping the guard releases the command queue.
    drop(core);
}

/// Translates an untagged response into a stream event.
fn translate_event(payload: UntaggedResponse) -> Option<IdleEvent> {
    match payload {
        UntaggedResponse::Exists(n) => Some(IdleEvent::Exists(n)),
        UntaggedResponse::Recent(n) => Some(IdleEvent::Recent(n)),
        UntaggedResponse::Expunge(seq) => Some(IdleEvent::Expunge(seq)),
        UntaggedResponse::Fetch { seq, mut items } => {
            // A flags-only FETCH is the common "another client changed
            // flags" notification; give it its own shape.
            if items.len() == 1
                && let Some(FetchItem::Flags(flags)) = items.pop()
            {
                return Some(IdleEvent::FlagsChanged { seq, flags });
            }
            Some(IdleEvent::Fetch { seq, items })
        }
        UntaggedResponse::Capability(caps) => Some(IdleEvent::Capability(caps)),
        UntaggedResponse::Bye { text, .. } => Some(IdleEvent::Bye(if text.is_empty() {
            None
        } else {
            Some(text)
        })),
        UntaggedResponse::Ok {
            code: Some(ResponseCode::Alert),
            text,
        }
        | UntaggedResponse::No {
            code: Some(ResponseCode::Alert),
            text,
        }
        | UntaggedResponse::Bad {
            code: Some(ResponseCode::Alert),
            text,
        } => Some(IdleEvent::Alert(text)),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Flag;

    fn seq(n: u32) -> SeqNum {
        SeqNum::new(n).unwrap()
    }

    #[test]
    fn translate_mailbox_counters() {
        assert_eq!(
            translate_event(UntaggedResponse::Exists(173)),
            Some(IdleEvent::Exists(173))
        );
        assert_eq!(
            translate_event(UntaggedResponse::Recent(2)),
            Some(IdleEvent::Recent(2))
        );
        assert_eq!(
            translate_event(UntaggedResponse::Expunge(seq(1))),
            Some(IdleEvent::Expunge(seq(1)))
        );
    }

    #[test]
    fn flags_only_fetch_becomes_flags_changed() {
        let flags = Flags::from_vec(vec![Flag::Seen]);
        let event = translate_event(UntaggedResponse::Fetch {
            seq: seq(7),
            items: vec![FetchItem::Flags(flags.clone())],
        });
        assert_eq!(event, Some(IdleEvent::FlagsChanged { seq: seq(7), flags }));
    }

    #[test]
    fn richer_fetch_stays_fetch() {
        let event = translate_event(UntaggedResponse::Fetch {
            seq: seq(7),
            items: vec![
                FetchItem::Flags(Flags::new()),
                FetchItem::Rfc822Size(100),
            ],
        });
        assert!(matches!(event, Some(IdleEvent::Fetch { .. })));
    }

    #[test]
    fn alert_and_bye() {
        let event = translate_event(UntaggedResponse::Ok {
            code: Some(ResponseCode::Alert),
            text: "maintenance at midnight".to_string(),
        });
        assert_eq!(
            event,
            Some(IdleEvent::Alert("maintenance at midnight".to_string()))
        );

        let event = translate_event(UntaggedResponse::Bye {
            code: None,
            text: "going down".to_string(),
        });
        assert_eq!(event, Some(IdleEvent::Bye(Some("going down".to_string()))));
    }

    #[test]
    fn uninteresting_untagged_is_dropped() {
        let event = translate_event(UntaggedResponse::Ok {
            code: None,
            text: "still here".to_string(),
        });
        assert!(event.is_none());
    }
}
