//! The per-connection IMAP engine.
//!
//! A [`Session`] owns one connection: transport, framer, capability set,
//! tag counter, and the command queue that serializes every operation.
//! Commands follow a fixed contract: wait for the queue, end any active
//! IDLE, validate arguments locally, reconnect on demand when credentials
//! are held, then write the tagged command and route every inbound frame
//! to the pending command until its tagged completion arrives, all under
//! a per-command timeout.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::time::timeout;

use mailbound_mime::encode_base64;

use crate::command::{Command, FetchAttribute, StoreAction};
use crate::config::{Credentials, Security, SessionConfig};
use crate::connection::{
    DEFAULT_LINE_LIMIT, FramedStream, ImapStream, Outbound, StreamEvent, connect_plain,
    connect_tls,
};
use crate::idle::IdleControl;
use crate::message::{Header, Message, MessagePart};
use crate::parser::{BodyStructure, FetchItem, Response, StatusItem, UntaggedResponse};
use crate::queue::CommandQueue;
use crate::search::{SearchCriteria, SortCriterion};
use crate::types::{
    Capabilities, Capability, Flags, FolderKind, Mailbox, MailboxInfo, MailboxStatus, ResponseCode,
    SeqNum, SeqSet, Status, Uid, UidSet,
};
use crate::walker::flatten_structure;
use crate::{Error, Result};

/// Timeout class of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandClass {
    /// Ordinary commands.
    Default,
    /// APPEND, which uploads message content.
    Append,
    /// Part and structure fetches.
    Fetch,
}

impl CommandClass {
    fn duration(self, config: &SessionConfig) -> Duration {
        match self {
            Self::Default => config.command_timeout,
            Self::Append => config.append_timeout,
            Self::Fetch => config.fetch_timeout,
        }
    }
}

/// Everything a completed command produced.
pub(crate) struct CommandOutput {
    /// Untagged responses delivered while the command was pending, in
    /// arrival order.
    pub untagged: Vec<UntaggedResponse>,
    /// Bytes of literals that exceeded the in-memory cap and streamed.
    pub streamed: Vec<u8>,
    /// Tagged completion status.
    pub status: Status,
    /// Tagged response code.
    pub code: Option<ResponseCode>,
    /// Tagged response text.
    pub text: String,
}

impl CommandOutput {
    /// Maps a non-OK completion through the command's error kind.
    fn ok_or(self, map: impl FnOnce(String) -> Error) -> Result<Self> {
        if self.status.is_ok() {
            Ok(self)
        } else {
            Err(map(self.text))
        }
    }
}

/// Connection state owned exclusively by the command queue.
pub(crate) struct Core {
    pub(crate) channel: Option<FramedStream<ImapStream>>,
    pub(crate) capabilities: Capabilities,
    tag_counter: u32,
    credentials: Option<Credentials>,
    selected: Option<Mailbox>,
    pub(crate) bye_seen: bool,
}

impl Core {
    fn new() -> Self {
        Self {
            channel: None,
            capabilities: Capabilities::new(),
            tag_counter: 0,
            credentials: None,
            selected: None,
            bye_seen: false,
        }
    }

    /// Generates the next command tag (`A001`, `A002`, …).
    ///
    /// The counter widens past three digits as needed and wraps only at
    /// `u32::MAX`.
    pub(crate) fn next_tag(&mut self) -> String {
        self.tag_counter = self.tag_counter.wrapping_add(1).max(1);
        format!("A{:03}", self.tag_counter)
    }

    /// Opens the transport, reads the greeting, and performs the
    /// STARTTLS upgrade when configured. Bypasses the command queue's
    /// tagged machinery for the greeting only.
    pub(crate) async fn establish(&mut self, config: &SessionConfig) -> Result<()> {
        let connect = async {
            let stream = match config.security {
                Security::Implicit => connect_tls(&config.host, config.port).await?,
                Security::None | Security::StartTls => {
                    connect_plain(&config.host, config.port).await?
                }
            };
            let mut channel =
                FramedStream::with_limits(stream, DEFAULT_LINE_LIMIT, config.literal_size_limit);

            let frame = channel.read_response().await?;
            let caps = match Response::parse(&frame)? {
                Response::Untagged(
                    UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
                ) => match code {
                    Some(ResponseCode::Capability(caps)) => caps,
                    _ => Vec::new(),
                },
                Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                    return Err(Error::Greeting(text));
                }
                other => {
                    return Err(Error::Greeting(format!("unexpected greeting: {other:?}")));
                }
            };
            Ok::<_, Error>((channel, caps))
        };

        let (channel, caps) = timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| {
                Error::ConnectionFailed(format!(
                    "timed out connecting to {}:{}",
                    config.host, config.port
                ))
            })??;

        self.channel = Some(channel);
        self.capabilities.replace(caps);
        tracing::debug!(host = %config.host, port = config.port, "connected");

        if config.security == Security::StartTls {
            self.upgrade_starttls(config).await?;
        }

        Ok(())
    }

    /// Runs the STARTTLS exchange and swaps the transport in place.
    async fn upgrade_starttls(&mut self, config: &SessionConfig) -> Result<()> {
        if !self.capabilities.is_empty() && !self.capabilities.contains(&Capability::StartTls) {
            return Err(Error::CommandNotSupported("STARTTLS".to_string()));
        }

        self.execute(config, &Command::StartTls, CommandClass::Default, false, VecDeque::new())
            .await?
            .ok_or(|text| Error::ConnectionFailed(format!("STARTTLS refused: {text}")))?;

        let channel = self
            .channel
            .take()
            .ok_or_else(|| Error::ConnectionLost("channel gone during STARTTLS".to_string()))?;

        // into_inner drops the read buffer: plaintext bytes past the
        // completion line must not survive into the TLS session.
        let tls = channel.into_inner().upgrade_to_tls(&config.host).await?;
        self.channel = Some(FramedStream::with_limits(
            tls,
            DEFAULT_LINE_LIMIT,
            config.literal_size_limit,
        ));

        // Pre-upgrade capabilities are untrusted; fetch a fresh set.
        self.capabilities.replace(Vec::new());
        self.refresh_capabilities(config).await?;
        Ok(())
    }

    pub(crate) async fn refresh_capabilities(&mut self, config: &SessionConfig) -> Result<()> {
        self.execute(
            config,
            &Command::Capability,
            CommandClass::Default,
            false,
            VecDeque::new(),
        )
        .await?
        .ok_or(Error::Command)?;
        Ok(())
    }

    /// Reconnects and restores authentication and mailbox selection when
    /// the transport has dropped and credentials are on hand.
    pub(crate) async fn ensure_connected(&mut self, config: &SessionConfig) -> Result<()> {
        if self.channel.is_some() {
            return Ok(());
        }

        let Some(credentials) = self.credentials.clone() else {
            return Err(Error::ConnectionLost(
                "not connected, and no credentials for transparent reconnect".to_string(),
            ));
        };

        tracing::info!(host = %config.host, "reconnecting");
        self.establish(config).await?;
        self.authenticate(config, &credentials).await?;

        if let Some(mailbox) = self.selected.clone() {
            self.select_mailbox(config, &mailbox, false).await?;
        }
        Ok(())
    }

    /// Authenticates with the stored or freshly supplied credentials.
    pub(crate) async fn authenticate(
        &mut self,
        config: &SessionConfig,
        credentials: &Credentials,
    ) -> Result<()> {
        match credentials {
            Credentials::Password { username, password } => {
                let cmd = Command::Login {
                    username: username.clone(),
                    password: password.clone(),
                };
                self.execute(config, &cmd, CommandClass::Default, false, VecDeque::new())
                    .await?
                    .ok_or(Error::Login)?;
            }
            Credentials::XOAuth2 {
                username,
                access_token,
            } => {
                self.run_sasl(config, "XOAUTH2", xoauth2_payload(username, access_token))
                    .await?;
            }
        }

        self.credentials = Some(credentials.clone());
        Ok(())
    }

    /// Evaluates a capability gate, fetching the capability set on
    /// demand when none has been reported yet.
    pub(crate) async fn capability_check(
        &mut self,
        config: &SessionConfig,
        capability: &Capability,
    ) -> Result<bool> {
        if self.capabilities.is_empty() {
            self.refresh_capabilities(config).await?;
        }
        Ok(self.capabilities.contains(capability))
    }

    /// Runs one AUTHENTICATE exchange with a single SASL payload, using
    /// an initial response when the server advertises SASL-IR.
    pub(crate) async fn run_sasl(
        &mut self,
        config: &SessionConfig,
        mechanism: &str,
        payload: String,
    ) -> Result<()> {
        if self.capabilities.is_empty() {
            self.refresh_capabilities(config).await?;
        }
        if !self.capabilities.has_auth(mechanism) {
            return Err(Error::UnsupportedAuthMechanism(mechanism.to_string()));
        }

        if self.capabilities.contains(&Capability::SaslIr) {
            let cmd = Command::Authenticate {
                mechanism: mechanism.to_string(),
                initial_response: Some(payload),
            };
            // An empty continuation payload answers the error challenge
            // some servers send before their NO.
            self.execute(
                config,
                &cmd,
                CommandClass::Default,
                false,
                VecDeque::from([Vec::new()]),
            )
            .await?
            .ok_or(Error::Authentication)?;
        } else {
            let cmd = Command::Authenticate {
                mechanism: mechanism.to_string(),
                initial_response: None,
            };
            self.execute(
                config,
                &cmd,
                CommandClass::Default,
                false,
                VecDeque::from([payload.into_bytes()]),
            )
            .await?
            .ok_or(Error::Authentication)?;
        }
        Ok(())
    }

    pub(crate) fn store_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    /// Selects or examines a mailbox and derives its status.
    pub(crate) async fn select_mailbox(
        &mut self,
        config: &SessionConfig,
        mailbox: &Mailbox,
        examine: bool,
    ) -> Result<MailboxStatus> {
        let cmd = if examine {
            Command::Examine {
                mailbox: mailbox.clone(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.clone(),
            }
        };

        let output = self
            .execute(config, &cmd, CommandClass::Default, false, VecDeque::new())
            .await?
            .ok_or(Error::Select)?;

        self.selected = Some(mailbox.clone());
        Ok(mailbox_status_from(&output, examine))
    }

    pub(crate) fn clear_selected(&mut self) {
        self.selected = None;
    }

    /// Writes one command and routes inbound frames to it until its
    /// tagged completion, under the class timeout.
    ///
    /// `streaming` opts into the framer's oversized-literal path;
    /// `continuations` holds payloads released one per server `+`.
    pub(crate) async fn execute(
        &mut self,
        config: &SessionConfig,
        cmd: &Command,
        class: CommandClass,
        streaming: bool,
        mut continuations: VecDeque<Vec<u8>>,
    ) -> Result<CommandOutput> {
        let tag = self.next_tag();
        tracing::debug!(label = %config.log_outbound, line = %cmd.redacted(&tag), "send");

        let deadline = class.duration(config);
        let wire = cmd.serialize(&tag);

        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| Error::ConnectionLost("not connected".to_string()))?;

        let result = timeout(
            deadline,
            exchange(
                channel,
                &mut self.capabilities,
                &mut self.bye_seen,
                config,
                &tag,
                wire,
                streaming,
                &mut continuations,
            ),
        )
        .await;

        match result {
            // The transport stays open on timeout; only this command is
            // abandoned. The framer's partial state keeps later reads
            // coherent.
            Err(_) => Err(Error::Timeout(deadline)),
            Ok(Err(e)) => {
                if matches!(e, Error::Io(_) | Error::Tls(_)) {
                    self.channel = None;
                    return Err(Error::ConnectionLost(e.to_string()));
                }
                Err(e)
            }
            Ok(Ok(output)) => {
                if self.bye_seen {
                    // BYE does not fail the command it interleaved with;
                    // it schedules the disconnect for afterwards.
                    self.bye_seen = false;
                    self.channel = None;
                    tracing::info!("disconnected after server BYE");
                }
                Ok(output)
            }
        }
    }

    /// Drops the transport without protocol farewells.
    pub(crate) fn drop_channel(&mut self) {
        self.channel = None;
    }
}

/// The read/route loop of one pending command.
#[allow(clippy::too_many_arguments)]
async fn exchange(
    channel: &mut FramedStream<ImapStream>,
    capabilities: &mut Capabilities,
    bye_seen: &mut bool,
    config: &SessionConfig,
    tag: &str,
    wire: Vec<u8>,
    streaming: bool,
    continuations: &mut VecDeque<Vec<u8>>,
) -> Result<CommandOutput> {
    let uses_continuations = !continuations.is_empty();
    channel.write_frame(&Outbound::Tagged(wire)).await?;

    let mut untagged = Vec::new();
    let mut streamed = Vec::new();

    loop {
        let frame = if streaming {
            let sink = &mut |event: StreamEvent| {
                if let StreamEvent::Bytes(chunk) = event {
                    streamed.extend_from_slice(&chunk);
                }
            };
            channel.read_response_streaming(sink).await?
        } else {
            channel.read_response().await?
        };
        tracing::trace!(label = %config.log_inbound, bytes = frame.len(), "recv");

        let parsed = match Response::parse(&frame) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable response line");
                continue;
            }
        };

        match parsed {
            Response::Tagged {
                tag: resp_tag,
                status,
                code,
                text,
            } => {
                if resp_tag.as_str() == tag {
                    if let Some(ResponseCode::Capability(caps)) = &code {
                        capabilities.replace(caps.clone());
                    }
                    return Ok(CommandOutput {
                        untagged,
                        streamed,
                        status,
                        code,
                        text,
                    });
                }
                // Completion of a command already abandoned by timeout.
                tracing::warn!(tag = %resp_tag, "dropping stale tagged response");
            }
            Response::Continuation { .. } => {
                if let Some(payload) = continuations.pop_front() {
                    tracing::debug!(
                        label = %config.log_outbound,
                        bytes = payload.len(),
                        "continuation payload"
                    );
                    channel.write_frame(&Outbound::Continuation(payload)).await?;
                } else if uses_continuations {
                    // SASL error dance: an unexpected challenge is
                    // answered with an empty line to elicit the NO.
                    channel
                        .write_frame(&Outbound::Continuation(Vec::new()))
                        .await?;
                } else {
                    tracing::warn!("unsolicited continuation request ignored");
                }
            }
            Response::Untagged(payload) => {
                if let UntaggedResponse::Capability(caps) = &payload {
                    capabilities.replace(caps.clone());
                }
                if let UntaggedResponse::Bye { text, .. } = &payload {
                    tracing::info!(text = %text, "server BYE");
                    *bye_seen = true;
                }
                untagged.push(payload);
            }
        }
    }
}

/// Derives a [`MailboxStatus`] from a SELECT/EXAMINE exchange.
fn mailbox_status_from(output: &CommandOutput, examine: bool) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only: examine,
        ..MailboxStatus::default()
    };

    let mut apply_code = |code: &ResponseCode, status: &mut MailboxStatus| match code {
        ResponseCode::Unseen(seq) => status.unseen = Some(*seq),
        ResponseCode::UidNext(uid) => status.uid_next = Some(*uid),
        ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
        ResponseCode::PermanentFlags(flags) => {
            status.permanent_flags = flags.iter().cloned().collect();
        }
        ResponseCode::ReadOnly => status.read_only = true,
        ResponseCode::ReadWrite => status.read_only = false,
        _ => {}
    };

    for payload in &output.untagged {
        match payload {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => apply_code(code, &mut status),
            _ => {}
        }
    }

    if let Some(code) = &output.code {
        apply_code(code, &mut status);
    }

    status
}

fn xoauth2_payload(username: &str, access_token: &str) -> String {
    encode_base64(format!("user={username}\x01auth=Bearer {access_token}\x01\x01").as_bytes())
}

fn plain_payload(username: &str, password: &str) -> String {
    encode_base64(format!("\0{username}\0{password}").as_bytes())
}

/// An authenticated, TLS-protected IMAP connection with high-level
/// mailbox, message, and search operations.
///
/// All methods take `&self`; concurrent callers are serialized by the
/// session's command queue, and independent sessions run in parallel.
pub struct Session {
    pub(crate) config: Arc<SessionConfig>,
    pub(crate) queue: CommandQueue<Core>,
    pub(crate) idle_slot: Arc<StdMutex<Option<IdleControl>>>,
}

impl Session {
    /// Connects to the configured server and reads the greeting.
    ///
    /// For [`Security::StartTls`] the transport is upgraded before this
    /// returns; capabilities learned over plaintext are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`], [`Error::Greeting`], or a TLS
    /// error.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let session = Self {
            config: Arc::new(config),
            queue: CommandQueue::new(Core::new()),
            idle_slot: Arc::new(StdMutex::new(None)),
        };

        {
            let mut core = session.queue.acquire().await;
            core.establish(&session.config).await?;
        }

        Ok(session)
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Authenticates with LOGIN and retains the credentials for
    /// transparent reconnection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Login`] when the server rejects the credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let credentials = Credentials::Password {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        if core.channel.is_none() {
            core.establish(&self.config).await?;
        }
        core.authenticate(&self.config, &credentials).await
    }

    /// Authenticates with SASL PLAIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAuthMechanism`] when the server does
    /// not advertise `AUTH=PLAIN`, [`Error::Authentication`] on refusal.
    pub async fn authenticate_plain(&self, username: &str, password: &str) -> Result<()> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        if core.channel.is_none() {
            core.establish(&self.config).await?;
        }
        core.run_sasl(&self.config, "PLAIN", plain_payload(username, password))
            .await?;
        core.store_credentials(Credentials::Password {
            username: username.to_string(),
            password: password.to_string(),
        });
        Ok(())
    }

    /// Authenticates with SASL LOGIN (two-step username/password dance).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAuthMechanism`] when the server does
    /// not advertise `AUTH=LOGIN`, [`Error::Authentication`] on refusal.
    pub async fn authenticate_login(&self, username: &str, password: &str) -> Result<()> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        if core.channel.is_none() {
            core.establish(&self.config).await?;
        }

        if core.capabilities.is_empty() {
            core.refresh_capabilities(&self.config).await?;
        }
        if !core.capabilities.has_auth("LOGIN") {
            return Err(Error::UnsupportedAuthMechanism("LOGIN".to_string()));
        }

        let cmd = Command::Authenticate {
            mechanism: "LOGIN".to_string(),
            initial_response: None,
        };
        let payloads = VecDeque::from([
            encode_base64(username.as_bytes()).into_bytes(),
            encode_base64(password.as_bytes()).into_bytes(),
        ]);
        core.execute(&self.config, &cmd, CommandClass::Default, false, payloads)
            .await?
            .ok_or(Error::Authentication)?;

        core.store_credentials(Credentials::Password {
            username: username.to_string(),
            password: password.to_string(),
        });
        Ok(())
    }

    /// Authenticates with XOAUTH2 and retains the token for transparent
    /// reconnection. Token refresh is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAuthMechanism`] when the server does
    /// not advertise `AUTH=XOAUTH2`, [`Error::Authentication`] on refusal.
    pub async fn authenticate_xoauth2(&self, username: &str, access_token: &str) -> Result<()> {
        let credentials = Credentials::XOAuth2 {
            username: username.to_string(),
            access_token: access_token.to_string(),
        };
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        if core.channel.is_none() {
            core.establish(&self.config).await?;
        }
        core.authenticate(&self.config, &credentials).await
    }

    /// Returns the server capability set, issuing CAPABILITY on demand
    /// when none has been reported yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when the CAPABILITY command fails.
    pub async fn capabilities(&self) -> Result<Capabilities> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;
        if core.capabilities.is_empty() {
            core.refresh_capabilities(&self.config).await?;
        }
        Ok(core.capabilities.clone())
    }

    /// Sends an ID exchange (RFC 2971) and returns the server's fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandNotSupported`] without ID capability.
    pub async fn id(
        &self,
        parameters: Option<Vec<(String, String)>>,
    ) -> Result<Option<Vec<(String, String)>>> {
        let output = self
            .run_gated(
                Command::Id { parameters },
                CommandClass::Default,
                Some(Capability::Id),
            )
            .await?
            .ok_or(Error::Command)?;

        Ok(output.untagged.into_iter().find_map(|u| match u {
            UntaggedResponse::Id(fields) => fields,
            _ => None,
        }))
    }

    /// Lists mailboxes matching the pattern (`"*"` for all).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when LIST fails.
    pub async fn list_mailboxes(&self, reference: &str, pattern: &str) -> Result<Vec<MailboxInfo>> {
        let cmd = Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        };
        let output = self
            .run(cmd, CommandClass::Default)
            .await?
            .ok_or(Error::Command)?;

        Ok(output
            .untagged
            .into_iter()
            .filter_map(|u| match u {
                UntaggedResponse::List(info) => Some(info),
                _ => None,
            })
            .collect())
    }

    /// Lists subscribed mailboxes (LSUB).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when LSUB fails.
    pub async fn list_subscribed(&self, reference: &str, pattern: &str) -> Result<Vec<MailboxInfo>> {
        let cmd = Command::Lsub {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        };
        let output = self
            .run(cmd, CommandClass::Default)
            .await?
            .ok_or(Error::Command)?;

        Ok(output
            .untagged
            .into_iter()
            .filter_map(|u| match u {
                UntaggedResponse::Lsub(info) => Some(info),
                _ => None,
            })
            .collect())
    }

    /// Sends NAMESPACE and returns the server's namespace line verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandNotSupported`] without the NAMESPACE
    /// capability.
    pub async fn namespace(&self) -> Result<Option<String>> {
        let output = self
            .run_gated(
                Command::Namespace,
                CommandClass::Default,
                Some(Capability::Namespace),
            )
            .await?
            .ok_or(Error::Command)?;

        Ok(output.untagged.into_iter().find_map(|u| match u {
            UntaggedResponse::Namespace(raw) => Some(raw),
            _ => None,
        }))
    }

    /// Finds the special-use mailbox of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedFolder`] when the server marks no
    /// mailbox with the kind.
    pub async fn find_folder(&self, kind: FolderKind) -> Result<MailboxInfo> {
        if kind == FolderKind::Inbox {
            // INBOX exists by definition even without SPECIAL-USE.
            return Ok(MailboxInfo {
                attributes: Vec::new(),
                delimiter: None,
                mailbox: Mailbox::inbox(),
            });
        }

        self.list_mailboxes("", "*")
            .await?
            .into_iter()
            .find(|info| info.special_use() == Some(kind))
            .ok_or(Error::UndefinedFolder(kind))
    }

    /// Selects a mailbox read-write and returns its status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty name,
    /// [`Error::Select`] when the server refuses.
    pub async fn select(&self, mailbox: &str) -> Result<MailboxStatus> {
        if mailbox.is_empty() {
            return Err(Error::InvalidArgument("empty mailbox name".to_string()));
        }
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;
        core.select_mailbox(&self.config, &Mailbox::new(mailbox), false)
            .await
    }

    /// Selects a mailbox read-only (EXAMINE) and returns its status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty name,
    /// [`Error::Select`] when the server refuses.
    pub async fn examine(&self, mailbox: &str) -> Result<MailboxStatus> {
        if mailbox.is_empty() {
            return Err(Error::InvalidArgument("empty mailbox name".to_string()));
        }
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;
        core.select_mailbox(&self.config, &Mailbox::new(mailbox), true)
            .await
    }

    /// Queries mailbox counters without selecting it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when STATUS fails.
    pub async fn status(&self, mailbox: &str) -> Result<Vec<StatusItem>> {
        let cmd = Command::Status {
            mailbox: Mailbox::new(mailbox),
            items: ["MESSAGES", "RECENT", "UNSEEN", "UIDNEXT", "UIDVALIDITY"]
                .map(ToString::to_string)
                .to_vec(),
        };
        let output = self
            .run(cmd, CommandClass::Default)
            .await?
            .ok_or(Error::Command)?;

        Ok(output
            .untagged
            .into_iter()
            .find_map(|u| match u {
                UntaggedResponse::Status { items, .. } => Some(items),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Closes the selected mailbox, expunging deleted messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when CLOSE fails.
    pub async fn close(&self) -> Result<()> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;
        core.execute(
            &self.config,
            &Command::Close,
            CommandClass::Default,
            false,
            VecDeque::new(),
        )
        .await?
        .ok_or(Error::Command)?;
        core.clear_selected();
        Ok(())
    }

    /// Deselects the mailbox without expunging (RFC 3691).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandNotSupported`] when the server does not
    /// advertise UNSELECT; callers should use [`Self::close`] instead.
    pub async fn unselect(&self) -> Result<()> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;
        if !core.capability_check(&self.config, &Capability::Unselect).await? {
            return Err(Error::CommandNotSupported("UNSELECT".to_string()));
        }
        core.execute(
            &self.config,
            &Command::Unselect,
            CommandClass::Default,
            false,
            VecDeque::new(),
        )
        .await?
        .ok_or(Error::Command)?;
        core.clear_selected();
        Ok(())
    }

    /// Logs out gracefully. An unclean shutdown while disconnecting is
    /// downgraded to info and does not fail the logout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Logout`] when the server answers with NO/BAD.
    pub async fn logout(&self) -> Result<()> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        if core.channel.is_none() {
            return Ok(());
        }

        let result = core
            .execute(
                &self.config,
                &Command::Logout,
                CommandClass::Default,
                false,
                VecDeque::new(),
            )
            .await;
        core.drop_channel();

        match result {
            Ok(output) => {
                if output.status.is_ok() {
                    Ok(())
                } else {
                    Err(Error::Logout(output.text))
                }
            }
            Err(Error::ConnectionLost(e) | Error::Protocol(e)) => {
                tracing::info!(error = %e, "unclean shutdown during logout");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drops the transport immediately, without protocol farewells.
    pub async fn disconnect(&self) {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.drop_channel();
    }

    /// Sends NOOP, picking up any pending unilateral server data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when NOOP fails.
    pub async fn noop(&self) -> Result<()> {
        self.run(Command::Noop, CommandClass::Default)
            .await?
            .ok_or(Error::Command)?;
        Ok(())
    }

    /// Searches the selected mailbox by sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when SEARCH fails.
    pub async fn search(&self, criteria: SearchCriteria) -> Result<SeqSet> {
        let output = self
            .run(
                Command::Search {
                    criteria,
                    uid: false,
                },
                CommandClass::Default,
            )
            .await?
            .ok_or(Error::Command)?;
        Ok(search_numbers(&output)
            .iter()
            .copied()
            .filter_map(SeqNum::new)
            .collect())
    }

    /// Searches the selected mailbox by UID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when UID SEARCH fails.
    pub async fn uid_search(&self, criteria: SearchCriteria) -> Result<UidSet> {
        let output = self
            .run(
                Command::Search {
                    criteria,
                    uid: true,
                },
                CommandClass::Default,
            )
            .await?
            .ok_or(Error::Command)?;
        Ok(search_numbers(&output)
            .iter()
            .copied()
            .filter_map(Uid::new)
            .collect())
    }

    /// Server-side sort (RFC 5256), returning sequence numbers in sorted
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandNotSupported`] without SORT capability.
    pub async fn sort(
        &self,
        criteria: Vec<SortCriterion>,
        search: SearchCriteria,
    ) -> Result<Vec<SeqNum>> {
        let output = self
            .run_gated(
                Command::Sort {
                    criteria,
                    search,
                    uid: false,
                },
                CommandClass::Default,
                Some(Capability::Sort),
            )
            .await?
            .ok_or(Error::Command)?;
        Ok(sort_numbers(&output)
            .iter()
            .copied()
            .filter_map(SeqNum::new)
            .collect())
    }

    /// Server-side sort (RFC 5256), returning UIDs in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandNotSupported`] without SORT capability.
    pub async fn uid_sort(
        &self,
        criteria: Vec<SortCriterion>,
        search: SearchCriteria,
    ) -> Result<Vec<Uid>> {
        let output = self
            .run_gated(
                Command::Sort {
                    criteria,
                    search,
                    uid: true,
                },
                CommandClass::Default,
                Some(Capability::Sort),
            )
            .await?
            .ok_or(Error::Command)?;
        Ok(sort_numbers(&output)
            .iter()
            .copied()
            .filter_map(Uid::new)
            .collect())
    }

    /// Copies messages to another mailbox by sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`] for an empty set, [`Error::Copy`]
    /// when the server refuses.
    pub async fn copy(&self, set: &SeqSet, mailbox: &str) -> Result<()> {
        self.copy_impl(non_empty(set)?, mailbox, false).await
    }

    /// Copies messages to another mailbox by UID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`] for an empty set, [`Error::Copy`]
    /// when the server refuses.
    pub async fn uid_copy(&self, set: &UidSet, mailbox: &str) -> Result<()> {
        self.copy_impl(non_empty(set)?, mailbox, true).await
    }

    async fn copy_impl(&self, set: String, mailbox: &str, uid: bool) -> Result<()> {
        self.run(
            Command::Copy {
                set,
                mailbox: Mailbox::new(mailbox),
                uid,
            },
            CommandClass::Default,
        )
        .await?
        .ok_or(Error::Copy)?;
        Ok(())
    }

    /// Moves messages to another mailbox by sequence number.
    ///
    /// Uses MOVE when advertised. Otherwise runs the compound fallback
    /// COPY, STORE `+FLAGS (\Deleted)`, EXPUNGE; a failing step aborts
    /// the rest, and an already-completed COPY is not rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`], [`Error::Move`], or the failing
    /// fallback step's error.
    pub async fn mv(&self, set: &SeqSet, mailbox: &str) -> Result<()> {
        let wire = non_empty(set)?;
        if self.has_capability(Capability::Move).await? {
            return self.move_native(wire, mailbox, false).await;
        }
        self.move_fallback(wire, mailbox, false).await
    }

    /// Moves messages to another mailbox by UID.
    ///
    /// Uses MOVE only when both MOVE and UIDPLUS are advertised; the
    /// fallback and its no-rollback semantics match [`Self::mv`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`], [`Error::Move`], or the failing
    /// fallback step's error.
    pub async fn uid_mv(&self, set: &UidSet, mailbox: &str) -> Result<()> {
        let wire = non_empty(set)?;
        if self.has_capability(Capability::Move).await?
            && self.has_capability(Capability::UidPlus).await?
        {
            return self.move_native(wire, mailbox, true).await;
        }
        self.move_fallback(wire, mailbox, true).await
    }

    async fn move_native(&self, set: String, mailbox: &str, uid: bool) -> Result<()> {
        self.run(
            Command::Move {
                set,
                mailbox: Mailbox::new(mailbox),
                uid,
            },
            CommandClass::Default,
        )
        .await?
        .ok_or(Error::Move)?;
        Ok(())
    }

    async fn move_fallback(&self, set: String, mailbox: &str, uid: bool) -> Result<()> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;

        // The three steps run under one queue acquisition so no other
        // command interleaves. Each step awaits its tagged OK before the
        // next is sent.
        core.execute(
            &self.config,
            &Command::Copy {
                set: set.clone(),
                mailbox: Mailbox::new(mailbox),
                uid,
            },
            CommandClass::Default,
            false,
            VecDeque::new(),
        )
        .await?
        .ok_or(Error::Copy)?;

        core.execute(
            &self.config,
            &Command::Store {
                set,
                action: StoreAction::AddFlags(vec![crate::types::Flag::Deleted]),
                uid,
                silent: false,
            },
            CommandClass::Default,
            false,
            VecDeque::new(),
        )
        .await?
        .ok_or(Error::Store)?;

        core.execute(
            &self.config,
            &Command::Expunge,
            CommandClass::Default,
            false,
            VecDeque::new(),
        )
        .await?
        .ok_or(Error::Expunge)?;

        Ok(())
    }

    /// Changes message flags by sequence number, returning the updated
    /// flags the server reported per message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`], [`Error::InvalidArgument`] for an
    /// empty flag list or `\Recent`, [`Error::Store`] on refusal.
    pub async fn store(
        &self,
        set: &SeqSet,
        action: StoreAction,
    ) -> Result<Vec<(SeqNum, Flags)>> {
        self.store_impl(non_empty(set)?, action, false).await
    }

    /// Changes message flags by UID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`], [`Error::InvalidArgument`] for an
    /// empty flag list or `\Recent`, [`Error::Store`] on refusal.
    pub async fn uid_store(
        &self,
        set: &UidSet,
        action: StoreAction,
    ) -> Result<Vec<(SeqNum, Flags)>> {
        self.store_impl(non_empty(set)?, action, true).await
    }

    async fn store_impl(
        &self,
        set: String,
        action: StoreAction,
        uid: bool,
    ) -> Result<Vec<(SeqNum, Flags)>> {
        if action.flags().is_empty() {
            return Err(Error::InvalidArgument("empty flag list".to_string()));
        }
        if let Some(flag) = action.flags().iter().find(|f| !f.storable()) {
            return Err(Error::InvalidArgument(format!(
                "{flag} cannot be stored"
            )));
        }

        let output = self
            .run(
                Command::Store {
                    set,
                    action,
                    uid,
                    silent: false,
                },
                CommandClass::Default,
            )
            .await?
            .ok_or(Error::Store)?;

        Ok(output
            .untagged
            .into_iter()
            .filter_map(|u| match u {
                UntaggedResponse::Fetch { seq, items } => items.into_iter().find_map(|item| {
                    if let FetchItem::Flags(flags) = item {
                        Some((seq, flags))
                    } else {
                        None
                    }
                }),
                _ => None,
            })
            .collect())
    }

    /// Permanently removes messages flagged `\Deleted`, returning the
    /// expunged sequence numbers in server order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Expunge`] when EXPUNGE fails.
    pub async fn expunge(&self) -> Result<Vec<SeqNum>> {
        let output = self
            .run(Command::Expunge, CommandClass::Default)
            .await?
            .ok_or(Error::Expunge)?;

        Ok(output
            .untagged
            .into_iter()
            .filter_map(|u| match u {
                UntaggedResponse::Expunge(seq) => Some(seq),
                _ => None,
            })
            .collect())
    }

    /// Appends a message to a mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty message,
    /// [`Error::Command`] when APPEND fails.
    pub async fn append(
        &self,
        mailbox: &str,
        flags: Option<Vec<crate::types::Flag>>,
        message: &[u8],
    ) -> Result<()> {
        if message.is_empty() {
            return Err(Error::InvalidArgument("empty message".to_string()));
        }

        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;
        core.execute(
            &self.config,
            &Command::Append {
                mailbox: Mailbox::new(mailbox),
                flags,
                size: message.len(),
            },
            CommandClass::Append,
            false,
            VecDeque::from([message.to_vec()]),
        )
        .await?
        .ok_or(Error::Command)?;
        Ok(())
    }

    /// Creates a mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when CREATE fails.
    pub async fn create(&self, mailbox: &str) -> Result<()> {
        self.run(
            Command::Create {
                mailbox: Mailbox::new(mailbox),
            },
            CommandClass::Default,
        )
        .await?
        .ok_or(Error::Command)?;
        Ok(())
    }

    /// Deletes a mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when DELETE fails.
    pub async fn delete(&self, mailbox: &str) -> Result<()> {
        self.run(
            Command::Delete {
                mailbox: Mailbox::new(mailbox),
            },
            CommandClass::Default,
        )
        .await?
        .ok_or(Error::Command)?;
        Ok(())
    }

    /// Renames a mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when RENAME fails.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.run(
            Command::Rename {
                from: Mailbox::new(from),
                to: Mailbox::new(to),
            },
            CommandClass::Default,
        )
        .await?
        .ok_or(Error::Command)?;
        Ok(())
    }

    /// Subscribes to a mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when SUBSCRIBE fails.
    pub async fn subscribe(&self, mailbox: &str) -> Result<()> {
        self.run(
            Command::Subscribe {
                mailbox: Mailbox::new(mailbox),
            },
            CommandClass::Default,
        )
        .await?
        .ok_or(Error::Command)?;
        Ok(())
    }

    /// Unsubscribes from a mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] when UNSUBSCRIBE fails.
    pub async fn unsubscribe(&self, mailbox: &str) -> Result<()> {
        self.run(
            Command::Unsubscribe {
                mailbox: Mailbox::new(mailbox),
            },
            CommandClass::Default,
        )
        .await?
        .ok_or(Error::Command)?;
        Ok(())
    }

    /// Fetches headers for a sequence-number set: UID, flags, internal
    /// date, envelope, structure, and the raw header block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`] or [`Error::Fetch`].
    pub async fn fetch_headers(&self, set: &SeqSet) -> Result<Vec<Header>> {
        self.fetch_headers_impl(non_empty(set)?, false).await
    }

    /// Fetches headers for a UID set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`] or [`Error::Fetch`].
    pub async fn uid_fetch_headers(&self, set: &UidSet) -> Result<Vec<Header>> {
        self.fetch_headers_impl(non_empty(set)?, true).await
    }

    async fn fetch_headers_impl(&self, set: String, uid: bool) -> Result<Vec<Header>> {
        let cmd = Command::Fetch {
            set,
            items: vec![
                FetchAttribute::Uid,
                FetchAttribute::Flags,
                FetchAttribute::InternalDate,
                FetchAttribute::Envelope,
                FetchAttribute::BodyStructure,
                FetchAttribute::Body {
                    section: Some("HEADER".to_string()),
                    peek: true,
                },
            ],
            uid,
        };

        let output = self
            .run(cmd, CommandClass::Default)
            .await?
            .ok_or(Error::Fetch)?;

        Ok(output
            .untagged
            .into_iter()
            .filter_map(|u| match u {
                UntaggedResponse::Fetch { seq, items } => Some(Header::from_fetch(seq, &items)),
                _ => None,
            })
            .collect())
    }

    /// Fetches the MIME structure of a message without its content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] when the server reports no structure.
    pub async fn fetch_message_structure(&self, uid: Uid) -> Result<BodyStructure> {
        let cmd = Command::Fetch {
            set: uid.to_string(),
            items: vec![FetchAttribute::BodyStructure],
            uid: true,
        };

        let output = self
            .run(cmd, CommandClass::Fetch)
            .await?
            .ok_or(Error::Fetch)?;

        output
            .untagged
            .into_iter()
            .find_map(|u| match u {
                UntaggedResponse::Fetch { items, .. } => items.into_iter().find_map(|item| {
                    if let FetchItem::BodyStructure(bs) = item {
                        Some(bs)
                    } else {
                        None
                    }
                }),
                _ => None,
            })
            .ok_or_else(|| Error::Fetch("no BODYSTRUCTURE in response".to_string()))
    }

    /// Fetches one body section's raw bytes (`BODY.PEEK[<section>]`).
    ///
    /// Literals over the configured cap stream through the framer rather
    /// than being buffered as one allocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] when the section yields no content.
    pub async fn fetch_message_part(&self, uid: Uid, section: &str) -> Result<Vec<u8>> {
        if section.is_empty() {
            return Err(Error::InvalidArgument("empty section path".to_string()));
        }

        let cmd = Command::Fetch {
            set: uid.to_string(),
            items: vec![FetchAttribute::Body {
                section: Some(section.to_string()),
                peek: true,
            }],
            uid: true,
        };

        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;
        let output = core
            .execute(&self.config, &cmd, CommandClass::Fetch, true, VecDeque::new())
            .await?
            .ok_or(Error::Fetch)?;

        let inline = output.untagged.into_iter().find_map(|u| match u {
            UntaggedResponse::Fetch { items, .. } => items.into_iter().find_map(|item| {
                if let FetchItem::Body { data: Some(data), .. } = item {
                    Some(data)
                } else {
                    None
                }
            }),
            _ => None,
        });

        match inline {
            Some(data) if !data.is_empty() => Ok(data),
            Some(_) if !output.streamed.is_empty() => Ok(output.streamed),
            Some(data) => Ok(data),
            None => Err(Error::Fetch(format!("no content for section {section}"))),
        }
    }

    /// Fetches every part of a message by walking its structure.
    ///
    /// Parts arrive in depth-first section order; a multipart root
    /// contributes a synthetic part `0` carrying the container subtype
    /// and no bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] when the structure or any part fetch
    /// fails.
    pub async fn fetch_all_message_parts(&self, uid: Uid) -> Result<Vec<MessagePart>> {
        let structure = self.fetch_message_structure(uid).await?;
        self.fetch_parts_of(uid, &structure).await
    }

    async fn fetch_parts_of(
        &self,
        uid: Uid,
        structure: &BodyStructure,
    ) -> Result<Vec<MessagePart>> {
        let mut parts = Vec::new();
        for plan in flatten_structure(structure) {
            if plan.is_container {
                parts.push(MessagePart::from_plan(plan, Vec::new()));
                continue;
            }
            let data = self.fetch_message_part(uid, &plan.section).await?;
            parts.push(MessagePart::from_plan(plan, data));
        }
        Ok(parts)
    }

    /// Fetches one complete message: header plus every body part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] when the message does not exist or a
    /// part fetch fails.
    pub async fn fetch_message(&self, uid: Uid) -> Result<Message> {
        let headers = self.uid_fetch_headers(&UidSet::single(uid)).await?;
        let header = headers
            .into_iter()
            .next()
            .ok_or_else(|| Error::Fetch(format!("no message with UID {uid}")))?;

        let parts = match &header.structure {
            Some(structure) => self.fetch_parts_of(uid, structure).await?,
            None => self.fetch_all_message_parts(uid).await?,
        };

        Ok(Message { header, parts })
    }

    /// Fetches complete messages for a UID set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdSet`] or [`Error::Fetch`].
    pub async fn fetch_messages(&self, set: &UidSet) -> Result<Vec<Message>> {
        let headers = self.uid_fetch_headers(set).await?;

        let mut messages = Vec::with_capacity(headers.len());
        for header in headers {
            let Some(uid) = header.uid else {
                tracing::warn!(seq = header.seq.get(), "fetch returned no UID; skipping body");
                messages.push(Message {
                    header,
                    parts: Vec::new(),
                });
                continue;
            };
            let parts = match &header.structure {
                Some(structure) => self.fetch_parts_of(uid, structure).await?,
                None => self.fetch_all_message_parts(uid).await?,
            };
            messages.push(Message { header, parts });
        }
        Ok(messages)
    }

    // === shared runners ===

    pub(crate) async fn run(
        &self,
        cmd: Command,
        class: CommandClass,
    ) -> Result<CommandOutput> {
        self.run_gated(cmd, class, None).await
    }

    async fn run_gated(
        &self,
        cmd: Command,
        class: CommandClass,
        requires: Option<Capability>,
    ) -> Result<CommandOutput> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;

        if let Some(capability) = requires
            && !core.capability_check(&self.config, &capability).await?
        {
            return Err(Error::CommandNotSupported(capability.to_string()));
        }

        core.execute(&self.config, &cmd, class, false, VecDeque::new())
            .await
    }

    async fn has_capability(&self, capability: Capability) -> Result<bool> {
        self.finish_idle().await;
        let mut core = self.queue.acquire().await;
        core.ensure_connected(&self.config).await?;
        core.capability_check(&self.config, &capability).await
    }

    /// Ends an active IDLE, if any, and waits for its completion. Safe
    /// to call when no IDLE is active.
    pub(crate) async fn finish_idle(&self) {
        let control = self.idle_slot.lock().ok().and_then(|slot| slot.clone());
        if let Some(control) = control {
            control.finish().await;
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish_non_exhaustive()
    }
}

fn non_empty<T: crate::types::MessageId>(set: &crate::types::IdSet<T>) -> Result<String> {
    if set.is_empty() {
        return Err(Error::EmptyIdSet);
    }
    Ok(set.to_string())
}

fn search_numbers(output: &CommandOutput) -> Vec<u32> {
    output
        .untagged
        .iter()
        .flat_map(|u| match u {
            UntaggedResponse::Search(nums) => nums.clone(),
            _ => Vec::new(),
        })
        .collect()
}

fn sort_numbers(output: &CommandOutput) -> Vec<u32> {
    output
        .untagged
        .iter()
        .flat_map(|u| match u {
            UntaggedResponse::Sort(nums) | UntaggedResponse::Search(nums) => nums.clone(),
            _ => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tag_format_and_widening() {
        let mut core = Core::new();
        assert_eq!(core.next_tag(), "A001");
        assert_eq!(core.next_tag(), "A002");

        core.tag_counter = 998;
        assert_eq!(core.next_tag(), "A999");
        assert_eq!(core.next_tag(), "A1000");
    }

    #[test]
    fn tag_counter_wraps_past_max() {
        let mut core = Core::new();
        core.tag_counter = u32::MAX;
        assert_eq!(core.next_tag(), "A001");
    }

    #[test]
    fn xoauth2_payload_shape() {
        let payload = xoauth2_payload("user@example.com", "token123");
        let decoded = mailbound_mime::decode_base64(&payload).unwrap();
        assert_eq!(
            decoded,
            b"user=user@example.com\x01auth=Bearer token123\x01\x01"
        );
    }

    #[test]
    fn plain_payload_shape() {
        let payload = plain_payload("alice", "pw");
        let decoded = mailbound_mime::decode_base64(&payload).unwrap();
        assert_eq!(decoded, b"\0alice\0pw");
    }

    #[test]
    fn mailbox_status_derivation() {
        use crate::types::{SeqNum, Uid, UidValidity};

        let output = CommandOutput {
            untagged: vec![
                UntaggedResponse::Exists(172),
                UntaggedResponse::Recent(1),
                UntaggedResponse::Ok {
                    code: Some(ResponseCode::UidValidity(
                        UidValidity::new(3_857_529_045).unwrap(),
                    )),
                    text: "UIDs valid".to_string(),
                },
                UntaggedResponse::Ok {
                    code: Some(ResponseCode::UidNext(Uid::new(4392).unwrap())),
                    text: "Predicted next UID".to_string(),
                },
                UntaggedResponse::Ok {
                    code: Some(ResponseCode::Unseen(SeqNum::new(12).unwrap())),
                    text: "first unseen".to_string(),
                },
            ],
            streamed: Vec::new(),
            status: Status::Ok,
            code: Some(ResponseCode::ReadWrite),
            text: "SELECT completed".to_string(),
        };

        let status = mailbox_status_from(&output, false);
        assert_eq!(status.exists, 172);
        assert_eq!(status.recent, 1);
        assert_eq!(status.uid_validity.unwrap().get(), 3_857_529_045);
        assert_eq!(status.uid_next.unwrap().get(), 4392);
        assert_eq!(status.unseen.unwrap().get(), 12);
        assert!(!status.read_only);
    }

    #[test]
    fn examine_defaults_to_read_only() {
        let output = CommandOutput {
            untagged: Vec::new(),
            streamed: Vec::new(),
            status: Status::Ok,
            code: None,
            text: String::new(),
        };
        assert!(mailbox_status_from(&output, true).read_only);
        assert!(!mailbox_status_from(&output, false).read_only);
    }
}
