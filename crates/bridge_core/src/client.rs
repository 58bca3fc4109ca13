use std::{
    future::Future,
    sync::{Arc, Mutex as StdMutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{BackfillReaction, MessageId, ThreadId, UserId},
    error::{BridgeError, ErrorCode},
    protocol::{
        FetchMessagesParams, FetchMessagesResponse, LoginOutcome, OutgoingMessage, SentMessage,
        UserLoginMetadata,
    },
};
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use voyager_client::{
    cookies::has_session_cookie,
    routing::{query::FetchMessagesVariables, response::MessageElement},
    types::UserLoginProfile,
    ClientEvent, CookieJar, StreamCompletion, StreamExit, VoyagerClient, VoyagerError,
};

use crate::{
    config::BridgeSettings,
    error::{bridge_error, BridgeResult},
    inbound::{timestamp, InboundTranslator},
    outbound,
    sink::EventSink,
};

pub const DEFAULT_BACKFILL_COUNT: u32 = 20;

const SERVER_CURSOR_PREFIX: &str = "c:";
const ANCHOR_CURSOR_PREFIX: &str = "t:";

/// Opaque backfill position handed to the host: either the server's
/// previous-page cursor or a delivered-at anchor in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillCursor {
    Server(String),
    Anchor(i64),
}

impl BackfillCursor {
    pub fn encode(&self) -> String {
        match self {
            Self::Server(cursor) => format!("{SERVER_CURSOR_PREFIX}{cursor}"),
            Self::Anchor(millis) => format!("{ANCHOR_CURSOR_PREFIX}{millis}"),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(cursor) = raw.strip_prefix(SERVER_CURSOR_PREFIX) {
            return (!cursor.is_empty()).then(|| Self::Server(cursor.to_string()));
        }
        raw.strip_prefix(ANCHOR_CURSOR_PREFIX)?
            .parse()
            .ok()
            .map(Self::Anchor)
    }
}

#[async_trait]
pub trait BridgeHandle: Send + Sync {
    async fn connect(&self) -> BridgeResult<()>;
    async fn disconnect(&self) -> BridgeResult<()>;
    fn is_logged_in(&self) -> bool;
    async fn fetch_messages(&self, params: FetchMessagesParams)
        -> BridgeResult<FetchMessagesResponse>;
    async fn send_message(&self, message: OutgoingMessage) -> BridgeResult<SentMessage>;
    async fn edit_message(&self, message_id: &MessageId, body: &str) -> BridgeResult<()>;
    async fn send_reaction(&self, message_id: &MessageId, emoji: &str, add: bool)
        -> BridgeResult<()>;
    async fn mark_read(&self, threads: &[ThreadId], read: bool) -> BridgeResult<()>;
    async fn start_typing(&self, thread_id: &ThreadId) -> BridgeResult<()>;
    async fn delete_thread(&self, thread_id: &ThreadId) -> BridgeResult<()>;
    async fn current_user_profile(&self) -> BridgeResult<UserLoginProfile>;
    fn current_user_id(&self) -> Option<UserId>;
    async fn download_media(&self, url: &str) -> BridgeResult<Vec<u8>>;
    async fn logout(&self) -> BridgeResult<()>;
    fn login_metadata(&self) -> UserLoginMetadata;
}

struct ConnectionTasks {
    stop: CancellationToken,
    pump_stop: CancellationToken,
    pump: JoinHandle<()>,
    supervisor: JoinHandle<()>,
    sync: JoinHandle<()>,
}

pub struct BridgeClient {
    settings: BridgeSettings,
    voyager: Arc<VoyagerClient>,
    sink: Arc<dyn EventSink>,
    translator: StdMutex<InboundTranslator>,
    connection: Mutex<Option<ConnectionTasks>>,
}

impl BridgeClient {
    pub fn new(
        settings: BridgeSettings,
        metadata: &UserLoginMetadata,
        sink: Arc<dyn EventSink>,
    ) -> BridgeResult<Arc<Self>> {
        let voyager = VoyagerClient::new(
            CookieJar::from_cookie_string(&metadata.cookies),
            settings.client_options(),
        )
        .map_err(bridge_error)?;
        let translator = InboundTranslator::new(settings.displayname_template.clone());
        Ok(Arc::new(Self {
            settings,
            voyager,
            sink,
            translator: StdMutex::new(translator),
            connection: Mutex::new(None),
        }))
    }

    pub async fn login(
        settings: BridgeSettings,
        cookies: &str,
        sink: Arc<dyn EventSink>,
    ) -> BridgeResult<(Arc<Self>, LoginOutcome)> {
        if !has_session_cookie(cookies) {
            return Err(BridgeError::new(
                ErrorCode::BadCredentials,
                "cookie string has no session cookie",
            ));
        }
        let client = Self::new(
            settings,
            &UserLoginMetadata {
                cookies: cookies.to_string(),
            },
            sink,
        )?;
        let user_id = client.load_session().await?;
        let profile = client
            .voyager
            .current_user_profile()
            .await
            .map_err(bridge_error)?;
        let remote_name = format!(
            "{} {}",
            profile.mini_profile.first_name, profile.mini_profile.last_name
        )
        .trim()
        .to_string();
        info!(%user_id, %remote_name, "bridge: logged in");

        let outcome = LoginOutcome {
            user_id,
            remote_name,
            metadata: client.login_metadata(),
        };
        Ok((client, outcome))
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn voyager(&self) -> &Arc<VoyagerClient> {
        &self.voyager
    }

    fn translator(&self) -> MutexGuard<'_, InboundTranslator> {
        self.translator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn load_session(&self) -> BridgeResult<UserId> {
        self.voyager
            .load_messages_page()
            .await
            .map_err(bridge_error)?;
        let user_id = self
            .voyager
            .current_user_id()
            .map(UserId::new)
            .ok_or_else(|| bridge_error(VoyagerError::CurrentUserIdNotFound))?;
        self.translator().set_own_user(user_id.clone());
        Ok(user_id)
    }

    async fn dispatch(&self, event: ClientEvent) {
        let translated = self.translator().translate(event);
        if let Some(event) = translated {
            self.sink.handle_event(event).await;
        }
    }

    pub async fn sync_threads(&self) -> BridgeResult<usize> {
        let threads = self
            .voyager
            .list_all_threads()
            .await
            .map_err(bridge_error)?;
        let with_messages = self.settings.sync_initial_messages;
        for thread in &threads {
            let events = self.translator().thread_sync(thread, with_messages);
            for event in events {
                self.sink.handle_event(event).await;
            }
        }
        info!(count = threads.len(), with_messages, "bridge: thread sync finished");
        Ok(threads.len())
    }

    async fn expand_reactions(&self, message: &MessageElement) -> BridgeResult<Vec<BackfillReaction>> {
        let mut reactions = Vec::new();
        for summary in &message.reaction_summaries {
            let participants = self
                .voyager
                .reactions_for_emoji(&message.entity_urn, &summary.emoji)
                .await
                .map_err(bridge_error)?;
            let expanded = self.translator().backfill_reactions(summary, &participants);
            reactions.extend(expanded);
        }
        Ok(reactions)
    }

    /// Stops reconnects and the initial sync, runs `close` against the
    /// Voyager client, then stops the pump once it has delivered what
    /// `close` emitted. The flag is whether a connection was running.
    async fn shut_down<T>(&self, close: impl Future<Output = T>) -> (bool, T) {
        let mut connection = self.connection.lock().await;
        let Some(tasks) = connection.take() else {
            return (false, close.await);
        };
        tasks.stop.cancel();
        join_task("supervisor", tasks.supervisor).await;
        join_task("sync", tasks.sync).await;

        let closed = close.await;
        tasks.pump_stop.cancel();
        join_task("pump", tasks.pump).await;
        (true, closed)
    }

    fn spawn_pump(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<ClientEvent>,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                // Queued events are drained before the stop signal is honored.
                let received = tokio::select! {
                    biased;
                    received = events.recv() => received,
                    _ = stop.cancelled() => break,
                };
                match received {
                    Ok(event) => client.dispatch(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "bridge: event pump lagged, events dropped")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("bridge: event pump stopped");
        })
    }

    fn spawn_supervisor(
        self: &Arc<Self>,
        completion: StreamCompletion,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut completion = completion;
            let mut failures = 0;
            loop {
                let exit = tokio::select! {
                    exit = completion.wait() => exit,
                    _ = stop.cancelled() => return,
                };
                if exit == StreamExit::Cancelled || stop.is_cancelled() {
                    debug!("bridge: realtime stream closed on request");
                    return;
                }
                // Only a stream the server confirmed clears the failure count.
                if exit.was_ready() {
                    failures = 0;
                }
                warn!(?exit, failures, "bridge: realtime stream dropped");
                match client.reconnect(&stop, &mut failures).await {
                    Some(next) => completion = next,
                    None => return,
                }
            }
        })
    }

    /// Reopens the stream with linear backoff. `failures` counts drops and
    /// failed attempts since the last confirmed stream. `None` when stopped,
    /// out of attempts or the session is dead.
    async fn reconnect(
        &self,
        stop: &CancellationToken,
        failures: &mut u32,
    ) -> Option<StreamCompletion> {
        let max_attempts = self.settings.max_reconnect_attempts;
        while *failures < max_attempts {
            *failures += 1;
            let attempt = *failures;
            let delay = self.settings.reconnect_backoff() * attempt;
            info!(attempt, max_attempts, ?delay, "bridge: reconnecting realtime stream");
            tokio::select! {
                _ = stop.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
            let result = tokio::select! {
                _ = stop.cancelled() => return None,
                result = self.voyager.connect() => result,
            };
            match result {
                Ok(completion) => {
                    info!(attempt, "bridge: realtime stream reconnected");
                    return Some(completion);
                }
                Err(err) if err.root_cause().is_permanent() => {
                    error!(error = %err, "bridge: session is no longer valid, giving up");
                    return None;
                }
                Err(err) => warn!(attempt, error = %err, "bridge: reconnect failed"),
            }
        }
        error!(max_attempts, "bridge: reconnect attempts exhausted");
        None
    }

    fn spawn_initial_sync(self: &Arc<Self>, stop: CancellationToken) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => debug!("bridge: thread sync cancelled"),
                result = client.sync_threads() => {
                    if let Err(err) = result {
                        error!(error = %err, "bridge: thread sync failed");
                    }
                }
            }
        })
    }
}

async fn join_task(name: &str, task: JoinHandle<()>) {
    if let Err(err) = task.await {
        warn!(task = name, error = %err, "bridge: background task failed");
    }
}

#[async_trait]
impl BridgeHandle for Arc<BridgeClient> {
    async fn connect(&self) -> BridgeResult<()> {
        let mut connection = self.connection.lock().await;
        if connection.is_some() {
            return Err(BridgeError::new(ErrorCode::Internal, "already connected"));
        }

        self.load_session().await?;
        let events = self.voyager.subscribe_events();
        let completion = self.voyager.connect().await.map_err(bridge_error)?;

        let stop = CancellationToken::new();
        let pump_stop = CancellationToken::new();
        *connection = Some(ConnectionTasks {
            pump: self.spawn_pump(events, pump_stop.clone()),
            supervisor: self.spawn_supervisor(completion, stop.clone()),
            sync: self.spawn_initial_sync(stop.clone()),
            stop,
            pump_stop,
        });
        info!("bridge: connected");
        Ok(())
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        let (was_connected, result) = self.shut_down(self.voyager.disconnect()).await;
        if !was_connected {
            return Err(BridgeError::new(ErrorCode::NotConnected, "not connected"));
        }
        info!("bridge: disconnected");
        match result {
            Ok(()) | Err(VoyagerError::NotConnected) => Ok(()),
            Err(err) => Err(bridge_error(err)),
        }
    }

    fn is_logged_in(&self) -> bool {
        has_session_cookie(&self.voyager.cookie_string())
    }

    async fn fetch_messages(
        &self,
        params: FetchMessagesParams,
    ) -> BridgeResult<FetchMessagesResponse> {
        let count = if params.count == 0 {
            DEFAULT_BACKFILL_COUNT
        } else {
            params.count
        };
        let mut variables = FetchMessagesVariables {
            conversation_urn: params.thread_id.to_string(),
            ..FetchMessagesVariables::default()
        };
        let cursor = match params.cursor.as_deref() {
            Some(raw) => Some(BackfillCursor::parse(raw).ok_or_else(|| {
                BridgeError::new(ErrorCode::Protocol, format!("invalid backfill cursor {raw:?}"))
            })?),
            None => None,
        };
        match cursor {
            Some(BackfillCursor::Server(prev_cursor)) if !params.forward => {
                variables.prev_cursor = prev_cursor;
                variables.count = i64::from(count);
            }
            Some(BackfillCursor::Server(_)) | None => {
                variables.delivered_at = params
                    .anchor_timestamp
                    .unwrap_or_else(Utc::now)
                    .timestamp_millis();
            }
            Some(BackfillCursor::Anchor(millis)) => variables.delivered_at = millis,
        }
        if variables.prev_cursor.is_empty() {
            if params.forward {
                variables.count_after = i64::from(count);
            } else {
                variables.count_before = i64::from(count);
            }
        }

        let page = self
            .voyager
            .fetch_messages(variables)
            .await
            .map_err(bridge_error)?;
        let mut messages = Vec::with_capacity(page.messages.len());
        for message in &page.messages {
            let reactions = self.expand_reactions(message).await?;
            let backfilled = self.translator().backfill_message(message, reactions);
            messages.push(backfilled);
        }

        let next_cursor = if params.forward {
            page.messages
                .last()
                .map(|message| BackfillCursor::Anchor(message.delivered_at))
        } else if !page.metadata.prev_cursor.is_empty() {
            Some(BackfillCursor::Server(page.metadata.prev_cursor.clone()))
        } else {
            page.messages
                .first()
                .map(|message| BackfillCursor::Anchor(message.delivered_at))
        };
        let has_more = messages.len() >= count as usize;
        debug!(
            thread = %params.thread_id,
            count = messages.len(),
            has_more,
            "bridge: fetched messages"
        );
        Ok(FetchMessagesResponse {
            messages,
            cursor: next_cursor.map(|cursor| cursor.encode()),
            has_more,
            forward: params.forward,
        })
    }

    async fn send_message(&self, message: OutgoingMessage) -> BridgeResult<SentMessage> {
        let attachment = match outbound::pending_upload(&message)? {
            Some((upload_type, media)) => {
                let uploaded = self
                    .voyager
                    .upload_media(
                        upload_type,
                        &media.file_name,
                        media.data.clone(),
                        &media.mime_type,
                    )
                    .await
                    .map_err(bridge_error)?;
                Some(outbound::attachment_render_content(media, &uploaded))
            }
            None => None,
        };

        let sent = self
            .voyager
            .send_message(outbound::send_payload(&message, attachment))
            .await
            .map_err(bridge_error)?;
        Ok(SentMessage {
            id: MessageId::new(sent.data.entity_urn),
            timestamp: if sent.data.delivered_at > 0 {
                timestamp(sent.data.delivered_at)
            } else {
                Utc::now()
            },
        })
    }

    async fn edit_message(&self, message_id: &MessageId, body: &str) -> BridgeResult<()> {
        self.voyager
            .edit_message(message_id.as_str(), outbound::edit_body(body))
            .await
            .map_err(bridge_error)
    }

    async fn send_reaction(
        &self,
        message_id: &MessageId,
        emoji: &str,
        add: bool,
    ) -> BridgeResult<()> {
        self.voyager
            .send_reaction(message_id.as_str(), emoji, add)
            .await
            .map_err(bridge_error)
    }

    async fn mark_read(&self, threads: &[ThreadId], read: bool) -> BridgeResult<()> {
        if threads.is_empty() {
            return Ok(());
        }
        self.voyager
            .mark_threads_read(&outbound::thread_urns(threads), read)
            .await
            .map(|_| ())
            .map_err(bridge_error)
    }

    async fn start_typing(&self, thread_id: &ThreadId) -> BridgeResult<()> {
        self.voyager
            .start_typing(thread_id.as_str())
            .await
            .map_err(bridge_error)
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> BridgeResult<()> {
        self.voyager
            .delete_conversation(thread_id.as_str())
            .await
            .map_err(bridge_error)
    }

    async fn current_user_profile(&self) -> BridgeResult<UserLoginProfile> {
        self.voyager
            .current_user_profile()
            .await
            .map_err(bridge_error)
    }

    fn current_user_id(&self) -> Option<UserId> {
        self.voyager.current_user_id().map(UserId::new)
    }

    async fn download_media(&self, url: &str) -> BridgeResult<Vec<u8>> {
        self.voyager.download_media(url).await.map_err(bridge_error)
    }

    async fn logout(&self) -> BridgeResult<()> {
        let (_, result) = self.shut_down(self.voyager.logout()).await;
        result.map_err(bridge_error)
    }

    fn login_metadata(&self) -> UserLoginMetadata {
        UserLoginMetadata {
            cookies: self.voyager.cookie_string(),
        }
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
