//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use nounou_shared::time::{Clock, SystemClock};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    domain::{Broadcaster, PushNotifier},
    infrastructure::{
        broadcaster::InProcessBroadcaster,
        push::{HttpPushNotifier, LogPushNotifier},
        repository::InMemoryStore,
    },
    usecase::{
        AccessGuard, ChannelUseCase, ConversationLocks, EventDispatcher, MessagingUseCase,
        NegotiationUseCase, PresenceTracker,
    },
};

use super::{
    handler::{
        accept_proposal, archive_conversation, authorize_channel, babysitter_counter,
        counter_offer, current_application, decline, expire, get_messages, health_check,
        list_conversations, list_online, mark_read, notify_typing, propose,
        respond_to_counter_offer, send_message, upsert_user, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Messaging core server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerConfig::default());
/// server.run().await?;
/// ```
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Wire the in-memory store, the in-process broadcaster and every use case.
    pub fn new(config: ServerConfig) -> Self {
        let push_notifier: Arc<dyn PushNotifier> = match &config.push_webhook_url {
            Some(url) => {
                tracing::info!("Push notifications are posted to {}", url);
                Arc::new(HttpPushNotifier::new(url.clone()))
            }
            None => Arc::new(LogPushNotifier),
        };
        Self::with_components(
            config,
            Arc::new(InProcessBroadcaster::new()),
            push_notifier,
            Arc::new(SystemClock),
        )
    }

    pub fn with_components(
        config: ServerConfig,
        broadcaster: Arc<dyn Broadcaster>,
        push_notifier: Arc<dyn PushNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // 1. Repository
        let store = Arc::new(InMemoryStore::new());

        // 2. Delivery
        let dispatcher = Arc::new(EventDispatcher::new(
            broadcaster.clone(),
            push_notifier,
            config.broadcast_attempts,
        ));
        let locks = Arc::new(ConversationLocks::new());

        // 3. UseCases
        let guard = Arc::new(AccessGuard::new(store.clone(), store.clone()));
        let presence = Arc::new(PresenceTracker::new(
            dispatcher.clone(),
            clock.clone(),
            config.heartbeat_timeout,
        ));
        let messaging = Arc::new(MessagingUseCase::new(
            guard.clone(),
            store.clone(),
            store.clone(),
            dispatcher.clone(),
            presence.clone(),
            locks.clone(),
            clock.clone(),
            config.max_message_length,
        ));
        let negotiation = Arc::new(NegotiationUseCase::new(
            guard.clone(),
            store.clone(),
            store.clone(),
            dispatcher,
            locks,
            clock,
            config.max_message_length,
        ));
        let channel = Arc::new(ChannelUseCase::new(
            guard.clone(),
            presence.clone(),
            broadcaster,
        ));

        // 4. AppState
        let state = Arc::new(AppState {
            users: store,
            guard,
            presence,
            channel,
            messaging,
            negotiation,
            heartbeat_interval: config.heartbeat_interval,
            heartbeat_timeout: config.heartbeat_timeout,
        });

        Self { config, state }
    }

    /// Build the router with every endpoint.
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/presence", get(list_online))
            .route("/broadcasting/auth", post(authorize_channel))
            .route("/api/conversations", get(list_conversations))
            .route(
                "/api/conversations/{conversation_id}/messages",
                get(get_messages).post(send_message),
            )
            .route(
                "/api/conversations/{conversation_id}/messages/{message_id}/read",
                post(mark_read),
            )
            .route(
                "/api/conversations/{conversation_id}/typing",
                post(notify_typing),
            )
            .route(
                "/api/conversations/{conversation_id}/archive",
                post(archive_conversation),
            )
            .route("/api/applications", post(propose))
            .route(
                "/api/conversations/{conversation_id}/application",
                get(current_application),
            )
            .route(
                "/api/conversations/{conversation_id}/application/counter-offer",
                post(counter_offer),
            )
            .route(
                "/api/conversations/{conversation_id}/application/babysitter-counter",
                post(babysitter_counter),
            )
            .route(
                "/api/conversations/{conversation_id}/application/respond",
                post(respond_to_counter_offer),
            )
            .route(
                "/api/conversations/{conversation_id}/application/accept",
                post(accept_proposal),
            )
            .route(
                "/api/conversations/{conversation_id}/application/decline",
                post(decline),
            )
            // 外部システム向け
            .route("/internal/users/{user_id}", put(upsert_user))
            .route(
                "/internal/conversations/{conversation_id}/application/expire",
                post(expire),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until a shutdown signal arrives.
    pub async fn serve(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        let sweeper = self
            .state
            .presence
            .clone()
            .spawn_sweeper(self.config.heartbeat_interval);

        tracing::info!("Nounou server listening on {}", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();
        result?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Bind to the configured host and port and serve.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address or
    /// if there's an error during server execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws?user_id=<id>", bind_addr);
        self.serve(listener).await
    }
}
