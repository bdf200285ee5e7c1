pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repo;
pub mod routes;
pub mod services;
pub mod ws;

use std::sync::Arc;

use auth::{Authenticator, SessionAuthenticator};
use config::Config;
use repo::Repositories;
use services::{
    calls::CallRelay,
    expiry::ExpirySweeper,
    media::{LocalMediaStore, MediaStore},
    push::{LogNotifier, PushDispatcher, PushNotifier, WebhookNotifier},
    reactions::ReactionFanout,
    router::MessageRouter,
};
use ws::{gateway::ConnectionRegistry, presence::PresenceTracker};

pub struct AppState {
    pub config: Config,
    pub repos: Repositories,
    pub registry: Arc<ConnectionRegistry>,
    pub presence: Arc<PresenceTracker>,
    pub router: MessageRouter,
    pub reactions: ReactionFanout,
    pub calls: CallRelay,
    pub sweeper: Arc<ExpirySweeper>,
    pub auth: Arc<dyn Authenticator>,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    /// SQLite-backed state with the collaborators picked from `config`.
    /// Must be called inside a Tokio runtime: it starts the presence task.
    pub fn new(pool: sqlx::SqlitePool, config: Config) -> Arc<Self> {
        let notifier: Arc<dyn PushNotifier> = match config.push_webhook_url.as_deref() {
            Some(url) => match WebhookNotifier::new(url) {
                Ok(n) => Arc::new(n),
                Err(e) => {
                    tracing::warn!("{}; falling back to log-only push", e);
                    Arc::new(LogNotifier)
                }
            },
            None => Arc::new(LogNotifier),
        };
        let media = Arc::new(LocalMediaStore::new(
            &config.upload_dir,
            &config.public_base_url,
        ));
        let auth = Arc::new(SessionAuthenticator::new(pool.clone()));

        Self::with_collaborators(Repositories::sqlite(pool), config, auth, media, notifier)
    }

    pub fn with_collaborators(
        repos: Repositories,
        config: Config,
        auth: Arc<dyn Authenticator>,
        media: Arc<dyn MediaStore>,
        notifier: Arc<dyn PushNotifier>,
    ) -> Arc<Self> {
        let (registry, presence_feed) = ConnectionRegistry::with_presence_feed();
        let registry = Arc::new(registry);

        let presence = Arc::new(PresenceTracker::new(
            registry.clone(),
            repos.users.clone(),
            repos.chats.clone(),
        ));
        presence.clone().spawn(presence_feed);

        let ice_servers = config.ice_servers();
        let push = Arc::new(PushDispatcher::new(notifier, repos.users.clone()));

        Arc::new(Self {
            router: MessageRouter::new(repos.clone(), registry.clone(), push.clone()),
            reactions: ReactionFanout::new(
                repos.messages.clone(),
                repos.chats.clone(),
                registry.clone(),
            ),
            calls: CallRelay::new(repos.clone(), registry.clone(), push, ice_servers),
            sweeper: Arc::new(ExpirySweeper::new(
                repos.messages.clone(),
                repos.statuses.clone(),
            )),
            presence,
            registry,
            repos,
            config,
            auth,
            media,
        })
    }
}
