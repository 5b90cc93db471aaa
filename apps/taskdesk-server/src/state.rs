use std::sync::Arc;
use taskdesk_core::{
    AccountService, AppConfig, AttachmentStore, LogResetNotifier, Renderers, ResetNotifier,
    TaskDatabase, TokenSigner,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub db: TaskDatabase,
    pub accounts: AccountService,
    pub renderers: Arc<Renderers>,
    pub attachments: AttachmentStore,
    /// Largest accepted upload body, in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    /// State whose reset links are written to the log
    #[must_use]
    pub fn new(db: TaskDatabase, config: &AppConfig) -> Self {
        let notifier = Arc::new(LogResetNotifier::new(config.reset_link_base.clone()));
        Self::with_notifier(db, config, notifier)
    }

    #[must_use]
    pub fn with_notifier(
        db: TaskDatabase,
        config: &AppConfig,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        let tokens = TokenSigner::new(
            config.jwt_secret.as_bytes(),
            config.session_ttl_secs,
            config.reset_ttl_secs,
        );
        Self {
            accounts: AccountService::new(db.clone(), tokens, notifier),
            db,
            renderers: Arc::new(Renderers::with_max_tasks(config.report_max_tasks)),
            attachments: AttachmentStore::new(&config.upload_dir),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}
