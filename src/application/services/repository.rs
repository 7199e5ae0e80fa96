use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::application::ports::remote::FeedApi;
use crate::application::services::session::AuthSession;
use crate::domain::entities::action::{ActionKind, PendingAction};
use crate::domain::entities::auth::AuthState;
use crate::domain::entities::post::{Attachment, AttachmentKind, FeedEntry, MediaUpload};
use crate::domain::feed_item::{insert_day_separators, FeedItem};
use crate::infrastructure::database::FeedStore;
use crate::shared::config::PagingConfig;
use crate::shared::error::{ActionError, FeedError};

/// Result of a like/dislike request.
#[derive(Debug, Clone, PartialEq)]
pub enum LikeOutcome {
    Applied(FeedEntry),
    /// The target is still an unconfirmed optimistic write; the server does
    /// not know it exists yet, so the reaction is silently skipped.
    SkippedPending,
}

enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    fn action(&self, id: i64) -> PendingAction {
        match self {
            Reaction::Like => PendingAction::like(id),
            Reaction::Dislike => PendingAction::dislike(id),
        }
    }
}

/// Unified read model plus all mutating feed operations with
/// optimistic-local-then-confirm-remote semantics.
pub struct FeedRepository {
    api: Arc<dyn FeedApi>,
    store: FeedStore,
    session: Arc<AuthSession>,
    paging: PagingConfig,
    /// Synthetic ids for pending placeholders; negative so they can never
    /// collide with a server-assigned id.
    placeholder_seq: AtomicI64,
}

impl FeedRepository {
    pub fn new(
        api: Arc<dyn FeedApi>,
        store: FeedStore,
        session: Arc<AuthSession>,
        paging: PagingConfig,
    ) -> Self {
        Self {
            api,
            store,
            session,
            paging,
            placeholder_seq: AtomicI64::new(-1),
        }
    }

    /// Subscribable stream of the visible feed page, re-emitted whenever the
    /// cache or the auth state changes. Ownership and liked-by-me flags are
    /// tagged against the identity current at emission time, so an account
    /// switch restarts the derivation with fresh flags.
    pub fn feed_stream(&self) -> impl Stream<Item = Vec<FeedEntry>> + Send + 'static {
        let store = self.store.clone();
        let mut cache_rx = self.store.subscribe();
        let mut auth_rx = self.session.subscribe();
        let limit = self.paging.initial_load_size;

        async_stream::stream! {
            loop {
                let user_id = { auth_rx.borrow_and_update().id };
                match store.visible_page(limit, None).await {
                    Ok(mut page) => {
                        for entry in &mut page {
                            retag_for_user(entry, user_id);
                        }
                        yield page;
                    }
                    Err(e) => warn!(error = %e, "feed read failed, waiting for next change"),
                }

                tokio::select! {
                    changed = cache_rx.changed() => if changed.is_err() { break },
                    changed = auth_rx.changed() => if changed.is_err() { break },
                }
            }
        }
    }

    /// The same read model decorated with day separators, for consumers
    /// that render them directly.
    pub fn feed_item_stream(&self) -> impl Stream<Item = Vec<FeedItem>> + Send + 'static {
        self.feed_stream()
            .map(|page| insert_day_separators(page, Utc::now()))
    }

    pub async fn like_by_id(&self, id: i64) -> Result<LikeOutcome, ActionError> {
        self.react(id, Reaction::Like).await
    }

    pub async fn dislike_by_id(&self, id: i64) -> Result<LikeOutcome, ActionError> {
        self.react(id, Reaction::Dislike).await
    }

    async fn react(&self, id: i64, reaction: Reaction) -> Result<LikeOutcome, ActionError> {
        self.require_authorized(|| reaction.action(id))?;

        let entry = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| ActionError::new(reaction.action(id), e))?
            .ok_or_else(|| {
                ActionError::new(
                    reaction.action(id),
                    FeedError::LocalData(format!("post {id} is not cached")),
                )
            })?;

        if entry.pending {
            debug!(id, "reaction skipped, entry not confirmed yet");
            return Ok(LikeOutcome::SkippedPending);
        }

        let call = match reaction {
            Reaction::Like => self.api.like(id).await,
            Reaction::Dislike => self.api.dislike(id).await,
        };
        let confirmed = call
            .map_err(|e| ActionError::new(reaction.action(id), e))?
            .into_confirmed();

        self.store
            .upsert(std::slice::from_ref(&confirmed))
            .await
            .map_err(|e| ActionError::new(reaction.action(id), e))?;

        Ok(LikeOutcome::Applied(confirmed))
    }

    /// Optimistic save. A fresh save writes a visible pending placeholder
    /// first so the UI shows the post immediately; the confirmed server copy
    /// then replaces the placeholder in one transaction. On failure the
    /// placeholder stays in the cache, marked pending, for manual retry.
    pub async fn save(&self, post: &FeedEntry, retry: bool) -> Result<FeedEntry, ActionError> {
        let user = self.require_authorized(|| PendingAction::save(post.clone()))?;

        let placeholder_id = if retry {
            post.id
        } else {
            self.placeholder_seq.fetch_sub(1, Ordering::Relaxed)
        };

        if !retry {
            let mut placeholder = post.clone();
            placeholder.id = placeholder_id;
            placeholder.author_id = user.id;
            placeholder.pending = true;
            placeholder.visible = true;
            self.store
                .upsert(std::slice::from_ref(&placeholder))
                .await
                .map_err(|e| ActionError::new(PendingAction::save(placeholder.clone()), e))?;
        }

        // Context to retry verbatim: the post under its placeholder id.
        let retry_context = {
            let mut p = post.clone();
            p.id = placeholder_id;
            p
        };

        // Id assignment is server-owned.
        let mut outgoing = post.clone();
        outgoing.id = 0;
        outgoing.pending = false;

        match self.api.create(&outgoing).await {
            Ok(confirmed) => {
                let confirmed = confirmed.into_confirmed();
                let save_err =
                    |e| ActionError::new(PendingAction::save(retry_context.clone()), e);

                let mut tx = self.store.begin().await.map_err(save_err)?;
                tx.upsert_all(std::slice::from_ref(&confirmed))
                    .await
                    .map_err(save_err)?;
                if placeholder_id != confirmed.id {
                    tx.delete_by_id(placeholder_id).await.map_err(save_err)?;
                }
                tx.commit().await.map_err(save_err)?;

                info!(id = confirmed.id, "post confirmed by server");
                Ok(confirmed)
            }
            Err(e) => {
                warn!(error = %e, placeholder_id, "save failed, placeholder retained");
                Err(ActionError::new(PendingAction::save(retry_context), e))
            }
        }
    }

    /// Uploads the binary first, then saves with the returned media
    /// reference attached. Either stage failing is one save failure; no
    /// attachment-only state is persisted.
    pub async fn save_with_attachment(
        &self,
        post: &FeedEntry,
        upload: MediaUpload,
        retry: bool,
    ) -> Result<FeedEntry, ActionError> {
        let media = self
            .api
            .upload_media(upload)
            .await
            .map_err(|e| ActionError::new(PendingAction::save(post.clone()), e))?;

        let post = post.clone().with_attachment(Attachment {
            url: media.id,
            kind: AttachmentKind::Image,
        });
        self.save(&post, retry).await
    }

    /// Deletes locally first, then remotely. The local deletion is not
    /// rolled back on remote failure; the error carries the retry context.
    pub async fn remove_by_id(&self, id: i64) -> Result<(), ActionError> {
        self.require_authorized(|| PendingAction::remove(id))?;

        self.store
            .delete_by_id(id)
            .await
            .map_err(|e| ActionError::new(PendingAction::remove(id), e))?;

        self.api
            .delete(id)
            .await
            .map_err(|e| ActionError::new(PendingAction::remove(id), e))?;

        Ok(())
    }

    /// Reveals every speculatively fetched entry; no network round trip.
    /// Returns how many entries were folded into the main view.
    pub async fn as_visible_all(&self) -> crate::shared::error::Result<u64> {
        self.store.mark_all_visible().await
    }

    /// One-shot fetch of the remote head into the cache, outside the paging
    /// window machinery.
    pub async fn refresh_all(&self) -> Result<(), ActionError> {
        let batch = self
            .api
            .latest(self.paging.initial_load_size)
            .await
            .map_err(|e| ActionError::new(PendingAction::load(), e))?;

        let batch: Vec<FeedEntry> = batch.into_iter().map(FeedEntry::into_confirmed).collect();
        self.store
            .upsert(&batch)
            .await
            .map_err(|e| ActionError::new(PendingAction::load(), e))
    }

    /// Re-runs a failed action from its captured context.
    pub async fn retry(&self, action: &PendingAction) -> Result<(), ActionError> {
        match action.kind {
            ActionKind::Load => self.refresh_all().await,
            ActionKind::Like => {
                let id = target_of(action)?;
                self.like_by_id(id).await.map(|_| ())
            }
            ActionKind::Dislike => {
                let id = target_of(action)?;
                self.dislike_by_id(id).await.map(|_| ())
            }
            ActionKind::Remove => {
                let id = target_of(action)?;
                self.remove_by_id(id).await
            }
            ActionKind::Save => {
                let post = action.post.as_ref().ok_or_else(|| {
                    ActionError::new(
                        action.clone(),
                        FeedError::LocalData("save retry without payload".to_string()),
                    )
                })?;
                self.save(post, true).await.map(|_| ())
            }
        }
    }

    pub async fn sign_in(&self, login: &str, pass: &str) -> crate::shared::error::Result<AuthState> {
        let auth = self.api.sign_in(login, pass).await?;
        self.session.set(auth.clone());
        Ok(auth)
    }

    pub async fn register(
        &self,
        login: &str,
        pass: &str,
        name: &str,
    ) -> crate::shared::error::Result<AuthState> {
        let auth = self.api.register(login, pass, name).await?;
        self.session.set(auth.clone());
        Ok(auth)
    }

    pub async fn register_with_avatar(
        &self,
        login: &str,
        pass: &str,
        name: &str,
        avatar: MediaUpload,
    ) -> crate::shared::error::Result<AuthState> {
        let auth = self.api.register_with_avatar(login, pass, name, avatar).await?;
        self.session.set(auth.clone());
        Ok(auth)
    }

    fn require_authorized(
        &self,
        action: impl FnOnce() -> PendingAction,
    ) -> Result<AuthState, ActionError> {
        let user = self.session.current();
        if user.is_anonymous() {
            return Err(ActionError::new(
                action(),
                FeedError::api(401, "sign in required"),
            ));
        }
        Ok(user)
    }
}

fn retag_for_user(entry: &mut FeedEntry, user_id: i64) {
    entry.owned_by_me = user_id != 0 && entry.author_id == user_id;
    if user_id == 0 {
        entry.liked_by_me = false;
    }
}

fn target_of(action: &PendingAction) -> Result<i64, ActionError> {
    action.target.ok_or_else(|| {
        ActionError::new(
            action.clone(),
            FeedError::LocalData("retry without target id".to_string()),
        )
    })
}
