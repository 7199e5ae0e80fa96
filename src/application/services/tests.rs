use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{pin_mut, StreamExt};
use tokio::time::timeout;

use crate::application::ports::remote::FeedApi;
use crate::domain::entities::action::{ActionKind, FailurePolicy, PendingAction};
use crate::domain::entities::auth::AuthState;
use crate::domain::entities::post::{FeedEntry, Media, MediaUpload};
use crate::domain::feed_item::FeedItem;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::config::AppConfig;
use crate::shared::error::{FeedError, Result};
use crate::state::AppState;

use super::{AuthSession, LikeOutcome, LoadIntent, NewerCountPoller};

type Queue<T> = Mutex<VecDeque<Result<T>>>;

/// Scripted remote: each endpoint pops its next queued response. An
/// unscripted call surfaces as `Unknown` so a test fails loudly instead of
/// hanging.
#[derive(Default)]
struct MockFeedApi {
    latest_responses: Queue<Vec<FeedEntry>>,
    before_responses: Queue<Vec<FeedEntry>>,
    after_responses: Queue<Vec<FeedEntry>>,
    like_responses: Queue<FeedEntry>,
    dislike_responses: Queue<FeedEntry>,
    create_responses: Queue<FeedEntry>,
    delete_responses: Queue<()>,
    upload_responses: Queue<Media>,
    auth_responses: Queue<AuthState>,
    like_calls: AtomicUsize,
    before_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    after_anchors: Mutex<Vec<i64>>,
    created: Mutex<Vec<FeedEntry>>,
}

fn pop<T>(queue: &Queue<T>, endpoint: &str) -> Result<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(FeedError::Unknown(format!("unexpected {endpoint} call"))))
}

fn push<T>(queue: &Queue<T>, response: Result<T>) {
    queue.lock().unwrap().push_back(response);
}

#[async_trait]
impl FeedApi for MockFeedApi {
    async fn latest(&self, _limit: u32) -> Result<Vec<FeedEntry>> {
        pop(&self.latest_responses, "latest")
    }

    async fn before(&self, _anchor: i64, _limit: u32) -> Result<Vec<FeedEntry>> {
        self.before_calls.fetch_add(1, Ordering::SeqCst);
        pop(&self.before_responses, "before")
    }

    async fn after(&self, anchor: i64) -> Result<Vec<FeedEntry>> {
        self.after_anchors.lock().unwrap().push(anchor);
        pop(&self.after_responses, "after")
    }

    async fn like(&self, _id: i64) -> Result<FeedEntry> {
        self.like_calls.fetch_add(1, Ordering::SeqCst);
        pop(&self.like_responses, "like")
    }

    async fn dislike(&self, _id: i64) -> Result<FeedEntry> {
        pop(&self.dislike_responses, "dislike")
    }

    async fn create(&self, entry: &FeedEntry) -> Result<FeedEntry> {
        self.created.lock().unwrap().push(entry.clone());
        pop(&self.create_responses, "create")
    }

    async fn delete(&self, _id: i64) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        pop(&self.delete_responses, "delete")
    }

    async fn upload_media(&self, _upload: MediaUpload) -> Result<Media> {
        pop(&self.upload_responses, "media")
    }

    async fn sign_in(&self, _login: &str, _pass: &str) -> Result<AuthState> {
        pop(&self.auth_responses, "authentication")
    }

    async fn register(&self, _login: &str, _pass: &str, _name: &str) -> Result<AuthState> {
        pop(&self.auth_responses, "registration")
    }

    async fn register_with_avatar(
        &self,
        _login: &str,
        _pass: &str,
        _name: &str,
        _avatar: MediaUpload,
    ) -> Result<AuthState> {
        pop(&self.auth_responses, "registration")
    }
}

fn entry(id: i64) -> FeedEntry {
    let mut entry = FeedEntry::new("student".to_string(), 7, format!("post {id}"));
    entry.id = id;
    entry
}

fn entries(ids: &[i64]) -> Vec<FeedEntry> {
    ids.iter().copied().map(entry).collect()
}

async fn setup_as(auth: AuthState) -> (Arc<MockFeedApi>, AppState) {
    let pool = ConnectionPool::in_memory().await.unwrap();
    pool.migrate().await.unwrap();

    let api = Arc::new(MockFeedApi::default());
    let session = Arc::new(AuthSession::new(auth));
    let state = AppState::with_api(AppConfig::default(), session, api.clone(), pool);
    (api, state)
}

async fn setup() -> (Arc<MockFeedApi>, AppState) {
    setup_as(AuthState::new(7, "token".to_string(), "student".to_string())).await
}

async fn visible_ids(state: &AppState) -> Vec<i64> {
    state
        .store
        .visible_page(100, None)
        .await
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect()
}

#[tokio::test]
async fn cold_refresh_establishes_both_window_keys() {
    let (api, state) = setup().await;
    push(&api.latest_responses, Ok(entries(&[105, 104, 103, 102, 101])));

    let success = state.mediator.load(LoadIntent::Refresh).await.unwrap();

    assert!(!success.end_of_pagination);
    assert_eq!(state.keys.min_id().await.unwrap(), Some(101));
    assert_eq!(state.keys.max_id().await.unwrap(), Some(105));
    assert_eq!(visible_ids(&state).await, vec![105, 104, 103, 102, 101]);
}

#[tokio::test]
async fn warm_refresh_moves_only_the_tail_cursor() {
    let (api, state) = setup().await;
    state.keys.set_before(101).await.unwrap();
    state.keys.set_after(105).await.unwrap();
    push(&api.latest_responses, Ok(entries(&[110, 109, 108, 107, 106])));

    state.mediator.load(LoadIntent::Refresh).await.unwrap();

    assert_eq!(state.keys.min_id().await.unwrap(), Some(106));
    assert_eq!(state.keys.max_id().await.unwrap(), Some(105));
}

#[tokio::test]
async fn append_extends_the_window_backwards() {
    let (api, state) = setup().await;
    push(&api.latest_responses, Ok(entries(&[105, 104, 103, 102, 101])));
    state.mediator.load(LoadIntent::Refresh).await.unwrap();
    push(&api.before_responses, Ok(entries(&[100, 99, 98])));

    let success = state.mediator.load(LoadIntent::Append).await.unwrap();

    assert!(!success.end_of_pagination);
    assert_eq!(state.keys.min_id().await.unwrap(), Some(98));
    assert_eq!(state.keys.max_id().await.unwrap(), Some(105));
    assert_eq!(visible_ids(&state).await.len(), 8);
}

#[tokio::test]
async fn append_without_a_window_ends_without_fetching() {
    let (api, state) = setup().await;

    let success = state.mediator.load(LoadIntent::Append).await.unwrap();

    assert!(success.end_of_pagination);
    assert_eq!(api.before_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_batch_reports_end_and_keeps_keys() {
    let (api, state) = setup().await;
    state.keys.set_before(101).await.unwrap();
    push(&api.before_responses, Ok(Vec::new()));

    let success = state.mediator.load(LoadIntent::Append).await.unwrap();

    assert!(success.end_of_pagination);
    assert_eq!(state.keys.min_id().await.unwrap(), Some(101));
}

#[tokio::test]
async fn prepend_advances_the_head_cursor() {
    let (api, state) = setup().await;
    state.keys.set_before(101).await.unwrap();
    state.keys.set_after(105).await.unwrap();
    push(&api.after_responses, Ok(entries(&[107, 106])));

    state.mediator.load(LoadIntent::Prepend).await.unwrap();

    assert_eq!(state.keys.max_id().await.unwrap(), Some(107));
    assert_eq!(state.keys.min_id().await.unwrap(), Some(101));
}

#[tokio::test]
async fn prepend_without_a_window_ends_without_fetching() {
    let (api, state) = setup().await;

    let success = state.mediator.load(LoadIntent::Prepend).await.unwrap();

    assert!(success.end_of_pagination);
    assert!(api.after_anchors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_prepend_batch_reports_end_and_keeps_keys() {
    let (api, state) = setup().await;
    state.keys.set_before(101).await.unwrap();
    state.keys.set_after(105).await.unwrap();
    push(&api.after_responses, Ok(Vec::new()));

    let success = state.mediator.load(LoadIntent::Prepend).await.unwrap();

    assert!(success.end_of_pagination);
    assert_eq!(state.keys.max_id().await.unwrap(), Some(105));
    assert_eq!(state.keys.min_id().await.unwrap(), Some(101));
}

#[tokio::test]
async fn failed_fetch_leaves_cache_and_keys_untouched() {
    let (api, state) = setup().await;
    push(&api.latest_responses, Ok(entries(&[105, 104, 103, 102, 101])));
    state.mediator.load(LoadIntent::Refresh).await.unwrap();
    push(
        &api.latest_responses,
        Err(FeedError::Network("connection reset".to_string())),
    );

    let err = state.mediator.load(LoadIntent::Refresh).await.unwrap_err();

    assert!(matches!(err, FeedError::Network(_)));
    assert_eq!(state.keys.min_id().await.unwrap(), Some(101));
    assert_eq!(state.keys.max_id().await.unwrap(), Some(105));
    assert_eq!(visible_ids(&state).await.len(), 5);
}

#[tokio::test]
async fn like_lands_the_confirmed_server_copy() {
    let (api, state) = setup().await;
    state.store.upsert(&[entry(5)]).await.unwrap();

    let mut confirmed = entry(5);
    confirmed.likes = 1;
    confirmed.liked_by_me = true;
    push(&api.like_responses, Ok(confirmed));

    let outcome = state.repository.like_by_id(5).await.unwrap();

    let LikeOutcome::Applied(applied) = outcome else {
        panic!("expected Applied");
    };
    assert_eq!(applied.likes, 1);

    let cached = state.store.find_by_id(5).await.unwrap().unwrap();
    assert!(cached.liked_by_me);
    assert_eq!(cached.likes, 1);
}

#[tokio::test]
async fn dislike_lands_the_confirmed_server_copy() {
    let (api, state) = setup().await;
    let mut liked = entry(5);
    liked.likes = 1;
    liked.liked_by_me = true;
    state.store.upsert(&[liked]).await.unwrap();
    push(&api.dislike_responses, Ok(entry(5)));

    state.repository.dislike_by_id(5).await.unwrap();

    let cached = state.store.find_by_id(5).await.unwrap().unwrap();
    assert!(!cached.liked_by_me);
    assert_eq!(cached.likes, 0);
}

#[tokio::test]
async fn reaction_on_pending_entry_is_skipped_without_a_call() {
    let (api, state) = setup().await;
    let mut placeholder = entry(55);
    placeholder.pending = true;
    state.store.upsert(&[placeholder]).await.unwrap();

    let outcome = state.repository.like_by_id(55).await.unwrap();

    assert_eq!(outcome, LikeOutcome::SkippedPending);
    assert_eq!(api.like_calls.load(Ordering::SeqCst), 0);
    assert!(state.store.find_by_id(55).await.unwrap().unwrap().pending);
}

#[tokio::test]
async fn reaction_on_uncached_entry_is_a_local_data_error() {
    let (_api, state) = setup().await;

    let err = state.repository.like_by_id(99).await.unwrap_err();

    assert_eq!(err.action.kind, ActionKind::Like);
    assert!(matches!(err.source, FeedError::LocalData(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn anonymous_session_cannot_mutate() {
    let (api, state) = setup_as(AuthState::anonymous()).await;
    state.store.upsert(&[entry(5)]).await.unwrap();

    let err = state.repository.like_by_id(5).await.unwrap_err();
    assert!(matches!(err.source, FeedError::Api { status: 401, .. }));
    assert_eq!(api.like_calls.load(Ordering::SeqCst), 0);

    let draft = FeedEntry::new("student".to_string(), 0, "hello".to_string());
    let err = state.repository.save(&draft, false).await.unwrap_err();
    assert!(matches!(err.source, FeedError::Api { status: 401, .. }));
}

#[tokio::test]
async fn save_replaces_the_placeholder_with_the_confirmed_copy() {
    let (api, state) = setup().await;
    push(&api.create_responses, Ok(entry(200)));

    let draft = FeedEntry::new("student".to_string(), 0, "hello".to_string());
    let confirmed = state.repository.save(&draft, false).await.unwrap();

    assert_eq!(confirmed.id, 200);
    assert!(!confirmed.pending);
    assert_eq!(visible_ids(&state).await, vec![200]);

    // Id assignment stays server-owned.
    assert_eq!(api.created.lock().unwrap()[0].id, 0);
}

#[tokio::test]
async fn failed_save_retains_the_placeholder_and_retries_verbatim() {
    let (api, state) = setup().await;
    push(
        &api.create_responses,
        Err(FeedError::Network("connection reset".to_string())),
    );

    let draft = FeedEntry::new("student".to_string(), 0, "hello".to_string());
    let err = state.repository.save(&draft, false).await.unwrap_err();

    assert_eq!(err.action.kind, ActionKind::Save);
    assert_eq!(err.failure_policy(), FailurePolicy::RetainPending);
    assert!(err.is_retryable());
    let placeholder_id = err.action.post.as_ref().unwrap().id;
    assert!(placeholder_id < 0);

    let placeholder = state
        .store
        .find_by_id(placeholder_id)
        .await
        .unwrap()
        .unwrap();
    assert!(placeholder.pending);
    assert!(placeholder.visible);

    push(&api.create_responses, Ok(entry(201)));
    state.repository.retry(&err.action).await.unwrap();

    assert_eq!(visible_ids(&state).await, vec![201]);
    assert!(state
        .store
        .find_by_id(placeholder_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn save_with_attachment_uploads_before_creating() {
    let (api, state) = setup().await;
    push(
        &api.upload_responses,
        Ok(Media {
            id: "media-1".to_string(),
        }),
    );
    push(&api.create_responses, Ok(entry(200)));

    let draft = FeedEntry::new("student".to_string(), 0, "hello".to_string());
    let upload = MediaUpload {
        file_name: "pic.png".to_string(),
        bytes: vec![1, 2, 3],
    };
    state
        .repository
        .save_with_attachment(&draft, upload, false)
        .await
        .unwrap();

    let sent = &api.created.lock().unwrap()[0];
    assert_eq!(sent.attachment.as_ref().unwrap().url, "media-1");
}

#[tokio::test]
async fn remove_deletes_locally_even_when_the_remote_call_fails() {
    let (api, state) = setup().await;
    state.store.upsert(&[entry(5)]).await.unwrap();
    push(
        &api.delete_responses,
        Err(FeedError::Network("connection reset".to_string())),
    );

    let err = state.repository.remove_by_id(5).await.unwrap_err();

    assert_eq!(err.action.kind, ActionKind::Remove);
    assert_eq!(err.failure_policy(), FailurePolicy::NoRollback);
    assert!(err.is_retryable());
    assert_eq!(api.delete_calls.load(Ordering::SeqCst), 1);
    assert!(state.store.find_by_id(5).await.unwrap().is_none());
}

#[tokio::test]
async fn reveal_folds_hidden_entries_into_the_feed() {
    let (_api, state) = setup().await;
    state.store.upsert(&[entry(5)]).await.unwrap();
    state
        .store
        .upsert_hidden(&entries(&[6, 7]))
        .await
        .unwrap();

    let revealed = state.repository.as_visible_all().await.unwrap();

    assert_eq!(revealed, 2);
    assert_eq!(visible_ids(&state).await, vec![7, 6, 5]);
}

#[tokio::test]
async fn refresh_all_ingests_the_remote_head() {
    let (api, state) = setup().await;
    push(&api.latest_responses, Ok(entries(&[3, 2, 1])));

    state.repository.refresh_all().await.unwrap();

    assert_eq!(visible_ids(&state).await, vec![3, 2, 1]);
}

#[tokio::test]
async fn feed_stream_retags_flags_on_account_switch() {
    let (_api, state) = setup().await;
    let mut mine = entry(1);
    mine.author_id = 7;
    mine.liked_by_me = true;
    let mut theirs = entry(2);
    theirs.author_id = 9;
    state.store.upsert(&[mine, theirs]).await.unwrap();

    let stream = state.repository.feed_stream();
    pin_mut!(stream);

    let page = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page[0].id, 2);
    assert!(!page[0].owned_by_me);
    assert!(page[1].owned_by_me);
    assert!(page[1].liked_by_me);

    state.session.set(AuthState::new(9, "t".to_string(), "other".to_string()));
    let page = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert!(page[0].owned_by_me);
    assert!(!page[1].owned_by_me);

    state.session.clear();
    let page = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert!(page.iter().all(|e| !e.owned_by_me && !e.liked_by_me));
}

#[tokio::test]
async fn feed_stream_reemits_on_cache_change() {
    let (_api, state) = setup().await;

    let stream = state.repository.feed_stream();
    pin_mut!(stream);

    let page = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert!(page.is_empty());

    state.store.upsert(&[entry(1)]).await.unwrap();
    let page = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn feed_item_stream_decorates_pages_with_day_markers() {
    let (_api, state) = setup().await;
    state.store.upsert(&[entry(1)]).await.unwrap();

    let stream = state.repository.feed_item_stream();
    pin_mut!(stream);

    let items = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(items.len(), 2);
    assert!(matches!(items[0], FeedItem::Separator(_)));
    assert!(matches!(items[1], FeedItem::Post(ref p) if p.id == 1));
}

#[tokio::test]
async fn sign_in_replaces_the_session() {
    let (api, state) = setup_as(AuthState::anonymous()).await;
    push(
        &api.auth_responses,
        Ok(AuthState::new(7, "token".to_string(), "student".to_string())),
    );

    let auth = state.repository.sign_in("student", "secret").await.unwrap();

    assert_eq!(auth.id, 7);
    assert_eq!(state.session.current().id, 7);
    assert!(state.session.is_authorized());

    state.session.clear();
    assert!(!state.session.is_authorized());
}

#[tokio::test]
async fn registration_signs_the_new_account_in() {
    let (api, state) = setup_as(AuthState::anonymous()).await;
    push(
        &api.auth_responses,
        Ok(AuthState::new(8, "token".to_string(), "newcomer".to_string())),
    );

    state
        .repository
        .register("newcomer", "secret", "Newcomer")
        .await
        .unwrap();

    assert_eq!(state.session.current().id, 8);
}

#[tokio::test]
async fn poller_yields_counts_then_terminates_on_failure() {
    let (api, state) = setup().await;
    state.keys.set_after(105).await.unwrap();
    push(&api.after_responses, Ok(entries(&[106, 107, 108])));
    push(
        &api.after_responses,
        Err(FeedError::Network("connection reset".to_string())),
    );

    let remote: Arc<dyn FeedApi> = api.clone();
    let poller = NewerCountPoller::new(
        remote,
        state.store.clone(),
        state.keys.clone(),
        Duration::from_millis(10),
    );
    let stream = poller.stream();
    pin_mut!(stream);

    let first = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.unwrap(), 3);
    assert_eq!(api.after_anchors.lock().unwrap().as_slice(), &[105]);

    // Probed entries land hidden until the user reveals them.
    let probed = state.store.find_by_id(106).await.unwrap().unwrap();
    assert!(!probed.visible);

    let second = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(second, Err(FeedError::Network(_))));

    let done = timeout(Duration::from_secs(5), stream.next()).await.unwrap();
    assert!(done.is_none());
}

#[tokio::test]
async fn poller_anchors_on_the_newest_visible_row_before_a_refresh() {
    let (api, state) = setup().await;
    state.store.upsert(&[entry(50)]).await.unwrap();
    push(&api.after_responses, Ok(Vec::new()));

    let remote: Arc<dyn FeedApi> = api.clone();
    let poller = NewerCountPoller::new(
        remote,
        state.store.clone(),
        state.keys.clone(),
        Duration::from_millis(10),
    );
    let stream = poller.stream();
    pin_mut!(stream);

    let first = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.unwrap(), 0);
    assert_eq!(api.after_anchors.lock().unwrap().as_slice(), &[50]);
}

#[tokio::test]
async fn retry_dispatches_by_action_kind() {
    let (api, state) = setup().await;
    push(&api.latest_responses, Ok(entries(&[3, 2, 1])));
    state.repository.retry(&PendingAction::load()).await.unwrap();
    assert_eq!(visible_ids(&state).await, vec![3, 2, 1]);

    push(&api.delete_responses, Ok(()));
    state
        .repository
        .retry(&PendingAction::remove(3))
        .await
        .unwrap();
    assert!(state.store.find_by_id(3).await.unwrap().is_none());

    let broken = PendingAction {
        kind: ActionKind::Save,
        target: None,
        post: None,
    };
    let err = state.repository.retry(&broken).await.unwrap_err();
    assert!(matches!(err.source, FeedError::LocalData(_)));
}
