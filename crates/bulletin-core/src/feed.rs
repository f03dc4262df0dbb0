//! Feed: the view store together with the REST client it is kept in sync
//! with.
//!
//! The feed owns the store; the REST client is injected. Live events, local
//! CRUD results and edit sessions all go through here, so a single owner
//! mutates the store.

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::api::{Credentials, NewsletterApi};
use crate::live::ChannelEvent;
use crate::model::{Newsletter, NewsletterDraft};
use crate::router::{self, RouteOutcome};
use crate::store::ViewStore;

pub struct Feed<A> {
    api: A,
    store: ViewStore,
}

impl<A: NewsletterApi> Feed<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            store: ViewStore::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    /// Logs in.
    ///
    /// # Errors
    /// Returns the `AuthFailure` (or network) error from the service.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        if let Err(e) = self.api.authenticate(credentials).await {
            debug!("{e}");
            return Err(e.into());
        }
        info!(username = %credentials.username, "authenticated");
        Ok(())
    }

    /// Replaces the store with the service's current list.
    ///
    /// # Errors
    /// Returns the list failure; the store is left untouched.
    pub async fn load_initial(&mut self) -> Result<usize> {
        let newsletters = match self.api.list().await {
            Ok(list) => list,
            Err(e) => {
                debug!("{e}");
                return Err(e.into());
            }
        };
        self.store.load_initial(newsletters);
        info!(count = self.store.len(), "loaded newsletters");
        Ok(self.store.len())
    }

    /// Creates a newsletter and inserts it at the head of the store.
    ///
    /// The stream usually echoes the same create; the store deduplicates it.
    ///
    /// # Errors
    /// Returns the create failure.
    pub async fn create(&mut self, draft: &NewsletterDraft) -> Result<Newsletter> {
        let created = match self.api.create(draft).await {
            Ok(created) => created,
            Err(e) => {
                debug!("{e}");
                return Err(e.into());
            }
        };
        self.store.insert_front(created.clone());
        Ok(created)
    }

    pub fn begin_edit(&mut self, id: i64) -> Option<NewsletterDraft> {
        self.store.begin_edit(id).cloned()
    }

    pub fn set_draft(&mut self, id: i64, draft: NewsletterDraft) -> bool {
        self.store.set_draft(id, draft)
    }

    pub fn cancel_edit(&mut self, id: i64) -> bool {
        self.store.cancel_edit(id)
    }

    /// Sends the draft of an entry being edited.
    ///
    /// On success the entry takes the server's title and content (or the
    /// draft's, when the service does not echo the record). On failure the
    /// draft is put back so the edit can be retried or cancelled.
    ///
    /// # Errors
    /// Fails if the entry is not being edited or the update is rejected.
    pub async fn submit_edit(&mut self, id: i64) -> Result<()> {
        let Some(draft) = self.store.take_draft(id) else {
            bail!("newsletter {id} is not being edited");
        };

        match self.api.update(id, &draft).await {
            Ok(updated) => {
                let applied = match updated {
                    Some(newsletter) => newsletter,
                    None => self.with_draft(id, &draft)?,
                };
                self.store.apply_update(&applied);
                info!(id, "newsletter updated");
                Ok(())
            }
            Err(e) => {
                debug!("{e}");
                self.store.begin_edit(id);
                self.store.set_draft(id, draft);
                Err(e.into())
            }
        }
    }

    fn with_draft(&self, id: i64, draft: &NewsletterDraft) -> Result<Newsletter> {
        let entry = self
            .store
            .get(id)
            .with_context(|| format!("newsletter {id} left the view"))?;
        Ok(Newsletter {
            title: draft.title.clone(),
            content: draft.content.clone(),
            ..entry.newsletter.clone()
        })
    }

    /// Applies one channel message. Malformed messages are logged and
    /// ignored.
    pub fn apply(&mut self, event: ChannelEvent) -> Option<RouteOutcome> {
        match event {
            ChannelEvent::Event(event) => Some(router::route(&mut self.store, event)),
            ChannelEvent::Malformed { data, error } => {
                debug!(%data, "dropping malformed stream message: {error}");
                None
            }
        }
    }

    /// Marks every entry as seen.
    pub fn acknowledge(&mut self) {
        self.store.clear_fresh();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::error::{ApiError, ApiErrorKind, ApiResult, Operation};
    use crate::model::StreamEvent;

    fn newsletter(id: i64, title: &str, content: &str) -> Newsletter {
        Newsletter {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 3, 9, 0, 0).unwrap(),
        }
    }

    /// In-memory service double.
    #[derive(Default)]
    struct FakeApi {
        list: Vec<Newsletter>,
        fail: bool,
        echo_update: bool,
        next_id: Mutex<i64>,
        updates: Mutex<Vec<(i64, NewsletterDraft)>>,
    }

    impl FakeApi {
        fn failure(operation: Operation) -> ApiError {
            ApiError::http_status(operation, 500, "")
        }
    }

    impl NewsletterApi for FakeApi {
        async fn authenticate(&self, _credentials: &Credentials) -> ApiResult<()> {
            if self.fail {
                return Err(ApiError::http_status(Operation::Authenticate, 401, ""));
            }
            Ok(())
        }

        async fn list(&self) -> ApiResult<Vec<Newsletter>> {
            if self.fail {
                return Err(Self::failure(Operation::List));
            }
            Ok(self.list.clone())
        }

        async fn create(&self, draft: &NewsletterDraft) -> ApiResult<Newsletter> {
            if self.fail {
                return Err(Self::failure(Operation::Create));
            }
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            Ok(newsletter(*next, &draft.title, &draft.content))
        }

        async fn update(&self, id: i64, draft: &NewsletterDraft) -> ApiResult<Option<Newsletter>> {
            if self.fail {
                return Err(Self::failure(Operation::Update));
            }
            self.updates.lock().unwrap().push((id, draft.clone()));
            Ok(self
                .echo_update
                .then(|| newsletter(id, &draft.title, &draft.content)))
        }
    }

    #[tokio::test]
    async fn test_load_initial_populates_store() {
        let api = FakeApi {
            list: vec![newsletter(2, "b", ""), newsletter(1, "a", "")],
            ..FakeApi::default()
        };
        let mut feed = Feed::new(api);

        assert_eq!(feed.load_initial().await.unwrap(), 2);
        assert_eq!(feed.store().entries()[0].id(), 2);
    }

    #[tokio::test]
    async fn test_failures_surface_kind() {
        let mut feed = Feed::new(FakeApi {
            fail: true,
            ..FakeApi::default()
        });

        let err = feed
            .authenticate(&Credentials::new("demo", "demo"))
            .await
            .unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_err.kind, ApiErrorKind::AuthFailure);

        let err = feed.load_initial().await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ApiError>().unwrap().kind,
            ApiErrorKind::FetchFailure
        );
        assert!(feed.store().is_empty());
    }

    #[tokio::test]
    async fn test_local_create_then_stream_echo_keeps_one_entry() {
        let mut feed = Feed::new(FakeApi::default());
        let created = feed
            .create(&NewsletterDraft::new("Hello", "World"))
            .await
            .unwrap();

        let outcome = feed.apply(ChannelEvent::Event(StreamEvent::create(created.clone())));

        assert_eq!(outcome, Some(RouteOutcome::Refreshed(created.id)));
        assert_eq!(feed.store().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_edit_without_echo_applies_draft() {
        let api = FakeApi {
            list: vec![newsletter(1, "A", "x")],
            ..FakeApi::default()
        };
        let mut feed = Feed::new(api);
        feed.load_initial().await.unwrap();

        feed.begin_edit(1).unwrap();
        feed.set_draft(1, NewsletterDraft::new("B", "y"));
        feed.submit_edit(1).await.unwrap();

        let entry = feed.store().get(1).unwrap();
        assert!(!entry.is_editing());
        assert_eq!(entry.newsletter.title, "B");
        assert_eq!(entry.newsletter.content, "y");
        assert_eq!(
            feed.api().updates.lock().unwrap().as_slice(),
            &[(1, NewsletterDraft::new("B", "y"))]
        );
    }

    #[tokio::test]
    async fn test_submit_edit_with_echo_uses_server_record() {
        let api = FakeApi {
            list: vec![newsletter(1, "A", "x")],
            echo_update: true,
            ..FakeApi::default()
        };
        let mut feed = Feed::new(api);
        feed.load_initial().await.unwrap();
        feed.begin_edit(1);
        feed.set_draft(1, NewsletterDraft::new("C", "z"));

        feed.submit_edit(1).await.unwrap();
        assert_eq!(feed.store().get(1).unwrap().newsletter.title, "C");
    }

    #[tokio::test]
    async fn test_failed_submit_restores_draft() {
        let mut feed = Feed::new(FakeApi {
            fail: true,
            ..FakeApi::default()
        });
        feed.store.insert_front(newsletter(1, "A", "x"));
        feed.begin_edit(1);
        feed.set_draft(1, NewsletterDraft::new("B", "y"));

        assert!(feed.submit_edit(1).await.is_err());

        let entry = feed.store().get(1).unwrap();
        assert_eq!(entry.newsletter.title, "A");
        assert_eq!(entry.draft, Some(NewsletterDraft::new("B", "y")));
    }

    #[tokio::test]
    async fn test_submit_without_edit_fails() {
        let mut feed = Feed::new(FakeApi::default());
        feed.store.insert_front(newsletter(1, "A", "x"));
        assert!(feed.submit_edit(1).await.is_err());
        assert!(feed.submit_edit(2).await.is_err());
    }

    #[test]
    fn test_apply_malformed_is_ignored_and_acknowledge_clears_fresh() {
        let mut feed = Feed::new(FakeApi::default());
        assert!(
            feed.apply(ChannelEvent::Malformed {
                data: "x".to_string(),
                error: "bad".to_string(),
            })
            .is_none()
        );

        feed.apply(ChannelEvent::Event(StreamEvent::create(newsletter(1, "A", "x"))));
        assert!(feed.store().get(1).unwrap().fresh);
        feed.acknowledge();
        assert!(!feed.store().get(1).unwrap().fresh);
    }
}
