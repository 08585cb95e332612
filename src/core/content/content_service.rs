// Content service - submissions, reviews and engagement over the record store.
//
// This service handles:
// - Submitting and editing projects and community posts (filter + workflow)
// - Approve / reject / delete decisions, checked before any write
// - View, like and vote counters (two-phase, see EngagementTracker)
// - Per-viewer listings and the submission queue

use super::content_models::{
    Comment, CommunityPost, ContentKind, PostDraft, Project, ProjectDraft, StoredRecord, Theme,
    DEFAULT_AVATAR_COLOR,
};
use super::content_store::{RecordStore, StoreError, Subscription};
use crate::core::catalog::{browse, CatalogQuery, SubmissionQueue};
use crate::core::engagement::{Counter, EngagementTracker, Reconciliation};
use crate::core::identity::{Role, Viewer};
use crate::core::moderation::ModerationVerdict;
use crate::core::workflow::{is_visible, ContentRecord, SubmissionWorkflow, WorkflowError};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("{kind} {id} not found")]
    NotFound { kind: ContentKind, id: String },

    #[error("Comment text is empty")]
    EmptyComment,
}

impl From<serde_json::Error> for ContentError {
    fn from(err: serde_json::Error) -> Self {
        ContentError::Store(StoreError::Serialization(err))
    }
}

/// Direction of a community vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    fn delta(self) -> i64 {
        match self {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes: u64,
}

/// Decode a collection snapshot (key -> record). Entries that do not decode
/// are skipped with a warning instead of failing the whole feed.
pub fn decode_collection<T: StoredRecord>(snapshot: &Value) -> Vec<T> {
    let Some(entries) = snapshot.as_object() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|(key, raw)| match serde_json::from_value::<T>(raw.clone()) {
            Ok(mut record) => {
                record.set_id(key.clone());
                Some(record)
            }
            Err(e) => {
                tracing::warn!(kind = %T::KIND, key = %key, "Skipping undecodable record: {}", e);
                None
            }
        })
        .collect()
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ContentService<S: RecordStore> {
    store: S,
    workflow: SubmissionWorkflow,
    engagement: EngagementTracker,
}

impl<S: RecordStore> ContentService<S> {
    /// Create a new content service with the given store and workflow.
    pub fn new(store: S, workflow: SubmissionWorkflow) -> Self {
        Self {
            store,
            workflow,
            engagement: EngagementTracker::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn workflow(&self) -> &SubmissionWorkflow {
        &self.workflow
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Every record of one type, unfiltered.
    pub async fn snapshot<T: StoredRecord>(&self) -> Result<Vec<T>, ContentError> {
        let value = self.store.get(T::KIND.collection()).await?;
        Ok(decode_collection(&value))
    }

    pub async fn fetch<T: StoredRecord>(&self, id: &str) -> Result<T, ContentError> {
        let value = self.store.get(&T::KIND.record_path(id)).await?;
        if value.is_null() {
            return Err(ContentError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        let mut record: T = serde_json::from_value(value)?;
        record.set_id(id.to_string());
        Ok(record)
    }

    /// Like `fetch`, but a record the viewer may not see is `NotFound` too.
    pub async fn fetch_visible<T: StoredRecord>(
        &self,
        viewer: &Viewer,
        id: &str,
    ) -> Result<T, ContentError> {
        let record: T = self.fetch(id).await?;
        if !is_visible(&record, viewer) {
            return Err(ContentError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        Ok(record)
    }

    /// Projects the viewer is allowed to see.
    pub async fn projects(&self, viewer: &Viewer) -> Result<Vec<Project>, ContentError> {
        Ok(visible_to(self.snapshot().await?, viewer))
    }

    /// Community posts the viewer is allowed to see.
    pub async fn posts(&self, viewer: &Viewer) -> Result<Vec<CommunityPost>, ContentError> {
        Ok(visible_to(self.snapshot().await?, viewer))
    }

    pub async fn browse(
        &self,
        viewer: &Viewer,
        query: &CatalogQuery,
    ) -> Result<Vec<Project>, ContentError> {
        let projects: Vec<Project> = self.snapshot().await?;
        Ok(browse(&projects, query, viewer))
    }

    pub async fn submission_queue(&self, viewer: &Viewer) -> Result<SubmissionQueue, ContentError> {
        let projects: Vec<Project> = self.snapshot().await?;
        let posts: Vec<CommunityPost> = self.snapshot().await?;
        Ok(SubmissionQueue::build(&projects, &posts, viewer))
    }

    /// Live feed of one collection.
    pub async fn subscribe(&self, kind: ContentKind) -> Result<Subscription, ContentError> {
        Ok(self.store.subscribe(kind.collection()).await?)
    }

    // ------------------------------------------------------------------------
    // Submissions
    // ------------------------------------------------------------------------

    pub async fn submit_project(
        &self,
        actor: &Viewer,
        draft: ProjectDraft,
    ) -> Result<Project, ContentError> {
        let id = self.store.push_key();
        let mut project = Project::from_draft(
            id,
            actor.user_id.clone(),
            actor.role,
            draft,
            Utc::now().date_naive(),
        );

        let verdict = self.workflow.stamp_new(&mut project, actor.role);
        log_verdict(ContentKind::Project, &project.id, &verdict);
        self.write(&project).await?;

        tracing::info!(
            record_id = %project.id,
            author = %project.author,
            status = %project.status,
            flagged = project.is_flagged,
            "Project submitted"
        );
        Ok(project)
    }

    pub async fn edit_project(
        &self,
        actor: &Viewer,
        id: &str,
        draft: ProjectDraft,
    ) -> Result<Project, ContentError> {
        let mut project: Project = self.fetch(id).await?;
        self.workflow.authorize_edit(&project, actor)?;

        // Theme rules follow the author: a Sample mission stays Sample when
        // someone other than its author edits it.
        let theme_role = if project.author == actor.user_id {
            actor.role
        } else if project.theme == Theme::Sample {
            Role::Administrator
        } else {
            Role::Standard
        };

        let previous_status = project.status;
        project.apply_draft(theme_role, draft);
        let verdict = self.workflow.stamp_edit(&mut project, previous_status, actor);
        log_verdict(ContentKind::Project, &project.id, &verdict);
        self.write(&project).await?;

        tracing::info!(
            record_id = %project.id,
            editor = %actor.user_id,
            status = %project.status,
            flagged = project.is_flagged,
            "Project edited"
        );
        Ok(project)
    }

    pub async fn submit_post(
        &self,
        actor: &Viewer,
        draft: PostDraft,
    ) -> Result<CommunityPost, ContentError> {
        let mut post = CommunityPost {
            id: self.store.push_key(),
            title: String::new(),
            description: String::new(),
            author: actor.user_id.clone(),
            timestamp: Utc::now().format("%-m/%-d/%Y").to_string(),
            image_url: None,
            likes: 0,
            comments_count: 0,
            author_avatar: actor.avatar_url.clone(),
            category: String::new(),
            status: Default::default(),
            is_flagged: false,
        };
        post.apply_draft(draft);

        let verdict = self.workflow.stamp_new(&mut post, actor.role);
        log_verdict(ContentKind::CommunityPost, &post.id, &verdict);
        self.write(&post).await?;

        tracing::info!(
            record_id = %post.id,
            author = %post.author,
            status = %post.status,
            flagged = post.is_flagged,
            "Community post submitted"
        );
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        actor: &Viewer,
        id: &str,
        draft: PostDraft,
    ) -> Result<CommunityPost, ContentError> {
        let mut post: CommunityPost = self.fetch(id).await?;
        self.workflow.authorize_edit(&post, actor)?;

        let previous_status = post.status;
        post.apply_draft(draft);
        let verdict = self.workflow.stamp_edit(&mut post, previous_status, actor);
        log_verdict(ContentKind::CommunityPost, &post.id, &verdict);
        self.write(&post).await?;

        tracing::info!(
            record_id = %post.id,
            editor = %actor.user_id,
            status = %post.status,
            flagged = post.is_flagged,
            "Community post edited"
        );
        Ok(post)
    }

    // ------------------------------------------------------------------------
    // Review decisions
    // ------------------------------------------------------------------------

    /// Approve a pending record. Only the status field is written.
    pub async fn approve(
        &self,
        actor: &Viewer,
        kind: ContentKind,
        id: &str,
    ) -> Result<(), ContentError> {
        match kind {
            ContentKind::Project => self.approve_record::<Project>(actor, id).await,
            ContentKind::CommunityPost => self.approve_record::<CommunityPost>(actor, id).await,
        }
    }

    /// Reject a record, which deletes it.
    pub async fn reject(
        &self,
        actor: &Viewer,
        kind: ContentKind,
        id: &str,
    ) -> Result<(), ContentError> {
        match kind {
            ContentKind::Project => self.reject_record::<Project>(actor, id).await,
            ContentKind::CommunityPost => self.reject_record::<CommunityPost>(actor, id).await,
        }
    }

    /// Delete a record. Owners and administrators only.
    pub async fn delete(
        &self,
        actor: &Viewer,
        kind: ContentKind,
        id: &str,
    ) -> Result<(), ContentError> {
        match kind {
            ContentKind::Project => self.delete_record::<Project>(actor, id).await,
            ContentKind::CommunityPost => self.delete_record::<CommunityPost>(actor, id).await,
        }
    }

    async fn approve_record<T: StoredRecord>(
        &self,
        actor: &Viewer,
        id: &str,
    ) -> Result<(), ContentError> {
        let mut record: T = self.fetch(id).await?;
        self.workflow.approve(&mut record, actor)?;

        let mut fields = Map::new();
        fields.insert("status".to_string(), serde_json::to_value(record.status())?);
        // A record deleted since the fetch stays deleted.
        if !self
            .store
            .update_existing(&T::KIND.record_path(id), fields)
            .await?
        {
            return Err(ContentError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }

        tracing::info!(
            kind = %T::KIND,
            record_id = %id,
            admin = %actor.user_id,
            flagged = record.is_flagged(),
            "Record approved"
        );
        Ok(())
    }

    async fn reject_record<T: StoredRecord>(
        &self,
        actor: &Viewer,
        id: &str,
    ) -> Result<(), ContentError> {
        let record: T = self.fetch(id).await?;
        let removal = self.workflow.reject(&record, actor)?;
        self.remove_record(T::KIND, &removal.record_id).await?;

        tracing::info!(kind = %T::KIND, record_id = %id, admin = %actor.user_id, "Record rejected");
        Ok(())
    }

    async fn delete_record<T: StoredRecord>(
        &self,
        actor: &Viewer,
        id: &str,
    ) -> Result<(), ContentError> {
        let record: T = self.fetch(id).await?;
        let removal = self.workflow.authorize_delete(&record, actor)?;
        self.remove_record(T::KIND, &removal.record_id).await?;

        tracing::info!(kind = %T::KIND, record_id = %id, actor = %actor.user_id, "Record deleted");
        Ok(())
    }

    async fn remove_record(&self, kind: ContentKind, id: &str) -> Result<(), ContentError> {
        let path = kind.record_path(id);
        self.store.remove(&path).await?;
        self.engagement.discard(&path, Counter::Likes);
        self.engagement.discard(&path, Counter::Views);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Engagement
    // ------------------------------------------------------------------------

    /// Count a view of a project. Returns the value written.
    pub async fn record_view(&self, viewer: &Viewer, project_id: &str) -> Result<u64, ContentError> {
        let project: Project = self.fetch_visible(viewer, project_id).await?;
        let key = ContentKind::Project.record_path(project_id);
        let next = self.engagement.propose(&key, Counter::Views, project.views, 1);
        self.write_counter(ContentKind::Project, project_id, Counter::Views, next)
            .await?;
        Ok(next)
    }

    /// Like or unlike a project for this viewer.
    pub async fn toggle_like(
        &self,
        viewer: &Viewer,
        project_id: &str,
    ) -> Result<LikeState, ContentError> {
        let project: Project = self.fetch_visible(viewer, project_id).await?;
        let key = ContentKind::Project.record_path(project_id);
        let liked = self.engagement.toggle_liked(&viewer.user_id, &key);
        let delta = if liked { 1 } else { -1 };
        let next = self
            .engagement
            .propose(&key, Counter::Likes, project.likes, delta);

        if let Err(e) = self
            .write_counter(ContentKind::Project, project_id, Counter::Likes, next)
            .await
        {
            self.engagement.toggle_liked(&viewer.user_id, &key);
            return Err(e);
        }
        Ok(LikeState { liked, likes: next })
    }

    pub fn is_liked(&self, viewer: &Viewer, project_id: &str) -> bool {
        self.engagement
            .is_liked(&viewer.user_id, &ContentKind::Project.record_path(project_id))
    }

    /// Up- or down-vote a community post. Votes never push likes below zero.
    pub async fn vote_post(
        &self,
        viewer: &Viewer,
        post_id: &str,
        vote: Vote,
    ) -> Result<u64, ContentError> {
        let post: CommunityPost = self.fetch_visible(viewer, post_id).await?;
        let key = ContentKind::CommunityPost.record_path(post_id);
        let next = self
            .engagement
            .propose(&key, Counter::Likes, post.likes, vote.delta());
        self.write_counter(ContentKind::CommunityPost, post_id, Counter::Likes, next)
            .await?;
        Ok(next)
    }

    /// Optimistic value of a counter, if a write is still unconfirmed.
    pub fn pending_counter(&self, kind: ContentKind, id: &str, counter: Counter) -> Option<u64> {
        self.engagement.optimistic(&kind.record_path(id), counter)
    }

    /// Partial write of a single counter. Never touches status or flag, and
    /// never recreates a deleted record.
    async fn write_counter(
        &self,
        kind: ContentKind,
        id: &str,
        counter: Counter,
        value: u64,
    ) -> Result<(), ContentError> {
        let path = kind.record_path(id);
        let field = match counter {
            Counter::Likes => "likes",
            Counter::Views => "views",
        };
        let mut fields = Map::new();
        fields.insert(field.to_string(), Value::from(value));

        match self.store.update_existing(&path, fields).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.engagement.discard(&path, counter);
                Err(ContentError::NotFound {
                    kind,
                    id: id.to_string(),
                })
            }
            Err(e) => {
                self.engagement.discard(&path, counter);
                Err(e.into())
            }
        }
    }

    /// Take a pushed collection snapshot and let the server values replace
    /// any optimistic counters. State kept for records missing from the
    /// snapshot is dropped. Returns how many guesses were overridden.
    pub fn reconcile(&self, kind: ContentKind, snapshot: &Value) -> usize {
        let observed: Vec<(String, Counter, u64)> = match kind {
            ContentKind::Project => decode_collection::<Project>(snapshot)
                .into_iter()
                .flat_map(|p| {
                    [
                        (p.id.clone(), Counter::Likes, p.likes),
                        (p.id, Counter::Views, p.views),
                    ]
                })
                .collect(),
            ContentKind::CommunityPost => decode_collection::<CommunityPost>(snapshot)
                .into_iter()
                .map(|p| (p.id, Counter::Likes, p.likes))
                .collect(),
        };

        let mut overridden = 0;
        for (id, counter, server) in observed {
            if let Reconciliation::Overridden { guess, server } =
                self.engagement.reconcile(&kind.record_path(&id), counter, server)
            {
                tracing::debug!(record_id = %id, ?counter, guess, server, "Counter guess overridden by store");
                overridden += 1;
            }
        }

        let present: HashSet<String> = snapshot
            .as_object()
            .map(|entries| entries.keys().map(|id| kind.record_path(id)).collect())
            .unwrap_or_default();

        let prefix = format!("{}/", kind.collection());
        self.engagement.retain_records(|key| {
            !key.starts_with(&prefix) || present.contains(key)
        });
        overridden
    }

    // ------------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------------

    pub async fn add_comment(
        &self,
        viewer: &Viewer,
        project_id: &str,
        text: &str,
    ) -> Result<Comment, ContentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ContentError::EmptyComment);
        }
        // The project must exist; a comment path would otherwise create it.
        let _project: Project = self.fetch_visible(viewer, project_id).await?;

        let comment = Comment {
            id: self.store.push_key(),
            author: viewer.display_name.clone(),
            text: text.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            avatar_color: DEFAULT_AVATAR_COLOR.to_string(),
            likes: 0,
        };
        let path = format!(
            "{}/comments/{}",
            ContentKind::Project.record_path(project_id),
            comment.id
        );
        self.store.set(&path, serde_json::to_value(&comment)?).await?;

        tracing::debug!(record_id = %project_id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    async fn write<T: StoredRecord>(&self, record: &T) -> Result<(), ContentError> {
        let value = serde_json::to_value(record)?;
        self.store
            .set(&T::KIND.record_path(record.id()), value)
            .await?;
        Ok(())
    }
}

fn visible_to<T: StoredRecord>(records: Vec<T>, viewer: &Viewer) -> Vec<T> {
    records
        .into_iter()
        .filter(|record| is_visible(record, viewer))
        .collect()
}

fn log_verdict(kind: ContentKind, id: &str, verdict: &ModerationVerdict) {
    if verdict.flagged {
        let reasons: Vec<String> = verdict.reasons.iter().map(|r| r.to_string()).collect();
        tracing::info!(%kind, record_id = %id, reasons = ?reasons, "Content flagged for review");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::{Hardware, LessonStep};
    use crate::core::moderation::ContentFilter;
    use crate::core::workflow::{EditPolicy, RecordStatus, WorkflowAction};
    use crate::infra::content::InMemoryRecordStore;
    use serde_json::json;
    use std::sync::Arc;

    fn service_with(policy: EditPolicy) -> ContentService<InMemoryRecordStore> {
        let workflow = SubmissionWorkflow::new(Arc::new(ContentFilter::default()), policy);
        ContentService::new(InMemoryRecordStore::new(), workflow)
    }

    fn service() -> ContentService<InMemoryRecordStore> {
        service_with(EditPolicy::KeepStatus)
    }

    fn draft(title: &str) -> ProjectDraft {
        ProjectDraft {
            title: title.to_string(),
            description: "Measure soil moisture and water plants".to_string(),
            thumbnail: "https://images.unsplash.com/photo-1".to_string(),
            duration: "2 Hours".to_string(),
            hardware: vec![Hardware {
                name: "micro:bit".to_string(),
                link: "https://microbit.org/buy".to_string(),
                image: "https://picsum.photos/id/1/100/100".to_string(),
            }],
            steps: vec![LessonStep {
                title: "Wire the sensor".to_string(),
                content: "Connect the sensor to pin 0".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn admin() -> Viewer {
        Viewer::administrator("instructor")
    }

    fn kid() -> Viewer {
        Viewer::standard("kid")
    }

    #[tokio::test]
    async fn test_submission_status_by_role() {
        let service = service();

        let project = service.submit_project(&kid(), draft("Garden bot")).await.unwrap();
        assert_eq!(project.status, RecordStatus::Pending);
        assert!(!project.is_flagged);

        let project = service.submit_project(&admin(), draft("Sample bot")).await.unwrap();
        assert_eq!(project.status, RecordStatus::Approved);
        assert_eq!(project.theme, Theme::Sample);

        let stored: Project = service.fetch(&project.id).await.unwrap();
        assert_eq!(stored, project);
    }

    #[tokio::test]
    async fn test_flagged_submission_is_persisted() {
        let service = service();
        let mut d = draft("Check my p0rn project!");
        d.steps[0].youtube_url = Some("https://evil-tracker.xyz/x".to_string());

        let project = service.submit_project(&kid(), d).await.unwrap();
        assert!(project.is_flagged);
        assert_eq!(project.status, RecordStatus::Pending);

        let stored: Project = service.fetch(&project.id).await.unwrap();
        assert!(stored.is_flagged);
    }

    #[tokio::test]
    async fn test_approve_keeps_flag() {
        let service = service();
        let project = service
            .submit_project(&kid(), draft("Casino robot"))
            .await
            .unwrap();
        assert!(project.is_flagged);

        service
            .approve(&admin(), ContentKind::Project, &project.id)
            .await
            .unwrap();
        service
            .approve(&admin(), ContentKind::Project, &project.id)
            .await
            .unwrap();

        let stored: Project = service.fetch(&project.id).await.unwrap();
        assert_eq!(stored.status, RecordStatus::Approved);
        assert!(stored.is_flagged);
    }

    #[tokio::test]
    async fn test_standard_user_cannot_approve() {
        let service = service();
        let project = service.submit_project(&kid(), draft("Rover")).await.unwrap();

        let err = service
            .approve(&kid(), ContentKind::Project, &project.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContentError::Workflow(WorkflowError::NotAuthorized {
                action: WorkflowAction::Approve,
                ..
            })
        ));

        let stored: Project = service.fetch(&project.id).await.unwrap();
        assert_eq!(stored.status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_reject_deletes_record() {
        let service = service();
        let post = service
            .submit_post(
                &kid(),
                PostDraft {
                    title: "My hookup guide".to_string(),
                    category: "IoT".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(post.is_flagged);

        assert!(service
            .reject(&kid(), ContentKind::CommunityPost, &post.id)
            .await
            .is_err());
        service
            .reject(&admin(), ContentKind::CommunityPost, &post.id)
            .await
            .unwrap();

        let err = service.fetch::<CommunityPost>(&post.id).await.unwrap_err();
        assert!(matches!(err, ContentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let service = service();
        let project = service.submit_project(&kid(), draft("Rover")).await.unwrap();

        let stranger = Viewer::standard("stranger");
        assert!(service
            .delete(&stranger, ContentKind::Project, &project.id)
            .await
            .is_err());
        assert!(service.fetch::<Project>(&project.id).await.is_ok());

        service
            .delete(&kid(), ContentKind::Project, &project.id)
            .await
            .unwrap();
        assert!(service.fetch::<Project>(&project.id).await.is_err());
    }

    #[tokio::test]
    async fn test_visibility_of_listings() {
        let service = service();
        service.submit_project(&kid(), draft("Pending one")).await.unwrap();
        service.submit_project(&admin(), draft("Public one")).await.unwrap();

        assert_eq!(service.projects(&kid()).await.unwrap().len(), 2);
        assert_eq!(service.projects(&admin()).await.unwrap().len(), 2);
        let others = service.projects(&Viewer::standard("other")).await.unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].status, RecordStatus::Approved);
    }

    #[tokio::test]
    async fn test_edit_reruns_filter_and_keeps_counters() {
        let service = service();
        let project = service.submit_project(&kid(), draft("Rover")).await.unwrap();
        service.record_view(&kid(), &project.id).await.unwrap();
        service
            .approve(&admin(), ContentKind::Project, &project.id)
            .await
            .unwrap();

        let edited = service
            .edit_project(&kid(), &project.id, draft("Rover with betting odds"))
            .await
            .unwrap();
        assert!(edited.is_flagged);
        assert_eq!(edited.status, RecordStatus::Approved);
        assert_eq!(edited.views, 1);
        assert_eq!(edited.author, "kid");
        assert_eq!(edited.published_at, project.published_at);

        let err = service
            .edit_project(&Viewer::standard("other"), &project.id, draft("Mine now"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Workflow(_)));
    }

    #[tokio::test]
    async fn test_edit_with_review_policy_resets_status() {
        let service = service_with(EditPolicy::RequireReview);
        let project = service.submit_project(&kid(), draft("Rover")).await.unwrap();
        service
            .approve(&admin(), ContentKind::Project, &project.id)
            .await
            .unwrap();

        let edited = service
            .edit_project(&kid(), &project.id, draft("Rover v2"))
            .await
            .unwrap();
        assert_eq!(edited.status, RecordStatus::Pending);
    }

    fn post_draft(title: &str) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            description: "Logs temperature every minute".to_string(),
            image_url: Some("https://images.unsplash.com/photo-2".to_string()),
            category: "IoT".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_post_stamps_author() {
        let service = service();
        let viewer = kid().with_avatar("https://picsum.photos/id/7/64/64");

        let post = service.submit_post(&viewer, post_draft("Weather station")).await.unwrap();
        assert_eq!(post.author, "kid");
        assert_eq!(
            post.author_avatar.as_deref(),
            Some("https://picsum.photos/id/7/64/64")
        );
        assert!(!post.timestamp.is_empty());

        let stored: CommunityPost = service.fetch(&post.id).await.unwrap();
        assert_eq!(stored, post);
    }

    #[tokio::test]
    async fn test_edit_post_permissions_and_flag() {
        let service = service();
        let post = service.submit_post(&kid(), post_draft("Weather station")).await.unwrap();
        service
            .approve(&admin(), ContentKind::CommunityPost, &post.id)
            .await
            .unwrap();

        let err = service
            .edit_post(&Viewer::standard("stranger"), &post.id, post_draft("Mine now"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Workflow(_)));

        let edited = service
            .edit_post(&kid(), &post.id, post_draft("Weather station with gambling odds"))
            .await
            .unwrap();
        assert!(edited.is_flagged);
        assert_eq!(edited.status, RecordStatus::Approved);
        assert_eq!(edited.timestamp, post.timestamp);

        let edited = service
            .edit_post(&kid(), &post.id, post_draft("Weather station"))
            .await
            .unwrap();
        assert!(!edited.is_flagged);

        let stored: CommunityPost = service.fetch(&post.id).await.unwrap();
        assert_eq!(stored.title, "Weather station");
        assert!(!stored.is_flagged);
    }

    #[tokio::test]
    async fn test_edit_post_under_review_policy() {
        let service = service_with(EditPolicy::RequireReview);
        let post = service.submit_post(&kid(), post_draft("Weather station")).await.unwrap();
        service
            .approve(&admin(), ContentKind::CommunityPost, &post.id)
            .await
            .unwrap();

        let edited = service
            .edit_post(&kid(), &post.id, post_draft("Weather station v2"))
            .await
            .unwrap();
        assert_eq!(edited.status, RecordStatus::Pending);

        service
            .approve(&admin(), ContentKind::CommunityPost, &post.id)
            .await
            .unwrap();
        let edited = service
            .edit_post(&admin(), &post.id, post_draft("Weather station v3"))
            .await
            .unwrap();
        assert_eq!(edited.status, RecordStatus::Approved);
        assert_eq!(edited.author, "kid");
    }

    #[tokio::test]
    async fn test_counters_on_deleted_record_do_not_recreate_it() {
        let service = service();
        let project = service.submit_project(&admin(), draft("Rover")).await.unwrap();
        service
            .store()
            .remove(&ContentKind::Project.record_path(&project.id))
            .await
            .unwrap();

        assert!(matches!(
            service
                .approve(&admin(), ContentKind::Project, &project.id)
                .await,
            Err(ContentError::NotFound { .. })
        ));
        assert!(matches!(
            service.toggle_like(&kid(), &project.id).await,
            Err(ContentError::NotFound { .. })
        ));
        assert_eq!(service.store().get("projects").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_admin_edit_keeps_student_theme() {
        let service = service();
        let mut d = draft("Rover");
        d.theme = Theme::SustainableLiving;
        let project = service.submit_project(&kid(), d.clone()).await.unwrap();

        let edited = service.edit_project(&admin(), &project.id, d).await.unwrap();
        assert_eq!(edited.theme, Theme::SustainableLiving);
        assert_eq!(edited.author, "kid");
    }

    #[tokio::test]
    async fn test_counter_updates_do_not_rerun_filter() {
        let service = service();
        // Written straight to the store, bypassing the filter.
        service
            .store()
            .set(
                "projects/raw",
                json!({
                    "title": "Casino night",
                    "author": "kid",
                    "publishedAt": "2024-01-01",
                    "status": "pending",
                    "isFlagged": false
                }),
            )
            .await
            .unwrap();

        service.record_view(&kid(), "raw").await.unwrap();
        service.toggle_like(&kid(), "raw").await.unwrap();

        let stored: Project = service.fetch("raw").await.unwrap();
        assert_eq!(stored.views, 1);
        assert_eq!(stored.likes, 1);
        assert!(!stored.is_flagged);
        assert_eq!(stored.status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_toggle_like_round_trip() {
        let service = service();
        let project = service.submit_project(&admin(), draft("Rover")).await.unwrap();

        let state = service.toggle_like(&kid(), &project.id).await.unwrap();
        assert_eq!(state, LikeState { liked: true, likes: 1 });
        let state = service.toggle_like(&kid(), &project.id).await.unwrap();
        assert_eq!(state, LikeState { liked: false, likes: 0 });
    }

    #[tokio::test]
    async fn test_vote_never_goes_negative() {
        let service = service();
        let post = service
            .submit_post(
                &admin(),
                PostDraft {
                    title: "Weather station".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let voter = kid();
        assert_eq!(service.vote_post(&voter, &post.id, Vote::Down).await.unwrap(), 0);
        assert_eq!(service.vote_post(&voter, &post.id, Vote::Up).await.unwrap(), 1);
        assert_eq!(service.vote_post(&voter, &post.id, Vote::Up).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_server_wins() {
        let service = service();
        let project = service.submit_project(&admin(), draft("Rover")).await.unwrap();

        service.toggle_like(&kid(), &project.id).await.unwrap();
        assert_eq!(
            service.pending_counter(ContentKind::Project, &project.id, Counter::Likes),
            Some(1)
        );

        // Another client's write lands after ours.
        let mut fields = Map::new();
        fields.insert("likes".to_string(), json!(7));
        service
            .store()
            .update(&ContentKind::Project.record_path(&project.id), fields)
            .await
            .unwrap();

        let snapshot = service.store().get("projects").await.unwrap();
        assert_eq!(service.reconcile(ContentKind::Project, &snapshot), 1);
        assert_eq!(
            service.pending_counter(ContentKind::Project, &project.id, Counter::Likes),
            None
        );
    }

    #[tokio::test]
    async fn test_reconcile_forgets_deleted_records() {
        let service = service();
        let project = service.submit_project(&admin(), draft("Rover")).await.unwrap();
        let post = service
            .submit_post(
                &admin(),
                PostDraft {
                    title: "Weather station".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        service.toggle_like(&kid(), &project.id).await.unwrap();
        service.vote_post(&kid(), &post.id, Vote::Up).await.unwrap();
        assert!(service.is_liked(&kid(), &project.id));

        // Removed by another client, so no local delete ran.
        service
            .store()
            .remove(&ContentKind::Project.record_path(&project.id))
            .await
            .unwrap();
        let snapshot = service.store().get("projects").await.unwrap();
        assert_eq!(service.reconcile(ContentKind::Project, &snapshot), 0);

        assert_eq!(
            service.pending_counter(ContentKind::Project, &project.id, Counter::Likes),
            None
        );
        assert!(!service.is_liked(&kid(), &project.id));
        // The other collection is untouched.
        assert_eq!(
            service.pending_counter(ContentKind::CommunityPost, &post.id, Counter::Likes),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_engagement_on_hidden_records_is_not_found() {
        let service = service();
        let project = service.submit_project(&kid(), draft("Rover")).await.unwrap();
        let post = service
            .submit_post(
                &kid(),
                PostDraft {
                    title: "Weather station".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let stranger = Viewer::standard("stranger");

        assert!(matches!(
            service.add_comment(&stranger, &project.id, "hi").await,
            Err(ContentError::NotFound { .. })
        ));
        assert!(matches!(
            service.toggle_like(&stranger, &project.id).await,
            Err(ContentError::NotFound { .. })
        ));
        assert!(matches!(
            service.record_view(&stranger, &project.id).await,
            Err(ContentError::NotFound { .. })
        ));
        assert!(matches!(
            service.vote_post(&stranger, &post.id, Vote::Up).await,
            Err(ContentError::NotFound { .. })
        ));
        assert!(!service.is_liked(&stranger, &project.id));

        let stored: Project = service.fetch(&project.id).await.unwrap();
        assert_eq!((stored.views, stored.likes), (0, 0));
        assert!(stored.comments.is_empty());

        // The author and administrators still can.
        service.record_view(&kid(), &project.id).await.unwrap();
        service.add_comment(&admin(), &project.id, "Looks good").await.unwrap();
        service.vote_post(&admin(), &post.id, Vote::Up).await.unwrap();
    }

    #[tokio::test]
    async fn test_comments() {
        let service = service();
        let project = service.submit_project(&admin(), draft("Rover")).await.unwrap();

        assert!(matches!(
            service.add_comment(&kid(), &project.id, "   ").await,
            Err(ContentError::EmptyComment)
        ));
        assert!(matches!(
            service.add_comment(&kid(), "missing", "hi").await,
            Err(ContentError::NotFound { .. })
        ));

        let first = service.add_comment(&kid(), &project.id, "Cool!").await.unwrap();
        let second = service.add_comment(&admin(), &project.id, "Thanks").await.unwrap();

        let stored: Project = service.fetch(&project.id).await.unwrap();
        let texts: Vec<&str> = stored.comments.values().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Cool!", "Thanks"]);
        assert!(first.id < second.id);
    }

    #[tokio::test]
    async fn test_submission_queue() {
        let service = service();
        service.submit_project(&kid(), draft("Mine")).await.unwrap();
        service
            .submit_project(&Viewer::standard("other"), draft("Theirs"))
            .await
            .unwrap();
        service
            .submit_post(
                &kid(),
                PostDraft {
                    title: "Poker bot".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let queue = service.submission_queue(&admin()).await.unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.flagged_count(), 1);

        let queue = service.submission_queue(&kid()).await.unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_feed_pushes_new_submissions() {
        let service = service();
        let mut feed = service.subscribe(ContentKind::Project).await.unwrap();
        assert!(feed.current().is_null());

        let project = service.submit_project(&kid(), draft("Rover")).await.unwrap();
        let value = feed.changed().await.unwrap();
        let projects: Vec<Project> = decode_collection(&value);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, project.id);
    }

    #[test]
    fn test_decode_collection_skips_bad_entries() {
        let snapshot = json!({
            "a": { "title": "Ok", "author": "kid", "publishedAt": "2024-02-02" },
            "b": { "title": 42 },
        });
        let projects: Vec<Project> = decode_collection(&snapshot);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "a");
        assert!(decode_collection::<Project>(&Value::Null).is_empty());
    }
}
