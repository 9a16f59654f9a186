//! Debounced auto-save for an idea open in an editor.
//!
//! An `EditDraft` keeps the idea being edited next to a snapshot of what
//! was last saved. Every edit restarts a quiet-period timer. Once it runs
//! out, `autosave` sends the full content with `IdeaPatch::from_idea`, so
//! `order` is never touched. A failed save leaves the draft dirty and the
//! next cycle tries again.

use std::time::Duration;

use playground_common::{Dimensions, Idea, IdeaPatch, IdeaRecord};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use super::http::PlaygroundClient;
use crate::errors::ClientError;

/// Quiet period after the last edit before a save is sent.
pub const AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

/// Fields compared to decide whether a draft has unsaved changes.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    title: String,
    content: String,
    dimensions: Dimensions,
}

impl Snapshot {
    fn of(idea: &Idea) -> Self {
        Self {
            title: idea.title.trim().to_string(),
            content: idea.content.clone(),
            dimensions: idea.dimensions.clone(),
        }
    }
}

pub struct EditDraft {
    client: PlaygroundClient,
    id: String,
    idea: Idea,
    saved: Snapshot,
    delay: Duration,
    last_edit: Option<Instant>,
}

impl EditDraft {
    pub fn new(client: PlaygroundClient, id: impl Into<String>, idea: Idea) -> Self {
        let saved = Snapshot::of(&idea);
        Self {
            client,
            id: id.into(),
            idea,
            saved,
            delay: AUTOSAVE_DELAY,
            last_edit: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn idea(&self) -> &Idea {
        &self.idea
    }

    /// Change the draft and restart the debounce timer.
    pub fn edit(&mut self, change: impl FnOnce(&mut Idea)) {
        change(&mut self.idea);
        self.last_edit = Some(Instant::now());
    }

    /// Trimmed title, content or dimensions differ from the last save.
    pub fn is_dirty(&self) -> bool {
        Snapshot::of(&self.idea) != self.saved
    }

    // A blank title is never sent.
    fn is_savable(&self) -> bool {
        self.is_dirty() && !self.idea.title.trim().is_empty()
    }

    /// When the pending save fires, or `None` if nothing needs saving.
    pub fn due_at(&self) -> Option<Instant> {
        if !self.is_savable() {
            return None;
        }
        Some(
            self.last_edit
                .map_or_else(Instant::now, |edited| edited + self.delay),
        )
    }

    pub fn save_due(&self) -> bool {
        self.due_at().is_some_and(|at| Instant::now() >= at)
    }

    /// Wait out the quiet period, then save. Returns `Ok(None)` at once
    /// when there is nothing to save.
    pub async fn autosave(&mut self) -> Result<Option<IdeaRecord>, ClientError> {
        let Some(at) = self.due_at() else {
            return Ok(None);
        };
        sleep_until(at).await;
        self.flush().await
    }

    /// Save pending changes now, skipping the quiet period. Called when the
    /// editor closes.
    ///
    /// On success the snapshot is reset to the server's copy. On failure
    /// the draft stays dirty and the next cycle is due one delay from now.
    pub async fn flush(&mut self) -> Result<Option<IdeaRecord>, ClientError> {
        if !self.is_savable() {
            return Ok(None);
        }
        let mut outgoing = self.idea.clone();
        outgoing.title = outgoing.title.trim().to_string();

        match self
            .client
            .update_idea(&self.id, &IdeaPatch::from_idea(&outgoing))
            .await
        {
            Ok(record) => {
                debug!(id = %self.id, "Draft saved");
                self.saved = Snapshot::of(&record.idea);
                self.idea = record.idea.clone();
                self.last_edit = None;
                Ok(Some(record))
            }
            Err(error) => {
                warn!(id = %self.id, error = %error, "Auto-save failed, retrying on next cycle");
                self.last_edit = Some(Instant::now());
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea() -> Idea {
        Idea {
            title: "Draft".into(),
            content: "first".into(),
            content_json: None,
            dimensions: Dimensions {
                field: "DevOps".into(),
                readiness: 3,
                complexity: 2,
                potentially_connected_idea: None,
            },
            sub_ideas: vec![],
            order: 4,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    // Nothing listens on port 1, so every save fails.
    fn offline_draft() -> EditDraft {
        let client = PlaygroundClient::new("http://127.0.0.1:1").unwrap();
        EditDraft::new(client, "a", idea())
    }

    #[tokio::test]
    async fn test_dirty_tracks_compared_fields() {
        let mut draft = offline_draft();
        assert!(!draft.is_dirty());
        assert!(draft.due_at().is_none());

        draft.edit(|idea| idea.title = "  Draft  ".into());
        assert!(!draft.is_dirty(), "surrounding whitespace is not a change");

        draft.edit(|idea| idea.sub_ideas.push("x".into()));
        assert!(!draft.is_dirty(), "sub ideas are not compared");

        draft.edit(|idea| idea.dimensions.readiness = 7);
        assert!(draft.is_dirty());

        draft.edit(|idea| idea.dimensions.readiness = 3);
        assert!(!draft.is_dirty(), "reverting clears the flag");

        draft.edit(|idea| idea.content = "second".into());
        assert!(draft.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_edit_restarts_the_quiet_period() {
        let mut draft = offline_draft();
        draft.edit(|idea| idea.content = "one".into());
        assert!(!draft.save_due());

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(!draft.save_due());
        draft.edit(|idea| idea.content = "two".into());

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(!draft.save_due());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(draft.save_due());
    }

    #[tokio::test]
    async fn test_clean_or_untitled_draft_sends_nothing() {
        let mut draft = offline_draft();
        assert!(draft.autosave().await.unwrap().is_none());

        draft.edit(|idea| idea.title = "   ".into());
        assert!(draft.is_dirty());
        assert!(draft.due_at().is_none());
        assert!(draft.flush().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_waits_then_keeps_dirty_on_failure() {
        let mut draft = offline_draft();
        draft.edit(|idea| idea.content = "changed".into());
        let started = Instant::now();

        let err = draft.autosave().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert!(started.elapsed() >= AUTOSAVE_DELAY);
        assert!(draft.is_dirty());
        assert!(!draft.save_due(), "retry waits for another quiet period");
        assert!(draft.due_at().is_some());
    }

    #[tokio::test]
    async fn test_flush_skips_the_quiet_period() {
        let mut draft = offline_draft().with_delay(Duration::from_secs(3600));
        draft.edit(|idea| idea.content = "changed".into());
        assert!(!draft.save_due());

        let err = draft.flush().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert!(draft.is_dirty());
        assert_eq!(draft.idea().content, "changed");
    }
}
