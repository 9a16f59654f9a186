use std::collections::BTreeMap;

use playground_common::{Idea, IdeaFilters, IdeaPatch, IdeaRecord, NewIdea};
use thiserror::Error;
use tracing::{debug, warn};

use super::draft::EditDraft;
use super::http::PlaygroundClient;
use crate::board::{Board, DragPlan, DropTarget, ReadinessColumn, resolve_columns};
use crate::errors::ClientError;

/// Prior state of every idea a local mutation touched. `None` means the
/// idea did not exist locally before.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rollback {
    previous: Vec<(String, Option<Idea>)>,
}

impl Rollback {
    fn capture<'a>(ideas: &BTreeMap<String, Idea>, ids: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            previous: ids
                .into_iter()
                .map(|id| (id.clone(), ideas.get(id).cloned()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

/// The mutation a failed call was carrying out.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Drag(DragPlan),
    Update { id: String },
    Delete { id: String },
}

/// An optimistic mutation the server did not accept. Local state still
/// shows the optimistic result until `BoardSession::rollback` is called.
#[derive(Debug, Error)]
#[error("{mutation:?} was not saved: {error}")]
pub struct MutationFailure {
    pub mutation: Mutation,
    #[source]
    pub error: ClientError,
    pub rollback: Rollback,
}

/// Local board state backed by the server.
///
/// Mutations update the in-memory idea map first, then call the server.
/// A failure is returned to the caller together with the snapshot needed
/// to undo the local change.
pub struct BoardSession {
    client: PlaygroundClient,
    columns: Vec<ReadinessColumn>,
    ideas: BTreeMap<String, Idea>,
}

impl BoardSession {
    /// Fetch the registry and the ideas, deriving columns from the registry.
    pub async fn load(client: PlaygroundClient) -> Result<Self, ClientError> {
        let registry = client.dimensions().await?;
        let columns = resolve_columns(&registry);
        let ideas = client.list_ideas().await?;
        debug!(columns = columns.len(), ideas = ideas.len(), "Board session loaded");
        Ok(Self {
            client,
            columns,
            ideas,
        })
    }

    pub fn from_parts(
        client: PlaygroundClient,
        columns: Vec<ReadinessColumn>,
        ideas: BTreeMap<String, Idea>,
    ) -> Self {
        Self {
            client,
            columns,
            ideas,
        }
    }

    pub fn client(&self) -> &PlaygroundClient {
        &self.client
    }

    pub fn columns(&self) -> &[ReadinessColumn] {
        &self.columns
    }

    pub fn ideas(&self) -> &BTreeMap<String, Idea> {
        &self.ideas
    }

    pub fn idea(&self, id: &str) -> Option<&Idea> {
        self.ideas.get(id)
    }

    /// Current grouping of the local ideas into columns.
    pub fn board(&self) -> Board {
        Board::build(self.columns.clone(), &self.ideas)
    }

    /// Local ideas matching `filters`, ascending by `order`.
    pub fn filtered(&self, filters: &IdeaFilters) -> Vec<(&str, &Idea)> {
        let mut matching: Vec<_> = self
            .ideas
            .iter()
            .filter(|(_, idea)| filters.matches(&idea.dimensions))
            .map(|(id, idea)| (id.as_str(), idea))
            .collect();
        matching.sort_by_key(|(id, idea)| (idea.order, *id));
        matching
    }

    /// `filtered`, narrowed to titles containing `query`. Matching is
    /// case-insensitive on the trimmed query; a blank query keeps all.
    pub fn search(&self, filters: &IdeaFilters, query: &str) -> Vec<(&str, &Idea)> {
        let needle = query.trim().to_lowercase();
        let mut matching = self.filtered(filters);
        if !needle.is_empty() {
            matching.retain(|(_, idea)| idea.title.to_lowercase().contains(&needle));
        }
        matching
    }

    /// Open `id` for editing with debounced auto-save.
    pub fn edit(&self, id: &str) -> Option<EditDraft> {
        self.ideas
            .get(id)
            .map(|idea| EditDraft::new(self.client.clone(), id, idea.clone()))
    }

    /// Drop cached responses and reload registry and ideas from the server.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.client.cache().invalidate().await;
        let registry = self.client.dimensions().await?;
        self.columns = resolve_columns(&registry);
        self.ideas = self.client.list_ideas().await?;
        Ok(())
    }

    /// Restore the ideas captured in `rollback`.
    pub fn rollback(&mut self, rollback: Rollback) {
        for (id, previous) in rollback.previous {
            match previous {
                Some(idea) => {
                    self.ideas.insert(id, idea);
                }
                None => {
                    self.ideas.remove(&id);
                }
            }
        }
    }

    /// Plan, apply locally, then send a drag-end gesture.
    pub async fn drag_end(
        &mut self,
        active_id: &str,
        over: Option<&DropTarget>,
    ) -> Result<DragPlan, MutationFailure> {
        let plan = self.board().plan_drag_end(active_id, over);
        if plan.is_noop() {
            return Ok(plan);
        }

        let result = match &plan {
            DragPlan::NoOp => Ok(()),
            DragPlan::Reorder { ids, .. } => {
                let rollback = Rollback::capture(&self.ideas, ids);
                for (index, id) in ids.iter().enumerate() {
                    if let Some(idea) = self.ideas.get_mut(id) {
                        idea.order = index as i64 + 1;
                    }
                }
                self.client.reorder(ids).await.map_err(|error| (error, rollback))
            }
            DragPlan::MoveToColumn {
                idea_id, readiness, ..
            } => {
                let rollback = Rollback::capture(&self.ideas, [idea_id]);
                if let Some(idea) = self.ideas.get_mut(idea_id) {
                    idea.dimensions.readiness = *readiness;
                }
                match self
                    .client
                    .update_idea(idea_id, &IdeaPatch::readiness(*readiness))
                    .await
                {
                    Ok(record) => {
                        self.ideas.insert(record.id, record.idea);
                        Ok(())
                    }
                    Err(error) => Err((error, rollback)),
                }
            }
        };

        match result {
            Ok(()) => Ok(plan),
            Err((error, rollback)) => {
                warn!(error = %error, ?plan, "Drag-end mutation failed");
                Err(MutationFailure {
                    mutation: Mutation::Drag(plan),
                    error,
                    rollback,
                })
            }
        }
    }

    /// Create an idea after a case-insensitive title check against the
    /// local ideas. The server's own check is case-sensitive.
    pub async fn create_idea(&mut self, new: NewIdea) -> Result<IdeaRecord, ClientError> {
        let wanted = new.title.trim().to_lowercase();
        if let Some((id, _)) = self
            .ideas
            .iter()
            .find(|(_, idea)| idea.title.trim().to_lowercase() == wanted)
        {
            return Err(ClientError::TitleTaken {
                title: new.title,
                conflicting_id: id.clone(),
            });
        }

        let record = self.client.create_idea(&new).await?;
        self.ideas.insert(record.id.clone(), record.idea.clone());
        Ok(record)
    }

    /// Apply `patch` locally, then send it. On success the local copy is
    /// replaced by the server's merged idea.
    pub async fn update_idea(
        &mut self,
        id: &str,
        patch: IdeaPatch,
    ) -> Result<IdeaRecord, MutationFailure> {
        let mutation = Mutation::Update { id: id.to_string() };
        let Some(idea) = self.ideas.get_mut(id) else {
            return Err(MutationFailure {
                mutation,
                error: ClientError::UnknownIdea { id: id.to_string() },
                rollback: Rollback::default(),
            });
        };
        let rollback = Rollback {
            previous: vec![(id.to_string(), Some(idea.clone()))],
        };
        idea.apply_patch(&patch);

        match self.client.update_idea(id, &patch).await {
            Ok(record) => {
                self.ideas.insert(record.id.clone(), record.idea.clone());
                Ok(record)
            }
            Err(error) => {
                warn!(id, error = %error, "Idea update failed");
                Err(MutationFailure {
                    mutation,
                    error,
                    rollback,
                })
            }
        }
    }

    /// Remove locally, then delete on the server.
    pub async fn delete_idea(&mut self, id: &str) -> Result<(), MutationFailure> {
        let mutation = Mutation::Delete { id: id.to_string() };
        let Some(previous) = self.ideas.remove(id) else {
            return Err(MutationFailure {
                mutation,
                error: ClientError::UnknownIdea { id: id.to_string() },
                rollback: Rollback::default(),
            });
        };
        let rollback = Rollback {
            previous: vec![(id.to_string(), Some(previous))],
        };

        self.client.delete_idea(id).await.map_err(|error| {
            warn!(id, error = %error, "Idea delete failed");
            MutationFailure {
                mutation,
                error,
                rollback,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::default_columns;
    use playground_common::{DimensionsPatch, Dimensions};

    fn idea(title: &str, readiness: i64, order: i64) -> Idea {
        Idea {
            title: title.to_string(),
            content: "body".into(),
            content_json: None,
            dimensions: Dimensions {
                field: "DevOps".into(),
                readiness,
                complexity: 2,
                potentially_connected_idea: None,
            },
            sub_ideas: vec![],
            order,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    /// Session whose client points at a port nothing listens on, so every
    /// network call fails.
    fn offline_session() -> BoardSession {
        let client = PlaygroundClient::new("http://127.0.0.1:1").unwrap();
        let ideas = BTreeMap::from([
            ("A".to_string(), idea("Alpha", 5, 1)),
            ("B".to_string(), idea("Beta", 6, 2)),
            ("C".to_string(), idea("Gamma", 3, 3)),
        ]);
        BoardSession::from_parts(client, default_columns(), ideas)
    }

    #[tokio::test]
    async fn test_noop_drag_sends_nothing() {
        let mut session = offline_session();
        let before = session.ideas().clone();
        let plan = session.drag_end("A", None).await.unwrap();
        assert_eq!(plan, DragPlan::NoOp);
        assert_eq!(session.ideas(), &before);
    }

    #[tokio::test]
    async fn test_failed_reorder_is_applied_then_rolled_back() {
        let mut session = offline_session();
        let before = session.ideas().clone();

        let failure = session
            .drag_end("B", Some(&DropTarget::Card("A".into())))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, ClientError::Http(_)));
        assert!(matches!(failure.mutation, Mutation::Drag(DragPlan::Reorder { .. })));

        // Optimistic state is still visible until rolled back.
        assert_eq!(session.idea("B").unwrap().order, 1);
        assert_eq!(session.idea("A").unwrap().order, 2);

        session.rollback(failure.rollback);
        assert_eq!(session.ideas(), &before);
    }

    #[tokio::test]
    async fn test_failed_column_move_is_rolled_back() {
        let mut session = offline_session();
        let before = session.ideas().clone();

        let failure = session
            .drag_end("C", Some(&DropTarget::Card("A".into())))
            .await
            .unwrap_err();
        let idea = session.idea("C").unwrap();
        assert_eq!(idea.dimensions.readiness, 5);
        assert_eq!(idea.order, 3);

        session.rollback(failure.rollback);
        assert_eq!(session.ideas(), &before);
    }

    #[tokio::test]
    async fn test_failed_update_and_delete_roll_back() {
        let mut session = offline_session();
        let before = session.ideas().clone();

        let patch = IdeaPatch {
            title: Some("Renamed".into()),
            dimensions: Some(DimensionsPatch {
                complexity: Some(9),
                ..Default::default()
            }),
            ..Default::default()
        };
        let failure = session.update_idea("A", patch).await.unwrap_err();
        assert_eq!(session.idea("A").unwrap().title, "Renamed");
        session.rollback(failure.rollback);
        assert_eq!(session.ideas(), &before);

        let failure = session.delete_idea("B").await.unwrap_err();
        assert!(session.idea("B").is_none());
        session.rollback(failure.rollback);
        assert_eq!(session.ideas(), &before);
    }

    #[tokio::test]
    async fn test_unknown_ideas_are_rejected_locally() {
        let mut session = offline_session();
        let failure = session.delete_idea("ghost").await.unwrap_err();
        assert!(matches!(failure.error, ClientError::UnknownIdea { .. }));
        assert!(failure.rollback.is_empty());

        let failure = session
            .update_idea("ghost", IdeaPatch::readiness(2))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, ClientError::UnknownIdea { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_title_case_insensitively() {
        let mut session = offline_session();
        let err = session
            .create_idea(NewIdea {
                title: "  ALPHA ".into(),
                content: "x".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            ClientError::TitleTaken { conflicting_id, .. } => assert_eq!(conflicting_id, "A"),
            other => panic!("Expected TitleTaken, got {:?}", other),
        }
    }

    #[test]
    fn test_filtered_sorts_by_order() {
        let session = offline_session();
        let all = session.filtered(&IdeaFilters::default());
        let ids: Vec<_> = all.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        let fives = session.filtered(&IdeaFilters {
            readiness: Some(5),
            ..Default::default()
        });
        assert_eq!(fives.len(), 1);
        assert_eq!(fives[0].0, "A");
    }

    #[test]
    fn test_search_stacks_on_filters() {
        fn ids(found: Vec<(&str, &Idea)>) -> Vec<String> {
            found.into_iter().map(|(id, _)| id.to_string()).collect()
        }
        let session = offline_session();

        assert_eq!(ids(session.search(&IdeaFilters::default(), "  ")), ["A", "B", "C"]);
        assert_eq!(ids(session.search(&IdeaFilters::default(), " ETA ")), ["B"]);
        assert_eq!(ids(session.search(&IdeaFilters::default(), "a")), ["A", "B", "C"]);

        let in_five = IdeaFilters {
            readiness: Some(5),
            ..Default::default()
        };
        assert_eq!(ids(session.search(&in_five, "alp")), ["A"]);
        assert!(session.search(&in_five, "gamma").is_empty());
    }

    #[test]
    fn test_edit_opens_draft_of_local_idea() {
        let session = offline_session();
        let draft = session.edit("B").unwrap();
        assert_eq!(draft.id(), "B");
        assert_eq!(draft.idea().title, "Beta");
        assert!(!draft.is_dirty());
        assert!(session.edit("ghost").is_none());
    }
}
