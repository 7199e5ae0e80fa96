use std::fmt;

use serde::{Deserialize, Serialize};

use super::post::FeedEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Load,
    Like,
    Dislike,
    Remove,
    Save,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Load => "load",
            ActionKind::Like => "like",
            ActionKind::Dislike => "dislike",
            ActionKind::Remove => "remove",
            ActionKind::Save => "save",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to local state when the remote half of an optimistic
/// operation fails. Declared per action kind so the divergent behaviors are
/// policy, not accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Local state is untouched before the remote call succeeds.
    LocalUntouched,
    /// A pending placeholder stays cached, visible, for manual retry.
    RetainPending,
    /// The optimistic local effect stays applied; only the error surfaces.
    NoRollback,
}

impl ActionKind {
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            ActionKind::Load | ActionKind::Like | ActionKind::Dislike => {
                FailurePolicy::LocalUntouched
            }
            ActionKind::Save => FailurePolicy::RetainPending,
            ActionKind::Remove => FailurePolicy::NoRollback,
        }
    }
}

/// An optimistic operation that did not complete, captured with enough
/// context to retry it verbatim.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub target: Option<i64>,
    /// Payload for actions that carry one (`Save` keeps the post under its
    /// placeholder id so a retry replaces the right row).
    pub post: Option<FeedEntry>,
}

impl PendingAction {
    pub fn load() -> Self {
        Self {
            kind: ActionKind::Load,
            target: None,
            post: None,
        }
    }

    pub fn like(id: i64) -> Self {
        Self {
            kind: ActionKind::Like,
            target: Some(id),
            post: None,
        }
    }

    pub fn dislike(id: i64) -> Self {
        Self {
            kind: ActionKind::Dislike,
            target: Some(id),
            post: None,
        }
    }

    pub fn remove(id: i64) -> Self {
        Self {
            kind: ActionKind::Remove,
            target: Some(id),
            post: None,
        }
    }

    pub fn save(post: FeedEntry) -> Self {
        Self {
            kind: ActionKind::Save,
            target: Some(post.id),
            post: Some(post),
        }
    }
}
