//! Per-player quest progress: talk to the guide, collect the fragments,
//! solve the puzzle.

use log::debug;
use shared::TaskStateLabel;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    NotStarted,
    /// The guide offered the task and the phone shows the dialog.
    AwaitingDialog,
    TaskStarted,
    FragmentsComplete,
    /// Puzzle solved, the artifact is unlocked.
    Resolved,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("fragment {index} does not exist, valid fragments are 0..{total}")]
    FragmentOutOfRange { index: usize, total: usize },
    #[error("the puzzle unlocks after all {total} fragments are found ({collected} so far)")]
    PuzzleLocked { collected: usize, total: usize },
    #[error("the puzzle is already solved")]
    AlreadyResolved,
    #[error("the artifact is still locked")]
    ArtifactLocked,
}

/// Where auto-tracking should send the player next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackTarget {
    Npc,
    Fragment(usize),
    /// Everything is collected, head back to the guide.
    ReturnToNpc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionPrompt {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTaskState {
    total: usize,
    dialog_pending: bool,
    task_started: bool,
    collected: BTreeSet<usize>,
    resolved: bool,
}

impl PlayerTaskState {
    pub fn new(total: usize) -> Self {
        PlayerTaskState {
            total,
            dialog_pending: false,
            task_started: false,
            collected: BTreeSet::new(),
            resolved: false,
        }
    }

    pub fn phase(&self) -> TaskPhase {
        if self.resolved {
            TaskPhase::Resolved
        } else if self.is_complete() {
            TaskPhase::FragmentsComplete
        } else if self.task_started {
            TaskPhase::TaskStarted
        } else if self.dialog_pending {
            TaskPhase::AwaitingDialog
        } else {
            TaskPhase::NotStarted
        }
    }

    pub fn is_task_started(&self) -> bool {
        self.task_started
    }

    pub fn is_complete(&self) -> bool {
        self.collected.len() == self.total
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn collected_count(&self) -> usize {
        self.collected.len()
    }

    pub fn collected(&self) -> impl Iterator<Item = usize> + '_ {
        self.collected.iter().copied()
    }

    pub fn has_collected(&self, index: usize) -> bool {
        self.collected.contains(&index)
    }

    /// The guide's response to the player walking up and tapping "talk".
    pub fn confirm_interaction(&mut self) -> InteractionPrompt {
        let (title, content) = match self.phase() {
            TaskPhase::NotStarted | TaskPhase::AwaitingDialog => {
                self.dialog_pending = true;
                (
                    "Museum Guide",
                    format!(
                        "The artifact shattered into {} fragments hidden around the hall. Will you help me find them?",
                        self.total
                    ),
                )
            }
            TaskPhase::TaskStarted => (
                "Museum Guide",
                format!(
                    "You have found {} of {} fragments. Keep searching!",
                    self.collected.len(),
                    self.total
                ),
            ),
            TaskPhase::FragmentsComplete => (
                "Museum Guide",
                "You found every fragment! Solve the puzzle to restore the artifact.".to_string(),
            ),
            TaskPhase::Resolved => (
                "Museum Guide",
                "Thank you for restoring the artifact. Take another look any time.".to_string(),
            ),
        };

        InteractionPrompt {
            title: title.to_string(),
            content,
        }
    }

    /// Applies the player's answer to the task dialog.
    pub fn dialog_result(&mut self, accepted: bool) {
        self.dialog_pending = false;
        if accepted && !self.task_started {
            debug!("Task accepted");
            self.task_started = true;
        }
    }

    /// Objective to show on the phone, if any.
    pub fn objective(&self) -> Option<TaskStateLabel> {
        match self.phase() {
            TaskPhase::TaskStarted => Some(TaskStateLabel::CollectFragments),
            TaskPhase::FragmentsComplete => Some(TaskStateLabel::ReturnToNpc),
            _ => None,
        }
    }

    /// Records a fragment. Returns true if it was not collected before.
    pub fn collect(&mut self, index: usize) -> Result<bool, TaskError> {
        if index >= self.total {
            return Err(TaskError::FragmentOutOfRange {
                index,
                total: self.total,
            });
        }
        self.task_started = true;
        self.dialog_pending = false;
        Ok(self.collected.insert(index))
    }

    pub fn complete_puzzle(&mut self) -> Result<(), TaskError> {
        match self.phase() {
            TaskPhase::FragmentsComplete => {
                self.resolved = true;
                Ok(())
            }
            TaskPhase::Resolved => Err(TaskError::AlreadyResolved),
            _ => Err(TaskError::PuzzleLocked {
                collected: self.collected.len(),
                total: self.total,
            }),
        }
    }

    pub fn check_artifact_unlocked(&self) -> Result<(), TaskError> {
        if self.resolved {
            Ok(())
        } else {
            Err(TaskError::ArtifactLocked)
        }
    }

    pub fn next_uncollected(&self) -> Option<usize> {
        (0..self.total).find(|index| !self.collected.contains(index))
    }

    pub fn track_target(&self) -> TrackTarget {
        match self.phase() {
            TaskPhase::NotStarted | TaskPhase::AwaitingDialog => TrackTarget::Npc,
            TaskPhase::TaskStarted => match self.next_uncollected() {
                Some(index) => TrackTarget::Fragment(index),
                None => TrackTarget::ReturnToNpc,
            },
            TaskPhase::FragmentsComplete => TrackTarget::ReturnToNpc,
            // Nothing left to hand in, the guide is just a place to walk to
            TaskPhase::Resolved => TrackTarget::Npc,
        }
    }
}
