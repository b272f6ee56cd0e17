//! Command handlers, run on the game loop for one session at a time.

use crate::entity::{EntityId, ModelView};
use crate::game::Game;
use crate::registry::SessionId;
use crate::tasks::TrackTarget;
use crate::utils::{fragment_landmark_name, get_timestamp};
use log::{debug, error, info, warn};
use shared::{fragment_index, fragment_label, AckStatus, Command, ServerMessage, TaskStateLabel};

/// Scene name of the restored artifact model.
pub const ARTIFACT_MODEL: &str = "PlayerArtifact";

impl Game {
    /// Applies one decoded command from `session`.
    pub fn handle(&mut self, session: SessionId, command: Command) {
        if let Command::Unknown { raw } = &command {
            debug!("Ignoring unknown message from {}: {}", session, raw);
            return;
        }

        let Some(entity_id) = self.registry.lookup(session) else {
            warn!(
                "{} message from unknown {}, ignoring",
                command.kind(),
                session
            );
            return;
        };

        match command {
            Command::Move { x, y } => self.handle_move(entity_id, x, y),
            Command::ChangeName { name, legacy } => self.handle_change_name(session, name, legacy),
            Command::ConfirmInteraction => self.handle_confirm_interaction(session),
            Command::DialogResult { accepted } => self.handle_dialog_result(session, accepted),
            Command::ViewFragment { fragment_id } => {
                self.handle_view_fragment(session, entity_id, fragment_id)
            }
            Command::CloseFragmentView => self.handle_close_fragment(session, entity_id),
            Command::RotateFragment { angle } => self.handle_rotate_fragment(session, entity_id, angle),
            Command::ViewArtifactRequest => self.handle_view_artifact(session, entity_id),
            Command::RotateArtifact { angle } => self.handle_rotate_artifact(entity_id, angle),
            Command::CloseArtifactView => self.handle_close_artifact(session, entity_id),
            Command::AutoTrack => self.handle_auto_track(session, entity_id),
            Command::TimeWeatherChange { time, weather } => {
                self.handle_time_weather(session, time, weather)
            }
            Command::ModeChange { auto } => self.handle_mode_change(session, auto),
            Command::PuzzleCompleted => self.handle_puzzle_completed(session, entity_id),
            Command::Unknown { .. } => {}
        }
    }

    fn handle_move(&mut self, entity_id: EntityId, x: f32, y: f32) {
        if let Some(outcome) = self.world.apply_move(entity_id, x, y) {
            if outcome.preempted {
                debug!("Joystick took over entity {} from auto-navigation", entity_id);
            }
        }
    }

    fn handle_change_name(&mut self, session: SessionId, name: Option<String>, legacy: bool) {
        let result = match name {
            Some(name) => self.registry.rename(session, &name, &mut self.world),
            None => Err(crate::registry::RegistryError::EmptyName),
        };

        if legacy {
            if let Err(e) = result {
                warn!("Legacy rename from {} rejected: {}", session, e);
            }
            return;
        }

        let reply = match result {
            Ok(name) => ServerMessage::NameChanged {
                status: AckStatus::Success,
                name: Some(name),
                message: None,
            },
            Err(e) => {
                warn!("Rename from {} rejected: {}", session, e);
                ServerMessage::NameChanged {
                    status: AckStatus::Error,
                    name: None,
                    message: Some(e.to_string()),
                }
            }
        };
        self.responder.send_to(session, &reply);
    }

    fn handle_confirm_interaction(&mut self, session: SessionId) {
        let prompt = self.task_state_mut(session).confirm_interaction();
        self.responder.send_to(
            session,
            &ServerMessage::Interaction {
                title: prompt.title,
                content: prompt.content,
            },
        );
    }

    fn handle_dialog_result(&mut self, session: SessionId, accepted: bool) {
        let state = self.task_state_mut(session);
        state.dialog_result(accepted);
        if !accepted {
            info!("{} declined the task", session);
            return;
        }
        if let Some(objective) = state.objective() {
            self.responder
                .send_to(session, &ServerMessage::TaskState { state: objective });
        }
    }

    fn handle_view_fragment(&mut self, session: SessionId, entity_id: EntityId, fragment_id: Option<String>) {
        let label = fragment_id.unwrap_or_default();
        let ack = |status: AckStatus, message: String| ServerMessage::FragmentViewAck {
            fragment_id: label.clone(),
            status,
            message,
            timestamp: get_timestamp(),
        };

        let Some(index) = fragment_index(&label) else {
            warn!("{} asked for invalid fragment id {:?}", session, label);
            self.responder.send_to(
                session,
                &ack(AckStatus::Error, format!("invalid fragment id {:?}", label)),
            );
            return;
        };

        let state = self.task_state_mut(session);
        let newly_collected = match state.collect(index) {
            Ok(newly) => newly,
            Err(e) => {
                warn!("{} fragment request rejected: {}", session, e);
                self.responder
                    .send_to(session, &ack(AckStatus::Error, e.to_string()));
                return;
            }
        };
        let count = state.collected_count();
        let total = state.total();
        let complete = state.is_complete();

        if let Some(entity) = self.world.get_mut(entity_id) {
            entity.fragment_view = Some(ModelView::new(format!("PlayerFragment_{}", label)));
        }

        self.responder.send_to(
            session,
            &ack(AckStatus::Success, format!("Fragment {} is shown", label)),
        );

        if newly_collected {
            info!(
                "{} collected {} ({}/{})",
                session,
                fragment_label(index),
                count,
                total
            );
            self.responder.send_to(
                session,
                &ServerMessage::TreasureFound {
                    count,
                    fragment_index: index,
                    total,
                },
            );
            if complete {
                info!("{} has collected every fragment", session);
            }
        }
    }

    fn handle_close_fragment(&mut self, session: SessionId, entity_id: EntityId) {
        if let Some(entity) = self.world.get_mut(entity_id) {
            entity.fragment_view = None;
        }
        self.responder.send_to(
            session,
            &ServerMessage::FragmentHidden {
                message: "Fragment hidden".to_string(),
            },
        );
    }

    fn handle_rotate_fragment(&mut self, session: SessionId, entity_id: EntityId, angle: Option<f32>) {
        let view = self
            .world
            .get_mut(entity_id)
            .and_then(|entity| entity.fragment_view.as_mut());

        let status = match (angle, view) {
            (Some(angle), Some(view)) => {
                view.set_rotation_radians(angle);
                AckStatus::Success
            }
            (None, _) => {
                warn!("{} sent a fragment rotation without an angle", session);
                AckStatus::Error
            }
            (Some(_), None) => {
                warn!("{} rotated a fragment while none is shown", session);
                AckStatus::Error
            }
        };

        self.responder.send_to(
            session,
            &ServerMessage::FragmentControlAck {
                rotation_y: angle.unwrap_or(0.0),
                status,
                timestamp: get_timestamp(),
            },
        );
    }

    fn handle_view_artifact(&mut self, session: SessionId, entity_id: EntityId) {
        let reply = match self.task_state_mut(session).check_artifact_unlocked() {
            Ok(()) => {
                if let Some(entity) = self.world.get_mut(entity_id) {
                    let view = entity
                        .artifact_view
                        .get_or_insert_with(|| ModelView::new(ARTIFACT_MODEL));
                    view.rotation_y_deg = 0.0;
                }
                info!("Showing the artifact to {}", session);
                ServerMessage::PuzzleCompletedAck {
                    status: AckStatus::Success,
                    message: "Artifact shown".to_string(),
                }
            }
            Err(e) => {
                warn!("{} asked to view the artifact: {}", session, e);
                ServerMessage::PuzzleCompletedAck {
                    status: AckStatus::Error,
                    message: e.to_string(),
                }
            }
        };
        self.responder.send_to(session, &reply);
    }

    fn handle_rotate_artifact(&mut self, entity_id: EntityId, angle: Option<f32>) {
        let Some(angle) = angle else {
            debug!("Artifact rotation without an angle for entity {}", entity_id);
            return;
        };
        match self
            .world
            .get_mut(entity_id)
            .and_then(|entity| entity.artifact_view.as_mut())
        {
            Some(view) => view.set_rotation_radians(angle),
            None => debug!("Entity {} has no artifact to rotate", entity_id),
        }
    }

    fn handle_close_artifact(&mut self, session: SessionId, entity_id: EntityId) {
        if let Some(entity) = self.world.get_mut(entity_id) {
            entity.artifact_view = None;
        }
        self.responder.send_to(
            session,
            &ServerMessage::ArtifactHidden {
                message: "Artifact hidden".to_string(),
            },
        );
    }

    fn handle_auto_track(&mut self, session: SessionId, entity_id: EntityId) {
        let target = self.task_state_mut(session).track_target();

        let (label, point) = match target {
            TrackTarget::Npc | TrackTarget::ReturnToNpc => (
                self.config.npc_landmark.clone(),
                self.world.landmark(&self.config.npc_landmark),
            ),
            TrackTarget::Fragment(index) => (
                fragment_label(index),
                self.config
                    .fragment_locations
                    .get(&index)
                    .copied()
                    .or_else(|| self.world.landmark(&fragment_landmark_name(index))),
            ),
        };

        if target == TrackTarget::ReturnToNpc {
            self.responder.send_to(
                session,
                &ServerMessage::TaskState {
                    state: TaskStateLabel::ReturnToNpc,
                },
            );
        }

        let Some(point) = point else {
            error!("No location configured for auto-track target {}", label);
            self.responder.send_to(
                session,
                &ServerMessage::AutoTrackAck {
                    status: AckStatus::Error,
                    target: label.clone(),
                    message: format!("no location for {}", label),
                },
            );
            return;
        };

        let reply = match self.world.navigate(entity_id, point) {
            Ok(()) => {
                info!("{} auto-tracking to {}", session, label);
                ServerMessage::AutoTrackAck {
                    status: AckStatus::Success,
                    target: label.clone(),
                    message: format!("navigating to {}", label),
                }
            }
            Err(e) => {
                warn!("{} could not auto-track to {}: {}", session, label, e);
                ServerMessage::AutoTrackAck {
                    status: AckStatus::Error,
                    target: label,
                    message: e.to_string(),
                }
            }
        };
        self.responder.send_to(session, &reply);
    }

    fn handle_time_weather(&mut self, session: SessionId, time: String, weather: String) {
        let valid = self.environment.set_from_mobile(&time, &weather);
        self.responder.send_to(
            session,
            &ServerMessage::TimeWeatherAck {
                status: AckStatus::from_ok(valid),
                time,
                weather,
            },
        );
        self.responder.broadcast(&self.environment.snapshot());
    }

    fn handle_mode_change(&mut self, session: SessionId, auto: bool) {
        self.environment.enable_auto(auto);
        self.responder.send_to(
            session,
            &ServerMessage::ModeAck {
                mode: self.environment.mode().as_str().to_string(),
                status: AckStatus::Success,
            },
        );
        self.responder.broadcast(&self.environment.snapshot());
    }

    fn handle_puzzle_completed(&mut self, session: SessionId, entity_id: EntityId) {
        let reply = match self.task_state_mut(session).complete_puzzle() {
            Ok(()) => {
                if let Some(entity) = self.world.get_mut(entity_id) {
                    entity.fragment_view = None;
                    entity.artifact_view = Some(ModelView::new(ARTIFACT_MODEL));
                }
                info!("{} solved the puzzle", session);
                ServerMessage::PuzzleCompletedAck {
                    status: AckStatus::Success,
                    message: "Puzzle solved, the artifact is shown".to_string(),
                }
            }
            Err(e) => {
                warn!("{} puzzle completion rejected: {}", session, e);
                ServerMessage::PuzzleCompletedAck {
                    status: AckStatus::Error,
                    message: e.to_string(),
                }
            }
        };
        self.responder.send_to(session, &reply);
    }
}
