//! Autonomous path-following for player avatars.
//!
//! The scene engine exposes navigation through two seams: a [`NavSurface`]
//! that knows where the walkable ground is and hands out path followers, and
//! the [`PathFollower`] capability itself. An avatar only carries a follower
//! while it is auto-navigating; [`NavSlot`] attaches one on start and drops
//! it again on stop so nothing lingers to fight manual joystick control.
//!
//! [`AutoNavigator`] is the per-avatar state machine
//! (`Idle <-> AutoNavigating`). It suspends rigid-body physics while a
//! follower drives the avatar and restores the previous body settings
//! afterwards.

use crate::entity::{Actor, AnimatorBlend, EntityId};
use crate::physics::{BodySettings, Vector3};
use crate::utils::lerp;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use thiserror::Error;

/// Tuning for auto-navigation and its animation blend output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavSettings {
    /// Administrative switch; when off every start request fails with `NavError::Disabled`.
    pub enabled: bool,
    /// Cruise speed in units per second.
    pub speed: f32,
    pub acceleration: f32,
    /// Turn rate in degrees per second.
    pub angular_speed: f32,
    pub stopping_distance: f32,
    /// Speed that maps to a full forward blend. Falls back to `speed` when not positive.
    pub anim_max_speed: f32,
    pub x_intensity: f32,
    pub y_intensity: f32,
    /// Live target drift that triggers a repath.
    pub repath_threshold: f32,
    /// Squared speed under which the avatar counts as standing still.
    pub arrival_speed_sq: f32,
    /// Exponential smoothing rate of the blend values, per second.
    pub blend_sharpness: f32,
}

impl Default for NavSettings {
    fn default() -> Self {
        NavSettings {
            enabled: true,
            speed: 6.0,
            acceleration: 20.0,
            angular_speed: 720.0,
            stopping_distance: 15.0,
            anim_max_speed: 6.0,
            x_intensity: 1.0,
            y_intensity: 1.0,
            repath_threshold: 1.0,
            arrival_speed_sq: 0.1,
            blend_sharpness: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    AutoNavigating,
}

#[derive(Debug, Error, PartialEq)]
pub enum NavError {
    #[error("auto-navigation is disabled")]
    Disabled,
    #[error("no navigation target is set")]
    NoTarget,
    #[error("avatar at ({x:.2}, {z:.2}) is not on the walkable surface")]
    OffSurface { x: f32, z: f32 },
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
}

/// Path-following capability provided by the engine.
pub trait PathFollower: Send {
    fn configure(&mut self, settings: &NavSettings);
    /// Plans a path from `from` to `point`. Returns false when no path could be set.
    fn set_destination(&mut self, from: Vector3, point: Vector3) -> bool;
    fn destination(&self) -> Option<Vector3>;
    fn has_path(&self) -> bool;
    fn remaining_distance(&self, from: Vector3) -> f32;
    fn stopping_distance(&self) -> f32;
    fn velocity(&self) -> Vector3;
    fn set_stopped(&mut self, stopped: bool);
    fn reset_path(&mut self);
    /// Moves along the current path, returning the new position and heading.
    fn advance(&mut self, position: Vector3, yaw: f32, dt: f32) -> (Vector3, f32);
}

/// The walkable ground of the scene.
pub trait NavSurface: Send {
    fn is_walkable(&self, point: Vector3) -> bool;
    fn create_follower(&self) -> Box<dyn PathFollower>;
}

/// Axis-aligned walkable rectangle on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkableArea {
    pub min: Vector3,
    pub max: Vector3,
}

impl WalkableArea {
    pub fn new(min: Vector3, max: Vector3) -> Self {
        WalkableArea {
            min: Vector3::new(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
            max: Vector3::new(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
        }
    }
}

impl NavSurface for WalkableArea {
    fn is_walkable(&self, point: Vector3) -> bool {
        point.is_finite()
            && (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.z..=self.max.z).contains(&point.z)
    }

    fn create_follower(&self) -> Box<dyn PathFollower> {
        Box::new(DirectFollower::default())
    }
}

/// Straight-line follower with acceleration, braking and a turn-rate limit.
#[derive(Debug, Clone, Default)]
pub struct DirectFollower {
    settings: NavSettings,
    destination: Option<Vector3>,
    velocity: Vector3,
    stopped: bool,
}

impl PathFollower for DirectFollower {
    fn configure(&mut self, settings: &NavSettings) {
        self.settings = *settings;
    }

    fn set_destination(&mut self, _from: Vector3, point: Vector3) -> bool {
        if !point.is_finite() {
            return false;
        }
        self.destination = Some(point);
        true
    }

    fn destination(&self) -> Option<Vector3> {
        self.destination
    }

    fn has_path(&self) -> bool {
        self.destination.is_some()
    }

    fn remaining_distance(&self, from: Vector3) -> f32 {
        self.destination
            .map(|dest| dest.sub(&from).flat().magnitude())
            .unwrap_or(0.0)
    }

    fn stopping_distance(&self) -> f32 {
        self.settings.stopping_distance
    }

    fn velocity(&self) -> Vector3 {
        self.velocity
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    fn reset_path(&mut self) {
        self.destination = None;
        self.velocity = Vector3::ZERO;
    }

    fn advance(&mut self, position: Vector3, yaw: f32, dt: f32) -> (Vector3, f32) {
        let remaining = self.remaining_distance(position);
        let desired = match self.destination {
            Some(dest) if !self.stopped && remaining > self.settings.stopping_distance => dest
                .sub(&position)
                .flat()
                .normalize()
                .scale(self.settings.speed),
            _ => Vector3::ZERO,
        };

        let change = desired.sub(&self.velocity);
        let max_change = self.settings.acceleration * dt;
        self.velocity = if change.magnitude() > max_change {
            self.velocity.add(&change.normalize().scale(max_change))
        } else {
            desired
        };

        let step = self.velocity.scale(dt);
        let next = match self.destination {
            // Never step past the destination.
            Some(dest) if step.magnitude() >= remaining => {
                self.velocity = Vector3::ZERO;
                Vector3::new(dest.x, position.y, dest.z)
            }
            _ => position.add(&step),
        };

        (next, self.turn_towards_velocity(yaw, dt))
    }
}

impl DirectFollower {
    fn turn_towards_velocity(&self, yaw: f32, dt: f32) -> f32 {
        let heading = self.velocity.flat();
        if heading.sqr_magnitude() < 1e-6 {
            return yaw;
        }
        let desired = heading.x.atan2(heading.z);
        let mut delta = (desired - yaw) % (2.0 * PI);
        if delta > PI {
            delta -= 2.0 * PI;
        } else if delta < -PI {
            delta += 2.0 * PI;
        }
        let max_turn = self.settings.angular_speed.to_radians() * dt;
        yaw + delta.clamp(-max_turn, max_turn)
    }
}

/// Holds the follower of one avatar while it auto-navigates.
#[derive(Default)]
pub struct NavSlot {
    follower: Option<Box<dyn PathFollower>>,
}

impl NavSlot {
    /// Attaches a follower from `surface`, or reconfigures the attached one.
    pub fn attach(
        &mut self,
        surface: &dyn NavSurface,
        settings: &NavSettings,
    ) -> &mut (dyn PathFollower + 'static) {
        let follower = self
            .follower
            .get_or_insert_with(|| surface.create_follower());
        follower.configure(settings);
        follower.as_mut()
    }

    pub fn detach(&mut self) {
        self.follower = None;
    }

    pub fn is_active(&self) -> bool {
        self.follower.is_some()
    }

    pub fn follower(&self) -> Option<&(dyn PathFollower + 'static)> {
        self.follower.as_deref()
    }

    pub fn follower_mut(&mut self) -> Option<&mut (dyn PathFollower + 'static)> {
        self.follower.as_deref_mut()
    }
}

/// Per-avatar auto-navigation state machine.
pub struct AutoNavigator {
    enabled: bool,
    state: NavigationState,
    target: Option<Vector3>,
    saved_body: Option<BodySettings>,
    blend: AnimatorBlend,
    slot: NavSlot,
    settings: NavSettings,
}

impl AutoNavigator {
    pub fn new(settings: NavSettings) -> Self {
        AutoNavigator {
            enabled: settings.enabled,
            state: NavigationState::Idle,
            target: None,
            saved_body: None,
            blend: AnimatorBlend::default(),
            slot: NavSlot::default(),
            settings,
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn is_navigating(&self) -> bool {
        self.state == NavigationState::AutoNavigating
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Administrative switch; only gates new starts.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn settings(&self) -> &NavSettings {
        &self.settings
    }

    pub fn target(&self) -> Option<Vector3> {
        self.target
    }

    /// Updates the live target. A running navigation repaths on its next update.
    pub fn set_target(&mut self, target: Option<Vector3>) {
        self.target = target;
    }

    pub fn has_follower(&self) -> bool {
        self.slot.is_active()
    }

    pub fn follower_destination(&self) -> Option<Vector3> {
        self.slot.follower().and_then(|f| f.destination())
    }

    pub fn navigate_to(
        &mut self,
        target: Vector3,
        actor: &mut Actor,
        surface: &dyn NavSurface,
    ) -> Result<(), NavError> {
        self.target = Some(target);
        self.start(actor, surface)
    }

    pub fn start(&mut self, actor: &mut Actor, surface: &dyn NavSurface) -> Result<(), NavError> {
        if !self.enabled {
            warn!("Auto-navigation is disabled, ignoring start request");
            return Err(NavError::Disabled);
        }

        let Some(target) = self.target else {
            return Err(NavError::NoTarget);
        };

        if !surface.is_walkable(actor.position) {
            return Err(NavError::OffSurface {
                x: actor.position.x,
                z: actor.position.z,
            });
        }

        if !surface.is_walkable(target) {
            warn!(
                "Navigation target ({:.2}, {:.2}) is off the walkable surface",
                target.x, target.z
            );
        }

        // Re-targeting while already navigating must keep the settings
        // captured before the first start.
        if !self.is_navigating() {
            self.saved_body = Some(actor.body.settings());
        }
        actor.body.suspend_for_navigation();

        let follower = self.slot.attach(surface, &self.settings);
        if !follower.set_destination(actor.position, target) {
            warn!(
                "Could not set a path to ({:.2}, {:.2})",
                target.x, target.z
            );
        }
        follower.set_stopped(false);

        self.state = NavigationState::AutoNavigating;
        self.blend = AnimatorBlend::default();
        info!(
            "Auto-navigation started towards ({:.2}, {:.2}, {:.2})",
            target.x, target.y, target.z
        );
        Ok(())
    }

    /// Advances one frame. Returns true when the avatar arrived this frame.
    pub fn update(&mut self, actor: &mut Actor, dt: f32) -> bool {
        if !self.is_navigating() {
            return false;
        }

        let Some(target) = self.target else {
            self.stop(actor);
            return false;
        };

        let settings = self.settings;
        let Some(follower) = self.slot.follower_mut() else {
            warn!("Navigator lost its path follower, returning to idle");
            self.stop(actor);
            return false;
        };

        match follower.destination() {
            Some(dest) if follower.has_path() => {
                if dest.distance(&target) > settings.repath_threshold {
                    debug!("Target drifted, repathing");
                    follower.set_destination(actor.position, target);
                }
            }
            _ => {
                follower.set_destination(actor.position, target);
            }
        }

        let (position, yaw) = follower.advance(actor.position, actor.yaw, dt);
        actor.position = position;
        actor.yaw = yaw;

        let velocity = follower.velocity();
        let arrived = follower.has_path()
            && follower.remaining_distance(position) <= follower.stopping_distance()
            && velocity.sqr_magnitude() < settings.arrival_speed_sq;

        self.update_blend(actor, velocity, dt);

        if arrived {
            info!("Auto-navigation reached its destination");
            self.stop(actor);
        }
        arrived
    }

    pub fn stop(&mut self, actor: &mut Actor) {
        if let Some(follower) = self.slot.follower_mut() {
            follower.reset_path();
            follower.set_stopped(true);
        }

        let was_navigating = self.is_navigating();
        self.state = NavigationState::Idle;

        if let Some(saved) = self.saved_body.take() {
            actor.body.restore(saved);
        }
        self.blend = AnimatorBlend::default();
        actor.blend = AnimatorBlend::default();
        self.slot.detach();

        if was_navigating {
            info!("Auto-navigation stopped");
        }
    }

    /// Stops navigation in favour of manual control. Returns true if it was running.
    pub fn preempt(&mut self, actor: &mut Actor) -> bool {
        if !self.is_navigating() {
            return false;
        }
        info!("Manual input detected, handing control back to the joystick");
        self.stop(actor);
        true
    }

    fn update_blend(&mut self, actor: &mut Actor, velocity: Vector3, dt: f32) {
        let target = blend_target(&self.settings, velocity.to_local(actor.yaw));
        let t = (dt * self.settings.blend_sharpness).clamp(0.0, 1.0);

        self.blend = AnimatorBlend {
            x: lerp(self.blend.x, target.x, t),
            y: lerp(self.blend.y, target.y, t),
        };
        actor.blend = self.blend;
    }
}

/// Raw blend values for a local-space velocity.
///
/// Only the forward axis is normalized by the animation max speed so the
/// blend tree can reach its run range; strafe is scaled by intensity alone.
pub fn blend_target(settings: &NavSettings, local: Vector3) -> AnimatorBlend {
    let max_speed = if settings.anim_max_speed > 0.0 {
        settings.anim_max_speed
    } else {
        settings.speed
    }
    .max(0.1);

    AnimatorBlend {
        x: (local.x * settings.x_intensity).clamp(-1.0, 1.0),
        y: (local.z / max_speed * settings.y_intensity).clamp(-1.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RotationLock;
    use assert_approx_eq::assert_approx_eq;

    const DT: f32 = 1.0 / 30.0;

    fn area() -> WalkableArea {
        WalkableArea::new(Vector3::new(-50.0, 0.0, -50.0), Vector3::new(50.0, 0.0, 50.0))
    }

    fn settings() -> NavSettings {
        NavSettings {
            stopping_distance: 0.5,
            ..NavSettings::default()
        }
    }

    fn actor_at(x: f32, z: f32) -> Actor {
        Actor::at(Vector3::new(x, 0.0, z))
    }

    #[test]
    fn test_start_requires_enabled_target_and_surface() {
        let surface = area();
        let mut navigator = AutoNavigator::new(settings());
        let mut actor = actor_at(0.0, 0.0);

        assert_eq!(navigator.start(&mut actor, &surface), Err(NavError::NoTarget));

        navigator.set_enabled(false);
        assert_eq!(
            navigator.navigate_to(Vector3::new(10.0, 0.0, 0.0), &mut actor, &surface),
            Err(NavError::Disabled)
        );

        navigator.set_enabled(true);
        let mut stranded = actor_at(80.0, 0.0);
        assert!(matches!(
            navigator.start(&mut stranded, &surface),
            Err(NavError::OffSurface { .. })
        ));

        assert_eq!(navigator.state(), NavigationState::Idle);
        assert!(!navigator.has_follower());
        assert!(!actor.body.kinematic);
    }

    #[test]
    fn test_start_suspends_physics() {
        let surface = area();
        let mut navigator = AutoNavigator::new(settings());
        let mut actor = actor_at(0.0, 0.0);
        actor.body.velocity = Vector3::new(3.0, 0.0, 0.0);

        navigator
            .navigate_to(Vector3::new(10.0, 0.0, 0.0), &mut actor, &surface)
            .unwrap();

        assert!(navigator.is_navigating());
        assert!(navigator.has_follower());
        assert!(actor.body.kinematic);
        assert_eq!(actor.body.velocity, Vector3::ZERO);
        assert_eq!(actor.body.rotation_lock, RotationLock::UPRIGHT);
    }

    #[test]
    fn test_navigation_arrives_and_restores_body() {
        let surface = area();
        let mut navigator = AutoNavigator::new(settings());
        let mut actor = actor_at(0.0, 0.0);
        let original = actor.body.settings();
        let target = Vector3::new(12.0, 0.0, 5.0);

        navigator.navigate_to(target, &mut actor, &surface).unwrap();

        let mut arrived = false;
        for _ in 0..600 {
            if navigator.update(&mut actor, DT) {
                arrived = true;
                break;
            }
        }

        assert!(arrived, "avatar never arrived");
        assert_eq!(navigator.state(), NavigationState::Idle);
        assert!(!navigator.has_follower());
        assert!(actor.position.distance(&target) <= 1.5);
        assert_eq!(actor.body.settings(), original);
        assert_eq!(actor.blend, AnimatorBlend::default());
    }

    #[test]
    fn test_blend_is_smoothed_not_instant() {
        let surface = area();
        let mut navigator = AutoNavigator::new(settings());
        let mut actor = actor_at(0.0, 0.0);

        navigator
            .navigate_to(Vector3::new(0.0, 0.0, 30.0), &mut actor, &surface)
            .unwrap();
        navigator.update(&mut actor, DT);

        let raw_forward = navigator.slot.follower().unwrap().velocity().z / 6.0;
        assert!(actor.blend.y > 0.0);
        assert!(actor.blend.y < raw_forward);

        for _ in 0..60 {
            navigator.update(&mut actor, DT);
        }
        assert!(actor.blend.y > 0.9);
        assert!(actor.blend.x.abs() < 0.1);
    }

    #[test]
    fn test_blend_target_normalizes_forward_only() {
        let s = NavSettings {
            anim_max_speed: 4.0,
            x_intensity: 0.5,
            ..NavSettings::default()
        };

        let target = blend_target(&s, Vector3::new(1.2, 0.0, 2.0));
        assert_approx_eq!(target.x, 0.6);
        assert_approx_eq!(target.y, 0.5);

        let fast = blend_target(&s, Vector3::new(-5.0, 0.0, 40.0));
        assert_approx_eq!(fast.x, -1.0);
        assert_approx_eq!(fast.y, 1.0);
    }

    #[test]
    fn test_disabled_in_settings() {
        let surface = area();
        let mut navigator = AutoNavigator::new(NavSettings {
            enabled: false,
            ..settings()
        });
        let mut actor = actor_at(0.0, 0.0);

        assert!(!navigator.is_enabled());
        assert_eq!(
            navigator.navigate_to(Vector3::new(10.0, 0.0, 0.0), &mut actor, &surface),
            Err(NavError::Disabled)
        );
        assert!(!navigator.is_navigating());
    }

    #[test]
    fn test_restart_keeps_original_body_settings() {
        let surface = area();
        let mut navigator = AutoNavigator::new(settings());
        let mut actor = actor_at(0.0, 0.0);
        actor.body.rotation_lock = RotationLock::NONE;

        navigator
            .navigate_to(Vector3::new(10.0, 0.0, 0.0), &mut actor, &surface)
            .unwrap();
        navigator
            .navigate_to(Vector3::new(-10.0, 0.0, 0.0), &mut actor, &surface)
            .unwrap();
        navigator.stop(&mut actor);

        assert!(!actor.body.kinematic);
        assert_eq!(actor.body.rotation_lock, RotationLock::NONE);
    }

    #[test]
    fn test_repaths_when_target_drifts() {
        let surface = area();
        let mut navigator = AutoNavigator::new(settings());
        let mut actor = actor_at(0.0, 0.0);

        navigator
            .navigate_to(Vector3::new(20.0, 0.0, 0.0), &mut actor, &surface)
            .unwrap();
        navigator.update(&mut actor, DT);

        navigator.set_target(Some(Vector3::new(20.0, 0.0, 0.5)));
        navigator.update(&mut actor, DT);
        assert_eq!(
            navigator.follower_destination(),
            Some(Vector3::new(20.0, 0.0, 0.0))
        );

        navigator.set_target(Some(Vector3::new(20.0, 0.0, 10.0)));
        navigator.update(&mut actor, DT);
        assert_eq!(
            navigator.follower_destination(),
            Some(Vector3::new(20.0, 0.0, 10.0))
        );
    }

    #[test]
    fn test_preempt_only_when_navigating() {
        let surface = area();
        let mut navigator = AutoNavigator::new(settings());
        let mut actor = actor_at(0.0, 0.0);

        assert!(!navigator.preempt(&mut actor));

        navigator
            .navigate_to(Vector3::new(10.0, 0.0, 0.0), &mut actor, &surface)
            .unwrap();
        assert!(navigator.preempt(&mut actor));
        assert_eq!(navigator.state(), NavigationState::Idle);
        assert!(!navigator.has_follower());
    }

    #[test]
    fn test_direct_follower_turn_rate_is_limited() {
        let mut follower = DirectFollower::default();
        follower.configure(&NavSettings {
            angular_speed: 90.0,
            stopping_distance: 0.0,
            ..NavSettings::default()
        });
        follower.set_destination(Vector3::ZERO, Vector3::new(10.0, 0.0, 0.0));

        let (_, yaw) = follower.advance(Vector3::ZERO, 0.0, 0.1);
        assert_approx_eq!(yaw, 9.0_f32.to_radians(), 1e-4);
    }

    #[test]
    fn test_walkable_area_bounds() {
        let surface = WalkableArea::new(Vector3::new(5.0, 0.0, 5.0), Vector3::new(-5.0, 0.0, -5.0));
        assert!(surface.is_walkable(Vector3::new(0.0, 3.0, 0.0)));
        assert!(surface.is_walkable(Vector3::new(5.0, 0.0, -5.0)));
        assert!(!surface.is_walkable(Vector3::new(5.1, 0.0, 0.0)));
        assert!(!surface.is_walkable(Vector3::new(f32::NAN, 0.0, 0.0)));
    }
}
