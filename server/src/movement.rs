//! Manual joystick control and its hand-off with auto-navigation.

use crate::entity::{Actor, AnimatorBlend};
use crate::navigation::{AutoNavigator, NavSurface};
use crate::physics::Vector3;
use crate::utils::clamp_axis;
use log::debug;
use shared::JOYSTICK_DEADZONE_SQ;

/// Maps raw joystick axes to animator blend values.
///
/// Screen Y grows downwards, so pushing the stick up (negative `dy`) walks
/// forward.
pub fn joystick_blend(dx: f32, dy: f32) -> AnimatorBlend {
    AnimatorBlend {
        x: clamp_axis(dx),
        y: -clamp_axis(dy),
    }
}

pub fn is_active_input(blend: AnimatorBlend) -> bool {
    blend.x * blend.x + blend.y * blend.y > JOYSTICK_DEADZONE_SQ
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    /// Auto-navigation was running and got stopped by this input.
    pub preempted: bool,
    /// The input became the new manual vector.
    pub applied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualControl {
    pub move_speed: f32,
    input: AnimatorBlend,
}

impl ManualControl {
    pub fn new(move_speed: f32) -> Self {
        ManualControl {
            move_speed,
            input: AnimatorBlend::default(),
        }
    }

    pub fn input(&self) -> AnimatorBlend {
        self.input
    }

    pub fn is_active(&self) -> bool {
        is_active_input(self.input)
    }

    pub fn release(&mut self) {
        self.input = AnimatorBlend::default();
    }

    /// Applies one joystick sample.
    ///
    /// Input outside the deadzone always stops auto-navigation first. Every
    /// sample is recorded as the manual vector, so a release that arrives
    /// while navigating still takes effect once navigation ends; the animator
    /// is only touched when navigation is not running.
    pub fn apply(
        &mut self,
        navigator: &mut AutoNavigator,
        actor: &mut Actor,
        dx: f32,
        dy: f32,
    ) -> MoveOutcome {
        let blend = joystick_blend(dx, dy);
        let preempted = is_active_input(blend) && navigator.preempt(actor);
        self.input = blend;

        if navigator.is_navigating() {
            return MoveOutcome {
                preempted,
                applied: false,
            };
        }

        actor.blend = blend;
        MoveOutcome {
            preempted,
            applied: true,
        }
    }

    /// Moves the actor by the current input in its local frame.
    pub fn step(&self, actor: &mut Actor, surface: &dyn NavSurface, dt: f32) {
        if actor.body.kinematic {
            return;
        }

        // Stick noise inside the deadzone counts as released
        let input = if self.is_active() {
            self.input
        } else {
            AnimatorBlend::default()
        };
        actor.blend = input;
        let local = Vector3::new(input.x, 0.0, input.y).scale(self.move_speed);
        actor.body.velocity = local.to_world(actor.yaw);

        if actor.body.velocity.sqr_magnitude() == 0.0 {
            return;
        }

        let next = actor.body.integrate(actor.position, dt);
        if surface.is_walkable(next) {
            actor.position = next;
        } else {
            debug!(
                "Blocked manual move to ({:.2}, {:.2}) outside the walkable area",
                next.x, next.z
            );
            actor.body.velocity = Vector3::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{NavSettings, NavigationState, WalkableArea};
    use assert_approx_eq::assert_approx_eq;

    fn area() -> WalkableArea {
        WalkableArea::new(Vector3::new(-10.0, 0.0, -10.0), Vector3::new(10.0, 0.0, 10.0))
    }

    #[test]
    fn test_blend_is_clamped() {
        let samples = [
            (0.0, 0.0),
            (5.0, -5.0),
            (-0.3, 0.7),
            (f32::NAN, f32::INFINITY),
            (-1e9, 1e9),
        ];
        for (dx, dy) in samples {
            let blend = joystick_blend(dx, dy);
            assert!((-1.0..=1.0).contains(&blend.x));
            assert!((-1.0..=1.0).contains(&blend.y));
        }

        assert_eq!(joystick_blend(0.0, 0.0), AnimatorBlend::default());
        let blend = joystick_blend(0.5, -0.25);
        assert_approx_eq!(blend.x, 0.5);
        assert_approx_eq!(blend.y, 0.25);
    }

    #[test]
    fn test_deadzone() {
        assert!(!is_active_input(joystick_blend(0.005, 0.005)));
        assert!(is_active_input(joystick_blend(0.02, 0.0)));
    }

    #[test]
    fn test_manual_input_preempts_navigation() {
        let surface = area();
        let mut navigator = AutoNavigator::new(NavSettings::default());
        let mut actor = Actor::at(Vector3::ZERO);
        let mut manual = ManualControl::new(4.0);

        navigator
            .navigate_to(Vector3::new(5.0, 0.0, 5.0), &mut actor, &surface)
            .unwrap();
        assert!(navigator.is_navigating());

        let outcome = manual.apply(&mut navigator, &mut actor, 0.0, -1.0);
        assert!(outcome.preempted);
        assert!(outcome.applied);
        assert_eq!(navigator.state(), NavigationState::Idle);
        assert!(!actor.body.kinematic);
        assert_approx_eq!(actor.blend.y, 1.0);
    }

    #[test]
    fn test_zero_input_is_ignored_while_navigating() {
        let surface = area();
        let mut navigator = AutoNavigator::new(NavSettings::default());
        let mut actor = Actor::at(Vector3::ZERO);
        let mut manual = ManualControl::new(4.0);

        navigator
            .navigate_to(Vector3::new(5.0, 0.0, 5.0), &mut actor, &surface)
            .unwrap();

        let outcome = manual.apply(&mut navigator, &mut actor, 0.0, 0.0);
        assert_eq!(outcome, MoveOutcome::default());
        assert!(navigator.is_navigating());
    }

    #[test]
    fn test_release_while_navigating_is_recorded() {
        let surface = area();
        let mut navigator = AutoNavigator::new(NavSettings::default());
        let mut actor = Actor::at(Vector3::ZERO);
        let mut manual = ManualControl::new(4.0);

        manual.apply(&mut navigator, &mut actor, 0.0, -1.0);
        assert!(manual.is_active());
        navigator
            .navigate_to(Vector3::new(5.0, 0.0, 5.0), &mut actor, &surface)
            .unwrap();

        let outcome = manual.apply(&mut navigator, &mut actor, 0.0, 0.0);
        assert!(!outcome.applied);
        assert!(!manual.is_active());
        assert_eq!(manual.input(), AnimatorBlend::default());
    }

    #[test]
    fn test_input_inside_deadzone_keeps_navigating() {
        let surface = area();
        let mut navigator = AutoNavigator::new(NavSettings::default());
        let mut actor = Actor::at(Vector3::ZERO);
        let mut manual = ManualControl::new(4.0);

        navigator
            .navigate_to(Vector3::new(5.0, 0.0, 5.0), &mut actor, &surface)
            .unwrap();

        let outcome = manual.apply(&mut navigator, &mut actor, 0.005, 0.005);
        assert_eq!(outcome, MoveOutcome::default());
        assert!(navigator.is_navigating());
        assert!(actor.body.kinematic);

        // Once navigation ends the tiny vector does not move the avatar
        navigator.stop(&mut actor);
        let before = actor.position;
        manual.step(&mut actor, &surface, 1.0);
        assert_eq!(actor.position, before);
        assert_eq!(actor.blend, AnimatorBlend::default());
    }

    #[test]
    fn test_input_just_outside_deadzone_preempts() {
        let surface = area();
        let mut navigator = AutoNavigator::new(NavSettings::default());
        let mut actor = Actor::at(Vector3::ZERO);
        let mut manual = ManualControl::new(4.0);

        navigator
            .navigate_to(Vector3::new(5.0, 0.0, 5.0), &mut actor, &surface)
            .unwrap();

        let outcome = manual.apply(&mut navigator, &mut actor, 0.02, 0.0);
        assert!(outcome.preempted);
        assert!(outcome.applied);
        assert_eq!(navigator.state(), NavigationState::Idle);
    }

    #[test]
    fn test_step_moves_in_local_frame() {
        let surface = area();
        let mut navigator = AutoNavigator::new(NavSettings::default());
        let mut actor = Actor::at(Vector3::ZERO);
        actor.yaw = std::f32::consts::FRAC_PI_2;
        let mut manual = ManualControl::new(2.0);

        manual.apply(&mut navigator, &mut actor, 0.0, -1.0);
        manual.step(&mut actor, &surface, 0.5);

        // Facing +X, forward input walks along +X.
        assert_approx_eq!(actor.position.x, 1.0, 1e-5);
        assert_approx_eq!(actor.position.z, 0.0, 1e-5);
    }

    #[test]
    fn test_step_stays_on_walkable_area() {
        let surface = area();
        let mut navigator = AutoNavigator::new(NavSettings::default());
        let mut actor = Actor::at(Vector3::new(0.0, 0.0, 9.9));
        let mut manual = ManualControl::new(5.0);

        manual.apply(&mut navigator, &mut actor, 0.0, -1.0);
        manual.step(&mut actor, &surface, 1.0);

        assert_approx_eq!(actor.position.z, 9.9);
        assert_eq!(actor.body.velocity, Vector3::ZERO);
    }

    #[test]
    fn test_step_skips_kinematic_body() {
        let surface = area();
        let mut actor = Actor::at(Vector3::ZERO);
        actor.body.kinematic = true;
        let mut navigator = AutoNavigator::new(NavSettings::default());
        let mut manual = ManualControl::new(5.0);

        manual.apply(&mut navigator, &mut actor, 1.0, 0.0);
        manual.step(&mut actor, &surface, 1.0);
        assert_eq!(actor.position, Vector3::ZERO);
    }
}
