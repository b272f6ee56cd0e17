use serde::{Deserialize, Serialize};

///Represents a point or direction in 3D space.
/// Y is up; the walkable ground is the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        self.sqr_magnitude().sqrt()
    }

    ///Returns the squared magnitude of the vector.
    pub fn sqr_magnitude(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    ///Returns the normalized vector.
    pub fn normalize(&self) -> Vector3 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector3::ZERO
        } else {
            self.scale(1.0 / mag)
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vector3 {
        Vector3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn distance(&self, other: &Vector3) -> f32 {
        self.sub(other).magnitude()
    }

    ///Returns the vector projected onto the ground plane.
    pub fn flat(&self) -> Vector3 {
        Vector3 {
            x: self.x,
            y: 0.0,
            z: self.z,
        }
    }

    ///Expresses a world-space direction in the frame of an actor facing `yaw`.
    /// Local x points right, local z points forward.
    pub fn to_local(&self, yaw: f32) -> Vector3 {
        let (sin, cos) = yaw.sin_cos();
        Vector3 {
            x: self.x * cos - self.z * sin,
            y: self.y,
            z: self.x * sin + self.z * cos,
        }
    }

    ///Inverse of [`Vector3::to_local`].
    pub fn to_world(&self, yaw: f32) -> Vector3 {
        let (sin, cos) = yaw.sin_cos();
        Vector3 {
            x: self.x * cos + self.z * sin,
            y: self.y,
            z: -self.x * sin + self.z * cos,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

///Per-axis rotation freeze flags of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationLock {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl RotationLock {
    pub const NONE: RotationLock = RotationLock {
        x: false,
        y: false,
        z: false,
    };
    pub const ALL: RotationLock = RotationLock {
        x: true,
        y: true,
        z: true,
    };
    ///Only turning about the vertical axis is allowed.
    pub const UPRIGHT: RotationLock = RotationLock {
        x: true,
        y: false,
        z: true,
    };
}

///The subset of body state that auto-navigation overrides and later restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodySettings {
    pub kinematic: bool,
    pub rotation_lock: RotationLock,
}

///Represents the rigid body of a player avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    pub kinematic: bool,
    pub velocity: Vector3,
    pub angular_velocity: Vector3,
    pub rotation_lock: RotationLock,
}

impl Default for RigidBody {
    fn default() -> Self {
        RigidBody {
            kinematic: false,
            velocity: Vector3::ZERO,
            angular_velocity: Vector3::ZERO,
            rotation_lock: RotationLock::ALL,
        }
    }
}

impl RigidBody {
    pub fn settings(&self) -> BodySettings {
        BodySettings {
            kinematic: self.kinematic,
            rotation_lock: self.rotation_lock,
        }
    }

    pub fn restore(&mut self, settings: BodySettings) {
        self.kinematic = settings.kinematic;
        self.rotation_lock = settings.rotation_lock;
    }

    ///Takes the body out of the physics simulation so a path follower can
    /// drive it without being pushed around.
    pub fn suspend_for_navigation(&mut self) {
        self.kinematic = true;
        self.velocity = Vector3::ZERO;
        self.angular_velocity = Vector3::ZERO;
        self.rotation_lock = RotationLock::UPRIGHT;
    }

    ///Returns the position after moving with the current velocity.
    /// Kinematic bodies do not move on their own.
    pub fn integrate(&self, position: Vector3, dt: f32) -> Vector3 {
        if self.kinematic {
            position
        } else {
            position.add(&self.velocity.scale(dt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_vector_math() {
        let a = Vector3::new(3.0, 0.0, 4.0);
        assert_approx_eq!(a.magnitude(), 5.0);
        assert_approx_eq!(a.normalize().magnitude(), 1.0);
        assert_eq!(Vector3::ZERO.normalize(), Vector3::ZERO);

        let b = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(a.add(&b), Vector3::new(4.0, 2.0, 7.0));
        assert_eq!(a.sub(&b), Vector3::new(2.0, -2.0, 1.0));
        assert_eq!(b.flat(), Vector3::new(1.0, 0.0, 3.0));
        assert_approx_eq!(a.distance(&Vector3::ZERO), 5.0);
    }

    #[test]
    fn test_local_frame_conversion() {
        let forward = Vector3::new(0.0, 0.0, 1.0);
        let local = forward.to_local(0.0);
        assert_approx_eq!(local.z, 1.0);
        assert_approx_eq!(local.x, 0.0);

        // Facing +X, a world +X velocity is straight ahead.
        let local = Vector3::new(1.0, 0.0, 0.0).to_local(FRAC_PI_2);
        assert_approx_eq!(local.z, 1.0, 1e-5);
        assert_approx_eq!(local.x, 0.0, 1e-5);

        let v = Vector3::new(0.3, 0.0, -0.7);
        let round = v.to_local(1.1).to_world(1.1);
        assert_approx_eq!(round.x, v.x, 1e-5);
        assert_approx_eq!(round.z, v.z, 1e-5);
    }

    #[test]
    fn test_suspend_and_restore() {
        let mut body = RigidBody {
            velocity: Vector3::new(1.0, 0.0, 1.0),
            rotation_lock: RotationLock::NONE,
            ..RigidBody::default()
        };
        let saved = body.settings();

        body.suspend_for_navigation();
        assert!(body.kinematic);
        assert_eq!(body.velocity, Vector3::ZERO);
        assert_eq!(body.rotation_lock, RotationLock::UPRIGHT);

        body.restore(saved);
        assert!(!body.kinematic);
        assert_eq!(body.rotation_lock, RotationLock::NONE);
    }

    #[test]
    fn test_integrate_respects_kinematic() {
        let mut body = RigidBody {
            velocity: Vector3::new(2.0, 0.0, 0.0),
            ..RigidBody::default()
        };
        let moved = body.integrate(Vector3::ZERO, 0.5);
        assert_approx_eq!(moved.x, 1.0);

        body.kinematic = true;
        assert_eq!(body.integrate(Vector3::ZERO, 0.5), Vector3::ZERO);
    }
}
