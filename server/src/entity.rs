use crate::config::{AvatarTemplate, ServerConfig};
use crate::movement::{ManualControl, MoveOutcome};
use crate::navigation::{AutoNavigator, NavError, NavSettings, NavSurface, WalkableArea};
use crate::physics::{RigidBody, Vector3};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

pub type EntityId = u32;

// Two-axis animator blend parameters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimatorBlend {
    pub x: f32,
    pub y: f32,
}

// Floating name tag above a player
#[derive(Debug, Clone, PartialEq)]
pub struct NameLabel {
    pub text: String,
    pub offset_y: f32,
}

// The part of an avatar the engine simulates
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub position: Vector3,
    /// Heading about the Y axis in radians, 0 faces +Z.
    pub yaw: f32,
    pub body: RigidBody,
    pub blend: AnimatorBlend,
}

impl Actor {
    pub fn at(position: Vector3) -> Self {
        Actor {
            position,
            yaw: 0.0,
            body: RigidBody::default(),
            blend: AnimatorBlend::default(),
        }
    }
}

// A fragment or artifact model shown above a player
#[derive(Debug, Clone, PartialEq)]
pub struct ModelView {
    pub model: String,
    pub rotation_y_deg: f32,
}

impl ModelView {
    pub fn new(model: impl Into<String>) -> Self {
        ModelView {
            model: model.into(),
            rotation_y_deg: 0.0,
        }
    }

    pub fn set_rotation_radians(&mut self, radians: f32) {
        self.rotation_y_deg = radians.to_degrees();
    }
}

pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub template: String,
    pub actor: Actor,
    pub navigator: AutoNavigator,
    pub manual: ManualControl,
    pub fragment_view: Option<ModelView>,
    pub artifact_view: Option<ModelView>,
    labels: Vec<NameLabel>,
}

impl Entity {
    pub fn new(id: EntityId, template: &AvatarTemplate, position: Vector3, nav: NavSettings, move_speed: f32) -> Self {
        let mut labels = Vec::new();
        if template.baked_label {
            labels.push(NameLabel {
                text: template.name.clone(),
                offset_y: 2.0,
            });
        }

        Entity {
            id,
            name: String::new(),
            template: template.name.clone(),
            actor: Actor::at(position),
            navigator: AutoNavigator::new(nav),
            manual: ManualControl::new(move_speed),
            fragment_view: None,
            artifact_view: None,
            labels,
        }
    }

    pub fn labels(&self) -> &[NameLabel] {
        &self.labels
    }

    pub fn label_text(&self) -> Option<&str> {
        self.labels.first().map(|label| label.text.as_str())
    }

    // Removes every name label, returns how many there were
    pub fn purge_labels(&mut self) -> usize {
        let count = self.labels.len();
        self.labels.clear();
        count
    }

    pub fn attach_label(&mut self, text: &str, offset_y: f32) {
        let purged = self.purge_labels();
        if purged > 0 {
            debug!("Purged {} stale label(s) from entity {}", purged, self.id);
        }
        self.labels.push(NameLabel {
            text: text.to_string(),
            offset_y,
        });
    }

    // Rewrites the label in place, or creates the single label if missing
    pub fn set_label_text(&mut self, text: &str, offset_y: f32) {
        self.labels.truncate(1);
        if let Some(label) = self.labels.first_mut() {
            label.text = text.to_string();
            return;
        }
        self.attach_label(text, offset_y);
    }

    pub fn apply_move(&mut self, dx: f32, dy: f32) -> MoveOutcome {
        self.manual.apply(&mut self.navigator, &mut self.actor, dx, dy)
    }

    /// Starts auto-tracking; the joystick vector held so far is dropped.
    pub fn navigate_to(&mut self, target: Vector3, surface: &dyn NavSurface) -> Result<(), NavError> {
        self.navigator.navigate_to(target, &mut self.actor, surface)?;
        self.manual.release();
        Ok(())
    }

    pub fn stop_navigation(&mut self) {
        self.navigator.stop(&mut self.actor);
    }

    pub fn update(&mut self, dt: f32, surface: &dyn NavSurface) {
        if self.navigator.is_navigating() {
            if self.navigator.update(&mut self.actor, dt) {
                info!("Player {} reached its navigation target", self.id);
            }
        } else {
            self.manual.step(&mut self.actor, surface, dt);
        }
    }
}

// The scene: player entities, named landmarks and the walkable ground
pub struct World {
    entities: HashMap<EntityId, Entity>,
    next_entity_id: EntityId,
    landmarks: BTreeMap<String, Vector3>,
    surface: Box<dyn NavSurface>,
    nav_settings: NavSettings,
    move_speed: f32,
}

impl World {
    pub fn new(surface: Box<dyn NavSurface>, nav_settings: NavSettings, move_speed: f32) -> Self {
        World {
            entities: HashMap::new(),
            next_entity_id: 1,
            landmarks: BTreeMap::new(),
            surface,
            nav_settings,
            move_speed,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let surface = WalkableArea::new(config.walkable_min, config.walkable_max);
        let mut world = World::new(Box::new(surface), config.navigation, config.move_speed);
        for (name, point) in &config.landmarks {
            world.set_landmark(name, *point);
        }
        world
    }

    pub fn spawn(&mut self, template: &AvatarTemplate, position: Vector3) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let entity = Entity::new(id, template, position, self.nav_settings, self.move_speed);
        self.entities.insert(id, entity);
        info!(
            "Spawned entity {} from template {} at ({:.1}, {:.1}, {:.1})",
            id, template.name, position.x, position.y, position.z
        );
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let removed = self.entities.remove(&id).is_some();
        if removed {
            info!("Despawned entity {}", id);
        }
        removed
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn set_landmark(&mut self, name: &str, point: Vector3) {
        self.landmarks.insert(name.to_string(), point);
    }

    pub fn landmark(&self, name: &str) -> Option<Vector3> {
        self.landmarks.get(name).copied()
    }

    pub fn surface(&self) -> &dyn NavSurface {
        self.surface.as_ref()
    }

    pub fn navigate(&mut self, id: EntityId, target: Vector3) -> Result<(), NavError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(NavError::UnknownEntity(id))?;
        entity.navigate_to(target, self.surface.as_ref())
    }

    pub fn apply_move(&mut self, id: EntityId, dx: f32, dy: f32) -> Option<MoveOutcome> {
        self.entities.get_mut(&id).map(|entity| entity.apply_move(dx, dy))
    }

    pub fn tick(&mut self, dt: f32) {
        let surface = self.surface.as_ref();
        for entity in self.entities.values_mut() {
            entity.update(dt, surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::NavigationState;

    fn world() -> World {
        let mut config = ServerConfig::default();
        config.navigation.stopping_distance = 0.5;
        World::from_config(&config)
    }

    #[test]
    fn test_spawn_and_despawn() {
        let mut world = world();
        let a = world.spawn(&AvatarTemplate::new("Scholar"), Vector3::ZERO);
        let b = world.spawn(&AvatarTemplate::new("Curator"), Vector3::ZERO);

        assert_ne!(a, b);
        assert_eq!(world.len(), 2);
        assert_eq!(world.get(a).unwrap().template, "Scholar");

        assert!(world.despawn(a));
        assert!(!world.despawn(a));
        assert!(!world.contains(a));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_label_invariant() {
        let template = AvatarTemplate {
            name: "Explorer".to_string(),
            baked_label: true,
        };
        let mut entity = Entity::new(1, &template, Vector3::ZERO, NavSettings::default(), 4.0);
        assert_eq!(entity.labels().len(), 1);

        entity.attach_label("Player1", 2.0);
        assert_eq!(entity.labels().len(), 1);
        assert_eq!(entity.label_text(), Some("Player1"));

        entity.set_label_text("Alice", 2.0);
        entity.set_label_text("Bob", 2.0);
        assert_eq!(entity.labels().len(), 1);
        assert_eq!(entity.label_text(), Some("Bob"));

        entity.purge_labels();
        entity.set_label_text("Carol", 2.5);
        assert_eq!(
            entity.labels(),
            &[NameLabel {
                text: "Carol".to_string(),
                offset_y: 2.5
            }]
        );
    }

    #[test]
    fn test_model_view_rotation_in_degrees() {
        let mut view = ModelView::new("PlayerFragment_fragment1");
        view.set_rotation_radians(std::f32::consts::PI);
        assert!((view.rotation_y_deg - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_navigate_and_tick_until_arrival() {
        let mut world = world();
        let id = world.spawn(&AvatarTemplate::new("Scholar"), Vector3::ZERO);

        world.navigate(id, Vector3::new(0.0, 0.0, 8.0)).unwrap();
        for _ in 0..300 {
            world.tick(1.0 / 30.0);
        }

        let entity = world.get(id).unwrap();
        assert_eq!(entity.navigator.state(), NavigationState::Idle);
        assert!(entity.actor.position.z > 7.0);
        assert!(!entity.actor.body.kinematic);
    }

    #[test]
    fn test_released_stick_stays_still_after_arrival() {
        let mut world = world();
        let id = world.spawn(&AvatarTemplate::new("Scholar"), Vector3::ZERO);

        world.apply_move(id, 0.0, -1.0).unwrap();
        world.navigate(id, Vector3::new(3.0, 0.0, 0.0)).unwrap();
        let outcome = world.apply_move(id, 0.0, 0.0).unwrap();
        assert!(!outcome.preempted);

        for _ in 0..300 {
            world.tick(1.0 / 30.0);
        }
        assert!(!world.get(id).unwrap().navigator.is_navigating());

        let parked = world.get(id).unwrap().actor.position;
        for _ in 0..30 {
            world.tick(1.0 / 30.0);
        }
        let entity = world.get(id).unwrap();
        assert_eq!(entity.actor.position, parked);
        assert!(!entity.manual.is_active());
    }

    #[test]
    fn test_navigation_drops_held_stick() {
        let mut world = world();
        let id = world.spawn(&AvatarTemplate::new("Scholar"), Vector3::ZERO);

        world.apply_move(id, 1.0, 0.0).unwrap();
        assert!(world.get(id).unwrap().manual.is_active());

        world.navigate(id, Vector3::new(0.0, 0.0, 4.0)).unwrap();
        assert!(!world.get(id).unwrap().manual.is_active());
    }

    #[test]
    fn test_navigate_unknown_entity() {
        let mut world = world();
        assert_eq!(
            world.navigate(42, Vector3::ZERO),
            Err(NavError::UnknownEntity(42))
        );
        assert!(world.apply_move(42, 1.0, 0.0).is_none());
    }

    #[test]
    fn test_landmarks_from_config() {
        let world = world();
        assert!(world.landmark("NPC").is_some());
        assert!(world.landmark("01").is_some());
        assert!(world.landmark("missing").is_none());
    }
}
