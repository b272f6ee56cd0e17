use crate::config::ServerConfig;
use crate::dispatch::MainThreadQueue;
use crate::entity::World;
use crate::registry::{SessionId, SessionRegistry};
use crate::responder::Responder;
use crate::tasks::PlayerTaskState;
use crate::weather::Environment;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

/// Everything the game loop owns. Only drained actions and the tick touch it.
pub struct Game {
    pub(crate) config: ServerConfig,
    pub(crate) world: World,
    pub(crate) registry: SessionRegistry,
    pub(crate) tasks: HashMap<SessionId, PlayerTaskState>,
    pub(crate) environment: Environment,
    pub(crate) responder: Responder,
    tick: u64,
}

impl Game {
    pub fn new(config: ServerConfig, responder: Responder) -> Self {
        Game {
            world: World::from_config(&config),
            registry: SessionRegistry::from_config(&config),
            tasks: HashMap::new(),
            environment: Environment::new(config.auto_weather_interval_secs)
                .with_realtime(config.realtime_weather.clone()),
            responder,
            tick: 0,
            config,
        }
    }

    pub fn on_connect(&mut self, session: SessionId) {
        match self.registry.on_connect(session, &mut self.world) {
            Ok(entity_id) => {
                debug!("{} bound to entity {}", session, entity_id);
                self.responder.send_to(session, &self.environment.snapshot());
            }
            Err(e) => error!("Could not create a player for {}: {}", session, e),
        }
    }

    pub fn on_disconnect(&mut self, session: SessionId) {
        self.tasks.remove(&session);
        if !self.registry.on_disconnect(session, &mut self.world) {
            debug!("{} closed without a player", session);
        }
    }

    /// Advances the scene by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.tick += 1;
        self.world.tick(dt);
        if self.environment.tick(dt) {
            self.responder.broadcast(&self.environment.snapshot());
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn task_state(&self, session: SessionId) -> Option<&PlayerTaskState> {
        self.tasks.get(&session)
    }

    /// Task state of a session, created on first use.
    pub(crate) fn task_state_mut(&mut self, session: SessionId) -> &mut PlayerTaskState {
        let total = self.config.fragment_count;
        self.tasks
            .entry(session)
            .or_insert_with(|| PlayerTaskState::new(total))
    }
}

/// Runs the game loop: drain queued actions, then advance the world.
pub async fn run_game_loop(mut game: Game, mut queue: MainThreadQueue<Game>) {
    let tick_rate = game.config.tick_rate.max(1);
    let mut interval_timer = interval(Duration::from_secs_f32(1.0 / tick_rate as f32));
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_update = Instant::now();

    // Cap the maximum delta time to 50ms
    let max_delta_time = 1.0 / 20.0;

    info!("Game loop running at {} Hz", tick_rate);

    // Skip the first tick since it fires immediately
    interval_timer.tick().await;

    loop {
        interval_timer.tick().await;

        let current_time = Instant::now();
        let mut delta_time = (current_time - last_update).as_secs_f32();
        last_update = current_time;

        if delta_time > max_delta_time {
            warn!(
                "Large delta time detected ({:.3}s), capping to {:.3}s",
                delta_time, max_delta_time
            );
            delta_time = max_delta_time;
        }

        let report = queue.drain(&mut game);
        if report.panicked > 0 {
            warn!(
                "{} of {} queued actions panicked this tick",
                report.panicked, report.executed
            );
        }

        game.tick(delta_time);
    }
}
