//! Dome Archery headless driver
//!
//! Plays one scripted round through the fixed-timestep clock and logs what
//! happens. Usage: `dome-archery [seed] [tuning.json]`; `RUST_LOG=debug`
//! shows every hit and spawn.

use dome_archery::Tuning;
use dome_archery::consts::SIM_DT;
use dome_archery::sim::{FireCommand, GameState, HitKind, SimClock, SimEvent, TickInput, tick};
use glam::Vec3;

/// Frame times cycled by the driver, to exercise the accumulator
const FRAME_PATTERN: [f32; 4] = [1.0 / 60.0, 1.0 / 45.0, 1.0 / 90.0, 1.0 / 30.0];

/// Ticks the scripted archer holds the draw before each shot
const DRAW_TICKS: u32 = 50;

/// Aim lift per unit of distance, roughly cancelling the drop at full draw
const AIM_LIFT: f32 = 0.04;

/// Game instance holding all state
struct Game {
    state: GameState,
    clock: SimClock,
    input: TickInput,
    /// Ticks the fire input has been held
    held: u32,
    total_events: usize,
}

impl Game {
    fn new(seed: u64, tuning: Tuning) -> Self {
        Self {
            state: GameState::new(seed, tuning),
            clock: SimClock::new(),
            input: TickInput::default(),
            held: 0,
            total_events: 0,
        }
    }

    /// Draw, aim at the nearest target, release
    fn update_archer(&mut self) {
        if !self.state.is_playing() {
            self.input.fire = None;
            return;
        }
        self.held += 1;
        if self.held < DRAW_TICKS {
            return;
        }

        let origin = self.state.nocked.position;
        let nearest = self
            .state
            .targets
            .active()
            .map(|(_, t)| t.position)
            .min_by(|a, b| {
                a.distance(origin)
                    .partial_cmp(&b.distance(origin))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        let Some(aim) = nearest else {
            return;
        };

        let to_target = aim - origin;
        let direction = to_target + Vec3::Y * to_target.length() * AIM_LIFT;
        self.input.fire = Some(FireCommand::from_charge(
            direction,
            self.held,
            &self.state.tuning.arrow,
        ));
        self.held = 0;
    }

    /// Run the simulation ticks owed for one frame
    fn update(&mut self, dt: f32) {
        let substeps = self.clock.advance(dt);
        for _ in 0..substeps {
            self.update_archer();
            let events = tick(&mut self.state, &self.input, SIM_DT);
            // Clear one-shot inputs after processing
            self.input.fire = None;
            self.report(&events);
        }
    }

    fn report(&mut self, events: &[SimEvent]) {
        self.total_events += events.len();
        for event in events {
            match event {
                SimEvent::Hit(hit) => {
                    let what = match hit.kind {
                        HitKind::Ground => "ground".to_string(),
                        HitKind::Target { id, ring } => format!("target {} ring {}", id.slot, ring),
                        HitKind::Barrier { index, first_hit } => {
                            format!("barrier {}{}", index, if first_hit { " (revealed)" } else { "" })
                        }
                        HitKind::Dome => "dome".to_string(),
                    };
                    log::info!(
                        "[{:>5}] arrow {} hit {} for {} (score {})",
                        self.state.time_ticks,
                        hit.arrow,
                        what,
                        hit.score,
                        self.state.score
                    );
                }
                SimEvent::WindChanged { direction, speed } => {
                    log::info!("[{:>5}] wind {:.0} toward {:?}", self.state.time_ticks, speed, direction);
                }
                SimEvent::RoundEnded { score } => {
                    log::info!("[{:>5}] round over, final score {}", self.state.time_ticks, score);
                }
                _ => {}
            }
        }
    }

    fn is_finished(&self) -> bool {
        !self.state.is_playing() && self.state.arrows.is_empty()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next().map(|s| s.parse::<u64>()) {
        Some(Ok(seed)) => seed,
        Some(Err(e)) => {
            log::warn!("Invalid seed ({}), using 1", e);
            1
        }
        None => 1,
    };
    let tuning = match args.next() {
        Some(path) => Tuning::load_or_default(path),
        None => Tuning::default(),
    };

    log::info!("Dome Archery (headless) starting with seed {}", seed);
    let mut game = Game::new(seed, tuning);

    // Hard stop well past the round limit in case arrows never land
    let max_frames = ((game.state.tuning.scene.time_limit + 30.0) / SIM_DT) as usize;
    for frame in 0..max_frames {
        game.update(FRAME_PATTERN[frame % FRAME_PATTERN.len()]);
        if game.is_finished() {
            break;
        }
    }

    log::info!(
        "{} ticks, {} events, {} spent arrows",
        game.clock.ticks,
        game.total_events,
        game.state.spent.len()
    );
    match serde_json::to_string_pretty(&game.state.stats) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize round stats: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation is driven by the host page on the web
}
