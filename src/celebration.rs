use rand::seq::SliceRandom;
use rand::Rng;

const GRAVITY: f64 = 15.0;
const BURST_SYMBOLS: [char; 6] = ['✨', '⭐', '✦', '✸', '✓', '❖'];

/// Single animated glyph with simple ballistic motion.
#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    age: f64,
    max_age: f64,
}

impl Particle {
    fn new(x: f64, y: f64) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            x,
            y,
            vel_x: rng.gen_range(-3.0..3.0),
            vel_y: rng.gen_range(-4.0..-1.0),
            symbol: *BURST_SYMBOLS.choose(&mut rng).unwrap_or(&'✨'),
            color_index: rng.gen_range(0..7),
            age: 0.0,
            max_age: rng.gen_range(0.8..2.0),
        }
    }

    /// Moves the particle by `dt` seconds; false once it has expired.
    fn update(&mut self, dt: f64) -> bool {
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.vel_y += GRAVITY * dt;
        self.age += dt;
        self.age < self.max_age
    }
}

/// Particle overlay for round completions and correct-key bursts.
#[derive(Debug, Default)]
pub struct Celebration {
    particles: Vec<Particle>,
    width: f64,
    height: f64,
}

impl Celebration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Big center burst after a completed round.
    pub fn start_round_complete(&mut self, width: u16, height: u16) {
        self.width = width as f64;
        self.height = height as f64;
        let mut rng = rand::thread_rng();
        let center_x = self.width / 2.0;
        let center_y = self.height / 2.0;

        self.particles.clear();
        for _ in 0..25 {
            let offset_x = rng.gen_range(-15.0..15.0);
            let offset_y = rng.gen_range(-6.0..6.0);
            self.particles
                .push(Particle::new(center_x + offset_x, center_y + offset_y));
        }
    }

    /// Small burst at the target position for a correct practice keystroke.
    pub fn spawn_key_burst(&mut self, x: u16, y: u16) {
        for _ in 0..4 {
            self.particles.push(Particle::new(x as f64, y as f64));
        }
    }

    pub fn update(&mut self, dt: f64) {
        let (width, height) = (self.width, self.height);
        self.particles.retain_mut(|p| {
            let alive = p.update(dt);
            // Drop particles that left a known viewport
            alive && (width <= 0.0 || (p.x >= 0.0 && p.x < width && p.y >= 0.0 && p.y < height))
        });
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}
