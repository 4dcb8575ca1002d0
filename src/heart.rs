use crate::field::{Particle, ParticleField};
use crate::random::RandomSource;
use crate::surface::{Rgba, Surface};

pub const HEART_SWATCHES: [Rgba; 2] = [
    Rgba::opaque(0xf4, 0xa7, 0xb9),
    Rgba::opaque(0xf5, 0xd0, 0x8a),
];

pub const HEART_SPAWN_INTERVAL_MS: f64 = 380.0;
pub const HEART_FADE_PER_FRAME: f32 = 0.001;
/// Hearts at or above this line are culled.
pub const HEART_CULL_Y: f32 = -40.0;
/// Ambient hearts start this far below the bottom edge.
pub const HEART_SPAWN_BELOW: f32 = 20.0;

pub const BURST_COUNT: usize = 18;

/// Ambient hearts drift up slowly; burst hearts are bigger and faster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartKind {
    Ambient,
    Burst,
}

impl HeartKind {
    fn size_range(self) -> (f32, f32) {
        match self {
            HeartKind::Ambient => (6.0, 16.0),
            HeartKind::Burst => (10.0, 22.0),
        }
    }

    fn speed_range(self) -> (f32, f32) {
        match self {
            HeartKind::Ambient => (0.4, 1.4),
            HeartKind::Burst => (1.8, 3.2),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Heart {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Upward pixels per frame.
    pub speed: f32,
    pub drift: f32,
    pub alpha: f32,
    pub color: Rgba,
}

impl Heart {
    pub fn new<R: RandomSource + ?Sized>(rng: &mut R, kind: HeartKind, x: f32, y: f32) -> Self {
        let (s0, s1) = kind.size_range();
        let (v0, v1) = kind.speed_range();
        let size = rng.range(s0, s1);
        let speed = rng.range(v0, v1);
        let drift = rng.range(-0.6, 0.6);
        let alpha = rng.range(0.4, 0.85);
        let color = if rng.next_unit() < 0.5 {
            HEART_SWATCHES[0]
        } else {
            HEART_SWATCHES[1]
        };
        Self {
            x,
            y,
            size,
            speed,
            drift,
            alpha,
            color,
        }
    }
}

impl Particle for Heart {
    const SPAWN_INTERVAL_MS: f64 = HEART_SPAWN_INTERVAL_MS;

    fn spawn_ambient<R: RandomSource + ?Sized>(rng: &mut R, width: f32, height: f32) -> Self {
        let x = rng.range(0.0, width);
        Heart::new(rng, HeartKind::Ambient, x, height + HEART_SPAWN_BELOW)
    }

    fn advance(&mut self) {
        self.y -= self.speed;
        self.x += self.drift;
        self.alpha -= HEART_FADE_PER_FRAME;
    }

    fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
        let k = self.size / 20.0;
        surface.save();
        surface.translate(self.x, self.y);
        surface.scale(k, k);
        surface.begin_path();
        surface.move_to(0.0, -10.0);
        surface.bezier_curve_to(-12.0, -22.0, -30.0, -6.0, 0.0, 18.0);
        surface.bezier_curve_to(30.0, -6.0, 12.0, -22.0, 0.0, -10.0);
        surface.close_path();
        surface.set_fill_color(self.color);
        surface.set_global_alpha(self.alpha);
        surface.fill();
        surface.restore();
    }

    fn is_alive(&self, _width: f32, _height: f32) -> bool {
        self.y > HEART_CULL_Y && self.alpha > 0.0
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }
}

pub type HeartField<S, R> = ParticleField<Heart, S, R>;

impl<S: Surface, R: RandomSource> ParticleField<Heart, S, R> {
    /// Adds [`BURST_COUNT`] fast hearts around (50%, 60%) of the surface, right now.
    pub fn burst(&mut self) {
        let (hearts, rng, surface) = self.parts_mut();
        let cx = surface.width() * 0.5;
        let cy = surface.height() * 0.6;
        for _ in 0..BURST_COUNT {
            let x = cx + rng.range(-60.0, 60.0);
            let y = cy + rng.range(-20.0, 40.0);
            hearts.push(Heart::new(&mut *rng, HeartKind::Burst, x, y));
        }
        tracing::debug!(total = hearts.len(), "heart burst");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::tests::Tally;
    use crate::random::{Scripted, SeededRandom};

    fn heart(y: f32, alpha: f32) -> Heart {
        Heart {
            x: 10.0,
            y,
            size: 10.0,
            speed: 1.0,
            drift: 0.5,
            alpha,
            color: HEART_SWATCHES[0],
        }
    }

    #[test]
    fn ranges_by_kind() {
        let mut lo = Scripted::constant(0.0);
        let h = Heart::new(&mut lo, HeartKind::Ambient, 0.0, 0.0);
        assert_eq!((h.size, h.speed, h.drift, h.alpha), (6.0, 0.4, -0.6, 0.4));
        assert_eq!(h.color, HEART_SWATCHES[0]);

        let mut hi = Scripted::constant(0.999);
        let h = Heart::new(&mut hi, HeartKind::Burst, 0.0, 0.0);
        assert!(h.size > 21.9 && h.size < 22.0);
        assert!(h.speed > 3.19 && h.speed < 3.2);
        assert_eq!(h.color, HEART_SWATCHES[1]);
    }

    #[test]
    fn ambient_sizes_stay_in_range() {
        let mut rng = SeededRandom::new(3);
        for _ in 0..2000 {
            let h = Heart::spawn_ambient(&mut rng, 640.0, 480.0);
            assert!((6.0..=16.0).contains(&h.size));
            assert!((0.4..=1.4).contains(&h.speed));
            assert!((0.0..=640.0).contains(&h.x));
            assert_eq!(h.y, 500.0);
        }
    }

    #[test]
    fn advance_moves_up_and_fades() {
        let mut h = heart(100.0, 0.5);
        h.advance();
        assert_eq!(h.y, 99.0);
        assert_eq!(h.x, 10.5);
        assert!((h.alpha - 0.499).abs() < 1e-6);
    }

    #[test]
    fn culled_at_top_line_or_zero_alpha() {
        assert!(heart(-39.9, 0.5).is_alive(100.0, 100.0));
        assert!(!heart(-40.0, 0.5).is_alive(100.0, 100.0));
        assert!(!heart(10.0, 0.0).is_alive(100.0, 100.0));
    }

    #[test]
    fn burst_adds_eighteen_at_once() {
        let mut field = HeartField::new(Tally::sized(800.0, 600.0), SeededRandom::new(9));
        field.update(0.0);
        let before = field.len();
        field.burst();
        assert_eq!(field.len(), before + BURST_COUNT);
        assert_eq!(field.surface().fills, 0);
    }

    #[test]
    fn burst_extremes_hit_cluster_corners() {
        let mut field = HeartField::new(Tally::sized(800.0, 600.0), Scripted::constant(0.0));
        field.burst();
        let first = &field.particles()[0];
        assert_eq!((first.x, first.y), (340.0, 340.0));
        assert_eq!(first.size, 10.0);
    }

    #[test]
    fn draw_scales_by_size_and_restores() {
        let mut s = Tally::sized(100.0, 100.0);
        heart(50.0, 0.7).draw(&mut s);
        assert_eq!(s.fills, 1);
        assert_eq!(s.depth, 0);
        assert_eq!(s.alphas, vec![0.7]);
    }
}
