use std::f32::consts::TAU;

use crate::field::{Particle, ParticleField};
use crate::random::RandomSource;
use crate::surface::{Rgba, Surface};

pub const PETAL_COLOR: Rgba = Rgba::new(244, 167, 185, 0.8);

pub const PETAL_SPAWN_INTERVAL_MS: f64 = 520.0;
pub const PETAL_FADE_PER_FRAME: f32 = 0.0005;
pub const PETAL_SPIN_PER_FRAME: f32 = 0.004;
/// Horizontal amplitude of the sway, in pixels per frame.
pub const PETAL_SWAY_AMPLITUDE: f32 = 0.6;
/// Petals at or below `height + PETAL_CULL_BELOW` are culled.
pub const PETAL_CULL_BELOW: f32 = 40.0;
/// Petals fading to this alpha are culled.
pub const PETAL_MIN_ALPHA: f32 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct Petal {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Downward pixels per frame.
    pub speed: f32,
    pub drift: f32,
    /// Frequency of the sway against `y`.
    pub sway: f32,
    pub angle: f32,
    pub alpha: f32,
}

impl Particle for Petal {
    const SPAWN_INTERVAL_MS: f64 = PETAL_SPAWN_INTERVAL_MS;

    fn spawn_ambient<R: RandomSource + ?Sized>(rng: &mut R, width: f32, _height: f32) -> Self {
        Petal {
            x: rng.range(0.0, width),
            y: rng.range(-200.0, -20.0),
            size: rng.range(8.0, 18.0),
            speed: rng.range(0.6, 1.6),
            drift: rng.range(-0.4, 0.8),
            sway: rng.range(0.004, 0.01),
            angle: rng.range(0.0, TAU),
            alpha: rng.range(0.3, 0.7),
        }
    }

    fn advance(&mut self) {
        self.y += self.speed;
        // sway follows the fall position, not the clock
        self.x += self.drift + (self.y * self.sway).sin() * PETAL_SWAY_AMPLITUDE;
        self.angle += PETAL_SPIN_PER_FRAME;
        self.alpha -= PETAL_FADE_PER_FRAME;
    }

    fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
        let k = self.size / 16.0;
        surface.save();
        surface.translate(self.x, self.y);
        surface.rotate(self.angle);
        surface.scale(k, k);
        surface.begin_path();
        surface.move_to(0.0, 0.0);
        surface.bezier_curve_to(8.0, -10.0, 18.0, -6.0, 12.0, 8.0);
        surface.bezier_curve_to(6.0, 18.0, -6.0, 16.0, -10.0, 6.0);
        surface.close_path();
        surface.set_fill_color(PETAL_COLOR);
        surface.set_global_alpha(self.alpha);
        surface.fill();
        surface.restore();
    }

    fn is_alive(&self, _width: f32, height: f32) -> bool {
        self.y < height + PETAL_CULL_BELOW && self.alpha > PETAL_MIN_ALPHA
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }
}

pub type PetalField<S, R> = ParticleField<Petal, S, R>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::tests::Tally;
    use crate::random::{Scripted, SeededRandom};

    fn petal() -> Petal {
        Petal {
            x: 50.0,
            y: 0.0,
            size: 16.0,
            speed: 1.0,
            drift: 0.0,
            sway: 0.01,
            angle: 0.0,
            alpha: 0.5,
        }
    }

    #[test]
    fn spawn_ranges() {
        let mut lo = Scripted::constant(0.0);
        let p = Petal::spawn_ambient(&mut lo, 300.0, 200.0);
        assert_eq!((p.x, p.y, p.size, p.speed), (0.0, -200.0, 8.0, 0.6));
        assert_eq!((p.drift, p.sway, p.angle, p.alpha), (-0.4, 0.004, 0.0, 0.3));

        let mut rng = SeededRandom::new(11);
        for _ in 0..2000 {
            let p = Petal::spawn_ambient(&mut rng, 300.0, 200.0);
            assert!((-200.0..-20.0).contains(&p.y));
            assert!((0.004..0.01).contains(&p.sway));
            assert!((0.0..TAU).contains(&p.angle));
        }
    }

    #[test]
    fn sway_uses_new_y() {
        let mut p = petal();
        p.advance();
        let expected = 50.0 + (1.0f32 * 0.01).sin() * 0.6;
        assert_eq!(p.y, 1.0);
        assert!((p.x - expected).abs() < 1e-6);
        assert!((p.angle - 0.004).abs() < 1e-7);
        assert!((p.alpha - 0.4995).abs() < 1e-6);
    }

    #[test]
    fn culling_bounds() {
        let mut p = petal();
        p.y = 239.9;
        assert!(p.is_alive(300.0, 200.0));
        p.y = 240.0;
        assert!(!p.is_alive(300.0, 200.0));
        let mut faded = petal();
        faded.alpha = 0.1;
        assert!(!faded.is_alive(300.0, 200.0));
    }

    #[test]
    fn petal_field_spawns_every_520ms_at_most() {
        let mut field = PetalField::new(Tally::sized(300.0, 200.0), SeededRandom::new(5));
        let mut t = 0.0;
        while t <= 2000.0 {
            field.update(t);
            t += 16.0;
        }
        // spawns at 0, 528, 1056, 1584
        assert_eq!(field.len(), 4);
    }
}
