use crate::random::RandomSource;
use crate::surface::Surface;

/// What a particle kind has to provide to live in a [`ParticleField`].
pub trait Particle: Sized {
    /// Minimum scheduler time, in milliseconds, between two ambient spawns.
    const SPAWN_INTERVAL_MS: f64;

    /// Creates one particle for the periodic spawn on a `width` x `height`
    /// surface.
    fn spawn_ambient<R: RandomSource + ?Sized>(rng: &mut R, width: f32, height: f32) -> Self;

    /// One frame of motion and fade.
    fn advance(&mut self);

    fn draw<S: Surface + ?Sized>(&self, surface: &mut S);

    /// False once the particle left its bounds or faded out.
    fn is_alive(&self, width: f32, height: f32) -> bool;

    fn alpha(&self) -> f32;
}

/// One particle kind, its surface and its random source.
///
/// A frame is: clear the surface, advance and draw every particle, drop the
/// dead ones, then maybe spawn one. Particles spawned at the end of a frame
/// are drawn for the first time on the next one.
pub struct ParticleField<P, S, R> {
    particles: Vec<P>,
    surface: S,
    rng: R,
    last_spawn: Option<f64>,
}

impl<P: Particle, S: Surface, R: RandomSource> ParticleField<P, S, R> {
    pub fn new(surface: S, rng: R) -> Self {
        Self {
            particles: Vec::new(),
            surface,
            rng,
            last_spawn: None,
        }
    }

    pub fn update(&mut self, timestamp: f64) {
        self.surface.clear();
        for p in self.particles.iter_mut() {
            p.advance();
            p.draw(&mut self.surface);
        }

        let (w, h) = (self.surface.width(), self.surface.height());
        self.particles.retain(|p| p.is_alive(w, h));

        if self.spawn_due(timestamp) {
            self.last_spawn = Some(timestamp);
            let p = P::spawn_ambient(&mut self.rng, w, h);
            self.particles.push(p);
        }
    }

    fn spawn_due(&self, timestamp: f64) -> bool {
        match self.last_spawn {
            None => true,
            // clock went backwards: restart the gate from here
            Some(last) if timestamp < last => true,
            Some(last) => timestamp - last > P::SPAWN_INTERVAL_MS,
        }
    }

    /// Appends an already built particle; it is advanced from the next update.
    pub fn insert(&mut self, particle: P) {
        self.particles.push(particle);
    }

    pub fn particles(&self) -> &[P] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn last_spawn(&self) -> Option<f64> {
        self.last_spawn
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// For resizing. Existing particles keep their coordinates.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<P>, &mut R, &S) {
        (&mut self.particles, &mut self.rng, &self.surface)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::random::Scripted;
    use crate::surface::Rgba;

    /// Counts calls instead of drawing.
    #[derive(Default)]
    pub(crate) struct Tally {
        pub(crate) w: f32,
        pub(crate) h: f32,
        pub(crate) clears: usize,
        pub(crate) fills: usize,
        pub(crate) depth: i32,
        pub(crate) max_depth: i32,
        pub(crate) alphas: Vec<f32>,
    }

    impl Tally {
        pub(crate) fn sized(w: f32, h: f32) -> Self {
            Self {
                w,
                h,
                ..Self::default()
            }
        }
    }

    impl Surface for Tally {
        fn width(&self) -> f32 {
            self.w
        }
        fn height(&self) -> f32 {
            self.h
        }
        fn clear_rect(&mut self, _: f32, _: f32, _: f32, _: f32) {
            self.clears += 1;
        }
        fn save(&mut self) {
            self.depth += 1;
            self.max_depth = self.max_depth.max(self.depth);
        }
        fn restore(&mut self) {
            self.depth -= 1;
        }
        fn translate(&mut self, _: f32, _: f32) {}
        fn rotate(&mut self, _: f32) {}
        fn scale(&mut self, _: f32, _: f32) {}
        fn begin_path(&mut self) {}
        fn move_to(&mut self, _: f32, _: f32) {}
        fn bezier_curve_to(&mut self, _: f32, _: f32, _: f32, _: f32, _: f32, _: f32) {}
        fn close_path(&mut self) {}
        fn set_fill_color(&mut self, _: Rgba) {}
        fn set_global_alpha(&mut self, alpha: f32) {
            self.alphas.push(alpha);
        }
        fn fill(&mut self) {
            self.fills += 1;
        }
    }

    /// Falls one unit per frame and dies below the surface.
    struct Dot {
        y: f32,
        alpha: f32,
    }

    impl Particle for Dot {
        const SPAWN_INTERVAL_MS: f64 = 100.0;

        fn spawn_ambient<R: RandomSource + ?Sized>(rng: &mut R, _: f32, _: f32) -> Self {
            Dot {
                y: rng.range(0.0, 1.0),
                alpha: 1.0,
            }
        }

        fn advance(&mut self) {
            self.y += 1.0;
            self.alpha -= 0.25;
        }

        fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
            surface.save();
            surface.set_global_alpha(self.alpha);
            surface.fill();
            surface.restore();
        }

        fn is_alive(&self, _: f32, height: f32) -> bool {
            self.y < height && self.alpha > 0.0
        }

        fn alpha(&self) -> f32 {
            self.alpha
        }
    }

    fn field(h: f32) -> ParticleField<Dot, Tally, Scripted> {
        ParticleField::new(Tally::sized(10.0, h), Scripted::constant(0.0))
    }

    #[test]
    fn first_frame_spawns() {
        let mut f = field(10.0);
        assert!(f.is_empty());
        f.update(0.0);
        assert_eq!(f.len(), 1);
        assert_eq!(f.last_spawn(), Some(0.0));
    }

    #[test]
    fn spawn_waits_strictly_longer_than_interval() {
        let mut f = field(100.0);
        f.update(0.0);
        f.update(100.0);
        assert_eq!(f.len(), 1);
        f.update(100.5);
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn backwards_clock_spawns_and_regates() {
        let mut f = field(100.0);
        f.update(1000.0);
        f.update(10.0);
        assert_eq!(f.len(), 2);
        assert_eq!(f.last_spawn(), Some(10.0));
        f.update(50.0);
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn new_particle_is_drawn_from_next_frame() {
        let mut f = field(100.0);
        f.update(0.0);
        assert_eq!(f.surface().fills, 0);
        f.update(1.0);
        assert_eq!(f.surface().fills, 1);
        assert_eq!(f.surface().clears, 2);
    }

    #[test]
    fn dead_particles_are_dropped_in_the_same_frame() {
        let mut f = field(100.0);
        f.update(0.0);
        // alpha 1.0 -> 0.75 -> 0.5 -> 0.25 -> 0.0
        for t in 1..4 {
            f.update(t as f64);
        }
        assert_eq!(f.len(), 1);
        f.update(4.0);
        assert!(f.is_empty());
    }

    #[test]
    fn draw_state_never_leaks() {
        let mut f = field(100.0);
        for i in 0..5 {
            f.insert(Dot {
                y: i as f32,
                alpha: 1.0,
            });
        }
        f.update(0.0);
        assert_eq!(f.surface().depth, 0);
        assert_eq!(f.surface().max_depth, 1);
        assert_eq!(f.surface().fills, 5);
    }
}
