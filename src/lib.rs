//! Terminal love-letter card: hearts rise, petals fall, the story reveals
//! itself as it scrolls into view.

pub mod app;
pub mod audio;
pub mod canvas;
pub mod card;
pub mod config;
pub mod field;
pub mod heart;
pub mod input;
pub mod logging;
pub mod petal;
pub mod random;
pub mod render;
pub mod scheduler;
pub mod surface;

pub use canvas::PixelCanvas;
pub use field::{Particle, ParticleField};
pub use heart::{Heart, HeartField};
pub use petal::{Petal, PetalField};
pub use random::{RandomSource, SeededRandom};
pub use scheduler::{FixedClock, FrameScheduler, PacedClock, StopHandle};
pub use surface::{Rgba, Surface};
