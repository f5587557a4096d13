pub mod declarator;
pub mod emitter;

pub use declarator::{Declarator, DeclaratorSynth};
pub use emitter::Emitter;
