pub mod evolution_config;
pub mod member;
pub mod trainer;

pub use evolution_config::EvolutionConfig;
pub use member::Member;
pub use trainer::{EvolutionPhase, EvolutionaryTrainer};
