pub mod difficulty;
pub mod issuance;

pub use difficulty::{calculate_next_difficulty, Target256};
pub use issuance::{is_valid_block_reward, reward};
