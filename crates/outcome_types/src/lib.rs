mod outcome;
pub use outcome::Outcome;

mod sequence;
pub use sequence::{collect, map_values};
