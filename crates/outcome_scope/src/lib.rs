mod scope;
pub use scope::{run, Exit, Never, Scope};

mod catching;
pub use catching::{run_catching, run_catching_with, CatchingOutcome, ScopeFault};

mod fault;
pub use fault::{Fault, FaultLocation};

mod options;
pub use options::CatchOptions;

pub use outcome_types::{self, collect, map_values, Outcome};
