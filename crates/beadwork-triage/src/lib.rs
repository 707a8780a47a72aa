pub mod context;
pub mod feedback;
pub mod risk;
pub mod score;

pub use context::*;
pub use feedback::*;
pub use score::*;
