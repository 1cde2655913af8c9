pub mod comment;
pub mod feedback;
pub mod prediction;

pub use comment::*;
pub use feedback::*;
pub use prediction::*;
