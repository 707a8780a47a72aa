pub mod advanced;
pub mod cover;
pub mod cycle_break;
pub mod labels;
pub mod parallel;
pub mod paths;
pub mod status;
pub mod suggest;
pub mod unlock;

pub use advanced::*;
pub use cover::*;
pub use cycle_break::*;
pub use parallel::*;
pub use paths::*;
pub use status::*;
pub use suggest::{
    generate_suggestions, Suggestion, SuggestionConfig, SuggestionFilter, SuggestionSet,
    SuggestionType,
};
pub use unlock::*;
