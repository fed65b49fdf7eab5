//! Service layer: the search control loop and advisor voting.

pub mod search_engine;
pub mod vote_panel;

pub use search_engine::{SearchEngine, SearchEvent};
pub use vote_panel::{VotePanel, ADVISOR_PRIOR_REWARD};
