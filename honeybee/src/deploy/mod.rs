//! Local deploy of generated compose projects

pub mod compose;
pub mod fsm;
pub mod output;
pub mod supervisor;
