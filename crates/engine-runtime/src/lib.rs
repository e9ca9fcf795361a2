pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod reset;
pub mod run_loop;
pub mod source;
pub mod step;
