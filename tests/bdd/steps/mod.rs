pub mod common_steps;
