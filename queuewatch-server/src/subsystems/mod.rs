pub mod intake;
pub mod mutator;
