pub mod drivers;
pub mod engine;
pub mod psth;
pub mod recorder;
pub mod types;
