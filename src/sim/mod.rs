pub mod event;
pub mod generator;
pub mod session;
pub mod turn;
pub mod world;
