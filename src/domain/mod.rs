pub mod entity;
pub mod reach;
pub mod rules;
pub mod topology;
