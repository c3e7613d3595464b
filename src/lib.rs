//! Legion Battle - hex tactical combat rules engine

pub mod battle;
pub mod core;
