pub mod models;
pub mod store;

pub use store::{connect, FixtureStore, UpsertReport};
