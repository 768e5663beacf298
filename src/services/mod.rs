pub mod browser;
pub mod classifier;
pub mod enrich;
pub mod filter;
pub mod pipeline;
pub mod playlist;
pub mod search;
pub mod session;
pub mod youtube;
