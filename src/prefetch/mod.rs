pub mod artifact;
pub mod prefetcher;
pub mod store;
