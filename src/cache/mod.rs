pub mod coalescer;
pub mod ttl_cache;
