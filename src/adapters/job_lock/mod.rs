//! Job lock implementations.
//!
//! - `InMemoryJobLock` - single process (tests, local runs)
//! - `RedisJobLock` - shared across replicas

mod in_memory;
mod redis;

pub use self::in_memory::InMemoryJobLock;
pub use self::redis::RedisJobLock;
