//! Peer Transport
//!
//! Nodes serve each other's lookups over plain HTTP/1:
//!
//! ```text
//!  node A                                     node B
//! ┌──────────────┐   GET /_peercache/g/k     ┌──────────────┐
//! │ Group::get   │ ────────────────────────► │ HttpPool     │
//! │  └ HttpPool  │                           │  └ Group::get│
//! │    (picker)  │ ◄──────────────────────── │   (server)   │
//! └──────────────┘   200 GetResponse{value}  └──────────────┘
//! ```

mod client;
mod pool;
pub mod wire;

pub use client::HttpGetter;
pub use pool::{HttpPool, PoolConfig};
pub use wire::{GetRequest, GetResponse};
