//! Solid block decoding: the codec graph and the sub-stream sequencer.
//!
//! A folder declares how a solid block is assembled: up to four coders,
//! bind pairs wiring their streams together, and packed streams feeding
//! the unbound inputs. [`Binder`] turns that declaration into a live graph
//! of byte streams with a single sink; [`SolidBlock`] sequences the sink's
//! output into sub-streams, enforcing sizes and CRCs.

mod binder;
mod block;
pub(crate) mod pool;

pub use binder::Binder;
pub use block::SolidBlock;
