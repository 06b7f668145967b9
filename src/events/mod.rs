//! # Events Module
//!
//! Event-driven progress reporting, independent of any UI.
//!
//! ## Design
//! Pipeline workers emit events through channels, allowing any UI
//! (CLI, GUI, web) to subscribe and display progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = event_channel();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Pairing(PairingEvent::CountMismatch { from_count, to_count }) => {
//!                 eprintln!("warning: {} vs {} documents", from_count, to_count)
//!             }
//!             Event::Pair(PairEvent::Progress(p)) => println!("{}/{}", p.completed, p.total),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{event_channel, null_sender, EventSender};
pub use types::*;
