//! The query editor's cascading device, topic and data key selection.
//!
//! [`state`] holds the pure selection logic, [`controller`] runs it against an
//! [`akenza_client::Inventory`], and [`debounce`] rate-limits the device search.
pub mod controller;
pub mod debounce;
pub mod state;

pub use controller::{QueryEditor, Signal};
pub use debounce::{Debouncer, DEFAULT_SEARCH_DEBOUNCE};
pub use state::{EditorState, Effect, Event, Level, LevelStatus};
