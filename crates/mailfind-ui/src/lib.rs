//! Mailfind UI - Client-side search orchestration
//!
//! This crate provides the interaction layer of the search experience:
//! - `VirtualList`: windowed rendering of large result sets
//! - `ShortcutDispatcher`: global keyboard bindings that stay out of text entry
//! - `VoiceController`: finite-state wrapper around speech recognition
//! - `SearchInterface`: owns query and filters, debounces searches and
//!   records history and analytics

pub mod config;
pub mod debounce;
pub mod error;
pub mod interface;
pub mod keyboard;
pub mod state;
pub mod virtual_list;
pub mod voice;

pub use config::*;
pub use debounce::*;
pub use error::*;
pub use interface::*;
pub use keyboard::*;
pub use state::*;
pub use virtual_list::*;
pub use voice::*;
