// Library surface shared by the binary and the integration tests.
// The terminal host lives in main.rs; everything here runs headless.
pub mod app_dirs;
pub mod audio;
pub mod clock;
pub mod config;
pub mod deck;
pub mod error;
pub mod phrase;
pub mod practice;
pub mod quota;
pub mod reveal;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod translation;
pub mod ui;

pub use error::{Error, Result};
pub use phrase::{Formality, Phrase, PhraseId, Rating};
pub use scheduler::{apply_rating, next_due_time, select_due};
pub use session::{RevealState, Session, SessionEvent, SessionState};
