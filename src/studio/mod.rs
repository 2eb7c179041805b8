pub mod edits;
pub mod generate;
pub mod history;
pub mod phrases;
pub mod prompt;
pub mod references;
pub mod session;
pub mod types;

pub use generate::{compile_request, Studio};
pub use history::History;
pub use session::{Session, SessionHandoff};
