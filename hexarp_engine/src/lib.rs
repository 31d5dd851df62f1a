pub mod arpeggiator;
pub mod clock;
pub mod commands;
pub mod engine; // Engine lives here
pub mod handle;
pub mod lane;
pub mod notes;
pub mod rhythm;
pub mod scheduler;
pub mod standalone;
pub mod transport;

// Re-exports
pub use arpeggiator::Arpeggiator;
pub use clock::{Clock, ClockSettings};
pub use commands::EngineCommand;
pub use engine::{Engine, EngineShared};
pub use handle::{EngineHandle, LiveStep};
pub use lane::{Lane, NoteSnapshot};
pub use notes::NoteSetResolver;
pub use rhythm::RhythmPattern;
pub use scheduler::EventScheduler;
pub use standalone::{StandaloneRunner, TimedEvent};
