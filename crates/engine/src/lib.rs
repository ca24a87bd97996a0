//! Track session state machine, lyric synchronization and the async monitor
//! that drives them from a device log stream.

pub mod clock;
pub mod detector;
pub mod engine;
pub mod events;
pub mod export;
pub mod monitor;
pub mod session;
pub mod sync;

pub use clock::{PlaybackClock, TICK_PERIOD};
pub use detector::{Evaluation, TrackChangeDetector};
pub use engine::{EngineAction, EngineOutput, SearchMessage, SessionEngine};
pub use events::PipelineEvent;
pub use export::{export_document, export_lrc, lrc_file_name, write_export, LrcExport};
pub use monitor::{Monitor, MonitorConfig, MonitorExit, MonitorHandle};
pub use session::{SearchState, SessionPhase, TrackSession};
pub use sync::{LineChange, PlaybackSynchronizer};
