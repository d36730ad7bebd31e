pub mod accounts;
pub mod bar;
pub mod config;
pub mod day;
pub mod export;
pub mod generator;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod session;
#[cfg(any(feature = "cli", feature = "http_api"))]
pub mod telemetry;
pub mod worker;
pub(crate) mod worker_validation;
pub mod workspace;

pub use accounts::{AccountError, User, UserDirectory, UserProfile};
pub use bar::{Bar, RosterError, ScheduleEntry, SlotCoverage, StaffingRequirement};
pub use config::{LlmConfig, RosterConfig};
pub use day::{DAYS, DayOfWeek, OperatingHours, WeeklyHours, format_hour};
pub use export::{export_file_name, save_schedule_to_csv, schedule_csv_string, write_schedule_csv};
#[cfg(feature = "llm")]
pub use generator::GeminiGenerator;
pub use generator::{GenerationError, GenerationRequest, ScheduleGenerator};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteStore;
pub use persistence::{FileStore, KeyValueStore, MemoryStore, PersistenceError};
pub use session::{Session, SessionError};
pub use worker::{DayConstraint, Tag, Worker};
pub use workspace::Workspace;
