pub mod draft;
pub mod error;
pub mod headers;
pub mod schedule;
pub mod state;
pub mod store;
pub mod sync;

// Re-export key types
pub use draft::ApiDraft;
pub use error::ScheduleError;
pub use schedule::{Day, ScheduleMap, TimeOfDay};
pub use state::{Method, MonitoredApi, ScheduleGroup, ServiceState};
pub use store::StatusStore;
pub use sync::{Connectivity, RemoteAuthority, SyncEngine};
