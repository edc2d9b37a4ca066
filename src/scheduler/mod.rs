pub mod candidates;
pub mod error;
pub mod history;
pub mod observation;
pub mod output;
pub mod record;
pub mod settings;

pub use candidates::{Candidate, CandidateSetBuilder, SortColumn};
pub use error::SchedulerError;
pub use observation::ObservationScheduler;
pub use output::{write_records, OutputError, OutputFormat};
pub use record::{ActionRecord, Mode};
pub use settings::SchedulerSettings;
