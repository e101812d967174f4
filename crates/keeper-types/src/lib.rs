pub mod address_book;
pub mod error;
pub mod event;
pub mod pool;
pub mod position;
pub mod scheduler_entry;

pub use address_book::{AddressBookEntry, AddressBookStatus};
pub use error::{is_benign_log, ErrorClass, KeeperError, KeeperResult};
pub use event::{Event, HarvestIntent, Outcome, PositionChangeAction, Settlement};
pub use pool::{Pool, TokenProgramKind};
pub use position::{Position, Side, MAX_BINS_PER_HARVEST, MAX_BIN_RANGE_WIDTH};
pub use scheduler_entry::{SchedulerEntry, SchedulerState};
