use std::time::Duration;

pub(crate) const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub(crate) const TICK_RATE: Duration = Duration::from_millis(200);
pub(crate) const STATUS_TTL: Duration = Duration::from_secs(5);

pub(crate) const STATUS_LOADING: &str = "Loading tasks…";
pub(crate) const STATUS_SEARCH: &str = "Type to filter by title • Enter keeps it • Esc clears";
pub(crate) const STATUS_CREATE: &str = "New task • Tab moves between fields • Enter saves • Esc cancels";
pub(crate) const STATUS_EDIT: &str = "Edit task • Tab moves between fields • Enter saves • Esc cancels";
pub(crate) const STATUS_HELP: &str = "Keyboard reference • Enter/Esc to close";
pub(crate) const STATUS_CONFIRM_DELETE: &str =
    "Confirm deletion • arrows choose, Enter confirms, Esc cancels";
pub(crate) const STATUS_BUSY: &str = "Still saving the previous change, try again in a moment";
pub(crate) const STATUS_SIGNED_OUT: &str =
    "Session expired. Quit and run `taskdesk login` to continue";
pub(crate) const STATUS_RESET: &str = "Search, sort and paging reset";
