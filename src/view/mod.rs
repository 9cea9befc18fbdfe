pub mod dashboard;
pub mod html;
pub mod products;
pub mod projector;
pub mod status;

pub use dashboard::{Command, Dashboard, Screen};
pub use projector::{project, FilterCriteria, OrderRow, OrderTable};
pub use status::{status_class, status_label, StatusClass};
