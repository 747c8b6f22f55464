pub mod dedupe;
pub mod error;
pub mod normalize;
pub mod page;
pub mod record;
pub mod reference;
pub mod resource_kind;

pub use dedupe::dedupe;
pub use error::{CoreError, ErrorCategory, Result};
pub use normalize::{normalize_observation, normalize_patient};
pub use page::{Bundle, Link, Page};
pub use record::{ConceptValue, ObservationKey, ObservationRecord, PatientRecord};
pub use reference::reference_id;
pub use resource_kind::ResourceKind;
