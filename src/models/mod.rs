pub mod loaders;
pub mod mentor;
pub mod section;
pub mod station;

pub use loaders::{load_catalog_or_builtin, load_section_catalog};
pub use mentor::{MentorResponse, RoadmapStep, SkillBucket, SkillStats};
pub use section::{SectionCatalog, SectionMap};
pub use station::{GeneratedQuestion, PageClassification, StationItem, StationQuestion};
