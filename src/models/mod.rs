pub mod campaigns;
pub mod crm;
pub mod rules;
pub mod scoring;

pub use campaigns::*;
pub use crm::*;
pub use rules::*;
pub use scoring::*;
