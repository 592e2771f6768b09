pub mod deal_automation;
pub mod drip;
pub mod follow_up;
pub mod lead_scoring;
pub mod rule_matcher;
pub mod sla;
pub mod ticket_assignment;

pub use deal_automation::DealStageAutomationService;
pub use drip::DripCampaignService;
pub use follow_up::FollowUpService;
pub use lead_scoring::LeadScoringService;
pub use sla::SlaService;
pub use ticket_assignment::TicketAssignmentService;
