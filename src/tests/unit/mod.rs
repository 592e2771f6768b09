mod deal_automation;
mod drip;
mod jobs;
mod store;
