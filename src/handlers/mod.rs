// Journal resource handlers and service status endpoints
pub mod journal;
pub mod status;
