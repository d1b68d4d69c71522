//! DTO types for the REST surface, organized by resource.

pub mod alert_dto;
pub mod fingerprint_dto;
pub mod insight_dto;

pub use alert_dto::{AlertDto, AlertListParams};
pub use fingerprint_dto::{FingerprintDto, FingerprintListParams};
pub use insight_dto::{
    InsightDto, PriceHistoryParams, PriceHistoryResponse, PricePointDto, RecentInsightParams,
};
