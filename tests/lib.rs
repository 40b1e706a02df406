// Shared entry points for the behavior tests
pub use divtick_core::{
    IngestionOrchestrator, NormalizationPolicy, PersistenceGateway, QueueConsumer, RawDividend,
    RecordNormalizer, Symbol, WarehouseGateway,
};
pub use std::sync::Arc;
