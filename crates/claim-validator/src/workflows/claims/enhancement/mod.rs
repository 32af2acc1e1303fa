//! Packet transformations applied between validation passes.
//!
//! An enhancer takes ownership of the packet and always hands one back. Failures
//! inside a stage are logged and leave the packet as it was; they never reach
//! the loop controller.

mod receipt_csv;
mod receipts;
mod reprocess;

pub use receipt_csv::{CsvReceiptSource, ReceiptImportError};
pub use receipts::{
    DateWindow, ReceiptEnhancer, ReceiptQuery, ReceiptRecord, ReceiptSource, ReceiptSourceError,
    DEFAULT_RECEIPT_COMPANIES,
};
pub use reprocess::{
    DocumentReprocessor, FieldCompletenessReprocessor, ReprocessError, ReprocessingEnhancer,
};

use async_trait::async_trait;

use super::domain::ClaimPacket;

#[async_trait]
pub trait ClaimEnhancer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn enhance(&self, packet: ClaimPacket) -> ClaimPacket;
}

/// Final-stage enhancer: the packet is re-evaluated as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnhancement;

#[async_trait]
impl ClaimEnhancer for NoEnhancement {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn enhance(&self, packet: ClaimPacket) -> ClaimPacket {
        packet
    }
}
