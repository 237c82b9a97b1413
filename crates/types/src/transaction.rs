//! Flash transactions: one read, program or erase unit of work.

use crate::{PhysicalPageAddress, TransactionId};
use crate::{Lpn, Ppn};
use serde::{Deserialize, Serialize};

/// The flash command a transaction maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Read,
    Write,
    Erase,
}

impl TransactionKind {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Read => "read",
            TransactionKind::Write => "write",
            TransactionKind::Erase => "erase",
        }
    }
}

/// Who produced a transaction; decides which priority class it queues in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionSource {
    /// Host I/O submitted through the front end.
    UserIo,
    /// Writeback traffic from the data cache; scheduled with user priority.
    Cache,
    /// Garbage collection and wear leveling.
    GcWl,
    /// Address-mapping table maintenance.
    Mapping,
}

/// One flash command unit targeting a specific page (or block, for erases).
///
/// A transaction is owned by exactly one queue at a time; bundling moves it
/// out by value into the dispatch set, so it can never be scheduled twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashTransaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub source: TransactionSource,
    pub address: PhysicalPageAddress,
    pub lpn: Lpn,
    pub ppn: Ppn,
    /// Set by the scheduler at bundling time when dispatch must suspend the
    /// operation currently running on the target chip.
    pub suspend_required: bool,
    /// For writes: the read this write is logically subordinate to. The
    /// write is not ready while the read is outstanding.
    pub related_read: Option<TransactionId>,
    /// For erases: page-movement work that must drain before the block can
    /// be erased.
    pub pending_page_movements: Vec<TransactionId>,
}

impl FlashTransaction {
    pub fn read(
        id: TransactionId,
        source: TransactionSource,
        address: PhysicalPageAddress,
        lpn: Lpn,
        ppn: Ppn,
    ) -> Self {
        Self {
            id,
            kind: TransactionKind::Read,
            source,
            address,
            lpn,
            ppn,
            suspend_required: false,
            related_read: None,
            pending_page_movements: Vec::new(),
        }
    }

    pub fn write(
        id: TransactionId,
        source: TransactionSource,
        address: PhysicalPageAddress,
        lpn: Lpn,
        ppn: Ppn,
    ) -> Self {
        Self {
            id,
            kind: TransactionKind::Write,
            source,
            address,
            lpn,
            ppn,
            suspend_required: false,
            related_read: None,
            pending_page_movements: Vec::new(),
        }
    }

    /// Erase transactions always originate from garbage collection.
    pub fn erase(id: TransactionId, address: PhysicalPageAddress) -> Self {
        Self {
            id,
            kind: TransactionKind::Erase,
            source: TransactionSource::GcWl,
            address,
            lpn: 0,
            ppn: 0,
            suspend_required: false,
            related_read: None,
            pending_page_movements: Vec::new(),
        }
    }

    /// Attach the read this write depends on.
    pub fn with_related_read(mut self, read: TransactionId) -> Self {
        debug_assert_eq!(self.kind, TransactionKind::Write);
        self.related_read = Some(read);
        self
    }

    /// Attach outstanding page movements to an erase.
    pub fn with_page_movements(mut self, movements: Vec<TransactionId>) -> Self {
        debug_assert_eq!(self.kind, TransactionKind::Erase);
        self.pending_page_movements = movements;
        self
    }

    /// Whether the transaction can be dispatched right now.
    ///
    /// Reads are always ready. A write waits for its related read; an erase
    /// waits for its page movements to drain.
    pub fn is_ready(&self) -> bool {
        match self.kind {
            TransactionKind::Read => true,
            TransactionKind::Write => self.related_read.is_none(),
            TransactionKind::Erase => self.pending_page_movements.is_empty(),
        }
    }
}
