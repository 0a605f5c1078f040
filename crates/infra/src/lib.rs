//! Infrastructure layer: reservation stores, stock ledgers, admission control, config.

pub mod admission;
pub mod config;
pub mod reservation_store;
pub mod stock_ledger;
pub mod sweeper;


pub use admission::{AdmissionError, ReservationAdmissionController};
pub use config::{AdmissionMode, ConfigError, ReservationConfig};
pub use reservation_store::{InMemoryReservationStore, ReservationStore, StoreError, TimeoutStore};
pub use stock_ledger::{InMemoryStockLedger, LedgerError, StockLedger};
pub use sweeper::{ExpirySweeper, ExpirySweeperHandle};
