pub mod backtest;
pub mod ledger;
pub mod scanner;

pub use backtest::{load_case, load_snapshot, run_backtest, BacktestCase, BacktestResult, RankedTrade};
pub use ledger::{AlertLedger, ClusterRegistry};
pub use scanner::{CycleOutcome, ScanCoordinator};
