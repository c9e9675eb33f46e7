pub mod atr;

pub use atr::{DEFAULT_ATR_WINDOW, average_true_range, mean_atr, true_range};
