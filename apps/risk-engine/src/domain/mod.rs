//! Domain value objects: symbols, positions, Greeks, and the portfolio
//! snapshot the engine aggregates over.

mod greeks;
mod position;
mod symbol;

pub use greeks::Greeks;
pub use position::{
    CONTRACT_MULTIPLIER, Direction, OptionPosition, OptionType, PortfolioSnapshot, PositionError,
    PositionStatus, StockPosition,
};
pub use symbol::{OptionSymbol, SymbolError};
