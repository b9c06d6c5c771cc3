mod cell;
mod collection;
mod in_flight;

pub use cell::OptimisticCell;
pub use collection::OptimisticCollection;
