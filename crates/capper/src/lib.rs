pub mod capper;
pub mod rapl;
pub mod state;
pub mod tickers;

pub use capper::ClusterwideCapper;
pub use rapl::RaplClient;
pub use state::{CapState, SharedCapState};
