#[cfg(feature = "blocking")]
pub mod blocking;
mod client;
mod error;
mod labels;
mod response;
mod series;

pub use client::Prometheus;
pub use error::{PromqlError, Result, SchemaError, ValueParseError};
pub use labels::LabelSet;
pub use response::{MatrixEntry, MetricMap, QueryResponse, ResultData, VectorEntry, WireSample};
pub use series::{TimeSeries, TimeSeriesPoint};
