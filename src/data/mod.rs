/// Data layer: core types, loading, filtering, and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → CallDataset (memoized per source)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ CallDataset  │  Vec<Record>, column index, date span
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  date range + cascading dimension filters → row indices
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  period buckets → mean/ratio pivot, chart series
///   └───────────┘
/// ```
pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
