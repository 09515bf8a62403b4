/// Observer told about every settled, non-empty search.
///
/// Fire-and-forget: implementations handle their own failures and must not
/// call back into the controller that produced the result.
pub trait SearchAnalytics<T>: Send + Sync {
    fn record_search(&self, query: &str, first: &T);
}
