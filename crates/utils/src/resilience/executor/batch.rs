//! Per-item outcomes of a sequential partial-failure batch.

use pipewright_core::Error;

/// Outcome of one batch item, paired with the input that produced it
#[derive(Debug)]
pub struct OperationResult<I, T> {
    input: I,
    outcome: Result<T, Error>,
}

impl<I, T> OperationResult<I, T> {
    #[must_use]
    pub fn new(input: I, outcome: Result<T, Error>) -> Self {
        Self { input, outcome }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    #[must_use]
    pub fn input(&self) -> &I {
        &self.input
    }

    #[must_use]
    pub fn result(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    #[must_use]
    pub fn outcome(&self) -> &Result<T, Error> {
        &self.outcome
    }

    pub fn into_parts(self) -> (I, Result<T, Error>) {
        (self.input, self.outcome)
    }
}

/// Ordered results of a batch.
///
/// `success_count() + failure_count() == results().len()` always holds.
#[derive(Debug)]
pub struct BatchResult<I, T> {
    results: Vec<OperationResult<I, T>>,
    success_count: usize,
    failure_count: usize,
}

impl<I, T> BatchResult<I, T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            success_count: 0,
            failure_count: 0,
        }
    }

    pub(crate) fn push(&mut self, result: OperationResult<I, T>) {
        if result.is_success() {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.results.push(result);
    }

    /// Results in input order
    #[must_use]
    pub fn results(&self) -> &[OperationResult<I, T>] {
        &self.results
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.success_count
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether every recorded item succeeded
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }

    /// Lazy view over the successful items
    pub fn successful_results(&self) -> impl Iterator<Item = (&I, &T)> + '_ {
        self.results
            .iter()
            .filter_map(|r| r.result().map(|value| (r.input(), value)))
    }

    /// Lazy view over the failed items
    pub fn failed_results(&self) -> impl Iterator<Item = (&I, &Error)> + '_ {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|error| (r.input(), error)))
    }

    #[must_use]
    pub fn into_results(self) -> Vec<OperationResult<I, T>> {
        self.results
    }
}
