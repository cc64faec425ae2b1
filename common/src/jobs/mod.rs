use serde::Serialize;

/// Status of a background generation job, polled by the client.
///
/// A batch goes through two observable phases: the sequential render phase
/// (`InProgress` carries the percentage of rows rendered) and, when email
/// dispatch is enabled, the bounded-concurrency delivery phase (`Dispatching`
/// carries the percentage of queued deliveries that have settled).
/// `Completed` carries a JSON summary of the batch outcome.
#[derive(Clone, Debug, Serialize)]
pub enum JobStatus {
    Pending,
    InProgress(u32),
    Dispatching(u32),
    Completed(String),
    Failed(String),
}
