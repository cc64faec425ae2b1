//! Per-row email delivery with a bounded-concurrency pool.
//!
//! Queued deliveries run with at most N in flight at a time, drawn FIFO from
//! the queue. Every task settles independently (one failure never cancels
//! the rest) and dispatch finishes only when all tasks have settled. Each
//! send carries a transport timeout so a hung delivery counts as failed
//! instead of stalling the pool.

use crate::config::SmtpConfig;
use futures_util::stream::{self, StreamExt};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use regex::Regex;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Permissive `local@domain.tld` shape check, not full RFC validation.
pub(crate) fn is_valid_email(address: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
    re.is_match(address)
}

/// One delivery waiting for a pool slot: the rendered certificate plus its
/// destination. Built during the render phase, consumed by `dispatch_all`.
#[derive(Debug)]
pub(crate) struct PendingEmail {
    pub row_index: usize,
    pub address: String,
    pub filename: String,
    pub pdf: Vec<u8>,
}

pub(crate) struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, String> {
        // Port 465 means implicit TLS; everything else upgrades via STARTTLS.
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| e.to_string())?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .timeout(Some(SEND_TIMEOUT))
            .build();
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| format!("Invalid SMTP_FROM mailbox: {}", e))?;
        Ok(Mailer { transport, from })
    }

    async fn send(&self, task: &PendingEmail, subject: &str, body: &str) -> Result<(), String> {
        let to: Mailbox = task.address.parse().map_err(|e| format!("{}", e))?;
        let pdf_type =
            ContentType::parse("application/pdf").map_err(|e| e.to_string())?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(Attachment::new(task.filename.clone()).body(task.pdf.clone(), pdf_type)),
            )
            .map_err(|e| e.to_string())?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Runs every task with at most `concurrency` in flight, invoking `on_settle`
/// with each outcome as it arrives. Settle order is completion order, not
/// queue order; the callback runs serially on the dispatching task, so
/// progress counting needs no extra synchronization.
pub(crate) async fn for_each_settled<T, Fut, F>(
    tasks: Vec<T>,
    concurrency: usize,
    run: F,
    mut on_settle: impl FnMut(Result<(), String>),
) where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let mut settling = stream::iter(tasks.into_iter().map(run)).buffer_unordered(concurrency.max(1));
    while let Some(result) = settling.next().await {
        on_settle(result);
    }
}

/// Dispatches the queued deliveries, reporting percent settled through
/// `on_progress`. Returns `(sent, failed)`.
pub(crate) async fn dispatch_all(
    mailer: &Mailer,
    subject: &str,
    body: &str,
    pending: Vec<PendingEmail>,
    concurrency: usize,
    mut on_progress: impl FnMut(u32),
) -> (usize, usize) {
    let total = pending.len();
    if total == 0 {
        return (0, 0);
    }
    let mut sent = 0usize;
    let mut failed = 0usize;
    let mut settled = 0usize;
    for_each_settled(
        pending,
        concurrency,
        |task| async move {
            mailer
                .send(&task, subject, body)
                .await
                .map_err(|e| format!("row {}: {}", task.row_index, e))
        },
        |result| {
            settled += 1;
            match result {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    log::warn!("Email delivery failed ({})", e);
                }
            }
            on_progress((settled * 100 / total) as u32);
        },
    )
    .await;
    (sent, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn permissive_email_shapes_pass() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.domain.org"));
    }

    #[test]
    fn obviously_broken_addresses_fail() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("no@tld"));
        assert!(!is_valid_email("spaces in@domain.com"));
        assert!(!is_valid_email("@missing-local.com"));
    }

    #[tokio::test]
    async fn at_most_three_tasks_are_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<usize> = (0..7).collect();

        let in_flight_ref = in_flight.clone();
        let peak_ref = peak.clone();
        let mut settled = 0;
        for_each_settled(
            tasks,
            3,
            move |_| {
                let in_flight = in_flight_ref.clone();
                let peak = peak_ref.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |result| {
                assert!(result.is_ok());
                settled += 1;
            },
        )
        .await;

        assert_eq!(settled, 7);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn one_failure_never_cancels_the_rest() {
        let mut outcomes = Vec::new();
        for_each_settled(
            (0..5).collect::<Vec<usize>>(),
            2,
            |i| async move {
                if i == 2 {
                    Err("boom".to_string())
                } else {
                    Ok(())
                }
            },
            |result| outcomes.push(result.is_ok()),
        )
        .await;
        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes.iter().filter(|ok| !**ok).count(), 1);
    }
}
