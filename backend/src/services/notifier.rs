//! Out-of-band delivery of one-time passcodes.

use async_trait::async_trait;

/// Delivers a passcode to the owner of an email address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpNotifier: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> anyhow::Result<()>;
}

/// Notifier that only records the dispatch in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl OtpNotifier for TracingNotifier {
    async fn send_code(&self, email: &str, code: &str) -> anyhow::Result<()> {
        tracing::info!(
            email = %mask_email(email),
            code_length = code.len(),
            "One-time passcode ready for delivery"
        );
        Ok(())
    }
}

/// Keeps the first character of the local part and the domain.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[test]
    fn mask_email_hides_local_part() {
        assert_eq!(mask_email("alice@example.com"), "a***@example.com");
        assert_eq!(mask_email("@example.com"), "***@example.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn tracing_notifier_never_logs_the_code_or_address() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        assert!(TracingNotifier
            .send_code("user@test.com", "482913")
            .await
            .is_ok());

        let output = String::from_utf8(captured.0.lock().expect("log buffer").clone())
            .expect("utf8 log output");
        assert!(output.contains("u***@test.com"));
        assert!(!output.contains("482913"));
        assert!(!output.contains("user@test.com"));
    }
}
