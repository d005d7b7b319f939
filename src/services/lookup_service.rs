//! Company lookup service - capability layer
//!
//! Turns one company name into `CompanyData`: build the prompt, ask the
//! configured backend, parse the answer. Transient failures are retried with
//! exponential backoff; terminal ones are returned immediately.

use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::{GeminiClient, LlmClient};
use crate::config::{Config, LookupBackend};
use crate::error::LookupError;
use crate::models::company::CompanyData;
use crate::services::response_parser::{parse_answer, RawAnswer};

/// Anything that can look a company up by name
///
/// The batch controller only sees this trait, so tests can drive it with a
/// scripted fake.
pub trait CompanyLookup: Send + Sync {
    fn lookup<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<CompanyData, LookupError>>;
}

/// Backoff schedule for transient errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry; doubled for each later one
    pub base_delay: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(2000),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_retries: config.max_retries,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Run `op`, retrying transient errors per `policy`
///
/// # Arguments
/// * `policy` - retry count and base delay; the n-th retry waits `base * 2^(n-1)`
/// * `label` - name used in the retry log lines
/// * `op` - builds a fresh attempt each call
///
/// # Errors
/// A terminal error at once, or the last transient error once retries run out.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, LookupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LookupError>>,
{
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && retries < policy.max_retries => {
                retries += 1;
                let delay = policy.delay_for(retries);
                warn!(
                    "⚠️ [{}] API busy ({}), retrying in {} ms ({}/{})",
                    label,
                    err,
                    delay.as_millis(),
                    retries,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

const SYSTEM_MESSAGE: &str = "Bạn là trợ lý tra cứu thông tin doanh nghiệp Việt Nam. \
                              Chỉ trả lời đúng định dạng được yêu cầu, không thêm lời dẫn.";

/// Lookup prompt for one company
pub fn build_prompt(company_name: &str) -> String {
    format!(
        r#"Tìm "Mã số thuế" (Tax Code) và "Website/Domain" chính thức của công ty: "{}" tại Việt Nam.

Yêu cầu:
- Ưu tiên nguồn: Tổng cục thuế, Masothue, Hosocongty.
- Domain: Phải là trang chủ chính thức (bỏ qua trang tuyển dụng, trang vàng). Chuyển về dạng @domain.com.

Trả về ĐÚNG định dạng sau (không thêm lời dẫn):
MST: [Mã số hoặc "Không tìm thấy"]
DOMAIN: [Domain dạng @domain.com hoặc "Không tìm thấy"]
TOMTAT: [Mô tả ngành nghề ngắn gọn dưới 20 từ]"#,
        company_name.trim()
    )
}

enum Backend {
    Gemini(GeminiClient),
    OpenAi(LlmClient),
}

/// Lookup over the configured backend
pub struct LookupService {
    backend: Backend,
    retry: RetryPolicy,
}

impl LookupService {
    pub fn new(config: &Config) -> Result<Self, LookupError> {
        let backend = match config.backend {
            LookupBackend::Gemini => Backend::Gemini(GeminiClient::new(config)?),
            LookupBackend::OpenAi => Backend::OpenAi(LlmClient::new(config)),
        };
        Ok(Self {
            backend,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// `backend/model`, for logs
    pub fn describe(&self) -> String {
        match &self.backend {
            Backend::Gemini(client) => format!("gemini/{}", client.model_name()),
            Backend::OpenAi(client) => format!("openai/{}", client.model_name()),
        }
    }

    /// Look one company up, with retries
    pub async fn search(&self, company_name: &str) -> Result<CompanyData, LookupError> {
        let prompt = build_prompt(company_name);
        debug!("Looking up: {}", company_name);

        let answer = with_backoff(&self.retry, company_name, || self.ask(&prompt)).await?;
        Ok(parse_answer(company_name, answer))
    }

    async fn ask(&self, prompt: &str) -> Result<RawAnswer, LookupError> {
        match &self.backend {
            Backend::Gemini(client) => client.grounded_search(prompt).await,
            Backend::OpenAi(client) => client.ask(prompt, SYSTEM_MESSAGE).await,
        }
    }
}

impl CompanyLookup for LookupService {
    fn lookup<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<CompanyData, LookupError>> {
        Box::pin(self.search(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_retries: 3,
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result = with_backoff(&fast_policy(), "test", move || async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(LookupError::Transient("Server overloaded or timed out".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result: Result<(), _> = with_backoff(&fast_policy(), "test", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(LookupError::Transient("429".into()))
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result: Result<(), _> = with_backoff(&fast_policy(), "test", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(LookupError::Terminal("API key not valid".into()))
        })
        .await;

        assert_eq!(result, Err(LookupError::Terminal("API key not valid".into())));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prompt_names_company_and_format() {
        let prompt = build_prompt("  Công ty Cổ phần Sữa Việt Nam ");
        assert!(prompt.contains("\"Công ty Cổ phần Sữa Việt Nam\""));
        assert!(prompt.contains("MST:"));
        assert!(prompt.contains("DOMAIN:"));
        assert!(prompt.contains("TOMTAT:"));
    }

    #[tokio::test]
    #[ignore] // needs GEMINI_API_KEY: cargo test -- --ignored
    async fn test_live_lookup() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env().unwrap();
        let service = LookupService::new(&config).unwrap();
        let data = service.lookup("Công ty Cổ phần Sữa Việt Nam").await.unwrap();
        assert!(!data.summary.is_empty());
    }
}
