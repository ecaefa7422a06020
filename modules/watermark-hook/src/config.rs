use std::env;

const DEFAULT_ENVIRONMENT: &str = "master";
const DEFAULT_LOCALE: &str = "es";

/// Hook configuration, read once at cold start and handed to the handler.
///
/// Missing values are not rejected here; an empty token or space id makes the
/// Contentful calls fail, which the handler reports like any other error.
#[derive(Debug, Clone)]
pub struct HookConfig {
    pub space_id: String,
    pub cma_access_token: String,
    pub watermark_image_url: String,
    pub environment_id: String,
    pub locale: String,
}

impl HookConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let config = Self {
            space_id: env::var("SPACE_ID").unwrap_or_default(),
            cma_access_token: env::var("CMA_ACCESS_TOKEN").unwrap_or_default(),
            watermark_image_url: env::var("WATERMARK_IMAGE_URL").unwrap_or_default(),
            environment_id: env::var("CONTENTFUL_ENVIRONMENT")
                .unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string()),
            locale: env::var("CONTENTFUL_LOCALE").unwrap_or_else(|_| DEFAULT_LOCALE.to_string()),
        };

        config.log_keys();
        config
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  SPACE_ID: {}", preview(&self.space_id));
        tracing::info!("  CMA_ACCESS_TOKEN: {}", preview(&self.cma_access_token));
        tracing::info!("  WATERMARK_IMAGE_URL: {}", self.watermark_image_url);
        tracing::info!("  CONTENTFUL_ENVIRONMENT: {}", self.environment_id);
        tracing::info!("  CONTENTFUL_LOCALE: {}", self.locale);
    }
}

/// First five characters and the total character count.
fn preview(val: &str) -> String {
    if val.is_empty() {
        return "<not set>".to_string();
    }
    let n = val.chars().take(5).map(char::len_utf8).sum::<usize>();
    format!("{}...({} chars)", &val[..n], val.chars().count())
}
