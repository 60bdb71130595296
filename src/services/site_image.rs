//! Site images
//!
//! Named image slots the public pages render. The public map of
//! `key -> url` is cached until an admin changes a slot.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{keys, MemoryCache};
use crate::db::repositories::SiteImageRepository;
use crate::models::SiteImage;
use crate::services::validation::non_blank;

const MAX_KEY_LENGTH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum SiteImageError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Image not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Slot names are short, lowercase and URL-safe
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

pub struct SiteImageService {
    repo: Arc<dyn SiteImageRepository>,
    cache: Arc<MemoryCache>,
}

impl SiteImageService {
    pub fn new(repo: Arc<dyn SiteImageRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    /// Every assigned slot as `key -> url`
    pub async fn url_map(&self) -> Result<BTreeMap<String, String>, SiteImageError> {
        self.cache
            .get_or_load(keys::SITE_IMAGES, || async {
                let images = self.repo.list().await?;
                Ok::<_, SiteImageError>(images.into_iter().map(|img| (img.key, img.url)).collect())
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<SiteImage>, SiteImageError> {
        Ok(self.repo.list().await?)
    }

    pub async fn set(
        &self,
        key: &str,
        url: &str,
        alt_text: Option<String>,
    ) -> Result<SiteImage, SiteImageError> {
        if !is_valid_key(key) {
            return Err(SiteImageError::ValidationError(
                "Key must be lowercase letters, digits, '-' or '_'".to_string(),
            ));
        }
        let url = url.trim();
        if url.is_empty() {
            return Err(SiteImageError::ValidationError("URL cannot be empty".to_string()));
        }
        if !(url.starts_with('/') || url.starts_with("https://") || url.starts_with("http://")) {
            return Err(SiteImageError::ValidationError(
                "URL must be absolute or site-relative".to_string(),
            ));
        }

        let alt_text = non_blank(alt_text);
        let image = self.repo.upsert(key, url, alt_text.as_deref()).await?;
        self.cache.delete(keys::SITE_IMAGES).await;
        Ok(image)
    }

    pub async fn delete(&self, key: &str) -> Result<(), SiteImageError> {
        if !self.repo.delete(key).await? {
            return Err(SiteImageError::NotFound);
        }
        self.cache.delete(keys::SITE_IMAGES).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSiteImageRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SiteImageService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SiteImageService::new(SqlxSiteImageRepository::boxed(pool), Arc::new(MemoryCache::new()))
    }

    #[test]
    fn test_key_rules() {
        assert!(is_valid_key("hero"));
        assert!(is_valid_key("about_2-main"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("Hero"));
        assert!(!is_valid_key("a/b"));
        assert!(!is_valid_key(&"a".repeat(65)));
    }

    #[tokio::test]
    async fn test_map_follows_writes() {
        let service = setup().await;
        assert!(service.url_map().await.unwrap().is_empty());

        service.set("hero", "/uploads/1-2.jpg", None).await.unwrap();
        assert_eq!(service.url_map().await.unwrap()["hero"], "/uploads/1-2.jpg");

        service
            .set("hero", "/uploads/3-4.jpg", Some("Front door".into()))
            .await
            .unwrap();
        assert_eq!(service.url_map().await.unwrap()["hero"], "/uploads/3-4.jpg");

        service.delete("hero").await.unwrap();
        assert!(service.url_map().await.unwrap().is_empty());
        assert!(matches!(service.delete("hero").await, Err(SiteImageError::NotFound)));
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let service = setup().await;
        assert!(service.set("Hero", "/a.jpg", None).await.is_err());
        assert!(service.set("hero", "  ", None).await.is_err());
        assert!(service.set("hero", "javascript:alert(1)", None).await.is_err());
    }
}
