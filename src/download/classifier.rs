//! URL classification: script-runtime hosts and direct media links

use url::Url;

use crate::core::config::AppConfig;

/// Decides how a URL is handled, driven entirely by configuration
#[derive(Debug, Clone)]
pub struct DomainClassifier {
    script_runtime_domains: Vec<String>,
    direct_media_extensions: Vec<String>,
}

impl DomainClassifier {
    pub fn new<D, E>(script_runtime_domains: D, direct_media_extensions: E) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            script_runtime_domains: script_runtime_domains
                .into_iter()
                .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            direct_media_extensions: direct_media_extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.script_runtime_domains, &config.direct_media_extensions)
    }

    /// Host equals an allow-listed domain or is a subdomain of one
    pub fn needs_script_runtime(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.script_runtime_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    }

    /// Path (query and fragment excluded) ends with a direct container extension
    pub fn is_direct_media(&self, url: &Url) -> bool {
        self.direct_media_extension(url).is_some()
    }

    /// The matched container extension, lowercased
    pub fn direct_media_extension(&self, url: &Url) -> Option<&str> {
        let path = url.path().to_ascii_lowercase();
        self.direct_media_extensions
            .iter()
            .find(|ext| path.ends_with(&format!(".{}", ext)))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> DomainClassifier {
        DomainClassifier::from_config(&AppConfig::default())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_needs_script_runtime_for_allow_listed_hosts() {
        let c = classifier();
        for u in [
            "https://youtube.com/watch?v=abc",
            "https://www.youtube.com/watch?v=abc",
            "https://m.youtube.com/watch?v=abc",
            "https://music.youtube.com/watch?v=abc",
            "https://youtu.be/abc",
            "https://www.youtube-nocookie.com/embed/abc",
            "https://WWW.YOUTUBE.COM/watch?v=abc",
        ] {
            assert!(c.needs_script_runtime(&url(u)), "expected runtime for {}", u);
        }
    }

    #[test]
    fn test_no_script_runtime_for_lookalikes() {
        let c = classifier();
        for u in [
            "https://vimeo.com/12345",
            "https://notyoutube.com/watch?v=abc",
            "https://youtube.com.evil.org/watch?v=abc",
            "https://example.com/?next=youtube.com",
        ] {
            assert!(!c.needs_script_runtime(&url(u)), "unexpected runtime for {}", u);
        }
    }

    #[test]
    fn test_is_direct_media() {
        let c = classifier();
        assert!(c.is_direct_media(&url("https://cdn.example.com/clip.mp4")));
        assert!(c.is_direct_media(&url("https://cdn.example.com/clip.WEBM?sig=1")));
        assert!(c.is_direct_media(&url("https://cdn.example.com/a/b/film.mkv#t=10")));
        assert!(!c.is_direct_media(&url("https://cdn.example.com/page")));
        assert!(!c.is_direct_media(&url("https://cdn.example.com/song.mp3")));
        assert!(!c.is_direct_media(&url("https://example.com/watch?file=clip.mp4")));
        assert!(!c.is_direct_media(&url("https://example.com/mp4")));
        assert_eq!(
            c.direct_media_extension(&url("https://cdn.example.com/clip.WebM")),
            Some("webm")
        );
    }

    #[test]
    fn test_custom_lists() {
        let c = DomainClassifier::new(["Example.org"], [".MOV"]);
        assert!(c.needs_script_runtime(&url("https://video.example.org/x")));
        assert!(c.is_direct_media(&url("https://a.b/c.mov")));
        assert!(!c.is_direct_media(&url("https://a.b/c.mp4")));
    }
}
