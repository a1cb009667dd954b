//! Best-effort platform detection for pasted video URLs.
//!
//! Pure substring heuristics: nothing is fetched.

use clap::ValueEnum;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    Youtube,
    Instagram,
    Twitter,
    Tiktok,
    #[default]
    Generic,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Tiktok => "tiktok",
            Platform::Generic => "generic",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoType {
    Short,
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedVideo {
    pub platform: Platform,
    pub video_type: VideoType,
    pub title: String,
}

const FALLBACK_TITLE: &str = "Amazing Travel Vlog - Hidden Gems of Japan | 4K Cinematic";
const DIRECT_EXTENSIONS: [&str; 3] = [".mp4", ".webm", ".mov"];

/// Filename of a direct video link, without its extension.
fn direct_file_title(url: &str) -> Option<String> {
    let file_name = url.rsplit('/').next().unwrap_or_default();

    DIRECT_EXTENSIONS.iter().find_map(|ext| {
        let split = file_name.len().checked_sub(ext.len())?;
        let (stem, tail) = (file_name.get(..split)?, file_name.get(split..)?);
        if !tail.eq_ignore_ascii_case(ext) {
            return None;
        }
        if stem.is_empty() {
            Some("Direct Video File".to_string())
        } else {
            Some(stem.to_string())
        }
    })
}

pub fn detect(url: &str) -> DetectedVideo {
    let (platform, video_type, title) = if url.contains("youtube") || url.contains("youtu.be") {
        if url.contains("/shorts/") {
            (Platform::Youtube, VideoType::Short, "YouTube Short - Viral Clip".to_string())
        } else {
            (Platform::Youtube, VideoType::Long, "YouTube Video Content".to_string())
        }
    } else if url.contains("instagram") {
        let video_type = if url.contains("/reel/") {
            VideoType::Short
        } else {
            VideoType::Long
        };
        (Platform::Instagram, video_type, "Instagram Reel".to_string())
    } else if url.contains("tiktok") {
        (Platform::Tiktok, VideoType::Short, "TikTok Trending Video".to_string())
    } else if url.contains("twitter") || url.contains("x.com") {
        (Platform::Twitter, VideoType::Long, "X (Twitter) Video".to_string())
    } else if let Some(title) = direct_file_title(url) {
        (Platform::Generic, VideoType::Long, title)
    } else {
        (Platform::Generic, VideoType::Long, FALLBACK_TITLE.to_string())
    };

    DetectedVideo {
        platform,
        video_type,
        title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_shorts_are_short() {
        let video = detect("https://www.youtube.com/shorts/abc123");
        assert_eq!(video.platform, Platform::Youtube);
        assert_eq!(video.video_type, VideoType::Short);
        assert_eq!(video.title, "YouTube Short - Viral Clip");

        let video = detect("https://youtu.be/abc123");
        assert_eq!(video.video_type, VideoType::Long);
        assert_eq!(video.title, "YouTube Video Content");
    }

    #[test]
    fn social_platforms() {
        let reel = detect("https://www.instagram.com/reel/xyz/");
        assert_eq!((reel.platform, reel.video_type), (Platform::Instagram, VideoType::Short));

        let tiktok = detect("https://www.tiktok.com/@user/video/1");
        assert_eq!(tiktok.platform, Platform::Tiktok);
        assert_eq!(tiktok.title, "TikTok Trending Video");

        let tweet = detect("https://x.com/user/status/1");
        assert_eq!(tweet.platform, Platform::Twitter);
    }

    #[test]
    fn direct_links_use_file_name() {
        let video = detect("https://cdn.example.org/media/Sunset_Timelapse.MP4");
        assert_eq!(video.platform, Platform::Generic);
        assert_eq!(video.title, "Sunset_Timelapse");
    }

    #[test]
    fn unknown_urls_fall_back() {
        let video = detect("https://example.org/watch?v=1");
        assert_eq!(video.platform, Platform::Generic);
        assert_eq!(video.title, FALLBACK_TITLE);
    }
}
