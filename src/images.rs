// 🖼️ Image References
// Sheets store Drive share links; those pages are not images. Rewrite them
// to the thumbnail endpoint so the link opens the picture itself.

use lazy_static::lazy_static;
use regex::Regex;

const THUMBNAIL_WIDTH: &str = "w800";

lazy_static! {
    /// https://drive.google.com/file/d/FILE_ID/view?usp=drivesdk
    static ref DRIVE_VIEW_PATTERN: Regex =
        Regex::new(r"/file/d/([a-zA-Z0-9_-]+)/view").unwrap();

    /// https://drive.google.com/open?id=FILE_ID
    static ref DRIVE_ID_PARAM_PATTERN: Regex =
        Regex::new(r"[?&]id=([a-zA-Z0-9_-]+)").unwrap();
}

/// Drive file id embedded in a share link, if any
pub fn drive_file_id(url: &str) -> Option<String> {
    if !url.contains("drive.google.com") {
        return None;
    }

    // An explicit id= parameter takes precedence over the path form
    DRIVE_ID_PARAM_PATTERN
        .captures(url)
        .or_else(|| DRIVE_VIEW_PATTERN.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Direct image URL for an entry's before/after reference
pub fn direct_image_url(url: &str) -> String {
    match drive_file_id(url) {
        Some(id) => format!(
            "https://drive.google.com/thumbnail?id={}&sz={}",
            id, THUMBNAIL_WIDTH
        ),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_link_rewritten() {
        assert_eq!(
            direct_image_url("https://drive.google.com/file/d/1AbC_d-9/view?usp=drivesdk"),
            "https://drive.google.com/thumbnail?id=1AbC_d-9&sz=w800"
        );
    }

    #[test]
    fn test_open_link_rewritten() {
        assert_eq!(
            direct_image_url("https://drive.google.com/open?id=XYZ123"),
            "https://drive.google.com/thumbnail?id=XYZ123&sz=w800"
        );
    }

    #[test]
    fn test_other_urls_untouched() {
        let url = "https://images.pexels.com/photos/5668473/pexels-photo-5668473.jpeg";
        assert_eq!(direct_image_url(url), url);
        assert_eq!(direct_image_url(""), "");
        assert_eq!(direct_image_url("https://drive.google.com/drive/folders"), "https://drive.google.com/drive/folders");
    }
}
