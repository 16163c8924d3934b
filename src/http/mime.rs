//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

/// Get MIME Content-Type based on file extension
///
/// Only the types the CDN serves are recognised; everything else is sent as
/// opaque bytes.
///
/// # Examples
/// ```
/// use cdn_server::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("pdf")), "application/pdf");
/// assert_eq!(get_content_type(Some("JPG")), "image/jpeg");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return "application/octet-stream";
    };

    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types() {
        assert_eq!(get_content_type(Some("jpg")), "image/jpeg");
        assert_eq!(get_content_type(Some("jpeg")), "image/jpeg");
        assert_eq!(get_content_type(Some("png")), "image/png");
        assert_eq!(get_content_type(Some("pdf")), "application/pdf");
    }

    #[test]
    fn test_extension_case_ignored() {
        assert_eq!(get_content_type(Some("PNG")), "image/png");
        assert_eq!(get_content_type(Some("Pdf")), "application/pdf");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("html")), "application/octet-stream");
        assert_eq!(get_content_type(Some("txt")), "application/octet-stream");
        assert_eq!(get_content_type(None), "application/octet-stream");
    }
}
