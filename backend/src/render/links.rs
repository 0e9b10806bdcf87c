//! Download links for catalogue files.

use url::Url;

/// How a data or metadata file can be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessProtocol {
    Ftp,
    Pydap,
}

impl AccessProtocol {
    pub const ALL: [AccessProtocol; 2] = [AccessProtocol::Ftp, AccessProtocol::Pydap];

    /// Link title shown to clients.
    pub fn title(self) -> &'static str {
        match self {
            AccessProtocol::Ftp => "ftp",
            AccessProtocol::Pydap => "pydap",
        }
    }
}

/// Append the segments of `path` to the path of `site`, ignoring empty
/// segments and a leading slash.
pub fn urljoin_path(site: &str, path: &str) -> String {
    let segments = path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();
    if let Ok(mut url) = Url::parse(site) {
        if let Ok(mut path_segments) = url.path_segments_mut() {
            path_segments.pop_if_empty().extend(&segments);
        }
        return url.to_string();
    }
    tracing::debug!("not an absolute url: {}", site);
    format!("{}/{}", site.trim_end_matches('/'), segments.join("/"))
}

/// `directory/file_name`, as stored in the record.
pub fn file_path(directory: Option<&str>, file_name: &str) -> String {
    match directory {
        Some(directory) if !directory.is_empty() => {
            format!("{}/{}", directory.trim_end_matches('/'), file_name)
        }
        _ => file_name.to_string(),
    }
}

/// Mime type from the file extension, if known.
pub fn mime_type(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_lowercase();
    let mime = match extension.as_str() {
        "zip" => "application/zip",
        "json" => "application/json",
        "xml" => "text/xml",
        "gml" => "application/gml+xml",
        "kml" => "application/vnd.google-earth.kml+xml",
        "nc" => "application/x-netcdf",
        "hdf" | "h5" => "application/x-hdf",
        "tar" => "application/x-tar",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        _ => {
            tracing::warn!("Unable to discover mime type for {}", extension);
            return None;
        }
    };
    Some(mime)
}
