//! Background page decoding for the terminal host.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use image::DynamicImage;

use super::{LoadError, LoadRequest};

/// Result of one dispatched load.
#[derive(Debug)]
pub struct LoadCompletion {
    pub src: String,
    pub result: Result<Arc<DynamicImage>, LoadError>,
}

/// Decodes pages from the local filesystem on short-lived worker threads.
///
/// The number of concurrent workers is bounded by the cache that issues the
/// requests, not by the loader.
pub struct ThreadedLoader {
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,
}

impl Default for ThreadedLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadedLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// Start decoding a page in the background.
    pub fn dispatch(&self, request: LoadRequest) {
        let tx = self.tx.clone();
        crate::perf::log_event("loader.dispatch", &request.src);
        thread::spawn(move || {
            let result = load_page(&request.src);
            let _ = tx.send(LoadCompletion {
                src: request.src,
                result,
            });
        });
    }

    /// Collect every completion that has arrived since the last poll.
    pub fn poll(&self) -> Vec<LoadCompletion> {
        self.rx.try_iter().collect()
    }
}

/// Decode a page synchronously.
///
/// # Errors
/// Returns [`LoadError::Unsupported`] for remote URLs and
/// [`LoadError::Decode`] when the file cannot be read or decoded.
pub fn load_page(src: &str) -> Result<Arc<DynamicImage>, LoadError> {
    if src.contains("://") {
        return Err(LoadError::Unsupported(src.to_string()));
    }
    image::open(Path::new(src))
        .map(Arc::new)
        .map_err(|source| LoadError::Decode {
            src: src.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use std::time::{Duration, Instant};

    #[test]
    fn test_load_page_rejects_remote_urls() {
        let err = load_page("https://example.com/p.png").unwrap_err();
        assert!(matches!(err, LoadError::Unsupported(_)));
    }

    #[test]
    fn test_load_page_reports_missing_file() {
        let err = load_page("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn test_dispatch_delivers_decoded_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbaImage::from_pixel(4, 6, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let loader = ThreadedLoader::new();
        let src = path.to_string_lossy().into_owned();
        loader.dispatch(LoadRequest { src: src.clone() });

        let deadline = Instant::now() + Duration::from_secs(5);
        let completion = loop {
            if let Some(done) = loader.poll().pop() {
                break done;
            }
            assert!(Instant::now() < deadline, "load never completed");
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(completion.src, src);
        assert_eq!(completion.result.unwrap().dimensions(), (4, 6));
    }
}
