use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use pictor_engine::ImportSettings;

use crate::error::ImportError;

/// Where an import payload comes from.
///
/// `fetch` blocks; the importer runs it on the blocking pool.
pub trait ImportSource: Send + 'static {
    /// Imports sharing a key are applied in the order they were spawned.
    fn key(&self) -> String;

    fn fetch(&self) -> Result<Vec<u8>, ImportError>;
}

impl<S: ImportSource + ?Sized> ImportSource for Box<S> {
    fn key(&self) -> String {
        (**self).key()
    }

    fn fetch(&self) -> Result<Vec<u8>, ImportError> {
        (**self).fetch()
    }
}

/// `http(s)://` URLs are fetched over the network, anything else is a file path.
pub fn source_for(location: &str, settings: &ImportSettings) -> Box<dyn ImportSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location, settings))
    } else {
        Box::new(FileSource::new(location, settings))
    }
}

/// A document served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, settings: &ImportSettings) -> Self {
        Self {
            url: url.into(),
            timeout: settings.timeout(),
            max_bytes: settings.max_payload_bytes,
        }
    }

    fn network_error(&self, err: ureq::Error) -> ImportError {
        match err {
            ureq::Error::BodyExceedsLimit(limit) => ImportError::TooLarge {
                size: limit.saturating_add(1),
                limit,
            },
            other => ImportError::Network {
                url: self.url.clone(),
                message: other.to_string(),
            },
        }
    }
}

impl ImportSource for HttpSource {
    fn key(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, ImportError> {
        log::info!("fetching {}", self.url);
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .into();
        let mut response = agent.get(&self.url).call().map_err(|e| self.network_error(e))?;
        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_bytes)
            .read_to_vec()
            .map_err(|e| self.network_error(e))?;
        log::debug!("fetched {} bytes from {}", bytes.len(), self.url);
        Ok(bytes)
    }
}

/// A document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    max_bytes: u64,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, settings: &ImportSettings) -> Self {
        Self {
            path: path.into(),
            max_bytes: settings.max_payload_bytes,
        }
    }
}

impl ImportSource for FileSource {
    fn key(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, ImportError> {
        let io = |source| ImportError::Io {
            path: self.path.clone(),
            source,
        };
        let file = std::fs::File::open(&self.path).map_err(io)?;
        let size = file.metadata().map_err(io)?.len();
        if size > self.max_bytes {
            return Err(ImportError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        let mut bytes = Vec::with_capacity(size as usize);
        file.take(self.max_bytes).read_to_end(&mut bytes).map_err(io)?;
        Ok(bytes)
    }
}

/// An in-memory payload.
#[derive(Debug, Clone)]
pub struct BytesSource {
    name: String,
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl ImportSource for BytesSource {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, ImportError> {
        Ok(self.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_pick_a_source() {
        let settings = ImportSettings::default();
        assert_eq!(source_for("https://example.com/a.json", &settings).key(), "https://example.com/a.json");
        assert_eq!(source_for("docs/a.json", &settings).key(), "docs/a.json");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let src = FileSource::new("/definitely/not/here.json", &ImportSettings::default());
        assert!(matches!(src.fetch(), Err(ImportError::Io { .. })));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("pictor-import-{}.json", std::process::id()));
        std::fs::write(&path, vec![b' '; 64]).unwrap();
        let settings = ImportSettings {
            max_payload_bytes: 16,
            ..ImportSettings::default()
        };
        let result = FileSource::new(&path, &settings).fetch();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ImportError::TooLarge { size: 64, limit: 16 })));
    }

    #[test]
    fn unreachable_host_is_a_network_error() {
        let settings = ImportSettings {
            timeout_secs: 2,
            ..ImportSettings::default()
        };
        let src = HttpSource::new("http://127.0.0.1:9/doc.json", &settings);
        assert!(matches!(src.fetch(), Err(ImportError::Network { .. })));
    }
}
