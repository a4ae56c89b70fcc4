//! Playback loader for reviewing recorded sessions
//!
//! Loads a recording wholesale into the buffer store. Columns are matched to
//! the configured channels by header name, so a file recorded with a
//! different channel order (or extra channels) still loads.

use std::path::Path;

use crate::error::{Result, SerialVisError};
use crate::store::ChannelBufferStore;

use super::types::{LoadSummary, LoadedChannel, FIELD_SEPARATOR};

/// Parsed recording, ready to be swapped into a store
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecording {
    /// One column per configured channel, in configured order
    pub columns: Vec<Vec<f64>>,
    /// What was loaded
    pub summary: LoadSummary,
}

/// Reads recordings into a [`ChannelBufferStore`]
#[derive(Debug, Clone)]
pub struct PlaybackLoader {
    channel_names: Vec<String>,
}

impl PlaybackLoader {
    /// Create a loader for the configured channels
    pub fn new(channel_names: Vec<String>) -> Self {
        Self { channel_names }
    }

    /// Configured channel names
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Load `path` into `store`
    ///
    /// The whole file is parsed before the store is touched: on error the
    /// store keeps its previous contents. On success it is cleared and filled
    /// with the complete recording, ignoring the live capacity bound.
    pub fn load(&self, path: impl AsRef<Path>, store: &ChannelBufferStore) -> Result<LoadSummary> {
        let loaded = self.read(path)?;
        store.clear();
        store.replace_unbounded(loaded.columns);
        tracing::info!(
            "Loaded {} samples from {:?}",
            loaded.summary.rows,
            loaded.summary.path
        );
        Ok(loaded.summary)
    }

    /// Read and parse a recording without touching any store
    pub fn read(&self, path: impl AsRef<Path>) -> Result<LoadedRecording> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SerialVisError::load(path, e.to_string()))?;
        self.parse(path, &content)
    }

    fn parse(&self, path: &Path, content: &str) -> Result<LoadedRecording> {
        let mut lines = content.lines();
        let header = lines
            .next()
            .map(|h| h.trim_start_matches('\u{feff}'))
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| SerialVisError::load(path, "file has no header row"))?;

        let header_fields: Vec<&str> = header.split(FIELD_SEPARATOR).map(str::trim).collect();
        let columns: Vec<Option<usize>> = self
            .channel_names
            .iter()
            .map(|name| header_fields.iter().position(|field| *field == name.trim()))
            .collect();

        if columns.iter().all(Option::is_none) {
            return Err(SerialVisError::load(
                path,
                format!(
                    "header {:?} does not name any of the channels {:?}",
                    header, self.channel_names
                ),
            ));
        }

        let mut data: Vec<Vec<f64>> = vec![Vec::new(); self.channel_names.len()];
        let mut skipped = vec![0usize; self.channel_names.len()];
        let mut rows = 0usize;

        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            rows += 1;
            let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

            for (channel, column) in columns.iter().enumerate() {
                let Some(column) = column else {
                    continue;
                };
                match fields.get(*column).map(|f| f.trim().parse::<f64>()) {
                    Some(Ok(value)) => data[channel].push(value),
                    _ => skipped[channel] += 1,
                }
            }
        }

        for (name, column) in self.channel_names.iter().zip(&columns) {
            if column.is_none() {
                tracing::warn!("Channel {:?} not found in {:?}", name, path);
            }
        }

        let channels = self
            .channel_names
            .iter()
            .zip(columns.iter())
            .zip(data.iter().zip(skipped.iter()))
            .map(|((name, column), (values, skipped))| LoadedChannel {
                name: name.clone(),
                column: *column,
                samples: values.len(),
                skipped: *skipped,
            })
            .collect();

        Ok(LoadedRecording {
            columns: data,
            summary: LoadSummary {
                path: path.to_path_buf(),
                rows,
                channels,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn loader() -> PlaybackLoader {
        PlaybackLoader::new(vec!["A6".to_string(), "A7".to_string()])
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_basic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.csv", "A6,A7\n1.0,2.0\n1.1,2.1\n");
        let store = ChannelBufferStore::new(loader().channel_names().to_vec(), 1);

        let summary = loader().load(&path, &store).unwrap();
        assert_eq!(summary.rows, 2);

        let snap = store.snapshot();
        assert_eq!(snap.channels[0].values, vec![1.0, 1.1]);
        assert_eq!(snap.channels[1].values, vec![2.0, 2.1]);
    }

    #[test]
    fn test_columns_matched_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "b.csv", "time,A7,A6\n0,7.0,6.0\n1,7.5,6.5\n");
        let store = ChannelBufferStore::new(loader().channel_names().to_vec(), 10);

        loader().load(&path, &store).unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.channel("A6").unwrap().values, vec![6.0, 6.5]);
        assert_eq!(snap.channel("A7").unwrap().values, vec![7.0, 7.5]);
    }

    #[test]
    fn test_malformed_value_skips_only_that_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "c.csv", "A6,A7\n1.0,oops\n2.0\n\n3.0,3.5\n");
        let store = ChannelBufferStore::new(loader().channel_names().to_vec(), 10);

        let summary = loader().load(&path, &store).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.skipped_values(), 2);

        let snap = store.snapshot();
        assert_eq!(snap.channels[0].values, vec![1.0, 2.0, 3.0]);
        assert_eq!(snap.channels[1].values, vec![3.5]);
    }

    #[test]
    fn test_missing_channel_loads_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "d.csv", "A6\n1.0\n2.0\n");
        let store = ChannelBufferStore::new(loader().channel_names().to_vec(), 10);

        let summary = loader().load(&path, &store).unwrap();
        assert_eq!(summary.missing_channels(), vec!["A7"]);
        assert_eq!(store.lengths(), vec![2, 0]);
    }

    #[test]
    fn test_unmatched_header_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "e.csv", "X,Y\n1.0,2.0\n");
        let store = ChannelBufferStore::new(loader().channel_names().to_vec(), 10);
        store.append(&[9.0, 9.5]);

        let err = loader().load(&path, &store).unwrap_err();
        assert!(matches!(err, SerialVisError::Load { .. }));
        assert_eq!(store.snapshot().channels[0].values, vec![9.0]);
    }

    #[test]
    fn test_missing_file_and_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChannelBufferStore::new(loader().channel_names().to_vec(), 10);

        let missing = dir.path().join("nope.csv");
        assert!(matches!(
            loader().load(&missing, &store),
            Err(SerialVisError::Load { .. })
        ));

        let empty = write_file(&dir, "empty.csv", "");
        assert!(matches!(
            loader().load(&empty, &store),
            Err(SerialVisError::Load { .. })
        ));
    }

    #[test]
    fn test_header_with_bom_and_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "f.csv", "\u{feff}A6,A7\r\n1.0,2.0\r\n");
        let store = ChannelBufferStore::new(loader().channel_names().to_vec(), 10);

        loader().load(&path, &store).unwrap();
        assert_eq!(store.snapshot().channels[1].values, vec![2.0]);
    }
}
