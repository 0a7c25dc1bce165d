//! Snapshot persistence.
//!
//! A snapshot is the whole entry map (`HashMap<String, Entry<V>>`) encoded
//! with bincode. There is no header or version field; the value type `V`
//! fixes the schema at compile time.
//!
//! ## Loading
//!
//! Loading decodes the full stream first and only then takes the write
//! lock. A snapshot entry is merged only when the destination already
//! holds a live entry under the same key; keys that are absent or expired
//! in the destination are skipped.

use crate::error::{CacheError, Result};
use crate::storage::engine::{EntryMap, Store};
use crate::storage::entry::now_nanos;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

impl<V: Serialize> Store<V> {
    /// Encodes the entry map under the read lock.
    fn encode(&self) -> Result<(Vec<u8>, usize)> {
        let entries = self.read_entries();
        let buf = bincode::serialize(&*entries).map_err(CacheError::Serialization)?;
        Ok((buf, entries.len()))
    }

    /// Encodes every stored entry into `writer`.
    ///
    /// The map is encoded into memory under the read lock before any byte
    /// reaches `writer`, so an encoding failure writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialization`] if encoding or writing fails.
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        let (buf, entries) = self.encode()?;

        writer
            .write_all(&buf)
            .and_then(|()| writer.flush())
            .map_err(|e| CacheError::Serialization(e.into()))?;

        debug!(entries = entries, bytes = buf.len(), "Snapshot saved");
        Ok(())
    }

    /// Saves a snapshot to `path`.
    ///
    /// The snapshot is written to a temporary file next to `path`, synced,
    /// and then renamed over it. If encoding or writing fails, an existing
    /// file at `path` is left as it was.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let (buf, entries) = self.encode()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&buf)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(io::Error::from)?;

        debug!(entries = entries, bytes = buf.len(), path = %path.display(), "Snapshot file written");
        Ok(())
    }
}

impl<V: DeserializeOwned> Store<V> {
    /// Decodes a snapshot from `reader` and merges it into this store.
    ///
    /// The stream is read to the end before decoding, so every length
    /// prefix is checked against the bytes actually present.
    ///
    /// # Returns
    ///
    /// Returns the number of entries that were overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Deserialization`] on malformed or truncated
    /// input, or if reading the stream fails, in which case the store is
    /// left unchanged.
    pub fn load<R: Read>(&self, mut reader: R) -> Result<usize> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| CacheError::Deserialization(e.into()))?;

        let decoded: EntryMap<V> =
            bincode::deserialize(&buf).map_err(CacheError::Deserialization)?;
        let total = decoded.len();

        let now = now_nanos();
        let mut entries = self.write_entries();
        let mut merged = 0;

        for (key, entry) in decoded {
            if let Some(existing) = entries.get_mut(&key) {
                if !existing.is_expired(now) {
                    *existing = entry;
                    merged += 1;
                }
            }
        }

        debug!(decoded = total, merged = merged, "Snapshot loaded");
        Ok(merged)
    }

    /// Loads and merges a snapshot from the file at `path`.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let file = File::open(path.as_ref())?;
        self.load(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Entry, Ttl, Value, NO_EXPIRATION};
    use serde::ser::{self, Serializer};
    use std::io::{self, Cursor};
    use std::thread;
    use std::time::Duration;

    fn populated() -> Store<Value> {
        let store = Store::new(Duration::ZERO);
        store.set("int", Value::from(42), NO_EXPIRATION);
        store.set("text", Value::from("hello world"), Ttl::After(Duration::from_secs(60)));
        store.set(
            "list",
            Value::List(vec![Value::Bool(true), Value::Float(1.5), Value::Null]),
            NO_EXPIRATION,
        );
        store
    }

    fn snapshot_of<V: Serialize>(store: &Store<V>) -> Vec<u8> {
        let mut buf = Vec::new();
        store.save(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_round_trip_into_existing_keys() {
        let source = populated();
        let buf = snapshot_of(&source);

        let dest = Store::new(Duration::ZERO);
        dest.set("int", Value::from(0), NO_EXPIRATION);
        dest.set("text", Value::Null, NO_EXPIRATION);
        dest.set("list", Value::Null, NO_EXPIRATION);

        let merged = dest.load(Cursor::new(buf)).unwrap();
        assert_eq!(merged, 3);

        for key in ["int", "text", "list"] {
            assert_eq!(dest.get_entry(key), source.get_entry(key));
        }
    }

    #[test]
    fn test_load_skips_absent_keys() {
        let buf = snapshot_of(&populated());

        let dest: Store<Value> = Store::new(Duration::ZERO);
        dest.set("int", Value::from(7), NO_EXPIRATION);

        assert_eq!(dest.load(Cursor::new(buf)).unwrap(), 1);
        assert_eq!(dest.get("int"), Some(Value::Int(42)));
        assert_eq!(dest.get("text"), None);
        assert_eq!(dest.count(), 1);
    }

    #[test]
    fn test_load_skips_expired_keys() {
        let buf = snapshot_of(&populated());

        let dest: Store<Value> = Store::new(Duration::ZERO);
        dest.set("int", Value::from(7), Ttl::After(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));

        assert_eq!(dest.load(Cursor::new(buf)).unwrap(), 0);
        assert_eq!(dest.get("int"), None);
        assert_eq!(dest.get_entry("int"), None);
    }

    #[test]
    fn test_load_truncated_leaves_store_unchanged() {
        let buf = snapshot_of(&populated());

        let dest: Store<Value> = Store::new(Duration::ZERO);
        dest.set("int", Value::from(7), NO_EXPIRATION);

        let err = dest.load(Cursor::new(&buf[..buf.len() / 2])).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
        assert_eq!(dest.get("int"), Some(Value::Int(7)));
    }

    #[test]
    fn test_load_garbage() {
        let dest: Store<Value> = Store::new(Duration::ZERO);
        let err = dest.load(Cursor::new(vec![0xff; 3])).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[test]
    fn test_empty_store_round_trip() {
        let source: Store<Value> = Store::new(Duration::ZERO);
        let buf = snapshot_of(&source);

        let dest: Store<Value> = Store::new(Duration::ZERO);
        assert_eq!(dest.load(Cursor::new(buf)).unwrap(), 0);
    }

    #[test]
    fn test_expiration_deadline_survives() {
        let source = Store::new(Duration::ZERO);
        source.set("k", 1u32, Ttl::After(Duration::from_millis(40)));
        let buf = snapshot_of(&source);

        let dest = Store::new(Duration::ZERO);
        dest.set("k", 0u32, NO_EXPIRATION);
        dest.load(Cursor::new(buf)).unwrap();

        assert_eq!(dest.get("k"), Some(1));
        thread::sleep(Duration::from_millis(60));
        assert_eq!(dest.get("k"), None);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_save_write_failure() {
        let err = populated().save(FailingWriter).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[derive(Clone)]
    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(ser::Error::custom("payload refuses to encode"))
        }
    }

    #[test]
    fn test_encode_failure_writes_nothing() {
        let store = Store::new(Duration::ZERO);
        store.set("bad", Unencodable, NO_EXPIRATION);

        let mut buf = Vec::new();
        let err = store.save(&mut buf).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_oversized_length_prefix_is_rejected() {
        // One map entry whose key claims to be 16 TiB long
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u64.to_le_bytes());
        buf.extend_from_slice(&(1u64 << 44).to_le_bytes());
        buf.extend_from_slice(b"abc");

        let dest: Store<Value> = Store::new(Duration::ZERO);
        dest.set("abc", Value::from(1), NO_EXPIRATION);

        let err = dest.load(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
        assert_eq!(dest.get("abc"), Some(Value::Int(1)));
    }

    #[test]
    fn test_oversized_length_prefix_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.bin");

        let mut buf = Vec::new();
        buf.extend_from_slice(&1u64.to_le_bytes());
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(&path, buf).unwrap();

        let dest: Store<Value> = Store::new(Duration::ZERO);
        let err = dest.load_from_file(&path).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[test]
    fn test_failed_file_save_keeps_previous_snapshot() {
        #[derive(Clone)]
        enum Payload {
            Good(u32),
            Bad,
        }

        impl Serialize for Payload {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                match self {
                    Payload::Good(n) => serializer.serialize_u32(*n),
                    Payload::Bad => Err(ser::Error::custom("payload refuses to encode")),
                }
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");

        let store = Store::new(Duration::ZERO);
        store.set("a", Payload::Good(1), NO_EXPIRATION);
        store.save_to_file(&path).unwrap();
        let before = std::fs::read(&path).unwrap();
        assert!(!before.is_empty());

        store.set("b", Payload::Bad, NO_EXPIRATION);
        let err = store.save_to_file(&path).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));

        assert_eq!(std::fs::read(&path).unwrap(), before);
        // Only the snapshot itself is left in the directory
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_to_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");

        let store = Store::new(Duration::ZERO);
        store.set("k", 1u32, NO_EXPIRATION);
        store.save_to_file(&path).unwrap();
        store.set("k", 2u32, NO_EXPIRATION);
        store.save_to_file(&path).unwrap();

        let dest = Store::new(Duration::ZERO);
        dest.set("k", 0u32, NO_EXPIRATION);
        dest.load_from_file(&path).unwrap();
        assert_eq!(dest.get("k"), Some(2));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");

        let source = populated();
        source.save_to_file(&path).unwrap();

        let dest = Store::new(Duration::ZERO);
        dest.set("text", Value::Null, NO_EXPIRATION);
        assert_eq!(dest.load_from_file(&path).unwrap(), 1);
        assert_eq!(dest.get("text"), Some(Value::Text("hello world".to_string())));

        let entry: Entry<Value> = dest.get_entry("text").unwrap();
        assert!(entry.expires());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest: Store<Value> = Store::new(Duration::ZERO);

        let err = dest.load_from_file(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));

        let err = populated().save_to_file("").unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
