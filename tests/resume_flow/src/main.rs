fn main() {
    println!("Run `cargo test -p resume-flow` to execute the resume flow tests.");
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use mulesync_resume_cache::{
        ResumeBackend, ResumeCache, ResumeConfig, ResumeCoordinator, SourceIdentity,
    };
    use tempfile::TempDir;

    /// A source object whose fingerprint is derived from its contents,
    /// like a real source's size+mtime+hash identity would be.
    struct MemorySource {
        data: RefCell<Vec<u8>>,
    }

    impl MemorySource {
        fn new(data: &[u8]) -> Self {
            Self {
                data: RefCell::new(data.to_vec()),
            }
        }

        fn replace(&self, data: &[u8]) {
            *self.data.borrow_mut() = data.to_vec();
        }

        fn contents(&self) -> Vec<u8> {
            self.data.borrow().clone()
        }
    }

    impl SourceIdentity for MemorySource {
        fn fingerprint(&self, _strict: bool) -> String {
            let data = self.data.borrow();
            let sum: u64 = data.iter().map(|&b| b as u64).sum();
            format!("{}:{sum}", data.len())
        }
    }

    /// An in-memory destination that keeps partial uploads addressable by
    /// resume token and supports byte-offset resume against them.
    struct MemoryDestination {
        state: RefCell<DestinationState>,
    }

    #[derive(Default)]
    struct DestinationState {
        partials: HashMap<String, Vec<u8>>,
        objects: HashMap<String, Vec<u8>>,
        next_id: u32,
    }

    impl MemoryDestination {
        fn new() -> Self {
            Self {
                state: RefCell::new(DestinationState::default()),
            }
        }

        fn begin_upload(&self) -> String {
            let mut s = self.state.borrow_mut();
            s.next_id += 1;
            let id = format!("upload-{}", s.next_id);
            s.partials.insert(id.clone(), Vec::new());
            id
        }

        fn append(&self, id: &str, byte: u8) {
            self.state
                .borrow_mut()
                .partials
                .get_mut(id)
                .expect("append to unknown upload")
                .push(byte);
        }

        fn finish(&self, id: &str, remote: &str) {
            let mut s = self.state.borrow_mut();
            let data = s.partials.remove(id).expect("finish of unknown upload");
            s.objects.insert(remote.to_string(), data);
        }

        fn object(&self, remote: &str) -> Option<Vec<u8>> {
            self.state.borrow().objects.get(remote).cloned()
        }
    }

    impl ResumeBackend for MemoryDestination {
        fn resume(
            &self,
            _remote: &str,
            resume_id: &str,
            _hash_name: &str,
            _hash_state: &str,
        ) -> Result<i64, String> {
            let s = self.state.borrow();
            match s.partials.get(resume_id) {
                Some(partial) => Ok(partial.len() as i64),
                None => Err(format!("no partial upload with id {resume_id}")),
            }
        }
    }

    /// Drives one upload attempt of `source` to `remote`, one byte at a
    /// time, reporting resumable state to the coordinator after every
    /// byte — the way a backend invokes `SetID` as it makes progress.
    ///
    /// If `break_after` is given, the attempt dies after sending that
    /// many bytes, leaving a partial upload at the destination. On
    /// success, returns the number of bytes sent in this attempt.
    fn upload(
        coord: &ResumeCoordinator,
        dest: &MemoryDestination,
        source: &MemorySource,
        remote: &str,
        break_after: Option<usize>,
    ) -> Result<usize, String> {
        let contents = source.contents();
        let mut opt = coord.prepare(dest, "memdst", "bucket", remote, source);

        let (id, start) = if opt.pos > 0 && !opt.id.is_empty() {
            (opt.id.clone(), opt.pos as usize)
        } else {
            (dest.begin_upload(), 0)
        };

        let mut sent = 0usize;
        for &byte in &contents[start..] {
            if break_after == Some(sent) {
                return Err("interrupted".to_string());
            }
            dest.append(&id, byte);
            sent += 1;
            // Persistence failures must not abort the transfer; they only
            // cost a future retry.
            let state = format!("state-{}", start + sent);
            if let Err(err) = opt.set_id(&id, "md5", &state) {
                eprintln!("failed to persist resume state: {err}");
            }
        }
        dest.finish(&id, remote);
        Ok(sent)
    }

    fn coordinator(root: &std::path::Path, config: ResumeConfig) -> ResumeCoordinator {
        ResumeCoordinator::new(ResumeCache::new(root), config)
    }

    fn resume_on() -> ResumeConfig {
        ResumeConfig {
            resume_larger: 0,
            ..ResumeConfig::default()
        }
    }

    #[test]
    fn interrupted_upload_resumes_where_it_left_off() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(dir.path(), resume_on());
        let dest = MemoryDestination::new();
        let source = MemorySource::new(b"0123456789");

        // First attempt dies after 2 bytes, leaving a partial behind.
        let err = upload(&coord, &dest, &source, "potato", Some(2)).unwrap_err();
        assert_eq!(err, "interrupted");
        assert!(dest.object("potato").is_none());

        // The progress callbacks left a record behind for the retry.
        let path = coord.cache().record_path("memdst", "bucket", "potato");
        assert!(path.is_file());

        // The retry picks up at byte 2 and only sends the remaining 8.
        let sent = upload(&coord, &dest, &source, "potato", None).unwrap();
        assert_eq!(sent, 8);
        assert_eq!(dest.object("potato").unwrap(), b"0123456789");
    }

    #[test]
    fn repeated_interruptions_make_forward_progress() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(dir.path(), resume_on());
        let dest = MemoryDestination::new();
        let source = MemorySource::new(b"0123456789");

        upload(&coord, &dest, &source, "potato", Some(3)).unwrap_err();
        upload(&coord, &dest, &source, "potato", Some(4)).unwrap_err();
        let sent = upload(&coord, &dest, &source, "potato", None).unwrap();

        assert_eq!(sent, 3);
        assert_eq!(dest.object("potato").unwrap(), b"0123456789");
    }

    #[test]
    fn changed_source_restarts_from_zero() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(dir.path(), resume_on());
        let dest = MemoryDestination::new();
        let source = MemorySource::new(b"0123456789");

        upload(&coord, &dest, &source, "potato", Some(2)).unwrap_err();

        // The source mutates between attempts. Resuming against the old
        // partial would splice two different objects together, so the
        // fingerprint check forces a full restart.
        source.replace(b"ABCDEFGHIJ");
        let sent = upload(&coord, &dest, &source, "potato", None).unwrap();
        assert_eq!(sent, 10);
        assert_eq!(dest.object("potato").unwrap(), b"ABCDEFGHIJ");
    }

    #[test]
    fn negative_threshold_disables_resume() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(dir.path(), ResumeConfig::default());
        let dest = MemoryDestination::new();
        let source = MemorySource::new(b"0123456789");

        upload(&coord, &dest, &source, "potato", Some(2)).unwrap_err();
        let sent = upload(&coord, &dest, &source, "potato", None).unwrap();
        assert_eq!(sent, 10, "resume must stay off with the default config");
    }

    #[test]
    fn vanished_partial_at_destination_restarts_from_zero() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(dir.path(), resume_on());
        let dest = MemoryDestination::new();
        let source = MemorySource::new(b"0123456789");

        upload(&coord, &dest, &source, "potato", Some(2)).unwrap_err();

        // The destination expired the partial upload; its resume call now
        // errors, which the coordinator absorbs into a full restart.
        dest.state.borrow_mut().partials.clear();
        let sent = upload(&coord, &dest, &source, "potato", None).unwrap();
        assert_eq!(sent, 10);
        assert_eq!(dest.object("potato").unwrap(), b"0123456789");
    }

    #[test]
    fn cache_stays_under_its_byte_budget() {
        let dir = TempDir::new().unwrap();
        let config = ResumeConfig {
            resume_larger: 0,
            max_record_bytes: 1024,
            // Roughly two records' worth; the third upload evicts the oldest.
            max_total_bytes: 200,
        };
        let coord = coordinator(dir.path(), config);
        let dest = MemoryDestination::new();
        let source = MemorySource::new(b"0123456789");

        for remote in ["one", "two", "three"] {
            upload(&coord, &dest, &source, remote, None).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        let total = dir_size(dir.path());
        assert!(total < 200, "cache occupies {total} bytes, budget is 200");
        // The newest record survives.
        let path = coord.cache().record_path("memdst", "bucket", "three");
        assert!(path.is_file());
    }

    fn dir_size(dir: &std::path::Path) -> u64 {
        let mut total = 0;
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let meta = entry.metadata().unwrap();
            if meta.is_dir() {
                total += dir_size(&entry.path());
            } else {
                total += meta.len();
            }
        }
        total
    }
}
