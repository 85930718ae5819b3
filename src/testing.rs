/// Test doubles for the picker, the blob store and the state store

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};

use crate::fetch::Locator;
use crate::picker::{MediaPicker, Permission, PickOptions, PickResult};
use crate::state::library::{MemoryStateStore, StateStore, StoreError, StoreResult};
use crate::storage::{BlobError, BlobResult, BlobStore};

/// Picker that replays queued answers
///
/// Once a queue runs dry it grants permission and reports a cancelled pick.
#[derive(Default)]
pub struct ScriptedPicker {
    permissions: Mutex<VecDeque<Permission>>,
    picks: Mutex<VecDeque<PickResult>>,
}

impl ScriptedPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permission(self, answer: Permission) -> Self {
        self.permissions.lock().unwrap().push_back(answer);
        self
    }

    pub fn pick(self, result: PickResult) -> Self {
        self.picks.lock().unwrap().push_back(result);
        self
    }
}

#[async_trait]
impl MediaPicker for ScriptedPicker {
    async fn request_permission(&self) -> Permission {
        self.permissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Permission::Granted)
    }

    async fn pick_image(&self, _options: &PickOptions) -> PickResult {
        self.picks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PickResult::Cancelled)
    }
}

/// Holds an upload of one object name until released
#[derive(Default)]
pub struct UploadGate {
    arrived: Notify,
    released: Notify,
}

impl UploadGate {
    /// Wait until the upload reached the gate
    pub async fn arrived(&self) {
        self.arrived.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }
}

/// In-memory blob store with `https://cdn/{name}` URLs
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    gates: Mutex<HashMap<String, Arc<UploadGate>>>,
    fail_uploads: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate every following upload of `name`
    pub fn gate(&self, name: &str) -> Arc<UploadGate> {
        let gate = Arc::new(UploadGate::default());
        self.gates
            .lock()
            .unwrap()
            .insert(name.to_string(), gate.clone());
        gate
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn object(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> BlobResult<()> {
        let gate = self.gates.lock().unwrap().get(name).cloned();
        if let Some(gate) = gate {
            gate.arrived.notify_one();
            gate.released.notified().await;
        }

        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BlobError::S3Error("bucket unavailable".to_string()));
        }

        self.objects.lock().unwrap().insert(name.to_string(), bytes);
        Ok(())
    }

    async fn public_url(&self, name: &str) -> BlobResult<String> {
        Ok(format!("https://cdn/{name}"))
    }
}

/// Memory store whose reads or writes can be made to fail
#[derive(Default)]
pub struct FlakyStateStore {
    inner: MemoryStateStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateStore for FlakyStateStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("reads disabled")));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("writes disabled")));
        }
        self.inner.set(key, value).await
    }
}

/// Write a picked file named `name` (its content is the name) and return
/// its locator
pub fn write_pick(dir: &Path, name: &str) -> Locator {
    let path = dir.join(name);
    std::fs::write(&path, name.as_bytes()).unwrap();
    Locator::from_path(&path).unwrap()
}

/// Everything currently buffered on an event receiver
pub fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
