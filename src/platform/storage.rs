//! Key/value string storage
//!
//! Backed by `window.localStorage` in the browser. Native builds keep a
//! per-thread map so saves round-trip within a process.

use crate::{Error, Result};

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()
}

#[cfg(target_arch = "wasm32")]
pub fn get(key: &str) -> Option<String> {
    local_storage()?.get_item(key).ok()?
}

#[cfg(target_arch = "wasm32")]
pub fn set(key: &str, value: &str) -> Result<()> {
    let storage = local_storage().ok_or(Error::StorageUnavailable)?;
    storage
        .set_item(key, value)
        .map_err(|_| Error::StorageUnavailable)
}

#[cfg(target_arch = "wasm32")]
pub fn remove(key: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod memory {
    use std::cell::RefCell;
    use std::collections::HashMap;

    thread_local! {
        pub static STORE: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn get(key: &str) -> Option<String> {
    memory::STORE.with(|store| store.borrow().get(key).cloned())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn set(key: &str, value: &str) -> Result<()> {
    memory::STORE
        .try_with(|store| {
            store.borrow_mut().insert(key.to_owned(), value.to_owned());
        })
        .map_err(|_| Error::StorageUnavailable)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn remove(key: &str) {
    memory::STORE.with(|store| {
        store.borrow_mut().remove(key);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        assert_eq!(get("storage-test"), None);
        set("storage-test", "hello").unwrap();
        assert_eq!(get("storage-test").as_deref(), Some("hello"));
        set("storage-test", "again").unwrap();
        assert_eq!(get("storage-test").as_deref(), Some("again"));
        remove("storage-test");
        assert_eq!(get("storage-test"), None);
    }
}
