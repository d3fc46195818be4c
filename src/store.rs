//! Profile store: the single owner of persisted user state.
//!
//! Profiles live in memory behind a `RwLock`. When a file path is configured,
//! the whole map is rewritten after every mutation (temp file in the same
//! directory, then rename). Handlers read a snapshot, work on it, and
//! `replace` it; concurrent writers to one profile are last-write-wins.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::UserProfile;
use crate::error::StoreError;

#[derive(Clone, Default)]
pub struct ProfileStore {
  profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
  path: Option<PathBuf>,
}

impl ProfileStore {
  /// Memory-only store.
  pub fn in_memory() -> Self {
    Self::default()
  }

  /// Load the last-known profiles from `path`. A missing file starts empty.
  #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let path = path.as_ref().to_path_buf();
    let profiles = match tokio::fs::read(&path).await {
      Ok(bytes) => serde_json::from_slice::<HashMap<String, UserProfile>>(&bytes)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
      Err(e) => return Err(e.into()),
    };
    info!(target: "store", count = profiles.len(), "Profile store loaded");
    Ok(Self { profiles: Arc::new(RwLock::new(profiles)), path: Some(path) })
  }

  /// Store configured by PROFILE_STORE_PATH; memory-only when unset or unreadable.
  pub async fn from_env() -> Self {
    let Ok(path) = std::env::var("PROFILE_STORE_PATH") else {
      info!(target: "store", "PROFILE_STORE_PATH not set; profiles are kept in memory only");
      return Self::in_memory();
    };
    match Self::open(&path).await {
      Ok(store) => store,
      Err(e) => {
        warn!(target: "store", %path, error = %e, "Could not load profile store; starting in memory");
        Self::in_memory()
      }
    }
  }

  pub async fn create(&self, name: &str, email: &str) -> Result<UserProfile, StoreError> {
    let profile = UserProfile::new(Uuid::new_v4().to_string(), name.trim().into(), email.trim().into());
    self.replace(profile.clone()).await?;
    info!(target: "store", id = %profile.id, "Profile created");
    Ok(profile)
  }

  pub async fn get(&self, id: &str) -> Option<UserProfile> {
    self.profiles.read().await.get(id).cloned()
  }

  /// Write `profile` back and persist. Memory only changes once the write
  /// has succeeded.
  #[instrument(level = "debug", skip_all, fields(id = %profile.id))]
  pub async fn replace(&self, profile: UserProfile) -> Result<(), StoreError> {
    let mut profiles = self.profiles.write().await;
    let mut next = profiles.clone();
    next.insert(profile.id.clone(), profile);
    self.persist(&next).await?;
    *profiles = next;
    Ok(())
  }

  /// Sign-out: drop the profile. Returns whether it existed.
  pub async fn clear(&self, id: &str) -> Result<bool, StoreError> {
    let mut profiles = self.profiles.write().await;
    if !profiles.contains_key(id) {
      return Ok(false);
    }
    let mut next = profiles.clone();
    next.remove(id);
    self.persist(&next).await?;
    *profiles = next;
    info!(target: "store", %id, "Profile cleared");
    Ok(true)
  }

  async fn persist(&self, profiles: &HashMap<String, UserProfile>) -> Result<(), StoreError> {
    let Some(path) = &self.path else { return Ok(()) };
    let bytes = serde_json::to_vec_pretty(profiles)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("profiles.json");
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
  }
}
