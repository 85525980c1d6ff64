//! Wallet Key Storage
//!
//! Persists the embedded wallet's private key between runs.
//! Uses AES-256-GCM with a locally generated key file.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

const WALLET_FILE: &str = "wallet.json";
const ENCRYPTION_KEY_FILE: &str = ".wallet_key";
const NONCE_SIZE: usize = 12;

#[derive(Debug, Serialize, Deserialize)]
struct StoredWallet {
    /// base64(nonce || ciphertext)
    private_key: String,
}

pub struct KeyStorage {
    wallet_path: PathBuf,
    key_path: PathBuf,
}

impl KeyStorage {
    /// Storage under the platform data directory
    pub fn new() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("x402-shop");
        Self::with_path(base_dir)
    }

    /// Storage rooted at a custom directory
    pub fn with_path(base_dir: PathBuf) -> Self {
        Self {
            wallet_path: base_dir.join(WALLET_FILE),
            key_path: base_dir.join(ENCRYPTION_KEY_FILE),
        }
    }

    pub fn wallet_path(&self) -> &Path {
        &self.wallet_path
    }

    async fn ensure_dir(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.wallet_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn get_or_create_key(&self) -> anyhow::Result<[u8; 32]> {
        self.ensure_dir().await?;

        if fs::try_exists(&self.key_path).await? {
            let key_data = fs::read(&self.key_path).await?;
            let key_bytes = BASE64.decode(&key_data)?;
            if key_bytes.len() == 32 {
                let mut key = [0u8; 32];
                key.copy_from_slice(&key_bytes);
                return Ok(key);
            }
            warn!("Encryption key file is corrupt, generating a new one");
        }

        let key: [u8; 32] = rand::random();
        fs::write(&self.key_path, BASE64.encode(key)).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.key_path, perms)?;
        }

        info!("Generated new wallet encryption key");
        Ok(key)
    }

    fn encrypt(&self, plaintext: &str, key: &[u8; 32]) -> anyhow::Result<String> {
        let cipher = Aes256Gcm::new_from_slice(key)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        let mut combined = nonce.to_vec();
        combined.extend(ciphertext);
        Ok(BASE64.encode(&combined))
    }

    fn decrypt(&self, encrypted: &str, key: &[u8; 32]) -> anyhow::Result<String> {
        let combined = BASE64.decode(encrypted)?;
        if combined.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("Invalid encrypted data"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new_from_slice(key)?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow::anyhow!("Decryption failed: {}", e))?;

        String::from_utf8(plaintext).map_err(Into::into)
    }

    /// Load the stored private key, if any
    pub async fn load(&self) -> anyhow::Result<Option<String>> {
        if !fs::try_exists(&self.wallet_path).await? {
            info!("No stored wallet found");
            return Ok(None);
        }

        let key = self.get_or_create_key().await?;
        let content = fs::read_to_string(&self.wallet_path).await?;
        let stored: StoredWallet = serde_json::from_str(&content)?;

        match self.decrypt(&stored.private_key, &key) {
            Ok(private_key) => {
                info!("Loaded wallet from {:?}", self.wallet_path);
                Ok(Some(private_key))
            }
            Err(e) => {
                warn!("Failed to decrypt stored wallet, it may be corrupted: {}", e);
                Ok(None)
            }
        }
    }

    /// Store a private key, replacing any previous one
    pub async fn save(&self, private_key: &str) -> anyhow::Result<()> {
        self.ensure_dir().await?;
        let key = self.get_or_create_key().await?;

        let stored = StoredWallet {
            private_key: self.encrypt(private_key, &key)?,
        };
        fs::write(&self.wallet_path, serde_json::to_string_pretty(&stored)?).await?;

        info!("Saved wallet to {:?}", self.wallet_path);
        Ok(())
    }

    /// Remove the stored wallet (logout)
    pub async fn clear(&self) -> anyhow::Result<()> {
        if fs::try_exists(&self.wallet_path).await? {
            fs::remove_file(&self.wallet_path).await?;
            info!("Removed stored wallet");
        }
        Ok(())
    }
}

impl Default for KeyStorage {
    fn default() -> Self {
        Self::new()
    }
}
