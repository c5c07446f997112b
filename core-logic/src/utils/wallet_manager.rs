use crate::error::WalletError;
use crate::traits::WalletLoader;
use anyhow::Result;
use async_trait::async_trait;
use ethers::signers::coins_bip39::{English, Mnemonic};
use ethers::signers::{MnemonicBuilder, Signer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One generated or imported EVM wallet, as stored on disk.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct WalletIdentity {
    pub address: String,
    pub private_key: String,
    pub mnemonic: String,
}

impl fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("address", &self.address)
            .field("private_key", &"***REDACTED***")
            .field("mnemonic", &"***REDACTED***")
            .finish()
    }
}

impl WalletIdentity {
    /// Fresh 12-word BIP-39 wallet on the default `m/44'/60'/0'/0/0` path.
    pub fn generate() -> Result<Self, WalletError> {
        let mut rng = rand::thread_rng();
        let phrase = Mnemonic::<English>::new(&mut rng).to_phrase();

        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase.as_str())
            .build()
            .map_err(|e| WalletError::Generation {
                reason: e.to_string(),
            })?;

        Ok(Self {
            address: ethers::utils::to_checksum(&wallet.address(), None),
            private_key: format!("0x{}", hex::encode(wallet.signer().to_bytes())),
            mnemonic: phrase,
        })
    }

    /// A wallet may only be persisted once every field is present.
    pub fn validate(&self) -> Result<(), WalletError> {
        let missing = if self.address.trim().is_empty() {
            Some("address")
        } else if self.private_key.trim().is_empty() {
            Some("privateKey")
        } else if self.mnemonic.trim().is_empty() {
            Some("mnemonic")
        } else {
            None
        };

        match missing {
            Some(field) => Err(WalletError::Incomplete { field }),
            None => Ok(()),
        }
    }
}

/// Flat JSON wallet list. Entries are only ever appended.
pub struct WalletStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl WalletStore {
    pub const WALLET_FILE: &'static str = "config.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Reads every stored wallet in file order. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<WalletIdentity>, WalletError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| WalletError::Io {
            path: self.path.display().to_string(),
            msg: e.to_string(),
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| WalletError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Appends one complete wallet and rewrites the file. Returns the new wallet count.
    pub async fn append(&self, identity: &WalletIdentity) -> Result<usize, WalletError> {
        identity.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut wallets = self.load()?;
        wallets.push(identity.clone());
        self.write_all(&wallets)?;

        info!(
            "Saved wallet {} to {} ({} total)",
            identity.address,
            self.path.display(),
            wallets.len()
        );
        Ok(wallets.len())
    }

    // Write to a sibling temp file first so a crash never truncates the store.
    fn write_all(&self, wallets: &[WalletIdentity]) -> Result<(), WalletError> {
        let io_err = |e: std::io::Error| WalletError::Io {
            path: self.path.display().to_string(),
            msg: e.to_string(),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(wallets).map_err(|e| WalletError::Io {
            path: self.path.display().to_string(),
            msg: e.to_string(),
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)
    }
}

#[async_trait]
impl WalletLoader for WalletStore {
    type Wallet = WalletIdentity;

    async fn load_wallets(&self) -> Result<Vec<WalletIdentity>> {
        Ok(self.load()?)
    }
}
