use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{error::RecordError, naming::record_file_name, record::DeploymentRecord};

pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";
// temp files start out owner-only; records are for every operator to read
#[cfg(unix)]
const RECORD_MODE: u32 = 0o644;

/// Persists deployment records as `<dir>/<contract>-<network>.json`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentRecorder {
    dir: PathBuf,
}

impl Default for DeploymentRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_DEPLOYMENTS_DIR)
    }
}

impl DeploymentRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, contract_name: &str, network: &str) -> Result<PathBuf, RecordError> {
        Ok(self.dir.join(record_file_name(contract_name, network)?))
    }

    /// Builds a record for a confirmed deployment and writes it.
    pub fn record(
        &self,
        contract_name: &str,
        network: &str,
        contract_address: &str,
        deployer: &str,
        fields: Map<String, Value>,
    ) -> Result<(DeploymentRecord, PathBuf), RecordError> {
        let record = DeploymentRecord::new(network, contract_address, deployer, fields)?;
        let path = self.write(contract_name, &record)?;
        Ok((record, path))
    }

    /// Writes `record`, replacing any previous record for the same contract and network.
    ///
    /// The JSON goes to a temp file next to the target which is then renamed over it,
    /// so readers only ever see the old file or the complete new one.
    pub fn write(
        &self,
        contract_name: &str,
        record: &DeploymentRecord,
    ) -> Result<PathBuf, RecordError> {
        let path = self.path_for(contract_name, &record.network)?;
        let bytes = record.to_json_pretty()?;

        fs::create_dir_all(&self.dir).map_err(|e| RecordError::io(&self.dir, e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| RecordError::io(&self.dir, e))?;
        debug!(tmp = %tmp.path().display(), "writing deployment record");
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| RecordError::io(tmp.path(), e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(RECORD_MODE))
                .map_err(|e| RecordError::io(tmp.path(), e))?;
        }

        // on failure the PersistError hands the temp file back; dropping it removes it
        tmp.persist(&path).map_err(|e| RecordError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        info!(path = %path.display(), "deployment record saved");
        Ok(path)
    }

    pub fn read(&self, contract_name: &str, network: &str) -> Result<DeploymentRecord, RecordError> {
        let path = self.path_for(contract_name, network)?;
        let contents = fs::read(&path).map_err(|e| RecordError::io(&path, e))?;
        Ok(serde_json::from_slice(&contents)?)
    }
}
