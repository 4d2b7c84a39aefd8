//! File checkpoints for trained models.
//!
//! JSON on disk, written atomically (temp file, then rename). Loading
//! validates the artifact before handing it out.

use std::io;
use std::path::Path;

use super::model::TrainedModel;

/// Save a model to disk atomically.
pub fn save_to_disk(model: &TrainedModel, path: &Path) -> io::Result<()> {
    let json = serde_json::to_vec(model).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let tmp_path = path.with_extension("json.tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load and validate a model from disk.
pub fn load_from_disk(path: &Path) -> io::Result<TrainedModel> {
    let data = std::fs::read(path)?;
    let model: TrainedModel =
        serde_json::from_slice(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    model
        .validate()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(model)
}
